//! Color reduction from truecolor frames to indexed frames.

pub(crate) mod neuquant;
pub(crate) mod palette;
