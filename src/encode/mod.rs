//! GIF89a stream assembly: LZW image data, container blocks and the encoding session.

pub(crate) mod blocks;
pub(crate) mod config;
pub(crate) mod frame;
pub(crate) mod lzw;
pub(crate) mod session;
