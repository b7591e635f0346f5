//! gifloom encodes sequences of RGB frames into animated GIF89a streams.
//!
//! # Pipeline overview
//!
//! 1. **Normalize**: every frame is laid out on the canvas locked by the first frame
//! 2. **Quantize**: a NeuQuant self-organizing map reduces each frame to its own 256-color palette
//! 3. **Compress**: palette indices are LZW-compressed with variable-width codes
//! 4. **Write**: a single writer emits the container blocks in frame order
//!
//! Steps 1-3 are pure per frame and run on a rayon pool in [`encode_frames`]; step 4 is the
//! [`GifEncoder`] session, which can also be driven frame by frame.
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic**: the same frames and configuration always produce the same bytes,
//!   whether frames are prepared in parallel or not.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod encode;
mod foundation;
mod pipeline;
mod quantize;

pub use encode::blocks::{
    Block, Extension, GraphicControl, NETSCAPE_ID, SIGNATURE, write_color_table,
    write_graphic_control, write_image_descriptor, write_loop_extension, write_screen_descriptor,
    write_signature, write_trailer,
};
pub use encode::config::{EncoderConfig, Repeat};
pub use encode::frame::{CHANNELS, RawFrame};
pub use encode::lzw::{LzwEncoder, compress};
pub use encode::session::{GifEncoder, PreparedFrame, SessionPhase, prepare_frame};
pub use foundation::core::{
    Canvas, DisposalMethod, FrameIndex, Rgb, delay_from_fps, delay_from_millis,
};
pub use foundation::error::{GifError, GifResult};
pub use pipeline::{
    EncodeStats, EncodeThreading, FrameSource, encode_frames, encode_to_path, prepare_frames,
};
pub use quantize::neuquant::{MIN_PICTURE_BYTES, NET_SIZE, NeuQuant};
pub use quantize::palette::{IndexedFrame, MAX_PALETTE_LEN, Palette, quantize_frame};
