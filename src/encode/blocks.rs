//! Byte-exact writers for the GIF89a container blocks.
//!
//! Each writer emits exactly one block with a single `write_all`, so a failing sink never sees
//! a block split across calls from this module.

use std::io::{self, Write};

use crate::{
    foundation::core::{Canvas, DisposalMethod},
    quantize::palette::Palette,
};

/// Stream signature and version.
pub const SIGNATURE: &[u8; 6] = b"GIF89a";

/// Application identifier and authentication code of the looping extension.
pub const NETSCAPE_ID: &[u8; 11] = b"NETSCAPE2.0";

/// Top-level block introducers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Block {
    /// Image descriptor.
    Image = 0x2C,
    /// Extension introducer.
    Extension = 0x21,
    /// End of stream.
    Trailer = 0x3B,
}

/// Extension labels written by the encoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Extension {
    /// Graphic control extension.
    Control = 0xF9,
    /// Application extension.
    Application = 0xFF,
}

const TABLE_PRESENT: u8 = 0x80;
// 8 bits per primary color in the source.
const COLOR_RESOLUTION: u8 = 0x70;

/// Per-frame values of the graphic control extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GraphicControl {
    /// Disposal method for the frame.
    pub dispose: DisposalMethod,
    /// Delay after the frame, in hundredths of a second.
    pub delay: u16,
    /// Transparent palette index, if any.
    pub transparent: Option<u8>,
}

impl GraphicControl {
    fn packed(&self) -> u8 {
        ((self.dispose.code() & 0b111) << 2) | u8::from(self.transparent.is_some())
    }
}

/// Writes the 6-byte signature.
pub fn write_signature<W: Write + ?Sized>(w: &mut W) -> io::Result<()> {
    w.write_all(SIGNATURE)
}

/// Writes the logical screen descriptor, announcing `global_table` if given.
pub fn write_screen_descriptor<W: Write + ?Sized>(
    w: &mut W,
    canvas: Canvas,
    global_table: Option<&Palette>,
) -> io::Result<()> {
    let [w0, w1] = canvas.width.to_le_bytes();
    let [h0, h1] = canvas.height.to_le_bytes();
    let packed = match global_table {
        Some(p) => TABLE_PRESENT | COLOR_RESOLUTION | p.size_class(),
        None => COLOR_RESOLUTION,
    };
    // Background index 0, pixel aspect ratio 0 (square pixels).
    w.write_all(&[w0, w1, h0, h1, packed, 0, 0])
}

/// Writes `palette` as a color table padded to its declared size.
pub fn write_color_table<W: Write + ?Sized>(w: &mut W, palette: &Palette) -> io::Result<()> {
    w.write_all(&palette.to_table_bytes())
}

/// Writes the NETSCAPE2.0 looping extension; `loops` 0 means forever.
pub fn write_loop_extension<W: Write + ?Sized>(w: &mut W, loops: u16) -> io::Result<()> {
    let [l0, l1] = loops.to_le_bytes();
    let mut block = Vec::with_capacity(19);
    block.extend_from_slice(&[Block::Extension as u8, Extension::Application as u8, 11]);
    block.extend_from_slice(NETSCAPE_ID);
    block.extend_from_slice(&[3, 1, l0, l1, 0]);
    w.write_all(&block)
}

/// Writes a graphic control extension.
pub fn write_graphic_control<W: Write + ?Sized>(w: &mut W, gce: &GraphicControl) -> io::Result<()> {
    let [d0, d1] = gce.delay.to_le_bytes();
    w.write_all(&[
        Block::Extension as u8,
        Extension::Control as u8,
        4,
        gce.packed(),
        d0,
        d1,
        gce.transparent.unwrap_or(0),
        0,
    ])
}

/// Writes an image descriptor at (0,0) covering `canvas`, announcing `local_table` if given.
pub fn write_image_descriptor<W: Write + ?Sized>(
    w: &mut W,
    canvas: Canvas,
    local_table: Option<&Palette>,
) -> io::Result<()> {
    let [w0, w1] = canvas.width.to_le_bytes();
    let [h0, h1] = canvas.height.to_le_bytes();
    let packed = local_table.map_or(0, |p| TABLE_PRESENT | p.size_class());
    w.write_all(&[Block::Image as u8, 0, 0, 0, 0, w0, w1, h0, h1, packed])
}

/// Writes the stream trailer.
pub fn write_trailer<W: Write + ?Sized>(w: &mut W) -> io::Result<()> {
    w.write_all(&[Block::Trailer as u8])
}

#[cfg(test)]
#[path = "../../tests/unit/encode/blocks.rs"]
mod tests;
