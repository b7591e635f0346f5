use std::borrow::Cow;

use crate::foundation::{
    core::{Canvas, DisposalMethod, Rgb},
    error::{GifError, GifResult},
};

/// Bytes per pixel of every frame buffer handled by the encoder.
pub const CHANNELS: usize = 3;

/// One source frame: a row-major RGB8 buffer plus optional per-frame overrides.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFrame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    /// Delay after this frame in hundredths of a second; falls back to the session delay.
    pub delay: Option<u16>,
    /// Disposal method for this frame; falls back to the session override.
    pub dispose: Option<DisposalMethod>,
    /// Transparent color for this frame; falls back to the session color.
    pub transparent: Option<Rgb>,
}

impl RawFrame {
    /// Wrap an RGB8 buffer; its length must be exactly `width * height * 3`.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> GifResult<Self> {
        let expected = u64::from(width) * u64::from(height) * CHANNELS as u64;
        if pixels.len() as u64 != expected {
            return Err(GifError::validation(format!(
                "frame {width}x{height} needs {expected} RGB bytes, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
            delay: None,
            dispose: None,
            transparent: None,
        })
    }

    /// A frame filled with one color.
    pub fn solid(width: u32, height: u32, color: Rgb) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            pixels: color.to_array().repeat(len),
            delay: None,
            dispose: None,
            transparent: None,
        }
    }

    /// Set the per-frame delay in hundredths of a second.
    pub fn with_delay(mut self, delay: u16) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Set the per-frame disposal method.
    pub fn with_dispose(mut self, dispose: DisposalMethod) -> Self {
        self.dispose = Some(dispose);
        self
    }

    /// Set the per-frame transparent color.
    pub fn with_transparent(mut self, color: Rgb) -> Self {
        self.transparent = Some(color);
        self
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major RGB8 pixels.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Pixels laid out on `canvas`: borrowed when the sizes agree, otherwise cropped or
    /// padded with black at the top-left origin.
    pub fn normalized(&self, canvas: Canvas) -> Cow<'_, [u8]> {
        if canvas.matches(self.width, self.height) {
            return Cow::Borrowed(&self.pixels);
        }

        let dst_w = usize::from(canvas.width);
        let dst_h = usize::from(canvas.height);
        let src_w = self.width as usize;
        let src_h = self.height as usize;
        let copy_w = dst_w.min(src_w) * CHANNELS;

        let mut out = vec![0u8; canvas.pixel_count() * CHANNELS];
        for y in 0..dst_h.min(src_h) {
            let src = y * src_w * CHANNELS;
            let dst = y * dst_w * CHANNELS;
            out[dst..dst + copy_w].copy_from_slice(&self.pixels[src..src + copy_w]);
        }
        Cow::Owned(out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/frame.rs"]
mod tests;
