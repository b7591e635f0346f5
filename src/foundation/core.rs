use std::{fmt, str::FromStr};

use crate::foundation::error::{GifError, GifResult};

/// Ordinal of a frame within one encode, in source order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// 8-bit-per-channel RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Pure black, also used to pad normalized frames.
    pub const BLACK: Self = Self::new(0, 0, 0);

    /// Build a color from its channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels as `[r, g, b]`.
    pub const fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Squared Euclidean distance in RGB space.
    pub fn distance_sq(self, other: Self) -> u32 {
        let dr = i32::from(self.r) - i32::from(other.r);
        let dg = i32::from(self.g) - i32::from(other.g);
        let db = i32::from(self.b) - i32::from(other.b);
        (dr * dr + dg * dg + db * db) as u32
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Parses `RRGGBB`, with or without a leading `#`.
impl FromStr for Rgb {
    type Err = GifError;

    fn from_str(s: &str) -> GifResult<Self> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(GifError::validation(format!(
                "color '{s}' must be 6 hex digits (RRGGBB)"
            )));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| GifError::validation(format!("color '{s}': {e}")))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// Logical screen size shared by every frame of a stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u16,
    /// Height in pixels.
    pub height: u16,
}

impl Canvas {
    /// Canvas for a frame of `width`x`height`.
    ///
    /// Degenerate sizes are raised to 1 pixel; sizes that don't fit the container's 16-bit
    /// fields are rejected.
    pub fn for_frame(width: u32, height: u32) -> GifResult<Self> {
        let fit = |v: u32, what: &str| {
            u16::try_from(v.max(1)).map_err(|_| {
                GifError::validation(format!("canvas {what} {v} exceeds the GIF limit of 65535"))
            })
        };
        Ok(Self {
            width: fit(width, "width")?,
            height: fit(height, "height")?,
        })
    }

    /// Number of pixels on the canvas.
    pub fn pixel_count(self) -> usize {
        usize::from(self.width) * usize::from(self.height)
    }

    /// Whether a `width`x`height` frame covers exactly this canvas.
    pub fn matches(self, width: u32, height: u32) -> bool {
        u32::from(self.width) == width && u32::from(self.height) == height
    }
}

/// How a decoder treats the frame's area before drawing the next frame.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum DisposalMethod {
    /// No disposal specified; the decoder may do anything.
    #[default]
    #[serde(rename = "none")]
    Unspecified = 0,
    /// Leave the frame in place.
    Keep = 1,
    /// Restore the area to the background color.
    Background = 2,
    /// Restore the area to what was there before the frame.
    Previous = 3,
}

impl DisposalMethod {
    /// Decode a 3-bit disposal field value; reserved values yield `None`.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Unspecified),
            1 => Some(Self::Keep),
            2 => Some(Self::Background),
            3 => Some(Self::Previous),
            _ => None,
        }
    }

    /// Value stored in the graphic control extension.
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl FromStr for DisposalMethod {
    type Err = GifError;

    fn from_str(s: &str) -> GifResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "unspecified" | "0" => Ok(Self::Unspecified),
            "keep" | "1" => Ok(Self::Keep),
            "background" | "2" => Ok(Self::Background),
            "previous" | "3" => Ok(Self::Previous),
            _ => Err(GifError::validation(format!(
                "unknown disposal method '{s}' (expected none|keep|background|previous)"
            ))),
        }
    }
}

/// Converts milliseconds to the container's hundredths of a second, rounding to nearest.
pub fn delay_from_millis(ms: u32) -> u16 {
    let hundredths = (u64::from(ms) + 5) / 10;
    u16::try_from(hundredths).unwrap_or(u16::MAX)
}

/// Per-frame delay for a frame rate, or `None` when the rate is not a positive finite number.
pub fn delay_from_fps(fps: f32) -> Option<u16> {
    if !fps.is_finite() || fps <= 0.0 {
        return None;
    }
    let hundredths = (100.0 / fps).round();
    Some(if hundredths >= f32::from(u16::MAX) {
        u16::MAX
    } else {
        hundredths as u16
    })
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
