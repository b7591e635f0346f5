use crate::{
    foundation::core::{Canvas, Rgb},
    foundation::error::{GifError, GifResult},
    quantize::neuquant::NeuQuant,
};

/// Largest number of entries a GIF color table can hold.
pub const MAX_PALETTE_LEN: usize = 256;

/// Ordered color table with a per-entry "referenced by a pixel" flag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgb>,
    used: Vec<bool>,
}

impl Palette {
    /// Build a palette with every entry marked unused.
    pub fn new(colors: Vec<Rgb>) -> GifResult<Self> {
        if colors.len() > MAX_PALETTE_LEN {
            return Err(GifError::validation(format!(
                "palette has {} entries, at most {MAX_PALETTE_LEN} are allowed",
                colors.len()
            )));
        }
        let used = vec![false; colors.len()];
        Ok(Self { colors, used })
    }

    /// Number of real (unpadded) entries.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Whether the palette has no entries.
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Entries in table order.
    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    /// Whether entry `index` is referenced by at least one pixel.
    pub fn is_used(&self, index: usize) -> bool {
        self.used.get(index).copied().unwrap_or(false)
    }

    /// Number of entries referenced by at least one pixel.
    pub fn used_count(&self) -> usize {
        self.used.iter().filter(|u| **u).count()
    }

    pub(crate) fn mark_used(&mut self, index: u8) {
        if let Some(slot) = self.used.get_mut(usize::from(index)) {
            *slot = true;
        }
    }

    /// Size field of the packed table flags: the table holds `2 << size_class` entries.
    pub fn size_class(&self) -> u8 {
        match self.colors.len() {
            0..=2 => 0,
            3..=4 => 1,
            5..=8 => 2,
            9..=16 => 3,
            17..=32 => 4,
            33..=64 => 5,
            65..=128 => 6,
            _ => 7,
        }
    }

    /// Number of entries written to the container, including padding.
    pub fn table_len(&self) -> usize {
        2 << self.size_class()
    }

    /// Bits needed to address every table entry.
    pub fn color_depth(&self) -> u8 {
        self.size_class() + 1
    }

    /// Packed RGB bytes padded with black up to [`Palette::table_len`] entries.
    pub fn to_table_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.table_len() * 3);
        for c in &self.colors {
            out.extend_from_slice(&c.to_array());
        }
        out.resize(self.table_len() * 3, 0);
        out
    }

    /// Index of the used entry nearest to `c` by squared Euclidean distance, or 0 when no
    /// entry is used.
    pub fn closest_used(&self, c: Rgb) -> u8 {
        self.colors
            .iter()
            .zip(&self.used)
            .enumerate()
            .filter(|(_, (_, used))| **used)
            .min_by_key(|(_, (color, _))| color.distance_sq(c))
            .map(|(i, _)| i as u8)
            .unwrap_or(0)
    }
}

/// One frame expressed as palette indices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexedFrame {
    /// Size of the index buffer (always the session canvas).
    pub canvas: Canvas,
    /// One palette index per pixel, row-major.
    pub indices: Vec<u8>,
    /// Palette index treated as transparent, if any.
    pub transparent: Option<u8>,
}

/// Quantize a canvas-sized RGB buffer to a 256-entry palette and an index buffer.
///
/// `transparent` is resolved to the nearest palette entry actually used by the frame.
pub fn quantize_frame(
    pixels: &[u8],
    canvas: Canvas,
    sample_factor: u32,
    transparent: Option<Rgb>,
) -> (Palette, IndexedFrame) {
    let nq = NeuQuant::new(pixels, sample_factor);
    let mut palette = Palette {
        colors: nq.colors().to_vec(),
        used: vec![false; nq.colors().len()],
    };

    let indices: Vec<u8> = pixels
        .chunks_exact(3)
        .map(|px| {
            let idx = nq.index_of(Rgb::new(px[0], px[1], px[2]));
            palette.mark_used(idx);
            idx
        })
        .collect();

    let transparent = transparent.map(|c| palette.closest_used(c));
    (
        palette,
        IndexedFrame {
            canvas,
            indices,
            transparent,
        },
    )
}

#[cfg(test)]
#[path = "../../tests/unit/quantize/palette.rs"]
mod tests;
