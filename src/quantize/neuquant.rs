//! NeuQuant color quantization.
//!
//! A one-dimensional Kohonen self-organizing map of [`NET_SIZE`] neurons is trained on a
//! subsample of the input pixels. Neurons start evenly spaced along the gray diagonal and are
//! pulled towards sampled colors; a frequency/bias term keeps any single neuron from winning
//! every contest. After training the network doubles as the palette, and a green-sorted index
//! answers nearest-color queries.
//!
//! All arithmetic is fixed-point on `i32`, so results are bit-for-bit reproducible for the same
//! input bytes and sample factor.

use crate::foundation::core::Rgb;

/// Number of neurons, and therefore palette entries.
pub const NET_SIZE: usize = 256;

/// Inputs shorter than this many bytes are trained with sample factor 1 and a unit stride.
pub const MIN_PICTURE_BYTES: usize = 3 * PRIME_4;

// Strides that avoid periodic sampling; the first one not dividing the input length wins.
const PRIME_1: usize = 499;
const PRIME_2: usize = 491;
const PRIME_3: usize = 487;
const PRIME_4: usize = 503;

const MAX_NET_POS: usize = NET_SIZE - 1;
const N_CYCLES: usize = 100;
const MAX_SAMPLE_FACTOR: usize = 1 << 16;

// Neuron channels carry 4 extra fractional bits during training.
const NET_BIAS_SHIFT: i32 = 4;

const INT_BIAS_SHIFT: i32 = 16;
const INT_BIAS: i32 = 1 << INT_BIAS_SHIFT;
const GAMMA_SHIFT: i32 = 10;
const BETA_SHIFT: i32 = 10;
const BETA: i32 = INT_BIAS >> BETA_SHIFT;
const BETA_GAMMA: i32 = INT_BIAS << (GAMMA_SHIFT - BETA_SHIFT);

const INIT_RAD: usize = NET_SIZE >> 3;
const RADIUS_BIAS_SHIFT: i32 = 6;
const RADIUS_BIAS: i32 = 1 << RADIUS_BIAS_SHIFT;
const INIT_RADIUS: i32 = INIT_RAD as i32 * RADIUS_BIAS;
const RADIUS_DEC: i32 = 30;

const ALPHA_BIAS_SHIFT: i32 = 10;
const INIT_ALPHA: i32 = 1 << ALPHA_BIAS_SHIFT;
const RAD_BIAS_SHIFT: i32 = 8;
const RAD_BIAS: i32 = 1 << RAD_BIAS_SHIFT;
const ALPHA_RAD_BIAS: i32 = 1 << (ALPHA_BIAS_SHIFT + RAD_BIAS_SHIFT);

/// A trained color map: 256 palette colors plus a nearest-color lookup.
#[derive(Clone, Debug)]
pub struct NeuQuant {
    colors: Vec<Rgb>,
    sorted: Vec<SortedNeuron>,
    netindex: [usize; 256],
}

#[derive(Clone, Copy, Debug)]
struct SortedNeuron {
    r: i32,
    g: i32,
    b: i32,
    index: u8,
}

impl NeuQuant {
    /// Train a network on `pixels` (packed RGB triples, row-major).
    ///
    /// `sample_factor` 1 visits every pixel; larger values subsample for speed. Zero is treated
    /// as 1. Trailing bytes that don't form a full triple are ignored.
    pub fn new(pixels: &[u8], sample_factor: u32) -> Self {
        let mut net = Network::new();
        net.learn(pixels, sample_factor);
        let colors = net.unbias();
        Self::from_colors(colors)
    }

    fn from_colors(colors: Vec<Rgb>) -> Self {
        let mut sorted: Vec<SortedNeuron> = colors
            .iter()
            .enumerate()
            .map(|(i, c)| SortedNeuron {
                r: i32::from(c.r),
                g: i32::from(c.g),
                b: i32::from(c.b),
                index: i as u8,
            })
            .collect();
        sorted.sort_by_key(|n| n.g);

        let mut netindex = [0usize; 256];
        let mut previous_col = 0usize;
        let mut start_pos = 0usize;
        for (i, n) in sorted.iter().enumerate() {
            let g = n.g as usize;
            if g != previous_col {
                netindex[previous_col] = (start_pos + i) >> 1;
                for slot in &mut netindex[previous_col + 1..g] {
                    *slot = i;
                }
                previous_col = g;
                start_pos = i;
            }
        }
        netindex[previous_col] = (start_pos + MAX_NET_POS) >> 1;
        for slot in &mut netindex[previous_col + 1..] {
            *slot = MAX_NET_POS;
        }

        Self {
            colors,
            sorted,
            netindex,
        }
    }

    /// Palette colors in neuron order; always [`NET_SIZE`] entries.
    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    /// Palette as packed RGB bytes (768 bytes).
    pub fn color_map_rgb(&self) -> Vec<u8> {
        self.colors.iter().flat_map(|c| c.to_array()).collect()
    }

    /// Index of the palette entry nearest to `c` (Manhattan distance).
    ///
    /// The search starts at the green-sorted position of `c.g` and walks outwards in both
    /// directions, abandoning a direction once the green difference alone exceeds the best
    /// distance found so far.
    pub fn index_of(&self, c: Rgb) -> u8 {
        let (r, g, b) = (i32::from(c.r), i32::from(c.g), i32::from(c.b));
        let mut best_d = 1000;
        let mut best = 0u8;

        let mut up = self.netindex[usize::from(c.g)];
        let mut down = up.checked_sub(1);
        while up < NET_SIZE || down.is_some() {
            if up < NET_SIZE {
                let n = self.sorted[up];
                let dg = n.g - g;
                if dg >= best_d {
                    up = NET_SIZE;
                } else {
                    up += 1;
                    let mut dist = dg.abs() + (n.r - r).abs();
                    if dist < best_d {
                        dist += (n.b - b).abs();
                        if dist < best_d {
                            best_d = dist;
                            best = n.index;
                        }
                    }
                }
            }
            if let Some(k) = down {
                let n = self.sorted[k];
                let dg = g - n.g;
                if dg >= best_d {
                    down = None;
                } else {
                    down = k.checked_sub(1);
                    let mut dist = dg.abs() + (n.r - r).abs();
                    if dist < best_d {
                        dist += (n.b - b).abs();
                        if dist < best_d {
                            best_d = dist;
                            best = n.index;
                        }
                    }
                }
            }
        }
        best
    }
}

/// Training state; discarded once the palette is built.
struct Network {
    neurons: Vec<[i32; 3]>,
    bias: [i32; NET_SIZE],
    freq: [i32; NET_SIZE],
    radpower: [i32; INIT_RAD],
}

impl Network {
    fn new() -> Self {
        let neurons = (0..NET_SIZE as i32)
            .map(|i| [(i << (NET_BIAS_SHIFT + 8)) / NET_SIZE as i32; 3])
            .collect();
        Self {
            neurons,
            bias: [0; NET_SIZE],
            freq: [INT_BIAS / NET_SIZE as i32; NET_SIZE],
            radpower: [0; INIT_RAD],
        }
    }

    fn learn(&mut self, pixels: &[u8], sample_factor: u32) {
        let len = pixels.len() - pixels.len() % 3;
        let small = len < MIN_PICTURE_BYTES;
        let sample_factor = if small {
            1
        } else {
            (sample_factor as usize).clamp(1, MAX_SAMPLE_FACTOR)
        };

        let alpha_dec = 30 + ((sample_factor - 1) / 3) as i32;
        let sample_pixels = len / (3 * sample_factor);
        let delta = (sample_pixels / N_CYCLES).max(1);
        let step = if small { 3 } else { 3 * stride_prime(len) };

        let mut alpha = INIT_ALPHA;
        let mut radius = INIT_RADIUS;
        let mut rad = radius >> RADIUS_BIAS_SHIFT;
        self.fill_radpower(rad, alpha);

        let mut pix = 0usize;
        for visited in 1..=sample_pixels {
            let sample = [
                i32::from(pixels[pix]) << NET_BIAS_SHIFT,
                i32::from(pixels[pix + 1]) << NET_BIAS_SHIFT,
                i32::from(pixels[pix + 2]) << NET_BIAS_SHIFT,
            ];
            let winner = self.contest(sample);
            self.alter_single(alpha, winner, sample);
            if rad != 0 {
                self.alter_neighbours(rad, winner, sample);
            }

            pix += step;
            if pix >= len {
                pix -= len;
            }

            if visited % delta == 0 {
                alpha -= alpha / alpha_dec;
                radius -= radius / RADIUS_DEC;
                rad = radius >> RADIUS_BIAS_SHIFT;
                if rad <= 1 {
                    rad = 0;
                }
                self.fill_radpower(rad, alpha);
            }
        }
    }

    fn fill_radpower(&mut self, rad: i32, alpha: i32) {
        let rad_sq = rad * rad;
        for (i, slot) in self.radpower.iter_mut().take(rad as usize).enumerate() {
            let i = i as i32;
            *slot = alpha * (((rad_sq - i * i) * RAD_BIAS) / rad_sq);
        }
    }

    /// Returns the bias-adjusted winner; the raw nearest neuron gets the frequency boost.
    fn contest(&mut self, sample: [i32; 3]) -> usize {
        let mut best_d = i32::MAX;
        let mut best_bias_d = i32::MAX;
        let mut best_pos = 0;
        let mut best_bias_pos = 0;

        for (i, n) in self.neurons.iter().enumerate() {
            let dist =
                (n[0] - sample[0]).abs() + (n[1] - sample[1]).abs() + (n[2] - sample[2]).abs();
            if dist < best_d {
                best_d = dist;
                best_pos = i;
            }
            let bias_dist = dist - (self.bias[i] >> (INT_BIAS_SHIFT - NET_BIAS_SHIFT));
            if bias_dist < best_bias_d {
                best_bias_d = bias_dist;
                best_bias_pos = i;
            }
            let beta_freq = self.freq[i] >> BETA_SHIFT;
            self.freq[i] -= beta_freq;
            self.bias[i] += beta_freq << GAMMA_SHIFT;
        }

        self.freq[best_pos] += BETA;
        self.bias[best_pos] -= BETA_GAMMA;
        best_bias_pos
    }

    fn alter_single(&mut self, alpha: i32, i: usize, sample: [i32; 3]) {
        let n = &mut self.neurons[i];
        for (c, s) in n.iter_mut().zip(sample) {
            *c -= (alpha * (*c - s)) / INIT_ALPHA;
        }
    }

    fn alter_neighbours(&mut self, rad: i32, i: usize, sample: [i32; 3]) {
        let center = i as i32;
        let lo = (center - rad).max(-1);
        let hi = (center + rad).min(NET_SIZE as i32);

        let mut j = center + 1;
        let mut k = center - 1;
        let mut m = 1;
        while j < hi || k > lo {
            let a = self.radpower[m];
            m += 1;
            if j < hi {
                Self::pull(&mut self.neurons[j as usize], a, sample);
                j += 1;
            }
            if k > lo {
                Self::pull(&mut self.neurons[k as usize], a, sample);
                k -= 1;
            }
        }
    }

    fn pull(n: &mut [i32; 3], a: i32, sample: [i32; 3]) {
        for (c, s) in n.iter_mut().zip(sample) {
            *c -= (a * (*c - s)) / ALPHA_RAD_BIAS;
        }
    }

    fn unbias(self) -> Vec<Rgb> {
        self.neurons
            .iter()
            .map(|n| {
                let ch = |v: i32| (v >> NET_BIAS_SHIFT).clamp(0, 255) as u8;
                Rgb::new(ch(n[0]), ch(n[1]), ch(n[2]))
            })
            .collect()
    }
}

fn stride_prime(len: usize) -> usize {
    [PRIME_1, PRIME_2, PRIME_3]
        .into_iter()
        .find(|p| len % p != 0)
        .unwrap_or(PRIME_4)
}

#[cfg(test)]
#[path = "../../tests/unit/quantize/neuquant.rs"]
mod tests;
