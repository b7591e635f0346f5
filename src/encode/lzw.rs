//! GIF-flavoured LZW compression.
//!
//! Codes are packed LSB-first, start at `min_code_size + 1` bits and grow to 12 bits. When the
//! dictionary is full a clear code is emitted and the width drops back to its initial value.
//! The packed bytes are framed into length-prefixed sub-blocks of at most 255 bytes.

const MAX_BITS: u32 = 12;
const MAX_MAX_CODE: i32 = 1 << MAX_BITS;
const HASH_SIZE: usize = 5003;
// log2 of how often HASH_SIZE doubles before exceeding 16 bits, subtracted from 8.
const HASH_SHIFT: u32 = 4;
const MAX_SUB_BLOCK: usize = 255;
const EMPTY: i32 = -1;

/// Compress palette indices into a complete image-data section: the minimum code size byte,
/// the sub-block chain and the zero-length terminator.
///
/// `color_depth` is the number of bits needed to address the palette; values below 2 are
/// raised to 2 and values above 8 lowered to 8. Every index must be below
/// `1 << color_depth`.
pub fn compress(indices: &[u8], color_depth: u8) -> Vec<u8> {
    LzwEncoder::new(color_depth).encode(indices)
}

/// Single-use LZW encoder. Owns its own hash table, so concurrent encodes share nothing.
pub struct LzwEncoder {
    min_code_size: u8,
    htab: Vec<i32>,
    codetab: Vec<u16>,
    out: SubBlocks,
    accum: u32,
    acc_bits: u32,
    init_bits: u32,
    n_bits: u32,
    max_code: i32,
    free_ent: i32,
    clear_flag: bool,
    clear_code: i32,
    eoi_code: i32,
}

impl LzwEncoder {
    /// Create an encoder for indices of `color_depth` bits.
    pub fn new(color_depth: u8) -> Self {
        let min_code_size = color_depth.clamp(2, 8);
        let init_bits = u32::from(min_code_size) + 1;
        let clear_code = 1 << min_code_size;
        Self {
            min_code_size,
            htab: vec![EMPTY; HASH_SIZE],
            codetab: vec![0; HASH_SIZE],
            out: SubBlocks::new(min_code_size),
            accum: 0,
            acc_bits: 0,
            init_bits,
            n_bits: init_bits,
            max_code: max_code(init_bits),
            free_ent: clear_code + 2,
            clear_flag: false,
            clear_code,
            eoi_code: clear_code + 1,
        }
    }

    /// Minimum code size written ahead of the sub-blocks.
    pub fn min_code_size(&self) -> u8 {
        self.min_code_size
    }

    /// Encode `indices` and return the framed image-data section.
    pub fn encode(mut self, indices: &[u8]) -> Vec<u8> {
        let mut pixels = indices.iter().copied().map(i32::from);
        self.output(self.clear_code);

        let Some(first) = pixels.next() else {
            return self.finish();
        };
        let mut ent = first;

        'pixels: for c in pixels {
            let fcode = (c << MAX_BITS) + ent;
            let mut i = ((c << HASH_SHIFT) ^ ent) as usize;

            if self.htab[i] == fcode {
                ent = i32::from(self.codetab[i]);
                continue;
            }
            if self.htab[i] >= 0 {
                let disp = if i == 0 { 1 } else { HASH_SIZE - i };
                loop {
                    i = if i >= disp {
                        i - disp
                    } else {
                        i + HASH_SIZE - disp
                    };
                    if self.htab[i] == fcode {
                        ent = i32::from(self.codetab[i]);
                        continue 'pixels;
                    }
                    if self.htab[i] < 0 {
                        break;
                    }
                }
            }

            self.output(ent);
            ent = c;
            if self.free_ent < MAX_MAX_CODE {
                self.codetab[i] = self.free_ent as u16;
                self.free_ent += 1;
                self.htab[i] = fcode;
            } else {
                self.clear_block();
            }
        }

        self.output(ent);
        self.finish()
    }

    fn finish(mut self) -> Vec<u8> {
        self.output(self.eoi_code);
        while self.acc_bits > 0 {
            self.out.push(self.accum as u8);
            self.accum >>= 8;
            self.acc_bits = self.acc_bits.saturating_sub(8);
        }
        self.out.finish()
    }

    fn clear_block(&mut self) {
        self.htab.fill(EMPTY);
        self.free_ent = self.clear_code + 2;
        self.clear_flag = true;
        self.output(self.clear_code);
    }

    fn output(&mut self, code: i32) {
        self.accum &= (1u32 << self.acc_bits) - 1;
        self.accum |= (code as u32) << self.acc_bits;
        self.acc_bits += self.n_bits;
        while self.acc_bits >= 8 {
            self.out.push(self.accum as u8);
            self.accum >>= 8;
            self.acc_bits -= 8;
        }

        if self.clear_flag {
            self.n_bits = self.init_bits;
            self.max_code = max_code(self.n_bits);
            self.clear_flag = false;
        } else if self.free_ent > self.max_code {
            self.n_bits += 1;
            self.max_code = if self.n_bits == MAX_BITS {
                MAX_MAX_CODE
            } else {
                max_code(self.n_bits)
            };
        }
    }
}

fn max_code(bits: u32) -> i32 {
    (1 << bits) - 1
}

/// Accumulates packed bytes into length-prefixed sub-blocks.
struct SubBlocks {
    out: Vec<u8>,
    block: Vec<u8>,
}

impl SubBlocks {
    fn new(min_code_size: u8) -> Self {
        Self {
            out: vec![min_code_size],
            block: Vec::with_capacity(MAX_SUB_BLOCK),
        }
    }

    fn push(&mut self, byte: u8) {
        self.block.push(byte);
        if self.block.len() == MAX_SUB_BLOCK {
            self.flush();
        }
    }

    fn flush(&mut self) {
        if !self.block.is_empty() {
            self.out.push(self.block.len() as u8);
            self.out.extend_from_slice(&self.block);
            self.block.clear();
        }
    }

    fn finish(mut self) -> Vec<u8> {
        self.flush();
        self.out.push(0);
        self.out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/lzw.rs"]
mod tests;
