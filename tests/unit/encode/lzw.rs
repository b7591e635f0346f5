use super::*;

/// Splits an image-data section into (min code size, concatenated sub-block payload),
/// checking the framing on the way.
fn unframe(data: &[u8]) -> (u8, Vec<u8>) {
    let min_code_size = data[0];
    let mut payload = Vec::new();
    let mut pos = 1;
    loop {
        let n = usize::from(data[pos]);
        pos += 1;
        if n == 0 {
            break;
        }
        assert!(n <= MAX_SUB_BLOCK);
        payload.extend_from_slice(&data[pos..pos + n]);
        pos += n;
    }
    assert_eq!(pos, data.len(), "bytes after the block terminator");
    (min_code_size, payload)
}

fn roundtrip(indices: &[u8], color_depth: u8) {
    let data = compress(indices, color_depth);
    let (min_code_size, payload) = unframe(&data);
    let decoded = weezl::decode::Decoder::new(weezl::BitOrder::Lsb, min_code_size)
        .decode(&payload)
        .expect("standard GIF LZW decoder accepts the stream");
    assert_eq!(decoded.len(), indices.len());
    assert!(decoded == indices, "decoded indices differ");
}

fn noise(len: usize, mut seed: u64) -> Vec<u8> {
    (0..len)
        .map(|_| {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            (seed >> 56) as u8
        })
        .collect()
}

#[test]
fn roundtrip_identical_bytes() {
    roundtrip(&vec![0u8; 50_000], 8);
    roundtrip(&vec![7u8; 10_007], 8);
}

#[test]
fn roundtrip_repeated_ramp_crosses_dictionary_resets() {
    let ramp: Vec<u8> = (0..=255u8).cycle().take(256 * 64).collect();
    roundtrip(&ramp, 8);
}

#[test]
fn roundtrip_pseudo_random_bytes() {
    roundtrip(&noise(200_000, 0x2545_f491_4f6c_dd1d), 8);
}

#[test]
fn roundtrip_low_color_depth() {
    let indices: Vec<u8> = noise(9_000, 99).into_iter().map(|b| b & 0b11).collect();
    roundtrip(&indices, 2);
    let indices: Vec<u8> = noise(9_000, 7).into_iter().map(|b| b & 0b1111).collect();
    roundtrip(&indices, 4);
}

#[test]
fn roundtrip_single_and_empty_inputs() {
    roundtrip(&[3], 8);
    roundtrip(&[], 8);
}

#[test]
fn single_pixel_stream_is_byte_exact() {
    // clear(4), 0, eoi(5) as 3-bit codes, LSB first: 0b1_0100_0100 -> 0x44 0x01.
    assert_eq!(compress(&[0], 2), vec![2, 2, 0x44, 0x01, 0]);
}

#[test]
fn color_depth_is_clamped() {
    assert_eq!(compress(&[0, 1, 1, 0], 1)[0], 2);
    assert_eq!(compress(&[0, 1, 1, 0], 0)[0], 2);
    assert_eq!(compress(&[0, 1, 1, 0], 11)[0], 8);
    assert_eq!(LzwEncoder::new(5).min_code_size(), 5);
}

#[test]
fn sub_blocks_are_full_until_the_last() {
    let data = compress(&noise(20_000, 5), 8);
    let mut pos = 1;
    let mut lens = Vec::new();
    while data[pos] != 0 {
        lens.push(usize::from(data[pos]));
        pos += usize::from(data[pos]) + 1;
    }
    assert!(lens.len() > 2);
    let (last, full) = lens.split_last().unwrap();
    assert!(full.iter().all(|n| *n == MAX_SUB_BLOCK));
    assert!(*last >= 1 && *last <= MAX_SUB_BLOCK);
}
