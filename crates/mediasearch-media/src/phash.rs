//! 256-bit DCT-based perceptual hash.
//!
//! No `phash`-style crate appears anywhere in the reference pack, so the
//! algorithm is implemented directly against the `image` crate already in
//! use elsewhere in this workspace: downsample to 32x32 luma, take a DCT-II
//! over rows then columns, keep the top-left 16x16 block excluding the DC
//! term, and threshold each coefficient against their median.

use image::{imageops::FilterType, GrayImage, Luma};

const DOWNSAMPLE: usize = 32;
const DCT_KEEP: usize = 16;

/// A 256-bit hash, stored as four u64 lanes (MSB-first within each lane).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PHash(pub [u64; 4]);

impl PHash {
    pub fn hamming(&self, other: &PHash) -> u32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }

    /// 64-character lowercase hex encoding, for the `anchor_phash` column.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|lane| format!("{lane:016x}")).collect()
    }

    pub fn from_hex(s: &str) -> Option<PHash> {
        if s.len() != 64 {
            return None;
        }
        let mut lanes = [0u64; 4];
        for (i, lane) in lanes.iter_mut().enumerate() {
            let chunk = &s[i * 16..(i + 1) * 16];
            *lane = u64::from_str_radix(chunk, 16).ok()?;
        }
        Some(PHash(lanes))
    }
}

/// Compute the perceptual hash of an RGB24 frame buffer at `width`x`height`.
pub fn phash_rgb24(rgb: &[u8], width: u32, height: u32) -> PHash {
    let gray = to_luma(rgb, width, height);
    phash_luma(&gray)
}

pub fn to_luma(rgb: &[u8], width: u32, height: u32) -> GrayImage {
    let mut gray = GrayImage::new(width, height);
    for (i, px) in rgb.chunks_exact(3).enumerate() {
        let (r, g, b) = (px[0] as f32, px[1] as f32, px[2] as f32);
        let y = 0.299 * r + 0.587 * g + 0.114 * b;
        let x = (i as u32) % width;
        let yy = (i as u32) / width;
        gray.put_pixel(x, yy, Luma([y.round().clamp(0.0, 255.0) as u8]));
    }
    gray
}

pub fn phash_luma(gray: &GrayImage) -> PHash {
    let small = image::imageops::resize(
        gray,
        DOWNSAMPLE as u32,
        DOWNSAMPLE as u32,
        FilterType::Triangle,
    );

    let mut pixels = [[0f64; DOWNSAMPLE]; DOWNSAMPLE];
    for y in 0..DOWNSAMPLE {
        for x in 0..DOWNSAMPLE {
            pixels[y][x] = small.get_pixel(x as u32, y as u32).0[0] as f64;
        }
    }

    let rows_dct = apply_dct_rows(&pixels);
    let full_dct = apply_dct_cols(&rows_dct);

    // Top-left DCT_KEEP x DCT_KEEP block, excluding the DC coefficient (0,0).
    let mut coeffs = Vec::with_capacity(DCT_KEEP * DCT_KEEP - 1);
    for y in 0..DCT_KEEP {
        for x in 0..DCT_KEEP {
            if x == 0 && y == 0 {
                continue;
            }
            coeffs.push(full_dct[y][x]);
        }
    }

    let median = median_of(&coeffs);

    let mut bits = [0u64; 4];
    for (i, &c) in coeffs.iter().enumerate() {
        if c > median {
            let lane = i / 64;
            let offset = i % 64;
            bits[lane] |= 1u64 << offset;
        }
    }

    PHash(bits)
}

fn median_of(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Naive O(N^2) 1-D DCT-II applied to every row.
fn apply_dct_rows(input: &[[f64; DOWNSAMPLE]; DOWNSAMPLE]) -> [[f64; DOWNSAMPLE]; DOWNSAMPLE] {
    let mut out = [[0f64; DOWNSAMPLE]; DOWNSAMPLE];
    for (y, row) in input.iter().enumerate() {
        out[y] = dct_1d(row);
    }
    out
}

/// Applies the same 1-D DCT to every column of a row-transformed matrix.
fn apply_dct_cols(input: &[[f64; DOWNSAMPLE]; DOWNSAMPLE]) -> [[f64; DOWNSAMPLE]; DOWNSAMPLE] {
    let mut out = [[0f64; DOWNSAMPLE]; DOWNSAMPLE];
    for x in 0..DOWNSAMPLE {
        let mut col = [0f64; DOWNSAMPLE];
        for y in 0..DOWNSAMPLE {
            col[y] = input[y][x];
        }
        let transformed = dct_1d(&col);
        for y in 0..DOWNSAMPLE {
            out[y][x] = transformed[y];
        }
    }
    out
}

fn dct_1d(input: &[f64; DOWNSAMPLE]) -> [f64; DOWNSAMPLE] {
    let n = DOWNSAMPLE as f64;
    let mut out = [0f64; DOWNSAMPLE];
    for (k, slot) in out.iter_mut().enumerate() {
        let mut sum = 0.0;
        for (i, &x) in input.iter().enumerate() {
            sum += x * ((std::f64::consts::PI / n) * (i as f64 + 0.5) * k as f64).cos();
        }
        let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
        *slot = sum * scale;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_frames_hash_identically() {
        let rgb = vec![128u8; (4 * 4 * 3) as usize];
        let a = phash_rgb24(&rgb, 4, 4);
        let b = phash_rgb24(&rgb, 4, 4);
        assert_eq!(a.hamming(&b), 0);
    }

    #[test]
    fn distinct_patterns_produce_distance() {
        let mut checker = vec![0u8; 32 * 32 * 3];
        for y in 0..32usize {
            for x in 0..32usize {
                let v: u8 = if (x / 4 + y / 4) % 2 == 0 { 20 } else { 235 };
                let idx = (y * 32 + x) * 3;
                checker[idx] = v;
                checker[idx + 1] = v;
                checker[idx + 2] = v;
            }
        }
        let flat = vec![128u8; 32 * 32 * 3];

        let a = phash_rgb24(&checker, 32, 32);
        let b = phash_rgb24(&flat, 32, 32);
        assert!(a.hamming(&b) > 0);
    }

    #[test]
    fn hamming_is_symmetric() {
        let a = PHash([0xFF00, 0x00FF, 0xAAAA, 0x5555]);
        let b = PHash([0x0F0F, 0xF0F0, 0x1111, 0x2222]);
        assert_eq!(a.hamming(&b), b.hamming(&a));
    }

    #[test]
    fn hex_roundtrips() {
        let h = PHash([0x1234_5678_9abc_def0, 0, u64::MAX, 42]);
        let hex = h.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(PHash::from_hex(&hex), Some(h));
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        assert_eq!(PHash::from_hex("abcd"), None);
    }
}
