//! Image proxy/thumbnail cascade (spec §4.4).
//!
//! The source file is decoded exactly once. A WebP proxy is derived from the
//! decode, capped at [`PROXY_LONG_EDGE_PX`] on its long edge; the thumbnail is
//! then cascaded from the *proxy*'s in-memory buffer rather than a second read
//! of the source, capped at [`THUMBNAIL_LONG_EDGE_PX`]. Neither stage ever
//! upscales — an image already smaller than the cap is carried through at its
//! native size.

use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

use crate::error::{CacheError, CacheResult};

pub const PROXY_LONG_EDGE_PX: u32 = 768;
pub const THUMBNAIL_LONG_EDGE_PX: u32 = 320;

/// WebP lossy quality used for the proxy. Spacedrive's indexer uses the same
/// `webp` crate for its preview cascade at a comparable quality.
const PROXY_WEBP_QUALITY: f32 = 80.0;
const THUMBNAIL_JPEG_QUALITY: u8 = 82;

pub struct ImageDerivatives {
    pub proxy_bytes: Vec<u8>,
    pub thumbnail_bytes: Vec<u8>,
    pub source_width: u32,
    pub source_height: u32,
}

/// Decode `source` once and produce both the WebP proxy and JPEG thumbnail,
/// writing neither to disk — the caller places them at the paths from
/// [`crate::paths`].
pub fn build_image_cascade(source: &Path) -> CacheResult<ImageDerivatives> {
    let img = image::open(source).map_err(|e| match e {
        image::ImageError::IoError(io) => CacheError::io(source, io),
        other => CacheError::Image(other),
    })?;

    let (source_width, source_height) = img.dimensions();

    let proxy_img = resize_within(&img, PROXY_LONG_EDGE_PX);
    let proxy_bytes = encode_webp(&proxy_img)?;

    let thumb_img = resize_within(&proxy_img, THUMBNAIL_LONG_EDGE_PX);
    let thumbnail_bytes = encode_jpeg(&thumb_img)?;

    Ok(ImageDerivatives {
        proxy_bytes,
        thumbnail_bytes,
        source_width,
        source_height,
    })
}

/// Resize so the long edge is at most `max_edge`, preserving aspect ratio.
/// Never upscales: if the image is already within bounds it is returned
/// unchanged (cloned, since callers need an owned buffer to cascade from).
fn resize_within(img: &DynamicImage, max_edge: u32) -> DynamicImage {
    let (w, h) = img.dimensions();
    let long_edge = w.max(h);
    if long_edge <= max_edge {
        return img.clone();
    }

    let scale = max_edge as f64 / long_edge as f64;
    let new_w = ((w as f64) * scale).round().max(1.0) as u32;
    let new_h = ((h as f64) * scale).round().max(1.0) as u32;
    img.resize(new_w, new_h, FilterType::Lanczos3)
}

fn encode_webp(img: &DynamicImage) -> CacheResult<Vec<u8>> {
    let rgb = img.to_rgb8();
    let (w, h) = rgb.dimensions();
    let encoder = webp::Encoder::from_rgb(&rgb, w, h);
    let encoded = encoder.encode(PROXY_WEBP_QUALITY);
    Ok(encoded.to_vec())
}

fn encode_jpeg(img: &DynamicImage) -> CacheResult<Vec<u8>> {
    let mut buf = Vec::new();
    let rgb = img.to_rgb8();
    let mut cursor = std::io::Cursor::new(&mut buf);
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, THUMBNAIL_JPEG_QUALITY);
    encoder
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), image::ColorType::Rgb8)
        .map_err(CacheError::Image)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn resize_within_never_upscales() {
        let small = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 50, Rgb([10, 20, 30])));
        let out = resize_within(&small, PROXY_LONG_EDGE_PX);
        assert_eq!(out.dimensions(), (100, 50));
    }

    #[test]
    fn resize_within_caps_long_edge() {
        let big = DynamicImage::ImageRgb8(RgbImage::from_pixel(2000, 1000, Rgb([10, 20, 30])));
        let out = resize_within(&big, PROXY_LONG_EDGE_PX);
        let (w, h) = out.dimensions();
        assert_eq!(w, PROXY_LONG_EDGE_PX);
        assert_eq!(h, PROXY_LONG_EDGE_PX / 2);
    }

    #[test]
    fn cascade_thumbnail_fits_within_bound() {
        let big = DynamicImage::ImageRgb8(RgbImage::from_pixel(4000, 1000, Rgb([200, 100, 50])));
        let proxy = resize_within(&big, PROXY_LONG_EDGE_PX);
        let thumb = resize_within(&proxy, THUMBNAIL_LONG_EDGE_PX);
        let (w, h) = thumb.dimensions();
        assert!(w.max(h) <= THUMBNAIL_LONG_EDGE_PX);
    }
}
