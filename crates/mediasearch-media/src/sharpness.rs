//! Sharpness scoring via Laplacian variance over a luma buffer.
//!
//! Used to pick the sharpest frame within an open scene (spec §4.5.2):
//! frames right after a cut tend to be motion-blurred or mid-transition, so
//! the segmenter prefers the frame with the highest score once a scene has
//! stabilized.

use image::GrayImage;

/// Manual 3x3 Laplacian convolution (kernel: 0 1 0 / 1 -4 1 / 0 1 0),
/// variance of the response across the interior of the image. Borders are
/// skipped rather than padded — cheap at 480px/1fps and avoids edge
/// artifacts from a reflect/clamp boundary policy.
pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (width, height) = gray.dimensions();
    if width < 3 || height < 3 {
        return 0.0;
    }

    let mut responses = Vec::with_capacity(((width - 2) * (height - 2)) as usize);

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let center = gray.get_pixel(x, y).0[0] as f64;
            let up = gray.get_pixel(x, y - 1).0[0] as f64;
            let down = gray.get_pixel(x, y + 1).0[0] as f64;
            let left = gray.get_pixel(x - 1, y).0[0] as f64;
            let right = gray.get_pixel(x + 1, y).0[0] as f64;

            let response = up + down + left + right - 4.0 * center;
            responses.push(response);
        }
    }

    let mean = responses.iter().sum::<f64>() / responses.len() as f64;
    responses.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / responses.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn flat_image_has_zero_sharpness() {
        let img = GrayImage::from_pixel(10, 10, Luma([128]));
        assert_eq!(laplacian_variance(&img), 0.0);
    }

    #[test]
    fn checkerboard_is_sharper_than_flat() {
        let flat = GrayImage::from_pixel(10, 10, Luma([128]));
        let mut checker = GrayImage::new(10, 10);
        for y in 0..10 {
            for x in 0..10 {
                let v = if (x + y) % 2 == 0 { 0 } else { 255 };
                checker.put_pixel(x, y, Luma([v]));
            }
        }
        assert!(laplacian_variance(&checker) > laplacian_variance(&flat));
    }
}
