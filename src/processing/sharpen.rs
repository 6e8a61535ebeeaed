use image::{RgbaImage, imageops};

use crate::config::SharpenOptions;

/// Unsharp mask: add back `amount` of (original - blurred) wherever the
/// difference reaches `threshold`. Alpha is left untouched.
pub fn unsharp_mask(image: &RgbaImage, opts: &SharpenOptions) -> RgbaImage {
    if opts.radius <= 0.0 || opts.amount <= 0.0 {
        return image.clone();
    }
    let blurred = imageops::blur(image, opts.radius);
    let threshold = i16::from(opts.threshold);
    let mut out = image.clone();
    for (dst, soft) in out.pixels_mut().zip(blurred.pixels()) {
        for c in 0..3 {
            let orig = i16::from(dst.0[c]);
            let diff = orig - i16::from(soft.0[c]);
            if diff.abs() < threshold {
                continue;
            }
            let sharpened = f32::from(orig) + f32::from(diff) * opts.amount;
            dst.0[c] = sharpened.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn opts() -> SharpenOptions {
        SharpenOptions::default()
    }

    #[test]
    fn flat_image_is_unchanged() {
        let img = RgbaImage::from_pixel(16, 16, Rgba([90, 120, 200, 255]));
        assert_eq!(unsharp_mask(&img, &opts()), img);
    }

    #[test]
    fn edges_gain_contrast() {
        // left half dark, right half bright
        let img = RgbaImage::from_fn(16, 16, |x, _| {
            if x < 8 {
                Rgba([60, 60, 60, 255])
            } else {
                Rgba([180, 180, 180, 255])
            }
        });
        let out = unsharp_mask(&img, &opts());
        assert!(out.get_pixel(7, 8).0[0] < 60, "dark side of edge should darken");
        assert!(out.get_pixel(8, 8).0[0] > 180, "bright side of edge should brighten");
        assert_eq!(out.get_pixel(0, 8).0[3], 255);
    }

    #[test]
    fn zero_amount_is_identity() {
        let img = RgbaImage::from_fn(8, 8, |x, y| Rgba([(x * 30) as u8, (y * 30) as u8, 0, 255]));
        let o = SharpenOptions {
            amount: 0.0,
            ..opts()
        };
        assert_eq!(unsharp_mask(&img, &o), img);
    }
}
