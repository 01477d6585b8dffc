//! Center-square cover art cropping.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPDecoder;
use image::{ColorType, DynamicImage};
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// JPEG quality used for the cropped cover.
pub const COVER_JPEG_QUALITY: u8 = 90;

/// Largest centered square inside a `width` x `height` image.
///
/// Returns `(x, y, size)`. Offsets use integer division, so odd margins
/// leave the extra pixel on the right or bottom.
pub fn crop_region(width: u32, height: u32) -> (u32, u32, u32) {
    let size = width.min(height);
    ((width - size) / 2, (height - size) / 2, size)
}

/// Decode `bytes`, crop the centered square and re-encode it as JPEG.
///
/// A `"webp"` hint forces the WebP decoder; any other hint falls back to
/// content sniffing. The output is deterministic for a given input.
pub fn crop_cover(bytes: &[u8], format_hint: &str) -> MediaResult<Vec<u8>> {
    let img = decode(bytes, format_hint)?;

    let (x, y, size) = crop_region(img.width(), img.height());
    debug!(
        "Cropping {}x{} cover to {}x{} at ({}, {})",
        img.width(),
        img.height(),
        size,
        size,
        x,
        y
    );

    let rgb = img.crop_imm(x, y, size, size).to_rgb8();

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, COVER_JPEG_QUALITY)
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
        .map_err(|e| MediaError::ImageEncode(e.to_string()))?;

    Ok(buf)
}

fn decode(bytes: &[u8], format_hint: &str) -> MediaResult<DynamicImage> {
    if format_hint.eq_ignore_ascii_case("webp") {
        let decoder =
            WebPDecoder::new(Cursor::new(bytes)).map_err(|e| MediaError::image_decode(e.to_string()))?;
        return DynamicImage::from_decoder(decoder).map_err(|e| MediaError::image_decode(e.to_string()));
    }

    image::load_from_memory(bytes).map_err(|e| MediaError::image_decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::webp::WebPEncoder;
    use image::{ImageOutputFormat, Rgb, RgbImage};

    /// 800x600: red side bands, green center square.
    fn banded() -> RgbImage {
        RgbImage::from_fn(800, 600, |x, _| {
            if (100..700).contains(&x) {
                Rgb([0, 255, 0])
            } else {
                Rgb([255, 0, 0])
            }
        })
    }

    fn banded_png() -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(banded())
            .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
            .unwrap();
        buf
    }

    fn banded_webp() -> Vec<u8> {
        let img = banded();
        let mut buf = Vec::new();
        WebPEncoder::new_lossless(&mut buf)
            .encode(img.as_raw(), img.width(), img.height(), ColorType::Rgb8)
            .unwrap();
        buf
    }

    fn assert_green_square(jpeg: &[u8]) {
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        let out = image::load_from_memory(jpeg).unwrap().to_rgb8();
        assert_eq!(out.dimensions(), (600, 600));

        // Edges of the crop come from the green band only
        for (x, y) in [(5, 300), (594, 300), (300, 300)] {
            let Rgb([r, g, b]) = *out.get_pixel(x, y);
            assert!(r < 40 && g > 200 && b < 40, "pixel ({x}, {y}) = {:?}", (r, g, b));
        }
    }

    #[test]
    fn test_crop_region() {
        assert_eq!(crop_region(800, 600), (100, 0, 600));
        assert_eq!(crop_region(600, 800), (0, 100, 600));
        assert_eq!(crop_region(500, 500), (0, 0, 500));
        assert_eq!(crop_region(1281, 720), (280, 0, 720));
    }

    #[test]
    fn test_crop_cover_centered_square() {
        assert_green_square(&crop_cover(&banded_png(), "png").unwrap());
    }

    #[test]
    fn test_crop_cover_webp_decoder() {
        let webp = banded_webp();
        assert_eq!(&webp[..4], b"RIFF");
        assert_eq!(&webp[8..12], b"WEBP");

        assert_green_square(&crop_cover(&webp, "webp").unwrap());
        assert_green_square(&crop_cover(&webp, "WEBP").unwrap());
    }

    #[test]
    fn test_crop_cover_is_deterministic() {
        let input = banded_png();
        assert_eq!(
            crop_cover(&input, "png").unwrap(),
            crop_cover(&input, "png").unwrap()
        );
    }

    #[test]
    fn test_crop_cover_sniffs_unknown_hint() {
        let jpeg = crop_cover(&banded_png(), "").unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_crop_cover_garbage_input() {
        let err = crop_cover(b"definitely not an image", "jpg").unwrap_err();
        assert!(matches!(err, MediaError::ImageDecode(_)));
    }

    #[test]
    fn test_crop_cover_webp_hint_rejects_png() {
        let err = crop_cover(&banded_png(), "webp").unwrap_err();
        assert!(matches!(err, MediaError::ImageDecode(_)));
    }
}
