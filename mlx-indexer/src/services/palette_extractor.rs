//! Cover-art palette extraction
//!
//! Downscales the image, buckets pixels at 4 bits per channel and reports the
//! most frequent buckets as their average color.

use crate::models::{Palette, PaletteColor};
use crate::services::collaborators::{ExtractError, PaletteExtractor};
use image::{DynamicImage, RgbImage};
use std::collections::HashMap;
use std::path::Path;

/// Longest thumbnail edge sampled for the histogram
const SAMPLE_EDGE: u32 = 64;

#[derive(Debug, Clone, Copy)]
pub struct ImagePaletteExtractor {
    max_colors: usize,
}

impl ImagePaletteExtractor {
    pub fn new(max_colors: usize) -> Self {
        Self {
            max_colors: max_colors.max(1),
        }
    }
}

impl Default for ImagePaletteExtractor {
    fn default() -> Self {
        Self::new(5)
    }
}

impl PaletteExtractor for ImagePaletteExtractor {
    fn extract(&self, image_path: &Path) -> Result<Palette, ExtractError> {
        let bytes =
            std::fs::read(image_path).map_err(|e| ExtractError::Unreadable(e.to_string()))?;
        let image =
            image::load_from_memory(&bytes).map_err(|e| ExtractError::Decode(e.to_string()))?;
        Ok(palette_from_image(&image, self.max_colors))
    }
}

#[derive(Default)]
struct Bucket {
    count: u64,
    sum: [u64; 3],
}

/// Dominant colors of an already-decoded image
pub fn palette_from_image(image: &DynamicImage, max_colors: usize) -> Palette {
    let sample: RgbImage = image.thumbnail(SAMPLE_EDGE, SAMPLE_EDGE).to_rgb8();
    let total = u64::from(sample.width()) * u64::from(sample.height());
    if total == 0 {
        return Palette::default();
    }

    let mut buckets: HashMap<(u8, u8, u8), Bucket> = HashMap::new();
    for pixel in sample.pixels() {
        let [r, g, b] = pixel.0;
        let bucket = buckets.entry((r >> 4, g >> 4, b >> 4)).or_default();
        bucket.count += 1;
        bucket.sum[0] += u64::from(r);
        bucket.sum[1] += u64::from(g);
        bucket.sum[2] += u64::from(b);
    }

    let mut ranked: Vec<((u8, u8, u8), Bucket)> = buckets.into_iter().collect();
    // Key as tie-breaker keeps the result independent of hash order
    ranked.sort_by(|a, b| b.1.count.cmp(&a.1.count).then(a.0.cmp(&b.0)));

    let colors = ranked
        .into_iter()
        .take(max_colors)
        .map(|(_, bucket)| {
            let avg = |i: usize| (bucket.sum[i] / bucket.count) as u8;
            PaletteColor {
                hex: format!("#{:02x}{:02x}{:02x}", avg(0), avg(1), avg(2)),
                share: bucket.count as f32 / total as f32,
            }
        })
        .collect();

    Palette { colors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_single_color_image() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([255, 0, 0])));
        let palette = palette_from_image(&image, 5);
        assert_eq!(palette.colors.len(), 1);
        assert_eq!(palette.colors[0].hex, "#ff0000");
        assert!((palette.colors[0].share - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_dominant_color_first() {
        let mut img = RgbImage::from_pixel(10, 10, Rgb([0, 0, 255]));
        for x in 0..3 {
            for y in 0..10 {
                img.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        let palette = palette_from_image(&DynamicImage::ImageRgb8(img), 1);
        assert_eq!(palette.colors.len(), 1);
        assert_eq!(palette.colors[0].hex, "#0000ff");
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let extractor = ImagePaletteExtractor::default();
        let err = extractor
            .extract(Path::new("/nonexistent/cover.jpg"))
            .unwrap_err();
        assert!(matches!(err, ExtractError::Unreadable(_)));
    }

    #[test]
    fn test_garbage_bytes_is_decode_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("cover.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();

        let err = ImagePaletteExtractor::default().extract(&path).unwrap_err();
        assert!(matches!(err, ExtractError::Decode(_)));
    }
}
