//! Conversions between images and the `image` crate. Not used while drawing.

use std::path::Path;

use image::{GrayImage, Luma, RgbaImage};

use crate::buf::{ImageF32, ImageRgbaU8};
use crate::error::Result;
use crate::math_utils::remap;

impl ImageRgbaU8 {
    pub fn from_rgba_image(source: &RgbaImage) -> Result<Self> {
        let (width, height) = (source.width() as usize, source.height() as usize);
        // Pixels are little-endian RGBA words.
        let mut pixels: Vec<u32> = bytemuck::pod_collect_to_vec(source.as_raw());
        pixels.iter_mut().for_each(|pixel| *pixel = u32::from_le(*pixel));
        Self::from_pixels(width, height, &pixels)
    }

    pub fn to_rgba_image(&self) -> RgbaImage {
        let mut pixels = self.to_vec();
        pixels.iter_mut().for_each(|pixel| *pixel = pixel.to_le());
        let bytes = bytemuck::cast_slice::<u32, u8>(&pixels).to_vec();
        // The buffer holds exactly width * height pixels.
        RgbaImage::from_raw(self.width() as u32, self.height() as u32, bytes).unwrap_or_default()
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        self.to_rgba_image().save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }
}

/// Decodes any format the `image` crate reads into an RGBA image.
pub fn load_rgba(path: impl AsRef<Path>) -> Result<ImageRgbaU8> {
    let decoded = image::open(path)?.into_rgba8();
    ImageRgbaU8::from_rgba_image(&decoded)
}

impl ImageF32 {
    /// Maps stored depth values in `near..far` to black..white. Values outside the range
    /// saturate, cleared and non-finite values are black.
    pub fn to_luma_image(&self, near: f32, far: f32) -> GrayImage {
        let mut out = GrayImage::new(self.width() as u32, self.height() as u32);
        for y in 0..self.height() {
            for (x, depth) in self.copy_row(y).into_iter().enumerate() {
                let value = if depth.is_finite() {
                    remap(depth, near..far, 0.0..255.0).clamp(0.0, 255.0) as u8
                } else {
                    0
                };
                out.put_pixel(x as u32, y as u32, Luma([value]));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba_byte_order_is_kept() {
        let mut source = RgbaImage::new(3, 2);
        source.put_pixel(1, 0, image::Rgba([10, 20, 30, 40]));
        let image = ImageRgbaU8::from_rgba_image(&source).unwrap();
        assert_eq!(image.read(1, 0), Some(0x281e_140a));
        assert_eq!(image.to_rgba_image(), source);
    }

    #[test]
    fn every_byte_lands_in_its_channel() {
        let raw: Vec<u8> = (0..5 * 3 * 4).map(|i| i as u8).collect();
        let source = RgbaImage::from_raw(5, 3, raw.clone()).unwrap();
        let image = ImageRgbaU8::from_rgba_image(&source).unwrap();
        assert_eq!(image.read(0, 0), Some(0x0302_0100));
        assert_eq!(image.read(4, 2), Some(u32::from_le_bytes([56, 57, 58, 59])));
        assert_eq!(image.to_rgba_image().into_raw(), raw);
    }

    #[test]
    fn depth_to_luma() {
        let depth = ImageF32::from_pixels(3, 1, &[1.0, 3.0, f32::INFINITY]).unwrap();
        let luma = depth.to_luma_image(1.0, 3.0);
        assert_eq!(luma.as_raw(), &vec![0, 255, 0]);
    }
}
