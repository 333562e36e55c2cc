//! Mipmapped textures.
//!
//! A [`Texture`] holds the texels of an RGBA image whose sides are powers of two. Generating the pyramid
//! copies every layer, largest first, into one contiguous allocation; the [`TextureView`]
//! handed to the sampler always has [`MIP_BIN_COUNT`] layer bins so sampling never branches
//! on how many layers actually exist.

use crate::buf::ImageRgbaU8;
use crate::error::{RasterError, Result};
use crate::math_utils::is_power_of_two;

pub const MIP_BIN_COUNT: usize = 5;
pub const MIN_TEXTURE_SIZE: usize = 1 << 5;
pub const MAX_TEXTURE_SIZE: usize = 1 << 14;

/// Sub-pixel units per texel.
pub const TEXEL_SUB_PIXELS: u32 = 256;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Filtering {
    Nearest,
    #[default]
    Bilinear,
}

/// One mip level inside a texture's pixel data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextureLayer {
    /// Index of texel (0, 0) in the view's pixel slice.
    pub start: usize,
    pub width_shift: u32,
    pub width_mask: u32,
    pub height_mask: u32,
    pub width: u32,
    pub height: u32,
    pub sub_width: u32,
    pub sub_height: u32,
}

impl TextureLayer {
    /// A single texel, which every coordinate wraps onto.
    const SINGLE: TextureLayer = TextureLayer {
        start: 0,
        width_shift: 0,
        width_mask: 0,
        height_mask: 0,
        width: 1,
        height: 1,
        sub_width: TEXEL_SUB_PIXELS,
        sub_height: TEXEL_SUB_PIXELS,
    };

    fn new(start: usize, width: usize, height: usize) -> Self {
        debug_assert!(is_power_of_two(width) && is_power_of_two(height));
        debug_assert!(width >= MIN_TEXTURE_SIZE && height >= MIN_TEXTURE_SIZE, "mip layer below minimum size");
        TextureLayer {
            start,
            width_shift: width.trailing_zeros(),
            width_mask: width as u32 - 1,
            height_mask: height as u32 - 1,
            width: width as u32,
            height: height as u32,
            sub_width: width as u32 * TEXEL_SUB_PIXELS,
            sub_height: height as u32 * TEXEL_SUB_PIXELS,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        (self.width * self.height) as usize
    }
}

/// Read-only description of a texture's layers, borrowed from a [`Texture`].
#[derive(Clone, Copy, Debug)]
pub struct TextureView<'a> {
    pub(crate) pixels: &'a [u32],
    pub(crate) layers: [TextureLayer; MIP_BIN_COUNT],
    pub(crate) layer_count: usize,
    pub(crate) filtering: Filtering,
}

impl<'a> TextureView<'a> {
    /// Stands in for an absent texture: one transparent black texel in every bin.
    pub const EMPTY: TextureView<'static> = TextureView {
        pixels: &[0],
        layers: [TextureLayer::SINGLE; MIP_BIN_COUNT],
        layer_count: 1,
        filtering: Filtering::Bilinear,
    };

    #[inline]
    pub fn layer(&self, bin: usize) -> &TextureLayer {
        &self.layers[bin]
    }

    #[inline]
    pub fn layer_count(&self) -> usize {
        self.layer_count
    }

    /// Texels of one layer, row by row.
    pub fn layer_pixels(&self, bin: usize) -> &'a [u32] {
        let layer = &self.layers[bin];
        &self.pixels[layer.start..layer.start + layer.len()]
    }
}

/// Number of layers a pyramid over a `width` x `height` image gets.
pub fn pyramid_layer_count(width: usize, height: usize) -> usize {
    let halvings = (width.min(height) / MIN_TEXTURE_SIZE).max(1).trailing_zeros() as usize;
    (halvings + 1).min(MIP_BIN_COUNT)
}

pub fn is_valid_texture_size(width: usize, height: usize) -> bool {
    let in_range = |n: usize| is_power_of_two(n) && (MIN_TEXTURE_SIZE..=MAX_TEXTURE_SIZE).contains(&n);
    in_range(width) && in_range(height)
}

/// Nearest power of two in the texture size range. Ties between two powers round up.
fn texture_side(n: usize) -> usize {
    let up = n.next_power_of_two();
    let side = if up / 2 >= 1 && n - up / 2 < up - n { up / 2 } else { up };
    side.clamp(MIN_TEXTURE_SIZE, MAX_TEXTURE_SIZE)
}

/// Average of two packed pixels per channel, losing the lowest bit of each channel.
#[inline(always)]
pub fn average2(a: u32, b: u32) -> u32 {
    ((a >> 1) & 0x7f7f_7f7f) + ((b >> 1) & 0x7f7f_7f7f)
}

#[inline(always)]
pub fn average4(top_left: u32, top_right: u32, bottom_left: u32, bottom_right: u32) -> u32 {
    average2(average2(top_left, top_right), average2(bottom_left, bottom_right))
}

/// Writes the 2x2 box-filtered half-size copy of `src` into `dst`.
fn downsample(src: &[u32], width: usize, height: usize, dst: &mut [u32]) {
    let (half_width, half_height) = (width / 2, height / 2);
    debug_assert_eq!(dst.len(), half_width * half_height);
    for (y, row) in dst.chunks_exact_mut(half_width).enumerate().take(half_height) {
        let top = &src[2 * y * width..][..width];
        let bottom = &src[(2 * y + 1) * width..][..width];
        for (x, out) in row.iter_mut().enumerate() {
            *out = average4(top[2 * x], top[2 * x + 1], bottom[2 * x], bottom[2 * x + 1]);
        }
    }
}

/// RGBA texels with an optional mip pyramid. The texture owns its texels, so nothing can
/// change them while a [`TextureView`] borrows them.
pub struct Texture {
    width: usize,
    height: usize,
    texels: Vec<u32>,
    /// All layers in one allocation, kept after `remove_pyramid` so regenerating is cheap.
    pyramid: Option<Vec<u32>>,
    pyramid_layers: usize,
    layer_count: usize,
    filtering: Filtering,
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("layer_count", &self.layer_count)
            .field("filtering", &self.filtering)
            .finish()
    }
}

impl Texture {
    /// Copies an image whose sides are powers of two in `32..=16384` and whose rows carry no
    /// padding.
    pub fn new(image: ImageRgbaU8) -> Result<Self> {
        let (width, height) = (image.width(), image.height());
        if !is_valid_texture_size(width, height) || !image.is_packed() {
            return Err(RasterError::InvalidTextureSize {
                width,
                height,
                min: MIN_TEXTURE_SIZE,
                max: MAX_TEXTURE_SIZE,
            });
        }
        Ok(Texture {
            width,
            height,
            texels: image.to_vec(),
            pyramid: None,
            pyramid_layers: 0,
            layer_count: 1,
            filtering: Filtering::default(),
        })
    }

    /// Builds a mipmapped texture from any image. Images that cannot be textures as they are
    /// get resampled to the nearest valid power of two size first.
    pub fn new_mipmapped(image: ImageRgbaU8) -> Result<Self> {
        let (width, height) = (image.width(), image.height());
        let image = if is_valid_texture_size(width, height) && image.is_packed() {
            image
        } else {
            let (new_width, new_height) = (texture_side(width), texture_side(height));
            tracing::debug!(width, height, new_width, new_height, "resampling image to a texture size");
            image.resize_bilinear(new_width, new_height)?
        };
        let mut texture = Texture::new(image)?;
        if let Err(err) = texture.generate_pyramid() {
            tracing::warn!(%err, "mipmap generation abandoned, sampling the full resolution image");
        }
        Ok(texture)
    }

    pub fn with_filtering(mut self, filtering: Filtering) -> Self {
        self.filtering = filtering;
        self
    }

    pub fn set_filtering(&mut self, filtering: Filtering) {
        self.filtering = filtering;
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Full resolution texel at `(x, y)`.
    pub fn texel(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.texels.get(y * self.width + x).copied()
    }

    pub fn layer_count(&self) -> usize {
        self.layer_count
    }

    pub fn has_mipmaps(&self) -> bool {
        self.layer_count > 1
    }

    /// Builds the mip pyramid. On failure the texture keeps sampling the original image.
    pub fn generate_pyramid(&mut self) -> Result<()> {
        let (width, height) = (self.width, self.height);
        let count = pyramid_layer_count(width, height);
        if count < 2 {
            return Ok(());
        }
        if self.pyramid.is_some() && self.pyramid_layers == count {
            self.layer_count = count;
            return Ok(());
        }

        let total: usize = (0..count).map(|i| (width >> i) * (height >> i)).sum();
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(total)
            .map_err(|_| RasterError::AllocationFailed { bytes: total * 4 })?;
        pixels.resize(total, 0);
        pixels[..width * height].copy_from_slice(&self.texels);

        let mut start = 0;
        for level in 1..count {
            let (w, h) = (width >> (level - 1), height >> (level - 1));
            let (done, rest) = pixels.split_at_mut(start + w * h);
            downsample(&done[start..], w, h, &mut rest[..(w / 2) * (h / 2)]);
            start += w * h;
        }

        tracing::debug!(width, height, layers = count, "generated mip pyramid");
        self.pyramid = Some(pixels);
        self.pyramid_layers = count;
        self.layer_count = count;
        Ok(())
    }

    /// Samples the original image again. The pyramid memory is kept for a later
    /// [`Texture::generate_pyramid`].
    pub fn remove_pyramid(&mut self) {
        self.layer_count = 1;
    }

    pub fn view(&self) -> TextureView<'_> {
        let (width, height) = (self.width, self.height);
        let (pixels, count) = match &self.pyramid {
            Some(pyramid) if self.layer_count > 1 => (pyramid.as_slice(), self.layer_count),
            _ => (self.texels.as_slice(), 1),
        };

        let mut layers = [TextureLayer::default(); MIP_BIN_COUNT];
        let mut start = 0;
        for (level, layer) in layers.iter_mut().enumerate().take(count) {
            let (w, h) = (width >> level, height >> level);
            *layer = TextureLayer::new(start, w, h);
            start += w * h;
        }
        for bin in count..MIP_BIN_COUNT {
            layers[bin] = layers[count - 1];
        }

        TextureView {
            pixels,
            layers,
            layer_count: count,
            filtering: self.filtering,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: usize, height: usize, color: u32) -> ImageRgbaU8 {
        let mut image = ImageRgbaU8::new(width, height).unwrap();
        image.fill(color);
        image
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn texels_are_a_private_copy() {
        assert_send_sync::<Texture>();
        let mut image = solid(32, 32, 1);
        let texture = Texture::new(image.clone()).unwrap();
        let texels = texture.view().layer_pixels(0);
        assert!(image.write(0, 0, 99));
        assert_eq!(image.read(0, 0), Some(99));
        assert_eq!(texels[0], 1);
        assert_eq!(texture.texel(0, 0), Some(1));
        assert_eq!(texture.texel(32, 0), None);
    }

    #[test]
    fn empty_view_samples_one_black_texel() {
        let view = TextureView::EMPTY;
        assert_eq!(view.layer_count(), 1);
        for bin in 0..MIP_BIN_COUNT {
            assert_eq!(view.layer_pixels(bin), &[0]);
        }
    }

    #[test]
    fn rejects_invalid_sizes() {
        assert!(Texture::new(solid(48, 32, 0)).is_err());
        assert!(Texture::new(solid(16, 16, 0)).is_err());
        assert!(Texture::new(solid(64, 32, 0)).is_ok());
    }

    #[test]
    fn layer_counts() {
        assert_eq!(pyramid_layer_count(32, 32), 1);
        assert_eq!(pyramid_layer_count(64, 32), 1);
        assert_eq!(pyramid_layer_count(128, 128), 3);
        assert_eq!(pyramid_layer_count(2048, 2048), 5);
    }

    #[test]
    fn pyramid_is_contiguous_and_sized_by_geometric_sum() {
        let mut texture = Texture::new(solid(256, 128, 0xffff_ffff)).unwrap();
        texture.generate_pyramid().unwrap();
        let view = texture.view();
        assert_eq!(view.layer_count(), 3);
        assert_eq!(view.pixels.len(), 256 * 128 + 128 * 64 + 64 * 32);
        for level in 1..3 {
            let prev = view.layer(level - 1);
            let layer = view.layer(level);
            assert_eq!(layer.start, prev.start + prev.len());
            assert_eq!(layer.width, prev.width / 2);
            assert_eq!(layer.height, prev.height / 2);
        }
        // Unused bins repeat the last layer.
        assert_eq!(view.layer(3), view.layer(2));
        assert_eq!(view.layer(4), view.layer(2));
    }

    #[test]
    fn averaging_drops_one_bit() {
        assert_eq!(average2(0xffff_ffff, 0xffff_ffff), 0xfefe_fefe);
        assert_eq!(average4(0x0000_0004, 0x0000_0004, 0x0000_0000, 0x0000_0000), 0x0000_0002);
        let mut texture = Texture::new(solid(64, 64, 0xffff_ffff)).unwrap();
        texture.generate_pyramid().unwrap();
        assert!(texture.view().layer_pixels(1).iter().all(|&p| p == 0xfefe_fefe));
    }

    #[test]
    fn removing_pyramid_samples_original() {
        let mut texture = Texture::new(solid(64, 64, 0x1234_5678)).unwrap();
        texture.generate_pyramid().unwrap();
        assert!(texture.has_mipmaps());
        texture.remove_pyramid();
        let view = texture.view();
        assert_eq!(view.layer_count(), 1);
        assert_eq!(view.layer(4).width, 64);
        assert!(view.layer_pixels(0).iter().all(|&p| p == 0x1234_5678));
        texture.generate_pyramid().unwrap();
        assert_eq!(texture.layer_count(), 2);
    }

    #[test]
    fn odd_sized_images_are_resampled() {
        let texture = Texture::new_mipmapped(solid(100, 20, 0xff00_00ff)).unwrap();
        assert_eq!((texture.width(), texture.height()), (128, 32));
        assert_eq!(texture.layer_count(), 1);
        assert!(texture.view().layer_pixels(0).iter().all(|&p| p == 0xff00_00ff));
    }
}
