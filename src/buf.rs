//! Aligned, reference-counted pixel storage.
//!
//! An [`Image`] is a shallow handle: cloning it shares the pixels. Handles are neither `Send`
//! nor `Sync`, so every handle to an allocation lives on one thread. Drawing writes through a
//! shared handle on that thread. The command queue's tile executor is the only place that
//! writes from several threads, and it gives each worker its own rows while the owning thread
//! waits for the dispatch.
//!
//! ```compile_fail
//! fn shared_across_threads<T: Sync>() {}
//! shared_across_threads::<quadraster::ImageRgbaU8>();
//! ```

use std::alloc::Layout;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::rc::Rc;

use crate::error::{RasterError, Result};
use crate::math::IRect;

/// Minimum alignment of every allocation and of every row start.
pub const SIMD_ALIGNMENT: usize = 16;

pub type ImageRgbaU8 = Image<u32>;
pub type ImageF32 = Image<f32>;

/// Element types an [`Image`] can hold.
pub trait Pixel: bytemuck::Pod + Send + Sync {}

impl<P: bytemuck::Pod + Send + Sync> Pixel for P {}

pub(crate) struct Allocation {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl Allocation {
    pub(crate) fn zeroed(size: usize, align: usize) -> Result<Self> {
        let failed = || RasterError::AllocationFailed { bytes: size };
        let layout = Layout::from_size_align(size.max(1), align).map_err(|_| failed())?;
        // SAFETY: the layout has a non-zero size.
        let ptr = unsafe { std::alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(ptr).ok_or_else(failed)?;
        Ok(Allocation { ptr, layout })
    }

    pub(crate) fn size(&self) -> usize {
        self.layout.size()
    }

    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }
}

impl Drop for Allocation {
    fn drop(&mut self) {
        // SAFETY: allocated in `zeroed` with the same layout.
        unsafe { std::alloc::dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

/// Raw pixel pointer that is range checked in debug builds and a plain pointer otherwise.
#[derive(Clone, Copy)]
pub struct SafePtr<P> {
    ptr: *mut P,
    #[cfg(debug_assertions)]
    len: usize,
}

impl<P: Copy> SafePtr<P> {
    /// # Safety
    /// `ptr` must be valid for reads and writes of `len` elements for as long as the pointer is
    /// used.
    #[inline(always)]
    pub unsafe fn new(ptr: *mut P, len: usize) -> Self {
        let _ = len;
        SafePtr {
            ptr,
            #[cfg(debug_assertions)]
            len,
        }
    }

    #[inline(always)]
    fn check(&self, _index: usize) {
        #[cfg(debug_assertions)]
        assert!(_index < self.len, "pixel index {_index} out of range 0..{}", self.len);
    }

    /// # Safety
    /// `index` must lie inside the range the pointer was created with.
    #[inline(always)]
    pub unsafe fn read(&self, index: usize) -> P {
        self.check(index);
        unsafe { self.ptr.add(index).read() }
    }

    /// # Safety
    /// `index` must lie inside the range the pointer was created with, and no other thread may
    /// access the same element concurrently.
    #[inline(always)]
    pub unsafe fn write(&self, index: usize, value: P) {
        self.check(index);
        unsafe { self.ptr.add(index).write(value) }
    }
}

/// Row-strided pixel grid backed by a shared aligned allocation.
pub struct Image<P> {
    alloc: Rc<Allocation>,
    width: usize,
    height: usize,
    /// Bytes between the starts of two consecutive rows.
    stride: usize,
    /// Bytes from the allocation start to pixel (0, 0).
    offset: usize,
    sub_image: bool,
    _marker: PhantomData<P>,
}

impl<P> Clone for Image<P> {
    fn clone(&self) -> Self {
        Image {
            alloc: Rc::clone(&self.alloc),
            width: self.width,
            height: self.height,
            stride: self.stride,
            offset: self.offset,
            sub_image: self.sub_image,
            _marker: PhantomData,
        }
    }
}

impl<P> std::fmt::Debug for Image<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("offset", &self.offset)
            .field("sub_image", &self.sub_image)
            .finish()
    }
}

fn round_up(value: usize, align: usize) -> Option<usize> {
    Some(value.checked_add(align - 1)? / align * align)
}

impl<P: Pixel> Image<P> {
    /// Zero-initialized image whose rows are padded to [`SIMD_ALIGNMENT`].
    pub fn new(width: usize, height: usize) -> Result<Self> {
        Self::with_alignment(width, height, SIMD_ALIGNMENT)
    }

    /// Zero-initialized image with rows padded to `alignment` bytes, which is raised to at
    /// least [`SIMD_ALIGNMENT`].
    pub fn with_alignment(width: usize, height: usize, alignment: usize) -> Result<Self> {
        let pixel_size = std::mem::size_of::<P>();
        let alignment = alignment.max(SIMD_ALIGNMENT).next_power_of_two();
        let invalid = || RasterError::InvalidImageSize { width, height };
        if width == 0 || height == 0 || alignment % pixel_size != 0 {
            return Err(invalid());
        }
        let stride = width
            .checked_mul(pixel_size)
            .and_then(|row| round_up(row, alignment))
            .ok_or_else(invalid)?;
        let size = stride.checked_mul(height).ok_or_else(invalid)?;
        let alloc = Allocation::zeroed(size, alignment)?;
        Ok(Image {
            alloc: Rc::new(alloc),
            width,
            height,
            stride,
            offset: 0,
            sub_image: false,
            _marker: PhantomData,
        })
    }

    /// Tightly packed image, one row after the other. Used for textures, which may not carry
    /// row padding.
    pub(crate) fn packed(width: usize, height: usize) -> Result<Self> {
        let invalid = || RasterError::InvalidImageSize { width, height };
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        let stride = width.checked_mul(std::mem::size_of::<P>()).ok_or_else(invalid)?;
        let size = stride.checked_mul(height).ok_or_else(invalid)?;
        let alloc = Allocation::zeroed(size, SIMD_ALIGNMENT)?;
        Ok(Image {
            alloc: Rc::new(alloc),
            width,
            height,
            stride,
            offset: 0,
            sub_image: false,
            _marker: PhantomData,
        })
    }

    /// Copies `pixels`, given row by row without padding, into a new image.
    pub fn from_pixels(width: usize, height: usize, pixels: &[P]) -> Result<Self> {
        if pixels.len() != width.saturating_mul(height) {
            return Err(RasterError::InvalidImageSize { width, height });
        }
        let mut image = Self::new(width, height)?;
        for (y, row) in pixels.chunks_exact(width).enumerate() {
            image.write_row(y, row);
        }
        Ok(image)
    }

    /// View of `rect` sharing this image's pixels.
    pub fn sub_image(&self, rect: IRect) -> Result<Self> {
        let fits = rect.x >= 0
            && rect.y >= 0
            && !rect.is_empty()
            && rect.right() as usize <= self.width
            && rect.bottom() as usize <= self.height;
        if !fits {
            return Err(RasterError::InvalidSubImage {
                rect,
                width: self.width,
                height: self.height,
            });
        }
        Ok(Image {
            alloc: Rc::clone(&self.alloc),
            width: rect.width as usize,
            height: rect.height as usize,
            stride: self.stride,
            offset: self.offset + rect.y as usize * self.stride + rect.x as usize * std::mem::size_of::<P>(),
            sub_image: true,
            _marker: PhantomData,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row stride in bytes.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Row stride in pixels.
    #[inline]
    pub fn pixel_stride(&self) -> usize {
        self.stride / std::mem::size_of::<P>()
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn is_sub_image(&self) -> bool {
        self.sub_image
    }

    pub fn rect(&self) -> IRect {
        IRect::from_size(self.width as i32, self.height as i32)
    }

    /// True if both handles view the same allocation.
    pub fn shares_pixels_with(&self, other: &Image<P>) -> bool {
        Rc::ptr_eq(&self.alloc, &other.alloc)
    }

    /// Allocation and absolute first row. Handles that agree on both map row `y` to the same
    /// memory, so tiles of disjoint rows stay disjoint across them.
    pub(crate) fn row_origin(&self) -> (*const Allocation, usize) {
        (Rc::as_ptr(&self.alloc), self.offset / self.stride)
    }

    #[inline(always)]
    fn origin(&self) -> *mut P {
        // SAFETY: `offset` is inside the allocation by construction.
        unsafe { self.alloc.as_ptr().add(self.offset).cast::<P>() }
    }

    /// Pointer to the `width` pixels of row `y`. Writing through it is how drawing mutates an
    /// image behind a shared handle.
    #[inline(always)]
    pub(crate) fn row_ptr(&self, y: usize) -> SafePtr<P> {
        debug_assert!(y < self.height, "row {y} out of range 0..{}", self.height);
        // SAFETY: the row lies inside the allocation and only `width` pixels are exposed, so a
        // sub-image never reaches its parent's pixels right of it.
        unsafe { SafePtr::new(self.origin().add(y * self.pixel_stride()), self.width) }
    }

    pub fn read(&self, x: i32, y: i32) -> Option<P> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        // SAFETY: bounds checked above.
        Some(unsafe { self.read_unchecked(x as usize, y as usize) })
    }

    /// Writes one pixel, returning false when `(x, y)` is outside of the image.
    pub fn write(&mut self, x: i32, y: i32, value: P) -> bool {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return false;
        }
        // SAFETY: bounds checked above.
        unsafe { self.row_ptr(y as usize).write(x as usize, value) };
        true
    }

    /// Reads with coordinates clamped to the nearest edge pixel.
    pub fn read_clamped(&self, x: i32, y: i32) -> P {
        let x = x.clamp(0, self.width as i32 - 1) as usize;
        let y = y.clamp(0, self.height as i32 - 1) as usize;
        // SAFETY: clamped into the image.
        unsafe { self.read_unchecked(x, y) }
    }

    /// # Safety
    /// `x < width` and `y < height`.
    #[inline(always)]
    pub unsafe fn read_unchecked(&self, x: usize, y: usize) -> P {
        unsafe { self.row_ptr(y).read(x) }
    }

    pub fn fill(&mut self, value: P) {
        for y in 0..self.height {
            let row = self.row_ptr(y);
            for x in 0..self.width {
                // SAFETY: inside the row.
                unsafe { row.write(x, value) };
            }
        }
    }

    /// Copies row `y` out of the image.
    pub fn copy_row(&self, y: usize) -> Vec<P> {
        let row = self.row_ptr(y);
        // SAFETY: inside the row.
        (0..self.width).map(|x| unsafe { row.read(x) }).collect()
    }

    pub fn write_row(&mut self, y: usize, pixels: &[P]) {
        assert!(pixels.len() <= self.width, "row of {} pixels does not fit in {}", pixels.len(), self.width);
        let row = self.row_ptr(y);
        for (x, &pixel) in pixels.iter().enumerate() {
            // SAFETY: length checked above.
            unsafe { row.write(x, pixel) };
        }
    }

    /// All pixels, row by row, without padding.
    pub fn to_vec(&self) -> Vec<P> {
        (0..self.height).flat_map(|y| self.copy_row(y)).collect()
    }

    /// True if the rows follow each other without padding.
    pub fn is_packed(&self) -> bool {
        self.stride == self.width * std::mem::size_of::<P>()
    }

    pub(crate) fn allocation(&self) -> &Rc<Allocation> {
        &self.alloc
    }
}

impl ImageRgbaU8 {
    /// Bilinear resample into a new, tightly packed image of the given size.
    pub fn resize_bilinear(&self, width: usize, height: usize) -> Result<ImageRgbaU8> {
        let out = ImageRgbaU8::packed(width, height)?;
        let scale_x = self.width as f32 / width as f32;
        let scale_y = self.height as f32 / height as f32;
        for y in 0..height {
            let src_y = (y as f32 + 0.5) * scale_y - 0.5;
            let y0 = src_y.floor();
            let fy = src_y - y0;
            let row = out.row_ptr(y);
            for x in 0..width {
                let src_x = (x as f32 + 0.5) * scale_x - 0.5;
                let x0 = src_x.floor();
                let fx = src_x - x0;
                let (x0, y0) = (x0 as i32, y0 as i32);
                let top = lerp_rgba(self.read_clamped(x0, y0), self.read_clamped(x0 + 1, y0), fx);
                let bottom = lerp_rgba(self.read_clamped(x0, y0 + 1), self.read_clamped(x0 + 1, y0 + 1), fx);
                // SAFETY: inside the row.
                unsafe { row.write(x, lerp_rgba_f32(top, bottom, fy)) };
            }
        }
        Ok(out)
    }
}

fn lerp_rgba(a: u32, b: u32, t: f32) -> [f32; 4] {
    let (a, b) = (a.to_le_bytes(), b.to_le_bytes());
    std::array::from_fn(|i| a[i] as f32 + (b[i] as f32 - a[i] as f32) * t)
}

fn lerp_rgba_f32(a: [f32; 4], b: [f32; 4], t: f32) -> u32 {
    u32::from_le_bytes(std::array::from_fn(|i| (a[i] + (b[i] - a[i]) * t).round().clamp(0.0, 255.0) as u8))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_aligned_and_padded() {
        let image = ImageRgbaU8::new(5, 3).unwrap();
        assert_eq!(image.stride(), 32);
        assert_eq!(image.pixel_stride(), 8);
        assert_eq!(image.allocation().as_ptr() as usize % SIMD_ALIGNMENT, 0);
        assert!(image.stride() * (image.height() - 1) + image.width() * 4 <= image.allocation().size());
        assert!(image.to_vec().iter().all(|&p| p == 0));
    }

    #[test]
    fn bounds_checked_access() {
        let mut image = ImageF32::new(4, 4).unwrap();
        assert!(image.write(3, 3, 1.5));
        assert!(!image.write(4, 0, 1.0));
        assert!(!image.write(0, -1, 1.0));
        assert_eq!(image.read(3, 3), Some(1.5));
        assert_eq!(image.read(-1, 0), None);
        assert_eq!(image.read_clamped(10, 10), 1.5);
        assert_eq!(image.read_clamped(-10, -10), 0.0);
    }

    #[test]
    fn sub_image_shares_pixels() {
        let parent = ImageRgbaU8::new(8, 8).unwrap();
        let mut child = parent.sub_image(IRect::new(2, 3, 4, 2)).unwrap();
        assert!(child.is_sub_image());
        assert!(child.shares_pixels_with(&parent));
        assert_eq!(child.stride(), parent.stride());
        child.fill(7);
        assert_eq!(parent.read(2, 3), Some(7));
        assert_eq!(parent.read(5, 4), Some(7));
        assert_eq!(parent.read(6, 4), Some(0));
        assert_eq!(parent.read(2, 5), Some(0));
        assert_eq!(parent.to_vec().iter().filter(|&&p| p == 7).count(), 8);
    }

    #[test]
    fn sub_image_outside_parent_is_rejected() {
        let parent = ImageRgbaU8::new(8, 8).unwrap();
        assert!(parent.sub_image(IRect::new(6, 0, 4, 4)).is_err());
        assert!(parent.sub_image(IRect::new(-1, 0, 4, 4)).is_err());
        assert!(parent.sub_image(IRect::new(0, 0, 0, 4)).is_err());
    }

    #[test]
    fn zero_sized_image_is_rejected() {
        assert!(matches!(ImageF32::new(0, 4), Err(RasterError::InvalidImageSize { .. })));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "out of range")]
    fn safe_ptr_catches_writes_past_the_row() {
        let parent = ImageRgbaU8::new(8, 8).unwrap();
        let child = parent.sub_image(IRect::new(0, 0, 4, 4)).unwrap();
        unsafe { child.row_ptr(0).write(4, 1) };
    }

    #[test]
    fn clones_write_the_same_pixels() {
        let mut first = ImageF32::new(4, 2).unwrap();
        let mut second = first.clone();
        first.fill(1.0);
        assert!(second.write(2, 1, 5.0));
        assert_eq!(first.read(2, 1), Some(5.0));
        assert_eq!(second.read(0, 0), Some(1.0));
        assert_eq!(first.row_origin(), second.row_origin());
        let lower = first.sub_image(IRect::new(0, 1, 4, 1)).unwrap();
        assert_eq!(lower.row_origin().1, first.row_origin().1 + 1);
    }

    #[test]
    fn resize_keeps_uniform_color() {
        let mut image = ImageRgbaU8::new(3, 5).unwrap();
        image.fill(0x8040_20ff);
        let resized = image.resize_bilinear(32, 32).unwrap();
        assert_eq!(resized.stride(), 32 * 4);
        assert!(resized.to_vec().iter().all(|&p| p == 0x8040_20ff));
    }
}
