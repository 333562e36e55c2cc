use crate::math::IRect;

pub type Result<T, E = RasterError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("invalid image size {width}x{height}")]
    InvalidImageSize { width: usize, height: usize },

    #[error("sub-image rectangle {rect:?} is outside of the {width}x{height} parent")]
    InvalidSubImage { rect: IRect, width: usize, height: usize },

    #[error("failed to allocate {bytes} bytes of pixel memory")]
    AllocationFailed { bytes: usize },

    #[error("texture size {width}x{height} is outside of {min}..={max} or not a power of two")]
    InvalidTextureSize { width: usize, height: usize, min: usize, max: usize },

    #[error("invalid camera: {0}")]
    InvalidCamera(&'static str),

    #[error("failed to build thread pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}
