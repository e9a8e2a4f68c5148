//! Image enhancement pipeline module
//!
//! Multi-scale Retinex, dark-channel dehazing, CLAHE and unsharp masking over
//! decoded 8-bit RGB buffers, plus a standalone NL-means denoiser. Decoding and
//! encoding live in [`codec`] and are only wired in by [`FileEnhancePipeline`].

pub mod buffer;
pub mod codec;
pub mod common;
pub mod enhance;
pub mod filters;
pub mod pipelines;

pub use common::{
    EnhanceError,
    PipelineTimings,
    Result,
};

pub use buffer::{
    FloatImage,
    ImageBuffer,
    Plane,
};

pub use enhance::{
    DenoiseConfig,
    DenoiseConfigBuilder,
    EnhanceConfig,
    EnhanceConfigBuilder,
};

pub use codec::{
    ImageReader,
    ImageWriter,
    TiffCompression,
    TiffImageReader,
    TiffImageWriter,
    WriterConfig,
    WriterConfigBuilder,
};

pub use pipelines::{
    FileEnhanceConfig,
    FileEnhanceConfigBuilder,
    FileEnhancePipeline,
    MsrDcpEnhancer,
};

/// Enhance `image` with the default parameters.
pub fn enhance(image: &ImageBuffer) -> Result<ImageBuffer> {
    MsrDcpEnhancer::default().enhance(image)
}

/// Denoise `image` with the default strengths. Never part of [`enhance`].
pub fn denoise(image: &ImageBuffer) -> Result<ImageBuffer> {
    let _span = tracing::info_span!("denoise", width = image.width(), height = image.height()).entered();
    enhance::denoise(image, &DenoiseConfig::default())
}
