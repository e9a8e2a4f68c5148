//! Enhancement stages
//!
//! Each stage is a pure function from an [`ImageBuffer`](crate::image_pipeline::ImageBuffer)
//! (or one of its channels) to a new buffer of the same shape.

pub mod clahe;
pub mod dehaze;
pub mod denoise;
pub mod retinex;
pub mod sharpen;
pub mod types;

pub use clahe::{clahe_channel, clahe_image, ClaheParams};
pub use dehaze::{dark_channel, dehaze, transmission_map, DEFAULT_DARK_CHANNEL_WINDOW};
pub use denoise::denoise;
pub use retinex::{
    average_retinex, multi_scale_retinex, retinex_color_restoration, retinex_image,
    single_scale_retinex,
};
pub use sharpen::{unsharp_mask, unsharp_mask_channel, UnsharpMask};
pub use types::{DenoiseConfig, DenoiseConfigBuilder, EnhanceConfig, EnhanceConfigBuilder};
