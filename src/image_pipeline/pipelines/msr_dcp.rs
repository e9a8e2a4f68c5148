use tracing::{info, instrument};

use crate::image_pipeline::buffer::{ensure_same_shape, ImageBuffer};
use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::common::timing::PipelineTimings;
use crate::image_pipeline::enhance::{
    clahe_image, dehaze, retinex_image, unsharp_mask, ClaheParams, EnhanceConfig, UnsharpMask,
};

/// Retinex, dark-channel dehaze, CLAHE and unsharp masking, always in that order.
///
/// The enhancer holds only its validated configuration; every call owns its
/// intermediate buffers, so one instance can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct MsrDcpEnhancer {
    config: EnhanceConfig,
    clahe: ClaheParams,
    sharpen: UnsharpMask,
}

impl Default for MsrDcpEnhancer {
    fn default() -> Self {
        let config = EnhanceConfig::default();
        Self {
            clahe: config.clahe_params(),
            sharpen: config.unsharp_mask(),
            config,
        }
    }
}

impl MsrDcpEnhancer {
    pub fn new(config: EnhanceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            clahe: config.clahe_params(),
            sharpen: config.unsharp_mask(),
            config,
        })
    }

    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    pub fn enhance(&self, image: &ImageBuffer) -> Result<ImageBuffer> {
        let mut timings = PipelineTimings::new();
        self.run(image, &mut timings)
    }

    /// Same as [`MsrDcpEnhancer::enhance`], also reporting how long each stage took.
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    pub fn enhance_with_timings(&self, image: &ImageBuffer) -> Result<(ImageBuffer, PipelineTimings)> {
        let mut timings = PipelineTimings::new();
        let enhanced = self.run(image, &mut timings)?;
        timings.log_summary();
        Ok((enhanced, timings))
    }

    fn run(&self, image: &ImageBuffer, timings: &mut PipelineTimings) -> Result<ImageBuffer> {
        let shape = image.shape();

        let retinex = {
            let _span = tracing::info_span!("retinex", scales = ?self.config.scales).entered();
            timings.measure("retinex", || retinex_image(image, &self.config.scales))?
        };
        ensure_same_shape("retinex", shape, retinex.shape())?;

        let dehazed = {
            let _span = tracing::info_span!(
                "dehaze",
                window = self.config.structuring_element_size
            )
            .entered();
            timings.measure("dehaze", || dehaze(&retinex, self.config.structuring_element_size))?
        };
        ensure_same_shape("dehaze", shape, dehazed.shape())?;

        let contrasted = {
            let _span = tracing::info_span!(
                "clahe",
                clip_limit = self.clahe.clip_limit,
                tiles = ?self.clahe.tile_grid
            )
            .entered();
            timings.measure("clahe", || clahe_image(&dehazed, &self.clahe))?
        };
        ensure_same_shape("clahe", shape, contrasted.shape())?;

        let sharpened = {
            let _span = tracing::info_span!("sharpen", amount = self.sharpen.amount).entered();
            timings.measure("sharpen", || unsharp_mask(&contrasted, &self.sharpen))?
        };
        ensure_same_shape("sharpen", shape, sharpened.shape())?;

        info!(
            width = image.width(),
            height = image.height(),
            ms = timings.total_duration().as_secs_f64() * 1000.0,
            "Enhancement complete"
        );
        Ok(sharpened)
    }

    pub fn config(&self) -> &EnhanceConfig {
        &self.config
    }
}
