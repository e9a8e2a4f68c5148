//! Enhancement configuration types

use crate::image_pipeline::common::error::{EnhanceError, Result};
use crate::image_pipeline::enhance::clahe::ClaheParams;
use crate::image_pipeline::enhance::sharpen::UnsharpMask;

pub const DEFAULT_SCALES: [f32; 3] = [100.0, 1200.0, 100.0];
pub const DEFAULT_STRUCTURING_ELEMENT_SIZE: usize = 300;
pub const DEFAULT_CLIP_LIMIT: f32 = 2.0;
pub const DEFAULT_TILE_GRID: (usize, usize) = (8, 8);
pub const DEFAULT_SHARPEN_AMOUNT: f32 = 1.5;
pub const DEFAULT_SHARPEN_BLUR_SIZE: usize = 9;
pub const DEFAULT_SHARPEN_THRESHOLD: f32 = 10.0;

/// Parameters of the Retinex → dehaze → CLAHE → unsharp composition
#[derive(Debug, Clone, PartialEq)]
pub struct EnhanceConfig {
    /// Gaussian sigmas averaged by multi-scale Retinex
    pub scales: Vec<f32>,
    /// Side of the square window used for dark-channel erosion and transmission smoothing
    pub structuring_element_size: usize,
    /// CLAHE clip limit, relative to a flat histogram. Non-positive disables clipping
    pub clip_limit: f32,
    /// CLAHE tiles as `(columns, rows)`
    pub tile_grid: (usize, usize),
    /// Unsharp-mask gain applied to the high-frequency residual
    pub sharpen_amount: f32,
    /// Side of the Gaussian kernel used by the unsharp mask (odd)
    pub sharpen_blur_size: usize,
    /// Pixels whose `|original - blurred|` is below this are left untouched. Zero disables it
    pub sharpen_threshold: f32,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            scales: DEFAULT_SCALES.to_vec(),
            structuring_element_size: DEFAULT_STRUCTURING_ELEMENT_SIZE,
            clip_limit: DEFAULT_CLIP_LIMIT,
            tile_grid: DEFAULT_TILE_GRID,
            sharpen_amount: DEFAULT_SHARPEN_AMOUNT,
            sharpen_blur_size: DEFAULT_SHARPEN_BLUR_SIZE,
            sharpen_threshold: DEFAULT_SHARPEN_THRESHOLD,
        }
    }
}

impl EnhanceConfig {
    pub fn builder() -> EnhanceConfigBuilder {
        EnhanceConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.scales.is_empty() {
            return Err(EnhanceError::InvalidConfig("scale set is empty".to_string()));
        }
        if let Some(bad) = self.scales.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
            return Err(EnhanceError::InvalidConfig(format!(
                "Retinex scales must be positive, got {}",
                bad
            )));
        }
        if self.structuring_element_size == 0 {
            return Err(EnhanceError::InvalidConfig(
                "structuring element size must be positive".to_string(),
            ));
        }
        self.clahe_params().validate()?;
        self.unsharp_mask().validate()
    }

    pub fn clahe_params(&self) -> ClaheParams {
        ClaheParams {
            clip_limit: self.clip_limit,
            tile_grid: self.tile_grid,
        }
    }

    pub fn unsharp_mask(&self) -> UnsharpMask {
        UnsharpMask {
            amount: self.sharpen_amount,
            blur_size: self.sharpen_blur_size,
            threshold: self.sharpen_threshold,
        }
    }
}

/// Builder for EnhanceConfig
#[derive(Default)]
pub struct EnhanceConfigBuilder {
    scales: Option<Vec<f32>>,
    structuring_element_size: Option<usize>,
    clip_limit: Option<f32>,
    tile_grid: Option<(usize, usize)>,
    sharpen_amount: Option<f32>,
    sharpen_blur_size: Option<usize>,
    sharpen_threshold: Option<f32>,
}

impl EnhanceConfigBuilder {
    pub fn scales(mut self, scales: impl Into<Vec<f32>>) -> Self {
        self.scales = Some(scales.into());
        self
    }

    pub fn structuring_element_size(mut self, size: usize) -> Self {
        self.structuring_element_size = Some(size);
        self
    }

    pub fn clip_limit(mut self, clip_limit: f32) -> Self {
        self.clip_limit = Some(clip_limit);
        self
    }

    pub fn tile_grid(mut self, columns: usize, rows: usize) -> Self {
        self.tile_grid = Some((columns, rows));
        self
    }

    pub fn sharpen_amount(mut self, amount: f32) -> Self {
        self.sharpen_amount = Some(amount);
        self
    }

    pub fn sharpen_blur_size(mut self, size: usize) -> Self {
        self.sharpen_blur_size = Some(size);
        self
    }

    pub fn sharpen_threshold(mut self, threshold: f32) -> Self {
        self.sharpen_threshold = Some(threshold);
        self
    }

    pub fn build(self) -> EnhanceConfig {
        let default = EnhanceConfig::default();
        EnhanceConfig {
            scales: self.scales.unwrap_or(default.scales),
            structuring_element_size: self
                .structuring_element_size
                .unwrap_or(default.structuring_element_size),
            clip_limit: self.clip_limit.unwrap_or(default.clip_limit),
            tile_grid: self.tile_grid.unwrap_or(default.tile_grid),
            sharpen_amount: self.sharpen_amount.unwrap_or(default.sharpen_amount),
            sharpen_blur_size: self.sharpen_blur_size.unwrap_or(default.sharpen_blur_size),
            sharpen_threshold: self.sharpen_threshold.unwrap_or(default.sharpen_threshold),
        }
    }
}

pub const DEFAULT_LUMINANCE_STRENGTH: f32 = 10.0;
pub const DEFAULT_COLOR_STRENGTH: f32 = 10.0;
pub const DEFAULT_TEMPLATE_WINDOW: usize = 7;
pub const DEFAULT_SEARCH_WINDOW: usize = 21;

/// Parameters of the non-local-means denoiser
#[derive(Debug, Clone, PartialEq)]
pub struct DenoiseConfig {
    /// Filter strength `h` for the luma channel
    pub luminance_strength: f32,
    /// Filter strength `h` for the two chroma channels
    pub color_strength: f32,
    /// Side of the patches being compared (odd)
    pub template_window: usize,
    /// Side of the neighbourhood searched for similar patches (odd)
    pub search_window: usize,
}

impl Default for DenoiseConfig {
    fn default() -> Self {
        Self {
            luminance_strength: DEFAULT_LUMINANCE_STRENGTH,
            color_strength: DEFAULT_COLOR_STRENGTH,
            template_window: DEFAULT_TEMPLATE_WINDOW,
            search_window: DEFAULT_SEARCH_WINDOW,
        }
    }
}

impl DenoiseConfig {
    pub fn builder() -> DenoiseConfigBuilder {
        DenoiseConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        for (name, h) in [
            ("luminance strength", self.luminance_strength),
            ("color strength", self.color_strength),
        ] {
            if !(h.is_finite() && h > 0.0) {
                return Err(EnhanceError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, h
                )));
            }
        }
        for (name, size) in [
            ("template window", self.template_window),
            ("search window", self.search_window),
        ] {
            if size == 0 || size % 2 == 0 {
                return Err(EnhanceError::InvalidConfig(format!(
                    "{} must be odd and positive, got {}",
                    name, size
                )));
            }
        }
        Ok(())
    }
}

/// Builder for DenoiseConfig
#[derive(Default)]
pub struct DenoiseConfigBuilder {
    luminance_strength: Option<f32>,
    color_strength: Option<f32>,
    template_window: Option<usize>,
    search_window: Option<usize>,
}

impl DenoiseConfigBuilder {
    pub fn luminance_strength(mut self, h: f32) -> Self {
        self.luminance_strength = Some(h);
        self
    }

    pub fn color_strength(mut self, h: f32) -> Self {
        self.color_strength = Some(h);
        self
    }

    pub fn template_window(mut self, size: usize) -> Self {
        self.template_window = Some(size);
        self
    }

    pub fn search_window(mut self, size: usize) -> Self {
        self.search_window = Some(size);
        self
    }

    pub fn build(self) -> DenoiseConfig {
        let default = DenoiseConfig::default();
        DenoiseConfig {
            luminance_strength: self.luminance_strength.unwrap_or(default.luminance_strength),
            color_strength: self.color_strength.unwrap_or(default.color_strength),
            template_window: self.template_window.unwrap_or(default.template_window),
            search_window: self.search_window.unwrap_or(default.search_window),
        }
    }
}
