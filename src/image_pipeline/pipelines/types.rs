use crate::image_pipeline::codec::WriterConfig;
use crate::image_pipeline::enhance::{DenoiseConfig, EnhanceConfig};

/// Configuration for decoding, enhancing and re-encoding one image
#[derive(Debug, Clone)]
pub struct FileEnhanceConfig {
    pub enhance: EnhanceConfig,
    /// Run the denoiser on the decoded image before enhancement
    pub denoise: Option<DenoiseConfig>,
    pub writer: WriterConfig,
    /// Whether to validate image dimensions after decoding
    pub validate_dimensions: bool,
    /// Maximum allowed width or height (None = unlimited)
    pub max_dimension: Option<usize>,
}

impl Default for FileEnhanceConfig {
    fn default() -> Self {
        Self {
            enhance: EnhanceConfig::default(),
            denoise: None,
            writer: WriterConfig::default(),
            validate_dimensions: true,
            max_dimension: None,
        }
    }
}

impl FileEnhanceConfig {
    pub fn builder() -> FileEnhanceConfigBuilder {
        FileEnhanceConfigBuilder::default()
    }
}

#[derive(Default)]
pub struct FileEnhanceConfigBuilder {
    enhance: Option<EnhanceConfig>,
    denoise: Option<Option<DenoiseConfig>>,
    writer: Option<WriterConfig>,
    validate_dimensions: Option<bool>,
    max_dimension: Option<Option<usize>>,
}

impl FileEnhanceConfigBuilder {
    pub fn enhance(mut self, config: EnhanceConfig) -> Self {
        self.enhance = Some(config);
        self
    }

    pub fn denoise(mut self, config: Option<DenoiseConfig>) -> Self {
        self.denoise = Some(config);
        self
    }

    pub fn writer(mut self, config: WriterConfig) -> Self {
        self.writer = Some(config);
        self
    }

    pub fn validate_dimensions(mut self, validate: bool) -> Self {
        self.validate_dimensions = Some(validate);
        self
    }

    pub fn max_dimension(mut self, max: Option<usize>) -> Self {
        self.max_dimension = Some(max);
        self
    }

    pub fn build(self) -> FileEnhanceConfig {
        let default = FileEnhanceConfig::default();
        FileEnhanceConfig {
            enhance: self.enhance.unwrap_or(default.enhance),
            denoise: self.denoise.unwrap_or(default.denoise),
            writer: self.writer.unwrap_or(default.writer),
            validate_dimensions: self.validate_dimensions.unwrap_or(default.validate_dimensions),
            max_dimension: self.max_dimension.unwrap_or(default.max_dimension),
        }
    }
}
