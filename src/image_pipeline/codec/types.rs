//! Encoder configuration types

/// TIFF compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiffCompression {
    /// No compression (fastest, largest file)
    None,
    /// LZW compression (slow, good compression)
    Lzw,
    /// Deflate compression - fast level
    DeflateFast,
    /// Deflate compression - balanced
    DeflateBalanced,
    /// Deflate compression - best compression (slower)
    DeflateBest,
}

/// Configuration for encoding the enhanced image
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Compression method to use
    pub compression: TiffCompression,
    /// Predictor value for compression (2 = horizontal differencing)
    pub predictor: Option<u16>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            compression: TiffCompression::DeflateBalanced,
            predictor: None,
        }
    }
}

impl WriterConfig {
    pub fn builder() -> WriterConfigBuilder {
        WriterConfigBuilder::default()
    }
}

/// Builder for WriterConfig
#[derive(Default)]
pub struct WriterConfigBuilder {
    compression: Option<TiffCompression>,
    predictor: Option<Option<u16>>,
}

impl WriterConfigBuilder {
    pub fn compression(mut self, compression: TiffCompression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn predictor(mut self, predictor: Option<u16>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn build(self) -> WriterConfig {
        let default = WriterConfig::default();
        WriterConfig {
            compression: self.compression.unwrap_or(default.compression),
            predictor: self.predictor.unwrap_or(default.predictor),
        }
    }
}
