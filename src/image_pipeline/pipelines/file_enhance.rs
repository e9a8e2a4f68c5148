use std::io::Write;
use std::path::Path;

use tracing::{info, instrument, warn};

use crate::image_pipeline::buffer::ImageBuffer;
use crate::image_pipeline::codec::{ImageReader, ImageWriter, TiffImageReader, TiffImageWriter};
use crate::image_pipeline::common::error::{EnhanceError, Result};
use crate::image_pipeline::enhance::denoise;
use crate::image_pipeline::pipelines::msr_dcp::MsrDcpEnhancer;
use crate::image_pipeline::pipelines::types::FileEnhanceConfig;

pub struct FileEnhancePipeline<R: ImageReader, W: ImageWriter> {
    reader: R,
    writer: W,
    enhancer: MsrDcpEnhancer,
    config: FileEnhanceConfig,
}

impl FileEnhancePipeline<TiffImageReader, TiffImageWriter> {
    pub fn new(config: FileEnhanceConfig) -> Result<Self> {
        Self::with_custom(TiffImageReader, TiffImageWriter, config)
    }
}

impl<R: ImageReader, W: ImageWriter> FileEnhancePipeline<R, W> {
    /// Fails with [`EnhanceError::InvalidConfig`] before any image is touched.
    pub fn with_custom(reader: R, writer: W, config: FileEnhanceConfig) -> Result<Self> {
        if let Some(denoise) = &config.denoise {
            denoise.validate()?;
        }
        Ok(Self {
            reader,
            writer,
            enhancer: MsrDcpEnhancer::new(config.enhance.clone())?,
            config,
        })
    }

    fn validate_dimensions(&self, width: usize, height: usize) -> Result<()> {
        if !self.config.validate_dimensions {
            return Ok(());
        }

        if let Some(max) = self.config.max_dimension {
            if width > max || height > max {
                warn!(width, height, max, "Image exceeds maximum dimension");
                return Err(EnhanceError::InvalidDimensions(width, height));
            }
        }

        Ok(())
    }

    fn process(&self, image: &ImageBuffer) -> Result<ImageBuffer> {
        match &self.config.denoise {
            Some(denoise_config) => {
                let denoised = {
                    let _span = tracing::info_span!("denoise").entered();
                    denoise(image, denoise_config)?
                };
                self.enhancer.enhance(&denoised)
            }
            None => self.enhancer.enhance(image),
        }
    }

    #[instrument(skip(self, input_data, output), fields(input_size = input_data.len()))]
    pub fn convert(&self, input_data: &[u8], output: &mut dyn Write) -> Result<()> {
        info!("Starting enhancement");

        let image = {
            let _span = tracing::info_span!("decode").entered();
            self.reader.read_image(input_data)?
        };

        {
            let _span = tracing::info_span!(
                "validate_dimensions",
                width = image.width(),
                height = image.height()
            )
            .entered();
            self.validate_dimensions(image.width(), image.height())?;
        }

        let enhanced = self.process(&image)?;

        {
            let _span = tracing::info_span!("encode").entered();
            self.writer.write_image(&enhanced, output, &self.config.writer)?;
        }

        info!(
            width = enhanced.width(),
            height = enhanced.height(),
            "Conversion complete"
        );
        Ok(())
    }

    #[instrument(skip(self, input_path, output_path))]
    pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: Q,
    ) -> Result<()> {
        let input_path = input_path.as_ref();
        let output_path = output_path.as_ref();

        info!(
            input = %input_path.display(),
            output = %output_path.display(),
            "Converting file"
        );

        let input_data = std::fs::read(input_path).map_err(|e| {
            EnhanceError::InputReadError(format!("{}: {}", input_path.display(), e))
        })?;

        let mut output_file = std::fs::File::create(output_path).map_err(|e| {
            EnhanceError::OutputWriteError(format!("{}: {}", output_path.display(), e))
        })?;

        self.convert(&input_data, &mut output_file)
    }

    pub fn config(&self) -> &FileEnhanceConfig {
        &self.config
    }

    pub fn enhancer(&self) -> &MsrDcpEnhancer {
        &self.enhancer
    }
}
