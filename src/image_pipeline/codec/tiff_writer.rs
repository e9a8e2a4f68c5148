use std::io::Write;

use tiff::encoder::colortype::RGB8;
use tiff::encoder::compression::DeflateLevel;
use tiff::encoder::{Compression, TiffEncoder};
use tiff::tags::Predictor;
use tracing::debug;

use crate::image_pipeline::buffer::ImageBuffer;
use crate::image_pipeline::codec::types::{TiffCompression, WriterConfig};
use crate::image_pipeline::codec::writer::ImageWriter;
use crate::image_pipeline::common::error::{EnhanceError, Result};

/// Writes 8-bit RGB TIFF files.
pub struct TiffImageWriter;

impl ImageWriter for TiffImageWriter {
    fn write_image(&self, image: &ImageBuffer, output: &mut dyn Write, config: &WriterConfig) -> Result<()> {
        debug!("Encoding TIFF image: {}x{}", image.width(), image.height());

        let mut buffer = Vec::new();

        let compression = match config.compression {
            TiffCompression::None => Compression::Uncompressed,
            TiffCompression::Lzw => Compression::Lzw,
            TiffCompression::DeflateFast => Compression::Deflate(DeflateLevel::Fast),
            TiffCompression::DeflateBalanced => Compression::Deflate(DeflateLevel::Balanced),
            TiffCompression::DeflateBest => Compression::Deflate(DeflateLevel::Best),
        };

        let mut encoder = TiffEncoder::new(std::io::Cursor::new(&mut buffer))
            .map_err(|e| EnhanceError::EncodeError(e.to_string()))?
            .with_compression(compression);

        if let Some(predictor_val) = config.predictor {
            let predictor = match predictor_val {
                2 => Predictor::Horizontal,
                _ => Predictor::None,
            };
            encoder = encoder.with_predictor(predictor);
        }

        let samples = image.pixels();
        let samples = samples
            .as_slice()
            .ok_or_else(|| EnhanceError::EncodeError("image buffer is not contiguous".to_string()))?;
        encoder
            .write_image::<RGB8>(image.width() as u32, image.height() as u32, samples)
            .map_err(|e| EnhanceError::EncodeError(e.to_string()))?;

        output.write_all(&buffer)?;

        debug!("TIFF encoding complete");
        Ok(())
    }
}
