//! TIFF decoding into an [`ImageBuffer`].
//!
//! 8-bit RGB is taken as is, 8-bit RGBA loses its alpha channel and 8-bit
//! grayscale is replicated into all three channels. Any other sample layout is
//! reported as [`EnhanceError::UnsupportedFormat`].

use std::io::Cursor;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::ColorType;
use tracing::debug;

use crate::image_pipeline::buffer::{ImageBuffer, CHANNELS};
use crate::image_pipeline::codec::reader::ImageReader;
use crate::image_pipeline::common::error::{EnhanceError, Result};

pub struct TiffImageReader;

/// Expand decoded samples to interleaved RGB, ignoring anything past the last pixel.
fn interleave_rgb(mut samples: Vec<u8>, samples_per_pixel: usize, pixel_count: usize) -> Result<Vec<u8>> {
    let expected = pixel_count * samples_per_pixel;
    if samples.len() < expected {
        return Err(EnhanceError::DecodeError(format!(
            "expected {} samples, decoded {}",
            expected,
            samples.len()
        )));
    }
    samples.truncate(expected);

    Ok(match samples_per_pixel {
        3 => samples,
        4 => samples
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect(),
        _ => samples.iter().flat_map(|&v| [v; CHANNELS]).collect(),
    })
}

impl ImageReader for TiffImageReader {
    fn read_image(&self, data: &[u8]) -> Result<ImageBuffer> {
        debug!("Decoding TIFF image, {} bytes", data.len());

        let mut decoder =
            Decoder::new(Cursor::new(data)).map_err(|e| EnhanceError::DecodeError(e.to_string()))?;
        let (width, height) = decoder
            .dimensions()
            .map_err(|e| EnhanceError::DecodeError(e.to_string()))?;
        let color_type = decoder
            .colortype()
            .map_err(|e| EnhanceError::DecodeError(e.to_string()))?;
        let (width, height) = (width as usize, height as usize);

        let samples_per_pixel = match color_type {
            ColorType::RGB(8) => 3,
            ColorType::RGBA(8) => 4,
            ColorType::Gray(8) => 1,
            other => return Err(EnhanceError::UnsupportedFormat(format!("{:?}", other))),
        };

        let samples = match decoder
            .read_image()
            .map_err(|e| EnhanceError::DecodeError(e.to_string()))?
        {
            DecodingResult::U8(samples) => samples,
            _ => {
                return Err(EnhanceError::UnsupportedFormat(
                    "non 8-bit sample data".to_string(),
                ));
            }
        };

        let rgb = interleave_rgb(samples, samples_per_pixel, width * height)?;

        debug!("Decoded {}x{} {:?} image", width, height, color_type);
        ImageBuffer::from_raw(width, height, rgb)
    }
}
