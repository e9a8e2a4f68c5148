use std::io::Write;

use crate::image_pipeline::buffer::ImageBuffer;
use crate::image_pipeline::codec::types::WriterConfig;
use crate::image_pipeline::common::error::Result;

pub trait ImageWriter {
    fn write_image(&self, image: &ImageBuffer, output: &mut dyn Write, config: &WriterConfig) -> Result<()>;
}
