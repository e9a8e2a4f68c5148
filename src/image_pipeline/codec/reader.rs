use crate::image_pipeline::buffer::ImageBuffer;
use crate::image_pipeline::common::error::Result;

pub trait ImageReader {
    fn read_image(&self, data: &[u8]) -> Result<ImageBuffer>;
}
