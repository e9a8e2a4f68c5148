//! Codec adapters module
//!
//! Decoding and encoding sit outside the enhancement core. These traits let
//! callers plug a container format in front of and behind the pipeline; TIFF
//! is provided.

mod reader;
mod tiff_reader;
mod tiff_writer;
pub mod types;
mod writer;

pub use reader::ImageReader;
pub use tiff_reader::TiffImageReader;
pub use tiff_writer::TiffImageWriter;
pub use types::{TiffCompression, WriterConfig, WriterConfigBuilder};
pub use writer::ImageWriter;
