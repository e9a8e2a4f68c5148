//! Pixel buffer module
//!
//! 8-bit images enter and leave the pipeline as [`ImageBuffer`]; the
//! floating-point math in between runs on [`Plane`] and [`FloatImage`].

pub mod types;

pub use types::{ensure_same_shape, plane_from_u8, FloatImage, ImageBuffer, Plane, CHANNELS};
