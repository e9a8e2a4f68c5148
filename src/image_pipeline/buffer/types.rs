//! Buffer types and the conversions between them

use ndarray::{stack, Array2, Array3, ArrayView2, ArrayView3, Axis, Zip};

use crate::image_pipeline::common::error::{EnhanceError, Result};

/// Number of color channels. The order is fixed to `[R, G, B]` everywhere.
pub const CHANNELS: usize = 3;

/// Single-channel floating buffer, `height × width`.
pub type Plane = Array2<f32>;

/// Three-channel floating buffer, `height × width × 3`.
pub type FloatImage = Array3<f32>;

fn check_not_empty(width: usize, height: usize) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(EnhanceError::InvalidInput(format!(
            "image has zero dimensions: {}x{}",
            width, height
        )));
    }
    Ok(())
}

/// Decoded 8-bit RGB image, `height × width × 3`, always in standard layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    pixels: Array3<u8>,
}

impl ImageBuffer {
    /// Wrap an `H × W × 3` array, rejecting empty buffers and other channel counts.
    pub fn new(pixels: Array3<u8>) -> Result<Self> {
        let (height, width, channels) = pixels.dim();
        check_not_empty(width, height)?;
        if channels != CHANNELS {
            return Err(EnhanceError::InvalidInput(format!(
                "expected {} channels, got {}",
                CHANNELS, channels
            )));
        }
        let pixels = if pixels.is_standard_layout() {
            pixels
        } else {
            pixels.as_standard_layout().into_owned()
        };
        Ok(Self { pixels })
    }

    /// Build from interleaved `[R, G, B, R, G, B, ...]` row-major samples.
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        check_not_empty(width, height)?;
        let expected = width * height * CHANNELS;
        if data.len() != expected {
            return Err(EnhanceError::InvalidInput(format!(
                "buffer holds {} samples, {}x{}x{} needs {}",
                data.len(),
                width,
                height,
                CHANNELS,
                expected
            )));
        }
        let pixels = Array3::from_shape_vec((height, width, CHANNELS), data)
            .map_err(|e| EnhanceError::InvalidInput(e.to_string()))?;
        Self::new(pixels)
    }

    /// Every pixel set to `rgb`.
    pub fn filled(width: usize, height: usize, rgb: [u8; 3]) -> Result<Self> {
        check_not_empty(width, height)?;
        let pixels = Array3::from_shape_fn((height, width, CHANNELS), |(_, _, c)| rgb[c]);
        Self::new(pixels)
    }

    /// Recombine three equally-shaped channel planes.
    pub fn from_channels(channels: [Array2<u8>; 3]) -> Result<Self> {
        let views = [channels[0].view(), channels[1].view(), channels[2].view()];
        let pixels = stack(Axis(2), &views)
            .map_err(|e| EnhanceError::ComputationFailure(format!("channel recombination: {}", e)))?;
        Self::new(pixels)
    }

    pub fn width(&self) -> usize {
        self.pixels.dim().1
    }

    pub fn height(&self) -> usize {
        self.pixels.dim().0
    }

    /// `(height, width)`
    pub fn shape(&self) -> (usize, usize) {
        (self.height(), self.width())
    }

    pub fn pixels(&self) -> ArrayView3<'_, u8> {
        self.pixels.view()
    }

    pub fn channel(&self, c: usize) -> ArrayView2<'_, u8> {
        self.pixels.index_axis(Axis(2), c)
    }

    pub fn into_array(self) -> Array3<u8> {
        self.pixels
    }

    /// Interleaved row-major samples, the inverse of [`ImageBuffer::from_raw`].
    pub fn into_raw(self) -> Vec<u8> {
        let len = self.pixels.len();
        let (mut data, offset) = self.pixels.into_raw_vec_and_offset();
        let start = offset.unwrap_or(0);
        data.truncate(start + len);
        data.drain(..start);
        data
    }

    /// Lossless widening to `f32`.
    pub fn to_float(&self) -> FloatImage {
        self.pixels.mapv(f32::from)
    }

    /// Smallest sample over all pixels and channels.
    pub fn global_min(&self) -> u8 {
        self.pixels.iter().copied().min().unwrap_or(0)
    }

    /// Per-pixel minimum across the three channels.
    pub fn channel_min(&self) -> Array2<u8> {
        let mut out = Array2::<u8>::zeros(self.shape());
        Zip::from(&mut out)
            .and(self.pixels.lanes(Axis(2)))
            .for_each(|o, px| *o = px.iter().copied().min().unwrap_or(0));
        out
    }
}

/// Lossless widening of an 8-bit plane.
pub fn plane_from_u8(plane: ArrayView2<'_, u8>) -> Plane {
    plane.mapv(f32::from)
}

/// Fails with [`EnhanceError::ComputationFailure`] when a stage hands back a
/// buffer whose spatial shape differs from what it was given.
pub fn ensure_same_shape(stage: &str, expected: (usize, usize), actual: (usize, usize)) -> Result<()> {
    if expected != actual {
        return Err(EnhanceError::ComputationFailure(format!(
            "{} produced {}x{} from a {}x{} input",
            stage, actual.1, actual.0, expected.1, expected.0
        )));
    }
    Ok(())
}
