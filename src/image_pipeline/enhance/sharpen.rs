//! Unsharp-mask sharpening with a noise-floor threshold.

use ndarray::{Array2, ArrayView2, Zip};
use rayon::prelude::*;

use crate::image_pipeline::buffer::{ImageBuffer, CHANNELS};
use crate::image_pipeline::common::error::{EnhanceError, Result};
use crate::image_pipeline::common::numeric::quantize_round;
use crate::image_pipeline::filters::gaussian_blur_u8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnsharpMask {
    pub amount: f32,
    /// Odd kernel side; the blur sigma is derived from it
    pub blur_size: usize,
    /// Zero sharpens every pixel
    pub threshold: f32,
}

impl Default for UnsharpMask {
    fn default() -> Self {
        Self {
            amount: 1.5,
            blur_size: 9,
            threshold: 0.0,
        }
    }
}

impl UnsharpMask {
    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_finite() {
            return Err(EnhanceError::InvalidConfig(format!(
                "sharpen amount must be finite, got {}",
                self.amount
            )));
        }
        if self.blur_size == 0 || self.blur_size % 2 == 0 {
            return Err(EnhanceError::InvalidConfig(format!(
                "sharpen blur size must be odd and positive, got {}",
                self.blur_size
            )));
        }
        if !(self.threshold.is_finite() && self.threshold >= 0.0) {
            return Err(EnhanceError::InvalidConfig(format!(
                "sharpen threshold must be non-negative, got {}",
                self.threshold
            )));
        }
        Ok(())
    }

    /// `(amount + 1) * original - amount * blurred`, or the original sample when
    /// `|original - blurred|` falls under the threshold.
    #[inline]
    fn apply(&self, original: u8, blurred: u8) -> u8 {
        let (o, b) = (f32::from(original), f32::from(blurred));
        if self.threshold > 0.0 && (o - b).abs() < self.threshold {
            return original;
        }
        quantize_round((self.amount + 1.0) * o - self.amount * b)
    }
}

pub fn unsharp_mask_channel(channel: ArrayView2<'_, u8>, mask: &UnsharpMask) -> Result<Array2<u8>> {
    mask.validate()?;
    let blurred = gaussian_blur_u8(channel, mask.blur_size, 0.0)?;
    Ok(Zip::from(channel)
        .and(&blurred)
        .map_collect(|&o, &b| mask.apply(o, b)))
}

pub fn unsharp_mask(image: &ImageBuffer, mask: &UnsharpMask) -> Result<ImageBuffer> {
    mask.validate()?;
    let channels = (0..CHANNELS)
        .into_par_iter()
        .map(|c| unsharp_mask_channel(image.channel(c), mask))
        .collect::<Result<Vec<_>>>()?;
    let channels: [Array2<u8>; 3] = channels.try_into().map_err(|_| {
        EnhanceError::ComputationFailure("unsharp mask did not produce three channels".to_string())
    })?;
    ImageBuffer::from_channels(channels)
}
