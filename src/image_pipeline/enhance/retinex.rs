//! Single- and multi-scale Retinex.
//!
//! Reflectance is estimated in the log10 domain as the difference between a
//! channel and its Gaussian-blurred illumination estimate. Every channel is
//! handled on its own; only [`retinex_color_restoration`] normalizes the three
//! channels jointly.

use ndarray::{Array2, Array3, ArrayView2, Axis, Zip};
use rayon::prelude::*;
use tracing::debug;

use crate::image_pipeline::buffer::{plane_from_u8, ImageBuffer, Plane, CHANNELS};
use crate::image_pipeline::common::error::{EnhanceError, Result};
use crate::image_pipeline::common::numeric::safe_min_max_normalize;
use crate::image_pipeline::filters::gaussian_blur;

fn check_scales(scales: &[f32]) -> Result<()> {
    if scales.is_empty() {
        return Err(EnhanceError::InvalidConfig("scale set is empty".to_string()));
    }
    if let Some(bad) = scales.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
        return Err(EnhanceError::InvalidConfig(format!(
            "Retinex scales must be positive, got {}",
            bad
        )));
    }
    Ok(())
}

/// `log10(I) - log10(G_sigma * I)` for a plane already offset away from zero.
fn log_reflectance(lifted: &Plane, sigma: f32) -> Result<Plane> {
    let illumination = gaussian_blur(lifted, sigma)?;
    Ok(Zip::from(lifted)
        .and(&illumination)
        .map_collect(|&i, &l| i.log10() - l.max(f32::MIN_POSITIVE).log10()))
}

/// Log-reflectance of one 8-bit channel at one scale.
///
/// The channel is offset by 1 before taking logarithms, so the output is
/// finite for every input and every positive `sigma`.
pub fn single_scale_retinex(channel: ArrayView2<'_, u8>, sigma: f32) -> Result<Plane> {
    let lifted = plane_from_u8(channel) + 1.0;
    log_reflectance(&lifted, sigma)
}

/// Mean of [`single_scale_retinex`] over `scales`, before normalization.
pub fn average_retinex(channel: ArrayView2<'_, u8>, scales: &[f32]) -> Result<Plane> {
    check_scales(scales)?;
    let lifted = plane_from_u8(channel) + 1.0;
    let mut sum = Array2::<f32>::zeros(lifted.raw_dim());
    for &sigma in scales {
        sum += &log_reflectance(&lifted, sigma)?;
    }
    Ok(sum / scales.len() as f32)
}

/// Multi-scale Retinex of one channel, min-max normalized to `[0, 255]`.
///
/// A uniform channel has no reflectance contrast and comes back as mid-gray.
pub fn multi_scale_retinex(channel: ArrayView2<'_, u8>, scales: &[f32]) -> Result<Array2<u8>> {
    let average = average_retinex(channel, scales)?;
    Ok(safe_min_max_normalize(&average))
}

/// [`multi_scale_retinex`] applied to each channel independently.
pub fn retinex_image(image: &ImageBuffer, scales: &[f32]) -> Result<ImageBuffer> {
    check_scales(scales)?;
    let channels = (0..CHANNELS)
        .into_par_iter()
        .map(|c| multi_scale_retinex(image.channel(c), scales))
        .collect::<Result<Vec<_>>>()?;
    let channels: [Array2<u8>; 3] = channels.try_into().map_err(|_| {
        EnhanceError::ComputationFailure("Retinex did not produce three channels".to_string())
    })?;
    debug!(scales = ?scales, "Retinex complete");
    ImageBuffer::from_channels(channels)
}

/// Multi-scale Retinex with the three channels normalized together.
///
/// Each scale is run on its own and normalized over the whole image; the
/// normalized results are averaged and normalized once more.
pub fn retinex_color_restoration(image: &ImageBuffer, scales: &[f32]) -> Result<ImageBuffer> {
    check_scales(scales)?;
    let lifted = image.to_float() + 1.0;
    let (height, width) = image.shape();
    let mut accumulated = Array3::<f32>::zeros((height, width, CHANNELS));

    for &sigma in scales {
        let planes = lifted
            .axis_iter(Axis(2))
            .into_par_iter()
            .map(|channel| log_reflectance(&channel.to_owned(), sigma))
            .collect::<Result<Vec<_>>>()?;
        let mut reflectance = Array3::<f32>::zeros((height, width, CHANNELS));
        for (c, plane) in planes.iter().enumerate() {
            reflectance.index_axis_mut(Axis(2), c).assign(plane);
        }
        accumulated += &safe_min_max_normalize(&reflectance).mapv(f32::from);
    }
    accumulated /= scales.len() as f32;

    ImageBuffer::new(safe_min_max_normalize(&accumulated))
}
