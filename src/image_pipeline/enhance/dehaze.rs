//! Dark-channel-prior haze removal.
//!
//! The dark channel (per-pixel channel minimum, eroded) estimates haze
//! density. Transmission is its complement, smoothed by a box filter of the
//! same window. Recovery pulls each sample toward the darkest value in the
//! whole image where transmission is low.

use ndarray::{Array2, Axis, Zip};

use crate::image_pipeline::buffer::{ImageBuffer, Plane, CHANNELS};
use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::common::numeric::{guarded_reciprocal, quantize_truncate, TRANSMISSION_EPSILON};
use crate::image_pipeline::filters::{box_blur, erode};

/// Window used when the dark channel is requested on its own.
pub const DEFAULT_DARK_CHANNEL_WINDOW: usize = 15;

/// Per-pixel minimum over the color channels, eroded with a `size × size` window.
pub fn dark_channel(image: &ImageBuffer, size: usize) -> Result<Array2<u8>> {
    erode(image.channel_min().view(), size)
}

/// `1 - dark / 255`, box-blurred over `size × size` and clamped to `[0, 1]`.
pub fn transmission_map(image: &ImageBuffer, size: usize) -> Result<Plane> {
    let dark = dark_channel(image, size)?;
    let raw = dark.mapv(|d| 1.0 - f32::from(d) / 255.0);
    Ok(box_blur(&raw, size)?.mapv(|t| t.clamp(0.0, 1.0)))
}

/// Invert the haze model using the transmission of `image` itself.
///
/// `(I - (1 - t) * min(I)) / (t + epsilon)` per channel, where `min(I)` is the
/// single darkest sample of the whole image. Clamped and truncated to 8 bits.
pub fn dehaze(image: &ImageBuffer, size: usize) -> Result<ImageBuffer> {
    let transmission = transmission_map(image, size)?;
    let floor = f32::from(image.global_min());

    let mut recovered = image.pixels().to_owned();
    for c in 0..CHANNELS {
        Zip::from(recovered.index_axis_mut(Axis(2), c))
            .and(&transmission)
            .par_for_each(|v, &t| {
                let scene = (f32::from(*v) - (1.0 - t) * floor) * guarded_reciprocal(t, TRANSMISSION_EPSILON);
                *v = quantize_truncate(scene);
            });
    }
    ImageBuffer::new(recovered)
}
