//! Numeric-safety policies shared by every stage.
//!
//! All transitions from floating point back to 8-bit samples go through
//! [`quantize_truncate`] or [`quantize_round`], and every division whose
//! denominator can approach zero goes through [`safe_min_max_normalize`] or
//! [`guarded_reciprocal`].

use ndarray::{Array, ArrayBase, Data, Dimension};
use tracing::debug;

/// Min-max ranges narrower than this are treated as a uniform buffer.
pub const NORMALIZE_EPSILON: f32 = 1e-5;

/// Floor added to the transmission before taking its reciprocal.
pub const TRANSMISSION_EPSILON: f32 = 1e-4;

/// Value a degenerate (uniform) normalization collapses to.
pub const MID_GRAY: u8 = 128;

/// Clamp to `[0, 255]` and truncate toward zero.
#[inline]
pub fn quantize_truncate(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, 255.0) as u8
}

/// Clamp to `[0, 255]` and round half to even.
#[inline]
pub fn quantize_round(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, 255.0).round_ties_even() as u8
}

/// `1 / (value + epsilon)`, with negative inputs floored at zero first.
#[inline]
pub fn guarded_reciprocal(value: f32, epsilon: f32) -> f32 {
    1.0 / (value.max(0.0) + epsilon)
}

/// Finite minimum and maximum of a buffer, or `None` if it holds no finite sample.
pub fn finite_min_max<S, D>(values: &ArrayBase<S, D>) -> Option<(f32, f32)>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    values
        .iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Rescale to the full 8-bit range and truncate.
///
/// A buffer whose range is below [`NORMALIZE_EPSILON`] (or which has no finite
/// samples) maps to [`MID_GRAY`] everywhere instead of dividing by zero.
pub fn safe_min_max_normalize<S, D>(values: &ArrayBase<S, D>) -> Array<u8, D>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    match finite_min_max(values) {
        Some((lo, hi)) if hi - lo >= NORMALIZE_EPSILON => {
            let range = hi - lo;
            values.mapv(|v| quantize_truncate((v - lo) / range * 255.0))
        }
        _ => {
            debug!("Uniform buffer in min-max normalization, returning mid-gray");
            values.mapv(|_| MID_GRAY)
        }
    }
}
