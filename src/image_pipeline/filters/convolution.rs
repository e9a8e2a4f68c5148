//! Separable convolution with a reflect-101 border (`dcb|abcd|cba`).
//!
//! Short kernels are applied directly. Long kernels, including ones much
//! longer than the image line, use the fact that a reflect-101 extension is
//! periodic with period `2n - 2`: the kernel is folded onto one period and the
//! line is filtered by circular convolution in the frequency domain. Both paths
//! compute the same full (untruncated by the image extent) Gaussian sum.

use std::sync::Arc;

use ndarray::{Array2, ArrayView2, Axis, Zip};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::image_pipeline::buffer::Plane;
use crate::image_pipeline::common::error::{EnhanceError, Result};
use crate::image_pipeline::common::numeric::quantize_round;

/// Kernels up to this length are applied tap by tap.
const DIRECT_KERNEL_LIMIT: usize = 64;

/// Longest Gaussian that is folded tap by tap regardless of the line length.
const MAX_FOLDED_TAPS: usize = 1 << 24;

/// Past `sigma = UNIFORM_SIGMA_RATIO * period` a folded Gaussian is uniform
/// to within f64 precision.
const UNIFORM_SIGMA_RATIO: f64 = 64.0;

/// `exp(-x² / 2σ²)` is zero in f64 beyond this many sigmas.
const GAUSSIAN_REACH: f64 = 40.0;

/// Index into a line of length `n` under the reflect-101 border rule.
#[inline]
pub fn reflect101(i: isize, n: usize) -> usize {
    if n <= 1 {
        return 0;
    }
    let period = 2 * n as isize - 2;
    let r = i.rem_euclid(period);
    if r >= n as isize {
        (period - r) as usize
    } else {
        r as usize
    }
}

/// Kernel length used for a float plane blurred at `sigma`: `round(8σ + 1) | 1`.
pub fn gaussian_kernel_size(sigma: f32) -> usize {
    (((sigma as f64) * 8.0 + 1.0).round() as usize) | 1
}

/// Sigma implied by a kernel size when none is given.
pub fn gaussian_sigma_for_size(size: usize) -> f32 {
    0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// A normalized 1-D kernel. Tap `k` reads the sample at offset `k - anchor`.
///
/// Taps are never stored: short kernels are expanded when a filter is
/// prepared, long ones are folded straight onto the period of the line they
/// filter, so the cost follows the image size rather than `sigma` or `size`.
#[derive(Debug, Clone)]
pub struct Kernel1D {
    shape: KernelShape,
    len: usize,
    anchor: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum KernelShape {
    Gaussian { sigma: f64 },
    Box,
}

impl Kernel1D {
    pub fn gaussian(sigma: f32) -> Result<Self> {
        Self::gaussian_with_size(gaussian_kernel_size(sigma), sigma)
    }

    /// Gaussian of an explicit odd `size`; a non-positive `sigma` is derived from the size.
    pub fn gaussian_with_size(size: usize, sigma: f32) -> Result<Self> {
        if size == 0 || size % 2 == 0 {
            return Err(EnhanceError::InvalidConfig(format!(
                "Gaussian kernel size must be odd and positive, got {}",
                size
            )));
        }
        if !sigma.is_finite() {
            return Err(EnhanceError::InvalidConfig(format!(
                "Gaussian sigma must be finite, got {}",
                sigma
            )));
        }
        let sigma = if sigma > 0.0 {
            sigma as f64
        } else {
            gaussian_sigma_for_size(size) as f64
        };
        Ok(Self {
            shape: KernelShape::Gaussian { sigma },
            len: size,
            anchor: size / 2,
        })
    }

    /// Normalized box of `size` taps, anchored at `size / 2`.
    pub fn boxed(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(EnhanceError::InvalidConfig(
                "box kernel size must be positive".to_string(),
            ));
        }
        Ok(Self {
            shape: KernelShape::Box,
            len: size,
            anchor: size / 2,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn anchor(&self) -> usize {
        self.anchor
    }

    /// Every tap, normalized. Allocates `len()` values.
    pub fn weights(&self) -> Vec<f64> {
        match self.shape {
            KernelShape::Box => vec![1.0 / self.len as f64; self.len],
            KernelShape::Gaussian { sigma } => {
                let mut weights: Vec<f64> = (0..self.len).map(|k| gaussian_tap(k, self.len, sigma)).collect();
                let sum: f64 = weights.iter().sum();
                weights.iter_mut().for_each(|w| *w /= sum);
                weights
            }
        }
    }

    /// Taps summed by offset modulo `period`: entry `d` holds the weight of
    /// every tap whose offset `k - anchor` is congruent to `d`.
    pub fn folded(&self, period: usize) -> Vec<f64> {
        let mut folded = vec![0.0; period];
        if period == 0 {
            return folded;
        }
        // Residue of the first tap's offset, `-anchor mod period`.
        let start = (period - self.anchor % period) % period;

        match self.shape {
            KernelShape::Box => {
                let full = (self.len / period) as f64;
                let rem = self.len % period;
                let weight = 1.0 / self.len as f64;
                for (d, f) in folded.iter_mut().enumerate() {
                    let j = (d + period - start) % period;
                    let count = if j < rem { full + 1.0 } else { full };
                    *f = count * weight;
                }
            }
            KernelShape::Gaussian { sigma } => {
                if self.len <= MAX_FOLDED_TAPS || sigma < UNIFORM_SIGMA_RATIO * period as f64 {
                    // Taps further than GAUSSIAN_REACH sigmas from the centre underflow to zero.
                    let center = (self.len as f64 - 1.0) * 0.5;
                    let reach = GAUSSIAN_REACH * sigma;
                    let first = (center - reach).max(0.0) as usize;
                    let last = ((center + reach) as usize).min(self.len - 1);
                    let mut sum = 0.0;
                    let mut d = (start + first % period) % period;
                    for k in first..=last {
                        let w = gaussian_tap(k, self.len, sigma);
                        folded[d] += w;
                        sum += w;
                        d += 1;
                        if d == period {
                            d = 0;
                        }
                    }
                    folded.iter_mut().for_each(|f| *f /= sum);
                } else {
                    folded.fill(1.0 / period as f64);
                }
            }
        }
        folded
    }
}

/// Unnormalized Gaussian weight of tap `k` in a kernel of `len` taps.
#[inline]
fn gaussian_tap(k: usize, len: usize, sigma: f64) -> f64 {
    let x = k as f64 - (len as f64 - 1.0) * 0.5;
    (-0.5 * x * x / (sigma * sigma)).exp()
}

/// One kernel prepared for lines of a fixed length.
enum LineFilter {
    Identity,
    Direct {
        weights: Vec<f64>,
        anchor: usize,
    },
    Spectral {
        forward: Arc<dyn Fft<f64>>,
        inverse: Arc<dyn Fft<f64>>,
        spectrum: Vec<Complex<f64>>,
        period: usize,
    },
}

impl LineFilter {
    fn prepare(kernel: &Kernel1D, n: usize) -> Self {
        if n <= 1 {
            return LineFilter::Identity;
        }
        if kernel.len() <= DIRECT_KERNEL_LIMIT {
            return LineFilter::Direct {
                weights: kernel.weights(),
                anchor: kernel.anchor(),
            };
        }

        let period = 2 * n - 2;
        // Flip the folded kernel so the correlation becomes a convolution.
        let mut spectrum = vec![Complex::new(0.0, 0.0); period];
        for (d, w) in kernel.folded(period).into_iter().enumerate() {
            spectrum[(period - d) % period].re += w;
        }

        let mut planner = FftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(period);
        let inverse = planner.plan_fft_inverse(period);
        forward.process(&mut spectrum);

        LineFilter::Spectral {
            forward,
            inverse,
            spectrum,
            period,
        }
    }

    fn apply(&self, line: &[f64], out: &mut [f64]) {
        let n = line.len();
        match self {
            LineFilter::Identity => out.copy_from_slice(line),
            LineFilter::Direct { weights, anchor } => {
                for (x, o) in out.iter_mut().enumerate() {
                    *o = weights
                        .iter()
                        .enumerate()
                        .map(|(k, &w)| {
                            let src = x as isize + k as isize - *anchor as isize;
                            w * line[reflect101(src, n)]
                        })
                        .sum();
                }
            }
            LineFilter::Spectral {
                forward,
                inverse,
                spectrum,
                period,
            } => {
                let mut buf: Vec<Complex<f64>> = (0..*period)
                    .map(|j| Complex::new(line[reflect101(j as isize, n)], 0.0))
                    .collect();
                forward.process(&mut buf);
                buf.iter_mut().zip(spectrum).for_each(|(b, s)| *b *= *s);
                inverse.process(&mut buf);
                let norm = 1.0 / *period as f64;
                for (o, b) in out.iter_mut().zip(&buf) {
                    *o = b.re * norm;
                }
            }
        }
    }
}

/// Filter every lane along `axis` (`Axis(1)` = rows, `Axis(0)` = columns).
fn filter_lanes(input: ArrayView2<'_, f64>, kernel: &Kernel1D, axis: Axis) -> Array2<f64> {
    let n = input.len_of(axis);
    let filter = LineFilter::prepare(kernel, n);
    let mut out = Array2::<f64>::zeros(input.raw_dim());
    Zip::from(out.lanes_mut(axis))
        .and(input.lanes(axis))
        .par_for_each(|mut out_lane, in_lane| {
            let line: Vec<f64> = in_lane.iter().copied().collect();
            let mut filtered = vec![0.0; n];
            filter.apply(&line, &mut filtered);
            out_lane
                .iter_mut()
                .zip(filtered)
                .for_each(|(o, v)| *o = v);
        });
    out
}

/// Horizontal pass with `kx`, then vertical pass with `ky`. Accumulates in `f64`.
pub fn convolve_separable(plane: &Plane, kx: &Kernel1D, ky: &Kernel1D) -> Plane {
    let wide = plane.mapv(f64::from);
    let rows = filter_lanes(wide.view(), kx, Axis(1));
    let cols = filter_lanes(rows.view(), ky, Axis(0));
    cols.mapv(|v| v as f32)
}

/// Isotropic Gaussian blur. `sigma` may exceed the image size by any amount.
pub fn gaussian_blur(plane: &Plane, sigma: f32) -> Result<Plane> {
    if !(sigma > 0.0 && sigma.is_finite()) {
        return Err(EnhanceError::InvalidConfig(format!(
            "Gaussian sigma must be positive, got {}",
            sigma
        )));
    }
    let kernel = Kernel1D::gaussian(sigma)?;
    Ok(convolve_separable(plane, &kernel, &kernel))
}

/// Gaussian blur of an 8-bit plane with a `size × size` kernel, rounded back to 8 bits.
pub fn gaussian_blur_u8(plane: ArrayView2<'_, u8>, size: usize, sigma: f32) -> Result<Array2<u8>> {
    let kernel = Kernel1D::gaussian_with_size(size, sigma)?;
    let blurred = convolve_separable(&plane.mapv(f32::from), &kernel, &kernel);
    Ok(blurred.mapv(quantize_round))
}

/// Normalized `size × size` box filter.
pub fn box_blur(plane: &Plane, size: usize) -> Result<Plane> {
    let kernel = Kernel1D::boxed(size)?;
    Ok(convolve_separable(plane, &kernel, &kernel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr2, Array2};

    fn max_abs_diff(a: &Plane, b: &Plane) -> f32 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).abs())
            .fold(0.0, f32::max)
    }

    /// Tap-by-tap reference using the reflect-101 rule directly.
    fn reference_blur(plane: &Plane, kernel: &Kernel1D) -> Plane {
        let (h, w) = plane.dim();
        let a = kernel.anchor() as isize;
        let weights = kernel.weights();
        let rows = Array2::from_shape_fn((h, w), |(y, x)| {
            weights
                .iter()
                .enumerate()
                .map(|(k, &wt)| wt * plane[[y, reflect101(x as isize + k as isize - a, w)]] as f64)
                .sum::<f64>()
        });
        Array2::from_shape_fn((h, w), |(y, x)| {
            weights
                .iter()
                .enumerate()
                .map(|(k, &wt)| wt * rows[[reflect101(y as isize + k as isize - a, h), x]])
                .sum::<f64>() as f32
        })
    }

    /// Mean of a line's reflect-101 extension over one period.
    fn periodic_mean(line: &[f64]) -> f64 {
        let n = line.len();
        if n == 1 {
            return line[0];
        }
        let twice: f64 = line.iter().sum::<f64>() * 2.0;
        (twice - line[0] - line[n - 1]) / (2 * n - 2) as f64
    }

    /// What any kernel that is uniform over the reflect period produces.
    fn periodic_average(plane: &Plane) -> f32 {
        let row_means: Vec<f64> = plane
            .rows()
            .into_iter()
            .map(|row| periodic_mean(&row.iter().map(|&v| f64::from(v)).collect::<Vec<_>>()))
            .collect();
        periodic_mean(&row_means) as f32
    }

    fn ramp(h: usize, w: usize) -> Plane {
        Array2::from_shape_fn((h, w), |(y, x)| ((x * 7 + y * 13) % 29) as f32 * 4.0 + 1.0)
    }

    #[test]
    fn test_reflect101_indices() {
        let got: Vec<usize> = (-3..8).map(|i| reflect101(i, 4)).collect();
        assert_eq!(got, vec![3, 2, 1, 0, 1, 2, 3, 2, 1, 0, 1]);
        assert_eq!(reflect101(-100, 1), 0);
        assert_eq!(reflect101(5, 2), 1);
    }

    #[test]
    fn test_kernel_sizes() {
        assert_eq!(gaussian_kernel_size(100.0), 801);
        assert_eq!(gaussian_kernel_size(1200.0), 9601);
        assert!((gaussian_sigma_for_size(9) - 1.7).abs() < 1e-6);
        let k = Kernel1D::gaussian(2.0).unwrap();
        assert_eq!(k.len(), 17);
        assert_eq!(k.anchor(), 8);
        assert!((k.weights().iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_folded_matches_expanded_taps() {
        for kernel in [
            Kernel1D::gaussian(20.0).unwrap(),
            Kernel1D::gaussian(1.5).unwrap(),
            Kernel1D::boxed(300).unwrap(),
            Kernel1D::boxed(4).unwrap(),
        ] {
            for period in [2, 6, 13, 400] {
                let mut expected = vec![0.0; period];
                for (k, w) in kernel.weights().into_iter().enumerate() {
                    let d = (k as isize - kernel.anchor() as isize).rem_euclid(period as isize);
                    expected[d as usize] += w;
                }
                let folded = kernel.folded(period);
                for (a, b) in folded.iter().zip(&expected) {
                    assert!((a - b).abs() < 1e-12, "len {} period {}", kernel.len(), period);
                }
            }
        }
    }

    #[test]
    fn test_astronomical_sigma_does_not_allocate_taps() {
        let kernel = Kernel1D::gaussian(1.0e30).unwrap();
        assert_eq!(kernel.len(), usize::MAX);

        let plane = ramp(4, 4);
        let blurred = gaussian_blur(&plane, 1.0e30).unwrap();
        let expected = periodic_average(&plane);
        assert!(blurred.iter().all(|&v| (v - expected).abs() < 1e-3));
    }

    #[test]
    fn test_huge_box_is_folded_per_period() {
        let plane = ramp(3, 5);
        let blurred = box_blur(&plane, usize::MAX / 2).unwrap();
        assert_eq!(blurred.dim(), (3, 5));
        let expected = periodic_average(&plane);
        assert!(blurred.iter().all(|&v| v.is_finite() && (v - expected).abs() < 1e-3));
    }

    #[test]
    fn test_invalid_kernels_rejected() {
        assert!(Kernel1D::gaussian_with_size(8, 1.0).is_err());
        assert!(Kernel1D::boxed(0).is_err());
        assert!(gaussian_blur(&ramp(4, 4), 0.0).is_err());
        assert!(gaussian_blur(&ramp(4, 4), f32::NAN).is_err());
    }

    #[test]
    fn test_direct_path_matches_reference() {
        let plane = ramp(9, 12);
        let kernel = Kernel1D::gaussian(1.5).unwrap();
        let blurred = convolve_separable(&plane, &kernel, &kernel);
        assert!(max_abs_diff(&blurred, &reference_blur(&plane, &kernel)) < 1e-3);
    }

    #[test]
    fn test_spectral_path_matches_reference() {
        let plane = ramp(11, 7);
        let kernel = Kernel1D::gaussian(20.0).unwrap();
        assert!(kernel.len() > DIRECT_KERNEL_LIMIT);
        let blurred = convolve_separable(&plane, &kernel, &kernel);
        assert!(max_abs_diff(&blurred, &reference_blur(&plane, &kernel)) < 1e-3);
    }

    #[test]
    fn test_even_box_matches_reference() {
        let plane = ramp(6, 5);
        for size in [4, 300] {
            let kernel = Kernel1D::boxed(size).unwrap();
            let blurred = box_blur(&plane, size).unwrap();
            assert!(max_abs_diff(&blurred, &reference_blur(&plane, &kernel)) < 1e-3);
        }
    }

    #[test]
    fn test_uniform_plane_is_preserved() {
        let plane = Array2::<f32>::from_elem((5, 8), 129.0);
        for sigma in [0.8, 3.0, 100.0, 1200.0] {
            let blurred = gaussian_blur(&plane, sigma).unwrap();
            assert!(blurred.iter().all(|&v| (v - 129.0).abs() < 1e-3), "sigma {}", sigma);
        }
    }

    #[test]
    fn test_huge_sigma_flattens_toward_mean() {
        let plane = ramp(16, 16);
        let (lo, hi) = plane
            .iter()
            .fold((f32::MAX, f32::MIN), |(l, h), &v| (l.min(v), h.max(v)));
        let blurred = gaussian_blur(&plane, 1200.0).unwrap();
        assert_eq!(blurred.dim(), plane.dim());
        assert!(blurred.iter().all(|v| v.is_finite()));
        let (blo, bhi) = blurred
            .iter()
            .fold((f32::MAX, f32::MIN), |(l, h), &v| (l.min(v), h.max(v)));
        assert!(bhi - blo < 0.02 * (hi - lo));
        let mean = plane.mean().unwrap();
        assert!((blurred[[8, 8]] - mean).abs() < 0.1 * (hi - lo));
    }

    #[test]
    fn test_single_pixel_and_single_row() {
        let one = arr2(&[[42.0f32]]);
        let blurred = gaussian_blur(&one, 1200.0).unwrap();
        assert!((blurred[[0, 0]] - 42.0).abs() < 1e-4);

        let row = arr2(&[[0.0f32, 255.0]]);
        let blurred = gaussian_blur(&row, 100.0).unwrap();
        assert_eq!(blurred.dim(), (1, 2));
        assert!((blurred[[0, 0]] - 127.5).abs() < 1.0);
    }

    #[test]
    fn test_gaussian_blur_u8_flat_is_exact() {
        let plane = Array2::<u8>::from_elem((6, 6), 77);
        let blurred = gaussian_blur_u8(plane.view(), 9, 0.0).unwrap();
        assert!(blurred.iter().all(|&v| v == 77));
    }
}
