//! Low-level spatial filters
//!
//! Separable convolution (Gaussian and box kernels) and rectangular erosion.
//! Both work on single-channel planes and keep the input shape.

pub mod convolution;
pub mod erosion;

pub use convolution::{
    box_blur, gaussian_blur, gaussian_blur_u8, gaussian_kernel_size, gaussian_sigma_for_size,
    reflect101, Kernel1D,
};
pub use erosion::erode;
