//! Common utilities module
//!
//! This module contains shared utilities used across the image pipeline:
//! the error type, the numeric-safety policies every stage goes through
//! when it divides or re-quantizes, and per-stage timing.

pub mod error;
pub mod numeric;
pub mod timing;

pub use error::{EnhanceError, Result};
pub use timing::{PipelineTimings, StepTiming, Timer};
