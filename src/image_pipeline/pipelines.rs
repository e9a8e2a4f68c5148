//! Pipeline orchestration module
//!
//! [`MsrDcpEnhancer`] is the pure buffer-to-buffer composition of the
//! enhancement stages. [`FileEnhancePipeline`] wraps it with a decoder and an
//! encoder for callers that hold encoded bytes or files.

mod file_enhance;
mod msr_dcp;
pub mod types;

#[cfg(test)]
mod tests;

pub use file_enhance::FileEnhancePipeline;
pub use msr_dcp::MsrDcpEnhancer;
pub use types::{FileEnhanceConfig, FileEnhanceConfigBuilder};
