use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnhanceError {
    #[error("Invalid input image: {0}")]
    InvalidInput(String),

    #[error("Invalid image dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal computation failure: {0}")]
    ComputationFailure(String),

    #[error("Failed to read input file: {0}")]
    InputReadError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    #[error("Failed to encode image: {0}")]
    EncodeError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EnhanceError>;
