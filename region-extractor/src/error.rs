use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("mask data has {actual} values but a {width}x{height} mask needs {expected}")]
    MaskShape {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

pub type Result<T> = std::result::Result<T, ExtractError>;
