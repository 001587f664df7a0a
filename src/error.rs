use crate::series::Timestamp;

/// Reasons a price series is rejected before any processing starts
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InputError {
    #[error("price series is empty")]
    Empty,

    #[error("timestamp at index {index} ({timestamp}) is not after the previous one ({previous})")]
    NonMonotonic {
        index: usize,
        previous: Timestamp,
        timestamp: Timestamp,
    },

    #[error("price at index {index} must be positive and finite, got {price}")]
    InvalidPrice { index: usize, price: f64 },

    #[error("row {row}: {message}")]
    Malformed { row: usize, message: String },
}

/// Errors that can occur while turning a price series into notes and audio
#[derive(Debug, thiserror::Error)]
pub enum SonifyError {
    /// Empty or malformed input series
    #[error("Invalid input: {0}")]
    Input(#[from] InputError),

    /// A frequency that is non-positive or non-finite reached a stage that
    /// needs a real pitch
    #[error("Numeric defect: {0}")]
    NumericDefect(String),

    /// Invalid parameter values
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// IO errors when reading/writing files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// Errors while parsing a configuration file
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}
