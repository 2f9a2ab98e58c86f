use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Card errors
    #[error("Invalid card frame: {0}")]
    InvalidCardFrame(String),

    #[error("Invalid card identifier: {0}")]
    InvalidCardId(String),

    // Request errors
    #[error("HTTP path too long: {len} bytes exceeds limit of {max}")]
    PathTooLong { len: usize, max: usize },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
