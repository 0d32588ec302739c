use thiserror::Error;

/// All errors that can occur in quotedeck-core.
#[derive(Debug, Error)]
pub enum QuotedeckError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Exit codes used by the quotedeck CLI.
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    NotFound = 2,
    InvalidArgs = 3,
    FileSystemError = 4,
    NetworkError = 6,
    Conflict = 7,
    ConfirmRequired = 8,
}

pub type Result<T> = std::result::Result<T, QuotedeckError>;
