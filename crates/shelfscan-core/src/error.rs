use thiserror::Error;

pub use crate::storage::database::StoreError;

/// Errors from config loading and directory discovery. Catalog operations use [`StoreError`].
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Directory does not exist: {0}")]
    DirectoryNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Exit codes used by the CLI.
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    NotFound = 2,
    InvalidArgs = 3,
}

pub type Result<T> = std::result::Result<T, CoreError>;
