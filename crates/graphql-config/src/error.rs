use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Config file at {0} is empty")]
    EmptyFile(PathBuf),

    #[error("Failed to parse config at {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Project '{project}' in {path} has no usable schema entry")]
    MissingSchema { project: String, path: PathBuf },

    #[error("Unsupported config file format: {0}")]
    UnsupportedFormat(PathBuf),
}
