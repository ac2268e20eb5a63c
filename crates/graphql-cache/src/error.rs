use thiserror::Error;

pub type Result<T> = std::result::Result<T, CacheError>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Configuration error: {0}")]
    Config(#[from] graphql_config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Schema loading error: {0}")]
    SchemaLoad(String),

    #[error("Failed to fetch schema from {url}: {message}")]
    SchemaFetch { url: String, message: String },

    #[error("Document loading error: {0}")]
    DocumentLoad(String),
}
