mod config;
mod error;
mod loader;

pub use config::{DocumentsPattern, GraphQLConfig, ProjectConfig, SchemaPointer};
pub use error::{ConfigError, Result};
pub use loader::{
    find_config_file, is_config_file, load_config, load_config_from_str, CONFIG_FILE_NAMES,
};
