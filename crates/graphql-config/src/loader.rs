use crate::{ConfigError, GraphQLConfig, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Config file names probed in each directory, in order of preference.
pub const CONFIG_FILE_NAMES: &[&str] = &[
    "graphql.config.json",
    "graphql.config.yaml",
    "graphql.config.yml",
    ".graphqlrc",
    ".graphqlrc.json",
    ".graphqlrc.yaml",
    ".graphqlrc.yml",
];

/// Walk up from `start_dir` looking for a config file.
#[must_use]
pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut dir = start_dir.to_path_buf();
    loop {
        for name in CONFIG_FILE_NAMES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// True when `path` names a recognized config file, whatever directory it is
/// in. Used by the server to spot config edits among document notifications.
#[must_use]
pub fn is_config_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| CONFIG_FILE_NAMES.contains(&name))
}

/// Load and validate a config file, detecting the format from the file name.
pub fn load_config(path: &Path) -> Result<GraphQLConfig> {
    let contents = fs::read_to_string(path)?;
    load_config_from_str(&contents, path)
}

/// Parse a config from an in-memory string. `path` selects the format and
/// shows up in error messages.
pub fn load_config_from_str(contents: &str, path: &Path) -> Result<GraphQLConfig> {
    if contents.trim().is_empty() {
        return Err(ConfigError::EmptyFile(path.to_path_buf()));
    }

    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let config = match extension {
        "json" => parse_json(contents, path)?,
        "yaml" | "yml" => parse_yaml(contents, path)?,
        // .graphqlrc carries no extension; YAML is a superset of what we
        // accept in JSON configs, so try it first.
        "" if file_name == ".graphqlrc" => {
            parse_yaml(contents, path).or_else(|_| parse_json(contents, path))?
        }
        _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    };

    validate(&config, path)?;
    Ok(config)
}

fn parse_json(contents: &str, path: &Path) -> Result<GraphQLConfig> {
    serde_json::from_str(contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn parse_yaml(contents: &str, path: &Path) -> Result<GraphQLConfig> {
    serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// A config that deserialized cleanly can still be unusable: every project
/// must point at a non-blank schema.
fn validate(config: &GraphQLConfig, path: &Path) -> Result<()> {
    for (name, project) in config.projects() {
        let entries = project.schema.entries();
        if entries.is_empty() || entries.iter().any(|e| e.trim().is_empty()) {
            return Err(ConfigError::MissingSchema {
                project: name.to_string(),
                path: path.to_path_buf(),
            });
        }
        if let Some(ref documents) = project.documents {
            if documents.patterns().iter().any(|p| p.trim().is_empty()) {
                return Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    message: format!("project '{name}' has an empty documents pattern"),
                });
            }
        }
    }
    Ok(())
}
