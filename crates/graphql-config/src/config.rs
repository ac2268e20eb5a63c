use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level GraphQL configuration: either one anonymous project or a map of
/// named projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GraphQLConfig {
    Single(ProjectConfig),
    Multi {
        projects: BTreeMap<String, ProjectConfig>,
    },
}

impl GraphQLConfig {
    /// Iterate over all projects. A single-project config yields one entry
    /// named "default".
    pub fn projects(&self) -> Box<dyn Iterator<Item = (&str, &ProjectConfig)> + '_> {
        match self {
            Self::Single(project) => Box::new(std::iter::once(("default", project))),
            Self::Multi { projects } => Box::new(
                projects
                    .iter()
                    .map(|(name, project)| (name.as_str(), project)),
            ),
        }
    }

    #[must_use]
    pub fn get_project(&self, name: &str) -> Option<&ProjectConfig> {
        match self {
            Self::Single(project) if name == "default" => Some(project),
            Self::Single(_) => None,
            Self::Multi { projects } => projects.get(name),
        }
    }

    #[must_use]
    pub fn project_count(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Multi { projects } => projects.len(),
        }
    }
}

/// Resolved settings for one logical project. An immutable snapshot: the
/// loader produces a fresh value on every (re-)resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Where the schema comes from: local path(s)/glob(s) or an endpoint URL.
    pub schema: SchemaPointer,

    /// Glob(s) selecting the operation/fragment documents of this project.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<DocumentsPattern>,
}

/// Schema source: one or several pointers, each a file path, a glob, or an
/// http(s) URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaPointer {
    Single(String),
    Multiple(Vec<String>),
}

impl SchemaPointer {
    #[must_use]
    pub fn entries(&self) -> Vec<&str> {
        match self {
            Self::Single(entry) => vec![entry.as_str()],
            Self::Multiple(entries) => entries.iter().map(String::as_str).collect(),
        }
    }

    /// True when any pointer is an http(s) endpoint.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.entries().iter().any(|e| is_url(e))
    }
}

pub(crate) fn is_url(entry: &str) -> bool {
    entry.starts_with("http://") || entry.starts_with("https://")
}

/// Documents glob(s).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentsPattern {
    Single(String),
    Multiple(Vec<String>),
}

impl DocumentsPattern {
    #[must_use]
    pub fn patterns(&self) -> Vec<&str> {
        match self {
            Self::Single(pattern) => vec![pattern.as_str()],
            Self::Multiple(patterns) => patterns.iter().map(String::as_str).collect(),
        }
    }
}
