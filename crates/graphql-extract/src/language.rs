use std::path::Path;

/// Source languages GraphQL can be extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    /// Raw GraphQL files (.graphql, .gql)
    GraphQL,
    /// TypeScript (.ts, .tsx)
    TypeScript,
    /// JavaScript (.js, .jsx, .mjs, .cjs)
    JavaScript,
}

impl Language {
    /// Detect the language from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "graphql" | "gql" => Some(Self::GraphQL),
            "ts" | "tsx" => Some(Self::TypeScript),
            "js" | "jsx" | "mjs" | "cjs" => Some(Self::JavaScript),
            _ => None,
        }
    }

    /// Whether documents are embedded in template literals rather than being
    /// the whole file.
    #[must_use]
    pub const fn is_embedded(self) -> bool {
        matches!(self, Self::TypeScript | Self::JavaScript)
    }
}
