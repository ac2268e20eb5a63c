use crate::{introspect, CacheError, Result};
use graphql_config::ProjectConfig;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Where a project's schema came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaSourceKind {
    Local,
    Remote,
}

/// One SDL file contributing to the schema, with its text retained for
/// definition-location indexing.
#[derive(Debug, Clone)]
pub struct SchemaFile {
    pub path: PathBuf,
    pub text: String,
}

/// The current usable schema for a project. Built as a whole and swapped in
/// atomically; readers always see a complete state.
#[derive(Debug)]
pub struct SchemaState {
    pub schema: apollo_compiler::Schema,
    pub files: Vec<SchemaFile>,
    pub kind: SchemaSourceKind,
    pub built_at: SystemTime,
}

/// Resolves a project's schema pointer into a [`SchemaState`].
pub struct SchemaSource;

impl SchemaSource {
    /// Resolve the schema for `config`. Local pointers are glob-expanded and
    /// read from disk; remote pointers are introspected and the resulting SDL
    /// persisted to the generated artifact so external tooling (and
    /// go-to-definition) have a real file to point into.
    ///
    /// Local resolution never writes to disk.
    pub async fn resolve(
        config: &ProjectConfig,
        root: &Path,
        project_name: &str,
    ) -> Result<SchemaState> {
        let mut files = Vec::new();
        let mut kind = SchemaSourceKind::Local;

        for entry in config.schema.entries() {
            if entry.starts_with("http://") || entry.starts_with("https://") {
                kind = SchemaSourceKind::Remote;
                let introspection = introspect::fetch_introspection(entry).await?;
                let sdl = introspect::introspection_to_sdl(&introspection);

                let artifact = generated_schema_path(root, project_name);
                if let Some(parent) = artifact.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&artifact, &sdl)?;
                tracing::info!("Wrote generated schema for '{project_name}' to {artifact:?}");

                files.push(SchemaFile {
                    path: artifact,
                    text: sdl,
                });
            } else {
                collect_local_files(root, entry, &mut files)?;
            }
        }

        if files.is_empty() {
            return Err(CacheError::SchemaLoad(
                "no schema files found".to_string(),
            ));
        }

        if kind == SchemaSourceKind::Local {
            // The artifact only ever reflects a remote schema; a leftover
            // from an earlier remote config must not shadow local files.
            let artifact = generated_schema_path(root, project_name);
            if artifact.exists() {
                let _ = fs::remove_file(&artifact);
            }
        }

        let sdl = files
            .iter()
            .map(|f| f.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        // An in-progress schema edit should not take the whole project down;
        // keep the partial schema and let diagnostics surface the breakage.
        let schema = match apollo_compiler::Schema::parse(&sdl, "schema.graphql") {
            Ok(schema) => schema,
            Err(with_errors) => {
                tracing::warn!("Schema has errors: {}", with_errors.errors);
                with_errors.partial
            }
        };

        Ok(SchemaState {
            schema,
            files,
            kind,
            built_at: SystemTime::now(),
        })
    }
}

fn collect_local_files(root: &Path, pattern: &str, files: &mut Vec<SchemaFile>) -> Result<()> {
    let full_pattern = resolve_pattern(root, pattern);

    let entries = glob::glob(&full_pattern)
        .map_err(|e| CacheError::SchemaLoad(format!("invalid glob pattern '{pattern}': {e}")))?;

    let mut matched: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .filter(|p| p.is_file())
        .collect();
    matched.sort();

    if matched.is_empty() {
        return Err(CacheError::SchemaLoad(format!(
            "no files matched schema pattern: {pattern}"
        )));
    }

    for path in matched {
        let text = fs::read_to_string(&path)?;
        files.push(SchemaFile { path, text });
    }
    Ok(())
}

/// Join a config-relative pattern onto the project root, leaving absolute
/// patterns alone.
pub(crate) fn resolve_pattern(root: &Path, pattern: &str) -> String {
    let trimmed = pattern.strip_prefix("./").unwrap_or(pattern);
    if Path::new(trimmed).is_absolute() {
        trimmed.to_string()
    } else {
        root.join(trimmed).display().to_string()
    }
}

/// Whether `path` is covered by the project's local schema pointer(s).
#[must_use]
pub fn matches_schema_pointer(config: &ProjectConfig, root: &Path, path: &Path) -> bool {
    config
        .schema
        .entries()
        .iter()
        .filter(|e| !e.starts_with("http://") && !e.starts_with("https://"))
        .any(|entry| pattern_matches(root, entry, path))
}

/// Whether `path` is covered by the project's documents glob(s).
#[must_use]
pub fn matches_documents_pattern(config: &ProjectConfig, root: &Path, path: &Path) -> bool {
    let Some(ref documents) = config.documents else {
        return false;
    };
    documents
        .patterns()
        .iter()
        .any(|pattern| pattern_matches(root, pattern, path))
}

fn pattern_matches(root: &Path, pattern: &str, path: &Path) -> bool {
    let full = resolve_pattern(root, pattern);
    if Path::new(&full) == path {
        return true;
    }
    glob::Pattern::new(&full).is_ok_and(|p| p.matches_path(path))
}

/// Deterministic artifact location for a project's generated schema, keyed by
/// project root and project name so concurrent workspaces never collide.
#[must_use]
pub fn generated_schema_path(root: &Path, project_name: &str) -> PathBuf {
    let key: String = root
        .display()
        .to_string()
        .chars()
        .map(|c| if c == '/' || c == '\\' || c == ':' { '-' } else { c })
        .collect();
    std::env::temp_dir()
        .join("graphql-language-server")
        .join(key.trim_matches('-'))
        .join(project_name)
        .join("generated-schema.graphql")
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphql_config::{DocumentsPattern, SchemaPointer};
    use std::fs;

    fn local_config(schema: &str, documents: Option<&str>) -> ProjectConfig {
        ProjectConfig {
            schema: SchemaPointer::Single(schema.to_string()),
            documents: documents.map(|d| DocumentsPattern::Single(d.to_string())),
        }
    }

    #[tokio::test]
    async fn resolves_a_single_local_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("schema.graphql"),
            "type Query { hello: String }",
        )
        .unwrap();

        let config = local_config("./schema.graphql", None);
        let state = SchemaSource::resolve(&config, dir.path(), "default")
            .await
            .unwrap();

        assert_eq!(state.kind, SchemaSourceKind::Local);
        assert_eq!(state.files.len(), 1);
        assert!(state.schema.types.contains_key("Query"));
    }

    #[tokio::test]
    async fn resolves_globbed_files_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.graphql"), "type Mutation { x: Int }").unwrap();
        fs::write(dir.path().join("a.graphql"), "type Query { x: Int }").unwrap();

        let config = local_config("*.graphql", None);
        let state = SchemaSource::resolve(&config, dir.path(), "default")
            .await
            .unwrap();

        let names: Vec<_> = state
            .files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.graphql", "b.graphql"]);
        assert!(state.schema.types.contains_key("Mutation"));
    }

    #[tokio::test]
    async fn missing_local_schema_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = local_config("./schema.graphql", None);

        let result = SchemaSource::resolve(&config, dir.path(), "default").await;
        assert!(matches!(result, Err(CacheError::SchemaLoad(_))));
    }

    #[tokio::test]
    async fn local_resolution_never_writes_the_artifact() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("schema.graphql"), "type Query { a: Int }").unwrap();

        let config = local_config("./schema.graphql", None);
        SchemaSource::resolve(&config, dir.path(), "default")
            .await
            .unwrap();

        assert!(!generated_schema_path(dir.path(), "default").exists());
    }

    #[tokio::test]
    async fn unreachable_endpoint_surfaces_as_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = local_config("http://127.0.0.1:1/graphql", None);

        let result = SchemaSource::resolve(&config, dir.path(), "default").await;
        assert!(matches!(result, Err(CacheError::SchemaFetch { .. })));
    }

    #[test]
    fn artifact_paths_differ_per_root_and_project() {
        let a = generated_schema_path(Path::new("/tmp/one"), "default");
        let b = generated_schema_path(Path::new("/tmp/two"), "default");
        let c = generated_schema_path(Path::new("/tmp/one"), "admin");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn schema_pointer_matching() {
        let root = Path::new("/work/app");
        let config = local_config("./schema.graphql", Some("./**/*.graphql"));

        assert!(matches_schema_pointer(
            &config,
            root,
            Path::new("/work/app/schema.graphql")
        ));
        assert!(!matches_schema_pointer(
            &config,
            root,
            Path::new("/work/app/query.graphql")
        ));
        assert!(matches_documents_pattern(
            &config,
            root,
            Path::new("/work/app/src/query.graphql")
        ));
    }
}
