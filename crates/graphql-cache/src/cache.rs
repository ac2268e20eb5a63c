use crate::schema::resolve_pattern;
use crate::{LineIndex, Position, Range, Result, SchemaSource, SchemaSourceKind, SchemaState};
use apollo_parser::cst::{self, CstNode};
use graphql_config::ProjectConfig;
use graphql_extract::{extract_from_source, ExtractConfig, Language};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

/// One named type's definition location in the schema sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDefinitionEntry {
    pub name: String,
    pub file_path: PathBuf,
    pub range: Range,
}

/// One named fragment's definition, with its source text retained so
/// validation can splice external fragments into a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentDefinitionEntry {
    pub name: String,
    pub type_condition: String,
    pub file_path: PathBuf,
    pub range: Range,
    pub text: String,
}

/// Per-project-root caches of schema state, type definitions and fragment
/// definitions.
///
/// Projects are keyed by a root identifier (workspace root plus project
/// name). Every rebuild is a full replace of the affected map and rebuilds
/// for one key are serialized through a per-key async lock, so readers
/// observe either the previous or the next complete state, never a partial
/// one.
pub struct ProjectCache {
    schemas: RwLock<HashMap<String, Arc<SchemaState>>>,
    type_definitions: RwLock<HashMap<String, Arc<HashMap<String, TypeDefinitionEntry>>>>,
    fragment_definitions: RwLock<HashMap<String, Arc<HashMap<String, FragmentDefinitionEntry>>>>,
    rebuild_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ProjectCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            schemas: RwLock::new(HashMap::new()),
            type_definitions: RwLock::new(HashMap::new()),
            fragment_definitions: RwLock::new(HashMap::new()),
            rebuild_locks: Mutex::new(HashMap::new()),
        }
    }

    fn rebuild_lock(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.rebuild_locks
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    /// Build (or rebuild) everything for one project: schema state, type
    /// definitions and fragment definitions.
    ///
    /// On a schema fetch/load failure nothing is replaced, so a previously
    /// built state stays authoritative.
    pub async fn build_project(
        &self,
        key: &str,
        config: &ProjectConfig,
        root: &Path,
        project_name: &str,
        force: bool,
    ) -> Result<()> {
        let lock = self.rebuild_lock(key);
        let _guard = lock.lock().await;

        let state = self.resolve_schema(key, config, root, project_name, force).await?;
        self.install_schema(key, &state);
        self.install_fragments(key, collect_project_fragments(config, root));
        Ok(())
    }

    /// Rebuild the schema state and type definitions for one project, e.g.
    /// after a watched schema file changed. Remote schemas are only
    /// re-fetched when `force` is set; there is no local file to watch.
    pub async fn rebuild_schema(
        &self,
        key: &str,
        config: &ProjectConfig,
        root: &Path,
        project_name: &str,
        force: bool,
    ) -> Result<()> {
        let lock = self.rebuild_lock(key);
        let _guard = lock.lock().await;

        if !force && config.schema.is_remote() && self.get_schema(key).is_some() {
            return Ok(());
        }
        let state = Arc::new(SchemaSource::resolve(config, root, project_name).await?);
        self.install_schema(key, &state);
        Ok(())
    }

    /// Rebuild the fragment map for one project from the documents matched on
    /// disk. A full replace: deleted files simply stop contributing.
    pub async fn rebuild_fragment_definitions(
        &self,
        key: &str,
        config: &ProjectConfig,
        root: &Path,
    ) {
        let lock = self.rebuild_lock(key);
        let _guard = lock.lock().await;
        self.install_fragments(key, collect_project_fragments(config, root));
    }

    /// Replace the fragment entries contributed by one file with entries
    /// parsed from in-memory `text`. Keeps unsaved editor content queryable.
    pub fn update_document_fragments(&self, key: &str, path: &Path, text: &str) {
        let mut map: HashMap<String, FragmentDefinitionEntry> = self
            .fragment_definitions
            .read()
            .unwrap()
            .get(key)
            .map(|m| (**m).clone())
            .unwrap_or_default();
        map.retain(|_, entry| entry.file_path != path);
        collect_fragments_from_text(path, text, &mut map);
        self.install_fragments(key, map);
    }

    async fn resolve_schema(
        &self,
        key: &str,
        config: &ProjectConfig,
        root: &Path,
        project_name: &str,
        force: bool,
    ) -> Result<Arc<SchemaState>> {
        if !force && config.schema.is_remote() {
            if let Some(existing) = self.get_schema(key) {
                if existing.kind == SchemaSourceKind::Remote {
                    return Ok(existing);
                }
            }
        }
        Ok(Arc::new(
            SchemaSource::resolve(config, root, project_name).await?,
        ))
    }

    fn install_schema(&self, key: &str, state: &Arc<SchemaState>) {
        let types = collect_type_definitions(state);
        self.schemas
            .write()
            .unwrap()
            .insert(key.to_string(), Arc::clone(state));
        self.type_definitions
            .write()
            .unwrap()
            .insert(key.to_string(), Arc::new(types));
    }

    fn install_fragments(&self, key: &str, map: HashMap<String, FragmentDefinitionEntry>) {
        self.fragment_definitions
            .write()
            .unwrap()
            .insert(key.to_string(), Arc::new(map));
    }

    /// The most recently built schema; `None` before the first successful
    /// build.
    #[must_use]
    pub fn get_schema(&self, key: &str) -> Option<Arc<SchemaState>> {
        self.schemas.read().unwrap().get(key).cloned()
    }

    #[must_use]
    pub fn type_definitions(
        &self,
        key: &str,
    ) -> Option<Arc<HashMap<String, TypeDefinitionEntry>>> {
        self.type_definitions.read().unwrap().get(key).cloned()
    }

    #[must_use]
    pub fn fragment_definitions(
        &self,
        key: &str,
    ) -> Option<Arc<HashMap<String, FragmentDefinitionEntry>>> {
        self.fragment_definitions.read().unwrap().get(key).cloned()
    }
}

impl Default for ProjectCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk every schema file's CST and index each top-level type definition by
/// name, recording the whole definition's range in its source file.
fn collect_type_definitions(state: &SchemaState) -> HashMap<String, TypeDefinitionEntry> {
    let mut map = HashMap::new();

    for file in &state.files {
        let tree = apollo_parser::Parser::new(&file.text).parse();
        let line_index = LineIndex::new(&file.text);

        for definition in tree.document().definitions() {
            let name_node = match &definition {
                cst::Definition::ObjectTypeDefinition(def) => def.name(),
                cst::Definition::InterfaceTypeDefinition(def) => def.name(),
                cst::Definition::UnionTypeDefinition(def) => def.name(),
                cst::Definition::EnumTypeDefinition(def) => def.name(),
                cst::Definition::InputObjectTypeDefinition(def) => def.name(),
                cst::Definition::ScalarTypeDefinition(def) => def.name(),
                _ => None,
            };
            let Some(name_node) = name_node else { continue };

            let name = name_node.text().to_string();
            let range = trimmed_node_range(definition.syntax(), &line_index);
            map.insert(
                name.clone(),
                TypeDefinitionEntry {
                    name,
                    file_path: file.path.clone(),
                    range,
                },
            );
        }
    }

    map
}

/// Enumerate a project's document files and index every fragment definition.
/// Files are processed in sorted path order; for duplicate fragment names the
/// last processed file wins, which pins the tie-break across platforms with
/// different glob enumeration orders.
fn collect_project_fragments(
    config: &ProjectConfig,
    root: &Path,
) -> HashMap<String, FragmentDefinitionEntry> {
    let mut map = HashMap::new();
    let Some(ref documents) = config.documents else {
        return map;
    };

    let mut files: Vec<PathBuf> = Vec::new();
    for pattern in documents.patterns() {
        let full = resolve_pattern(root, pattern);
        let Ok(paths) = glob::glob(&full) else {
            tracing::warn!("Invalid documents pattern: {pattern}");
            continue;
        };
        for path in paths.filter_map(std::result::Result::ok) {
            if path.is_file() && !files.contains(&path) {
                files.push(path);
            }
        }
    }
    files.sort();

    for path in files {
        match fs::read_to_string(&path) {
            Ok(text) => collect_fragments_from_text(&path, &text, &mut map),
            Err(e) => tracing::warn!("Failed to read {path:?}: {e}"),
        }
    }

    map
}

/// Extract fragment definitions from one file's text into `map`.
fn collect_fragments_from_text(
    path: &Path,
    text: &str,
    map: &mut HashMap<String, FragmentDefinitionEntry>,
) {
    let Some(language) = Language::from_path(path) else {
        return;
    };
    let Ok(embedded) = extract_from_source(text, language, &ExtractConfig::default()) else {
        return;
    };

    for doc in embedded {
        let tree = apollo_parser::Parser::new(&doc.text).parse();
        if tree.errors().len() > 0 {
            continue;
        }
        let line_index = LineIndex::new(&doc.text);
        let base = Position::new(doc.range.start.line, doc.range.start.column);

        for definition in tree.document().definitions() {
            let cst::Definition::FragmentDefinition(frag) = definition else {
                continue;
            };
            let Some(name_node) = frag.fragment_name().and_then(|n| n.name()) else {
                continue;
            };
            let type_condition = frag
                .type_condition()
                .and_then(|tc| tc.named_type())
                .and_then(|nt| nt.name())
                .map(|n| n.text().to_string())
                .unwrap_or_default();

            let rel = trimmed_node_range(frag.syntax(), &line_index);
            let range = Range::new(rel.start.absolute_in(base), rel.end.absolute_in(base));
            let node_text = frag.syntax().text().to_string();

            let name = name_node.text().to_string();
            map.insert(
                name.clone(),
                FragmentDefinitionEntry {
                    name,
                    type_condition,
                    file_path: path.to_path_buf(),
                    range,
                    text: node_text.trim().to_string(),
                },
            );
        }
    }
}

/// Range of a CST node with trailing trivia excluded, so definition ranges
/// end at the closing brace rather than swallowing following blank lines.
fn trimmed_node_range(syntax: &apollo_parser::SyntaxNode, line_index: &LineIndex) -> Range {
    let start: usize = syntax.text_range().start().into();
    let text = syntax.text().to_string();
    let trimmed_len = text.trim_end().len();
    let leading = text.len() - text.trim_start().len();
    line_index.span_to_range(start + leading, start + trimmed_len)
}
