use crate::Logger;
use graphql_cache::{
    matches_documents_pattern, matches_schema_pointer, DefinitionLocation, DefinitionResolver,
    Diagnostic, DiagnosticsEngine, HoverInfo, HoverProvider, Position, ProjectCache, SchemaState,
    TextDocumentCache,
};
use graphql_config::{find_config_file, is_config_file, load_config, GraphQLConfig, ProjectConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Kind of a watched-file change, mirroring the protocol's change types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChangeKind {
    Created,
    Changed,
    Deleted,
}

#[derive(Default)]
struct ConfigState {
    is_initialized: bool,
    is_config_missing: bool,
    config_path: Option<PathBuf>,
    config: Option<GraphQLConfig>,
}

/// The protocol state machine for one workspace root.
///
/// Tracks whether a usable project configuration exists, owns the per-project
/// caches and the open-document cache, and routes every lifecycle
/// notification and query request through them in arrival order. While no
/// valid configuration is present every query returns an empty result rather
/// than an error.
pub struct MessageProcessor {
    root: PathBuf,
    logger: Arc<dyn Logger>,
    state: RwLock<ConfigState>,
    cache: ProjectCache,
    documents: TextDocumentCache,
}

impl MessageProcessor {
    #[must_use]
    pub fn new(root: PathBuf, logger: Arc<dyn Logger>) -> Self {
        Self {
            root,
            logger,
            state: RwLock::new(ConfigState::default()),
            cache: ProjectCache::new(),
            documents: TextDocumentCache::new(),
        }
    }

    /// Startup config discovery. Failures leave the server uninitialized and
    /// log exactly one info and one error line; they are not re-logged while
    /// requests keep arriving in the failed state.
    pub async fn initialize(&self) {
        self.logger.info(&format!(
            "Loading GraphQL configuration from {}",
            self.root.display()
        ));
        self.attempt_initialization().await;
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.read().unwrap().is_initialized
    }

    #[must_use]
    pub fn is_config_missing(&self) -> bool {
        self.state.read().unwrap().is_config_missing
    }

    /// The schema for a project by name; `None` before the first successful
    /// build.
    #[must_use]
    pub fn get_schema(&self, project_name: &str) -> Option<Arc<SchemaState>> {
        self.cache.get_schema(&self.project_key(project_name))
    }

    #[must_use]
    pub fn project_cache(&self) -> &ProjectCache {
        &self.cache
    }

    #[must_use]
    pub fn document_cache(&self) -> &TextDocumentCache {
        &self.documents
    }

    /// Cache key for one project under this workspace root.
    #[must_use]
    pub fn project_key(&self, project_name: &str) -> String {
        format!("{}-{}", self.root.display(), project_name)
    }

    /// didOpen / didSave. Reads the file when the notification carried no
    /// text. Opening or saving the config file is the one path that can move
    /// an uninitialized server to initialized.
    pub async fn handle_did_open_or_save(
        &self,
        path: &Path,
        text: Option<&str>,
    ) -> Vec<Diagnostic> {
        if self.is_config_entry(path) {
            self.attempt_initialization().await;
            return Vec::new();
        }

        let owned;
        let text = match text {
            Some(text) => text,
            None => match fs::read_to_string(path) {
                Ok(contents) => {
                    owned = contents;
                    &owned
                }
                Err(_) => return Vec::new(),
            },
        };

        self.documents.set(path, text);
        if !self.is_initialized() {
            return Vec::new();
        }

        let Some((name, project)) = self.project_for(path) else {
            return Vec::new();
        };
        // Schema files hold type definitions, not executable documents.
        if matches_schema_pointer(&project, &self.root, path) {
            return Vec::new();
        }
        let key = self.project_key(&name);
        self.cache.update_document_fragments(&key, path, text);
        self.diagnostics_for(path, &key)
    }

    /// didChange with the full new text. Diagnostics are produced against the
    /// version that triggered them; `None` while uninitialized.
    pub async fn handle_did_change(&self, path: &Path, text: &str) -> Option<Vec<Diagnostic>> {
        self.documents.set(path, text);
        if !self.is_initialized() {
            return None;
        }

        let (name, project) = self.project_for(path)?;
        if matches_schema_pointer(&project, &self.root, path) {
            return Some(Vec::new());
        }
        let key = self.project_key(&name);
        self.cache.update_document_fragments(&key, path, text);
        Some(self.diagnostics_for(path, &key))
    }

    pub fn handle_did_close(&self, path: &Path) {
        self.documents.remove(path);
    }

    /// didChangeWatchedFiles. Schema-file changes rebuild that project's
    /// schema state and type definitions; document changes rebuild its
    /// fragment definitions. A watched change to the config file reloads an
    /// initialized server but deliberately never initializes an
    /// uninitialized one; only an explicit open/save of the config does.
    pub async fn handle_watched_files_changed(&self, changes: &[(PathBuf, FileChangeKind)]) {
        for (path, _kind) in changes {
            if self.is_config_entry(path) {
                if self.is_initialized() {
                    self.reload_config_if_changed().await;
                }
                continue;
            }

            if !self.is_initialized() {
                continue;
            }
            let Some(config) = self.current_config() else {
                continue;
            };

            for (name, project) in config.projects() {
                let key = self.project_key(name);

                if matches_schema_pointer(project, &self.root, path) {
                    if let Err(e) = self
                        .cache
                        .rebuild_schema(&key, project, &self.root, name, false)
                        .await
                    {
                        self.logger
                            .error(&format!("Failed to rebuild schema for '{name}': {e}"));
                    }
                }

                if matches_documents_pattern(project, &self.root, path) {
                    self.cache
                        .rebuild_fragment_definitions(&key, project, &self.root)
                        .await;
                }
            }
        }
    }

    /// textDocument/definition. Empty result when nothing resolves or the
    /// server is uninitialized.
    pub async fn handle_definition_request(
        &self,
        path: &Path,
        position: Position,
    ) -> Vec<DefinitionLocation> {
        if !self.is_initialized() {
            return Vec::new();
        }
        let Some(document) = self.document_or_load(path) else {
            return Vec::new();
        };
        let Some((name, _)) = self.project_for(path) else {
            return Vec::new();
        };
        let key = self.project_key(&name);

        DefinitionResolver::resolve(
            &document,
            position,
            self.cache.get_schema(&key).as_deref(),
            self.cache.type_definitions(&key).as_deref(),
            self.cache.fragment_definitions(&key).as_deref(),
        )
    }

    /// textDocument/hover.
    pub async fn handle_hover_request(&self, path: &Path, position: Position) -> Option<HoverInfo> {
        if !self.is_initialized() {
            return None;
        }
        let document = self.document_or_load(path)?;
        let (name, _) = self.project_for(path)?;
        let key = self.project_key(&name);

        HoverProvider::hover(
            &document,
            position,
            self.cache.get_schema(&key).as_deref(),
            self.cache.fragment_definitions(&key).as_deref(),
        )
    }

    async fn attempt_initialization(&self) {
        let Some(config_path) = find_config_file(&self.root) else {
            self.mark_failed(format!(
                "GraphQL Config file is not available in the provided config directory: {}",
                self.root.display()
            ));
            return;
        };

        let config = match load_config(&config_path) {
            Ok(config) => config,
            Err(e) => {
                self.mark_failed(format!(
                    "GraphQL Config file is not available in the provided config directory: {} ({e})",
                    self.root.display()
                ));
                return;
            }
        };

        let mut all_built = true;
        for (name, project) in config.projects() {
            let key = self.project_key(name);
            if let Err(e) = self
                .cache
                .build_project(&key, project, &self.root, name, true)
                .await
            {
                self.logger
                    .error(&format!("Failed to build project '{name}': {e}"));
                all_built = false;
            }
        }

        let mut state = self.state.write().unwrap();
        if all_built {
            let first_init = !state.is_initialized;
            state.is_initialized = true;
            state.is_config_missing = false;
            state.config_path = Some(config_path);
            state.config = Some(config);
            drop(state);
            if first_init {
                self.logger.info(&format!(
                    "GraphQL language services initialized for {}",
                    self.root.display()
                ));
            }
        } else if !state.is_initialized {
            // Never initialized: stay unusable. An already-initialized
            // server keeps serving from its last good caches instead.
            state.is_config_missing = true;
        }
    }

    fn mark_failed(&self, message: String) {
        let mut state = self.state.write().unwrap();
        if state.is_initialized {
            // Keep serving from the last good config.
            drop(state);
            self.logger.warn(&message);
            return;
        }
        state.is_config_missing = true;
        drop(state);
        self.logger.error(&message);
    }

    /// Reload triggered by a watched change to the config file. A no-op when
    /// the parsed config is identical to the active one.
    async fn reload_config_if_changed(&self) {
        let Some(config_path) = find_config_file(&self.root) else {
            return;
        };
        match load_config(&config_path) {
            Ok(new_config) => {
                let changed = self.state.read().unwrap().config.as_ref() != Some(&new_config);
                if changed {
                    self.attempt_initialization().await;
                }
            }
            Err(e) => {
                self.logger
                    .warn(&format!("Ignoring unusable config change: {e}"));
            }
        }
    }

    fn is_config_entry(&self, path: &Path) -> bool {
        if is_config_file(path) {
            return true;
        }
        self.state.read().unwrap().config_path.as_deref() == Some(path)
    }

    fn current_config(&self) -> Option<GraphQLConfig> {
        self.state.read().unwrap().config.clone()
    }

    /// The project a document belongs to: the first project whose documents
    /// or schema patterns cover it, falling back to the first project.
    fn project_for(&self, path: &Path) -> Option<(String, ProjectConfig)> {
        let state = self.state.read().unwrap();
        let config = state.config.as_ref()?;

        for (name, project) in config.projects() {
            if matches_documents_pattern(project, &self.root, path)
                || matches_schema_pointer(project, &self.root, path)
            {
                return Some((name.to_string(), project.clone()));
            }
        }
        config
            .projects()
            .next()
            .map(|(name, project)| (name.to_string(), project.clone()))
    }

    fn document_or_load(&self, path: &Path) -> Option<Arc<graphql_cache::CachedDocument>> {
        if let Some(document) = self.documents.get(path) {
            return Some(document);
        }
        let text = fs::read_to_string(path).ok()?;
        Some(self.documents.set(path, &text))
    }

    fn diagnostics_for(&self, path: &Path, key: &str) -> Vec<Diagnostic> {
        let Some(document) = self.documents.get(path) else {
            return Vec::new();
        };
        let Some(schema) = self.cache.get_schema(key) else {
            return Vec::new();
        };
        let fragments = self.cache.fragment_definitions(key).unwrap_or_default();
        DiagnosticsEngine::validate(&document, &schema, &fragments)
    }
}
