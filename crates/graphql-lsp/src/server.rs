use crate::conversions::{
    from_lsp_position, to_lsp_diagnostic, to_lsp_hover, to_lsp_location,
};
use crate::{FileChangeKind, MessageProcessor, TracingLogger};
use dashmap::DashMap;
use lsp_types::{
    DidChangeTextDocumentParams, DidChangeWatchedFilesParams, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, DidSaveTextDocumentParams, FileChangeType, GotoDefinitionParams,
    GotoDefinitionResponse, Hover, HoverParams, HoverProviderCapability, InitializeParams,
    InitializeResult, InitializedParams, OneOf, ServerCapabilities, ServerInfo,
    TextDocumentSyncCapability, TextDocumentSyncKind, Uri,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_lsp_server::jsonrpc::Result;
use tower_lsp_server::{Client, LanguageServer, UriExt};

pub struct GraphQLLanguageServer {
    client: Client,
    /// Workspace folders from initialization, kept until configs are loaded
    init_workspace_folders: Arc<DashMap<String, PathBuf>>,
    /// One message processor per workspace folder URI
    processors: Arc<DashMap<String, Arc<MessageProcessor>>>,
}

impl GraphQLLanguageServer {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            init_workspace_folders: Arc::new(DashMap::new()),
            processors: Arc::new(DashMap::new()),
        }
    }

    /// The processor owning a document, by longest matching workspace root.
    fn processor_for(&self, uri: &Uri) -> Option<(Arc<MessageProcessor>, PathBuf)> {
        let path = uri.to_file_path()?.into_owned();
        let mut best: Option<(Arc<MessageProcessor>, usize)> = None;

        for entry in self.init_workspace_folders.iter() {
            let root = entry.value();
            if path.starts_with(root) {
                let depth = root.components().count();
                if let Some(processor) = self.processors.get(entry.key()) {
                    if best.as_ref().is_none_or(|(_, d)| depth > *d) {
                        best = Some((Arc::clone(processor.value()), depth));
                    }
                }
            }
        }

        best.map(|(processor, _)| (processor, path))
    }

    async fn publish(&self, uri: Uri, diagnostics: Vec<graphql_cache::Diagnostic>) {
        let converted = diagnostics.iter().map(to_lsp_diagnostic).collect();
        self.client.publish_diagnostics(uri, converted, None).await;
    }
}

impl LanguageServer for GraphQLLanguageServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        tracing::info!("Initializing GraphQL Language Server");

        if let Some(ref folders) = params.workspace_folders {
            for folder in folders {
                if let Some(path) = folder.uri.to_file_path() {
                    self.init_workspace_folders
                        .insert(folder.uri.to_string(), path.into_owned());
                }
            }
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                definition_provider: Some(OneOf::Left(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "GraphQL Language Server".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        let folders: Vec<_> = self
            .init_workspace_folders
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        for (uri, path) in folders {
            let processor = Arc::new(MessageProcessor::new(path, Arc::new(TracingLogger)));
            processor.initialize().await;
            self.processors.insert(uri, processor);
        }
    }

    async fn shutdown(&self) -> Result<()> {
        tracing::info!("Shutting down GraphQL Language Server");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        tracing::debug!("Document opened: {:?}", uri);

        let Some((processor, path)) = self.processor_for(&uri) else {
            return;
        };
        let diagnostics = processor
            .handle_did_open_or_save(&path, Some(&params.text_document.text))
            .await;
        self.publish(uri, diagnostics).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        tracing::debug!("Document changed: {:?}", uri);

        let Some((processor, path)) = self.processor_for(&uri) else {
            return;
        };
        // Full sync: the last content change carries the whole document.
        let Some(change) = params.content_changes.into_iter().last() else {
            return;
        };
        if let Some(diagnostics) = processor.handle_did_change(&path, &change.text).await {
            self.publish(uri, diagnostics).await;
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;
        tracing::debug!("Document saved: {:?}", uri);

        let Some((processor, path)) = self.processor_for(&uri) else {
            return;
        };
        let diagnostics = processor
            .handle_did_open_or_save(&path, params.text.as_deref())
            .await;
        self.publish(uri, diagnostics).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        if let Some((processor, path)) = self.processor_for(&uri) {
            processor.handle_did_close(&path);
        }
        self.client.publish_diagnostics(uri, vec![], None).await;
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        // Group the changes per workspace so each processor sees its own
        // files in arrival order.
        let mut grouped: Vec<(Arc<MessageProcessor>, Vec<(PathBuf, FileChangeKind)>)> = Vec::new();

        for event in params.changes {
            let Some((processor, path)) = self.processor_for(&event.uri) else {
                continue;
            };
            let kind = match event.typ {
                FileChangeType::CREATED => FileChangeKind::Created,
                FileChangeType::DELETED => FileChangeKind::Deleted,
                _ => FileChangeKind::Changed,
            };
            match grouped
                .iter_mut()
                .find(|(existing, _)| Arc::ptr_eq(existing, &processor))
            {
                Some((_, changes)) => changes.push((path, kind)),
                None => grouped.push((processor, vec![(path, kind)])),
            }
        }

        for (processor, changes) in grouped {
            processor.handle_watched_files_changed(&changes).await;
        }
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let Some((processor, path)) = self.processor_for(&uri) else {
            return Ok(None);
        };

        let position = from_lsp_position(params.text_document_position_params.position);
        let locations = processor.handle_definition_request(&path, position).await;
        let converted: Vec<_> = locations.iter().filter_map(to_lsp_location).collect();

        if converted.is_empty() {
            Ok(None)
        } else {
            Ok(Some(GotoDefinitionResponse::Array(converted)))
        }
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let Some((processor, path)) = self.processor_for(&uri) else {
            return Ok(None);
        };

        let position = from_lsp_position(params.text_document_position_params.position);
        Ok(processor
            .handle_hover_request(&path, position)
            .await
            .map(to_lsp_hover))
    }
}
