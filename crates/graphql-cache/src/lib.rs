mod cache;
mod definition;
mod diagnostics;
mod documents;
mod error;
mod hover;
mod introspect;
mod line_index;
mod schema;
mod syntax;
mod types;

pub use cache::{FragmentDefinitionEntry, ProjectCache, TypeDefinitionEntry};
pub use definition::DefinitionResolver;
pub use diagnostics::DiagnosticsEngine;
pub use documents::{CachedDocument, OperationUnit, SyntaxError, TextDocumentCache};
pub use error::{CacheError, Result};
pub use hover::HoverProvider;
pub use introspect::{fetch_introspection, introspection_to_sdl, IntrospectionResult};
pub use line_index::LineIndex;
pub use schema::{
    generated_schema_path, matches_documents_pattern, matches_schema_pointer, SchemaFile,
    SchemaSource, SchemaSourceKind, SchemaState,
};
pub use types::{DefinitionLocation, Diagnostic, HoverInfo, Position, Range, Severity};
