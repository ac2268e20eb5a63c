use crate::{LineIndex, Position, Range};
use graphql_extract::{extract_from_source, ExtractConfig, Language};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// A parse error recorded for one operation unit, in whole-file coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub range: Range,
}

/// One GraphQL document embedded in a tracked file: raw `.graphql` files hold
/// a single unit spanning the file, JS/TS files hold one unit per template.
#[derive(Debug, Clone)]
pub struct OperationUnit {
    /// The unit's GraphQL text.
    pub text: String,

    /// Where the unit sits in the original file.
    pub range: Range,

    /// Errors from parsing this unit. A failing unit keeps its slot; sibling
    /// units in the same file stay usable.
    pub syntax_errors: Vec<SyntaxError>,
}

impl OperationUnit {
    /// Position within the unit's own text for a whole-file position.
    #[must_use]
    pub fn relative_position(&self, position: Position) -> Position {
        let line = position.line - self.range.start.line;
        let character = if position.line == self.range.start.line {
            position.character.saturating_sub(self.range.start.character)
        } else {
            position.character
        };
        Position::new(line, character)
    }
}

/// Parsed content of one open/tracked file.
#[derive(Debug, Clone)]
pub struct CachedDocument {
    pub path: PathBuf,
    pub units: Vec<OperationUnit>,
}

impl CachedDocument {
    /// The unit whose range contains `position`, if any.
    #[must_use]
    pub fn unit_at(&self, position: Position) -> Option<&OperationUnit> {
        self.units.iter().find(|unit| unit.range.contains(position))
    }
}

/// Cache of open/tracked documents, replaced wholesale per file on every
/// open, change or save; removed on close.
pub struct TextDocumentCache {
    documents: RwLock<HashMap<PathBuf, Arc<CachedDocument>>>,
}

impl TextDocumentCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Split `text` into operation units, parse each, and replace the cache
    /// entry for `path`.
    pub fn set(&self, path: &Path, text: &str) -> Arc<CachedDocument> {
        let units = split_into_units(path, text);
        let document = Arc::new(CachedDocument {
            path: path.to_path_buf(),
            units,
        });
        self.documents
            .write()
            .unwrap()
            .insert(path.to_path_buf(), Arc::clone(&document));
        document
    }

    #[must_use]
    pub fn get(&self, path: &Path) -> Option<Arc<CachedDocument>> {
        self.documents.read().unwrap().get(path).cloned()
    }

    pub fn remove(&self, path: &Path) {
        self.documents.write().unwrap().remove(path);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.read().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.read().unwrap().is_empty()
    }
}

impl Default for TextDocumentCache {
    fn default() -> Self {
        Self::new()
    }
}

fn split_into_units(path: &Path, text: &str) -> Vec<OperationUnit> {
    // Unknown extensions are treated as raw GraphQL; the parser will complain
    // if they are not.
    let language = Language::from_path(path).unwrap_or(Language::GraphQL);
    let Ok(embedded) = extract_from_source(text, language, &ExtractConfig::default()) else {
        return Vec::new();
    };

    embedded
        .into_iter()
        .map(|doc| {
            let tree = apollo_parser::Parser::new(&doc.text).parse();
            let line_index = LineIndex::new(&doc.text);
            let base = Position::new(doc.range.start.line, doc.range.start.column);

            let syntax_errors = tree
                .errors()
                .map(|error| {
                    let start = line_index.offset_to_position(error.index());
                    let end = line_index
                        .offset_to_position(error.index() + error.data().len().max(1));
                    SyntaxError {
                        message: error.message().to_string(),
                        range: Range::new(start.absolute_in(base), end.absolute_in(base)),
                    }
                })
                .collect();

            OperationUnit {
                text: doc.text,
                range: Range::new(
                    Position::new(doc.range.start.line, doc.range.start.column),
                    Position::new(doc.range.end.line, doc.range.end.column),
                ),
                syntax_errors,
            }
        })
        .collect()
}
