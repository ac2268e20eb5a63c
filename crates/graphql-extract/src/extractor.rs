use crate::{ExtractError, Language, Position, Range, Result};
use std::fs;
use std::path::Path;

/// Configuration for GraphQL extraction from JS/TS sources.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Template tag identifiers to extract, e.g. gql`query { ... }`
    pub tag_identifiers: Vec<String>,

    /// Magic comment marking an untagged template: /* GraphQL */ `...`
    pub magic_comment: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            tag_identifiers: vec!["gql".to_string(), "graphql".to_string()],
            magic_comment: "GraphQL".to_string(),
        }
    }
}

/// One GraphQL document found in a source file, with its location in the
/// original file's coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedDocument {
    /// The raw GraphQL text.
    pub text: String,

    /// Byte offset of `text` in the original file.
    pub offset: usize,

    /// Range of `text` in the original file (0-indexed).
    pub range: Range,
}

/// Extract GraphQL documents from a file.
pub fn extract_from_file(path: &Path, config: &ExtractConfig) -> Result<Vec<EmbeddedDocument>> {
    let language = Language::from_path(path)
        .ok_or_else(|| ExtractError::UnsupportedFileType(path.to_path_buf()))?;
    let source = fs::read_to_string(path)?;
    extract_from_source(&source, language, config)
}

/// Extract GraphQL documents from source text.
///
/// Raw GraphQL files yield a single document spanning the whole file. JS/TS
/// files yield one document per tagged (or magic-commented) template literal,
/// in source order.
pub fn extract_from_source(
    source: &str,
    language: Language,
    config: &ExtractConfig,
) -> Result<Vec<EmbeddedDocument>> {
    match language {
        Language::GraphQL => Ok(vec![EmbeddedDocument {
            text: source.to_string(),
            offset: 0,
            range: Range::new(Position::new(0, 0), end_position(source)),
        }]),
        Language::TypeScript | Language::JavaScript => Ok(Scanner::new(source).scan(config)),
    }
}

fn end_position(source: &str) -> Position {
    let mut line = 0;
    let mut column = 0;
    for ch in source.chars() {
        if ch == '\n' {
            line += 1;
            column = 0;
        } else {
            column += 1;
        }
    }
    Position::new(line, column)
}

/// Hand-rolled scanner over JS/TS source. Understands just enough of the
/// syntax to find tagged template literals without being fooled by strings
/// and comments; interpolation inside a template is left in the extracted
/// text and surfaces later as a parse diagnostic.
struct Scanner<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Scanner<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().collect(),
            pos: 0,
            line: 0,
            column: 0,
        }
    }

    fn scan(mut self, config: &ExtractConfig) -> Vec<EmbeddedDocument> {
        let mut documents = Vec::new();
        // Set when the last meaningful token was a recognized tag or magic
        // comment; only whitespace may separate it from the template.
        let mut tag_pending = false;

        while let Some(ch) = self.current() {
            match ch {
                '/' if self.peek_next() == Some('/') => {
                    self.skip_line_comment();
                }
                '/' if self.peek_next() == Some('*') => {
                    let comment = self.read_block_comment();
                    if comment.trim() == config.magic_comment {
                        tag_pending = true;
                    }
                }
                '\'' | '"' => {
                    self.skip_quoted(ch);
                    tag_pending = false;
                }
                '`' => {
                    if tag_pending {
                        tag_pending = false;
                        if let Some(doc) = self.read_template() {
                            documents.push(doc);
                        }
                    } else {
                        self.read_template();
                    }
                }
                ch if ch.is_alphabetic() || ch == '_' || ch == '$' => {
                    let word = self.read_word();
                    tag_pending = config.tag_identifiers.iter().any(|tag| *tag == word);
                }
                ch if ch.is_whitespace() => {
                    self.bump();
                }
                _ => {
                    self.bump();
                    tag_pending = false;
                }
            }
        }

        documents
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, ch)| ch)
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos + 1).map(|&(_, ch)| ch)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map_or(self.source.len(), |&(offset, _)| offset)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.current()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.current() {
            if ch == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn read_block_comment(&mut self) -> String {
        self.bump();
        self.bump();
        let start = self.offset();
        let mut end = start;
        while let Some(ch) = self.current() {
            if ch == '*' && self.peek_next() == Some('/') {
                end = self.offset();
                self.bump();
                self.bump();
                break;
            }
            self.bump();
        }
        self.source[start..end].to_string()
    }

    fn skip_quoted(&mut self, quote: char) {
        self.bump();
        while let Some(ch) = self.current() {
            match ch {
                '\\' => {
                    self.bump();
                    self.bump();
                }
                ch if ch == quote || ch == '\n' => {
                    self.bump();
                    return;
                }
                _ => {
                    self.bump();
                }
            }
        }
    }

    /// Consume a template literal, returning its content. The scanner sits on
    /// the opening backtick; an unterminated template yields nothing.
    fn read_template(&mut self) -> Option<EmbeddedDocument> {
        self.bump();
        let start_offset = self.offset();
        let start = Position::new(self.line, self.column);

        while let Some(ch) = self.current() {
            match ch {
                '\\' => {
                    self.bump();
                    self.bump();
                }
                '`' => {
                    let end_offset = self.offset();
                    let end = Position::new(self.line, self.column);
                    self.bump();
                    return Some(EmbeddedDocument {
                        text: self.source[start_offset..end_offset].to_string(),
                        offset: start_offset,
                        range: Range::new(start, end),
                    });
                }
                _ => {
                    self.bump();
                }
            }
        }

        None
    }

    fn read_word(&mut self) -> String {
        let start = self.offset();
        while let Some(ch) = self.current() {
            if ch.is_alphanumeric() || ch == '_' || ch == '$' {
                self.bump();
            } else {
                break;
            }
        }
        self.source[start..self.offset()].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_graphql_is_one_document() {
        let source = "query GetUser {\n  user { id }\n}\n";
        let docs = extract_from_source(source, Language::GraphQL, &ExtractConfig::default())
            .unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, source);
        assert_eq!(docs[0].range.start, Position::new(0, 0));
        assert_eq!(docs[0].range.end, Position::new(3, 0));
    }

    #[test]
    fn extracts_tagged_templates() {
        let source = "import { gql } from '@apollo/client';\n\nconst A = gql`query GetUser { user { id } }`;\nconst B = graphql`\nfragment UserFields on User {\n  id\n}\n`;\n";
        let docs =
            extract_from_source(source, Language::TypeScript, &ExtractConfig::default()).unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].text, "query GetUser { user { id } }");
        assert_eq!(docs[0].range.start, Position::new(2, 14));
        assert_eq!(docs[0].range.end, Position::new(2, 43));
        assert!(docs[1].text.contains("fragment UserFields"));
        assert_eq!(docs[1].range.start, Position::new(3, 18));
        assert_eq!(docs[1].range.end, Position::new(7, 0));
    }

    #[test]
    fn magic_comment_marks_a_template() {
        let source = "const QUERY = /* GraphQL */ `{ viewer { id } }`;\n";
        let docs =
            extract_from_source(source, Language::JavaScript, &ExtractConfig::default()).unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "{ viewer { id } }");
    }

    #[test]
    fn ignores_untagged_templates_and_comments() {
        let source = "const a = `select * from t`;\n// gql`not me`\nconst b = 'gql`nor me`';\n";
        let docs =
            extract_from_source(source, Language::JavaScript, &ExtractConfig::default()).unwrap();

        assert!(docs.is_empty());
    }

    #[test]
    fn tag_must_be_adjacent() {
        // An intervening token breaks the tag-template association.
        let source = "const x = gql + `query { a }`;\n";
        let docs =
            extract_from_source(source, Language::JavaScript, &ExtractConfig::default()).unwrap();
        assert!(docs.is_empty());
    }
}
