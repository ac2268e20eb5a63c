use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Position in a document (0-indexed line and character).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct Position {
    pub line: usize,
    pub character: usize,
}

impl Position {
    #[must_use]
    pub const fn new(line: usize, character: usize) -> Self {
        Self { line, character }
    }

    /// Translate a position that is relative to an embedded block into
    /// whole-file coordinates, given the block's start position.
    #[must_use]
    pub const fn absolute_in(self, base: Position) -> Self {
        if self.line == 0 {
            Self::new(base.line, base.character + self.character)
        } else {
            Self::new(base.line + self.line, self.character)
        }
    }
}

/// Range in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    #[must_use]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Whether `position` falls inside this range. The end bound is
    /// inclusive: a cursor sitting right after the last character still
    /// belongs to the range.
    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        self.start <= position && position <= self.end
    }
}

/// Diagnostic severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

/// A diagnostic message attached to a source range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub range: Range,
    pub severity: Severity,
    pub message: String,
    pub source: String,
}

impl Diagnostic {
    pub fn error(range: Range, message: impl Into<String>) -> Self {
        Self {
            range,
            severity: Severity::Error,
            message: message.into(),
            source: "graphql".to_string(),
        }
    }

    pub fn warning(range: Range, message: impl Into<String>) -> Self {
        Self {
            range,
            severity: Severity::Warning,
            message: message.into(),
            source: "graphql".to_string(),
        }
    }
}

/// Location a definition query resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionLocation {
    pub file_path: PathBuf,
    pub range: Range,
}

impl DefinitionLocation {
    #[must_use]
    pub const fn new(file_path: PathBuf, range: Range) -> Self {
        Self { file_path, range }
    }
}

/// Markdown content for a hover response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverInfo {
    pub contents: String,
    pub range: Option<Range>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_contains_is_end_inclusive() {
        let range = Range::new(Position::new(0, 2), Position::new(0, 5));
        assert!(range.contains(Position::new(0, 2)));
        assert!(range.contains(Position::new(0, 5)));
        assert!(!range.contains(Position::new(0, 6)));
        assert!(!range.contains(Position::new(1, 0)));
    }

    #[test]
    fn absolute_position_offsets_only_the_first_line() {
        let base = Position::new(3, 10);
        assert_eq!(
            Position::new(0, 4).absolute_in(base),
            Position::new(3, 14)
        );
        assert_eq!(Position::new(2, 4).absolute_in(base), Position::new(5, 4));
    }
}
