use crate::{Position, Range};

/// Pre-computed line start offsets for position/offset conversions.
///
/// Built once per text, O(1) `position_to_offset` and O(log L)
/// `offset_to_position` afterwards.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset of the start of each line; index 0 is always 0.
    line_starts: Vec<usize>,
}

impl LineIndex {
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        let mut offset = 0;
        for ch in text.chars() {
            offset += ch.len_utf8();
            if ch == '\n' {
                line_starts.push(offset);
            }
        }
        Self { line_starts }
    }

    /// `None` when the line is out of bounds. Character offsets past the end
    /// of a line are not validated.
    #[must_use]
    pub fn position_to_offset(&self, position: Position) -> Option<usize> {
        let line_start = *self.line_starts.get(position.line)?;
        Some(line_start + position.character)
    }

    #[must_use]
    pub fn offset_to_position(&self, offset: usize) -> Position {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        };
        Position::new(line, offset.saturating_sub(self.line_starts[line]))
    }

    /// Convert a byte span into a `Range`.
    #[must_use]
    pub fn span_to_range(&self, start: usize, end: usize) -> Range {
        Range::new(self.offset_to_position(start), self.offset_to_position(end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_positions_to_offsets() {
        let index = LineIndex::new("line 0\nline 1\nline 2");
        assert_eq!(index.position_to_offset(Position::new(0, 0)), Some(0));
        assert_eq!(index.position_to_offset(Position::new(1, 0)), Some(7));
        assert_eq!(index.position_to_offset(Position::new(1, 5)), Some(12));
        assert_eq!(index.position_to_offset(Position::new(9, 0)), None);
    }

    #[test]
    fn maps_offsets_to_positions() {
        let index = LineIndex::new("line 0\nline 1\nline 2");
        assert_eq!(index.offset_to_position(0), Position::new(0, 0));
        assert_eq!(index.offset_to_position(7), Position::new(1, 0));
        assert_eq!(index.offset_to_position(10), Position::new(1, 3));
        assert_eq!(index.offset_to_position(14), Position::new(2, 0));
    }

    #[test]
    fn handles_empty_text() {
        let index = LineIndex::new("");
        assert_eq!(index.position_to_offset(Position::new(0, 0)), Some(0));
        assert_eq!(index.offset_to_position(0), Position::new(0, 0));
    }

    #[test]
    fn span_covers_multiple_lines() {
        let index = LineIndex::new("a\nbb\nccc");
        let range = index.span_to_range(2, 7);
        assert_eq!(range.start, Position::new(1, 0));
        assert_eq!(range.end, Position::new(2, 2));
    }
}
