//! Conversions between the engine's plain types and `lsp_types`.

use graphql_cache::{DefinitionLocation, Diagnostic, HoverInfo, Position, Range, Severity};
use tower_lsp_server::UriExt;

#[allow(clippy::cast_possible_truncation)]
pub fn to_lsp_position(position: Position) -> lsp_types::Position {
    lsp_types::Position {
        line: position.line as u32,
        character: position.character as u32,
    }
}

pub fn from_lsp_position(position: lsp_types::Position) -> Position {
    Position::new(position.line as usize, position.character as usize)
}

pub fn to_lsp_range(range: Range) -> lsp_types::Range {
    lsp_types::Range {
        start: to_lsp_position(range.start),
        end: to_lsp_position(range.end),
    }
}

pub fn to_lsp_diagnostic(diagnostic: &Diagnostic) -> lsp_types::Diagnostic {
    lsp_types::Diagnostic {
        range: to_lsp_range(diagnostic.range),
        severity: Some(match diagnostic.severity {
            Severity::Error => lsp_types::DiagnosticSeverity::ERROR,
            Severity::Warning => lsp_types::DiagnosticSeverity::WARNING,
            Severity::Information => lsp_types::DiagnosticSeverity::INFORMATION,
            Severity::Hint => lsp_types::DiagnosticSeverity::HINT,
        }),
        source: Some(diagnostic.source.clone()),
        message: diagnostic.message.clone(),
        ..Default::default()
    }
}

pub fn to_lsp_location(location: &DefinitionLocation) -> Option<lsp_types::Location> {
    let uri = lsp_types::Uri::from_file_path(&location.file_path)?;
    Some(lsp_types::Location {
        uri,
        range: to_lsp_range(location.range),
    })
}

pub fn to_lsp_hover(hover: HoverInfo) -> lsp_types::Hover {
    lsp_types::Hover {
        contents: lsp_types::HoverContents::Markup(lsp_types::MarkupContent {
            kind: lsp_types::MarkupKind::Markdown,
            value: hover.contents,
        }),
        range: hover.range.map(to_lsp_range),
    }
}
