use crate::{
    CachedDocument, Diagnostic, FragmentDefinitionEntry, OperationUnit, Position, Range,
    SchemaState,
};
use apollo_compiler::validation::{DiagnosticList, Valid};
use apollo_compiler::ExecutableDocument;
use apollo_parser::cst::{self, CstNode};
use std::collections::{HashMap, HashSet};

/// Validates cached documents against the current schema and fragment caches
/// and maps every failure to a source-ranged diagnostic.
pub struct DiagnosticsEngine;

impl DiagnosticsEngine {
    /// Validate every operation unit of `document`. Units that failed to
    /// parse contribute their parser errors; clean units are validated
    /// against the schema together with any externally-required fragments
    /// from the project cache. A valid document yields an empty list.
    #[must_use]
    pub fn validate(
        document: &CachedDocument,
        schema: &SchemaState,
        fragment_definitions: &HashMap<String, FragmentDefinitionEntry>,
    ) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for unit in &document.units {
            if unit.syntax_errors.is_empty() {
                diagnostics.extend(Self::validate_unit(
                    unit,
                    document,
                    schema,
                    fragment_definitions,
                ));
            } else {
                diagnostics.extend(
                    unit.syntax_errors
                        .iter()
                        .map(|error| Diagnostic::error(error.range, &error.message)),
                );
            }
        }

        diagnostics
    }

    fn validate_unit(
        unit: &OperationUnit,
        document: &CachedDocument,
        schema: &SchemaState,
        fragment_definitions: &HashMap<String, FragmentDefinitionEntry>,
    ) -> Vec<Diagnostic> {
        let tree = apollo_parser::Parser::new(&unit.text).parse();
        let doc = tree.document();

        // Pad the unit to its position in the file so the engine reports
        // file-absolute locations.
        let line_offset = unit.range.start.line;
        let mut source = "\n".repeat(line_offset);
        source.push_str(&unit.text);

        let local_fragments = local_fragment_names(&doc);
        for entry in required_external_fragments(&doc, &local_fragments, fragment_definitions) {
            source.push_str("\n\n");
            source.push_str(&entry.text);
        }

        let is_fragment_only = {
            let mut definitions = doc.definitions().peekable();
            definitions.peek().is_some()
                && doc
                    .definitions()
                    .all(|d| matches!(d, cst::Definition::FragmentDefinition(_)))
        };

        let valid_schema = Valid::assume_valid_ref(&schema.schema);
        let file_name = document.path.display().to_string();
        match ExecutableDocument::parse_and_validate(valid_schema, source, file_name) {
            Ok(_) => Vec::new(),
            Err(with_errors) => {
                let mut diagnostics =
                    convert_compiler_diagnostics(&with_errors.errors, is_fragment_only);
                // Errors located in the appended fragment region belong to
                // other files; keep only what falls inside this unit.
                let end_line = unit.range.end.line;
                diagnostics.retain(|d| {
                    d.range.start.line >= line_offset && d.range.start.line <= end_line
                });
                diagnostics
            }
        }
    }
}

/// Names of fragments defined inside the unit itself.
fn local_fragment_names(doc: &cst::Document) -> HashSet<String> {
    doc.syntax()
        .descendants()
        .filter_map(cst::FragmentDefinition::cast)
        .filter_map(|frag| frag.fragment_name().and_then(|n| n.name()))
        .map(|name| name.text().to_string())
        .collect()
}

fn spread_names(doc: &cst::Document) -> HashSet<String> {
    doc.syntax()
        .descendants()
        .filter_map(cst::FragmentSpread::cast)
        .filter_map(|spread| spread.fragment_name().and_then(|n| n.name()))
        .map(|name| name.text().to_string())
        .collect()
}

/// Fragments the unit spreads but does not define, resolved transitively
/// through the project fragment cache. Returned in sorted name order so the
/// synthesized validation source is deterministic.
fn required_external_fragments<'a>(
    doc: &cst::Document,
    local_fragments: &HashSet<String>,
    fragment_definitions: &'a HashMap<String, FragmentDefinitionEntry>,
) -> Vec<&'a FragmentDefinitionEntry> {
    let mut seen = local_fragments.clone();
    let mut queue: Vec<String> = spread_names(doc).into_iter().collect();
    let mut required = Vec::new();

    while let Some(name) = queue.pop() {
        if !seen.insert(name.clone()) {
            continue;
        }
        if let Some(entry) = fragment_definitions.get(&name) {
            let tree = apollo_parser::Parser::new(&entry.text).parse();
            queue.extend(spread_names(&tree.document()));
            required.push(entry);
        }
    }

    required.sort_by(|a, b| a.name.cmp(&b.name));
    required
}

fn convert_compiler_diagnostics(
    compiler_diagnostics: &DiagnosticList,
    is_fragment_only: bool,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for diag in compiler_diagnostics.iter() {
        let message = diag.error.to_string();

        // A file holding only fragments is not an executable document on its
        // own; "unused fragment" noise is expected there.
        if is_fragment_only {
            let lower = message.to_lowercase();
            if lower.contains("unused") || lower.contains("never used") || lower.contains("must be used")
            {
                continue;
            }
        }

        let Some(location) = diag.line_column_range() else {
            continue;
        };
        // apollo-compiler reports 1-based positions.
        let range = Range::new(
            Position::new(
                location.start.line.saturating_sub(1),
                location.start.column.saturating_sub(1),
            ),
            Position::new(
                location.end.line.saturating_sub(1),
                location.end.column.saturating_sub(1),
            ),
        );
        diagnostics.push(Diagnostic::error(range, message));
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SchemaSourceKind, Severity, TextDocumentCache};
    use std::path::{Path, PathBuf};
    use std::time::SystemTime;

    fn schema_state(sdl: &str) -> SchemaState {
        SchemaState {
            schema: apollo_compiler::Schema::parse(sdl, "schema.graphql").unwrap(),
            files: Vec::new(),
            kind: SchemaSourceKind::Local,
            built_at: SystemTime::now(),
        }
    }

    fn fragments(entries: &[(&str, &str, &str)]) -> HashMap<String, FragmentDefinitionEntry> {
        entries
            .iter()
            .map(|(name, type_condition, text)| {
                (
                    (*name).to_string(),
                    FragmentDefinitionEntry {
                        name: (*name).to_string(),
                        type_condition: (*type_condition).to_string(),
                        file_path: PathBuf::from("/tmp/fragments.graphql"),
                        range: Range::default(),
                        text: (*text).to_string(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn a_valid_document_yields_an_empty_list() {
        let schema = schema_state("type Query { foo: String }");
        let documents = TextDocumentCache::new();
        let doc = documents.set(Path::new("/tmp/q.graphql"), "query { foo }");

        let diagnostics = DiagnosticsEngine::validate(&doc, &schema, &HashMap::new());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn an_unknown_field_is_reported_with_its_location() {
        let schema = schema_state("type Query { episodes: [Episode] }\ntype Episode { name: String }");
        let documents = TextDocumentCache::new();
        let doc = documents.set(
            Path::new("/tmp/q.graphql"),
            "query { episodes { nop } }",
        );

        let diagnostics = DiagnosticsEngine::validate(&doc, &schema, &HashMap::new());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Error);
        assert!(diagnostics[0].message.contains("nop"));
        assert!(diagnostics[0].message.contains("Episode"));
        assert_eq!(diagnostics[0].range.start.line, 0);
        assert_eq!(diagnostics[0].range.start.character, 19);
    }

    #[test]
    fn parse_failures_stay_local_to_their_unit() {
        let schema = schema_state("type Query { ok: String }");
        let documents = TextDocumentCache::new();
        let doc = documents.set(
            Path::new("/tmp/q.ts"),
            "const A = gql`query {{`;\nconst B = gql`query { missing }`;\n",
        );

        let diagnostics = DiagnosticsEngine::validate(&doc, &schema, &HashMap::new());
        // The broken unit reports parser errors; the clean sibling is still
        // validated and reports the unknown field.
        assert!(diagnostics.iter().any(|d| d.range.start.line == 0));
        assert!(diagnostics
            .iter()
            .any(|d| d.message.contains("missing") && d.range.start.line == 1));
    }

    #[test]
    fn external_fragments_are_spliced_in_for_validation() {
        let schema = schema_state("type Query { foo: Foo }\ntype Foo { bar: String }");
        let documents = TextDocumentCache::new();
        let doc = documents.set(Path::new("/tmp/q.graphql"), "query { foo { ...B } }");

        let diagnostics = DiagnosticsEngine::validate(
            &doc,
            &schema,
            &fragments(&[("B", "Foo", "fragment B on Foo { bar }")]),
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn fragment_errors_do_not_leak_into_the_spreading_document() {
        let schema = schema_state("type Query { foo: Foo }\ntype Foo { bar: String }");
        let documents = TextDocumentCache::new();
        let doc = documents.set(Path::new("/tmp/q.graphql"), "query { foo { ...B } }");

        // The cached fragment selects a field Foo no longer has; that error
        // belongs to the fragment's own file.
        let diagnostics = DiagnosticsEngine::validate(
            &doc,
            &schema,
            &fragments(&[("B", "Foo", "fragment B on Foo { gone }")]),
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn fragment_only_documents_skip_unused_fragment_noise() {
        let schema = schema_state("type Query { foo: Foo }\ntype Foo { bar: String }");
        let documents = TextDocumentCache::new();
        let doc = documents.set(
            Path::new("/tmp/fragments.graphql"),
            "fragment B on Foo { bar }",
        );

        let diagnostics = DiagnosticsEngine::validate(&doc, &schema, &HashMap::new());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn fragment_only_documents_still_catch_bad_fields() {
        let schema = schema_state("type Query { foo: Foo }\ntype Foo { bar: String }");
        let documents = TextDocumentCache::new();
        let doc = documents.set(
            Path::new("/tmp/fragments.graphql"),
            "fragment B on Foo { vanished }",
        );

        let diagnostics = DiagnosticsEngine::validate(&doc, &schema, &HashMap::new());
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("vanished"));
    }

    #[test]
    fn embedded_units_report_file_absolute_lines() {
        let schema = schema_state("type Query { ok: String }");
        let documents = TextDocumentCache::new();
        let doc = documents.set(
            Path::new("/tmp/q.ts"),
            "import gql from 'graphql-tag';\n\nconst Q = gql`\nquery {\n  wrong\n}\n`;\n",
        );

        let diagnostics = DiagnosticsEngine::validate(&doc, &schema, &HashMap::new());
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("wrong"));
        assert_eq!(diagnostics[0].range.start.line, 4);
    }
}
