use crate::syntax::{find_node_at_offset, TargetNode};
use crate::{
    CachedDocument, DefinitionLocation, FragmentDefinitionEntry, LineIndex, Position, SchemaState,
    TypeDefinitionEntry,
};
use std::collections::HashMap;

/// Maps a cursor position to the location defining the element under it.
pub struct DefinitionResolver;

impl DefinitionResolver {
    /// Resolve `(document, position)` to zero or more definition locations.
    ///
    /// Fragment spreads resolve through the project fragment cache, named
    /// types through the type-definition cache, and field selections to the
    /// cache entry of the type that owns the field. Unresolved references are
    /// a normal editing-time state and yield an empty result.
    #[must_use]
    pub fn resolve(
        document: &CachedDocument,
        position: Position,
        schema: Option<&SchemaState>,
        type_definitions: Option<&HashMap<String, TypeDefinitionEntry>>,
        fragment_definitions: Option<&HashMap<String, FragmentDefinitionEntry>>,
    ) -> Vec<DefinitionLocation> {
        let Some(unit) = document.unit_at(position) else {
            return Vec::new();
        };
        if !unit.syntax_errors.is_empty() {
            return Vec::new();
        }

        let relative = unit.relative_position(position);
        let line_index = LineIndex::new(&unit.text);
        let Some(offset) = line_index.position_to_offset(relative) else {
            return Vec::new();
        };

        let tree = apollo_parser::Parser::new(&unit.text).parse();
        let Some(target) =
            find_node_at_offset(&tree.document(), offset, schema.map(|s| &s.schema))
        else {
            return Vec::new();
        };

        match target {
            TargetNode::FragmentSpread { name } => fragment_definitions
                .and_then(|map| map.get(&name))
                .map(|entry| vec![DefinitionLocation::new(entry.file_path.clone(), entry.range)])
                .unwrap_or_default(),
            TargetNode::NamedType { name } => Self::type_location(type_definitions, &name),
            TargetNode::Field {
                parent_type: Some(parent),
                ..
            } => Self::type_location(type_definitions, &parent),
            TargetNode::Field {
                parent_type: None, ..
            } => Vec::new(),
        }
    }

    fn type_location(
        type_definitions: Option<&HashMap<String, TypeDefinitionEntry>>,
        name: &str,
    ) -> Vec<DefinitionLocation> {
        type_definitions
            .and_then(|map| map.get(name))
            .map(|entry| vec![DefinitionLocation::new(entry.file_path.clone(), entry.range)])
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Range, SchemaSourceKind, TextDocumentCache};
    use std::path::{Path, PathBuf};
    use std::time::SystemTime;

    fn schema_state() -> SchemaState {
        SchemaState {
            schema: apollo_compiler::Schema::parse(
                "type Query { foo: Foo }\n\ntype Foo { bar: String }",
                "schema.graphql",
            )
            .unwrap(),
            files: Vec::new(),
            kind: SchemaSourceKind::Local,
            built_at: SystemTime::now(),
        }
    }

    fn type_entries() -> HashMap<String, TypeDefinitionEntry> {
        let mut map = HashMap::new();
        map.insert(
            "Foo".to_string(),
            TypeDefinitionEntry {
                name: "Foo".to_string(),
                file_path: PathBuf::from("/tmp/schema.graphql"),
                range: Range::new(Position::new(2, 0), Position::new(2, 24)),
            },
        );
        map
    }

    fn fragment_entries() -> HashMap<String, FragmentDefinitionEntry> {
        let mut map = HashMap::new();
        map.insert(
            "B".to_string(),
            FragmentDefinitionEntry {
                name: "B".to_string(),
                type_condition: "Foo".to_string(),
                file_path: PathBuf::from("/tmp/fragments.graphql"),
                range: Range::new(Position::new(0, 0), Position::new(0, 25)),
                text: "fragment B on Foo { bar }".to_string(),
            },
        );
        map
    }

    #[test]
    fn fragment_spread_resolves_to_its_definition() {
        let documents = TextDocumentCache::new();
        let doc = documents.set(Path::new("/tmp/query.graphql"), "query { bar ...B }");

        let locations = DefinitionResolver::resolve(
            &doc,
            Position::new(0, 16),
            Some(&schema_state()),
            Some(&type_entries()),
            Some(&fragment_entries()),
        );

        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].file_path, PathBuf::from("/tmp/fragments.graphql"));
        assert_eq!(locations[0].range.end, Position::new(0, 25));
    }

    #[test]
    fn type_condition_resolves_to_the_schema_type() {
        let documents = TextDocumentCache::new();
        let doc = documents.set(
            Path::new("/tmp/fragments.graphql"),
            "fragment B on Foo { bar }",
        );

        let locations = DefinitionResolver::resolve(
            &doc,
            Position::new(0, 15),
            Some(&schema_state()),
            Some(&type_entries()),
            Some(&fragment_entries()),
        );

        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].file_path, PathBuf::from("/tmp/schema.graphql"));
        assert_eq!(locations[0].range.start, Position::new(2, 0));
    }

    #[test]
    fn field_resolves_to_its_owning_type() {
        let documents = TextDocumentCache::new();
        let doc = documents.set(
            Path::new("/tmp/fragments.graphql"),
            "fragment B on Foo { bar }",
        );

        // Cursor on `bar`, owned by Foo.
        let locations = DefinitionResolver::resolve(
            &doc,
            Position::new(0, 21),
            Some(&schema_state()),
            Some(&type_entries()),
            Some(&fragment_entries()),
        );

        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].file_path, PathBuf::from("/tmp/schema.graphql"));
    }

    #[test]
    fn unresolved_references_yield_an_empty_result() {
        let documents = TextDocumentCache::new();
        let doc = documents.set(Path::new("/tmp/query.graphql"), "query { bar ...Nope }");

        let locations = DefinitionResolver::resolve(
            &doc,
            Position::new(0, 16),
            Some(&schema_state()),
            Some(&type_entries()),
            Some(&fragment_entries()),
        );

        assert!(locations.is_empty());
    }

    #[test]
    fn resolution_is_idempotent() {
        let documents = TextDocumentCache::new();
        let doc = documents.set(Path::new("/tmp/query.graphql"), "query { bar ...B }");

        let first = DefinitionResolver::resolve(
            &doc,
            Position::new(0, 16),
            Some(&schema_state()),
            Some(&type_entries()),
            Some(&fragment_entries()),
        );
        let second = DefinitionResolver::resolve(
            &doc,
            Position::new(0, 16),
            Some(&schema_state()),
            Some(&type_entries()),
            Some(&fragment_entries()),
        );

        assert_eq!(first, second);
    }

    #[test]
    fn position_outside_any_unit_is_empty() {
        let documents = TextDocumentCache::new();
        let doc = documents.set(Path::new("/tmp/query.graphql"), "query { bar }");

        let locations = DefinitionResolver::resolve(
            &doc,
            Position::new(5, 0),
            Some(&schema_state()),
            Some(&type_entries()),
            Some(&fragment_entries()),
        );

        assert!(locations.is_empty());
    }
}
