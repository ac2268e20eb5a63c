use crate::syntax::{find_node_at_offset, TargetNode};
use crate::{CachedDocument, FragmentDefinitionEntry, HoverInfo, LineIndex, Position, SchemaState};
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::Schema;
use std::collections::HashMap;
use std::fmt::Write;

/// Renders markdown documentation for the element under a cursor.
pub struct HoverProvider;

impl HoverProvider {
    #[must_use]
    pub fn hover(
        document: &CachedDocument,
        position: Position,
        schema: Option<&SchemaState>,
        fragment_definitions: Option<&HashMap<String, FragmentDefinitionEntry>>,
    ) -> Option<HoverInfo> {
        let unit = document.unit_at(position)?;
        if !unit.syntax_errors.is_empty() {
            return None;
        }

        let relative = unit.relative_position(position);
        let line_index = LineIndex::new(&unit.text);
        let offset = line_index.position_to_offset(relative)?;

        let tree = apollo_parser::Parser::new(&unit.text).parse();
        let target = find_node_at_offset(&tree.document(), offset, schema.map(|s| &s.schema))?;

        let contents = match target {
            TargetNode::Field { name, parent_type } => {
                field_contents(&schema?.schema, parent_type.as_deref()?, &name)?
            }
            TargetNode::NamedType { name } => type_contents(&schema?.schema, &name)?,
            TargetNode::FragmentSpread { name } => {
                let entry = fragment_definitions?.get(&name)?;
                format!(
                    "```graphql\nfragment {} on {}\n```",
                    entry.name, entry.type_condition
                )
            }
        };

        Some(HoverInfo {
            contents,
            range: None,
        })
    }
}

fn field_contents(schema: &Schema, parent: &str, name: &str) -> Option<String> {
    let fields = match schema.types.get(parent)? {
        ExtendedType::Object(obj) => &obj.fields,
        ExtendedType::Interface(iface) => &iface.fields,
        _ => return None,
    };
    let field = fields.get(name)?;

    let mut contents = format!("```graphql\n{parent}.{name}: {}\n```", field.ty);
    if let Some(description) = &field.description {
        write!(contents, "\n\n{description}").ok()?;
    }
    if let Some(deprecation) = field
        .directives
        .iter()
        .find(|d| d.name.as_str() == "deprecated")
    {
        let reason = deprecation
            .specified_argument_by_name("reason")
            .and_then(|v| v.as_str());
        match reason {
            Some(reason) => write!(contents, "\n\n*Deprecated: {reason}*").ok()?,
            None => contents.push_str("\n\n*Deprecated*"),
        }
    }
    Some(contents)
}

fn type_contents(schema: &Schema, name: &str) -> Option<String> {
    let ty = schema.types.get(name)?;
    let (keyword, description) = match ty {
        ExtendedType::Scalar(def) => ("scalar", def.description.clone()),
        ExtendedType::Object(def) => ("type", def.description.clone()),
        ExtendedType::Interface(def) => ("interface", def.description.clone()),
        ExtendedType::Union(def) => ("union", def.description.clone()),
        ExtendedType::Enum(def) => ("enum", def.description.clone()),
        ExtendedType::InputObject(def) => ("input", def.description.clone()),
    };

    let mut contents = format!("```graphql\n{keyword} {name}\n```");
    if let Some(description) = description {
        write!(contents, "\n\n{description}").ok()?;
    }
    Some(contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SchemaSourceKind, TextDocumentCache};
    use std::path::Path;
    use std::time::SystemTime;

    fn schema_state() -> SchemaState {
        SchemaState {
            schema: apollo_compiler::Schema::parse(
                r#"
type Query {
  "Get the list of all episodes"
  episodes: [Episode]
}

"One episode of the show"
type Episode {
  name: String
  created: String @deprecated(reason: "use createdAt")
}
"#,
                "schema.graphql",
            )
            .unwrap(),
            files: Vec::new(),
            kind: SchemaSourceKind::Local,
            built_at: SystemTime::now(),
        }
    }

    #[test]
    fn field_hover_includes_signature_and_description() {
        let documents = TextDocumentCache::new();
        let doc = documents.set(Path::new("/tmp/q.graphql"), "query { episodes { name } }");

        let hover = HoverProvider::hover(
            &doc,
            Position::new(0, 10),
            Some(&schema_state()),
            None,
        )
        .unwrap();

        assert!(hover.contents.contains("Query.episodes: [Episode]"));
        assert!(hover.contents.contains("Get the list of all episodes"));
    }

    #[test]
    fn deprecated_field_hover_carries_the_reason() {
        let documents = TextDocumentCache::new();
        let doc = documents.set(
            Path::new("/tmp/q.graphql"),
            "query { episodes { created } }",
        );

        let hover = HoverProvider::hover(
            &doc,
            Position::new(0, 22),
            Some(&schema_state()),
            None,
        )
        .unwrap();

        assert!(hover.contents.contains("use createdAt"));
    }

    #[test]
    fn type_hover_shows_kind_and_description() {
        let documents = TextDocumentCache::new();
        let doc = documents.set(
            Path::new("/tmp/f.graphql"),
            "fragment E on Episode { name }",
        );

        let hover = HoverProvider::hover(
            &doc,
            Position::new(0, 16),
            Some(&schema_state()),
            None,
        )
        .unwrap();

        assert!(hover.contents.contains("type Episode"));
        assert!(hover.contents.contains("One episode of the show"));
    }

    #[test]
    fn hover_on_nothing_is_none() {
        let documents = TextDocumentCache::new();
        let doc = documents.set(Path::new("/tmp/q.graphql"), "query { episodes { name } }");

        assert!(HoverProvider::hover(&doc, Position::new(0, 6), Some(&schema_state()), None)
            .is_none());
    }
}
