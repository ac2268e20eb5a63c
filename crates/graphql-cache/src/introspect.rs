//! Introspection fetch and SDL rendering for remote schemas.

use crate::{CacheError, Result};
use serde::Deserialize;
use std::fmt::Write;

/// Standard introspection query, nested deep enough to unwrap type modifiers
/// like `[[String!]!]`.
pub const INTROSPECTION_QUERY: &str = r"
query IntrospectionQuery {
  __schema {
    queryType { name }
    mutationType { name }
    subscriptionType { name }
    types {
      kind
      name
      description
      fields(includeDeprecated: true) {
        name
        description
        args { ...InputValue }
        type { ...TypeRef }
        isDeprecated
        deprecationReason
      }
      inputFields { ...InputValue }
      interfaces { name }
      enumValues(includeDeprecated: true) {
        name
        description
        isDeprecated
        deprecationReason
      }
      possibleTypes { name }
    }
  }
}

fragment InputValue on __InputValue {
  name
  description
  type { ...TypeRef }
  defaultValue
}

fragment TypeRef on __Type {
  kind
  name
  ofType {
    kind
    name
    ofType {
      kind
      name
      ofType {
        kind
        name
        ofType {
          kind
          name
          ofType {
            kind
            name
            ofType {
              kind
              name
              ofType { kind name }
            }
          }
        }
      }
    }
  }
}
";

#[derive(Debug, Clone, Deserialize)]
pub struct IntrospectionResult {
    pub data: IntrospectionData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntrospectionData {
    #[serde(rename = "__schema")]
    pub schema: RemoteSchema,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSchema {
    pub query_type: Option<NamedTypeRef>,
    pub mutation_type: Option<NamedTypeRef>,
    pub subscription_type: Option<NamedTypeRef>,
    pub types: Vec<RemoteType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedTypeRef {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteType {
    pub kind: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Option<Vec<RemoteField>>,
    #[serde(default)]
    pub input_fields: Option<Vec<RemoteInputValue>>,
    #[serde(default)]
    pub interfaces: Option<Vec<NamedTypeRef>>,
    #[serde(default)]
    pub enum_values: Option<Vec<RemoteEnumValue>>,
    #[serde(default)]
    pub possible_types: Option<Vec<NamedTypeRef>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteField {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub args: Vec<RemoteInputValue>,
    #[serde(rename = "type")]
    pub ty: RemoteTypeRef,
    #[serde(default)]
    pub is_deprecated: bool,
    pub deprecation_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteInputValue {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub ty: RemoteTypeRef,
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEnumValue {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_deprecated: bool,
    pub deprecation_reason: Option<String>,
}

/// Possibly-wrapped type reference: NON_NULL and LIST nest via `of_type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTypeRef {
    pub kind: String,
    pub name: Option<String>,
    pub of_type: Option<Box<RemoteTypeRef>>,
}

impl RemoteTypeRef {
    fn render(&self) -> String {
        match (self.kind.as_str(), &self.of_type) {
            ("NON_NULL", Some(inner)) => format!("{}!", inner.render()),
            ("LIST", Some(inner)) => format!("[{}]", inner.render()),
            _ => self.name.clone().unwrap_or_default(),
        }
    }
}

/// POST the introspection query to `url` and deserialize the response.
pub async fn fetch_introspection(url: &str) -> Result<IntrospectionResult> {
    let client = reqwest::Client::new();
    let body = serde_json::json!({ "query": INTROSPECTION_QUERY });

    let response = client
        .post(url)
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| CacheError::SchemaFetch {
            url: url.to_string(),
            message: e.to_string(),
        })?;

    if !response.status().is_success() {
        return Err(CacheError::SchemaFetch {
            url: url.to_string(),
            message: format!("HTTP status {}", response.status()),
        });
    }

    response.json().await.map_err(|e| CacheError::SchemaFetch {
        url: url.to_string(),
        message: format!("invalid introspection response: {e}"),
    })
}

const BUILTIN_SCALARS: &[&str] = &["Int", "Float", "String", "Boolean", "ID"];

/// Render an introspection result as SDL, suitable for the generated schema
/// artifact. Introspection meta types and built-in scalars are omitted;
/// descriptions and deprecations are preserved so downstream hover content
/// keeps its documentation.
#[must_use]
pub fn introspection_to_sdl(result: &IntrospectionResult) -> String {
    let schema = &result.data.schema;
    let mut sdl = String::new();

    let query_name = schema.query_type.as_ref().map(|t| t.name.as_str());
    let mutation_name = schema.mutation_type.as_ref().map(|t| t.name.as_str());
    let subscription_name = schema.subscription_type.as_ref().map(|t| t.name.as_str());

    let default_roots = query_name.is_none_or(|n| n == "Query")
        && mutation_name.is_none_or(|n| n == "Mutation")
        && subscription_name.is_none_or(|n| n == "Subscription");

    if !default_roots {
        sdl.push_str("schema {\n");
        if let Some(name) = query_name {
            writeln!(sdl, "  query: {name}").unwrap();
        }
        if let Some(name) = mutation_name {
            writeln!(sdl, "  mutation: {name}").unwrap();
        }
        if let Some(name) = subscription_name {
            writeln!(sdl, "  subscription: {name}").unwrap();
        }
        sdl.push_str("}\n\n");
    }

    for ty in &schema.types {
        if ty.name.starts_with("__") || BUILTIN_SCALARS.contains(&ty.name.as_str()) {
            continue;
        }
        write_type(&mut sdl, ty);
        sdl.push_str("\n\n");
    }

    let mut sdl = sdl.trim_end().to_string();
    sdl.push('\n');
    sdl
}

fn write_type(sdl: &mut String, ty: &RemoteType) {
    write_description(sdl, ty.description.as_deref(), 0);
    match ty.kind.as_str() {
        "SCALAR" => {
            write!(sdl, "scalar {}", ty.name).unwrap();
        }
        "OBJECT" | "INTERFACE" => {
            let keyword = if ty.kind == "OBJECT" { "type" } else { "interface" };
            write!(sdl, "{keyword} {}", ty.name).unwrap();
            if let Some(interfaces) = &ty.interfaces {
                if !interfaces.is_empty() {
                    let names: Vec<_> = interfaces.iter().map(|i| i.name.as_str()).collect();
                    write!(sdl, " implements {}", names.join(" & ")).unwrap();
                }
            }
            sdl.push_str(" {\n");
            for field in ty.fields.as_deref().unwrap_or_default() {
                write_field(sdl, field);
            }
            sdl.push('}');
        }
        "UNION" => {
            let members: Vec<_> = ty
                .possible_types
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(|t| t.name.as_str())
                .collect();
            write!(sdl, "union {} = {}", ty.name, members.join(" | ")).unwrap();
        }
        "ENUM" => {
            writeln!(sdl, "enum {} {{", ty.name).unwrap();
            for value in ty.enum_values.as_deref().unwrap_or_default() {
                write_description(sdl, value.description.as_deref(), 1);
                write!(sdl, "  {}", value.name).unwrap();
                write_deprecated(sdl, value.is_deprecated, value.deprecation_reason.as_deref());
                sdl.push('\n');
            }
            sdl.push('}');
        }
        "INPUT_OBJECT" => {
            writeln!(sdl, "input {} {{", ty.name).unwrap();
            for field in ty.input_fields.as_deref().unwrap_or_default() {
                write_description(sdl, field.description.as_deref(), 1);
                write!(sdl, "  {}: {}", field.name, field.ty.render()).unwrap();
                if let Some(default) = &field.default_value {
                    write!(sdl, " = {default}").unwrap();
                }
                sdl.push('\n');
            }
            sdl.push('}');
        }
        _ => {}
    }
}

fn write_field(sdl: &mut String, field: &RemoteField) {
    write_description(sdl, field.description.as_deref(), 1);
    write!(sdl, "  {}", field.name).unwrap();
    if !field.args.is_empty() {
        sdl.push('(');
        for (i, arg) in field.args.iter().enumerate() {
            if i > 0 {
                sdl.push_str(", ");
            }
            write!(sdl, "{}: {}", arg.name, arg.ty.render()).unwrap();
            if let Some(default) = &arg.default_value {
                write!(sdl, " = {default}").unwrap();
            }
        }
        sdl.push(')');
    }
    write!(sdl, ": {}", field.ty.render()).unwrap();
    write_deprecated(sdl, field.is_deprecated, field.deprecation_reason.as_deref());
    sdl.push('\n');
}

fn write_deprecated(sdl: &mut String, is_deprecated: bool, reason: Option<&str>) {
    if !is_deprecated {
        return;
    }
    match reason {
        Some(reason) => {
            write!(sdl, " @deprecated(reason: \"{}\")", escape(reason)).unwrap();
        }
        None => sdl.push_str(" @deprecated"),
    }
}

fn write_description(sdl: &mut String, description: Option<&str>, indent: usize) {
    if let Some(desc) = description {
        let pad = "  ".repeat(indent);
        writeln!(sdl, "{pad}\"\"\"\n{pad}{}\n{pad}\"\"\"", desc.trim()).unwrap();
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> IntrospectionResult {
        let json = serde_json::json!({
            "data": {
                "__schema": {
                    "queryType": { "name": "Query" },
                    "mutationType": null,
                    "subscriptionType": null,
                    "types": [
                        {
                            "kind": "OBJECT",
                            "name": "Query",
                            "description": null,
                            "fields": [
                                {
                                    "name": "episodes",
                                    "description": "Get the list of all episodes",
                                    "args": [],
                                    "type": { "kind": "LIST", "name": null, "ofType": { "kind": "OBJECT", "name": "Episode", "ofType": null } },
                                    "isDeprecated": false,
                                    "deprecationReason": null
                                }
                            ],
                            "interfaces": []
                        },
                        {
                            "kind": "OBJECT",
                            "name": "Episode",
                            "description": null,
                            "fields": [
                                {
                                    "name": "name",
                                    "description": "The name of the episode.",
                                    "args": [],
                                    "type": { "kind": "SCALAR", "name": "String", "ofType": null },
                                    "isDeprecated": false,
                                    "deprecationReason": null
                                },
                                {
                                    "name": "created",
                                    "description": null,
                                    "args": [],
                                    "type": { "kind": "SCALAR", "name": "String", "ofType": null },
                                    "isDeprecated": true,
                                    "deprecationReason": "use createdAt"
                                }
                            ],
                            "interfaces": []
                        },
                        {
                            "kind": "SCALAR",
                            "name": "String",
                            "description": "Built in"
                        }
                    ]
                }
            }
        });
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn renders_object_types_with_descriptions() {
        let sdl = introspection_to_sdl(&fixture());

        assert!(sdl.contains("type Query {"));
        assert!(sdl.contains("Get the list of all episodes"));
        assert!(sdl.contains("episodes: [Episode]"));
        assert!(sdl.contains("@deprecated(reason: \"use createdAt\")"));
        // Built-in scalars are not repeated in generated SDL.
        assert!(!sdl.contains("scalar String"));
    }

    #[test]
    fn generated_sdl_parses_as_a_schema() {
        let sdl = introspection_to_sdl(&fixture());
        let schema = apollo_compiler::Schema::parse(&sdl, "generated-schema.graphql").unwrap();
        assert!(schema.types.contains_key("Episode"));
    }

    #[test]
    fn type_ref_rendering_unwraps_modifiers() {
        let ty: RemoteTypeRef = serde_json::from_value(serde_json::json!({
            "kind": "NON_NULL",
            "name": null,
            "ofType": { "kind": "LIST", "name": null, "ofType": { "kind": "SCALAR", "name": "ID", "ofType": null } }
        }))
        .unwrap();
        assert_eq!(ty.render(), "[ID]!");
    }
}
