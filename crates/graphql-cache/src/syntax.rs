//! Position-to-node resolution over the apollo-parser CST, with schema-aware
//! parent type tracking for field selections.

use apollo_compiler::ast::OperationType;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::Schema;
use apollo_parser::cst::{self, CstNode};

/// The leaf element found under a cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TargetNode {
    FragmentSpread {
        name: String,
    },
    NamedType {
        name: String,
    },
    Field {
        name: String,
        /// The type the field is selected on, when the schema walk could
        /// determine it.
        parent_type: Option<String>,
    },
}

/// Find the element whose source range contains `offset`.
pub(crate) fn find_node_at_offset(
    doc: &cst::Document,
    offset: usize,
    schema: Option<&Schema>,
) -> Option<TargetNode> {
    for definition in doc.definitions() {
        match definition {
            cst::Definition::OperationDefinition(op) => {
                if let Some(var_defs) = op.variable_definitions() {
                    for var_def in var_defs.variable_definitions() {
                        if let Some(ty) = var_def.ty() {
                            if let Some(target) = type_reference_at(&ty, offset) {
                                return Some(target);
                            }
                        }
                    }
                }

                let parent = operation_root_type(&op, schema);
                if let Some(selection_set) = op.selection_set() {
                    if let Some(target) =
                        selection_set_at(&selection_set, offset, parent.as_deref(), schema)
                    {
                        return Some(target);
                    }
                }
            }
            cst::Definition::FragmentDefinition(frag) => {
                let type_condition = frag
                    .type_condition()
                    .and_then(|tc| tc.named_type())
                    .and_then(|nt| nt.name());

                if let Some(ref name) = type_condition {
                    if token_contains(name.syntax(), offset) {
                        return Some(TargetNode::NamedType {
                            name: name.text().to_string(),
                        });
                    }
                }

                let parent = type_condition.map(|n| n.text().to_string());
                if let Some(selection_set) = frag.selection_set() {
                    if let Some(target) =
                        selection_set_at(&selection_set, offset, parent.as_deref(), schema)
                    {
                        return Some(target);
                    }
                }
            }
            _ => {}
        }
    }

    None
}

fn selection_set_at(
    selection_set: &cst::SelectionSet,
    offset: usize,
    parent_type: Option<&str>,
    schema: Option<&Schema>,
) -> Option<TargetNode> {
    for selection in selection_set.selections() {
        match selection {
            cst::Selection::Field(field) => {
                if let Some(name) = field.name() {
                    if token_contains(name.syntax(), offset) {
                        return Some(TargetNode::Field {
                            name: name.text().to_string(),
                            parent_type: parent_type.map(str::to_string),
                        });
                    }
                }

                if let Some(nested) = field.selection_set() {
                    let field_type = field
                        .name()
                        .and_then(|n| field_type_name(schema, parent_type, &n.text()));
                    if let Some(target) =
                        selection_set_at(&nested, offset, field_type.as_deref(), schema)
                    {
                        return Some(target);
                    }
                }
            }
            cst::Selection::FragmentSpread(spread) => {
                if let Some(name) = spread.fragment_name().and_then(|n| n.name()) {
                    if token_contains(name.syntax(), offset) {
                        return Some(TargetNode::FragmentSpread {
                            name: name.text().to_string(),
                        });
                    }
                }
            }
            cst::Selection::InlineFragment(inline) => {
                let type_condition = inline
                    .type_condition()
                    .and_then(|tc| tc.named_type())
                    .and_then(|nt| nt.name());

                if let Some(ref name) = type_condition {
                    if token_contains(name.syntax(), offset) {
                        return Some(TargetNode::NamedType {
                            name: name.text().to_string(),
                        });
                    }
                }

                if let Some(nested) = inline.selection_set() {
                    let narrowed = type_condition.map(|n| n.text().to_string());
                    let next_parent = narrowed.as_deref().or(parent_type);
                    if let Some(target) = selection_set_at(&nested, offset, next_parent, schema) {
                        return Some(target);
                    }
                }
            }
        }
    }

    None
}

fn type_reference_at(ty: &cst::Type, offset: usize) -> Option<TargetNode> {
    match ty {
        cst::Type::NamedType(named) => {
            let name = named.name()?;
            token_contains(name.syntax(), offset).then(|| TargetNode::NamedType {
                name: name.text().to_string(),
            })
        }
        cst::Type::ListType(list) => type_reference_at(&list.ty()?, offset),
        cst::Type::NonNullType(non_null) => {
            if let Some(named) = non_null.named_type() {
                let name = named.name()?;
                return token_contains(name.syntax(), offset).then(|| TargetNode::NamedType {
                    name: name.text().to_string(),
                });
            }
            type_reference_at(&non_null.list_type()?.ty()?, offset)
        }
    }
}

fn operation_root_type(op: &cst::OperationDefinition, schema: Option<&Schema>) -> Option<String> {
    let schema = schema?;
    let operation_type = match op.operation_type() {
        Some(t) if t.mutation_token().is_some() => OperationType::Mutation,
        Some(t) if t.subscription_token().is_some() => OperationType::Subscription,
        _ => OperationType::Query,
    };
    schema
        .root_operation(operation_type)
        .map(|name| name.as_str().to_string())
}

fn field_type_name(
    schema: Option<&Schema>,
    parent_type: Option<&str>,
    field_name: &str,
) -> Option<String> {
    let fields = match schema?.types.get(parent_type?)? {
        ExtendedType::Object(obj) => &obj.fields,
        ExtendedType::Interface(iface) => &iface.fields,
        _ => return None,
    };
    let field = fields.get(field_name)?;
    Some(field.ty.inner_named_type().as_str().to_string())
}

fn token_contains(syntax: &apollo_parser::SyntaxNode, offset: usize) -> bool {
    let range = syntax.text_range();
    let start: usize = range.start().into();
    let end: usize = range.end().into();
    // End-inclusive: a cursor sitting right after the last character of a
    // name still refers to it.
    offset >= start && offset <= end
}
