//! Filepath: src/parsers/javascript.rs
//! JavaScript / JSX adaptor: props come from `propTypes`, assigned or static.

use std::path::Path;

use tree_sitter::{Language, Node};

use crate::core::error::AdaptorError;
use crate::core::extract::{Adaptor, ReExport};
use crate::core::model::{ComponentDescriptor, FieldDescriptor, Primitive, PropDescriptor, TypeExpr};
use crate::infra::utils::TsNodeUtils;
use crate::parsers::ecma::{self, Component, ModuleScan, ShapeReader, literal, object_pairs};

const EXTENSIONS: &[&str] = &["jsx", "js", "mjs", "cjs"];

pub struct JavaScriptAdaptor {
    language: Language,
}

impl Default for JavaScriptAdaptor {
    fn default() -> Self {
        Self::new()
    }
}

impl JavaScriptAdaptor {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_javascript::LANGUAGE.into(),
        }
    }
}

impl Adaptor for JavaScriptAdaptor {
    fn name(&self) -> &'static str {
        "javascript"
    }

    fn handles(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| EXTENSIONS.contains(&e))
    }

    fn try_extract(
        &self,
        path: &Path,
        content: &str,
    ) -> Result<Option<ComponentDescriptor>, AdaptorError> {
        ecma::extract_component(&self.language, path, content, &PropTypesReader)
    }

    fn barrel_targets(
        &self,
        path: &Path,
        content: &str,
    ) -> Result<Option<Vec<ReExport>>, AdaptorError> {
        ecma::barrel_reexports(&self.language, path, content)
    }
}

/// Reads `Name.propTypes = { … }` or a `static propTypes` class field
pub struct PropTypesReader;

impl ShapeReader for PropTypesReader {
    fn declared<'t>(
        &self,
        scan: &ModuleScan<'t>,
        component: &Component<'t>,
    ) -> Option<Vec<PropDescriptor>> {
        let object = scan.static_of(component, "propTypes")?;

        if object.kind() != "object" {
            return None;
        }

        Some(
            object_pairs(object, scan.src)
                .into_iter()
                .map(|(name, value)| {
                    let (ty, required) = prop_type(value, scan.src);
                    PropDescriptor {
                        name,
                        ty,
                        required,
                        default: None,
                    }
                })
                .collect(),
        )
    }
}

/// Last segment of a member chain (`PropTypes.string` → `string`)
fn member_tail<'a>(node: Node, src: &'a str) -> &'a str {
    match node.kind() {
        "member_expression" => TsNodeUtils::field_text(node, "property", src).unwrap_or(""),
        _ => TsNodeUtils::text(node, src),
    }
}

/// Validator expression → (type, required)
pub fn prop_type(node: Node, src: &str) -> (TypeExpr, bool) {
    // PropTypes.x.isRequired
    if node.kind() == "member_expression"
        && TsNodeUtils::field_text(node, "property", src) == Some("isRequired")
        && let Some(inner) = node.child_by_field_name("object")
    {
        return (prop_type(inner, src).0, true);
    }

    let ty = match node.kind() {
        "member_expression" | "identifier" => match Primitive::parse(member_tail(node, src)) {
            Some(name) => TypeExpr::Primitive { name },
            None => TypeExpr::raw(TsNodeUtils::text(node, src)),
        },
        "call_expression" => call_type(node, src),
        _ => TypeExpr::raw(TsNodeUtils::text(node, src)),
    };

    (ty, false)
}

fn call_type(call: Node, src: &str) -> TypeExpr {
    let raw = || TypeExpr::raw(TsNodeUtils::text(call, src));

    let Some(callee) = call.child_by_field_name("function") else {
        return raw();
    };
    let Some(arg) = call
        .child_by_field_name("arguments")
        .and_then(|args| TsNodeUtils::named_children(args).into_iter().next())
    else {
        return raw();
    };

    match member_tail(callee, src) {
        "oneOf" if arg.kind() == "array" => {
            let values: Option<Vec<_>> = TsNodeUtils::named_children(arg)
                .into_iter()
                .map(|v| literal(v, src))
                .collect();
            match values {
                Some(values) if !values.is_empty() => TypeExpr::Union { values },
                _ => raw(),
            }
        }
        "shape" | "exact" if arg.kind() == "object" => TypeExpr::Object {
            fields: object_pairs(arg, src)
                .into_iter()
                .map(|(name, value)| {
                    let (ty, required) = prop_type(value, src);
                    FieldDescriptor { name, ty, required }
                })
                .collect(),
        },
        _ => raw(),
    }
}
