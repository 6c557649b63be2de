//! Filepath: src/parsers/typescript.rs
//! TypeScript / TSX adaptor: props come from the declared parameter type.

use std::path::Path;

use tree_sitter::{Language, Node};

use crate::core::error::AdaptorError;
use crate::core::extract::{Adaptor, ReExport};
use crate::core::model::{ComponentDescriptor, FieldDescriptor, Primitive, PropDescriptor, TypeExpr};
use crate::infra::utils::TsNodeUtils;
use crate::parsers::ecma::{self, Component, ModuleScan, ShapeReader, literal};
use crate::parsers::javascript::PropTypesReader;

/// Bound on alias → alias → … chains while resolving types
const MAX_TYPE_DEPTH: usize = 8;

const EXTENSIONS: &[&str] = &["tsx", "ts", "mts", "cts"];

pub struct TypeScriptAdaptor {
    tsx: Language,
    typescript: Language,
}

impl Default for TypeScriptAdaptor {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeScriptAdaptor {
    pub fn new() -> Self {
        Self {
            tsx: tree_sitter_typescript::LANGUAGE_TSX.into(),
            typescript: tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        }
    }

    fn language(&self, path: &Path) -> &Language {
        match path.extension().and_then(|e| e.to_str()) {
            Some("tsx") => &self.tsx,
            _ => &self.typescript,
        }
    }
}

impl Adaptor for TypeScriptAdaptor {
    fn name(&self) -> &'static str {
        "typescript"
    }

    fn handles(&self, path: &Path) -> bool {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        // Declaration files carry no implementations
        if name.ends_with(".d.ts") {
            return false;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| EXTENSIONS.contains(&e))
    }

    fn try_extract(
        &self,
        path: &Path,
        content: &str,
    ) -> Result<Option<ComponentDescriptor>, AdaptorError> {
        ecma::extract_component(self.language(path), path, content, &DeclaredShape)
    }

    fn barrel_targets(
        &self,
        path: &Path,
        content: &str,
    ) -> Result<Option<Vec<ReExport>>, AdaptorError> {
        ecma::barrel_reexports(self.language(path), path, content)
    }
}

/// Props from the parameter annotation or wrapper generics, else propTypes
struct DeclaredShape;

impl ShapeReader for DeclaredShape {
    fn declared<'t>(
        &self,
        scan: &ModuleScan<'t>,
        component: &Component<'t>,
    ) -> Option<Vec<PropDescriptor>> {
        let (_, annotation) = component.func.param_parts();
        let resolver = TypeResolver { scan };

        annotation
            .or(component.func.hint)
            .and_then(|t| resolver.shape(t, 0))
            .map(|fields| {
                fields
                    .into_iter()
                    .map(|f| PropDescriptor {
                        name: f.name,
                        ty: f.ty,
                        required: f.required,
                        default: None,
                    })
                    .collect()
            })
            .or_else(|| PropTypesReader.declared(scan, component))
    }
}

/// Resolves type nodes against the module's own `interface`/`type` declarations
pub struct TypeResolver<'a, 't> {
    pub scan: &'a ModuleScan<'t>,
}

impl<'t> TypeResolver<'_, 't> {
    fn text(&self, node: Node) -> &'t str {
        TsNodeUtils::text(node, self.scan.src)
    }

    /// Fields of an object-like type; None when it cannot be resolved locally
    pub fn shape(&self, node: Node<'t>, depth: usize) -> Option<Vec<FieldDescriptor>> {
        if depth > MAX_TYPE_DEPTH {
            return None;
        }

        match node.kind() {
            "object_type" | "interface_body" => Some(self.members(node, depth)),
            "interface_declaration" => {
                let mut fields = Vec::new();
                // `interface A extends B, C` - base members first
                for clause in TsNodeUtils::named_children(node)
                    .into_iter()
                    .filter(|c| c.kind() == "extends_type_clause")
                {
                    for base in TsNodeUtils::named_children(clause) {
                        if let Some(base_fields) = self.shape(base, depth + 1) {
                            merge_fields(&mut fields, base_fields);
                        }
                    }
                }
                let body = node.child_by_field_name("body")?;
                merge_fields(&mut fields, self.members(body, depth));
                Some(fields)
            }
            "type_alias_declaration" => self.shape(node.child_by_field_name("value")?, depth + 1),
            "type_identifier" => {
                let decl = self.scan.types.get(self.text(node))?;
                self.shape(*decl, depth + 1)
            }
            "parenthesized_type" | "type_annotation" => {
                let inner = TsNodeUtils::named_children(node).into_iter().next()?;
                self.shape(inner, depth + 1)
            }
            "intersection_type" => {
                let mut fields = Vec::new();
                let mut resolved = false;
                for part in TsNodeUtils::named_children(node) {
                    if let Some(part_fields) = self.shape(part, depth + 1) {
                        merge_fields(&mut fields, part_fields);
                        resolved = true;
                    }
                }
                resolved.then_some(fields)
            }
            "generic_type" => self.generic_shape(node, depth),
            _ => None,
        }
    }

    fn generic_shape(&self, node: Node<'t>, depth: usize) -> Option<Vec<FieldDescriptor>> {
        let name = node.child_by_field_name("name")?;
        let name = self.text(name);
        let last = name.rsplit('.').next().unwrap_or(name);

        let first_arg = || {
            node.child_by_field_name("type_arguments")
                .or_else(|| {
                    TsNodeUtils::named_children(node)
                        .into_iter()
                        .find(|c| c.kind() == "type_arguments")
                })
                .and_then(|args| TsNodeUtils::named_children(args).into_iter().next())
        };

        match last {
            "Readonly" | "PropsWithChildren" | "PropsWithoutRef" => self.shape(first_arg()?, depth + 1),
            "Partial" => self.shape(first_arg()?, depth + 1).map(|fields| {
                fields
                    .into_iter()
                    .map(|f| FieldDescriptor { required: false, ..f })
                    .collect()
            }),
            "Required" => self.shape(first_arg()?, depth + 1).map(|fields| {
                fields
                    .into_iter()
                    .map(|f| FieldDescriptor { required: true, ..f })
                    .collect()
            }),
            // Generic local interface; type parameters are not substituted
            _ => {
                let decl = self.scan.types.get(name)?;
                self.shape(*decl, depth + 1)
            }
        }
    }

    fn members(&self, body: Node<'t>, depth: usize) -> Vec<FieldDescriptor> {
        TsNodeUtils::named_children(body)
            .into_iter()
            .filter_map(|member| match member.kind() {
                "property_signature" => {
                    let name = ecma::unquote(TsNodeUtils::field_text(member, "name", self.scan.src)?);
                    let optional = TsNodeUtils::has_child_kind(member, "?");
                    let ty = member
                        .child_by_field_name("type")
                        .and_then(|a| TsNodeUtils::named_children(a).into_iter().next())
                        .map(|t| self.expr(t, depth + 1))
                        .unwrap_or_else(TypeExpr::unknown);
                    Some(FieldDescriptor { name, ty, required: !optional })
                }
                "method_signature" => {
                    let name = ecma::unquote(TsNodeUtils::field_text(member, "name", self.scan.src)?);
                    let optional = TsNodeUtils::has_child_kind(member, "?");
                    Some(FieldDescriptor {
                        name,
                        ty: TypeExpr::raw(self.text(member)),
                        required: !optional,
                    })
                }
                _ => None,
            })
            .collect()
    }

    /// Type expression of a single type node
    pub fn expr(&self, node: Node<'t>, depth: usize) -> TypeExpr {
        if depth > MAX_TYPE_DEPTH {
            return TypeExpr::raw(self.text(node));
        }

        match node.kind() {
            "predefined_type" => match Primitive::parse(self.text(node)) {
                Some(name) => TypeExpr::Primitive { name },
                None => TypeExpr::raw(self.text(node)),
            },
            "literal_type" => match literal(node, self.scan.src) {
                Some(v) => TypeExpr::Union { values: vec![v] },
                None => TypeExpr::raw(self.text(node)),
            },
            "union_type" => self.union(node, depth),
            "object_type" => TypeExpr::Object {
                fields: self.members(node, depth),
            },
            "parenthesized_type" => match TsNodeUtils::named_children(node).into_iter().next() {
                Some(inner) => self.expr(inner, depth + 1),
                None => TypeExpr::raw(self.text(node)),
            },
            "type_identifier" => match self.scan.types.get(self.text(node)) {
                Some(decl) if decl.kind() == "type_alias_declaration" => decl
                    .child_by_field_name("value")
                    .map(|v| self.expr(v, depth + 1))
                    .unwrap_or_else(|| TypeExpr::raw(self.text(node))),
                Some(decl) => match self.shape(*decl, depth + 1) {
                    Some(fields) => TypeExpr::Object { fields },
                    None => TypeExpr::raw(self.text(node)),
                },
                None => TypeExpr::raw(self.text(node)),
            },
            "intersection_type" | "generic_type" => match self.shape(node, depth + 1) {
                Some(fields) => TypeExpr::Object { fields },
                None => TypeExpr::raw(self.text(node)),
            },
            _ => TypeExpr::raw(self.text(node)),
        }
    }

    /// Literal-only unions stay closed; `T | undefined` collapses to `T`
    fn union(&self, node: Node<'t>, depth: usize) -> TypeExpr {
        let mut members = Vec::new();
        flatten_union(node, &mut members);
        members.retain(|m| self.text(*m).trim() != "undefined");

        if let [single] = members.as_slice() {
            return self.expr(*single, depth + 1);
        }

        let mut values = Vec::new();
        for member in &members {
            match self.expr(*member, depth + 1) {
                TypeExpr::Union { values: vs } => {
                    for v in vs {
                        if !values.contains(&v) {
                            values.push(v);
                        }
                    }
                }
                _ => return TypeExpr::raw(self.text(node)),
            }
        }

        if values.is_empty() {
            return TypeExpr::raw(self.text(node));
        }

        TypeExpr::Union { values }
    }
}

fn flatten_union<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
    if node.kind() != "union_type" {
        out.push(node);
        return;
    }
    for child in TsNodeUtils::named_children(node) {
        flatten_union(child, out);
    }
}

/// Later fields replace earlier ones with the same name, in place
fn merge_fields(into: &mut Vec<FieldDescriptor>, from: Vec<FieldDescriptor>) {
    for field in from {
        match into.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => into.push(field),
        }
    }
}
