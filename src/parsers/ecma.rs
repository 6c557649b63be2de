//! Filepath: src/parsers/ecma.rs
//! Module scanning shared by the TypeScript and JavaScript adaptors.
//!
//! One pass over the top-level statements records imports, local bindings
//! (functions, variables and classes), exports, re-exports, `X.prop = …`
//! assignments, and type declarations.
//! Component selection and prop merging run on top of that scan; the
//! dialect-specific part (where the declared prop shape comes from) is
//! plugged in through [`ShapeReader`].

use std::collections::HashMap;
use std::path::Path;

use serde_json::{Number, Value};
use tree_sitter::{Language, Node, Parser, Tree};

use crate::core::error::AdaptorError;
use crate::core::extract::ReExport;
use crate::core::model::{ComponentDescriptor, ExportKind, PropDescriptor, Resolution, TypeExpr};
use crate::core::tokens;
use crate::infra::utils::{CaseUtils, JsDoc, JsDocUtils, TsNodeUtils};

/// Call wrappers that still yield a component
const WRAPPERS: &[&str] = &["memo", "forwardRef", "observer"];

/// Base classes of class components, matched on the last path segment
const COMPONENT_BASES: &[&str] = &["Component", "PureComponent"];

/// Bound on identifier → wrapper → identifier chains
const MAX_ALIAS_DEPTH: usize = 4;

/// Parse `content` and reject trees with syntax errors.
pub fn parse(
    language: &Language,
    path: &Path,
    content: &str,
) -> Result<Tree, AdaptorError>
{
    let mut parser = Parser::new();
    parser
        .set_language(language)
        .map_err(|e| unparseable(path, format!("grammar: {e}")))?;

    let tree = parser
        .parse(content, None)
        .ok_or_else(|| unparseable(path, "parser returned no tree"))?;

    if let Some(row) = TsNodeUtils::first_error_row(tree.root_node())
    {
        return Err(unparseable(path, format!("syntax error near line {row}")));
    }

    Ok(tree)
}

pub fn unparseable(
    path: &Path,
    reason: impl Into<String>,
) -> AdaptorError
{
    AdaptorError::Unparseable { path: path.display().to_string(), reason: reason.into() }
}

/// Component name for anonymous default exports (`index` → parent directory)
pub fn stem_name(path: &Path) -> String
{
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();

    let base = if stem == "index"
    {
        path.parent()
            .and_then(|p| p.file_name())
            .map(|s| {
                s.to_string_lossy()
                    .into_owned()
            })
            .unwrap_or_else(|| stem.into_owned())
    }
    else
    {
        stem.into_owned()
    };

    CaseUtils::pascal(&base)
}

/// String literal body (quotes removed, common escapes decoded)
pub fn unquote(text: &str) -> String
{
    let t = text.trim();
    if t.len() >= 2 && t.starts_with('"') && t.ends_with('"')
    {
        return serde_json::from_str::<String>(t).unwrap_or_else(|_| t[1..t.len() - 1].to_string());
    }
    if t.len() >= 2 && t.starts_with('\'') && t.ends_with('\'')
    {
        return t[1..t.len() - 1]
            .replace("\\'", "'")
            .replace("\\\\", "\\");
    }
    t.to_string()
}

fn number(text: &str) -> Option<Value>
{
    let t: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .collect();

    if let Ok(i) = t.parse::<i64>()
    {
        return Some(Value::Number(i.into()));
    }

    t.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

/// JSON value of a literal node (string, number, boolean, null), else None
pub fn literal(
    node: Node,
    src: &str,
) -> Option<Value>
{
    let text = TsNodeUtils::text(node, src);
    match node.kind()
    {
        "string" => Some(Value::String(unquote(text))),
        "number" => number(text),
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        "null" => Some(Value::Null),
        "unary_expression" if text.trim_start().starts_with('-') => number(text),
        // TS wraps literal types one level deep
        "literal_type" => TsNodeUtils::named_children(node)
            .first()
            .and_then(|inner| literal(*inner, src)),
        _ => None,
    }
}

/// Default value as JSON: literals decode, other expressions keep their source text
pub fn default_value(
    node: Node,
    src: &str,
) -> Value
{
    literal(node, src).unwrap_or_else(|| {
        Value::String(
            TsNodeUtils::text(node, src)
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" "),
        )
    })
}

/// `{ key: value }` pairs of an object literal, in source order
pub fn object_pairs<'t>(
    object: Node<'t>,
    src: &str,
) -> Vec<(String, Node<'t>)>
{
    if object.kind() != "object"
    {
        return Vec::new();
    }

    TsNodeUtils::named_children(object)
        .into_iter()
        .filter(|c| c.kind() == "pair")
        .filter_map(|pair| {
            let key = pair.child_by_field_name("key")?;
            let value = pair.child_by_field_name("value")?;
            Some((unquote(TsNodeUtils::text(key, src)), value))
        })
        .collect()
}

/// A top-level binding that may hold a component
#[derive(Clone, Copy)]
pub struct Definition<'t>
{
    /// `function_declaration`, `variable_declarator` or `class_declaration`
    pub node: Node<'t>,

    /// Top-level statement holding it (doc comments attach here)
    pub statement: Node<'t>,
}

/// `export` of a local binding or of an inline expression
pub struct ExportEntry<'t>
{
    pub exported: String,
    pub local: Option<String>,
    pub value: Option<Node<'t>>,
    pub statement: Node<'t>,
}

/// Entry signature of a component function
#[derive(Clone, Copy)]
pub struct ComponentFn<'t>
{
    /// First parameter node as written
    pub param: Option<Node<'t>>,

    /// Props type from wrapper generics, a `React.FC<P>` annotation or the
    /// `Component<P>` base of a class
    pub hint: Option<Node<'t>>,

    /// Body of a class component, where `static` fields live
    pub class_body: Option<Node<'t>>,
}

impl<'t> ComponentFn<'t>
{
    /// (binding pattern, type annotation) of the first parameter
    pub fn param_parts(&self) -> (Option<Node<'t>>, Option<Node<'t>>)
    {
        let Some(param) = self.param
        else
        {
            return (None, None);
        };

        let (mut pattern, annotation) = match param.kind()
        {
            "required_parameter" | "optional_parameter" =>
            {
                let annotation = param
                    .child_by_field_name("type")
                    .and_then(|t| {
                        TsNodeUtils::named_children(t)
                            .into_iter()
                            .next()
                    });
                (param.child_by_field_name("pattern"), annotation)
            }
            _ => (Some(param), None),
        };

        // `({ a } = {})`
        if let Some(p) = pattern
            && p.kind() == "assignment_pattern"
        {
            pattern = p.child_by_field_name("left");
        }

        (pattern, annotation)
    }
}

/// The component a module exports
pub struct Component<'t>
{
    pub name: String,
    pub export: ExportKind,
    pub func: ComponentFn<'t>,

    /// Local binding, for `Name.propTypes` style lookups
    pub binding: Option<String>,

    /// Statements whose leading comment may document the component
    pub anchors: Vec<Node<'t>>,
}

/// Everything the adaptors need from one module
pub struct ModuleScan<'t>
{
    pub src: &'t str,
    pub defs: HashMap<String, Definition<'t>>,

    /// local name → (module specifier, imported name)
    pub imports: HashMap<String, (String, String)>,
    pub exports: Vec<ExportEntry<'t>>,
    pub reexports: Vec<ReExport>,

    /// (object, property) → assigned value, e.g. (`Button`, `propTypes`)
    pub statics: HashMap<(String, String), Node<'t>>,

    /// `interface` and `type` declarations by name
    pub types: HashMap<String, Node<'t>>,

    /// Saw a statement that is not an import, comment, or re-export
    other_statements: bool,
}

impl<'t> ModuleScan<'t>
{
    pub fn scan(
        root: Node<'t>,
        src: &'t str,
    ) -> Self
    {
        let mut scan = ModuleScan {
            src,
            defs: HashMap::new(),
            imports: HashMap::new(),
            exports: Vec::new(),
            reexports: Vec::new(),
            statics: HashMap::new(),
            types: HashMap::new(),
            other_statements: false,
        };

        for stmt in TsNodeUtils::named_children(root)
        {
            match stmt.kind()
            {
                "comment" | "empty_statement" | "hash_bang_line" =>
                {}
                "import_statement" => scan.record_import(stmt),
                "export_statement" => scan.record_export(stmt),
                "expression_statement" =>
                {
                    scan.record_static(stmt);
                    scan.other_statements = true;
                }
                _ =>
                {
                    scan.record_declaration(stmt, stmt);
                    scan.other_statements = true;
                }
            }
        }

        scan
    }

    fn text(
        &self,
        node: Node,
    ) -> &'t str
    {
        TsNodeUtils::text(node, self.src)
    }

    /// Only imports, comments and re-exports, with at least one re-export
    pub fn is_barrel(&self) -> bool
    {
        !self
            .reexports
            .is_empty()
            && !self.other_statements
    }

    fn record_import(
        &mut self,
        stmt: Node<'t>,
    )
    {
        let src = self.src;
        let Some(source) = stmt.child_by_field_name("source")
        else
        {
            return;
        };
        let source = unquote(TsNodeUtils::text(source, src));

        let Some(clause) = TsNodeUtils::named_children(stmt)
            .into_iter()
            .find(|c| c.kind() == "import_clause")
        else
        {
            return;
        };

        for part in TsNodeUtils::named_children(clause)
        {
            match part.kind()
            {
                "identifier" =>
                {
                    self.imports
                        .insert(TsNodeUtils::text(part, src).to_string(), (source.clone(), "default".into()));
                }
                "namespace_import" =>
                {
                    if let Some(id) = TsNodeUtils::named_children(part)
                        .into_iter()
                        .find(|c| c.kind() == "identifier")
                    {
                        self.imports
                            .insert(TsNodeUtils::text(id, src).to_string(), (source.clone(), "*".into()));
                    }
                }
                "named_imports" =>
                {
                    for spec in TsNodeUtils::named_children(part)
                    {
                        if spec.kind() != "import_specifier"
                        {
                            continue;
                        }
                        let Some(name) = TsNodeUtils::field_text(spec, "name", src)
                        else
                        {
                            continue;
                        };
                        let local = TsNodeUtils::field_text(spec, "alias", src).unwrap_or(name);
                        self.imports
                            .insert(local.to_string(), (source.clone(), name.to_string()));
                    }
                }
                _ =>
                {}
            }
        }
    }

    /// (local, exported) names of an `export { … }` clause
    fn clause_names(
        &self,
        clause: Node,
    ) -> Vec<(String, String)>
    {
        TsNodeUtils::named_children(clause)
            .into_iter()
            .filter(|s| s.kind() == "export_specifier")
            .filter_map(|s| {
                let name = unquote(TsNodeUtils::field_text(s, "name", self.src)?);
                let alias = TsNodeUtils::field_text(s, "alias", self.src)
                    .map(unquote)
                    .unwrap_or_else(|| name.clone());
                Some((name, alias))
            })
            .collect()
    }

    fn record_export(
        &mut self,
        stmt: Node<'t>,
    )
    {
        let src = self.src;
        let clause = TsNodeUtils::named_children(stmt)
            .into_iter()
            .find(|c| c.kind() == "export_clause");

        // export … from '…'
        if let Some(source) = stmt.child_by_field_name("source")
        {
            let names = match clause
            {
                Some(c) => self
                    .clause_names(c)
                    .into_iter()
                    .map(|(_, exported)| exported)
                    .collect(),
                None => Vec::new(),
            };
            self.reexports
                .push(ReExport { specifier: unquote(TsNodeUtils::text(source, src)), names });
            return;
        }

        if let Some(decl) = stmt.child_by_field_name("declaration")
        {
            let is_default = TsNodeUtils::has_child_kind(stmt, "default");
            let names = self.record_declaration(decl, stmt);
            for name in names
            {
                let exported = if is_default { "default".to_string() } else { name.clone() };
                self.exports
                    .push(ExportEntry { exported, local: Some(name), value: None, statement: stmt });
            }
            if !matches!(decl.kind(), "interface_declaration" | "type_alias_declaration")
            {
                self.other_statements = true;
            }
            return;
        }

        if let Some(value) = stmt.child_by_field_name("value")
        {
            if value.kind() == "identifier"
            {
                self.export_binding(TsNodeUtils::text(value, src).to_string(), "default".into(), stmt);
            }
            else
            {
                self.exports.push(ExportEntry {
                    exported: "default".into(),
                    local: None,
                    value: Some(value),
                    statement: stmt,
                });
                self.other_statements = true;
            }
            return;
        }

        if let Some(clause) = clause
        {
            for (local, exported) in self.clause_names(clause)
            {
                self.export_binding(local, exported, stmt);
            }
        }
    }

    /// Export a bare binding; imported bindings become re-exports
    fn export_binding(
        &mut self,
        local: String,
        exported: String,
        stmt: Node<'t>,
    )
    {
        if let Some((source, _)) = self
            .imports
            .get(&local)
        {
            let source = source.clone();
            match self
                .reexports
                .iter_mut()
                .find(|r| r.specifier == source)
            {
                Some(r) => r
                    .names
                    .push(exported),
                None => self
                    .reexports
                    .push(ReExport { specifier: source, names: vec![exported] }),
            }
            return;
        }

        self.exports
            .push(ExportEntry { exported, local: Some(local), value: None, statement: stmt });
        self.other_statements = true;
    }

    /// Record bindings and types a declaration introduces; returns value binding names
    fn record_declaration(
        &mut self,
        decl: Node<'t>,
        statement: Node<'t>,
    ) -> Vec<String>
    {
        let src = self.src;
        match decl.kind()
        {
            "function_declaration" | "generator_function_declaration" =>
            {
                let Some(name) = TsNodeUtils::field_text(decl, "name", src)
                else
                {
                    return Vec::new();
                };
                self.defs
                    .insert(name.to_string(), Definition { node: decl, statement });
                vec![name.to_string()]
            }
            "lexical_declaration" | "variable_declaration" => TsNodeUtils::named_children(decl)
                .into_iter()
                .filter(|d| d.kind() == "variable_declarator")
                .filter_map(|d| {
                    let name = d.child_by_field_name("name")?;
                    // Destructuring declarations bind nothing we can export as a component
                    if name.kind() != "identifier"
                    {
                        return None;
                    }
                    let name = TsNodeUtils::text(name, src).to_string();
                    self.defs
                        .insert(name.clone(), Definition { node: d, statement });
                    Some(name)
                })
                .collect(),
            "interface_declaration" | "type_alias_declaration" =>
            {
                if let Some(name) = TsNodeUtils::field_text(decl, "name", src)
                {
                    self.types
                        .insert(name.to_string(), decl);
                }
                Vec::new()
            }
            "class_declaration" =>
            {
                let Some(name) = TsNodeUtils::field_text(decl, "name", src)
                else
                {
                    return Vec::new();
                };
                self.defs
                    .insert(name.to_string(), Definition { node: decl, statement });
                vec![name.to_string()]
            }
            _ => Vec::new(),
        }
    }

    fn record_static(
        &mut self,
        stmt: Node<'t>,
    )
    {
        let Some(assign) = TsNodeUtils::named_children(stmt)
            .into_iter()
            .find(|c| c.kind() == "assignment_expression")
        else
        {
            return;
        };

        let (Some(left), Some(right)) =
            (assign.child_by_field_name("left"), assign.child_by_field_name("right"))
        else
        {
            return;
        };

        if left.kind() != "member_expression"
        {
            return;
        }

        let object = left.child_by_field_name("object");
        let property = left.child_by_field_name("property");
        if let (Some(object), Some(property)) = (object, property)
            && object.kind() == "identifier"
        {
            let key = (
                TsNodeUtils::text(object, self.src).to_string(),
                TsNodeUtils::text(property, self.src).to_string(),
            );
            self.statics
                .insert(key, right);
        }
    }

    /// Entry signature of a function-like node
    fn function_of(node: Node<'t>) -> ComponentFn<'t>
    {
        let param = node
            .child_by_field_name("parameter")
            .or_else(|| {
                node.child_by_field_name("parameters")
                    .and_then(|ps| {
                        TsNodeUtils::named_children(ps)
                            .into_iter()
                            .find(|p| p.kind() != "comment")
                    })
            });
        ComponentFn { param, hint: None, class_body: None }
    }

    /// A class extending `Component` or `PureComponent`
    fn class_fn(
        &self,
        class: Node<'t>,
    ) -> Option<ComponentFn<'t>>
    {
        let heritage = TsNodeUtils::named_children(class)
            .into_iter()
            .find(|c| c.kind() == "class_heritage")?;
        let first = TsNodeUtils::named_children(heritage)
            .into_iter()
            .find(|c| !matches!(c.kind(), "comment" | "implements_clause"))?;

        // TypeScript wraps the base in `extends_clause` with its own type arguments
        let (base, holder) = match first.kind()
        {
            "extends_clause" => (first.child_by_field_name("value")?, first),
            _ => (first, first),
        };
        let (base, hint) = match base.kind()
        {
            "instantiation_expression" => (
                TsNodeUtils::named_children(base)
                    .into_iter()
                    .next()?,
                Self::type_arg(base, 0),
            ),
            _ => (base, Self::type_arg(holder, 0)),
        };

        let callee = self.text(base);
        let last = callee
            .rsplit('.')
            .next()
            .unwrap_or(callee);
        if !COMPONENT_BASES.contains(&last)
        {
            return None;
        }

        Some(ComponentFn { param: None, hint, class_body: class.child_by_field_name("body") })
    }

    /// Value of a component's static member: a `static x = …` class field,
    /// else a `Name.x = …` assignment
    pub fn static_of(
        &self,
        component: &Component<'t>,
        member: &str,
    ) -> Option<Node<'t>>
    {
        let in_class = component
            .func
            .class_body
            .and_then(|body| {
                TsNodeUtils::named_children(body)
                    .into_iter()
                    .filter(|m| matches!(m.kind(), "field_definition" | "public_field_definition"))
                    .filter(|m| TsNodeUtils::has_child_kind(*m, "static"))
                    .find(|m| {
                        m.child_by_field_name("property")
                            .or_else(|| m.child_by_field_name("name"))
                            .is_some_and(|n| self.text(n) == member)
                    })
            })
            .and_then(|m| m.child_by_field_name("value"));

        in_class.or_else(|| {
            let binding = component
                .binding
                .as_ref()?;
            self.statics
                .get(&(binding.clone(), member.to_string()))
                .copied()
        })
    }

    fn definition_fn(
        &self,
        def: &Definition<'t>,
        depth: usize,
    ) -> Option<ComponentFn<'t>>
    {
        match def
            .node
            .kind()
        {
            "function_declaration" | "generator_function_declaration" => Some(Self::function_of(def.node)),
            "class_declaration" => self.class_fn(def.node),
            "variable_declarator" =>
            {
                // const X: React.FC<P> = …
                let hint = def
                    .node
                    .child_by_field_name("type")
                    .and_then(|t| {
                        TsNodeUtils::named_children(t)
                            .into_iter()
                            .next()
                    })
                    .and_then(|t| Self::type_arg(t, 0));
                let value = def
                    .node
                    .child_by_field_name("value")?;
                self.expression_fn(value, hint, depth)
                    .map(|(_, f)| f)
            }
            _ => None,
        }
    }

    /// `n`-th type argument of a generic type node
    fn type_arg(
        generic: Node<'t>,
        n: usize,
    ) -> Option<Node<'t>>
    {
        let args = generic
            .child_by_field_name("type_arguments")
            .or_else(|| {
                TsNodeUtils::named_children(generic)
                    .into_iter()
                    .find(|c| c.kind() == "type_arguments")
            })?;
        TsNodeUtils::named_children(args)
            .into_iter()
            .filter(|c| c.kind() != "comment")
            .nth(n)
    }

    /// Resolve an expression to a component function; also returns the
    /// identifier it went through, if any
    fn expression_fn(
        &self,
        expr: Node<'t>,
        hint: Option<Node<'t>>,
        depth: usize,
    ) -> Option<(Option<String>, ComponentFn<'t>)>
    {
        if depth > MAX_ALIAS_DEPTH
        {
            return None;
        }

        match expr.kind()
        {
            "arrow_function" | "function_expression" | "function" =>
            {
                let mut f = Self::function_of(expr);
                f.hint = hint;
                Some((None, f))
            }
            "class" => self
                .class_fn(expr)
                .map(|f| (None, f)),
            "parenthesized_expression" =>
            {
                let inner = TsNodeUtils::named_children(expr)
                    .into_iter()
                    .next()?;
                self.expression_fn(inner, hint, depth + 1)
            }
            "identifier" =>
            {
                let name = self
                    .text(expr)
                    .to_string();
                let def = self
                    .defs
                    .get(&name)?;
                let mut f = self.definition_fn(def, depth + 1)?;
                f.hint = hint.or(f.hint);
                Some((Some(name), f))
            }
            "call_expression" =>
            {
                let callee = self.text(expr.child_by_field_name("function")?);
                let last = callee
                    .rsplit('.')
                    .next()
                    .unwrap_or(callee);
                if !WRAPPERS.contains(&last)
                {
                    return None;
                }

                let wrapper_hint = match last
                {
                    "forwardRef" => Self::type_arg(expr, 1),
                    _ => Self::type_arg(expr, 0),
                };

                let first = expr
                    .child_by_field_name("arguments")
                    .and_then(|args| {
                        TsNodeUtils::named_children(args)
                            .into_iter()
                            .find(|a| a.kind() != "comment")
                    })?;
                self.expression_fn(first, hint.or(wrapper_hint), depth + 1)
            }
            _ => None,
        }
    }

    /// The exported component: default export first, then named exports in order.
    pub fn component(
        &self,
        stem: &str,
    ) -> Option<Component<'t>>
    {
        let ordered = self
            .exports
            .iter()
            .filter(|e| e.exported == "default")
            .chain(
                self.exports
                    .iter()
                    .filter(|e| e.exported != "default"),
            );

        for entry in ordered
        {
            let export = if entry.exported == "default" { ExportKind::Default } else { ExportKind::Named };

            let found = if let Some(local) = &entry.local
            {
                self.defs
                    .get(local)
                    .and_then(|def| {
                        let func = self.definition_fn(def, 0)?;
                        let name = match export
                        {
                            ExportKind::Default => local.clone(),
                            ExportKind::Named => entry
                                .exported
                                .clone(),
                        };
                        Some((name, Some(local.clone()), func, vec![def.statement, entry.statement]))
                    })
            }
            else if let Some(value) = entry.value
            {
                self.expression_fn(value, None, 0)
                    .map(|(ident, func)| {
                        let mut anchors = Vec::new();
                        if let Some(def) = ident
                            .as_ref()
                            .and_then(|i| self.defs.get(i))
                        {
                            anchors.push(def.statement);
                        }
                        anchors.push(entry.statement);
                        // `export default function Name() {}` parsed as an expression
                        let named = value
                            .child_by_field_name("name")
                            .map(|n| TsNodeUtils::text(n, self.src).to_string());
                        let binding = ident.or(named);
                        let name = binding
                            .clone()
                            .unwrap_or_else(|| stem.to_string());
                        (name, binding, func, anchors)
                    })
            }
            else
            {
                None
            };

            if let Some((name, binding, func, anchors)) = found
                && CaseUtils::is_component_name(&name)
            {
                return Some(Component { name, export, func, binding, anchors });
            }
        }

        None
    }

    /// JSDoc block directly above any anchor statement (comments may stack)
    pub fn doc_for(
        &self,
        component: &Component<'t>,
    ) -> Option<JsDoc>
    {
        component
            .anchors
            .iter()
            .find_map(|anchor| {
                let mut prev = anchor.prev_named_sibling();
                while let Some(node) = prev
                    && node.kind() == "comment"
                {
                    if let Some(doc) = JsDocUtils::parse(self.text(node))
                    {
                        return Some(doc);
                    }
                    prev = node.prev_named_sibling();
                }
                None
            })
    }
}

/// Where a dialect finds the declared prop shape
pub trait ShapeReader
{
    /// Declared props in declaration order; None when nothing is declared
    fn declared<'t>(
        &self,
        scan: &ModuleScan<'t>,
        component: &Component<'t>,
    ) -> Option<Vec<PropDescriptor>>;
}

/// Destructured (name, default) pairs of an object pattern
pub fn destructured(
    pattern: Option<Node>,
    src: &str,
) -> Vec<(String, Option<Value>)>
{
    let Some(pattern) = pattern.filter(|p| p.kind() == "object_pattern")
    else
    {
        return Vec::new();
    };

    TsNodeUtils::named_children(pattern)
        .into_iter()
        .filter_map(|part| match part.kind()
        {
            "shorthand_property_identifier_pattern" => Some((TsNodeUtils::text(part, src).to_string(), None)),
            "object_assignment_pattern" =>
            {
                let name = TsNodeUtils::field_text(part, "left", src)?;
                let default = part
                    .child_by_field_name("right")
                    .map(|r| default_value(r, src));
                Some((name.to_string(), default))
            }
            "pair_pattern" =>
            {
                let key = unquote(TsNodeUtils::field_text(part, "key", src)?);
                let default = part
                    .child_by_field_name("value")
                    .filter(|v| v.kind() == "assignment_pattern")
                    .and_then(|v| v.child_by_field_name("right"))
                    .map(|r| default_value(r, src));
                Some((key, default))
            }
            _ => None,
        })
        .collect()
}

/// `defaultProps` entries, from a static class field or `Name.defaultProps = { … }`
pub fn default_props<'t>(
    scan: &ModuleScan<'t>,
    component: &Component<'t>,
) -> Vec<(String, Value)>
{
    scan.static_of(component, "defaultProps")
        .map(|obj| {
            object_pairs(obj, scan.src)
                .into_iter()
                .map(|(k, v)| (k, default_value(v, scan.src)))
                .collect()
        })
        .unwrap_or_default()
}

/// Declared shape first, then defaults, then destructured names
pub fn merge_props(
    declared: Vec<PropDescriptor>,
    defaults: Vec<(String, Value)>,
    destructured: Vec<(String, Option<Value>)>,
) -> Vec<PropDescriptor>
{
    let mut props = declared;

    let mut apply = |name: String, default: Option<Value>| match props
        .iter_mut()
        .find(|p| p.name == name)
    {
        Some(p) =>
        {
            if default.is_some()
            {
                p.default = default;
                p.required = false;
            }
        }
        None => props.push(PropDescriptor { name, ty: TypeExpr::unknown(), required: false, default }),
    };

    for (name, value) in defaults
    {
        apply(name, Some(value));
    }
    for (name, default) in destructured
    {
        apply(name, default);
    }

    props
}

/// Shared adaptor body: parse, select the component, assemble its descriptor.
pub fn extract_component(
    language: &Language,
    path: &Path,
    content: &str,
    shapes: &dyn ShapeReader,
) -> Result<Option<ComponentDescriptor>, AdaptorError>
{
    let tree = parse(language, path, content)?;
    let scan = ModuleScan::scan(tree.root_node(), content);

    let Some(component) = scan.component(&stem_name(path))
    else
    {
        return Ok(None);
    };

    let declared = shapes
        .declared(&scan, &component)
        .unwrap_or_default();
    let (pattern, _) = component
        .func
        .param_parts();
    let props = merge_props(declared, default_props(&scan, &component), destructured(pattern, content));

    let doc = scan
        .doc_for(&component)
        .unwrap_or_default();

    Ok(Some(ComponentDescriptor {
        name: component.name,
        source_path: path
            .to_string_lossy()
            .replace('\\', "/"),
        export: component.export,
        props,
        examples: doc.examples,
        doc: doc.description,
        tokens_used: tokens::references(content),
        resolution: Resolution::Direct,
    }))
}

/// Re-exports of a barrel module; None when the module defines anything itself
pub fn barrel_reexports(
    language: &Language,
    path: &Path,
    content: &str,
) -> Result<Option<Vec<ReExport>>, AdaptorError>
{
    let tree = parse(language, path, content)?;
    let scan = ModuleScan::scan(tree.root_node(), content);

    Ok(scan
        .is_barrel()
        .then_some(scan.reexports))
}
