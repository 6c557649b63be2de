//! Registry data model.
//!
//! Everything here serializes with camelCase keys and is validated against
//! `schemas/registry.schema.json` before it reaches disk.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Canonical persisted document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Registry
{
    pub name: String,
    pub version: String,
    pub components: Vec<ComponentDescriptor>,
    pub tokens: Vec<TokenDescriptor>,
    pub generated_at: DateTime<Utc>,
}

impl Registry
{
    /// True when everything except `generatedAt` matches
    pub fn same_content(
        &self,
        other: &Registry,
    ) -> bool
    {
        self.name == other.name
            && self.version == other.version
            && self.components == other.components
            && self.tokens == other.tokens
    }

    /// Find a component by exact name
    pub fn component(
        &self,
        name: &str,
    ) -> Option<&ComponentDescriptor>
    {
        self.components
            .iter()
            .find(|c| c.name == name)
    }

    /// Check the uniqueness invariants; returns one message per violation
    pub fn invariant_violations(&self) -> Vec<String>
    {
        let mut problems = Vec::new();

        let mut names = HashSet::new();
        for c in &self.components
        {
            if !names.insert(c.name.as_str())
            {
                problems.push(format!("duplicate component name `{}`", c.name));
            }
        }

        let mut keys = HashSet::new();
        for t in &self.tokens
        {
            if !keys.insert((t.category.as_str(), t.name.as_str()))
            {
                problems.push(format!("duplicate token `{}`", t.key()));
            }
        }

        problems
    }
}

/// One exported UI component
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptor
{
    /// Exported identity, unique within a registry
    pub name: String,

    /// Forward-slash path of the defining file, relative to the config dir
    pub source_path: String,

    /// Default or named export
    pub export: ExportKind,

    #[serde(default)]
    pub props: Vec<PropDescriptor>,

    /// `@example` bodies from the leading JSDoc block
    #[serde(default)]
    pub examples: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    /// Sorted `category.name` keys referenced through `var(--…)`
    #[serde(default)]
    pub tokens_used: Vec<String>,

    #[serde(default, skip_serializing_if = "Resolution::is_direct")]
    pub resolution: Resolution,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ExportKind
{
    Default,
    Named,
}

impl fmt::Display for ExportKind
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        f.write_str(match self
        {
            ExportKind::Default => "default",
            ExportKind::Named => "named",
        })
    }
}

/// How a descriptor was reached
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Resolution
{
    #[default]
    Direct,

    /// Found by following re-exports
    Barrel,

    /// Re-export chain revisited a file
    CycleTruncated,

    /// Re-export chain exceeded the configured depth
    DepthTruncated,
}

impl Resolution
{
    pub fn is_direct(&self) -> bool
    {
        matches!(self, Resolution::Direct)
    }

    pub fn is_truncated(&self) -> bool
    {
        matches!(self, Resolution::CycleTruncated | Resolution::DepthTruncated)
    }
}

impl fmt::Display for Resolution
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        f.write_str(match self
        {
            Resolution::Direct => "direct",
            Resolution::Barrel => "barrel",
            Resolution::CycleTruncated => "cycle-truncated",
            Resolution::DepthTruncated => "depth-truncated",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PropDescriptor
{
    pub name: String,

    #[serde(rename = "type")]
    pub ty: TypeExpr,

    pub required: bool,

    /// Literal defaults decode to JSON; other expressions keep their source text
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<Value>,
}

/// Closed model of a prop's declared type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TypeExpr
{
    Primitive
    {
        name: Primitive,
    },

    /// Every member is a literal
    Union
    {
        values: Vec<Value>,
    },

    Object
    {
        fields: Vec<FieldDescriptor>,
    },

    Unknown
    {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        raw: Option<String>,
    },
}

impl TypeExpr
{
    pub fn unknown() -> Self
    {
        TypeExpr::Unknown { raw: None }
    }

    pub fn raw(text: &str) -> Self
    {
        let collapsed = text
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        TypeExpr::Unknown { raw: (!collapsed.is_empty()).then_some(collapsed) }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Primitive
{
    String,
    Number,
    Boolean,
    Bigint,
    Symbol,
}

impl Primitive
{
    pub fn parse(text: &str) -> Option<Self>
    {
        match text.trim()
        {
            "string" => Some(Primitive::String),
            "number" => Some(Primitive::Number),
            "boolean" | "bool" => Some(Primitive::Boolean),
            "bigint" => Some(Primitive::Bigint),
            "symbol" => Some(Primitive::Symbol),
            _ => None,
        }
    }
}

/// Member of an object-shape type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDescriptor
{
    pub name: String,

    #[serde(rename = "type")]
    pub ty: TypeExpr,

    pub required: bool,
}

/// One design token parsed from a stylesheet variable
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct TokenDescriptor
{
    pub category: String,
    pub name: String,
    pub value: String,
    pub kind: TokenKind,
    pub source_file: String,
}

impl TokenDescriptor
{
    /// Dot-separated lookup key (`color.brand-primary`)
    pub fn key(&self) -> String
    {
        format!("{}.{}", self.category, self.name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum TokenKind
{
    Color,
    Dimension,
    Duration,
    FontWeight,
    String,
}

impl TokenKind
{
    /// Exchange-format `$type` label
    pub fn as_type(&self) -> &'static str
    {
        match self
        {
            TokenKind::Color => "color",
            TokenKind::Dimension => "dimension",
            TokenKind::Duration => "duration",
            TokenKind::FontWeight => "fontWeight",
            TokenKind::String => "string",
        }
    }

    pub fn from_type(label: &str) -> Option<Self>
    {
        match label
        {
            "color" => Some(TokenKind::Color),
            "dimension" => Some(TokenKind::Dimension),
            "duration" => Some(TokenKind::Duration),
            "fontWeight" => Some(TokenKind::FontWeight),
            "string" => Some(TokenKind::String),
            _ => None,
        }
    }
}

/// Keep an explicit `null` as `Some(Value::Null)` so documents round-trip
pub(crate) fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn sample() -> Registry
    {
        Registry {
            name: "ui".into(),
            version: "1.0.0".into(),
            components: vec![ComponentDescriptor {
                name: "Button".into(),
                source_path: "src/Button.tsx".into(),
                export: ExportKind::Named,
                props: vec![PropDescriptor {
                    name: "icon".into(),
                    ty: TypeExpr::unknown(),
                    required: false,
                    default: Some(Value::Null),
                }],
                examples: vec![],
                doc: None,
                tokens_used: vec![],
                resolution: Resolution::Direct,
            }],
            tokens: vec![],
            generated_at: DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    #[test]
    fn null_default_survives_a_round_trip()
    {
        let reg = sample();
        let text = serde_json::to_string(&reg).unwrap();
        assert!(text.contains(r#""default":null"#));
        let back: Registry = serde_json::from_str(&text).unwrap();
        assert_eq!(back, reg);
        assert_eq!(serde_json::to_string(&back).unwrap(), text);
    }

    #[test]
    fn direct_resolution_is_omitted()
    {
        let text = serde_json::to_string(&sample()).unwrap();
        assert!(!text.contains("resolution"));
        assert!(text.contains(r#""sourcePath":"src/Button.tsx""#));
    }

    #[test]
    fn duplicate_names_are_reported()
    {
        let mut reg = sample();
        reg.components
            .push(reg.components[0].clone());
        let problems = reg.invariant_violations();
        assert_eq!(problems, vec!["duplicate component name `Button`".to_string()]);
    }

    #[test]
    fn type_expr_tags()
    {
        let t = TypeExpr::Primitive { name: Primitive::Boolean };
        assert_eq!(
            serde_json::to_value(&t).unwrap(),
            serde_json::json!({"kind": "primitive", "name": "boolean"})
        );
        assert_eq!(TypeExpr::raw("  () =>\n void "), TypeExpr::Unknown {
            raw: Some("() => void".into())
        });
    }
}
