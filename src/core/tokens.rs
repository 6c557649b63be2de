//! Stylesheet custom properties → typed design tokens, and the exchange format.
//!
//! Exchange documents follow the W3C design-token layout: groups are plain
//! objects, tokens are objects carrying `$value`, and `$type` may be set on a
//! token or inherited from an enclosing group.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value, json};
use tracing::{debug, instrument};

use crate::core::error::{RegistryError, RegistryResult, TokenImportError, Warning, WarningKind};
use crate::core::model::{TokenDescriptor, TokenKind};
use crate::infra::io::read_file_smart;
use crate::infra::walk::{FileWalker, relative_slash};

/// Vendor namespace under `$extensions`
pub const EXTENSION_KEY: &str = "dev.swatch";

pub const STYLESHEET_PATTERNS: &[&str] = &["**/*.css", "**/*.scss", "**/*.less"];

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("static regex"));

static DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"--([A-Za-z0-9_]+(?:-[A-Za-z0-9_]*)*)\s*:\s*([^;{}]+?)\s*;").expect("static regex")
});

static REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"var\(\s*--([A-Za-z0-9_]+(?:-[A-Za-z0-9_]*)*)").expect("static regex"));

static COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(#([0-9a-f]{3}|[0-9a-f]{4}|[0-9a-f]{6}|[0-9a-f]{8})|(rgba?|hsla?)\(.*\))$").expect("static regex")
});

static DIMENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?(\d+(\.\d+)?|\.\d+)(px|rem|em|%|vh|vw|vmin|vmax|ch|ex|pt|pc|cm|mm|in)$").expect("static regex")
});

static DURATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?(\d+(\.\d+)?|\.\d+)(ms|s)$").expect("static regex"));

static WEIGHT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[1-9]00$").expect("static regex"));

/// Split `color-brand-primary` into (`color`, `brand-primary`)
fn split_name(full: &str) -> Option<(&str, &str)>
{
    let (category, name) = full.split_once('-')?;
    if category.is_empty() || name.is_empty() || name.starts_with('-')
    {
        return None;
    }
    Some((category, name))
}

/// Classify a raw declaration value
pub fn infer_kind(value: &str) -> TokenKind
{
    let v = value.trim();
    if COLOR.is_match(v)
    {
        TokenKind::Color
    }
    else if DIMENSION.is_match(v)
    {
        TokenKind::Dimension
    }
    else if DURATION.is_match(v)
    {
        TokenKind::Duration
    }
    else if WEIGHT.is_match(v)
    {
        TokenKind::FontWeight
    }
    else
    {
        TokenKind::String
    }
}

/// Tokens declared in one stylesheet, in source order
pub fn parse_tokens(
    source: &str,
    source_file: &str,
) -> Vec<TokenDescriptor>
{
    let stripped = COMMENT.replace_all(source, " ");

    DECLARATION
        .captures_iter(&stripped)
        .filter_map(|cap| {
            // `a--b: …` is not a custom property
            let start = cap.get(0)?.start();
            if stripped[..start]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                return None;
            }

            let (category, name) = split_name(cap.get(1)?.as_str())?;
            let value = cap
                .get(2)?
                .as_str()
                .trim();
            Some(TokenDescriptor {
                category: category.to_string(),
                name: name.to_string(),
                value: value.to_string(),
                kind: infer_kind(value),
                source_file: source_file.to_string(),
            })
        })
        .collect()
}

/// Sorted, de-duplicated `category.name` keys referenced through `var(--…)`
pub fn references(source: &str) -> Vec<String>
{
    let mut keys: Vec<String> = REFERENCE
        .captures_iter(source)
        .filter_map(|cap| {
            let (category, name) = split_name(cap.get(1)?.as_str())?;
            Some(format!("{category}.{name}"))
        })
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

/// Stylesheet files under each path (a file path is taken as-is)
pub fn stylesheet_files(paths: &[PathBuf]) -> RegistryResult<Vec<PathBuf>>
{
    let walker = FileWalker::new(&[])
        .and_then(|w| {
            w.with_includes(
                &STYLESHEET_PATTERNS
                    .iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>(),
            )
        })
        .map_err(|e| RegistryError::config(format!("{e:#}")))?;

    let mut files = Vec::new();
    for p in paths
    {
        if p.is_file()
        {
            files.push(p.clone());
        }
        else if p.is_dir()
        {
            files.extend(walker.walk_files(p));
        }
        else
        {
            return Err(RegistryError::config(format!("token source {} does not exist", p.display())));
        }
    }
    Ok(files)
}

/// Parse every stylesheet under `paths`; later duplicates win with a warning.
#[instrument(skip_all, fields(sources = paths.len()))]
pub fn collect_tokens(
    paths: &[PathBuf],
    base_dir: &Path,
) -> RegistryResult<(Vec<TokenDescriptor>, Vec<Warning>)>
{
    let mut warnings = Vec::new();
    let mut by_key: BTreeMap<(String, String), TokenDescriptor> = BTreeMap::new();

    for file in stylesheet_files(paths)?
    {
        let rel = relative_slash(base_dir, &file);
        let content = match read_file_smart(&file)
        {
            Ok(c) => c,
            Err(e) =>
            {
                warnings.push(Warning::new(WarningKind::Unreadable, format!("{rel}: {e:#}")));
                continue;
            }
        };

        for token in parse_tokens(content.as_ref(), &rel)
        {
            let key = (token.category.clone(), token.name.clone());
            if let Some(prev) = by_key.insert(key, token.clone())
            {
                warnings.push(Warning::new(
                    WarningKind::TokenOverride,
                    format!(
                        "token `{}` from {} overrides the one in {}",
                        token.key(),
                        token.source_file,
                        prev.source_file
                    ),
                ));
            }
        }
    }

    debug!(tokens = by_key.len(), "tokens collected");
    Ok((by_key.into_values().collect(), warnings))
}

/// Exchange document: `{category: {name: {$value, $type, $extensions}}}`
pub fn export_tokens(tokens: &[TokenDescriptor]) -> Value
{
    let mut root = Map::new();
    for t in tokens
    {
        let group = root
            .entry(t.category.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(group) = group
        {
            group.insert(
                t.name.clone(),
                json!({
                    "$value": t.value,
                    "$type": t.kind.as_type(),
                    "$extensions": { EXTENSION_KEY: { "sourceFile": t.source_file } },
                }),
            );
        }
    }
    Value::Object(root)
}

fn value_text(v: &Value) -> Option<String>
{
    match v
    {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn import_group(
    category: &str,
    prefix: &[&str],
    group: &Map<String, Value>,
    inherited: Option<&str>,
    out: &mut Vec<TokenDescriptor>,
) -> Result<(), TokenImportError>
{
    let group_type = group
        .get("$type")
        .and_then(Value::as_str)
        .or(inherited);

    for (key, child) in group
    {
        if key.starts_with('$')
        {
            continue;
        }
        let Value::Object(child) = child
        else
        {
            continue;
        };

        let mut path = prefix.to_vec();
        path.push(key);

        if !child.contains_key("$value")
        {
            import_group(category, &path, child, group_type, out)?;
            continue;
        }

        let dotted = format!("{category}.{}", path.join("-"));
        let value = child
            .get("$value")
            .and_then(value_text)
            .ok_or_else(|| TokenImportError::MissingValue { path: dotted.clone() })?;

        let kind = match child
            .get("$type")
            .and_then(Value::as_str)
            .or(group_type)
        {
            Some(ty) => TokenKind::from_type(ty)
                .ok_or_else(|| TokenImportError::UnknownType { path: dotted.clone(), ty: ty.to_string() })?,
            None => infer_kind(&value),
        };

        let source_file = child
            .get("$extensions")
            .and_then(|e| e.get(EXTENSION_KEY))
            .and_then(|e| e.get("sourceFile"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        out.push(TokenDescriptor {
            category: category.to_string(),
            name: path.join("-"),
            value,
            kind,
            source_file,
        });
    }
    Ok(())
}

/// Inverse of [`export_tokens`]; nested groups flatten into dash-joined names.
pub fn import_tokens(doc: &Value) -> Result<Vec<TokenDescriptor>, TokenImportError>
{
    let root = doc
        .as_object()
        .ok_or(TokenImportError::NotAnObject)?;

    let mut out = Vec::new();
    for (category, group) in root
    {
        if category.starts_with('$')
        {
            continue;
        }
        let Value::Object(group) = group
        else
        {
            continue;
        };
        if group.contains_key("$value")
        {
            return Err(TokenImportError::MissingName { path: category.clone() });
        }
        import_group(category, &[], group, None, &mut out)?;
    }

    out.sort_by(|a, b| (&a.category, &a.name).cmp(&(&b.category, &b.name)));
    Ok(out)
}

/// `:root { --category-name: value; }` stylesheet for imported tokens
pub fn render_css(tokens: &[TokenDescriptor]) -> String
{
    let mut css = String::from(":root {\n");
    for t in tokens
    {
        css.push_str(&format!("  --{}-{}: {};\n", t.category, t.name, t.value));
    }
    css.push_str("}\n");
    css
}

#[cfg(test)]
mod tests
{
    use super::*;

    const SHEET: &str = r#"
/* brand palette --ignored-here: 1px; */
:root {
  --color-brand-primary: #0af;
  --color-text: rgba(0, 0, 0, 0.87);
  --space-md: 1.5rem;
  --motion-fast: 120ms;
  --font-weight-bold: 700;
  --font-family-body: "Inter", sans-serif;
  --gap: 4px;
}
.btn--primary:hover { color: var(--color-brand-primary); }
"#;

    #[test]
    fn parses_categories_names_and_kinds()
    {
        let tokens = parse_tokens(SHEET, "tokens.css");
        let summary: Vec<(String, TokenKind)> = tokens
            .iter()
            .map(|t| (t.key(), t.kind))
            .collect();
        assert_eq!(summary, vec![
            ("color.brand-primary".to_string(), TokenKind::Color),
            ("color.text".to_string(), TokenKind::Color),
            ("space.md".to_string(), TokenKind::Dimension),
            ("motion.fast".to_string(), TokenKind::Duration),
            ("font.weight-bold".to_string(), TokenKind::FontWeight),
            ("font.family-body".to_string(), TokenKind::String),
        ]);
        assert_eq!(tokens[5].value, r#""Inter", sans-serif"#);
    }

    #[test]
    fn kind_inference_order()
    {
        assert_eq!(infer_kind("#ABCDEF80"), TokenKind::Color);
        assert_eq!(infer_kind("hsl(200 50% 50%)"), TokenKind::Color);
        assert_eq!(infer_kind("50%"), TokenKind::Dimension);
        assert_eq!(infer_kind("-.5em"), TokenKind::Dimension);
        assert_eq!(infer_kind("2s"), TokenKind::Duration);
        assert_eq!(infer_kind("400"), TokenKind::FontWeight);
        assert_eq!(infer_kind("450"), TokenKind::String);
        assert_eq!(infer_kind("0"), TokenKind::String);
        assert_eq!(infer_kind("#12"), TokenKind::String);
    }

    #[test]
    fn references_are_sorted_and_unique()
    {
        let src = "const s = { color: 'var(--color-text)', gap: 'var( --space-md)', c: 'var(--color-text)', x: 'var(--solo)' };";
        assert_eq!(references(src), vec!["color.text", "space.md"]);
    }

    #[test]
    fn export_then_import_restores_tokens()
    {
        let tokens = parse_tokens(SHEET, "styles/tokens.css");
        let doc = export_tokens(&tokens);
        assert_eq!(doc["color"]["brand-primary"]["$type"], "color");
        assert_eq!(doc["color"]["brand-primary"]["$extensions"]["dev.swatch"]["sourceFile"], "styles/tokens.css");

        let mut expected = tokens.clone();
        expected.sort_by(|a, b| (&a.category, &a.name).cmp(&(&b.category, &b.name)));
        assert_eq!(import_tokens(&doc).unwrap(), expected);
    }

    #[test]
    fn import_flattens_groups_and_inherits_type()
    {
        let doc = json!({
            "color": {
                "$type": "color",
                "brand": { "primary": { "$value": "#fff" }, "muted": { "$value": "gray", "$type": "string" } }
            },
            "space": { "sm": { "$value": "4px" } }
        });
        let tokens = import_tokens(&doc).unwrap();
        let keys: Vec<_> = tokens
            .iter()
            .map(|t| (t.key(), t.kind))
            .collect();
        assert_eq!(keys, vec![
            ("color.brand-muted".to_string(), TokenKind::String),
            ("color.brand-primary".to_string(), TokenKind::Color),
            ("space.sm".to_string(), TokenKind::Dimension),
        ]);
    }

    #[test]
    fn unknown_type_is_an_import_error()
    {
        let doc = json!({"shadow": {"lg": {"$value": "0 1px red", "$type": "shadow"}}});
        assert_eq!(import_tokens(&doc).unwrap_err(), TokenImportError::UnknownType {
            path: "shadow.lg".into(),
            ty: "shadow".into()
        });
    }

    #[test]
    fn collect_last_wins_with_warning() -> anyhow::Result<()>
    {
        let tmp = tempfile::TempDir::new()?;
        let dir = tmp.path().join("styles");
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join("a.css"), ":root { --color-bg: #fff; --space-sm: 4px; }")?;
        std::fs::write(dir.join("b.css"), ":root { --color-bg: #000; }")?;

        let (tokens, warnings) = collect_tokens(&[dir], tmp.path())?;
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].value, "#000");
        assert_eq!(tokens[0].source_file, "styles/b.css");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::TokenOverride);
        Ok(())
    }

    #[test]
    fn render_css_lists_every_token()
    {
        let tokens = parse_tokens(":root{--space-md: 8px;}", "t.css");
        assert_eq!(render_css(&tokens), ":root {\n  --space-md: 8px;\n}\n");
    }
}
