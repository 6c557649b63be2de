//! Registry config file: load, validate, migrate legacy keys, resolve paths.
//!
//! The config is an explicit value handed to every build; nothing here is
//! cached between calls.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::cli::{AppContext, InitArgs};
use crate::core::error::{RegistryError, RegistryResult, Warning, WarningKind};
use crate::infra::schema::SchemaSet;
use crate::infra::settings::Settings;

pub const DEFAULT_COMPONENT_PATTERNS: &[&str] = &["**/*.{tsx,ts,jsx,js}"];

pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] =
    &["**/*.test.*", "**/*.spec.*", "**/__tests__/**", "**/*.stories.*", "**/*.d.ts"];

pub const DEFAULT_DENYLIST: &[&str] = &["node_modules", "vendor", "dist"];

pub const DEFAULT_BARREL_DEPTH: usize = 8;

pub const DEFAULT_VERSION: &str = "0.1.0";

/// Source dialects, in default priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdaptorKind
{
    TypeScript,
    JavaScript,
}

/// `tokens` accepts one path or a list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TokenSources
{
    One(String),
    Many(Vec<String>),
}

/// Config document as written on disk
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig
{
    name: Option<String>,
    version: Option<String>,
    component_source: Option<String>,
    components: Option<String>,
    tokens: TokenSources,
    output: String,
    component_patterns: Option<Vec<String>>,
    exclude_patterns: Option<Vec<String>>,
    denylist: Option<Vec<String>>,
    barrel_depth: Option<usize>,
    adaptors: Option<Vec<AdaptorKind>>,
}

/// Config with every path absolute and every default applied
#[derive(Debug, Clone)]
pub struct ResolvedConfig
{
    pub config_path: PathBuf,
    pub base_dir: PathBuf,
    pub name: String,
    pub version: String,
    pub component_source: PathBuf,
    pub tokens: Vec<PathBuf>,
    pub output: PathBuf,
    pub component_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub denylist: Vec<String>,
    pub barrel_depth: usize,
    pub adaptors: Vec<AdaptorKind>,
}

/// `p` unchanged when absolute, else joined onto the config file's directory
pub fn resolve_path(
    p: impl AsRef<Path>,
    config_path: impl AsRef<Path>,
) -> PathBuf
{
    let p = p.as_ref();
    if p.is_absolute()
    {
        return p.to_path_buf();
    }

    match config_path
        .as_ref()
        .parent()
    {
        Some(dir) => dir.join(p),
        None => p.to_path_buf(),
    }
}

fn owned(list: &[&str]) -> Vec<String>
{
    list.iter()
        .map(|s| s.to_string())
        .collect()
}

fn require_path(
    key: &str,
    raw: &str,
    config_path: &Path,
) -> RegistryResult<PathBuf>
{
    if raw
        .trim()
        .is_empty()
    {
        return Err(RegistryError::config(format!("`{key}` must not be empty")));
    }
    Ok(resolve_path(raw, config_path))
}

/// Pick the component source, migrating the legacy `components` key.
fn migrate_component_source(
    raw: &RawConfig,
    warnings: &mut Vec<Warning>,
) -> RegistryResult<String>
{
    match (&raw.component_source, &raw.components)
    {
        (Some(current), None) => Ok(current.clone()),
        (None, Some(legacy)) =>
        {
            warnings.push(Warning::new(
                WarningKind::LegacyConfig,
                "config key `components` is deprecated; treating it as `componentSource`",
            ));
            Ok(legacy.clone())
        }
        (Some(current), Some(_)) =>
        {
            warnings.push(Warning::new(
                WarningKind::LegacyConfig,
                "config sets both `componentSource` and legacy `components`; using `componentSource`",
            ));
            Ok(current.clone())
        }
        (None, None) => Err(RegistryError::config("config must set `componentSource`")),
    }
}

/// Parse, validate and resolve an already-read config document.
pub fn resolve_config(
    doc: &Value,
    config_path: &Path,
    schemas: &SchemaSet,
) -> RegistryResult<(ResolvedConfig, Vec<Warning>)>
{
    let problems = schemas.config_errors(doc);
    if !problems.is_empty()
    {
        return Err(RegistryError::config(format!(
            "{} does not match the config schema:\n  {}",
            config_path.display(),
            problems.join("\n  ")
        )));
    }

    let raw: RawConfig = serde_json::from_value(doc.clone())
        .map_err(|e| RegistryError::config(format!("{}: {e}", config_path.display())))?;

    let mut warnings = Vec::new();
    let source = migrate_component_source(&raw, &mut warnings)?;

    let token_list = match raw.tokens
    {
        TokenSources::One(p) => vec![p],
        TokenSources::Many(ps) => ps,
    };
    if token_list.is_empty()
    {
        return Err(RegistryError::config("`tokens` must name at least one stylesheet or directory"));
    }

    let base_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let name = raw
        .name
        .or_else(|| {
            base_dir
                .file_name()
                .map(|n| {
                    n.to_string_lossy()
                        .into_owned()
                })
        })
        .unwrap_or_else(|| "registry".to_string());

    let resolved = ResolvedConfig {
        config_path: config_path.to_path_buf(),
        name,
        version: raw
            .version
            .unwrap_or_else(|| DEFAULT_VERSION.to_string()),
        component_source: require_path("componentSource", &source, config_path)?,
        tokens: token_list
            .iter()
            .map(|t| require_path("tokens", t, config_path))
            .collect::<RegistryResult<_>>()?,
        output: require_path("output", &raw.output, config_path)?,
        component_patterns: raw
            .component_patterns
            .unwrap_or_else(|| owned(DEFAULT_COMPONENT_PATTERNS)),
        exclude_patterns: raw
            .exclude_patterns
            .unwrap_or_else(|| owned(DEFAULT_EXCLUDE_PATTERNS)),
        denylist: raw
            .denylist
            .unwrap_or_else(|| owned(DEFAULT_DENYLIST)),
        barrel_depth: raw
            .barrel_depth
            .unwrap_or(DEFAULT_BARREL_DEPTH),
        adaptors: raw
            .adaptors
            .unwrap_or_else(|| vec![AdaptorKind::TypeScript, AdaptorKind::JavaScript]),
        base_dir,
    };

    Ok((resolved, warnings))
}

/// Read the config file at `path` and resolve it.
#[instrument(skip(schemas), fields(path = %path.display()))]
pub fn load_config(
    path: &Path,
    schemas: &SchemaSet,
) -> RegistryResult<(ResolvedConfig, Vec<Warning>)>
{
    let absolute = std::path::absolute(path)
        .map_err(|e| RegistryError::config(format!("cannot resolve {}: {e}", path.display())))?;

    let text = std::fs::read_to_string(&absolute)
        .map_err(|e| RegistryError::config(format!("cannot read {}: {e}", absolute.display())))?;

    let doc: Value = serde_json::from_str(&text)
        .map_err(|e| RegistryError::config(format!("{} is not valid JSON: {e}", absolute.display())))?;

    let out = resolve_config(&doc, &absolute, schemas)?;
    debug!(source = %out.0.component_source.display(), output = %out.0.output.display(), "config resolved");
    Ok(out)
}

/// Write a starter `swatch.json` and `swatch.toml` into `args.path`.
pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join("swatch.json");
    let settings_path = args
        .path
        .join("swatch.toml");

    for p in [&config_path, &settings_path]
    {
        if p.exists() && !args.force
        {
            anyhow::bail!("{} already exists. Use --force to overwrite.", p.display());
        }
    }

    std::fs::create_dir_all(&args.path).with_context(|| format!("create {}", args.path.display()))?;

    let template = json!({
        "componentSource": "./src/components",
        "tokens": ["./src/styles"],
        "output": "./registry.json",
        "componentPatterns": DEFAULT_COMPONENT_PATTERNS,
        "excludePatterns": DEFAULT_EXCLUDE_PATTERNS,
        "denylist": DEFAULT_DENYLIST,
        "barrelDepth": DEFAULT_BARREL_DEPTH,
    });
    let json_text = serde_json::to_string_pretty(&template).context("serialize config template")?;
    std::fs::write(&config_path, json_text + "\n").context("Failed to write config file")?;

    let toml_string =
        toml::to_string_pretty(&Settings::default()).context("Failed to serialize default settings")?;
    std::fs::write(&settings_path, toml_string).context("Failed to write settings file")?;

    if !ctx.quiet
    {
        println!("Created {} and {}", config_path.display(), settings_path.display());
    }
    Ok(())
}
