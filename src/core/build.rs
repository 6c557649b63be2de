//! Filepath: src/core/build.rs
//! Registry builder: config → extraction + tokens → validated registry on disk.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::core::error::{RegistryError, RegistryResult, Warning};
use crate::core::extract::ExtractionEngine;
use crate::core::model::Registry;
use crate::core::{store, tokens};
use crate::infra::config::{ResolvedConfig, load_config};
use crate::infra::lock::with_exclusive_lock;
use crate::infra::schema::SchemaSet;

/// Knobs for one build run
#[derive(Debug, Clone)]
pub struct BuildOptions
{
    /// Stamp for `generatedAt` when content changed
    pub now: DateTime<Utc>,

    /// Compose and validate, never write
    pub dry_run: bool,

    /// Write here instead of the configured `output`
    pub output: Option<PathBuf>,
}

impl Default for BuildOptions
{
    fn default() -> Self
    {
        Self { now: Utc::now(), dry_run: false, output: None }
    }
}

#[derive(Debug)]
pub struct BuildReport
{
    pub registry: Registry,
    pub output: PathBuf,

    /// False for dry runs and for unchanged output
    pub written: bool,
    pub warnings: Vec<Warning>,
}

/// Load the config at `config_path` and build its registry.
#[instrument(skip(opts), fields(config = %config_path.display()))]
pub fn build(
    config_path: &Path,
    opts: &BuildOptions,
) -> RegistryResult<BuildReport>
{
    let schemas = SchemaSet::new()?;
    let (cfg, warnings) = load_config(config_path, &schemas)?;
    build_resolved(&cfg, warnings, &schemas, opts)
}

/// Extraction and token collection for an already-resolved config
pub fn compose(
    cfg: &ResolvedConfig,
    now: DateTime<Utc>,
) -> RegistryResult<(Registry, Vec<Warning>)>
{
    if !cfg
        .component_source
        .exists()
    {
        return Err(RegistryError::config(format!(
            "componentSource {} does not exist",
            cfg.component_source
                .display()
        )));
    }

    let extraction = ExtractionEngine::from_config(cfg)?.run(&cfg.component_source, &cfg.base_dir);
    let mut warnings = extraction.warnings;

    let (tokens, token_warnings) = tokens::collect_tokens(&cfg.tokens, &cfg.base_dir)?;
    warnings.extend(token_warnings);

    let registry = Registry {
        name: cfg
            .name
            .clone(),
        version: cfg
            .version
            .clone(),
        components: extraction.components,
        tokens,
        generated_at: now,
    };

    Ok((registry, warnings))
}

/// Build from a resolved config; `warnings` carries config-stage warnings.
pub fn build_resolved(
    cfg: &ResolvedConfig,
    mut warnings: Vec<Warning>,
    schemas: &SchemaSet,
    opts: &BuildOptions,
) -> RegistryResult<BuildReport>
{
    let (mut registry, more) = compose(cfg, opts.now)?;
    warnings.extend(more);

    let output = opts
        .output
        .clone()
        .unwrap_or_else(|| {
            cfg.output
                .clone()
        });

    // Keep the previous stamp when nothing else changed
    let previous_bytes = std::fs::read(&output).ok();
    if let Some(bytes) = &previous_bytes
    {
        match store::parse_document(bytes, &output).and_then(|doc| store::validate(&doc, schemas))
        {
            Ok(previous) if previous.same_content(&registry) =>
            {
                registry.generated_at = previous.generated_at;
            }
            Ok(_) =>
            {}
            Err(e) => debug!(error = %e, "previous registry ignored"),
        }
    }

    let doc = serde_json::to_value(&registry)
        .map_err(|e| RegistryError::Validation { problems: vec![format!("cannot serialize registry: {e}")] })?;
    store::validate(&doc, schemas)?;

    let bytes = store::to_bytes(&registry)?;
    let unchanged = previous_bytes.as_deref() == Some(bytes.as_slice());

    let written = if opts.dry_run || unchanged
    {
        false
    }
    else
    {
        with_exclusive_lock(&output, || store::write_atomic(&output, &bytes))?;
        true
    };

    info!(
        components = registry.components.len(),
        tokens = registry.tokens.len(),
        written,
        "registry built"
    );

    Ok(BuildReport { registry, output, written, warnings })
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use anyhow::Result;
    use chrono::TimeZone;
    use tempfile::TempDir;

    use super::*;
    use crate::core::error::WarningKind;

    fn project(config: &str) -> Result<TempDir>
    {
        let tmp = TempDir::new()?;
        let root = tmp.path();
        fs::create_dir_all(root.join("src/components"))?;
        fs::create_dir_all(root.join("src/styles"))?;
        fs::write(root.join("swatch.json"), config)?;
        fs::write(
            root.join("src/components/Button.tsx"),
            "export function Button({ size = 'md' }: { size?: 'sm' | 'md' }) {\n  return <button style={{ color: 'var(--color-primary)' }} />;\n}\n",
        )?;
        fs::write(root.join("src/styles/tokens.css"), ":root { --color-primary: #0af; --space-sm: 4px; }\n")?;
        Ok(tmp)
    }

    const CONFIG: &str =
        r#"{"name": "ui", "componentSource": "./src/components", "tokens": "./src/styles", "output": "./out/registry.json"}"#;

    fn at(h: u32) -> DateTime<Utc>
    {
        Utc.with_ymd_and_hms(2026, 3, 1, h, 0, 0)
            .unwrap()
    }

    #[test]
    fn builds_and_writes() -> Result<()>
    {
        let tmp = project(CONFIG)?;
        let report = build(&tmp.path().join("swatch.json"), &BuildOptions { now: at(1), ..Default::default() })?;

        assert!(report.written);
        assert_eq!(report.registry.name, "ui");
        assert_eq!(report.registry.version, "0.1.0");
        assert_eq!(report.registry.components[0].source_path, "src/components/Button.tsx");
        assert_eq!(report.registry.tokens.len(), 2);
        assert!(
            tmp.path()
                .join("out/registry.json")
                .is_file()
        );
        Ok(())
    }

    #[test]
    fn rerun_is_byte_identical() -> Result<()>
    {
        let tmp = project(CONFIG)?;
        let config = tmp.path().join("swatch.json");
        build(&config, &BuildOptions { now: at(1), ..Default::default() })?;
        let first = fs::read(tmp.path().join("out/registry.json"))?;

        let again = build(&config, &BuildOptions { now: at(2), ..Default::default() })?;
        assert!(!again.written);
        assert_eq!(again.registry.generated_at, at(1));
        assert_eq!(fs::read(tmp.path().join("out/registry.json"))?, first);

        fs::write(tmp.path().join("src/styles/more.css"), ":root { --radius-md: 6px; }")?;
        let changed = build(&config, &BuildOptions { now: at(3), ..Default::default() })?;
        assert!(changed.written);
        assert_eq!(changed.registry.generated_at, at(3));
        Ok(())
    }

    #[test]
    fn dry_run_never_writes() -> Result<()>
    {
        let tmp = project(CONFIG)?;
        let report = build(&tmp.path().join("swatch.json"), &BuildOptions { dry_run: true, ..Default::default() })?;
        assert!(!report.written);
        assert!(
            !tmp.path()
                .join("out/registry.json")
                .exists()
        );
        Ok(())
    }

    #[test]
    fn legacy_components_key_warns() -> Result<()>
    {
        let tmp = project(r#"{"components": "./src/components", "tokens": "./src/styles", "output": "./r.json"}"#)?;
        let report = build(&tmp.path().join("swatch.json"), &BuildOptions::default())?;
        assert!(
            report
                .warnings
                .iter()
                .any(|w| w.kind == WarningKind::LegacyConfig)
        );
        assert_eq!(report.registry.components.len(), 1);
        Ok(())
    }

    #[test]
    fn config_errors_stop_before_extraction() -> Result<()>
    {
        let tmp = project(r#"{"componentSource": "./nope", "tokens": "./src/styles", "output": "./r.json"}"#)?;
        let err = build(&tmp.path().join("swatch.json"), &BuildOptions::default()).unwrap_err();
        assert_eq!(err.exit_code(), 3);

        let missing = build(&tmp.path().join("absent.json"), &BuildOptions::default()).unwrap_err();
        assert!(matches!(missing, RegistryError::Config { .. }));
        Ok(())
    }
}
