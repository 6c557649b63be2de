//! Filepath: src/core/preview.rs
//! Rebuild into a throwaway directory and diff against the checked-in registry.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::Value;
use similar::TextDiff;
use tracing::{debug, instrument};

use crate::core::build::{BuildOptions, build_resolved};
use crate::core::error::{RegistryError, RegistryResult, Warning};
use crate::core::model::Registry;
use crate::core::patch::{Patch, diff};
use crate::core::store;
use crate::infra::config::load_config;
use crate::infra::schema::SchemaSet;

#[derive(Debug, Clone)]
pub struct PreviewOptions
{
    pub now: DateTime<Utc>,

    /// Copy the candidate here (atomically) instead of discarding it
    pub keep: Option<PathBuf>,
}

impl Default for PreviewOptions
{
    fn default() -> Self
    {
        Self { now: Utc::now(), keep: None }
    }
}

#[derive(Debug)]
pub struct PreviewReport
{
    pub candidate: Registry,

    /// Checked-in registry path the candidate was compared with
    pub baseline: PathBuf,
    pub baseline_exists: bool,

    /// Structural changes from the checked-in registry to the candidate
    pub changes: Patch,

    /// Line diff of the two files
    pub unified: String,
    pub kept: Option<PathBuf>,
    pub warnings: Vec<Warning>,
}

impl PreviewReport
{
    pub fn is_clean(&self) -> bool
    {
        self.changes
            .is_empty()
    }
}

/// Build the config at `config_path` in isolation and compare.
#[instrument(skip(opts), fields(config = %config_path.display()))]
pub fn preview(
    config_path: &Path,
    opts: &PreviewOptions,
) -> RegistryResult<PreviewReport>
{
    let schemas = SchemaSet::new()?;
    let (cfg, warnings) = load_config(config_path, &schemas)?;

    let sandbox = tempfile::Builder::new()
        .prefix("swatch-preview-")
        .tempdir()
        .map_err(|e| RegistryError::io(std::env::temp_dir(), e))?;
    let file_name = cfg
        .output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "registry.json".into());
    let candidate_path = sandbox
        .path()
        .join(file_name);

    // Seeding the sandbox lets an unchanged tree keep its generatedAt
    let baseline_bytes = std::fs::read(&cfg.output).ok();
    if let Some(bytes) = &baseline_bytes
    {
        std::fs::write(&candidate_path, bytes).map_err(|e| RegistryError::io(&candidate_path, e))?;
    }

    let report = build_resolved(
        &cfg,
        warnings,
        &schemas,
        &BuildOptions { now: opts.now, dry_run: false, output: Some(candidate_path.clone()) },
    )?;

    let candidate_bytes = store::read_bytes(&candidate_path)?;
    let candidate_doc = store::parse_document(&candidate_bytes, &candidate_path)?;

    let baseline_doc = baseline_bytes
        .as_deref()
        .and_then(|b| serde_json::from_slice::<Value>(b).ok())
        .unwrap_or(Value::Null);
    let changes = diff(&baseline_doc, &candidate_doc);

    let old_text = baseline_bytes
        .as_deref()
        .map(String::from_utf8_lossy)
        .unwrap_or_default();
    let new_text = String::from_utf8_lossy(&candidate_bytes);
    let unified = TextDiff::from_lines(old_text.as_ref(), new_text.as_ref())
        .unified_diff()
        .context_radius(3)
        .header("checked-in", "preview")
        .to_string();

    let kept = match &opts.keep
    {
        Some(dest) =>
        {
            store::write_atomic(dest, &candidate_bytes)?;
            Some(dest.clone())
        }
        None => None,
    };

    debug!(changes = changes.len(), sandbox = %sandbox.path().display(), "preview compared");

    Ok(PreviewReport {
        candidate: report.registry,
        baseline: cfg.output,
        baseline_exists: baseline_bytes.is_some(),
        changes,
        unified,
        kept,
        warnings: report.warnings,
    })
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use anyhow::Result;
    use tempfile::TempDir;

    use super::*;
    use crate::core::build::build;

    fn project() -> Result<TempDir>
    {
        let tmp = TempDir::new()?;
        let root = tmp.path();
        fs::create_dir_all(root.join("ui"))?;
        fs::write(
            root.join("swatch.json"),
            r#"{"componentSource": "./ui", "tokens": "./tokens.css", "output": "./registry.json"}"#,
        )?;
        fs::write(root.join("ui/Tag.jsx"), "export const Tag = ({ label }) => label;\n")?;
        fs::write(root.join("tokens.css"), ":root { --color-ink: #111; }\n")?;
        Ok(tmp)
    }

    #[test]
    fn unchanged_tree_is_clean() -> Result<()>
    {
        let tmp = project()?;
        let config = tmp.path().join("swatch.json");
        build(&config, &BuildOptions::default())?;

        let report = preview(&config, &PreviewOptions::default())?;
        assert!(report.is_clean());
        assert!(report.unified.is_empty());
        Ok(())
    }

    #[test]
    fn changes_show_without_touching_the_registry() -> Result<()>
    {
        let tmp = project()?;
        let config = tmp.path().join("swatch.json");
        build(&config, &BuildOptions::default())?;
        let before = fs::read(tmp.path().join("registry.json"))?;

        fs::write(tmp.path().join("ui/Chip.jsx"), "export const Chip = () => null;\n")?;
        let keep = tmp.path().join("candidate.json");
        let report = preview(&config, &PreviewOptions { keep: Some(keep.clone()), ..Default::default() })?;

        assert!(!report.is_clean());
        assert!(report.unified.contains("+      \"name\": \"Chip\""));
        assert_eq!(fs::read(tmp.path().join("registry.json"))?, before);
        assert_eq!(
            store::load(&keep, &SchemaSet::new()?)?
                .components
                .len(),
            2
        );
        Ok(())
    }

    #[test]
    fn missing_baseline_is_one_root_change() -> Result<()>
    {
        let tmp = project()?;
        let report = preview(&tmp.path().join("swatch.json"), &PreviewOptions::default())?;
        assert!(!report.baseline_exists);
        assert_eq!(report.changes.len(), 1);
        assert_eq!(report.changes[0].path, "");
        assert!(
            !tmp.path()
                .join("registry.json")
                .exists()
        );
        Ok(())
    }
}
