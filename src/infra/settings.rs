//! Layered tool settings: `swatch.toml` (or `.swatch.toml`) then `SWATCH__*` env.
//!
//! These tune how the tool behaves (state directory, backups, log filter),
//! never what a registry contains; that lives in the JSON config.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings
{
    /// Default registry config file name
    pub config_file: PathBuf,

    /// State directory for backups and the audit log, relative to the registry
    pub state_dir: PathBuf,

    /// Mutation defaults
    pub mutate: MutateSettings,

    /// Log filter used when neither SWATCH_LOG nor RUST_LOG is set
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MutateSettings
{
    pub backup: bool,
    pub write_undo: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings
{
    pub filter: String,
}

impl Default for Settings
{
    fn default() -> Self
    {
        Self {
            config_file: PathBuf::from("swatch.json"),
            state_dir: PathBuf::from(".swatch"),
            mutate: MutateSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for MutateSettings
{
    fn default() -> Self
    {
        Self { backup: true, write_undo: true }
    }
}

impl Default for LoggingSettings
{
    fn default() -> Self
    {
        Self { filter: "swatch=warn".to_string() }
    }
}

impl Settings
{
    /// State directory for `registry`: absolute setting wins, else next to the registry
    pub fn state_dir_for(
        &self,
        registry: &Path,
    ) -> PathBuf
    {
        if self
            .state_dir
            .is_absolute()
        {
            return self
                .state_dir
                .clone();
        }
        registry
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(&self.state_dir)
    }
}

/// Load settings from the first settings file found in `dir`, then env overrides.
pub fn load_settings(dir: &Path) -> Result<Settings>
{
    let mut builder = config::Config::builder();

    let candidates = ["swatch.toml", ".swatch.toml"];

    for name in &candidates
    {
        let path = dir.join(name);
        if path.exists()
        {
            builder = builder.add_source(config::File::from(path));
            break;
        }
    }

    // SWATCH__MUTATE__BACKUP=false style overrides
    builder = builder.add_source(
        config::Environment::with_prefix("SWATCH")
            .prefix_separator("__")
            .separator("__"),
    );

    let cfg = builder
        .build()
        .context("Failed to load settings")?;
    let parsed: Settings = cfg
        .try_deserialize()
        .context("Failed to parse settings")?;

    Ok(parsed)
}

#[cfg(test)]
mod tests
{
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn defaults_without_files() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let s = load_settings(tmp.path())?;
        assert_eq!(s.state_dir, PathBuf::from(".swatch"));
        assert!(s.mutate.backup);
        Ok(())
    }

    #[test]
    fn file_values_override_defaults() -> Result<()>
    {
        let tmp = TempDir::new()?;
        std::fs::write(tmp.path().join("swatch.toml"), "state_dir = \"state\"\n[mutate]\nbackup = false\n")?;
        let s = load_settings(tmp.path())?;
        assert_eq!(s.state_dir, PathBuf::from("state"));
        assert!(!s.mutate.backup);
        assert!(s.mutate.write_undo);
        Ok(())
    }

    #[test]
    fn state_dir_sits_next_to_the_registry()
    {
        let s = Settings::default();
        assert_eq!(s.state_dir_for(Path::new("/p/out/registry.json")), PathBuf::from("/p/out/.swatch"));
    }
}
