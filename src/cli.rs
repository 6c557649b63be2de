use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use owo_colors::{OwoColorize, Style};
use std::fmt::Display;
use std::path::{Path, PathBuf};

use crate::infra::config::load_config;
use crate::infra::schema::SchemaSet;
use crate::infra::settings::Settings;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
    pub verbose: u8,    // global -v / -vv
    pub settings: Settings,
}

impl AppContext {
    /// Config file from the flag, else the settings default
    pub fn config_path(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .unwrap_or_else(|| self.settings.config_file.clone())
    }

    /// `text` with `style` applied unless --no-color
    pub fn paint(&self, text: impl Display, style: Style) -> String {
        if self.no_color {
            text.to_string()
        } else {
            text.style(style).to_string()
        }
    }
}

#[derive(Parser)]
#[command(name = "swatch")]
#[command(about = "Extract component interfaces and design tokens into a checked-in registry")]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Show what would be done without writing anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract components and tokens into the registry
    Build(BuildArgs),

    /// Build into a scratch directory and diff against the checked-in registry
    Preview(PreviewArgs),

    /// Apply a JSON patch to the registry
    Mutate(MutateArgs),

    /// Apply an undo record written by `mutate`
    Rollback(RollbackArgs),

    /// Convert tokens to and from the exchange format
    #[command(subcommand)]
    Tokens(TokensCommand),

    /// Report which tokens components actually use
    Coverage(CoverageArgs),

    /// List registered components
    List(ListArgs),

    /// Show one component in full
    Show(ShowArgs),

    /// Initialize swatch.json and swatch.toml
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Where the registry lives: explicit file, or the config's `output`
#[derive(Args, Debug, Clone)]
pub struct RegistryArgs {
    /// Registry file (defaults to the config's output)
    #[arg(short, long)]
    pub registry: Option<PathBuf>,

    /// Registry config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl RegistryArgs {
    pub fn resolve(&self, ctx: &AppContext) -> Result<PathBuf> {
        if let Some(path) = &self.registry {
            return Ok(path.clone());
        }
        let config = ctx.config_path(self.config.as_deref());
        let schemas = SchemaSet::new()?;
        let (cfg, _) = load_config(&config, &schemas)
            .with_context(|| format!("locate registry via {}", config.display()))?;
        Ok(cfg.output)
    }
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Table,
}

#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Registry config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the registry here instead of the configured output
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the built registry as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct PreviewArgs {
    /// Registry config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Keep the candidate registry at this path
    #[arg(long)]
    pub keep: Option<PathBuf>,

    /// Print the structural patch as JSON instead of a line diff
    #[arg(long)]
    pub json: bool,

    /// Exit with status 1 when the registry is out of date
    #[arg(long)]
    pub check: bool,
}

#[derive(Parser, Debug)]
pub struct MutateArgs {
    /// JSON patch file (array of add/remove/replace operations)
    pub patch: PathBuf,

    #[command(flatten)]
    pub target: RegistryArgs,

    /// Undo record location (defaults under the state directory)
    #[arg(long)]
    pub undo: Option<PathBuf>,

    /// Skip writing an undo record
    #[arg(long, conflicts_with = "undo")]
    pub no_undo: bool,

    /// Skip the pre-mutation backup
    #[arg(long)]
    pub no_backup: bool,
}

#[derive(Parser, Debug)]
pub struct RollbackArgs {
    /// Undo record written by `mutate`
    pub undo: PathBuf,

    #[command(flatten)]
    pub target: RegistryArgs,

    /// Apply even if the registry changed since the mutation
    #[arg(long)]
    pub force: bool,

    /// Skip the pre-rollback backup
    #[arg(long)]
    pub no_backup: bool,
}

#[derive(Subcommand, Debug)]
pub enum TokensCommand {
    /// Write the registry's tokens as an exchange document
    Export(TokensExportArgs),

    /// Read an exchange document and emit stylesheet variables
    Import(TokensImportArgs),
}

#[derive(Parser, Debug)]
pub struct TokensExportArgs {
    #[command(flatten)]
    pub target: RegistryArgs,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct TokensImportArgs {
    /// Exchange document to read
    pub input: PathBuf,

    /// Output stylesheet (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the decoded tokens as JSON instead of CSS
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct CoverageArgs {
    #[command(flatten)]
    pub target: RegistryArgs,

    /// Measure against this exchange document instead of the registry's tokens
    #[arg(long)]
    pub tokens: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Fail (exit 1) when coverage is below this percent
    #[arg(long)]
    pub min: Option<f64>,
}

#[derive(Parser, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub target: RegistryArgs,

    /// Only names containing this text (case-insensitive)
    pub filter: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Component name
    pub name: String,

    #[command(flatten)]
    pub target: RegistryArgs,

    /// Print the descriptor as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config files
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; if omitted and --stdout not set, prints error
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
