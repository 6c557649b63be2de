//! **swatch** - Extract component interfaces and design tokens into a registry
//!
//! Walks a UI component tree with tree-sitter adaptors, parses stylesheet
//! custom properties into typed tokens, and persists both as a schema-checked
//! registry document that can be patched, rolled back, diffed, and audited.

/// Command-line interface with clap integration
pub mod cli;

/// Command handlers translating CLI args into core calls
pub mod cli_ext {
    /// `build` and `preview`
    pub mod build_cmd;

    /// `mutate` and `rollback`
    pub mod mutate_cmd;

    /// `coverage`, `list`, `show`
    pub mod report_cmd;

    /// `tokens export` / `tokens import`
    pub mod tokens_cmd;
}

/// Shell completion generation
pub mod completion;

/// Core pipeline - extraction, tokens, registry assembly and mutation
pub mod core {
    /// Registry data model shared by every stage
    pub mod model;
    pub use model::{ComponentDescriptor, PropDescriptor, Registry, TokenDescriptor, TypeExpr};

    /// Typed error taxonomy and recoverable warnings
    pub mod error;
    pub use error::{AdaptorError, RegistryError, RegistryResult, Warning, WarningKind};

    /// Adaptor contract and the parallel extraction engine
    pub mod extract;
    pub use extract::{Adaptor, Extraction};

    /// Re-export ("barrel") chain resolution with cycle truncation
    pub mod barrel;

    /// Stylesheet variable parsing and exchange-format conversion
    pub mod tokens;

    /// Config → extraction → registry composition
    pub mod build;
    pub use build::{BuildOptions, BuildReport, build};

    /// Registry persistence: read, validate, atomic write
    pub mod store;

    /// JSON patch application and structural diffing
    pub mod patch;
    pub use patch::{Patch, PatchOp};

    /// Locked mutation and rollback with undo records
    pub mod mutate;
    pub use mutate::{mutate, rollback};

    /// Append-only audit trail
    pub mod audit;

    /// Timestamped registry backups
    pub mod backup;

    /// Token usage coverage
    pub mod coverage;

    /// Ephemeral rebuild + diff against the checked-in registry
    pub mod preview;

    /// Read-only registry lookups
    pub mod query;
}

/// Source dialect adaptors (tree-sitter)
pub mod parsers {
    /// Module scanning shared by the ECMAScript dialects
    pub mod ecma;

    /// TypeScript / TSX components with declared prop shapes
    pub mod typescript;
    pub use typescript::TypeScriptAdaptor;

    /// JavaScript / JSX components with propTypes
    pub mod javascript;
    pub use javascript::JavaScriptAdaptor;
}

/// Infrastructure - configuration, I/O, locking, schemas, walking
pub mod infra {
    /// Registry config file: load, migrate, resolve paths
    pub mod config;
    pub use config::{ResolvedConfig, load_config, resolve_path};

    /// Layered tool settings (`swatch.toml`, `SWATCH_*`)
    pub mod settings;
    pub use settings::{Settings, load_settings};

    /// Memory-mapped reads, atomic writes, checksums
    pub mod io;

    /// Per-registry exclusive lock
    pub mod lock;

    /// Embedded JSON schemas
    pub mod schema;
    pub use schema::SchemaSet;

    /// Gitignore-aware directory walking with include/exclude globs
    pub mod walk;
    pub use walk::FileWalker;

    /// Utility functions and helpers for common operations
    pub mod utils;
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli, Commands};
pub use core::{Registry, RegistryError, build, mutate, rollback};
pub use infra::{Settings, load_config, load_settings};
