//! Error taxonomy for the registry pipeline.
//!
//! Fatal problems surface as [`RegistryError`]; per-file problems surface as
//! [`AdaptorError`] and are downgraded to [`Warning`]s by the engine.

use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Typed reasons an operation aborted without touching durable state
#[derive(Debug, Error, Diagnostic)]
pub enum RegistryError
{
    #[error("config error: {message}")]
    #[diagnostic(code(swatch::config), help("check the config file against schemas/config.schema.json"))]
    Config
    {
        message: String
    },

    #[error("registry failed validation:\n  {}", .problems.join("\n  "))]
    #[diagnostic(code(swatch::validation))]
    Validation
    {
        problems: Vec<String>
    },

    #[error(transparent)]
    #[diagnostic(code(swatch::patch))]
    PatchApply(#[from] PatchApplyError),

    #[error("precondition failed: {message}")]
    #[diagnostic(code(swatch::precondition), help("re-run with --force to apply anyway"))]
    Precondition
    {
        message: String
    },

    #[error("invalid input: {message}")]
    #[diagnostic(code(swatch::input))]
    Input
    {
        message: String
    },

    #[error(transparent)]
    #[diagnostic(code(swatch::tokens))]
    TokenImport(#[from] TokenImportError),

    #[error("I/O error on {}: {source}", .path.display())]
    #[diagnostic(code(swatch::io))]
    Io
    {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not lock {}: {source}", .path.display())]
    #[diagnostic(code(swatch::lock))]
    Lock
    {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RegistryError
{
    pub fn config(message: impl Into<String>) -> Self
    {
        RegistryError::Config { message: message.into() }
    }

    pub fn input(message: impl Into<String>) -> Self
    {
        RegistryError::Input { message: message.into() }
    }

    pub fn io(
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self
    {
        RegistryError::Io { path: path.into(), source }
    }

    /// Process exit code for the CLI boundary
    pub fn exit_code(&self) -> i32
    {
        match self
        {
            RegistryError::PatchApply(_) => 2,
            RegistryError::Config { .. } => 3,
            RegistryError::Validation { .. } => 4,
            RegistryError::Io { .. } | RegistryError::Lock { .. } => 5,
            RegistryError::Precondition { .. } => 6,
            RegistryError::Input { .. } | RegistryError::TokenImport(_) => 1,
        }
    }
}

/// A patch operation that cannot be applied to the current document
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatchApplyError
{
    #[error("op #{index} ({op} {path}): path does not resolve")]
    PathNotFound
    {
        index: usize,
        op: &'static str,
        path: String,
    },

    #[error("op #{index} ({op} {path}): {reason}")]
    Malformed
    {
        index: usize,
        op: &'static str,
        path: String,
        reason: String,
    },
}

/// Token exchange document that cannot be mapped back to tokens
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenImportError
{
    #[error("token document root must be an object")]
    NotAnObject,

    #[error("token `{path}` has unsupported $type `{ty}`")]
    UnknownType
    {
        path: String,
        ty: String,
    },

    #[error("token `{path}` is missing a string $value")]
    MissingValue
    {
        path: String
    },

    #[error("token `{path}` has no name below its category")]
    MissingName
    {
        path: String
    },
}

/// Single-file failure inside an adaptor; never aborts a batch
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdaptorError
{
    #[error("{path}: unparseable ({reason})")]
    Unparseable
    {
        path: String,
        reason: String,
    },
}

/// Recoverable problem reported alongside a successful result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning
{
    pub kind: WarningKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WarningKind
{
    LegacyConfig,
    Unreadable,
    Unparseable,
    NameCollision,
    BarrelTruncated,
    TokenOverride,
    BackupFailed,
    AuditFailed,
    UncheckedRollback,
}

impl Warning
{
    /// Build and log in one step
    pub fn new(
        kind: WarningKind,
        message: impl Into<String>,
    ) -> Self
    {
        let message = message.into();
        tracing::warn!(kind = ?kind, "{message}");
        Warning { kind, message }
    }
}

impl fmt::Display for Warning
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        write!(f, "{}", self.message)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn exit_codes_follow_the_taxonomy()
    {
        let patch = RegistryError::from(PatchApplyError::PathNotFound {
            index: 0,
            op: "remove",
            path: "/components/Nope".into(),
        });
        assert_eq!(patch.exit_code(), 2);
        assert_eq!(RegistryError::config("x").exit_code(), 3);
        assert_eq!(RegistryError::Validation { problems: vec![] }.exit_code(), 4);
        assert_eq!(
            RegistryError::io("r.json", std::io::Error::other("disk")).exit_code(),
            5
        );
        assert_eq!(RegistryError::Precondition { message: "m".into() }.exit_code(), 6);
    }

    #[test]
    fn patch_error_names_the_path()
    {
        let err = PatchApplyError::PathNotFound {
            index: 2,
            op: "remove",
            path: "/components/Ghost".into(),
        };
        assert_eq!(err.to_string(), "op #2 (remove /components/Ghost): path does not resolve");
    }
}
