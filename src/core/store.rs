//! Filepath: src/core/store.rs
//! Registry persistence: read, validate, serialize, atomic write.

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::core::error::{RegistryError, RegistryResult};
use crate::core::model::Registry;
use crate::infra::io::atomic_write;
use crate::infra::schema::SchemaSet;

/// Raw bytes of a registry file
pub fn read_bytes(path: &Path) -> RegistryResult<Vec<u8>>
{
    std::fs::read(path).map_err(|e| RegistryError::io(path, e))
}

/// Parse bytes as a JSON document; malformed files fail validation
pub fn parse_document(
    bytes: &[u8],
    path: &Path,
) -> RegistryResult<Value>
{
    serde_json::from_slice(bytes).map_err(|e| RegistryError::Validation {
        problems: vec![format!("{} is not valid JSON: {e}", path.display())],
    })
}

/// Schema check, typed decode, then the uniqueness invariants
pub fn validate(
    doc: &Value,
    schemas: &SchemaSet,
) -> RegistryResult<Registry>
{
    let problems = schemas.registry_errors(doc);
    if !problems.is_empty()
    {
        return Err(RegistryError::Validation { problems });
    }

    let registry: Registry = serde_json::from_value(doc.clone())
        .map_err(|e| RegistryError::Validation { problems: vec![format!("/: {e}")] })?;

    let violations = registry.invariant_violations();
    if !violations.is_empty()
    {
        return Err(RegistryError::Validation { problems: violations });
    }

    Ok(registry)
}

/// Read and validate the registry at `path`
pub fn load(
    path: &Path,
    schemas: &SchemaSet,
) -> RegistryResult<Registry>
{
    let bytes = read_bytes(path)?;
    let doc = parse_document(&bytes, path)?;
    validate(&doc, schemas)
}

/// Canonical on-disk form: pretty JSON, trailing newline
pub fn to_bytes(doc: &impl serde::Serialize) -> RegistryResult<Vec<u8>>
{
    let mut bytes = serde_json::to_vec_pretty(doc)
        .map_err(|e| RegistryError::Validation { problems: vec![format!("cannot serialize registry: {e}")] })?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Crash-safe replace of `path`
pub fn write_atomic(
    path: &Path,
    bytes: &[u8],
) -> RegistryResult<()>
{
    atomic_write(path, bytes).map_err(|e| RegistryError::io(path, e))?;
    debug!(path = %path.display(), bytes = bytes.len(), "registry written");
    Ok(())
}
