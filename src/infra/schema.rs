//! Embedded JSON schemas for the config and registry documents.

use jsonschema::Validator;
use serde_json::Value;

use crate::core::error::{RegistryError, RegistryResult};

const CONFIG_SCHEMA: &str = include_str!("../../schemas/config.schema.json");
const REGISTRY_SCHEMA: &str = include_str!("../../schemas/registry.schema.json");

/// Compiled validators, built once per operation and passed by reference
pub struct SchemaSet
{
    config: Validator,
    registry: Validator,
}

fn compile(
    label: &str,
    text: &str,
) -> RegistryResult<Validator>
{
    let schema: Value = serde_json::from_str(text)
        .map_err(|e| RegistryError::Validation { problems: vec![format!("{label} schema is not JSON: {e}")] })?;

    jsonschema::validator_for(&schema)
        .map_err(|e| RegistryError::Validation { problems: vec![format!("invalid {label} schema: {e}")] })
}

fn messages(
    validator: &Validator,
    doc: &Value,
) -> Vec<String>
{
    validator
        .iter_errors(doc)
        .map(|e| {
            let at = e
                .instance_path
                .to_string();
            let at = if at.is_empty() { "/".to_string() } else { at };
            format!("{at}: {e}")
        })
        .collect()
}

impl SchemaSet
{
    pub fn new() -> RegistryResult<Self>
    {
        Ok(Self { config: compile("config", CONFIG_SCHEMA)?, registry: compile("registry", REGISTRY_SCHEMA)? })
    }

    /// Schema problems in a raw config object (empty when valid)
    pub fn config_errors(
        &self,
        doc: &Value,
    ) -> Vec<String>
    {
        messages(&self.config, doc)
    }

    /// Schema problems in a registry document (empty when valid)
    pub fn registry_errors(
        &self,
        doc: &Value,
    ) -> Vec<String>
    {
        messages(&self.registry, doc)
    }
}
