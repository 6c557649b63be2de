//! Read-only lookups over a loaded registry.

use serde::Serialize;
use tabled::Tabled;

use crate::core::error::{RegistryError, RegistryResult};
use crate::core::model::{ComponentDescriptor, ExportKind, Registry, Resolution};

/// One row of `swatch list`
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSummary
{
    #[tabled(rename = "component")]
    pub name: String,

    #[tabled(rename = "source")]
    pub source_path: String,

    pub export: ExportKind,

    pub props: usize,
    pub tokens: usize,

    pub resolution: Resolution,
}

impl From<&ComponentDescriptor> for ComponentSummary
{
    fn from(c: &ComponentDescriptor) -> Self
    {
        Self {
            name: c
                .name
                .clone(),
            source_path: c
                .source_path
                .clone(),
            export: c.export,
            props: c
                .props
                .len(),
            tokens: c
                .tokens_used
                .len(),
            resolution: c.resolution,
        }
    }
}

/// Summaries in registry order; `filter` keeps names containing it (case-insensitive)
pub fn summaries(
    registry: &Registry,
    filter: Option<&str>,
) -> Vec<ComponentSummary>
{
    let needle = filter.map(str::to_lowercase);
    registry
        .components
        .iter()
        .filter(|c| {
            needle
                .as_deref()
                .is_none_or(|n| {
                    c.name
                        .to_lowercase()
                        .contains(n)
                })
        })
        .map(ComponentSummary::from)
        .collect()
}

/// Full descriptor for `name`
pub fn component<'r>(
    registry: &'r Registry,
    name: &str,
) -> RegistryResult<&'r ComponentDescriptor>
{
    registry
        .component(name)
        .ok_or_else(|| {
            let mut known: Vec<&str> = registry
                .components
                .iter()
                .filter(|c| {
                    c.name
                        .eq_ignore_ascii_case(name)
                })
                .map(|c| c.name.as_str())
                .collect();
            known.truncate(3);
            if known.is_empty()
            {
                RegistryError::input(format!("no component named `{name}`"))
            }
            else
            {
                RegistryError::input(format!("no component named `{name}` (did you mean {}?)", known.join(", ")))
            }
        })
}

#[cfg(test)]
mod tests
{
    use chrono::Utc;

    use super::*;

    fn registry() -> Registry
    {
        let c = |name: &str, resolution| ComponentDescriptor {
            name: name.into(),
            source_path: format!("ui/{name}.tsx"),
            export: ExportKind::Named,
            props: vec![],
            examples: vec![],
            doc: None,
            tokens_used: vec!["color.ink".into()],
            resolution,
        };
        Registry {
            name: "ui".into(),
            version: "1".into(),
            components: vec![c("Button", Resolution::Direct), c("IconButton", Resolution::Barrel)],
            tokens: vec![],
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn filter_is_case_insensitive()
    {
        let reg = registry();
        let all = summaries(&reg, None);
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].tokens, 1);

        let hits = summaries(&reg, Some("icon"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "IconButton");
    }

    #[test]
    fn lookup_suggests_case_mismatch()
    {
        let reg = registry();
        assert_eq!(
            component(&reg, "Button")
                .map(|c| c.source_path.as_str())
                .ok(),
            Some("ui/Button.tsx")
        );

        let err = component(&reg, "button").unwrap_err();
        assert!(
            err.to_string()
                .contains("did you mean Button?")
        );
        assert_eq!(err.exit_code(), 1);
    }
}
