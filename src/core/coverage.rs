//! Token usage coverage over a registry.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;

use crate::core::model::Registry;
use crate::core::tokens::export_tokens;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport
{
    pub total: usize,
    pub used: usize,
    pub unused: usize,

    /// Percent of tokens referenced by at least one component, two decimals
    pub coverage: f64,

    /// Every token key → components referencing it (empty when unused)
    pub usage: BTreeMap<String, Vec<String>>,
    pub unused_tokens: Vec<String>,

    /// Components without a doc description
    pub undocumented: Vec<String>,

    /// Component → referenced keys that are not tokens
    pub unresolved: BTreeMap<String, Vec<String>>,
}

fn round2(x: f64) -> f64
{
    (x * 100.0).round() / 100.0
}

/// Dot keys of every leaf (`$value` node) in an exchange-format token tree
pub fn flatten_keys(tree: &Value) -> BTreeSet<String>
{
    fn walk(
        node: &Value,
        prefix: &mut Vec<String>,
        out: &mut BTreeSet<String>,
    )
    {
        let Some(map) = node.as_object()
        else
        {
            return;
        };

        if map.contains_key("$value")
        {
            if let Some((category, rest)) = prefix.split_first()
                && !rest.is_empty()
            {
                out.insert(format!("{category}.{}", rest.join("-")));
            }
            return;
        }

        for (key, child) in map
            .iter()
            .filter(|(k, _)| !k.starts_with('$'))
        {
            prefix.push(key.clone());
            walk(child, prefix, out);
            prefix.pop();
        }
    }

    let mut out = BTreeSet::new();
    walk(tree, &mut Vec::new(), &mut out);
    out
}

/// Coverage of `registry`'s own tokens
pub fn coverage(registry: &Registry) -> CoverageReport
{
    coverage_against(&export_tokens(&registry.tokens), registry)
}

/// Coverage of an external token tree by `registry`'s components
pub fn coverage_against(
    tree: &Value,
    registry: &Registry,
) -> CoverageReport
{
    let keys = flatten_keys(tree);

    let mut usage: BTreeMap<String, Vec<String>> = keys
        .iter()
        .map(|k| (k.clone(), Vec::new()))
        .collect();
    let mut unresolved: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for component in &registry.components
    {
        for key in &component.tokens_used
        {
            match usage.get_mut(key)
            {
                Some(users) => users.push(
                    component
                        .name
                        .clone(),
                ),
                None => unresolved
                    .entry(
                        component
                            .name
                            .clone(),
                    )
                    .or_default()
                    .push(key.clone()),
            }
        }
    }

    for users in usage.values_mut()
    {
        users.sort();
        users.dedup();
    }

    let unused_tokens: Vec<String> = usage
        .iter()
        .filter(|(_, users)| users.is_empty())
        .map(|(k, _)| k.clone())
        .collect();

    let total = keys.len();
    let unused = unused_tokens.len();
    let used = total - unused;
    let coverage = if total == 0 { 0.0 } else { round2(used as f64 * 100.0 / total as f64) };

    let mut undocumented: Vec<String> = registry
        .components
        .iter()
        .filter(|c| {
            c.doc
                .as_deref()
                .is_none_or(|d| {
                    d.trim()
                        .is_empty()
                })
        })
        .map(|c| {
            c.name
                .clone()
        })
        .collect();
    undocumented.sort();

    CoverageReport { total, used, unused, coverage, usage, unused_tokens, undocumented, unresolved }
}
