//! Structured registry patches: pointer resolution, application, diffing.
//!
//! Paths are JSON Pointers with one extension: an array segment may name an
//! element by its identity key (`name`, or `category.name` for tokens)
//! instead of its index, e.g. `/components/Button/props/size`.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::error::PatchApplyError;
use crate::core::model::present;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Add,
    Remove,
    Replace,
}

impl OpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::Add => "add",
            OpKind::Remove => "remove",
            OpKind::Replace => "replace",
        }
    }
}

/// One patch operation; `value` is required for add/replace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOp {
    pub op: OpKind,
    pub path: String,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<Value>,
}

impl PatchOp {
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self { op: OpKind::Add, path: path.into(), value: Some(value) }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self { op: OpKind::Remove, path: path.into(), value: None }
    }

    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self { op: OpKind::Replace, path: path.into(), value: Some(value) }
    }
}

/// Ordered operations, applied first to last
pub type Patch = Vec<PatchOp>;

/// Decode a patch document, reporting the first malformed operation by index.
pub fn parse_patch(doc: &Value) -> Result<Patch, PatchApplyError> {
    let Some(items) = doc.as_array() else {
        return Err(PatchApplyError::Malformed {
            index: 0,
            op: "?",
            path: String::new(),
            reason: "a patch must be a JSON array of operations".into(),
        });
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| parse_op(index, item))
        .collect()
}

fn parse_op(index: usize, item: &Value) -> Result<PatchOp, PatchApplyError> {
    let path = item
        .get("path")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let malformed = |op: &'static str, reason: &str| PatchApplyError::Malformed {
        index,
        op,
        path: path.clone(),
        reason: reason.to_string(),
    };

    let op = match item.get("op").and_then(Value::as_str) {
        Some("add") => OpKind::Add,
        Some("remove") => OpKind::Remove,
        Some("replace") => OpKind::Replace,
        Some(_) => return Err(malformed("?", "op must be add, remove or replace")),
        None => return Err(malformed("?", "missing `op`")),
    };

    if item.get("path").and_then(Value::as_str).is_none() {
        return Err(malformed(op.as_str(), "missing string `path`"));
    }
    if !path.is_empty() && !path.starts_with('/') {
        return Err(malformed(op.as_str(), "path must be empty or start with `/`"));
    }

    let value = item.get("value").cloned();
    if op != OpKind::Remove && value.is_none() {
        return Err(malformed(op.as_str(), "missing `value`"));
    }

    Ok(PatchOp { op, path, value })
}

fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn segments(path: &str) -> Vec<String> {
    if path.is_empty() {
        return Vec::new();
    }
    path.split('/').skip(1).map(unescape).collect()
}

/// Identity key of an array element: `category.name`, else `name`
pub fn identity(elem: &Value) -> Option<String> {
    let name = elem.get("name")?.as_str()?;
    match elem.get("category").and_then(Value::as_str) {
        Some(category) => Some(format!("{category}.{name}")),
        None => Some(name.to_string()),
    }
}

fn parse_index(segment: &str) -> Option<usize> {
    let canonical = segment == "0" || (!segment.starts_with('0') && !segment.is_empty());
    if canonical && segment.bytes().all(|b| b.is_ascii_digit()) {
        segment.parse().ok()
    } else {
        None
    }
}

/// Position of an existing element named by index or identity key
fn locate(items: &[Value], segment: &str) -> Option<usize> {
    match parse_index(segment) {
        Some(i) if i < items.len() => Some(i),
        Some(_) => None,
        None => items
            .iter()
            .position(|e| identity(e).as_deref() == Some(segment)),
    }
}

fn child_mut<'v>(node: &'v mut Value, segment: &str) -> Option<&'v mut Value> {
    match node {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => {
            let i = locate(items, segment)?;
            items.get_mut(i)
        }
        _ => None,
    }
}

/// Apply `patch` to a copy of `doc`; all-or-nothing.
pub fn apply(doc: &Value, patch: &[PatchOp]) -> Result<Value, PatchApplyError> {
    let mut out = doc.clone();
    for (index, op) in patch.iter().enumerate() {
        apply_op(&mut out, index, op)?;
    }
    Ok(out)
}

fn apply_op(doc: &mut Value, index: usize, op: &PatchOp) -> Result<(), PatchApplyError> {
    let name = op.op.as_str();
    let not_found = || PatchApplyError::PathNotFound {
        index,
        op: name,
        path: op.path.clone(),
    };
    let malformed = |reason: &str| PatchApplyError::Malformed {
        index,
        op: name,
        path: op.path.clone(),
        reason: reason.to_string(),
    };

    let value = || op.value.clone().ok_or_else(|| malformed("missing `value`"));

    let mut segs = segments(&op.path);
    let Some(last) = segs.pop() else {
        // Whole-document operations
        return match op.op {
            OpKind::Remove => Err(malformed("cannot remove the document root")),
            OpKind::Add | OpKind::Replace => {
                *doc = value()?;
                Ok(())
            }
        };
    };

    let mut parent = doc;
    for seg in &segs {
        parent = child_mut(parent, seg).ok_or_else(not_found)?;
    }

    match parent {
        Value::Object(map) => match op.op {
            OpKind::Add => {
                map.insert(last, value()?);
            }
            OpKind::Replace => {
                let slot = map.get_mut(&last).ok_or_else(not_found)?;
                *slot = value()?;
            }
            OpKind::Remove => {
                map.remove(&last).ok_or_else(not_found)?;
            }
        },
        Value::Array(items) => match op.op {
            OpKind::Add => {
                let at = if last == "-" {
                    items.len()
                } else {
                    match parse_index(&last) {
                        Some(i) if i <= items.len() => i,
                        Some(_) => return Err(not_found()),
                        None => {
                            return Err(malformed("add into an array needs an index or `-`"));
                        }
                    }
                };
                items.insert(at, value()?);
            }
            OpKind::Replace => {
                let i = locate(items, &last).ok_or_else(not_found)?;
                items[i] = value()?;
            }
            OpKind::Remove => {
                let i = locate(items, &last).ok_or_else(not_found)?;
                items.remove(i);
            }
        },
        _ => return Err(not_found()),
    }

    Ok(())
}

/// Operations that turn `from` into `to`.
///
/// Arrays whose elements all carry unique identity keys, and whose shared
/// elements keep their relative order, are diffed by key; others by index.
pub fn diff(from: &Value, to: &Value) -> Patch {
    let mut out = Vec::new();
    diff_into("", from, to, &mut out);
    out
}

fn diff_into(path: &str, from: &Value, to: &Value, out: &mut Patch) {
    if from == to {
        return;
    }

    match (from, to) {
        (Value::Object(a), Value::Object(b)) => diff_objects(path, a, b, out),
        (Value::Array(a), Value::Array(b)) => match keyed(a).zip(keyed(b)) {
            Some((ka, kb)) if same_relative_order(&ka, &kb) => diff_keyed(path, a, b, &ka, &kb, out),
            _ => diff_indexed(path, a, b, out),
        },
        _ => out.push(PatchOp::replace(path, to.clone())),
    }
}

fn diff_objects(path: &str, a: &Map<String, Value>, b: &Map<String, Value>, out: &mut Patch) {
    for key in a.keys().filter(|k| !b.contains_key(*k)) {
        out.push(PatchOp::remove(format!("{path}/{}", escape(key))));
    }
    for (key, av) in a {
        if let Some(bv) = b.get(key) {
            diff_into(&format!("{path}/{}", escape(key)), av, bv, out);
        }
    }
    for (key, bv) in b.iter().filter(|(k, _)| !a.contains_key(*k)) {
        out.push(PatchOp::add(format!("{path}/{}", escape(key)), bv.clone()));
    }
}

/// Identity keys when every element has one, all unique and not index-like
fn keyed(items: &[Value]) -> Option<Vec<String>> {
    if items.is_empty() {
        return Some(Vec::new());
    }
    let keys: Vec<String> = items.iter().map(identity).collect::<Option<_>>()?;
    let mut seen = HashSet::new();
    let usable = keys
        .iter()
        .all(|k| parse_index(k).is_none() && k != "-" && !k.is_empty() && seen.insert(k.as_str()));
    usable.then_some(keys)
}

fn same_relative_order(a: &[String], b: &[String]) -> bool {
    let in_b: HashSet<&str> = b.iter().map(String::as_str).collect();
    let in_a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let common_a = a.iter().filter(|k| in_b.contains(k.as_str()));
    let common_b = b.iter().filter(|k| in_a.contains(k.as_str()));
    common_a.eq(common_b)
}

fn diff_keyed(path: &str, a: &[Value], b: &[Value], ka: &[String], kb: &[String], out: &mut Patch) {
    let b_pos: HashMap<&str, usize> = kb.iter().enumerate().map(|(i, k)| (k.as_str(), i)).collect();
    let a_keys: HashSet<&str> = ka.iter().map(String::as_str).collect();

    for key in ka.iter().filter(|k| !b_pos.contains_key(k.as_str())) {
        out.push(PatchOp::remove(format!("{path}/{}", escape(key))));
    }

    for (i, key) in ka.iter().enumerate() {
        if let Some(&j) = b_pos.get(key.as_str()) {
            diff_into(&format!("{path}/{}", escape(key)), &a[i], &b[j], out);
        }
    }

    // Ascending inserts land every new element at its final index
    for (j, key) in kb.iter().enumerate() {
        if !a_keys.contains(key.as_str()) {
            out.push(PatchOp::add(format!("{path}/{j}"), b[j].clone()));
        }
    }
}

fn diff_indexed(path: &str, a: &[Value], b: &[Value], out: &mut Patch) {
    let shared = a.len().min(b.len());
    for i in 0..shared {
        diff_into(&format!("{path}/{i}"), &a[i], &b[i], out);
    }
    for i in (shared..a.len()).rev() {
        out.push(PatchOp::remove(format!("{path}/{i}")));
    }
    for (i, v) in b.iter().enumerate().skip(shared) {
        out.push(PatchOp::add(format!("{path}/{i}"), v.clone()));
    }
}
