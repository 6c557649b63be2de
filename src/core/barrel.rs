//! Filepath: src/core/barrel.rs
//! Re-export ("barrel") chain resolution.
//!
//! Chains are walked with an explicit stack over an arena of visits, so a
//! deep or cyclic chain can never overflow the call stack. Each visit keeps
//! its parent index, so a cycle is a revisit of a file on the current branch;
//! files reached again through a sibling branch are simply not re-expanded.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::core::extract::{Adaptor, ReExport};
use crate::core::model::{ComponentDescriptor, ExportKind, Resolution};
use crate::infra::io::read_file_smart;
use crate::infra::utils::CaseUtils;
use crate::parsers::ecma::stem_name;

/// Probe order for extensionless specifiers
pub const RESOLVE_EXTENSIONS: &[&str] = &["tsx", "ts", "jsx", "js", "mts", "mjs", "cts", "cjs"];

/// Result of following one barrel file
#[derive(Debug)]
pub enum BarrelOutcome
{
    /// First component reached; `defining` is the file that declares it
    Found
    {
        descriptor: ComponentDescriptor,
        defining: PathBuf,
    },

    /// Nothing found and at least one branch was cut short
    Truncated(Resolution),

    /// Nothing found
    Empty,
}

struct Visit
{
    path: PathBuf,
    identity: PathBuf,
    depth: usize,
    parent: Option<usize>,
}

pub struct BarrelResolver<'a>
{
    adaptors: &'a [Box<dyn Adaptor>],
    max_depth: usize,
}

/// Resolve `.`/`..` without touching the filesystem
pub fn normalize(path: &Path) -> PathBuf
{
    let mut out = PathBuf::new();
    for c in path.components()
    {
        match c
        {
            Component::CurDir =>
            {}
            Component::ParentDir =>
            {
                if !out.pop()
                {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn canonical(path: &Path) -> PathBuf
{
    dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn with_suffix(
    base: &Path,
    ext: &str,
) -> PathBuf
{
    let mut s = base
        .as_os_str()
        .to_owned();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

/// File a relative specifier points at; None for bare (package) specifiers
pub fn resolve_specifier(
    from_file: &Path,
    specifier: &str,
) -> Option<PathBuf>
{
    let relative = specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier == "."
        || specifier == "..";
    if !relative
    {
        return None;
    }

    let base = normalize(
        &from_file
            .parent()?
            .join(specifier),
    );

    if base.is_file()
    {
        return Some(base);
    }

    // ESM style `./Button.js` naming a TypeScript source
    if let Some(ext) = base
        .extension()
        .and_then(|e| e.to_str())
        && matches!(ext, "js" | "jsx" | "mjs" | "cjs")
    {
        for alt in ["ts", "tsx", "mts", "cts"]
        {
            let candidate = base.with_extension(alt);
            if candidate.is_file()
            {
                return Some(candidate);
            }
        }
    }

    RESOLVE_EXTENSIONS
        .iter()
        .map(|ext| with_suffix(&base, ext))
        .chain(
            RESOLVE_EXTENSIONS
                .iter()
                .map(|ext| base.join(format!("index.{ext}"))),
        )
        .find(|c| c.is_file())
}

impl<'a> BarrelResolver<'a>
{
    pub fn new(
        adaptors: &'a [Box<dyn Adaptor>],
        max_depth: usize,
    ) -> Self
    {
        Self { adaptors, max_depth }
    }

    /// Follow `targets` (the re-exports of `entry`) until a component is found.
    pub fn resolve(
        &self,
        entry: &Path,
        targets: &[ReExport],
    ) -> BarrelOutcome
    {
        let identity = canonical(entry);
        let mut arena = vec![Visit { path: entry.to_path_buf(), identity: identity.clone(), depth: 0, parent: None }];
        let mut visited: HashSet<PathBuf> = HashSet::from([identity]);
        let mut stack: Vec<usize> = Vec::new();
        let mut truncated: Option<Resolution> = None;

        self.expand(0, targets, &mut arena, &mut visited, &mut stack, &mut truncated);

        while let Some(idx) = stack.pop()
        {
            let path = arena[idx]
                .path
                .clone();

            let content = match read_file_smart(&path)
            {
                Ok(c) => c,
                Err(e) =>
                {
                    debug!(file = %path.display(), error = %e, "barrel target unreadable");
                    continue;
                }
            };
            let content = content.as_ref();

            let mut next: Option<Vec<ReExport>> = None;
            for adaptor in self
                .adaptors
                .iter()
                .filter(|a| a.handles(&path))
            {
                match adaptor.try_extract(&path, content)
                {
                    Ok(Some(mut descriptor)) =>
                    {
                        descriptor.resolution = Resolution::Barrel;
                        debug!(chain = %chain(&arena, idx), component = %descriptor.name, "barrel resolved");
                        return BarrelOutcome::Found { descriptor, defining: path };
                    }
                    Ok(None) =>
                    {
                        if let Ok(Some(t)) = adaptor.barrel_targets(&path, content)
                        {
                            next = Some(t);
                            break;
                        }
                    }
                    Err(e) =>
                    {
                        debug!(error = %e, "barrel target unparseable");
                        break;
                    }
                }
            }

            if let Some(t) = next
            {
                self.expand(idx, &t, &mut arena, &mut visited, &mut stack, &mut truncated);
            }
        }

        match truncated
        {
            Some(res) => BarrelOutcome::Truncated(res),
            None => BarrelOutcome::Empty,
        }
    }

    fn expand(
        &self,
        parent: usize,
        targets: &[ReExport],
        arena: &mut Vec<Visit>,
        visited: &mut HashSet<PathBuf>,
        stack: &mut Vec<usize>,
        truncated: &mut Option<Resolution>,
    )
    {
        let depth = arena[parent].depth + 1;
        let from = arena[parent]
            .path
            .clone();

        let children: Vec<PathBuf> = targets
            .iter()
            .filter_map(|t| resolve_specifier(&from, &t.specifier))
            .collect();

        if children.is_empty()
        {
            return;
        }

        if depth > self.max_depth
        {
            debug!(chain = %chain(arena, parent), "barrel depth limit reached");
            truncated.get_or_insert(Resolution::DepthTruncated);
            return;
        }

        // Reversed so the first specifier is explored first
        for child in children
            .into_iter()
            .rev()
        {
            let identity = canonical(&child);
            if on_branch(arena, parent, &identity)
            {
                debug!(chain = %chain(arena, parent), revisit = %child.display(), "barrel cycle");
                truncated.get_or_insert(Resolution::CycleTruncated);
                continue;
            }
            // Reached before along another branch (a diamond): already expanded or queued
            if !visited.insert(identity.clone())
            {
                continue;
            }
            arena.push(Visit { path: child, identity, depth, parent: Some(parent) });
            stack.push(arena.len() - 1);
        }
    }
}

/// Whether `identity` is `idx` or one of its ancestors
fn on_branch(
    arena: &[Visit],
    idx: usize,
    identity: &Path,
) -> bool
{
    let mut cursor = Some(idx);
    while let Some(i) = cursor
    {
        if arena[i].identity == identity
        {
            return true;
        }
        cursor = arena[i].parent;
    }
    false
}

fn chain(
    arena: &[Visit],
    mut idx: usize,
) -> String
{
    let mut parts = vec![
        arena[idx]
            .path
            .display()
            .to_string(),
    ];
    while let Some(parent) = arena[idx].parent
    {
        parts.push(
            arena[parent]
                .path
                .display()
                .to_string(),
        );
        idx = parent;
    }
    parts.reverse();
    parts.join(" -> ")
}

/// Placeholder for a barrel whose chain was cut short before any component.
/// Named after the first explicitly re-exported symbol, else the first target's stem.
pub fn truncated_descriptor(
    entry: &Path,
    targets: &[ReExport],
    resolution: Resolution,
) -> ComponentDescriptor
{
    let named = targets
        .iter()
        .flat_map(|t| t.names.iter())
        .find(|n| n.as_str() != "default" && CaseUtils::is_component_name(n))
        .cloned();

    let from_specifier = || {
        targets
            .first()
            .map(|t| {
                let segments: Vec<&str> = t
                    .specifier
                    .split('/')
                    .filter(|s| !s.is_empty() && *s != "." && *s != "..")
                    .collect();
                let stem = match segments.as_slice()
                {
                    [.., parent, "index"] => *parent,
                    [.., last] => last
                        .split('.')
                        .next()
                        .unwrap_or(*last),
                    [] => "",
                };
                CaseUtils::pascal(stem)
            })
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| stem_name(entry))
    };

    ComponentDescriptor {
        name: named.unwrap_or_else(from_specifier),
        source_path: entry
            .to_string_lossy()
            .replace('\\', "/"),
        export: ExportKind::Named,
        props: Vec::new(),
        examples: Vec::new(),
        doc: None,
        tokens_used: Vec::new(),
        resolution,
    }
}
