//! Filepath: src/core/extract.rs
//! Adaptor contract and the parallel extraction engine.
//!
//! Files are read and parsed in parallel; aggregation runs afterwards over
//! results sorted by path, so output never depends on scheduling or on the
//! order the filesystem lists entries.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::core::barrel::{BarrelOutcome, BarrelResolver, truncated_descriptor};
use crate::core::error::{AdaptorError, RegistryError, RegistryResult, Warning, WarningKind};
use crate::core::model::{ComponentDescriptor, Resolution};
use crate::core::tokens;
use crate::infra::config::{AdaptorKind, ResolvedConfig};
use crate::infra::io::read_file_smart;
use crate::infra::walk::{FileWalker, relative_slash};
use crate::parsers::{JavaScriptAdaptor, TypeScriptAdaptor};

/// Stylesheet suffixes that count as "co-located" with a component file
const COLOCATED_STYLES: &[&str] = &["css", "module.css", "scss", "module.scss", "less"];

/// One `export … from '<specifier>'` statement; empty `names` means `*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReExport
{
    pub specifier: String,
    pub names: Vec<String>,
}

/// Per-dialect component recognizer
pub trait Adaptor: Send + Sync
{
    fn name(&self) -> &'static str;

    /// Whether this adaptor understands `path` (by extension)
    fn handles(
        &self,
        path: &Path,
    ) -> bool;

    /// The component `path` defines, if any. `Err` only for unparseable input.
    fn try_extract(
        &self,
        path: &Path,
        content: &str,
    ) -> Result<Option<ComponentDescriptor>, AdaptorError>;

    /// Re-export targets when the module is a pure barrel
    fn barrel_targets(
        &self,
        _path: &Path,
        _content: &str,
    ) -> Result<Option<Vec<ReExport>>, AdaptorError>
    {
        Ok(None)
    }
}

/// Engine output: components sorted by (sourcePath, name) plus warnings
#[derive(Debug, Default)]
pub struct Extraction
{
    pub components: Vec<ComponentDescriptor>,
    pub warnings: Vec<Warning>,
}

/// Adaptors for `kinds`, in the given priority order
pub fn adaptors_for(kinds: &[AdaptorKind]) -> Vec<Box<dyn Adaptor>>
{
    kinds
        .iter()
        .map(|k| -> Box<dyn Adaptor> {
            match k
            {
                AdaptorKind::TypeScript => Box::new(TypeScriptAdaptor::new()),
                AdaptorKind::JavaScript => Box::new(JavaScriptAdaptor::new()),
            }
        })
        .collect()
}

/// What one file contributed
#[derive(Default)]
struct FileResult
{
    component: Option<ComponentDescriptor>,
    warnings: Vec<Warning>,
}

pub struct ExtractionEngine
{
    adaptors: Vec<Box<dyn Adaptor>>,
    walker: FileWalker,
    barrel_depth: usize,
}

impl ExtractionEngine
{
    pub fn new(
        adaptors: Vec<Box<dyn Adaptor>>,
        walker: FileWalker,
        barrel_depth: usize,
    ) -> Self
    {
        Self { adaptors, walker, barrel_depth }
    }

    /// Engine wired from a resolved config's patterns, denylist and adaptors
    pub fn from_config(cfg: &ResolvedConfig) -> RegistryResult<Self>
    {
        let walker = FileWalker::new(&cfg.exclude_patterns)
            .and_then(|w| w.with_includes(&cfg.component_patterns))
            .and_then(|w| w.with_denylist(&cfg.denylist))
            .map_err(|e| RegistryError::config(format!("{e:#}")))?;

        Ok(Self::new(adaptors_for(&cfg.adaptors), walker, cfg.barrel_depth))
    }

    /// Extract every component under `root`; `sourcePath`s are relative to `base_dir`.
    #[instrument(skip_all, fields(root = %root.display()))]
    pub fn run(
        &self,
        root: &Path,
        base_dir: &Path,
    ) -> Extraction
    {
        let files = self
            .walker
            .walk_files(root);
        debug!(files = files.len(), "walked component source");

        // par_iter + collect keeps the sorted walk order
        let results: Vec<FileResult> = files
            .par_iter()
            .map(|file| self.extract_file(file, base_dir))
            .collect();

        aggregate(results)
    }

    fn extract_file(
        &self,
        path: &Path,
        base_dir: &Path,
    ) -> FileResult
    {
        let mut out = FileResult::default();
        let rel = relative_slash(base_dir, path);

        let content = match read_file_smart(path)
        {
            Ok(c) => c,
            Err(e) =>
            {
                out.warnings
                    .push(Warning::new(WarningKind::Unreadable, format!("{rel}: {e:#}")));
                return out;
            }
        };
        let content = content.as_ref();

        for adaptor in self
            .adaptors
            .iter()
            .filter(|a| a.handles(path))
        {
            match adaptor.try_extract(path, content)
            {
                Ok(Some(descriptor)) =>
                {
                    out.component = Some(finish(descriptor, path, base_dir));
                    return out;
                }
                Ok(None) =>
                {}
                Err(e) =>
                {
                    out.warnings
                        .push(Warning::new(WarningKind::Unparseable, e.to_string()));
                    return out;
                }
            }

            match adaptor.barrel_targets(path, content)
            {
                Ok(Some(targets)) =>
                {
                    self.follow_barrel(path, &rel, &targets, base_dir, &mut out);
                    return out;
                }
                Ok(None) =>
                {}
                Err(e) =>
                {
                    out.warnings
                        .push(Warning::new(WarningKind::Unparseable, e.to_string()));
                    return out;
                }
            }
        }

        out
    }

    fn follow_barrel(
        &self,
        path: &Path,
        rel: &str,
        targets: &[ReExport],
        base_dir: &Path,
        out: &mut FileResult,
    )
    {
        let resolver = BarrelResolver::new(&self.adaptors, self.barrel_depth);

        match resolver.resolve(path, targets)
        {
            BarrelOutcome::Found { descriptor, defining } =>
            {
                out.component = Some(finish(descriptor, &defining, base_dir));
            }
            BarrelOutcome::Truncated(resolution) =>
            {
                let mut descriptor = truncated_descriptor(path, targets, resolution);
                descriptor.source_path = rel.to_string();
                let why = match resolution
                {
                    Resolution::CycleTruncated => "cycle",
                    _ => "depth limit",
                };
                out.warnings.push(Warning::new(
                    WarningKind::BarrelTruncated,
                    format!("{rel}: re-export chain stopped at a {why}; recorded `{}` without props", descriptor.name),
                ));
                out.component = Some(descriptor);
            }
            BarrelOutcome::Empty =>
            {
                debug!(file = rel, "barrel re-exports no component");
            }
        }
    }
}

/// Stylesheets next to `path` sharing its stem (`Button.css`, `Button.module.scss`, …)
fn colocated_styles(path: &Path) -> Vec<PathBuf>
{
    let (Some(dir), Some(stem)) = (path.parent(), path.file_stem())
    else
    {
        return Vec::new();
    };
    let stem = stem.to_string_lossy();

    COLOCATED_STYLES
        .iter()
        .map(|suffix| dir.join(format!("{stem}.{suffix}")))
        .filter(|p| p.is_file())
        .collect()
}

/// Relative sourcePath plus token references from co-located stylesheets
fn finish(
    mut descriptor: ComponentDescriptor,
    defining: &Path,
    base_dir: &Path,
) -> ComponentDescriptor
{
    descriptor.source_path = relative_slash(base_dir, defining);

    for sheet in colocated_styles(defining)
    {
        match read_file_smart(&sheet)
        {
            Ok(css) => descriptor
                .tokens_used
                .extend(tokens::references(css.as_ref())),
            Err(e) => debug!(file = %sheet.display(), error = %e, "co-located stylesheet unreadable"),
        }
    }

    descriptor
        .tokens_used
        .sort();
    descriptor
        .tokens_used
        .dedup();

    descriptor
}

/// Last wins on name collisions; the same definition reached twice is kept once
fn aggregate(results: Vec<FileResult>) -> Extraction
{
    let mut warnings = Vec::new();
    let mut by_name: IndexMap<String, ComponentDescriptor> = IndexMap::new();

    for result in results
    {
        warnings.extend(result.warnings);
        let Some(component) = result.component
        else
        {
            continue;
        };

        match by_name.get_mut(&component.name)
        {
            Some(prev) if prev.source_path == component.source_path =>
            {
                if !prev
                    .resolution
                    .is_direct()
                    && component
                        .resolution
                        .is_direct()
                {
                    *prev = component;
                }
            }
            Some(prev) =>
            {
                warnings.push(Warning::new(
                    WarningKind::NameCollision,
                    format!(
                        "component `{}` from {} replaces the one from {}",
                        component.name, component.source_path, prev.source_path
                    ),
                ));
                *prev = component;
            }
            None =>
            {
                by_name.insert(component.name.clone(), component);
            }
        }
    }

    let mut components: Vec<ComponentDescriptor> = by_name
        .into_values()
        .collect();
    components.sort_by(|a, b| {
        (&a.source_path, &a.name).cmp(&(&b.source_path, &b.name))
    });

    Extraction { components, warnings }
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use anyhow::Result;
    use tempfile::TempDir;

    use super::*;

    fn engine() -> Result<ExtractionEngine>
    {
        let walker = FileWalker::new(&["**/*.test.*".to_string()])?
            .with_includes(&["**/*.{tsx,ts,jsx,js}".to_string()])?
            .with_denylist(&["node_modules".to_string()])?;
        Ok(ExtractionEngine::new(
            adaptors_for(&[AdaptorKind::TypeScript, AdaptorKind::JavaScript]),
            walker,
            8,
        ))
    }

    fn write(
        root: &Path,
        rel: &str,
        body: &str,
    ) -> Result<()>
    {
        let p = root.join(rel);
        if let Some(dir) = p.parent()
        {
            fs::create_dir_all(dir)?;
        }
        fs::write(p, body)?;
        Ok(())
    }

    #[test]
    fn sorted_output_with_colocated_tokens() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let root = tmp.path();
        write(root, "src/Card.jsx", "export default function Card() { return null; }")?;
        write(root, "src/Button.tsx", "export const Button = () => <b style={{ color: 'var(--color-ink)' }} />;")?;
        write(root, "src/Button.module.css", ".b { color: var(--color-primary); margin: var(--space-sm); }")?;
        write(root, "src/Button.test.tsx", "export const Button = () => null;")?;
        write(root, "node_modules/x/Thing.js", "export const Thing = () => null;")?;
        write(root, "src/util.ts", "export const add = (a: number, b: number) => a + b;")?;

        let out = engine()?.run(&root.join("src"), root);
        let names: Vec<_> = out
            .components
            .iter()
            .map(|c| (c.name.as_str(), c.source_path.as_str()))
            .collect();
        assert_eq!(names, vec![("Button", "src/Button.tsx"), ("Card", "src/Card.jsx")]);
        assert_eq!(out.components[0].tokens_used, vec!["color.ink", "color.primary", "space.sm"]);
        assert!(out.warnings.is_empty());
        Ok(())
    }

    #[test]
    fn unparseable_files_warn_and_are_skipped() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let root = tmp.path();
        write(root, "Broken.tsx", "export const Broken = (: => {")?;
        write(root, "Fine.tsx", "export const Fine = () => null;")?;

        let out = engine()?.run(root, root);
        assert_eq!(out.components.len(), 1);
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].kind, WarningKind::Unparseable);
        Ok(())
    }

    #[test]
    fn collisions_last_path_wins() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let root = tmp.path();
        write(root, "a/Button.tsx", "export const Button = (p: { a: string }) => null;")?;
        write(root, "b/Button.tsx", "export const Button = (p: { b: string }) => null;")?;

        let out = engine()?.run(root, root);
        assert_eq!(out.components.len(), 1);
        assert_eq!(out.components[0].source_path, "b/Button.tsx");
        assert_eq!(out.components[0].props[0].name, "b");
        assert_eq!(out.warnings[0].kind, WarningKind::NameCollision);
        Ok(())
    }

    #[test]
    fn barrel_rediscovery_is_silent_and_direct_wins() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let root = tmp.path();
        write(root, "index.ts", "export * from './Button';\n")?;
        write(root, "Button.tsx", "export const Button = () => null;")?;

        let out = engine()?.run(root, root);
        assert_eq!(out.components.len(), 1);
        assert!(out.components[0].resolution.is_direct());
        assert!(out.warnings.is_empty());
        Ok(())
    }

    #[test]
    fn barrel_reaching_outside_the_walk() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let root = tmp.path();
        write(root, "src/index.ts", "export { Chip } from '../shared/Chip';\n")?;
        write(root, "shared/Chip.tsx", "export const Chip = () => null;")?;

        let out = engine()?.run(&root.join("src"), root);
        assert_eq!(out.components.len(), 1);
        assert_eq!(out.components[0].source_path, "shared/Chip.tsx");
        assert_eq!(out.components[0].resolution, Resolution::Barrel);
        Ok(())
    }

    #[test]
    fn cyclic_barrels_are_tagged() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let root = tmp.path();
        write(root, "a.ts", "export { Loop } from './b';\n")?;
        write(root, "b.ts", "export * from './a';\n")?;

        let out = engine()?.run(root, root);
        assert!(
            out.components
                .iter()
                .all(|c| c.resolution == Resolution::CycleTruncated)
        );
        assert_eq!(out.components.len(), 2);
        assert!(
            out.warnings
                .iter()
                .all(|w| w.kind == WarningKind::BarrelTruncated)
        );
        Ok(())
    }
}
