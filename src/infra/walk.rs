//! Filepath: src/infra/walk.rs
//! Gitignore-aware file walker with include/exclude globs and a denylist.
//! - Respects .gitignore, .git/info/exclude, and global gitignore
//! - Include globs select candidate files (all files when empty)
//! - Exclude globs prune directories early and filter files late
//! - Denylist substrings drop any path that contains them
//! - Deterministic ordering for stable output
//!
//! Backed by ripgrep's `ignore` crate, `globset`, and `aho-corasick`.
//! All matching runs against the path RELATIVE to the walk root, with
//! forward slashes, so results do not depend on where the tree lives.

use std::path::{Path, PathBuf};

use aho_corasick::AhoCorasick;
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::{DirEntry, WalkBuilder};

/// Walker over a source tree; every filter sees root-relative paths.
#[derive(Clone)]
pub struct FileWalker
{
    /// Files must match one of these (None = accept every file)
    include_patterns: Option<GlobSet>,

    /// Compiled set of exclusion patterns
    exclude_patterns: GlobSet,

    /// Substring matcher; any hit drops the path
    denylist: Option<AhoCorasick>,

    /// Include hidden (dot) files; default false
    include_hidden: bool,
}

fn compile(patterns: &[String]) -> Result<GlobSet>
{
    let mut builder = GlobSetBuilder::new();

    for pattern in patterns
    {
        builder.add(Glob::new(pattern).with_context(|| format!("invalid glob `{pattern}`"))?);
    }

    Ok(builder.build()?)
}

/// Root-relative path with forward slashes
pub fn relative_slash(
    root: &Path,
    path: &Path,
) -> String
{
    match path.strip_prefix(root)
    {
        Ok(rel) => rel
            .components()
            .map(|c| {
                c.as_os_str()
                    .to_string_lossy()
            })
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => path
            .to_string_lossy()
            .replace('\\', "/"),
    }
}

impl FileWalker
{
    /// Build a walker with exclusion globs (e.g., "**/*.test.*").
    pub fn new(excludes: &[String]) -> Result<Self>
    {
        Ok(Self {
            include_patterns: None,
            exclude_patterns: compile(excludes)?,
            denylist: None,
            include_hidden: false,
        })
    }

    /// Restrict results to files matching one of `patterns`.
    pub fn with_includes(
        mut self,
        patterns: &[String],
    ) -> Result<Self>
    {
        self.include_patterns = if patterns.is_empty() { None } else { Some(compile(patterns)?) };
        Ok(self)
    }

    /// Drop every path containing one of `needles` as a substring.
    pub fn with_denylist(
        mut self,
        needles: &[String],
    ) -> Result<Self>
    {
        let needles: Vec<&str> = needles
            .iter()
            .map(String::as_str)
            .filter(|n| !n.is_empty())
            .collect();

        self.denylist = if needles.is_empty()
        {
            None
        }
        else
        {
            Some(AhoCorasick::new(&needles).context("build denylist matcher")?)
        };

        Ok(self)
    }

    /// (Optional) Include or exclude hidden files (dotfiles).
    pub fn with_include_hidden(
        mut self,
        include_hidden: bool,
    ) -> Self
    {
        self.include_hidden = include_hidden;
        self
    }

    fn denied(
        &self,
        rel: &str,
    ) -> bool
    {
        self.denylist
            .as_ref()
            .is_some_and(|ac| ac.is_match(rel))
    }

    /// Internal: construct a configured WalkBuilder for `root`.
    fn build_walk(
        &self,
        root: &Path,
    ) -> WalkBuilder
    {
        let mut b = WalkBuilder::new(root);

        // WalkBuilder::hidden(true) => *skip* dotfiles
        b.hidden(!self.include_hidden);

        // Respect .ignore/.gitignore/.git/info/exclude and global gitignore
        b.git_ignore(true);
        b.git_global(true);
        b.git_exclude(true);

        // Early directory pruning (fast short-circuit)
        let walker = self.clone();
        let root_owned = root.to_path_buf();
        b.filter_entry(move |ent: &DirEntry| {
            let is_dir = ent
                .file_type()
                .map(|ft| ft.is_dir())
                .unwrap_or(false);

            if !is_dir || ent.depth() == 0
            {
                return true;
            }

            let rel = relative_slash(&root_owned, ent.path());
            !(walker.denied(&rel) || walker.exclude_patterns.is_match(&rel))
        });

        b
    }

    /// Traverse files under `root` (a file root yields itself when it matches).
    /// Returns a **sorted** list of paths for determinism.
    pub fn walk_files<P: AsRef<Path>>(
        &self,
        root: P,
    ) -> Vec<PathBuf>
    {
        let root_path = root.as_ref();

        let mut out: Vec<PathBuf> = self
            .build_walk(root_path)
            .build()
            // Unreadable entries are dropped; adaptors report unreadable files
            .filter_map(|res| res.ok())
            .filter(|entry| {
                entry
                    .file_type()
                    .is_some_and(|ft| ft.is_file())
            })
            .map(|entry| entry.into_path())
            .filter(|abs| {
                // A file root is matched by its own name
                let rel = if abs == root_path
                {
                    abs.file_name()
                        .map(|n| {
                            n.to_string_lossy()
                                .into_owned()
                        })
                        .unwrap_or_default()
                }
                else
                {
                    relative_slash(root_path, abs)
                };

                self.accepts(&rel)
            })
            .collect();

        out.sort();

        out
    }

    /// Apply the include, exclude and denylist rules to a relative path.
    pub fn accepts(
        &self,
        rel: &str,
    ) -> bool
    {
        if self.denied(rel) || self.exclude_patterns.is_match(rel)
        {
            return false;
        }

        self.include_patterns
            .as_ref()
            .is_none_or(|inc| inc.is_match(rel))
    }
}
