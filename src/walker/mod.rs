//! Candidate file discovery.
//!
//! `walkdir` keeps its own explicit stack of open directories, so depth
//! tracking and symlink loop detection come from the same place regardless
//! of tree depth.
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::errors::ConfigError;
use crate::parser::rules::CompiledRule;
use crate::scan::report::{Warning, WarningKind};

/// A discovered file waiting to be processed. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    /// Canonical path.
    pub path: PathBuf,
    pub language: String,
    /// Levels below the root it was found under; the root itself is 0.
    pub depth: usize,
}

#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Full-match patterns tested against each entry's path string.
    pub exclude: Vec<Regex>,
    /// `None` = unlimited. `Some(n)`: directories deeper than `n` are not entered.
    pub depth_limit: Option<usize>,
    pub follow_links: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self { exclude: Vec::new(), depth_limit: None, follow_links: true }
    }
}

impl WalkOptions {
    /// Build options from raw CLI-style values. A negative `depth_limit` means unlimited.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidPattern` if an exclusion regex does not compile.
    pub fn new(exclude: &[String], depth_limit: i64) -> Result<Self, ConfigError> {
        Ok(Self {
            exclude: compile_excludes(exclude)?,
            depth_limit: usize::try_from(depth_limit).ok(),
            follow_links: true,
        })
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let s = path.to_string_lossy();
        self.exclude.iter().any(|re| re.is_match(&s))
    }
}

/// Compile exclusion patterns so that they must match the whole path.
///
/// # Errors
/// Returns `ConfigError::InvalidPattern` naming the pattern as the user wrote it.
pub fn compile_excludes(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(&format!("^(?:{p})$"))
                .map_err(|source| ConfigError::InvalidPattern { pattern: p.clone(), source })
        })
        .collect()
}

/// Lazy, single-pass sequence of [`FileTask`]s over the roots, in root order.
///
/// Traversal problems do not stop the walk; they are collected and can be
/// drained with [`Walker::take_warnings`].
pub struct Walker<'a> {
    roots: std::vec::IntoIter<PathBuf>,
    current: Option<walkdir::IntoIter>,
    rule: &'a CompiledRule,
    options: &'a WalkOptions,
    seen: HashSet<PathBuf>,
    warnings: Vec<Warning>,
}

/// Start walking `roots`.
#[must_use]
pub fn walk<'a>(roots: Vec<PathBuf>, rule: &'a CompiledRule, options: &'a WalkOptions) -> Walker<'a> {
    Walker {
        roots: roots.into_iter(),
        current: None,
        rule,
        options,
        seen: HashSet::new(),
        warnings: Vec::new(),
    }
}

impl Walker<'_> {
    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    fn open(&self, root: &Path) -> walkdir::IntoIter {
        let mut wd = WalkDir::new(root).follow_links(self.options.follow_links).sort_by_file_name();
        if let Some(limit) = self.options.depth_limit {
            // Files inside a directory at depth `limit` sit at `limit + 1`.
            wd = wd.max_depth(limit.saturating_add(1));
        }
        wd.into_iter()
    }

    fn warn(&mut self, kind: WarningKind, path: &Path, detail: impl Into<String>) {
        let warning = Warning::new(kind, path, detail);
        if kind == WarningKind::Excluded {
            tracing::debug!("{warning}");
        } else {
            tracing::warn!("{warning}");
        }
        self.warnings.push(warning);
    }

    fn record_walk_error(&mut self, err: &walkdir::Error) {
        let path = err.path().map(Path::to_path_buf).unwrap_or_default();
        if let Some(ancestor) = err.loop_ancestor() {
            let detail = format!("links back to {}", ancestor.display());
            self.warn(WarningKind::SymlinkLoop, &path, detail);
        } else {
            self.warn(WarningKind::UnreadablePath, &path, err.to_string());
        }
    }
}

impl Iterator for Walker<'_> {
    type Item = FileTask;

    fn next(&mut self) -> Option<FileTask> {
        loop {
            if self.current.is_none() {
                let root = self.roots.next()?;
                tracing::debug!(root = %root.display(), "walking root");
                self.current = Some(self.open(&root));
            }
            let next = self.current.as_mut().and_then(|it| it.next());
            let entry = match next {
                None => {
                    self.current = None;
                    continue;
                }
                Some(Err(err)) => {
                    self.record_walk_error(&err);
                    continue;
                }
                Some(Ok(entry)) => entry,
            };

            let path = entry.path();
            let is_dir = entry.file_type().is_dir();
            if self.options.is_excluded(path) {
                if is_dir {
                    if let Some(it) = self.current.as_mut() {
                        it.skip_current_dir();
                    }
                }
                self.warn(WarningKind::Excluded, path, "matches an exclude pattern");
                continue;
            }
            if is_dir || !entry.file_type().is_file() {
                continue;
            }
            if !self.rule.matches_extension(path) {
                if entry.depth() == 0 {
                    let detail = format!("not a {} file", self.rule.id());
                    self.warn(WarningKind::UnsupportedRoot, path, detail);
                }
                continue;
            }
            let canonical = match fs::canonicalize(path) {
                Ok(p) => p,
                Err(e) => {
                    self.warn(WarningKind::UnreadablePath, path, e.to_string());
                    continue;
                }
            };
            if !self.seen.insert(canonical.clone()) {
                tracing::debug!(file = %canonical.display(), "already discovered, skipping");
                continue;
            }
            return Some(FileTask { path: canonical, language: self.rule.id().to_string(), depth: entry.depth() });
        }
    }
}
