use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    /// Path matched an exclusion pattern.
    Excluded,
    SymlinkLoop,
    /// Directory or entry that could not be listed or stat'ed.
    UnreadablePath,
    /// A root that is a file with an unrecognised extension.
    UnsupportedRoot,
    /// Include search root that does not exist.
    MissingSearchRoot,
    UnreadableFile,
    BinaryFile,
}

impl WarningKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            WarningKind::Excluded => "excluded",
            WarningKind::SymlinkLoop => "symlink loop",
            WarningKind::UnreadablePath => "unreadable path",
            WarningKind::UnsupportedRoot => "unsupported root",
            WarningKind::MissingSearchRoot => "missing include path",
            WarningKind::UnreadableFile => "unreadable file",
            WarningKind::BinaryFile => "binary file",
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal problem met during a run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub path: PathBuf,
    pub detail: String,
}

impl Warning {
    pub fn new(kind: WarningKind, path: &Path, detail: impl Into<String>) -> Self {
        Self { kind, path: path.to_path_buf(), detail: detail.into() }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.kind, self.path.display(), self.detail)
    }
}

/// Counts and warnings for one run, reported by the CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub edges: usize,
    /// Include occurrences that did not resolve to a file.
    pub unresolved: usize,
    pub warnings: Vec<Warning>,
}

impl Summary {
    pub(crate) fn scanned(edges: usize, unresolved: usize) -> Self {
        Self { files_scanned: 1, edges, unresolved, ..Self::default() }
    }

    pub(crate) fn skipped(warning: Warning) -> Self {
        Self { files_skipped: 1, warnings: vec![warning], ..Self::default() }
    }

    #[must_use]
    pub fn merge(mut self, mut other: Self) -> Self {
        self.files_scanned += other.files_scanned;
        self.files_skipped += other.files_skipped;
        self.edges += other.edges;
        self.unresolved += other.unresolved;
        self.warnings.append(&mut other.warnings);
        self
    }

    /// Sort warnings so reports do not depend on worker scheduling.
    pub fn sort_warnings(&mut self) {
        self.warnings.sort();
    }

    #[must_use]
    pub fn count_of(&self, kind: WarningKind) -> usize {
        self.warnings.iter().filter(|w| w.kind == kind).count()
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "files scanned: {}, skipped: {}, edges: {}, unresolved: {}, warnings: {} ({} excluded)",
            self.files_scanned,
            self.files_skipped,
            self.edges,
            self.unresolved,
            self.warnings.len(),
            self.count_of(WarningKind::Excluded)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_adds_counts_and_concatenates_warnings() {
        let a = Summary::scanned(3, 1);
        let b = Summary::skipped(Warning::new(WarningKind::BinaryFile, Path::new("/x.c"), "nul bytes"));
        let total = a.merge(b).merge(Summary::scanned(2, 0));
        assert_eq!(total.files_scanned, 2);
        assert_eq!(total.files_skipped, 1);
        assert_eq!(total.edges, 5);
        assert_eq!(total.unresolved, 1);
        assert_eq!(total.count_of(WarningKind::BinaryFile), 1);
    }

    #[test]
    fn display_is_one_line() {
        let mut s = Summary::scanned(4, 2);
        s.warnings.push(Warning::new(WarningKind::Excluded, Path::new("/t/x.c"), "pattern"));
        let line = s.to_string();
        assert!(!line.contains('\n'));
        assert!(line.contains("edges: 4"));
        assert!(line.contains("unresolved: 2"));
        assert!(line.contains("(1 excluded)"));
    }

    #[test]
    fn warning_display_names_kind_and_path() {
        let w = Warning::new(WarningKind::SymlinkLoop, Path::new("/a/b"), "links back to /a");
        assert_eq!(w.to_string(), "symlink loop: /a/b: links back to /a");
    }
}
