use std::fs;
use std::path::{Path, PathBuf};

use crate::parser::rules::{IncludeStyle, SearchPolicy};

/// Ordered include search roots plus the language's search policy.
///
/// The implicit "relative to the including file" root is not stored here;
/// the policy decides whether it is tried before `roots`.
#[derive(Debug, Clone, Default)]
pub struct SearchConfig {
    roots: Vec<PathBuf>,
    policy: SearchPolicy,
}

impl SearchConfig {
    /// Roots are canonicalized when possible so candidates come out canonical
    /// even before the final `canonicalize`; order is preserved.
    #[must_use]
    pub fn new(roots: Vec<PathBuf>, policy: SearchPolicy) -> Self {
        let roots = roots.into_iter().map(|r| fs::canonicalize(&r).unwrap_or(r)).collect();
        Self { roots, policy }
    }

    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    #[must_use]
    pub fn policy(&self) -> SearchPolicy {
        self.policy
    }
}

/// Resolve an include token to a canonical file path.
///
/// First existing, readable regular file wins. The including file's directory
/// comes first when the policy allows it for `style`, then the search roots in
/// configured order. `None` means unresolved, which is a normal outcome.
#[must_use]
pub fn resolve(
    token: &Path,
    style: IncludeStyle,
    including_dir: &Path,
    search: &SearchConfig,
) -> Option<PathBuf> {
    resolve_any(&[token.to_path_buf()], style, including_dir, search)
}

/// Like [`resolve`], for a token with several spellings on disk
/// (`pkg/__init__.py`, `pkg.py`).
///
/// Locations keep their priority: every candidate is tried in one location
/// before moving on to the next.
#[must_use]
pub fn resolve_any(
    candidates: &[PathBuf],
    style: IncludeStyle,
    including_dir: &Path,
    search: &SearchConfig,
) -> Option<PathBuf> {
    let local = search.policy.relative_first(style).then_some(including_dir);
    local
        .into_iter()
        .chain(search.roots.iter().map(PathBuf::as_path))
        .find_map(|base| candidates.iter().find_map(|c| readable_file(&base.join(c))))
}

fn readable_file(candidate: &Path) -> Option<PathBuf> {
    let meta = fs::metadata(candidate).ok()?;
    if !meta.is_file() {
        return None;
    }
    // Existing but unreadable files do not count as a match.
    fs::File::open(candidate).ok()?;
    fs::canonicalize(candidate).ok()
}
