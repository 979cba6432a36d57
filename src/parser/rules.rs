//! Per-language detection rules.
//!
//! A [`LanguageRule`] is plain data (it is what the config file deserializes
//! into). Before scanning it is compiled once into a [`CompiledRule`], which
//! the extractor and the resolver treat as read-only input.
use crate::errors::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// How an include was spelled: `"local.h"` or `<system.h>` (or the
/// language's equivalent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncludeStyle {
    Quoted,
    Angle,
}

impl IncludeStyle {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            IncludeStyle::Quoted => "quoted",
            IncludeStyle::Angle => "angle",
        }
    }
}

/// Where the resolver looks, per include style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchPolicy {
    /// Quoted: including file's directory, then search roots. Angle: search roots only.
    #[default]
    Standard,
    /// Both styles: including file's directory, then search roots.
    Relative,
    /// Both styles: search roots only.
    RootsOnly,
}

impl SearchPolicy {
    /// Whether the including file's directory is consulted before the search roots.
    #[must_use]
    pub fn relative_first(self, style: IncludeStyle) -> bool {
        match self {
            SearchPolicy::Standard => style == IncludeStyle::Quoted,
            SearchPolicy::Relative => true,
            SearchPolicy::RootsOnly => false,
        }
    }
}

/// Maps a raw token onto relative candidate paths, e.g. `pkg.mod` -> `pkg/mod.py`.
///
/// With a separator, leading separators make the token relative to the
/// including file: the first one stands for its directory, each further one
/// for the parent above (`..pkg.mod` -> `../pkg/mod.py`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenTransform {
    #[serde(default)]
    pub separator: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
    /// File that stands for a whole directory (`__init__.py`). When set, the
    /// directory form is tried before the suffixed file.
    #[serde(default)]
    pub package_file: Option<String>,
}

impl TokenTransform {
    fn separator(&self) -> Option<&str> {
        self.separator.as_deref().filter(|s| !s.is_empty())
    }

    /// Whether `token` may only be resolved against the including file's directory.
    #[must_use]
    pub fn is_relative(&self, token: &str) -> bool {
        self.separator().is_some_and(|sep| token.starts_with(sep))
    }

    /// Candidate paths for `token`, in the order they should be tried.
    #[must_use]
    pub fn candidates(&self, token: &str) -> Vec<PathBuf> {
        let mut module = PathBuf::new();
        let named = match self.separator() {
            Some(sep) => {
                let mut rest = token;
                let mut levels = 0usize;
                while let Some(r) = rest.strip_prefix(sep) {
                    levels += 1;
                    rest = r;
                }
                for _ in 1..levels {
                    module.push("..");
                }
                for part in rest.split(sep).filter(|p| !p.is_empty()) {
                    module.push(part);
                }
                !rest.is_empty()
            }
            None => {
                module.push(token);
                true
            }
        };

        let mut out = Vec::with_capacity(2);
        if let Some(pkg) = self.package_file.as_deref().filter(|p| !p.is_empty()) {
            out.push(module.join(pkg));
        }
        if named {
            match self.suffix.as_deref() {
                Some(suffix) if !suffix.is_empty() => {
                    let mut s = module.into_os_string();
                    s.push(suffix);
                    out.push(PathBuf::from(s));
                }
                _ => out.push(module),
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternRule {
    /// Regular expression; the token is the `token` named group, or group 1.
    pub regex: String,
    pub style: IncludeStyle,
    /// The capture is a list (`import a, b as c`): split it on this separator
    /// and keep the first word of every item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_separator: Option<String>,
}

impl PatternRule {
    fn new(regex: &str, style: IncludeStyle) -> Self {
        Self { regex: regex.to_string(), style, list_separator: None }
    }

    fn list(regex: &str, style: IncludeStyle, separator: &str) -> Self {
        Self { list_separator: Some(separator.to_string()), ..Self::new(regex, style) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LanguageRule {
    /// Filled from the table key when loaded from a config file.
    #[serde(default)]
    pub id: String,
    pub extensions: Vec<String>,
    pub patterns: Vec<PatternRule>,
    #[serde(default)]
    pub search: SearchPolicy,
    #[serde(default)]
    pub transform: TokenTransform,
}

const C_QUOTED: &str = r#"^\s*#\s*(?:include|import)\s*"(?P<token>[^"]+)""#;
const C_ANGLE: &str = r"^\s*#\s*(?:include|import)\s*<(?P<token>[^>]+)>";
const PY_IMPORT: &str =
    r"^\s*import\s+(?P<token>[A-Za-z_][\w.]*(?:\s+as\s+\w+)?(?:\s*,\s*[A-Za-z_][\w.]*(?:\s+as\s+\w+)?)*)";
const PY_FROM: &str = r"^\s*from\s+(?P<token>\.+[\w.]*|[A-Za-z_][\w.]*)\s+import\b";

impl LanguageRule {
    fn c_family(id: &str, extensions: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            extensions: extensions.iter().map(|e| (*e).to_string()).collect(),
            patterns: vec![
                PatternRule::new(C_QUOTED, IncludeStyle::Quoted),
                PatternRule::new(C_ANGLE, IncludeStyle::Angle),
            ],
            search: SearchPolicy::Standard,
            transform: TokenTransform::default(),
        }
    }

    #[must_use]
    pub fn c() -> Self {
        Self::c_family("c", &["c", "h"])
    }

    #[must_use]
    pub fn cpp() -> Self {
        Self::c_family(
            "cpp",
            &["cc", "cpp", "cxx", "c++", "hpp", "hh", "hxx", "h++", "h", "inl", "ipp", "tpp"],
        )
    }

    #[must_use]
    pub fn python() -> Self {
        Self {
            id: "python".to_string(),
            extensions: vec!["py".to_string()],
            patterns: vec![
                PatternRule::list(PY_IMPORT, IncludeStyle::Quoted, ","),
                PatternRule::new(PY_FROM, IncludeStyle::Quoted),
            ],
            search: SearchPolicy::Relative,
            transform: TokenTransform {
                separator: Some(".".to_string()),
                suffix: Some(".py".to_string()),
                package_file: Some("__init__.py".to_string()),
            },
        }
    }
}

/// Language id -> rule. Keys are lowercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    rules: BTreeMap<String, LanguageRule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RuleSet {
    #[must_use]
    pub fn builtin() -> Self {
        let mut rules = BTreeMap::new();
        for rule in [LanguageRule::c(), LanguageRule::cpp(), LanguageRule::python()] {
            rules.insert(rule.id.clone(), rule);
        }
        Self { rules }
    }

    /// Add or replace rules; the map key wins over any `id` inside the rule.
    pub fn merge<I>(&mut self, extra: I)
    where
        I: IntoIterator<Item = (String, LanguageRule)>,
    {
        for (name, mut rule) in extra {
            let key = name.to_lowercase();
            rule.id.clone_from(&key);
            self.rules.insert(key, rule);
        }
    }

    /// Look up a language case-insensitively.
    ///
    /// # Errors
    /// Returns `ConfigError::UnknownLanguage` when no rule is registered under `name`.
    pub fn get(&self, name: &str) -> Result<&LanguageRule, ConfigError> {
        self.rules
            .get(&name.to_lowercase())
            .ok_or_else(|| ConfigError::UnknownLanguage(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }
}

/// One detection pattern, compiled.
#[derive(Debug, Clone)]
pub(crate) struct CompiledPattern {
    pub(crate) regex: Regex,
    pub(crate) style: IncludeStyle,
    list_separator: Option<String>,
}

impl CompiledPattern {
    /// Tokens carried by one capture: the capture itself, or each list item.
    pub(crate) fn tokens<'t>(&'t self, raw: &'t str) -> impl Iterator<Item = &'t str> + 't {
        let sep = self.list_separator.as_deref().filter(|s| !s.is_empty());
        let (single, list) = match sep {
            Some(sep) => (None, Some(raw.split(sep))),
            None => (Some(raw), None),
        };
        single
            .into_iter()
            .chain(list.into_iter().flatten())
            .map(move |item| {
                let item = item.trim();
                if sep.is_some() {
                    item.split_whitespace().next().unwrap_or_default()
                } else {
                    item
                }
            })
            .filter(|t| !t.is_empty())
    }
}

/// A rule with its patterns compiled; shared read-only by every worker.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    id: String,
    extensions: HashSet<String>,
    patterns: Vec<CompiledPattern>,
    search: SearchPolicy,
    transform: TokenTransform,
}

impl CompiledRule {
    /// # Errors
    /// Returns `ConfigError::EmptyRule` for a rule without patterns or extensions and
    /// `ConfigError::InvalidPattern` when a regex does not compile.
    pub fn compile(rule: &LanguageRule) -> Result<Self, ConfigError> {
        if rule.patterns.is_empty() || rule.extensions.is_empty() {
            return Err(ConfigError::EmptyRule(rule.id.clone()));
        }
        let patterns = rule
            .patterns
            .iter()
            .map(|p| {
                Regex::new(&p.regex)
                    .map(|regex| CompiledPattern { regex, style: p.style, list_separator: p.list_separator.clone() })
                    .map_err(|source| ConfigError::InvalidPattern { pattern: p.regex.clone(), source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let extensions = rule
            .extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        Ok(Self {
            id: rule.id.clone(),
            extensions,
            patterns,
            search: rule.search,
            transform: rule.transform.clone(),
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn search(&self) -> SearchPolicy {
        self.search
    }

    pub(crate) fn patterns(&self) -> &[CompiledPattern] {
        &self.patterns
    }

    #[must_use]
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.contains(&e.to_ascii_lowercase()))
    }

    /// Language tag for a graph node. Depends on the path only.
    #[must_use]
    pub fn language_for(&self, path: &Path) -> Option<&str> {
        self.matches_extension(path).then_some(self.id.as_str())
    }

    /// Relative paths to try for `token`, most specific first.
    #[must_use]
    pub fn token_paths(&self, token: &str) -> Vec<PathBuf> {
        self.transform.candidates(token)
    }

    /// Tokens like Python's `.sibling` that only make sense next to the including file.
    #[must_use]
    pub fn is_relative_token(&self, token: &str) -> bool {
        self.transform.is_relative(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_rules_compile() {
        let set = RuleSet::builtin();
        let names: Vec<_> = set.names().collect();
        assert_eq!(names, vec!["c", "cpp", "python"]);
        for name in names {
            CompiledRule::compile(set.get(name).unwrap()).expect("builtin compiles");
        }
    }

    #[test]
    fn lookup_is_case_insensitive_and_reports_unknown() {
        let set = RuleSet::builtin();
        assert_eq!(set.get("C").unwrap().id, "c");
        match set.get("cobol") {
            Err(ConfigError::UnknownLanguage(n)) => assert_eq!(n, "cobol"),
            other => panic!("expected UnknownLanguage, got {other:?}"),
        }
    }

    #[test]
    fn extension_matching_ignores_case_and_dots() {
        let mut rule = LanguageRule::c();
        rule.extensions.push(".inc".into());
        let c = CompiledRule::compile(&rule).unwrap();
        assert!(c.matches_extension(Path::new("/x/a.c")));
        assert!(c.matches_extension(Path::new("/x/A.H")));
        assert!(c.matches_extension(Path::new("/x/t.inc")));
        assert!(!c.matches_extension(Path::new("/x/a.cpp")));
        assert!(!c.matches_extension(Path::new("/x/Makefile")));
        assert_eq!(c.language_for(Path::new("b.h")), Some("c"));
        assert_eq!(c.language_for(Path::new("b.txt")), None);
    }

    #[test]
    fn python_transform_builds_module_and_package_paths() {
        let c = CompiledRule::compile(&LanguageRule::python()).unwrap();
        assert_eq!(
            c.token_paths("pkg.sub.mod"),
            vec![PathBuf::from("pkg/sub/mod/__init__.py"), PathBuf::from("pkg/sub/mod.py")]
        );
        assert_eq!(c.token_paths("os"), vec![PathBuf::from("os/__init__.py"), PathBuf::from("os.py")]);
        assert!(!c.is_relative_token("os"));
        let plain = CompiledRule::compile(&LanguageRule::c()).unwrap();
        assert_eq!(plain.token_paths("sys/types.h"), vec![PathBuf::from("sys/types.h")]);
        assert!(!plain.is_relative_token("../x.h"));
    }

    #[test]
    fn leading_separators_climb_directories() {
        let c = CompiledRule::compile(&LanguageRule::python()).unwrap();
        assert!(c.is_relative_token(".sibling"));
        assert_eq!(
            c.token_paths(".sibling"),
            vec![PathBuf::from("sibling/__init__.py"), PathBuf::from("sibling.py")]
        );
        assert_eq!(
            c.token_paths("..pkg.mod"),
            vec![PathBuf::from("../pkg/mod/__init__.py"), PathBuf::from("../pkg/mod.py")]
        );
        // `from . import x` names the package itself
        assert_eq!(c.token_paths("."), vec![PathBuf::from("__init__.py")]);
        assert_eq!(c.token_paths(".."), vec![PathBuf::from("../__init__.py")]);
    }

    #[test]
    fn transform_without_package_file_yields_one_candidate() {
        let t = TokenTransform { separator: Some(".".into()), suffix: Some(".lua".into()), package_file: None };
        assert_eq!(t.candidates("a.b"), vec![PathBuf::from("a/b.lua")]);
        assert!(t.candidates(".").is_empty());
    }

    #[test]
    fn invalid_regex_and_empty_rule_are_config_errors() {
        let mut rule = LanguageRule::c();
        rule.patterns.push(PatternRule::new("(unclosed", IncludeStyle::Quoted));
        assert!(matches!(CompiledRule::compile(&rule), Err(ConfigError::InvalidPattern { .. })));

        let mut empty = LanguageRule::c();
        empty.patterns.clear();
        assert!(matches!(CompiledRule::compile(&empty), Err(ConfigError::EmptyRule(_))));
    }

    #[test]
    fn search_policy_table() {
        use IncludeStyle::{Angle, Quoted};
        assert!(SearchPolicy::Standard.relative_first(Quoted));
        assert!(!SearchPolicy::Standard.relative_first(Angle));
        assert!(SearchPolicy::Relative.relative_first(Angle));
        assert!(!SearchPolicy::RootsOnly.relative_first(Quoted));
    }

    #[test]
    fn merge_replaces_and_adds() {
        let mut set = RuleSet::builtin();
        let mut proto = LanguageRule::c();
        proto.extensions = vec!["proto".into()];
        set.merge([("Proto".to_string(), proto), ("c".to_string(), LanguageRule::python())]);
        assert_eq!(set.get("proto").unwrap().id, "proto");
        assert_eq!(set.get("c").unwrap().extensions, vec!["py".to_string()]);
    }
}
