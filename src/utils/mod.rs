pub mod config {
    use serde::Deserialize;
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::{Path, PathBuf};

    use crate::errors::ConfigError;
    use crate::parser::rules::{LanguageRule, RuleSet};

    pub const CONFIG_FILE_NAME: &str = "gardener.toml";

    /// Run parameters from `[defaults]`. Command-line values take precedence.
    #[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
    #[serde(deny_unknown_fields)]
    pub struct Defaults {
        pub language: Option<String>,
        pub threads: Option<usize>,
        pub recursive_limit: Option<i64>,
        pub format: Option<String>, // "dot" | "graphml" | "xml" | "json"
        #[serde(default)]
        pub include_paths: Vec<PathBuf>,
        #[serde(default)]
        pub exclude: Vec<String>,
    }

    #[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
    #[serde(deny_unknown_fields)]
    pub struct DotConfig {
        pub theme: Option<String>,   // "light" | "dark"
        pub rankdir: Option<String>, // "LR" | "TB"
        pub line_labels: Option<bool>,
    }

    #[derive(Debug, Clone, Deserialize, Default)]
    #[serde(deny_unknown_fields)]
    pub struct Config {
        pub defaults: Option<Defaults>,
        pub dot: Option<DotConfig>,
        #[serde(default)]
        pub languages: BTreeMap<String, LanguageRule>,
    }

    impl Config {
        /// The built-in rules with this file's `[languages.*]` merged over them.
        #[must_use]
        pub fn rules(&self) -> RuleSet {
            let mut rules = RuleSet::builtin();
            rules.merge(self.languages.clone());
            rules
        }

        #[must_use]
        pub fn defaults(&self) -> Defaults {
            self.defaults.clone().unwrap_or_default()
        }
    }

    /// # Errors
    /// Returns `ConfigError::Io` if the file cannot be read and
    /// `ConfigError::ConfigFile` if it is not valid TOML for [`Config`].
    pub fn load_config_at(path: &Path) -> Result<Config, ConfigError> {
        let data = fs::read_to_string(path)?;
        parse_config(&data, path)
    }

    /// Load `gardener.toml` from `dir` if there is one.
    ///
    /// # Errors
    /// See [`load_config_at`].
    pub fn load_config_near(dir: &Path) -> Result<Option<Config>, ConfigError> {
        let p = dir.join(CONFIG_FILE_NAME);
        if p.is_file() {
            load_config_at(&p).map(Some)
        } else {
            Ok(None)
        }
    }

    fn parse_config(data: &str, path: &Path) -> Result<Config, ConfigError> {
        let cfg = toml::from_str::<Config>(data)
            .map_err(|source| ConfigError::ConfigFile { path: path.to_path_buf(), source })?;
        tracing::debug!(file = %path.display(), languages = cfg.languages.len(), "loaded config");
        Ok(cfg)
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::parser::rules::{IncludeStyle, SearchPolicy};
        use tempfile::tempdir;

        #[test]
        fn parses_defaults_and_languages() {
            let text = r#"
[defaults]
language = "proto"
threads = 4
include_paths = ["include", "third_party"]

[dot]
rankdir = "TB"

[languages.Proto]
extensions = ["proto"]
search = "roots-only"
[[languages.Proto.patterns]]
regex = '^\s*import\s+"([^"]+)"\s*;'
style = "quoted"
"#;
            let cfg = parse_config(text, Path::new("inline.toml")).unwrap();
            let d = cfg.defaults();
            assert_eq!(d.language.as_deref(), Some("proto"));
            assert_eq!(d.threads, Some(4));
            assert_eq!(d.recursive_limit, None);
            assert_eq!(d.include_paths.len(), 2);
            assert_eq!(cfg.dot.as_ref().unwrap().rankdir.as_deref(), Some("TB"));

            let rules = cfg.rules();
            let proto = rules.get("PROTO").unwrap();
            assert_eq!(proto.id, "proto");
            assert_eq!(proto.search, SearchPolicy::RootsOnly);
            assert_eq!(proto.patterns[0].style, IncludeStyle::Quoted);
            // built-ins survive the merge
            assert!(rules.get("c").is_ok());
        }

        #[test]
        fn unknown_keys_are_rejected() {
            let err = parse_config("[defaults]\nthreadz = 3\n", Path::new("bad.toml")).unwrap_err();
            assert!(matches!(err, ConfigError::ConfigFile { .. }));
            assert!(err.to_string().contains("bad.toml"));
        }

        #[test]
        fn typos_inside_language_tables_are_rejected() {
            let rule_typo = "[languages.proto]\nextensions = [\"proto\"]\nserch = \"roots-only\"\n\
                             [[languages.proto.patterns]]\nregex = 'x'\nstyle = \"quoted\"\n";
            let pattern_typo = "[languages.proto]\nextensions = [\"proto\"]\n\
                                [[languages.proto.patterns]]\nregex = 'x'\nstyle = \"quoted\"\nstlye = \"angle\"\n";
            let transform_typo = "[languages.proto]\nextensions = [\"proto\"]\n\
                                  [[languages.proto.patterns]]\nregex = 'x'\nstyle = \"quoted\"\n\
                                  [languages.proto.transform]\nsufix = \".proto\"\n";
            for text in [rule_typo, pattern_typo, transform_typo] {
                let err = parse_config(text, Path::new("typo.toml")).unwrap_err();
                assert!(matches!(err, ConfigError::ConfigFile { .. }), "{text}");
            }
        }

        #[test]
        fn load_near_is_optional() {
            let td = tempdir().unwrap();
            assert!(load_config_near(td.path()).unwrap().is_none());
            fs::write(td.path().join(CONFIG_FILE_NAME), "[defaults]\nformat = \"json\"\n").unwrap();
            let cfg = load_config_near(td.path()).unwrap().unwrap();
            assert_eq!(cfg.defaults().format.as_deref(), Some("json"));
        }

        #[test]
        fn missing_file_is_io_error() {
            let td = tempdir().unwrap();
            assert!(matches!(load_config_at(&td.path().join("none.toml")), Err(ConfigError::Io(_))));
        }
    }
}
