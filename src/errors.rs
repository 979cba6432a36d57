use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn one file into include occurrences. Never fatal to a run.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Binary content in file {file}")]
    Binary { file: PathBuf },
}

/// Problems detected before any scanning starts. These abort the run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No input provided: at least one path to process is required")]
    NoRoots,

    #[error("Path to process does not exist: {0}")]
    MissingRoot(PathBuf),

    #[error("Language {0} not supported")]
    UnknownLanguage(String),

    #[error("Unrecognized output format: {0}")]
    UnknownFormat(String),

    #[error("Invalid [dot] {option}: {value}")]
    InvalidDotOption { option: &'static str, value: String },

    #[error("Number of threads is set to {0}; use at least one worker thread")]
    InvalidThreadCount(usize),

    #[error("Invalid regular expression '{pattern}': {source}")]
    InvalidPattern { pattern: String, source: regex::Error },

    #[error("Language {0} needs at least one pattern and one file extension")]
    EmptyRule(String),

    #[error("Config file {path} could not be parsed: {source}")]
    ConfigFile { path: PathBuf, source: toml::de::Error },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum GardenerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
