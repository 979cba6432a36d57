use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

use crate::visualization::{DotTheme, OutputFormat, RankDir};

#[derive(Debug, Parser)]
#[command(
    name = "include-gardener",
    version,
    about = "Include dependency graph generator",
    long_about = "Walk source trees, find include statements and write the resulting dependency graph as DOT, GraphML or JSON. Includes are resolved relative to the including file and then against the -I search paths, in order; includes that resolve nowhere stay in the graph as unresolved nodes."
)]
pub struct Cli {
    /// Paths to process (files or directories)
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,
    /// Path to process; may be given multiple times
    #[arg(short = 'P', long = "process-path", value_name = "PATH")]
    pub process_paths: Vec<PathBuf>,
    /// Include search path; searched in the given order
    #[arg(short = 'I', long = "include-path", value_name = "PATH")]
    pub include_paths: Vec<PathBuf>,
    /// Regular expression for paths to exclude (matched against the whole path)
    #[arg(short = 'e', long = "exclude", value_name = "REGEX")]
    pub exclude: Vec<String>,
    /// Recursion depth below each path; negative means unlimited [default: -1]
    #[arg(short = 'L', long = "recursive-limit", value_name = "N", allow_negative_numbers = true)]
    pub recursive_limit: Option<i64>,
    /// Number of worker threads [default: 2]
    #[arg(short = 'j', long = "threads", value_name = "N")]
    pub threads: Option<usize>,
    /// Language of the processed files [default: c]
    #[arg(short = 'l', long = "language", value_name = "NAME")]
    pub language: Option<String>,
    /// TOML configuration file [default: ./gardener.toml if present]
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Output format [default: dot]
    #[arg(short = 'f', long = "format", value_enum)]
    pub format: Option<FormatArg>,
    /// Output file; standard output if omitted
    #[arg(short = 'o', long = "out-file", value_name = "FILE")]
    pub out_file: Option<PathBuf>,
    /// DOT: theme
    #[arg(long, value_enum)]
    pub dot_theme: Option<DotThemeArg>,
    /// DOT: rank direction
    #[arg(long, value_enum)]
    pub dot_rankdir: Option<DotRankDirArg>,
    /// Print the supported languages and exit
    #[arg(long)]
    pub list_languages: bool,
    /// Print shell completions and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    pub completions: Option<clap_complete::Shell>,
    /// More logging; repeat for more detail
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
    /// Only log errors and do not print the run summary
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Positional paths followed by `-P` paths.
    #[must_use]
    pub fn roots(&self) -> Vec<PathBuf> {
        self.paths.iter().chain(&self.process_paths).cloned().collect()
    }

    /// Log filter directive for the verbosity flags.
    #[must_use]
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Dot,
    #[value(alias = "xml")]
    Graphml,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Dot => OutputFormat::Dot,
            FormatArg::Graphml => OutputFormat::Graphml,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DotThemeArg {
    Light,
    Dark,
}

impl From<DotThemeArg> for DotTheme {
    fn from(t: DotThemeArg) -> Self {
        match t {
            DotThemeArg::Light => DotTheme::Light,
            DotThemeArg::Dark => DotTheme::Dark,
        }
    }
}

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DotRankDirArg {
    #[value(name = "LR", alias = "lr")]
    LR,
    #[value(name = "TB", alias = "tb")]
    TB,
}

impl From<DotRankDirArg> for RankDir {
    fn from(r: DotRankDirArg) -> Self {
        match r {
            DotRankDirArg::LR => RankDir::LR,
            DotRankDirArg::TB => RankDir::TB,
        }
    }
}

#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
