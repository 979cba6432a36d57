//! Run orchestration: validate, walk, process in parallel, hand back the graph.
//!
//! ```no_run
//! use include_gardener::scan::{scan, ScanConfig};
//!
//! let mut config = ScanConfig::new(vec!["src".into()]);
//! config.include_paths = vec!["include".into()];
//! config.threads = 4;
//! let output = scan(&config).expect("valid configuration");
//! println!("{}", output.summary);
//! ```
use std::path::PathBuf;

use crate::errors::{ConfigError, GardenerError};
use crate::graph::resolver::SearchConfig;
use crate::graph::{DependencyGraph, GraphModel};
use crate::parser::{CompiledRule, RuleSet};
use crate::walker::{walk, FileTask, WalkOptions};

pub mod pool;
pub mod report;

use pool::{Pipeline, WorkerPool};
use report::{Summary, Warning, WarningKind};

pub const DEFAULT_THREADS: usize = 2;
pub const DEFAULT_LANGUAGE: &str = "c";

/// Already-parsed run parameters.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Paths to process (directories or single files). Must not be empty.
    pub roots: Vec<PathBuf>,
    /// Ordered include search roots (`-I`).
    pub include_paths: Vec<PathBuf>,
    /// Exclusion regexes, full-match against path strings.
    pub exclude: Vec<String>,
    /// Negative = unlimited.
    pub depth_limit: i64,
    pub threads: usize,
    pub language: String,
    pub rules: RuleSet,
}

impl ScanConfig {
    #[must_use]
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            include_paths: Vec::new(),
            exclude: Vec::new(),
            depth_limit: -1,
            threads: DEFAULT_THREADS,
            language: DEFAULT_LANGUAGE.to_string(),
            rules: RuleSet::builtin(),
        }
    }
}

/// Result of a run: the finished graph plus its summary.
#[derive(Debug, Clone)]
pub struct ScanOutput {
    pub graph: GraphModel,
    pub summary: Summary,
}

/// A validated run. Every configuration error surfaces in [`Scanner::prepare`],
/// before any file is touched.
pub struct Scanner {
    roots: Vec<PathBuf>,
    rule: CompiledRule,
    search: SearchConfig,
    walk_options: WalkOptions,
    pool: WorkerPool,
    warnings: Vec<Warning>,
}

impl Scanner {
    /// # Errors
    /// Returns a `GardenerError::Config` for no roots, a missing root, zero threads,
    /// an unknown language or an invalid pattern, and `GardenerError::ThreadPool`
    /// if the worker threads cannot be spawned.
    pub fn prepare(config: &ScanConfig) -> Result<Self, GardenerError> {
        if config.roots.is_empty() {
            return Err(ConfigError::NoRoots.into());
        }
        if let Some(missing) = config.roots.iter().find(|r| !r.exists()) {
            return Err(ConfigError::MissingRoot(missing.clone()).into());
        }
        if config.threads == 0 {
            return Err(ConfigError::InvalidThreadCount(config.threads).into());
        }
        let rule = CompiledRule::compile(config.rules.get(&config.language)?)?;
        let walk_options = WalkOptions::new(&config.exclude, config.depth_limit)?;

        let mut warnings = Vec::new();
        for inc in config.include_paths.iter().filter(|p| !p.is_dir()) {
            let warning = Warning::new(WarningKind::MissingSearchRoot, inc, "not a directory, ignored");
            tracing::warn!("{warning}");
            warnings.push(warning);
        }
        let search_roots = config.include_paths.iter().filter(|p| p.is_dir()).cloned().collect();
        let search = SearchConfig::new(search_roots, rule.search());

        let pool = WorkerPool::new(config.threads)?;
        Ok(Self { roots: config.roots.clone(), rule, search, walk_options, pool, warnings })
    }

    /// Discover the candidate files without processing them.
    #[must_use]
    pub fn discover(&self) -> (Vec<FileTask>, Vec<Warning>) {
        let mut walker = walk(self.roots.clone(), &self.rule, &self.walk_options);
        let tasks: Vec<FileTask> = walker.by_ref().collect();
        (tasks, walker.take_warnings())
    }

    /// Walk, process and insert into `graph`. Runs to completion; per-file
    /// problems end up as warnings in the returned summary.
    pub fn run_into(&self, graph: &DependencyGraph) -> Summary {
        tracing::info!(
            language = self.rule.id(),
            threads = self.pool.threads(),
            roots = self.roots.len(),
            "scan started"
        );
        let (tasks, walk_warnings) = self.discover();
        tracing::info!(files = tasks.len(), "discovery finished");

        let pipeline = Pipeline { rule: &self.rule, search: &self.search };
        let mut summary = self.pool.run(tasks, pipeline, graph);
        summary.warnings.extend(self.warnings.iter().cloned());
        summary.warnings.extend(walk_warnings);
        summary.sort_warnings();
        tracing::info!("scan finished: {summary}");
        summary
    }

    #[must_use]
    pub fn run(&self) -> ScanOutput {
        let graph = DependencyGraph::new();
        let summary = self.run_into(&graph);
        ScanOutput { graph: graph.into_model(), summary }
    }

    #[must_use]
    pub fn rule(&self) -> &CompiledRule {
        &self.rule
    }
}

/// Validate `config` and run it.
///
/// # Errors
/// Only configuration problems are errors; see [`Scanner::prepare`].
pub fn scan(config: &ScanConfig) -> Result<ScanOutput, GardenerError> {
    Ok(Scanner::prepare(config)?.run())
}
