use rayon::prelude::*;
use std::path::Path;

use crate::errors::{ConfigError, GardenerError, ReadError};
use crate::graph::resolver::{resolve_any, SearchConfig};
use crate::graph::{DependencyGraph, FileOutcome, PendingEdge, PendingTarget};
use crate::parser::{extract, read_source, CompiledRule, SearchPolicy};
use crate::scan::report::{Summary, Warning, WarningKind};
use crate::walker::FileTask;

/// Extract + resolve for one file. Shared read-only by all workers.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline<'a> {
    pub rule: &'a CompiledRule,
    pub search: &'a SearchConfig,
}

impl Pipeline<'_> {
    /// Process one task and insert its results into `graph`.
    ///
    /// Read failures come back as a skipped-file summary carrying a warning.
    pub fn process(&self, task: &FileTask, graph: &DependencyGraph) -> Summary {
        let text = match read_source(&task.path) {
            Ok(text) => text,
            Err(err) => {
                let warning = read_warning(&task.path, &err);
                tracing::warn!("{warning}");
                return Summary::skipped(warning);
            }
        };
        let dir = task.path.parent().unwrap_or_else(|| Path::new("/"));

        // `.sibling` style tokens never reach the search roots
        let local_only = SearchConfig::new(Vec::new(), SearchPolicy::Relative);

        let mut edges = Vec::new();
        let mut unresolved = 0usize;
        for occ in extract(&text, self.rule) {
            let candidates = self.rule.token_paths(occ.token);
            let search = if self.rule.is_relative_token(occ.token) { &local_only } else { self.search };
            let target = match resolve_any(&candidates, occ.style, dir, search) {
                Some(path) => {
                    let language = self.rule.language_for(&path).map(str::to_string);
                    PendingTarget::File { path, language }
                }
                None => {
                    tracing::debug!(file = %task.path.display(), line = occ.line, token = occ.token, "unresolved include");
                    unresolved += 1;
                    PendingTarget::Unresolved
                }
            };
            edges.push(PendingEdge { target, line: occ.line, style: occ.style, token: occ.token.to_string() });
        }

        tracing::debug!(file = %task.path.display(), depth = task.depth, includes = edges.len(), "processed");
        let added = graph.insert_outcome(FileOutcome {
            path: task.path.clone(),
            language: Some(task.language.clone()),
            edges,
        });
        Summary::scanned(added, unresolved)
    }
}

fn read_warning(path: &Path, err: &ReadError) -> Warning {
    let kind = match err {
        ReadError::Binary { .. } => WarningKind::BinaryFile,
        ReadError::Io(_) => WarningKind::UnreadableFile,
    };
    Warning::new(kind, path, err.to_string())
}

/// Fixed-size pool of worker threads.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    threads: usize,
}

impl WorkerPool {
    /// # Errors
    /// Returns `ConfigError::InvalidThreadCount` for zero threads and
    /// `GardenerError::ThreadPool` if the OS threads cannot be created.
    pub fn new(threads: usize) -> Result<Self, GardenerError> {
        if threads == 0 {
            return Err(ConfigError::InvalidThreadCount(threads).into());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("gardener-worker-{i}"))
            .build()
            .map_err(|e| GardenerError::ThreadPool(e.to_string()))?;
        Ok(Self { pool, threads })
    }

    #[must_use]
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Process every task exactly once. Each worker keeps its own partial
    /// summary; they are merged after all workers finish.
    pub fn run(&self, tasks: Vec<FileTask>, pipeline: Pipeline<'_>, graph: &DependencyGraph) -> Summary {
        self.pool.install(|| {
            tasks
                .into_par_iter()
                .map(|task| pipeline.process(&task, graph))
                .reduce(Summary::default, Summary::merge)
        })
    }
}

/// Convenience wrapper: build a pool of `thread_count` workers and run `tasks`.
///
/// # Errors
/// See [`WorkerPool::new`].
pub fn run(
    tasks: Vec<FileTask>,
    thread_count: usize,
    pipeline: Pipeline<'_>,
    graph: &DependencyGraph,
) -> Result<Summary, GardenerError> {
    Ok(WorkerPool::new(thread_count)?.run(tasks, pipeline, graph))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::rules::{LanguageRule, SearchPolicy};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn task(path: PathBuf) -> FileTask {
        FileTask { path: fs::canonicalize(path).unwrap(), language: "c".into(), depth: 1 }
    }

    #[test]
    fn zero_threads_is_rejected() {
        assert!(matches!(
            WorkerPool::new(0),
            Err(GardenerError::Config(ConfigError::InvalidThreadCount(0)))
        ));
        assert_eq!(WorkerPool::new(3).unwrap().threads(), 3);
    }

    #[test]
    fn failing_file_does_not_stop_others() {
        let td = tempdir().unwrap();
        fs::write(td.path().join("a.c"), "#include \"b.h\"\n#include <stdio.h>\n").unwrap();
        fs::write(td.path().join("b.h"), "").unwrap();
        fs::write(td.path().join("blob.c"), b"\x00\x01\x02").unwrap();
        let tasks = vec![task(td.path().join("a.c")), task(td.path().join("blob.c")), task(td.path().join("b.h"))];

        let rule = CompiledRule::compile(&LanguageRule::c()).unwrap();
        let search = SearchConfig::new(vec![], SearchPolicy::Standard);
        let graph = DependencyGraph::new();
        let summary = run(tasks, 2, Pipeline { rule: &rule, search: &search }, &graph).unwrap();

        assert_eq!(summary.files_scanned, 2);
        assert_eq!(summary.files_skipped, 1);
        assert_eq!(summary.edges, 2);
        assert_eq!(summary.unresolved, 1);
        assert_eq!(summary.count_of(WarningKind::BinaryFile), 1);
        // a.c, b.h and the unresolved stdio.h; blob.c never becomes a node
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn thread_count_does_not_change_result() {
        let td = tempdir().unwrap();
        fs::write(td.path().join("common.h"), "#include <stddef.h>\n").unwrap();
        let mut paths = Vec::new();
        for i in 0..40 {
            let p = td.path().join(format!("f{i}.c"));
            fs::write(&p, format!("#include \"common.h\"\n#include \"f{}.c\"\n#include \"gone{i}.h\"\n", (i + 1) % 40)).unwrap();
            paths.push(p);
        }
        paths.push(td.path().join("common.h"));

        let rule = CompiledRule::compile(&LanguageRule::c()).unwrap();
        let search = SearchConfig::new(vec![], SearchPolicy::Standard);
        let pipeline = Pipeline { rule: &rule, search: &search };
        let build = |threads: usize| {
            let graph = DependencyGraph::new();
            let tasks = paths.iter().cloned().map(task).collect();
            let summary = run(tasks, threads, pipeline, &graph).unwrap();
            (graph.into_model(), summary.edges, summary.unresolved)
        };
        let single = build(1);
        let many = build(8);
        assert_eq!(single, many);
        assert_eq!(single.1, 121);
        assert_eq!(single.2, 41);
    }
}
