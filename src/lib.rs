//! include-gardener: include dependency graphs for source trees
//!
//! Walks one or more directory trees, extracts include-style references from
//! every recognised source file, resolves them against the including file's
//! directory and an ordered list of search paths, and collects the result in a
//! directed multigraph that can be written as DOT, GraphML or JSON.
//!
//! # Pipeline
//! - [`walker`] discovers files (depth limit, full-match exclusion regexes, symlink loops)
//! - [`parser`] extracts `(token, line, style)` occurrences per language rule
//! - [`graph::resolver`] turns tokens into canonical paths, first match wins
//! - [`scan`] runs the per-file work on a fixed pool of worker threads
//! - [`graph`] holds the thread-safe graph and its deterministic [`graph::GraphModel`]
//! - [`visualization`] renders the model
//!
//! # Quickstart (Library)
//! ```no_run
//! use include_gardener::scan::{scan, ScanConfig};
//! use include_gardener::visualization::{render, DotOptions, OutputFormat};
//!
//! let mut config = ScanConfig::new(vec!["src".into()]);
//! config.include_paths = vec!["include".into()];
//! let output = scan(&config).expect("scan");
//! let dot = render(&output.graph, OutputFormat::Dot, &DotOptions::default()).expect("render");
//! println!("{dot}");
//! eprintln!("{}", output.summary);
//! ```
//!
//! # Quickstart (CLI)
//! ```text
//! include-gardener -I include -j 4 src > deps.dot
//! include-gardener -l python -f json -o deps.json app/
//! ```
pub mod app;
pub mod cli;
pub mod errors;
pub mod graph;
pub mod parser;
pub mod scan;
pub mod utils;
pub mod visualization;
pub mod walker;
