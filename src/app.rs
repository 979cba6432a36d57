use crate::cli::Cli;
use crate::errors::GardenerError;
use crate::scan::{scan, ScanConfig};
use crate::utils::config::{load_config_at, load_config_near, Config};
use crate::visualization::{render, DotOptions, OutputFormat};
use clap::CommandFactory;
use clap_complete::generate;
use std::fs;
use std::io::{self, Write};

/// Run the CLI logic in-process.
///
/// Returns an exit code: 0 on success, 1 for a configuration error or an
/// output that could not be written. Per-file warnings do not change it.
#[must_use]
pub fn run_cli(cli: Cli) -> i32 {
    if let Some(shell) = cli.completions {
        let mut cmd = Cli::command();
        let bin_name = cmd.get_name().to_string();
        generate(shell, &mut cmd, bin_name, &mut io::stdout());
        return 0;
    }
    match execute(&cli) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("include-gardener: {e}");
            1
        }
    }
}

fn execute(cli: &Cli) -> Result<(), GardenerError> {
    let config = load_config(cli)?;

    if cli.list_languages {
        let rules = config.rules();
        let mut out = io::stdout().lock();
        for name in rules.names() {
            let rule = rules.get(name)?;
            writeln!(out, "{name}: {}", rule.extensions.join(", "))?;
        }
        return Ok(());
    }

    let scan_config = scan_config(cli, &config);
    let format = output_format(cli, &config)?;
    let dot = dot_options(cli, &config, &scan_config)?;

    let output = scan(&scan_config)?;
    let rendered = render(&output.graph, format, &dot)?;

    match &cli.out_file {
        Some(path) => fs::write(path, rendered)?,
        None => {
            let mut out = io::stdout().lock();
            out.write_all(rendered.as_bytes())?;
            out.flush()?;
        }
    }

    if !cli.quiet {
        eprintln!("{}", output.summary);
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config, GardenerError> {
    if let Some(path) = &cli.config {
        return Ok(load_config_at(path)?);
    }
    let cwd = std::env::current_dir()?;
    Ok(load_config_near(&cwd)?.unwrap_or_default())
}

/// Merge command line, config `[defaults]` and built-in defaults, in that order.
/// Validation happens later, in [`crate::scan::Scanner::prepare`].
#[must_use]
pub fn scan_config(cli: &Cli, config: &Config) -> ScanConfig {
    let defaults = config.defaults();
    let mut sc = ScanConfig::new(cli.roots());
    sc.rules = config.rules();
    if let Some(lang) = cli.language.clone().or(defaults.language) {
        sc.language = lang.to_lowercase();
    }
    if let Some(threads) = cli.threads.or(defaults.threads) {
        sc.threads = threads;
    }
    if let Some(limit) = cli.recursive_limit.or(defaults.recursive_limit) {
        sc.depth_limit = limit;
    }
    sc.include_paths = if cli.include_paths.is_empty() { defaults.include_paths } else { cli.include_paths.clone() };
    sc.exclude = if cli.exclude.is_empty() { defaults.exclude } else { cli.exclude.clone() };
    sc
}

fn output_format(cli: &Cli, config: &Config) -> Result<OutputFormat, GardenerError> {
    if let Some(f) = cli.format {
        return Ok(f.into());
    }
    match config.defaults.as_ref().and_then(|d| d.format.as_deref()) {
        Some(name) => Ok(name.parse()?),
        None => Ok(OutputFormat::default()),
    }
}

fn dot_options(cli: &Cli, config: &Config, scan_config: &ScanConfig) -> Result<DotOptions, GardenerError> {
    let mut opts = DotOptions::default();
    if let Some(dot) = &config.dot {
        if let Some(v) = &dot.theme {
            opts.theme = v.parse()?;
        }
        if let Some(v) = &dot.rankdir {
            opts.rankdir = v.parse()?;
        }
        if let Some(v) = dot.line_labels {
            opts.line_labels = v;
        }
    }
    if let Some(t) = cli.dot_theme {
        opts.theme = t.into();
    }
    if let Some(r) = cli.dot_rankdir {
        opts.rankdir = r.into();
    }
    // Node paths are canonical, so the base must be too.
    opts.base = scan_config
        .roots
        .first()
        .filter(|r| r.is_dir())
        .and_then(|r| fs::canonicalize(r).ok());
    Ok(opts)
}
