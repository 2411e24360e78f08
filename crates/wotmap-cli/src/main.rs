#![forbid(unsafe_code)]

mod report;

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use wotmap_core::{Analyzer, AnalyzerConfig, ReachableSet, SccForest, graph, ingest};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "wotmap: web-of-trust keyring analyzer",
    long_about = None
)]
struct Cli {
    /// Preprocessed keyring record file.
    #[arg(short, long, default_value = "preprocess.keys")]
    input: PathBuf,

    /// Trailing input path; overrides --input when given.
    #[arg(value_name = "INPUT")]
    input_pos: Option<PathBuf>,

    /// Output directory for report files.
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Write per-key reports directly in the output directory instead
    /// of two-hex-digit subdirectories.
    #[arg(short = '1', long)]
    flat: bool,

    /// Number of analysis worker threads.
    #[arg(short, long, default_value_t = 2)]
    workers: usize,

    /// Maximum number of keys the table is provisioned for.
    #[arg(long, default_value_t = graph::DEFAULT_MAX_KEYS)]
    max_keys: usize,

    /// Emit the run summary as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("WOTMAP_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "wotmap=debug,info"
        } else {
            "wotmap=info,warn"
        })
    });

    let format = env::var("WOTMAP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let input = cli.input_pos.as_ref().unwrap_or(&cli.input);
    let bytes = fs::read(input)
        .with_context(|| format!("read input file {}", input.display()))?;

    let mut reporter = report::Reporter::create(&cli.output, cli.flat)?;

    let loaded = ingest::load(&bytes, cli.max_keys).context("import keyring records")?;
    reporter.status_line("Importing pass 1 (keys)... done.")?;
    reporter.status_line(&format!("{} keys imported", loaded.graph.len()))?;
    reporter.status_line("Importing pass 2 (sigs)... done.")?;
    reporter.status_line(&format!("{} sigs imported", loaded.sig_count))?;

    let scc = SccForest::decompose(&loaded.graph);
    reporter.write_components(&loaded.graph, &scc)?;
    let strong_rep = scc
        .strong_rep
        .context("keyring contains no keys; nothing to analyze")?;

    let reachable = ReachableSet::mark(&loaded.graph, strong_rep);
    reporter.status_line(&format!("reachable set is size {}", reachable.len()))?;
    reporter.status_line(&format!(
        "strongly connected set is size {}",
        scc.strong_size
    ))?;

    let analyzer = Analyzer::new(AnalyzerConfig {
        workers: cli.workers,
    });
    let summary = analyzer.run(
        &loaded.graph,
        &scc,
        &reachable,
        &reporter.key_sink(&loaded.graph),
    )?;

    reporter.write_global_mean(summary.global_mean)?;

    if cli.json {
        let rep_id = loaded.graph.key_id(strong_rep);
        let out = serde_json::json!({
            "keys": loaded.graph.len(),
            "signatures": loaded.sig_count,
            "dropped_signatures": loaded.dropped_sigs,
            "strong_set_size": summary.strong_size,
            "strong_rep": rep_id.to_string(),
            "reachable": summary.reachable,
            "analyzed": summary.analyzed,
            "global_mean": summary.global_mean,
        });
        println!("{out}");
    }

    info!(
        keys = loaded.graph.len(),
        sigs = loaded.sig_count,
        strong_size = summary.strong_size,
        reachable = summary.reachable,
        global_mean = summary.global_mean,
        "run complete"
    );
    Ok(())
}
