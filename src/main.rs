mod bench;
mod chart;
mod ext;
mod format;
mod metric;
mod run;
mod stats;
mod svg;
mod view;

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use self::{
  bench::{Bench, FailurePolicy},
  run::CommandInvoker,
  stats::Configuration,
  view::{SvgViewer, TerminalViewer, Viewer},
};

#[derive(Parser)]
struct Args {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Runs every feature configuration against every benchmark file and charts
  /// the mean timings.
  Bench {
    /// Directory of benchmark programs. Only regular files are used.
    #[arg(long, default_value = bench::DEFAULT_INPUT_DIR)]
    dir: PathBuf,
    /// Feature configuration to benchmark, may be repeated. `""` benchmarks
    /// without optimizations. Defaults to the standard feature sets.
    #[arg(short, long)]
    features: Vec<String>,
    /// How many times each program is run per configuration.
    #[arg(short = 'n', long, default_value_t = bench::DEFAULT_RUNS)]
    runs: usize,
    /// Command to run, split on whitespace. `{features}` and `{input}` are
    /// substituted.
    #[arg(long)]
    command: Option<String>,
    /// Seconds after which a single run is killed and counted as failed.
    #[arg(long)]
    timeout: Option<u64>,
    /// What to do when a run fails.
    #[arg(long, value_enum, default_value_t)]
    on_failure: FailurePolicy,
    /// Render charts as SVG instead of printing them.
    #[arg(long)]
    svg: bool,
    /// Keep the SVG charts in this directory. Implies `--svg`.
    #[arg(long)]
    svg_dir: Option<PathBuf>,
    /// Don't wait for enter before exiting.
    #[arg(long)]
    no_wait: bool,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();

  match Args::parse().command {
    Command::Bench {
      dir,
      features,
      runs,
      command,
      timeout,
      on_failure,
      svg,
      svg_dir,
      no_wait,
    } => {
      if !dir.is_dir() {
        anyhow::bail!("{dir:?} is not a directory");
      }

      let timeout = timeout.map(Duration::from_secs);
      let invoker = match command {
        Some(command) => CommandInvoker::new(command.split_whitespace(), timeout),
        None => CommandInvoker::new(run::DEFAULT_COMMAND.iter().copied(), timeout),
      }
      .context("CommandInvoker::new")?;

      let bench = Bench::new(invoker, configurations(features), dir, runs, on_failure).context("Bench::new")?;
      let results = bench.run().context("bench")?;
      tracing::info!("benchmarked {} configurations", results.len());

      let charts = chart::build(&results.summarize());

      let shown = if svg || svg_dir.is_some() {
        show(SvgViewer::new(svg_dir, !no_wait).context("SvgViewer::new")?, charts)
      } else {
        show(TerminalViewer::new(!no_wait), charts)
      };
      shown.context("show")?;
    }
  }

  Ok(())
}

/// The configurations given with `--features`, or the default feature sets.
fn configurations(features: Vec<String>) -> Vec<Configuration> {
  if features.is_empty() {
    bench::DEFAULT_CONFIGURATIONS.iter().copied().map(Configuration::new).collect()
  } else {
    features.into_iter().map(Configuration::new).collect()
  }
}

/// Builds every chart before presenting any of them.
fn show<V: Viewer>(mut viewer: V, charts: Vec<chart::Chart>) -> Result<()> {
  for chart in charts {
    viewer.add(chart)?;
  }

  viewer.show()
}
