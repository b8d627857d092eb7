use std::{
  fs,
  io::{self, IsTerminal, Write as _},
  path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::{chart::Chart, format, svg};

/// Collects charts and presents them all at once.
pub trait Viewer {
  fn add(&mut self, chart: Chart) -> Result<()>;

  /// Presents every added chart, blocking until the viewer is dismissed.
  fn show(self) -> Result<()>;
}

/// Whether `show` should block: only when asked to and there is a user at a
/// terminal to dismiss it.
fn should_wait(wait: bool) -> bool {
  wait && io::stdin().is_terminal()
}

fn wait_for_enter() -> Result<()> {
  eprint!("press enter to close the charts ");
  io::stderr().flush().context("flush")?;
  io::stdin().read_line(&mut String::new()).context("read stdin")?;

  Ok(())
}

/// Prints charts to stdout as text.
pub struct TerminalViewer {
  charts: Vec<Chart>,
  wait: bool,
}

impl TerminalViewer {
  pub fn new(wait: bool) -> Self {
    Self {
      charts: Vec::new(),
      wait,
    }
  }
}

impl Viewer for TerminalViewer {
  fn add(&mut self, chart: Chart) -> Result<()> {
    self.charts.push(chart);
    Ok(())
  }

  fn show(self) -> Result<()> {
    let mut stdout = io::stdout().lock();
    for chart in &self.charts {
      let text = format::format_chart(chart).with_context(|| format!("format {:?}", chart.title))?;
      writeln!(stdout, "{text}").context("write")?;
    }
    drop(stdout);

    if should_wait(self.wait) {
      wait_for_enter()?;
    }

    Ok(())
  }
}

enum OutputDir {
  Kept(PathBuf),
  /// Removed once the viewer is dismissed, or kept if `show` doesn't block.
  Temporary(TempDir),
}

impl OutputDir {
  fn path(&self) -> &Path {
    match self {
      OutputDir::Kept(path) => path,
      OutputDir::Temporary(dir) => dir.path(),
    }
  }
}

/// Writes each chart to its own SVG file.
pub struct SvgViewer {
  dir: OutputDir,
  files: Vec<PathBuf>,
  wait: bool,
}

impl SvgViewer {
  /// Writes into `dir`, or into a temporary directory if `None`.
  pub fn new(dir: Option<PathBuf>, wait: bool) -> Result<Self> {
    let dir = match dir {
      Some(dir) => {
        fs::create_dir_all(&dir).with_context(|| format!("create_dir {dir:?}"))?;
        OutputDir::Kept(dir)
      }
      None => OutputDir::Temporary(TempDir::with_prefix("interp-bench-").context("tempdir")?),
    };

    Ok(Self {
      dir,
      files: Vec::new(),
      wait,
    })
  }

  pub fn files(&self) -> &[PathBuf] {
    &self.files
  }
}

/// File name for the `index`th chart.
fn file_name(index: usize, title: &str) -> String {
  let slug: String = title
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
    .collect();

  format!("{index:02}-{slug}.svg")
}

impl Viewer for SvgViewer {
  fn add(&mut self, chart: Chart) -> Result<()> {
    let path = self.dir.path().join(file_name(self.files.len(), &chart.title));
    let svg = svg::render(&chart).with_context(|| format!("render {:?}", chart.title))?;

    fs::write(&path, svg).with_context(|| format!("write {path:?}"))?;
    self.files.push(path);

    Ok(())
  }

  fn show(self) -> Result<()> {
    let Self { dir, files, wait } = self;
    let wait = should_wait(wait);

    // Nothing holds the process open for the charts to be looked at, so the
    // printed paths have to outlive it.
    let dir = match dir {
      OutputDir::Temporary(dir) if !wait => OutputDir::Kept(dir.keep()),
      dir => dir,
    };

    for file in &files {
      println!("{}", file.display());
    }
    tracing::info!("wrote {} charts to {:?}", files.len(), dir.path());

    if wait {
      wait_for_enter()?;
    }

    Ok(())
  }
}
