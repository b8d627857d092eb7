use std::fmt;

use anyhow::{Context, Result};
use regex::Regex;

use crate::stats::Metrics;

/// A timing phase reported by the program under test.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
  Generating,
  Interpreting,
  InterpretingThreaded,
}

impl Metric {
  /// All known metrics, in the order their bars are drawn.
  pub const ALL: [Metric; 3] = [Metric::Generating, Metric::Interpreting, Metric::InterpretingThreaded];

  /// The text printed by the program in front of ` took <n>ms`.
  pub fn label(self) -> &'static str {
    match self {
      Metric::Generating => "Generating bytecode",
      Metric::Interpreting => "Interpreting",
      Metric::InterpretingThreaded => "Interpreting (threaded)",
    }
  }

  pub fn name(self) -> &'static str {
    match self {
      Metric::Generating => "generating",
      Metric::Interpreting => "interpreting",
      Metric::InterpretingThreaded => "interpreting (threaded)",
    }
  }

  /// Position among [`Metric::ALL`].
  pub fn index(self) -> usize {
    self as usize
  }
}

impl fmt::Display for Metric {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Parses `"<label> took <n>ms"` lines out of a run's stdout.
pub struct MetricExtractor {
  patterns: Vec<(Metric, Regex)>,
}

impl MetricExtractor {
  /// Value recorded for a metric whose pattern is absent. Note that this makes
  /// "not produced" indistinguishable from "took 0ms".
  pub const DEFAULT_ON_MISS: u64 = 0;

  pub fn new() -> Result<Self> {
    let patterns = Metric::ALL
      .into_iter()
      .map(|metric| {
        let pattern = format!(r"{} took (\d+)ms", regex::escape(metric.label()));
        let regex = Regex::new(&pattern).with_context(|| format!("compile {pattern:?}"))?;
        Ok((metric, regex))
      })
      .collect::<Result<_>>()?;

    Ok(Self { patterns })
  }

  /// Returns a value for every metric in [`Metric::ALL`]. Never fails: absent or
  /// unparsable values fall back to [`Self::DEFAULT_ON_MISS`].
  pub fn extract(&self, stdout: &str) -> Metrics<u64> {
    self
      .patterns
      .iter()
      .map(|(metric, regex)| {
        let value = regex
          .captures(stdout)
          .and_then(|captures| captures[1].parse::<u64>().ok())
          .unwrap_or_else(|| {
            tracing::debug!(%metric, "pattern not found, using {}", Self::DEFAULT_ON_MISS);
            Self::DEFAULT_ON_MISS
          });

        (*metric, value)
      })
      .collect()
  }
}
