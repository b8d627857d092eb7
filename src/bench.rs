use std::{
  fs,
  path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::{
  metric::{Metric, MetricExtractor},
  run::Invoker,
  stats::{Configuration, Metrics, ResultTable, SampleSeries},
};

/// Feature sets benchmarked when none are given.
pub const DEFAULT_CONFIGURATIONS: &[&str] = &[
  "PushAdd",
  "AssignPushAdd,PushAdd",
  "AssignPushAdd,PushAdd,PushAssign",
  "",
];
pub const DEFAULT_INPUT_DIR: &str = "./benchmarks";
pub const DEFAULT_RUNS: usize = 10;

/// What to do when an invocation fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum FailurePolicy {
  /// Stop the whole run with an error.
  #[default]
  Abort,
  /// Record the failed run as a zero sample for every metric and continue.
  Zero,
}

/// Walks configurations × input files, invoking the program `runs` times per
/// cell. Everything runs sequentially so measurements don't disturb each other.
pub struct Bench<I> {
  invoker: I,
  extractor: MetricExtractor,
  configurations: Vec<Configuration>,
  input_dir: PathBuf,
  runs: usize,
  policy: FailurePolicy,
}

impl<I: Invoker> Bench<I> {
  pub fn new(
    invoker: I,
    configurations: Vec<Configuration>,
    input_dir: PathBuf,
    runs: usize,
    policy: FailurePolicy,
  ) -> Result<Self> {
    if runs == 0 {
      anyhow::bail!("the number of runs must be at least 1");
    }

    for (i, configuration) in configurations.iter().enumerate() {
      if configurations[..i].contains(configuration) {
        anyhow::bail!("configuration {configuration} given more than once");
      }
    }

    Ok(Self {
      invoker,
      extractor: MetricExtractor::new().context("MetricExtractor::new")?,
      configurations,
      input_dir,
      runs,
      policy,
    })
  }

  /// Runs the full matrix. Every configuration gets an entry, even if the input
  /// directory is empty.
  pub fn run(&self) -> Result<ResultTable> {
    let mut table = ResultTable::default();

    for configuration in &self.configurations {
      tracing::info!("benchmarking {configuration}");
      table.configuration_mut(configuration);

      for input in input_files(&self.input_dir).context("input files")? {
        let name = input.file_name().context("file name")?.to_string_lossy().into_owned();
        tracing::info!("  running {name:?}");

        let samples = self
          .collect(configuration, &input)
          .with_context(|| format!("bench {configuration} on {input:?}"))?;

        table.insert(configuration, name, samples);
      }
    }

    Ok(table)
  }

  /// Invokes the program `runs` times on `input`, returning exactly `runs`
  /// samples for every metric.
  pub fn collect(&self, configuration: &Configuration, input: &Path) -> Result<Metrics<SampleSeries>> {
    let mut samples: Metrics<SampleSeries> = Metric::ALL
      .into_iter()
      .map(|metric| (metric, Vec::with_capacity(self.runs)))
      .collect();

    for run in 0..self.runs {
      let measurements = match self.invoker.invoke(configuration, input) {
        Ok(stdout) => self.extractor.extract(&stdout),
        Err(err) if self.policy == FailurePolicy::Zero => {
          tracing::warn!("run {run} failed, recording zero: {err:#}");
          Metric::ALL
            .into_iter()
            .map(|metric| (metric, MetricExtractor::DEFAULT_ON_MISS))
            .collect()
        }
        Err(err) => return Err(err.context(format!("run {run}"))),
      };

      tracing::debug!(run, ?measurements, "collected");

      for (metric, value) in measurements {
        samples.entry(metric).or_default().push(value);
      }
    }

    Ok(samples)
  }
}

/// Regular files directly inside `dir`, sorted by file name so every
/// configuration sees the same order.
pub fn input_files(dir: &Path) -> Result<Vec<PathBuf>> {
  let mut files = Vec::new();

  for entry in fs::read_dir(dir).with_context(|| format!("read dir {dir:?}"))? {
    let entry = entry.context("dir entry")?;
    let path = entry.path();

    // Follows symlinks, a link to a regular file counts. Entries whose
    // metadata can't be read, such as dangling links, are skipped.
    match fs::metadata(&path) {
      Ok(metadata) if metadata.is_file() => files.push(path),
      Ok(_) => {}
      Err(err) => tracing::debug!("skipping {path:?}: {err}"),
    }
  }

  files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

  Ok(files)
}

#[cfg(test)]
mod tests {
  use std::cell::{Cell, RefCell};

  use tempfile::TempDir;

  use super::*;

  const STDOUT: &str = "Generating bytecode took 10ms\nInterpreting took 20ms";

  /// Returns canned output and records every call.
  struct Mock {
    stdout: &'static str,
    fail_on: Option<usize>,
    calls: RefCell<Vec<(String, String)>>,
    count: Cell<usize>,
  }

  impl Mock {
    fn new(stdout: &'static str) -> Self {
      Self {
        stdout,
        fail_on: None,
        calls: RefCell::default(),
        count: Cell::new(0),
      }
    }

    fn failing_on(mut self, call: usize) -> Self {
      self.fail_on = Some(call);
      self
    }
  }

  impl Invoker for &Mock {
    fn invoke(&self, configuration: &Configuration, input: &Path) -> Result<String> {
      let call = self.count.get();
      self.count.set(call + 1);

      let file = input.file_name().unwrap().to_string_lossy().into_owned();
      self.calls.borrow_mut().push((configuration.label().to_string(), file));

      if self.fail_on == Some(call) {
        anyhow::bail!("exited with non-zero status 1");
      }

      Ok(self.stdout.to_string())
    }
  }

  fn inputs(names: &[&str]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for name in names {
      fs::write(dir.path().join(name), "print 1;").unwrap();
    }
    dir
  }

  fn configurations(labels: &[&str]) -> Vec<Configuration> {
    labels.iter().copied().map(Configuration::new).collect()
  }

  fn bench<'a>(mock: &'a Mock, dir: &TempDir, runs: usize, policy: FailurePolicy) -> Bench<&'a Mock> {
    Bench::new(mock, configurations(&["", "FastPath"]), dir.path().to_path_buf(), runs, policy).unwrap()
  }

  #[test]
  fn every_series_has_runs_samples() {
    let dir = inputs(&["b.bench", "a.bench"]);
    let mock = Mock::new(STDOUT);

    let table = bench(&mock, &dir, 3, FailurePolicy::Abort).run().unwrap();

    assert_eq!(table.len(), 2);
    for (_, inputs) in table.iter() {
      assert_eq!(inputs.keys().collect::<Vec<_>>(), ["a.bench", "b.bench"]);
      for metrics in inputs.values() {
        assert_eq!(metrics[&Metric::Generating], [10, 10, 10]);
        assert_eq!(metrics[&Metric::Interpreting], [20, 20, 20]);
        assert_eq!(metrics[&Metric::InterpretingThreaded], [0, 0, 0]);
      }
    }
  }

  #[test]
  fn matrix_is_walked_in_nested_order() {
    let dir = inputs(&["b.bench", "a.bench"]);
    let mock = Mock::new(STDOUT);

    bench(&mock, &dir, 2, FailurePolicy::Abort).run().unwrap();

    let calls = mock.calls.borrow();
    let calls: Vec<_> = calls.iter().map(|(c, f)| (c.as_str(), f.as_str())).collect();
    assert_eq!(
      calls,
      [
        ("", "a.bench"),
        ("", "a.bench"),
        ("", "b.bench"),
        ("", "b.bench"),
        ("FastPath", "a.bench"),
        ("FastPath", "a.bench"),
        ("FastPath", "b.bench"),
        ("FastPath", "b.bench"),
      ]
    );
  }

  #[test]
  fn runs_are_deterministic() {
    let dir = inputs(&["x.bench", "y.bench", "z.bench"]);
    let mock = Mock::new(STDOUT);
    let bench = bench(&mock, &dir, 4, FailurePolicy::Abort);

    assert_eq!(bench.run().unwrap(), bench.run().unwrap());
  }

  #[test]
  fn scenario_summary() {
    let dir = inputs(&["a.bench", "b.bench"]);
    let mock = Mock::new(STDOUT);

    let summary = bench(&mock, &dir, 3, FailurePolicy::Abort).run().unwrap().summarize();

    for (_, inputs) in summary.iter() {
      assert_eq!(inputs.len(), 2);
      for metrics in inputs.values() {
        assert_eq!(metrics[&Metric::Generating], 10.0);
        assert_eq!(metrics[&Metric::Interpreting], 20.0);
        assert_eq!(metrics[&Metric::InterpretingThreaded], 0.0);
      }
    }
  }

  #[test]
  fn malformed_output_summarizes_to_zero() {
    let dir = inputs(&["a.bench"]);
    let mock = Mock::new("segmentation fault (core dumped)");

    let summary = bench(&mock, &dir, 2, FailurePolicy::Abort).run().unwrap().summarize();

    for (_, inputs) in summary.iter() {
      assert!(inputs["a.bench"].values().all(|&mean| mean == 0.0));
    }
  }

  #[test]
  fn empty_directory_gives_empty_configurations() {
    let dir = inputs(&[]);
    let mock = Mock::new(STDOUT);

    let table = bench(&mock, &dir, 3, FailurePolicy::Abort).run().unwrap();

    assert_eq!(table.len(), 2);
    assert!(table.iter().all(|(_, inputs)| inputs.is_empty()));
    assert!(mock.calls.borrow().is_empty());
  }

  #[test]
  fn subdirectories_are_skipped() {
    let dir = inputs(&["a.bench"]);
    fs::create_dir(dir.path().join("nested")).unwrap();

    let files = input_files(dir.path()).unwrap();
    assert_eq!(files, [dir.path().join("a.bench")]);
  }

  #[cfg(unix)]
  #[test]
  fn dangling_symlinks_are_skipped() {
    let dir = inputs(&["a.bench"]);
    std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("broken")).unwrap();
    std::os::unix::fs::symlink(dir.path().join("a.bench"), dir.path().join("linked.bench")).unwrap();

    let files = input_files(dir.path()).unwrap();
    assert_eq!(files, [dir.path().join("a.bench"), dir.path().join("linked.bench")]);
  }

  #[test]
  fn failure_aborts_by_default() {
    let dir = inputs(&["a.bench"]);
    let mock = Mock::new(STDOUT).failing_on(1);

    let err = bench(&mock, &dir, 3, FailurePolicy::Abort).run().unwrap_err();

    assert!(format!("{err:#}").contains("non-zero status"), "{err:#}");
    assert_eq!(mock.count.get(), 2);
  }

  #[test]
  fn failure_records_zero_sample_when_configured() {
    let dir = inputs(&["a.bench"]);
    let mock = Mock::new(STDOUT).failing_on(1);

    let table = bench(&mock, &dir, 3, FailurePolicy::Zero).run().unwrap();

    let metrics = &table.get(&Configuration::new("")).unwrap()["a.bench"];
    assert_eq!(metrics[&Metric::Generating], [10, 0, 10]);
    assert_eq!(metrics[&Metric::Interpreting], [20, 0, 20]);
  }

  #[test]
  fn zero_runs_is_rejected() {
    let dir = inputs(&[]);
    let mock = Mock::new(STDOUT);

    assert!(Bench::new(&mock, configurations(&[""]), dir.path().to_path_buf(), 0, FailurePolicy::Abort).is_err());
  }

  #[test]
  fn duplicate_configurations_are_rejected() {
    let dir = inputs(&[]);
    let mock = Mock::new(STDOUT);

    let result = Bench::new(&mock, configurations(&["A", "B", "A"]), dir.path().to_path_buf(), 1, FailurePolicy::Abort);
    assert!(result.is_err());
  }

  #[test]
  fn missing_directory_is_an_error() {
    let dir = inputs(&[]);
    assert!(input_files(&dir.path().join("missing")).is_err());
  }
}
