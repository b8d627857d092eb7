use std::{collections::BTreeMap, fmt};

use crate::metric::Metric;

/// A feature set passed to the program under test, e.g. `"PushAdd,PushAssign"`.
/// The empty label means "no optimizations".
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Configuration(String);

impl Configuration {
  pub fn new<S: Into<String>>(label: S) -> Self {
    Self(label.into())
  }

  pub fn label(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for Configuration {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:?}", self.0)
  }
}

/// Millisecond samples for one metric, one per repeated invocation.
pub type SampleSeries = Vec<u64>;

/// Per-metric values for a single input file.
pub type Metrics<V> = BTreeMap<Metric, V>;

/// Per-input values for a single configuration, keyed by file name.
pub type Inputs<V> = BTreeMap<String, Metrics<V>>;

/// Values for every (configuration, input, metric) triple. Configurations keep
/// insertion order, inputs are ordered by file name.
#[derive(Clone, Debug, PartialEq)]
pub struct Table<V> {
  configurations: Vec<(Configuration, Inputs<V>)>,
}

/// Raw samples collected by a matrix run.
pub type ResultTable = Table<SampleSeries>;

/// Arithmetic mean of every series in a [`ResultTable`].
pub type SummaryTable = Table<f64>;

impl<V> Default for Table<V> {
  fn default() -> Self {
    Self {
      configurations: Vec::new(),
    }
  }
}

impl<V> Table<V> {
  /// Returns the inputs of `configuration`, adding an empty entry at the end if
  /// it has not been seen yet.
  pub fn configuration_mut(&mut self, configuration: &Configuration) -> &mut Inputs<V> {
    let index = match self.configurations.iter().position(|(c, _)| c == configuration) {
      Some(index) => index,
      None => {
        self.configurations.push((configuration.clone(), BTreeMap::new()));
        self.configurations.len() - 1
      }
    };

    &mut self.configurations[index].1
  }

  pub fn insert(&mut self, configuration: &Configuration, input: String, metrics: Metrics<V>) {
    self.configuration_mut(configuration).insert(input, metrics);
  }

  pub fn iter(&self) -> impl Iterator<Item = (&Configuration, &Inputs<V>)> {
    self.configurations.iter().map(|(c, inputs)| (c, inputs))
  }

  pub fn len(&self) -> usize {
    self.configurations.len()
  }
}

impl ResultTable {
  /// Reduces every sample series to its mean.
  pub fn summarize(&self) -> SummaryTable {
    let configurations = self
      .iter()
      .map(|(configuration, inputs)| {
        let inputs = inputs
          .iter()
          .map(|(input, metrics)| {
            let means = metrics.iter().map(|(metric, series)| (*metric, mean(series))).collect();
            (input.clone(), means)
          })
          .collect();

        (configuration.clone(), inputs)
      })
      .collect();

    Table { configurations }
  }
}

/// Arithmetic mean of `samples`. Callers guarantee at least one sample; an
/// empty series yields `NaN`.
pub fn mean(samples: &[u64]) -> f64 {
  let sum: u128 = samples.iter().map(|&s| u128::from(s)).sum();

  sum as f64 / samples.len() as f64
}

#[cfg(test)]
mod tests {
  use super::*;

  impl<V> Table<V> {
    pub(crate) fn get(&self, configuration: &Configuration) -> Option<&Inputs<V>> {
      self.iter().find(|(c, _)| *c == configuration).map(|(_, inputs)| inputs)
    }
  }

  #[test]
  fn mean_of_equal_values_is_exact() {
    assert_eq!(mean(&[7; 10]), 7.0);
    assert_eq!(mean(&[u64::MAX, u64::MAX]), u64::MAX as f64);
  }

  #[test]
  fn mean_of_mixed_values() {
    assert_eq!(mean(&[1, 2, 3, 4]), 2.5);
    assert_eq!(mean(&[0, 0, 9]), 3.0);
  }

  #[test]
  fn configurations_keep_insertion_order() {
    let mut table = ResultTable::default();
    for label in ["b", "", "a"] {
      table.configuration_mut(&Configuration::new(label));
    }
    table.insert(&Configuration::new(""), "x".into(), Metrics::new());

    let labels: Vec<_> = table.iter().map(|(c, _)| c.label()).collect();
    assert_eq!(labels, ["b", "", "a"]);
    assert_eq!(table.get(&Configuration::new("")).map(BTreeMap::len), Some(1));
  }

  #[test]
  fn summarize_replaces_series_with_means() {
    let configuration = Configuration::new("PushAdd");
    let mut table = ResultTable::default();
    table.insert(
      &configuration,
      "a.bench".into(),
      BTreeMap::from([(Metric::Generating, vec![10, 20]), (Metric::Interpreting, vec![0, 0])]),
    );

    let summary = table.summarize();
    let metrics = &summary.get(&configuration).unwrap()["a.bench"];
    assert_eq!(metrics[&Metric::Generating], 15.0);
    assert_eq!(metrics[&Metric::Interpreting], 0.0);
  }

  #[test]
  fn summarize_keeps_empty_configurations() {
    let mut table = ResultTable::default();
    table.configuration_mut(&Configuration::new("PushAdd"));

    let summary = table.summarize();
    assert_eq!(summary.len(), 1);
    assert!(summary.get(&Configuration::new("PushAdd")).unwrap().is_empty());
  }
}
