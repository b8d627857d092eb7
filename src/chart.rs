use crate::{
  metric::Metric,
  stats::{Configuration, SummaryTable},
};

/// Title used for the configuration without any features enabled.
pub const NO_OPTIMIZATIONS: &str = "No optimizations";

/// Width of one bar, in units of the distance between two ticks.
pub const BAR_WIDTH: f64 = 0.3;

/// A grouped bar chart: one group per input file, one bar per metric.
#[derive(Clone, Debug, PartialEq)]
pub struct Chart {
  pub title: String,
  pub x_label: &'static str,
  pub y_label: &'static str,
  /// Input file names, one tick each.
  pub categories: Vec<String>,
  pub series: Vec<BarSeries>,
}

/// The bars of one metric across every category.
#[derive(Clone, Debug, PartialEq)]
pub struct BarSeries {
  pub metric: Metric,
  /// Offset of the bar center from the tick, in tick units.
  pub offset: f64,
  pub width: f64,
  pub values: Vec<f64>,
  /// Text drawn above each bar.
  pub annotations: Vec<String>,
}

impl Chart {
  /// Number of bar groups, i.e. input files.
  pub fn groups(&self) -> usize {
    self.categories.len()
  }

  /// Largest bar value, or 0 for a chart without bars.
  pub fn max_value(&self) -> f64 {
    self
      .series
      .iter()
      .flat_map(|series| series.values.iter().copied())
      .fold(0.0, f64::max)
  }
}

/// Offset of `metric` so that the bars of all metrics sit side by side,
/// centered on the tick.
pub fn offset(metric: Metric) -> f64 {
  let center = (Metric::ALL.len() - 1) as f64 / 2.0;

  (metric.index() as f64 - center) * BAR_WIDTH
}

pub fn title(configuration: &Configuration) -> String {
  match configuration.label() {
    "" => NO_OPTIMIZATIONS.to_string(),
    label => label.to_string(),
  }
}

pub fn annotation(value: f64) -> String {
  format!("{value:.2}")
}

/// Builds one chart per configuration, in table order.
pub fn build(summary: &SummaryTable) -> Vec<Chart> {
  summary
    .iter()
    .map(|(configuration, inputs)| {
      let series = Metric::ALL
        .into_iter()
        .map(|metric| {
          let values: Vec<f64> = inputs
            .values()
            .map(|metrics| metrics.get(&metric).copied().unwrap_or_default())
            .collect();

          BarSeries {
            metric,
            offset: offset(metric),
            width: BAR_WIDTH,
            annotations: values.iter().copied().map(annotation).collect(),
            values,
          }
        })
        .collect();

      Chart {
        title: title(configuration),
        x_label: "Files",
        y_label: "Time (ms)",
        categories: inputs.keys().cloned().collect(),
        series,
      }
    })
    .collect()
}
