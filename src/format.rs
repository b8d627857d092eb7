use std::fmt::Write;

use anyhow::Result;

use crate::chart::Chart;

const COLUMN_WIDTH: usize = 24;
const COLUMN_PADDING: &str = "  ";
/// Characters used by the longest bar of a chart.
const BAR_COLUMNS: usize = 40;

fn format_header(chart: &Chart) -> String {
  let header = [chart.x_label, "metric", chart.y_label]
    .into_iter()
    .map(|col| format!("{col:<COLUMN_WIDTH$}"))
    .collect::<Vec<_>>()
    .join(COLUMN_PADDING);

  format!("{header}\n{}", "=".repeat(header.trim_end().len()))
}

fn bar(value: f64, max: f64) -> String {
  if max <= 0.0 {
    return String::new();
  }

  "#".repeat((value / max * BAR_COLUMNS as f64).round() as usize)
}

/// Renders a chart as horizontal bars, one group of rows per category.
pub fn format_chart(chart: &Chart) -> Result<String> {
  let mut text = String::new();
  let max = chart.max_value();

  writeln!(text, "{}", chart.title)?;
  writeln!(text, "{}", "=".repeat(chart.title.chars().count()))?;
  writeln!(text)?;
  writeln!(text, "{}", format_header(chart))?;

  if chart.categories.is_empty() {
    writeln!(text, "(no input files)")?;
  }

  for (i, category) in chart.categories.iter().enumerate() {
    for (j, series) in chart.series.iter().enumerate() {
      let category = if j == 0 { category.as_str() } else { "" };
      let bar = bar(series.values[i], max);

      writeln!(
        text,
        "{category:<COLUMN_WIDTH$}{COLUMN_PADDING}{metric:<COLUMN_WIDTH$}{COLUMN_PADDING}{bar:<BAR_COLUMNS$} {annotation:>10}",
        metric = series.metric.name(),
        annotation = series.annotations[i],
      )?;
    }

    writeln!(text, "{}", "-".repeat(COLUMN_WIDTH * 2 + COLUMN_PADDING.len() * 2 + BAR_COLUMNS + 11))?;
  }

  Ok(text)
}
