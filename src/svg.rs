use std::fmt::Write;

use anyhow::Result;

use crate::chart::Chart;

const TICK_SPACING: f64 = 120.0;
const PLOT_HEIGHT: f64 = 320.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 200.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 110.0;
const COLORS: [&str; 3] = ["#1f77b4", "#ff7f0e", "#2ca02c"];

fn escape(text: &str) -> String {
  text
    .replace('&', "&amp;")
    .replace('<', "&lt;")
    .replace('>', "&gt;")
    .replace('"', "&quot;")
}

/// Renders a chart as a standalone SVG document, with bars grouped around one
/// tick per category.
pub fn render(chart: &Chart) -> Result<String> {
  let plot_width = TICK_SPACING * chart.groups().max(1) as f64;
  let width = MARGIN_LEFT + plot_width + MARGIN_RIGHT;
  let height = MARGIN_TOP + PLOT_HEIGHT + MARGIN_BOTTOM;
  let baseline = MARGIN_TOP + PLOT_HEIGHT;

  let max = chart.max_value();
  let scale = if max > 0.0 { PLOT_HEIGHT / max } else { 0.0 };
  let tick_x = |i: usize| MARGIN_LEFT + TICK_SPACING * (i as f64 + 0.5);

  let mut svg = String::new();
  writeln!(
    svg,
    r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" font-family="sans-serif">"#
  )?;
  writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#)?;
  writeln!(
    svg,
    r#"<text x="{x}" y="30" text-anchor="middle" font-size="16">{title}</text>"#,
    x = MARGIN_LEFT + plot_width / 2.0,
    title = escape(&chart.title),
  )?;

  // axes
  writeln!(
    svg,
    r#"<line x1="{MARGIN_LEFT}" y1="{MARGIN_TOP}" x2="{MARGIN_LEFT}" y2="{baseline}" stroke="black"/>"#
  )?;
  writeln!(
    svg,
    r#"<line x1="{MARGIN_LEFT}" y1="{baseline}" x2="{x2}" y2="{baseline}" stroke="black"/>"#,
    x2 = MARGIN_LEFT + plot_width,
  )?;
  writeln!(
    svg,
    r#"<text x="20" y="{y}" text-anchor="middle" font-size="12" transform="rotate(-90 20 {y})">{label}</text>"#,
    y = MARGIN_TOP + PLOT_HEIGHT / 2.0,
    label = escape(chart.y_label),
  )?;
  writeln!(
    svg,
    r#"<text x="{x}" y="{y}" text-anchor="middle" font-size="12">{label}</text>"#,
    x = MARGIN_LEFT + plot_width / 2.0,
    y = height - 10.0,
    label = escape(chart.x_label),
  )?;

  for (i, category) in chart.categories.iter().enumerate() {
    let x = tick_x(i);
    let y = baseline + 15.0;
    writeln!(
      svg,
      r#"<text x="{x}" y="{y}" text-anchor="end" font-size="11" transform="rotate(-45 {x} {y})">{name}</text>"#,
      name = escape(category),
    )?;
  }

  for (j, series) in chart.series.iter().enumerate() {
    let color = COLORS[j % COLORS.len()];
    let bar_width = series.width * TICK_SPACING;

    for (i, (value, annotation)) in series.values.iter().zip(&series.annotations).enumerate() {
      let center = tick_x(i) + series.offset * TICK_SPACING;
      let bar_height = value * scale;
      let top = baseline - bar_height;

      writeln!(
        svg,
        r#"<rect x="{x}" y="{top}" width="{bar_width}" height="{bar_height}" fill="{color}"/>"#,
        x = center - bar_width / 2.0,
      )?;
      writeln!(
        svg,
        r#"<text x="{center}" y="{y}" text-anchor="middle" font-size="8">{annotation}</text>"#,
        y = top - 3.0,
      )?;
    }

    let legend_x = MARGIN_LEFT + plot_width + 20.0;
    let legend_y = MARGIN_TOP + 20.0 * j as f64;
    writeln!(
      svg,
      r#"<rect x="{legend_x}" y="{legend_y}" width="12" height="12" fill="{color}"/>"#
    )?;
    writeln!(
      svg,
      r#"<text x="{x}" y="{y}" font-size="12">{name}</text>"#,
      x = legend_x + 18.0,
      y = legend_y + 10.0,
      name = escape(series.metric.name()),
    )?;
  }

  writeln!(svg, "</svg>")?;

  Ok(svg)
}
