//! Chart command - per-year income, tax and net income as an HTML bar chart
//!
//! Generates a self-contained HTML file with an inline SVG.

use super::InputArgs;
use crate::core::{ChartSeries, ChartStyle};
use clap::Args;
use std::path::PathBuf;

const HEIGHT: f64 = 420.0;
const MARGIN: f64 = 60.0;
const BAR_WIDTH: f64 = 22.0;
const GROUP_GAP: f64 = 26.0;

#[derive(Args, Debug)]
pub struct ChartCommand {
    #[command(flatten)]
    input: InputArgs,

    /// Output file path (default: opens in browser)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the chart series as JSON instead
    #[arg(long, conflicts_with = "output")]
    json: bool,
}

impl ChartCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let (config, report) = self.input.reconcile()?;
        let series = report.rounded()?.series();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&series)?);
            return Ok(());
        }

        let html = render_html(&series, &config.chart);
        if let Some(ref output_path) = self.output {
            std::fs::write(output_path, &html)?;
            println!("Chart written to: {}", output_path.display());
        } else {
            let temp_path = std::env::temp_dir().join("captax-chart.html");
            std::fs::write(&temp_path, &html)?;
            opener::open(&temp_path)?;
            println!("Opened chart in browser: {}", temp_path.display());
        }
        Ok(())
    }
}

/// Full HTML page around the chart
pub fn render_html(series: &ChartSeries, style: &ChartStyle) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Capital income by year</title>\n\
         <style>body {{ font-family: sans-serif; margin: 2em; }}</style>\n</head>\n<body>\n\
         <h1>Capital income by year</h1>\n{}\n</body>\n</html>\n",
        render_svg(series, style)
    )
}

/// Grouped bars per year: income, total tax, net income.
///
/// Income and net income are colored by sign, tax uses the tax color.
pub fn render_svg(series: &ChartSeries, style: &ChartStyle) -> String {
    let datasets: [(&str, &[f64]); 3] = [
        ("Income", &series.income),
        ("Total tax", &series.total_tax),
        ("Net income", &series.net_income),
    ];

    let values = datasets.iter().flat_map(|(_, v)| v.iter().copied());
    let (low, high) = values.fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let span = if high - low > 0.0 { high - low } else { 1.0 };
    let plot_height = HEIGHT - 2.0 * MARGIN;
    let y = |v: f64| MARGIN + (high - v) / span * plot_height;

    let group_width = datasets.len() as f64 * BAR_WIDTH + GROUP_GAP;
    let width = 2.0 * MARGIN + series.years.len() as f64 * group_width;
    let zero = y(0.0);

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width:.0}" height="{HEIGHT:.0}" font-size="12">
<line x1="{MARGIN}" y1="{zero:.1}" x2="{:.1}" y2="{zero:.1}" stroke="black"/>
<text x="4" y="{:.1}">{}</text><text x="4" y="{:.1}">{}</text>
"#,
        width - MARGIN,
        y(high) + 4.0,
        format_axis(high),
        y(low) + 4.0,
        format_axis(low)
    );

    for (i, year) in series.years.iter().enumerate() {
        let group_x = MARGIN + i as f64 * group_width + GROUP_GAP / 2.0;
        for (j, (name, values)) in datasets.iter().enumerate() {
            let value = values.get(i).copied().unwrap_or_default();
            let color = if j == 1 {
                style.tax_color
            } else {
                style.color_for(value)
            };
            let top = y(value).min(zero);
            let bar_height = (y(value) - zero).abs();
            svg.push_str(&format!(
                r#"<rect x="{:.1}" y="{top:.1}" width="{BAR_WIDTH}" height="{bar_height:.1}" fill="{}"><title>{year} {name}: {value:.2}</title></rect>
"#,
                group_x + j as f64 * BAR_WIDTH,
                color.hex()
            ));
        }
        svg.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">{year}</text>
"#,
            group_x + datasets.len() as f64 * BAR_WIDTH / 2.0,
            HEIGHT - MARGIN / 2.0
        ));
    }

    for (j, (name, _)) in datasets.iter().enumerate() {
        let color = if j == 1 {
            style.tax_color
        } else {
            style.positive_color
        };
        let x = MARGIN + j as f64 * 130.0;
        svg.push_str(&format!(
            r#"<rect x="{x:.0}" y="12" width="12" height="12" fill="{}"/><text x="{:.0}" y="22">{name}</text>
"#,
            color.hex(),
            x + 16.0
        ));
    }

    svg.push_str("</svg>");
    svg
}

fn format_axis(value: f64) -> String {
    format!("{:.0}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ChartColor;

    fn series() -> ChartSeries {
        ChartSeries {
            years: vec![2021, 2022],
            deposit: vec![150.0, 0.0],
            income: vec![1084.5, -4920.0],
            total_tax: vec![316.35, 0.0],
            residual_tax: vec![266.35, 0.0],
            net_income: vec![768.15, -4920.0],
        }
    }

    #[test]
    fn one_bar_per_year_and_dataset() {
        let svg = render_svg(&series(), &ChartStyle::default());
        // six bars plus three legend swatches
        assert_eq!(svg.matches("<rect").count(), 9);
        assert!(svg.contains(">2021</text>"));
        assert!(svg.contains(">2022</text>"));
        assert!(svg.ends_with("</svg>"));
    }

    #[test]
    fn one_element_per_line() {
        let svg = render_svg(&series(), &ChartStyle::default());
        let lines: Vec<&str> = svg.lines().collect();
        assert!(lines[0].starts_with("<svg "));
        assert!(lines[1].starts_with("<line "));
        assert_eq!(lines.iter().filter(|l| l.starts_with("<rect ")).count(), 9);
        assert_eq!(lines.last(), Some(&"</svg>"));
    }

    #[test]
    fn negative_values_use_negative_color() {
        let style = ChartStyle {
            negative_color: ChartColor::Blue,
            ..ChartStyle::default()
        };
        let svg = render_svg(&series(), &style);
        assert!(svg.contains(ChartColor::Blue.hex()));
        assert!(svg.contains("2022 Net income: -4920.00"));
    }

    #[test]
    fn empty_series_still_renders() {
        let empty = ChartSeries {
            years: vec![],
            deposit: vec![],
            income: vec![],
            total_tax: vec![],
            residual_tax: vec![],
            net_income: vec![],
        };
        let html = render_html(&empty, &ChartStyle::default());
        assert!(html.contains("<svg"));
        assert!(html.contains("</html>"));
    }
}
