//! SVG line charts of the unadjusted and back-adjusted columns.

use crate::domain::error::BackadjustError;
use crate::domain::panama::ContinuousSeries;
use crate::ports::series_port::SeriesPort;
use std::fs;
use std::path::PathBuf;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 300.0;
const PADDING: f64 = 40.0;

/// Which series column a chart draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Unadjusted,
    Backadjusted,
}

impl Column {
    fn name(self) -> &'static str {
        match self {
            Column::Unadjusted => "unadjusted",
            Column::Backadjusted => "backadjusted",
        }
    }
}

pub fn format_series_chart(title: &str, series: &ContinuousSeries, column: Column) -> String {
    let values: Vec<f64> = series
        .iter()
        .map(|p| match column {
            Column::Unadjusted => p.unadjusted,
            Column::Backadjusted => p.backadjusted,
        })
        .collect();

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH:.0}" height="{HEIGHT:.0}" viewBox="0 0 {WIDTH:.0} {HEIGHT:.0}">
<rect width="100%" height="100%" fill="white"/>
<text x="{PADDING:.0}" y="{:.0}" font-family="sans-serif" font-size="14">{}</text>
<line x1="{PADDING:.0}" y1="{PADDING:.0}" x2="{PADDING:.0}" y2="{:.0}" stroke="black"/>
<line x1="{PADDING:.0}" y1="{:.0}" x2="{:.0}" y2="{:.0}" stroke="black"/>
"#,
        PADDING / 2.0,
        escape(title),
        HEIGHT - PADDING,
        HEIGHT - PADDING,
        WIDTH - PADDING,
        HEIGHT - PADDING,
    );

    if values.is_empty() {
        svg.push_str(&format!(
            "<text x=\"{:.0}\" y=\"{:.0}\" font-family=\"sans-serif\">No data</text>\n",
            WIDTH / 2.0,
            HEIGHT / 2.0
        ));
        svg.push_str("</svg>\n");
        return svg;
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let plot_width = WIDTH - 2.0 * PADDING;
    let plot_height = HEIGHT - 2.0 * PADDING;

    let range = max - min;
    let scale_y = if range > 0.0 { plot_height / range } else { 1.0 };
    let scale_x = if values.len() > 1 {
        plot_width / (values.len() - 1) as f64
    } else {
        0.0
    };

    let points: Vec<String> = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let x = PADDING + i as f64 * scale_x;
            let y = HEIGHT - PADDING - (v - min) * scale_y;
            format!("{:.1},{:.1}", x, y)
        })
        .collect();

    svg.push_str(&format!(
        "<polyline fill=\"none\" stroke=\"steelblue\" stroke-width=\"1\" points=\"{}\"/>\n",
        points.join(" ")
    ));

    if let (Some(first), Some(last)) = (series.first(), series.last()) {
        svg.push_str(&format!(
            "<text x=\"{PADDING:.0}\" y=\"{:.0}\" font-family=\"sans-serif\" font-size=\"10\">{}</text>\n",
            HEIGHT - PADDING / 2.0,
            first.date
        ));
        svg.push_str(&format!(
            "<text x=\"{:.0}\" y=\"{:.0}\" font-family=\"sans-serif\" font-size=\"10\" text-anchor=\"end\">{}</text>\n",
            WIDTH - PADDING,
            HEIGHT - PADDING / 2.0,
            last.date
        ));
    }
    svg.push_str(&format!(
        "<text x=\"2\" y=\"{PADDING:.0}\" font-family=\"sans-serif\" font-size=\"10\">{max:.2}</text>\n"
    ));
    svg.push_str(&format!(
        "<text x=\"2\" y=\"{:.0}\" font-family=\"sans-serif\" font-size=\"10\">{min:.2}</text>\n",
        HEIGHT - PADDING
    ));
    svg.push_str("</svg>\n");
    svg
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Writes `<SYMBOL>_unadjusted.svg` and `<SYMBOL>_backadjusted.svg`.
pub struct SvgChartWriter {
    output_dir: PathBuf,
}

impl SvgChartWriter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }
}

impl SeriesPort for SvgChartWriter {
    fn write(
        &self,
        instrument: &str,
        series: &ContinuousSeries,
    ) -> Result<Vec<PathBuf>, BackadjustError> {
        fs::create_dir_all(&self.output_dir)?;
        let mut written = Vec::new();
        for column in [Column::Unadjusted, Column::Backadjusted] {
            let path = self
                .output_dir
                .join(format!("{instrument}_{}.svg", column.name()));
            let title = format!("{instrument} {}", column.name());
            fs::write(&path, format_series_chart(&title, series, column))?;
            written.push(path);
        }
        Ok(written)
    }
}
