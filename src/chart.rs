use std::collections::BTreeSet;

use chrono::NaiveDate;
use rand::Rng;
use serde_json::json;

use crate::{error::ChartError, models::Field, series::PriceSeries};

/// Spectral, 4 classes.
pub const PALETTE: [&str; 4] = ["#2b83ba", "#abdda4", "#fdae61", "#d7191c"];

pub const WIDTH: u32 = 800;
pub const HEIGHT: u32 = 600;
pub const LINE_WIDTH: u32 = 2;

const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

/// One plotted line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSpec {
    pub field: Field,
    pub legend: String,
    pub color: &'static str,
    pub points: Vec<(NaiveDate, Option<f64>)>,
}

/// Everything needed to draw the chart, independent of the js library.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub lines: Vec<LineSpec>,
}

/// The two html fragments a page needs to show a chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub script: String,
    pub div: String,
}

impl ChartSpec {
    /// One line per field, in selection order.
    ///
    /// Colors are taken from the front of [`PALETTE`] by position, so the
    /// same field can get a different color depending on what else is
    /// selected alongside it.
    pub fn build(
        series: &PriceSeries,
        fields: &BTreeSet<Field>,
        title: &str,
    ) -> Result<Self, ChartError> {
        let palette = &PALETTE[..fields.len().min(PALETTE.len())];

        let lines = fields
            .iter()
            .zip(palette.iter().copied())
            .map(|(field, color)| {
                let column = field.column();
                let points = series
                    .points(column)
                    .ok_or_else(|| ChartError::MissingColumn(column.to_string()))?;
                Ok(LineSpec {
                    field: *field,
                    legend: column.to_string(),
                    color,
                    points,
                })
            })
            .collect::<Result<Vec<_>, ChartError>>()?;

        Ok(ChartSpec {
            title: title.to_string(),
            width: WIDTH,
            height: HEIGHT,
            lines,
        })
    }

    /// Vega-Lite description of the chart: temporal x, one colored line per
    /// series, colors pinned through an explicit scale.
    pub fn to_vega_lite(&self) -> serde_json::Value {
        let values: Vec<serde_json::Value> = self
            .lines
            .iter()
            .flat_map(|line| {
                line.points.iter().map(move |(date, value)| {
                    json!({
                        "date": date.format("%Y-%m-%d").to_string(),
                        "series": line.legend,
                        "value": value,
                    })
                })
            })
            .collect();
        let domain: Vec<&str> = self.lines.iter().map(|l| l.legend.as_str()).collect();
        let range: Vec<&str> = self.lines.iter().map(|l| l.color).collect();

        json!({
            "$schema": VEGA_LITE_SCHEMA,
            "title": self.title,
            "width": self.width,
            "height": self.height,
            "data": { "values": values },
            "mark": { "type": "line", "strokeWidth": LINE_WIDTH },
            "encoding": {
                "x": { "field": "date", "type": "temporal", "title": "Date" },
                "y": { "field": "value", "type": "quantitative", "title": "Price" },
                "color": {
                    "field": "series",
                    "type": "nominal",
                    "sort": domain,
                    "scale": { "domain": domain, "range": range },
                    "legend": { "title": null }
                }
            }
        })
    }

    /// Produces the `<script>` and `<div>` fragments for a page.
    pub fn embed(&self, element_id: &str) -> Result<Rendered, ChartError> {
        let spec = serde_json::to_string(&self.to_vega_lite())
            .map_err(|err| ChartError::Encode(err.to_string()))?;
        let target = serde_json::to_string(&format!("#{element_id}"))
            .map_err(|err| ChartError::Encode(err.to_string()))?;

        let script = format!(
            "<script type=\"text/javascript\">\nvegaEmbed({}, {}, {{\"actions\": false}}).catch(console.error);\n</script>",
            script_safe(&target),
            script_safe(&spec)
        );
        let div = format!("<div id=\"{element_id}\" class=\"price-chart\"></div>");

        Ok(Rendered { script, div })
    }
}

/// Builds the chart for `fields` and returns the html fragments.
///
/// An empty selection is not an error; it yields a chart with no lines.
pub fn render(
    series: &PriceSeries,
    fields: &BTreeSet<Field>,
    title: &str,
) -> Result<Rendered, ChartError> {
    let spec = ChartSpec::build(series, fields, title)?;
    log::debug!("rendering {:?} with {} line(s)", spec.title, spec.lines.len());
    spec.embed(&element_id())
}

fn element_id() -> String {
    format!("chart-{:016x}", rand::thread_rng().gen::<u64>())
}

// `<`, `>` and `&` only occur inside json strings, where the \u escapes are
// equivalent, so the text can never close the surrounding script tag.
fn script_safe(json: &str) -> String {
    json.replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}
