pub mod plots;

use extract::{ChartKind, ChartRequest};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Table has a header but no data rows")]
    NoData,

    /// `row` counts the header as row 0
    #[error("Column '{column}' has a non-numeric value '{value}' at row {row}")]
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Pie values must be non-negative with a positive total")]
    InvalidPieValues,

    #[error("Drawing error: {0}")]
    Drawing(String),
}

impl RenderError {
    pub fn kind(&self) -> &'static str {
        match self {
            RenderError::NoData => "no_data",
            RenderError::NonNumeric { .. } => "non_numeric",
            RenderError::InvalidPieValues => "invalid_pie_values",
            RenderError::Drawing(_) => "drawing",
        }
    }
}

/// An SVG fragment ready to embed in a page.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedChart {
    pub title: String,
    pub kind: ChartKind,
    pub svg: String,
}

/// Categories from the x column and numbers from the y column, in row order.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl Series {
    pub fn from_request(request: &ChartRequest) -> Result<Self, RenderError> {
        let table = &request.tabular;
        let directive = &request.directive;

        let (Some(labels), Some(raw_values)) = (
            table.column(&directive.x_column),
            table.column(&directive.y_column),
        ) else {
            // ChartRequest guarantees both columns exist
            return Err(RenderError::NoData);
        };

        if labels.is_empty() {
            return Err(RenderError::NoData);
        }

        let values = raw_values
            .iter()
            .enumerate()
            .map(|(i, raw)| parse_number(raw).ok_or_else(|| RenderError::NonNumeric {
                column: directive.y_column.clone(),
                row: i + 1,
                value: raw.to_string(),
            }))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            labels: labels.into_iter().map(str::to_string).collect(),
            values,
        })
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

pub fn chart_title(request: &ChartRequest) -> String {
    let x = &request.directive.x_column;
    let y = &request.directive.y_column;
    match request.directive.chart_kind {
        ChartKind::Line => format!("Line Chart of {} by {}", y, x),
        ChartKind::Pie => format!("Pie Chart of {}", y),
        ChartKind::Bar | ChartKind::Unknown => format!("Bar Chart of {} by {}", y, x),
    }
}

/// Draw a validated chart request as SVG.
pub fn render(request: &ChartRequest) -> Result<RenderedChart, RenderError> {
    let series = Series::from_request(request)?;
    let title = chart_title(request);
    let kind = request.directive.chart_kind.resolve();

    let svg = match kind {
        ChartKind::Line => plots::line_chart(&title, request, &series)?,
        ChartKind::Pie => plots::pie_chart(&title, &series)?,
        _ => plots::bar_chart(&title, request, &series)?,
    };

    debug!(kind = kind.as_str(), points = series.values.len(), svg_bytes = svg.len(), "Rendered chart");

    Ok(RenderedChart { title, kind, svg })
}
