use serde::{Deserialize, Serialize};

use crate::error::ExtractError;

/// Chart kind used whenever the model suggests something we cannot draw.
pub const FALLBACK_CHART_KIND: ChartKind = ChartKind::Bar;

/// Text returned by the model after a successful round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawExtraction {
    pub text: String,
}

impl RawExtraction {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

pub type RawExtractionResult = Result<RawExtraction, ExtractError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    Unknown,
}

impl ChartKind {
    /// Case-sensitive match of the directive token.
    pub fn parse(token: &str) -> Self {
        match token {
            "bar" => ChartKind::Bar,
            "line" => ChartKind::Line,
            "pie" => ChartKind::Pie,
            _ => ChartKind::Unknown,
        }
    }

    pub fn resolve(self) -> Self {
        match self {
            ChartKind::Unknown => FALLBACK_CHART_KIND,
            kind => kind,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Pie => "pie",
            ChartKind::Unknown => "unknown",
        }
    }
}

/// Rows of string fields. Row 0 is the header; every row has the header's width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TabularPayload {
    rows: Vec<Vec<String>>,
    /// The block the rows were read from
    #[serde(skip)]
    text: String,
}

impl TabularPayload {
    /// Builds a payload, enforcing a unique header and a uniform row width.
    pub fn new(rows: Vec<Vec<String>>) -> Result<Self, ExtractError> {
        let Some(header) = rows.first() else {
            return Err(ExtractError::EmptyTable);
        };

        for (i, name) in header.iter().enumerate() {
            if header[..i].contains(name) {
                return Err(ExtractError::MalformedTable {
                    row: 0,
                    detail: format!("duplicate column name '{}'", name),
                });
            }
        }

        let width = header.len();
        for (row, fields) in rows.iter().enumerate().skip(1) {
            if fields.len() != width {
                return Err(ExtractError::MalformedTable {
                    row,
                    detail: format!("expected {} fields, found {}", width, fields.len()),
                });
            }
        }

        let text = join_rows(&rows);
        Ok(Self { rows, text })
    }

    /// Keep `text` as the source of the rows, in place of the joined rows.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Table text as the model wrote it.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn header(&self) -> &[String] {
        &self.rows[0]
    }

    /// Data rows, without the header.
    pub fn records(&self) -> &[Vec<String>] {
        &self.rows[1..]
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header().iter().position(|h| h == name)
    }

    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(self.records().iter().map(|r| r[idx].as_str()).collect())
    }

    pub fn to_csv(&self) -> String {
        join_rows(&self.rows)
    }
}

fn join_rows(rows: &[Vec<String>]) -> String {
    rows.iter()
        .map(|r| r.join(","))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartDirective {
    pub chart_kind: ChartKind,
    pub x_column: String,
    pub y_column: String,
}

/// The validated artifact handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartRequest {
    pub tabular: TabularPayload,
    pub directive: ChartDirective,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_chart_kind_is_case_sensitive() {
        assert_eq!(ChartKind::parse("pie"), ChartKind::Pie);
        assert_eq!(ChartKind::parse("Pie"), ChartKind::Unknown);
        assert_eq!(ChartKind::parse("scatter").resolve(), ChartKind::Bar);
        assert_eq!(ChartKind::Line.resolve(), ChartKind::Line);
    }

    #[test]
    fn test_payload_accessors() {
        let table = TabularPayload::new(vec![row(&["A", "B"]), row(&["1", "2"]), row(&["3", "4"])])
            .unwrap();

        assert_eq!(table.header(), &row(&["A", "B"])[..]);
        assert_eq!(table.records().len(), 2);
        assert_eq!(table.column_index("B"), Some(1));
        assert_eq!(table.column("B"), Some(vec!["2", "4"]));
        assert_eq!(table.column("b"), None);
        assert_eq!(table.to_csv(), "A,B\n1,2\n3,4");
        assert_eq!(table.text(), "A,B\n1,2\n3,4");
    }

    #[test]
    fn test_payload_keeps_source_text() {
        let table = TabularPayload::new(vec![row(&["A", "B"]), row(&["1", "2"])])
            .unwrap()
            .with_text("A, B\n\n\"1\", 2");

        assert_eq!(table.text(), "A, B\n\n\"1\", 2");
        assert_eq!(table.to_csv(), "A,B\n1,2");
    }

    #[test]
    fn test_payload_rejects_ragged_rows() {
        let err = TabularPayload::new(vec![row(&["A", "B"]), row(&["1"])]).unwrap_err();
        assert!(matches!(err, ExtractError::MalformedTable { row: 1, .. }));
    }

    #[test]
    fn test_payload_rejects_empty() {
        assert!(matches!(
            TabularPayload::new(Vec::new()),
            Err(ExtractError::EmptyTable)
        ));
    }
}
