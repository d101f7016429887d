//! Split the model's answer into a table and a chart directive

use crate::error::ExtractError;
use crate::prompt::INSTRUCTION_CONTRACT;
use crate::schema::{ChartDirective, ChartKind, ChartRequest, RawExtractionResult, TabularPayload};

/// Characters of the reply quoted back when the separator is missing.
const EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct ResponseParser {
    separator: String,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new(INSTRUCTION_CONTRACT.separator)
    }
}

impl ResponseParser {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn parse(&self, raw: RawExtractionResult) -> Result<ChartRequest, ExtractError> {
        let raw = raw?;

        // First occurrence wins; later ones stay in the directive block
        let (tabular_block, directive_block) = raw
            .text
            .split_once(self.separator.as_str())
            .ok_or_else(|| ExtractError::MissingSeparator {
                separator: self.separator.clone(),
                excerpt: excerpt(&raw.text),
            })?;

        let (kind, x_column, y_column) = parse_directive(directive_block.trim())?;
        let tabular = parse_table(tabular_block.trim())?;

        for column in [&x_column, &y_column] {
            if tabular.column_index(column).is_none() {
                return Err(ExtractError::UnknownColumn(column.clone()));
            }
        }

        Ok(ChartRequest {
            tabular,
            directive: ChartDirective {
                chart_kind: kind.resolve(),
                x_column,
                y_column,
            },
        })
    }
}

/// Parse with the separator of the current instruction contract.
pub fn parse(raw: RawExtractionResult) -> Result<ChartRequest, ExtractError> {
    ResponseParser::default().parse(raw)
}

fn excerpt(text: &str) -> String {
    let text = text.trim();
    match text.char_indices().nth(EXCERPT_CHARS) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

fn parse_directive(block: &str) -> Result<(ChartKind, String, String), ExtractError> {
    let lines: Vec<&str> = block
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(3)
        .collect();

    match lines.as_slice() {
        [kind, x, y] => Ok((ChartKind::parse(kind), x.to_string(), y.to_string())),
        _ => Err(ExtractError::MalformedDirective(format!(
            "expected chart kind, x column and y column, found {} line(s)",
            lines.len()
        ))),
    }
}

/// Reads the block as CSV: quoted fields may hold commas, fields are trimmed
/// and blank lines skipped. Width and header checks happen in
/// [`TabularPayload::new`].
fn parse_table(block: &str) -> Result<TabularPayload, ExtractError> {
    if block.is_empty() {
        return Err(ExtractError::EmptyTable);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(block.as_bytes());

    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ExtractError::MalformedTable {
            row: rows.len(),
            detail: e.to_string(),
        })?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(TabularPayload::new(rows)?.with_text(block))
}
