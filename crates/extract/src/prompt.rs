/// The system instruction sent with every extraction request.
///
/// The remote model is a black box; this text is the only schema it agrees
/// to. Bump `version` whenever `text` or `separator` change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionContract {
    pub version: u32,
    pub separator: &'static str,
    pub text: &'static str,
}

pub const CHART_SEPARATOR: &str = "---CHART---";

pub const INSTRUCTION_CONTRACT: InstructionContract = InstructionContract {
    version: 1,
    separator: CHART_SEPARATOR,
    text: r#"You are a data extraction assistant. Read the article supplied by the user and answer in exactly two parts.

PART 1: The Data
- Extract any structured data you find in the article.
- Format this data as a clean, simple CSV (Comma Separated Values).
- The first row MUST be the column headers.
- Column headers must be unique.
- Do not use commas inside values.

PART 2: The Chart Suggestion
- After the CSV data, add a separator line: '---CHART---'
- On a new line, suggest the best chart type: bar, line or pie.
- On the next line, suggest the best column for the X-AXIS.
- On the next line, suggest the best column for the Y-AXIS.

Output nothing else: no markdown, no code blocks, no explanations.

EXAMPLE RESPONSE:
State,Literacy Rate,Internet Penetration
Kerala,94.0,63.0
Delhi,86.2,68.0
Mizoram,91.3,55.0
---CHART---
bar
State
Literacy Rate"#,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ResponseParser;
    use crate::schema::{ChartKind, RawExtraction};

    #[test]
    fn test_contract_mentions_its_separator() {
        assert_eq!(INSTRUCTION_CONTRACT.separator, CHART_SEPARATOR);
        assert_eq!(INSTRUCTION_CONTRACT.text.matches(CHART_SEPARATOR).count(), 2);
    }

    #[test]
    fn test_contract_example_satisfies_parser() {
        let example = INSTRUCTION_CONTRACT
            .text
            .split("EXAMPLE RESPONSE:")
            .nth(1)
            .unwrap();

        let request = ResponseParser::default()
            .parse(Ok(RawExtraction::new(example)))
            .unwrap();

        assert_eq!(request.directive.chart_kind, ChartKind::Bar);
        assert_eq!(request.directive.x_column, "State");
        assert_eq!(request.directive.y_column, "Literacy Rate");
        assert_eq!(request.tabular.records().len(), 3);
    }
}
