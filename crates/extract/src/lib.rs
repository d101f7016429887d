pub mod config;
pub mod error;
pub mod llm;
pub mod parser;
pub mod prompt;
pub mod retry;
pub mod schema;

pub use config::{GeminiConfig, RetryConfig};
pub use error::{ErrorKind, ExtractError};
pub use llm::{ExtractionRequest, GeminiClient, HttpTransport, Transport};
pub use parser::{ResponseParser, parse};
pub use prompt::{CHART_SEPARATOR, INSTRUCTION_CONTRACT, InstructionContract};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use schema::{
    ChartDirective, ChartKind, ChartRequest, FALLBACK_CHART_KIND, RawExtraction,
    RawExtractionResult, TabularPayload,
};

/// Text in, validated chart request out.
///
/// Holds no per-request state, so one instance can serve concurrent callers.
pub struct Extractor<T = HttpTransport, S = TokioSleeper> {
    client: GeminiClient<T, S>,
    parser: ResponseParser,
}

impl Extractor {
    pub fn from_config(config: &GeminiConfig) -> anyhow::Result<Self> {
        Ok(Self::new(GeminiClient::new(config)?))
    }
}

impl<T: Transport, S: Sleeper> Extractor<T, S> {
    pub fn new(client: GeminiClient<T, S>) -> Self {
        Self {
            client,
            parser: ResponseParser::default(),
        }
    }

    /// Extract a table and chart suggestion from free text
    pub async fn extract_chart(&self, text: &str) -> Result<ChartRequest, ExtractError> {
        let raw = self.client.extract(text).await;
        self.parser.parse(raw)
    }
}
