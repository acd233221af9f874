use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::debug;

use crate::config::ExtractionSettings;
use crate::error::{AdvError, Result};

const SYSTEM_PROMPT: &str =
    "You are a financial data extraction assistant. Do not infer or fabricate data.";

/// Structured-extraction service: document text in, labeled response out.
///
/// Treated as a pure text-in/text-out collaborator; the batch never sees
/// the transport.
#[async_trait]
pub trait FeeExtractor {
    /// Return the labeled fee-structure response for a document's text.
    async fn extract_fee_structure(&self, document_text: &str) -> Result<String>;
}

/// Chat-completion client for OpenAI-compatible endpoints.
#[derive(Debug)]
pub struct OpenAiExtractor {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiExtractor {
    /// Build a client from settings plus the `OPENAI_API_KEY` environment
    /// variable (a `.env` file is honored).
    pub fn from_env(settings: &ExtractionSettings) -> Result<Self> {
        dotenvy::dotenv().ok();
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| AdvError::Config("OPENAI_API_KEY is not set".into()))?;

        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base) = &settings.api_base {
            config = config.with_api_base(base);
        }

        Ok(Self {
            client: Client::with_config(config),
            model: settings.model.clone(),
        })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

/// The fixed instruction template for SEC Form ADV fee extraction.
fn fee_prompt(document_text: &str) -> String {
    format!(
        "From the following SEC Form ADV text, assume an investment of $500,000 with a 50/50 allocation between equities and bonds.\n\
         \n\
         Extract only if explicitly stated in the text (do not infer or invent):\n\
         - The name of the platform or advisory firm\n\
         - The type of advisory model: Robo-advisor, Hybrid, or Traditional\n\
         - If available, the name of the fund or strategy being managed\n\
         - The highest applicable management fee (numeric %, for a $500,000 investment)\n\
         - The applicable transaction or trading fees (numeric %, if any)\n\
         - A portfolio turnover rate (float %, only if explicitly mentioned)\n\
         - The assets under management (AUM) if disclosed (numeric only)\n\
         - A numeric estimate of tax efficiency on a 0-10 scale, based on the following standardized rule:\n\
           Tax efficiency score is computed based on the presence of up to five features: (1) tax-loss harvesting, (2) tax-optimized asset location,\n\
           (3) use of ETFs or index funds, (4) turnover rate < 50%, (5) client-specific tax optimization; 2 points each, capped at 10.\n\
         - The document date (e.g. \"as of February 28, 2025\")\n\
         \n\
         If any of these data points are not present in the document, leave them blank.\n\
         Do not create or guess any value. Do not make assumptions.\n\
         \n\
         Also include a short paragraph explaining how each figure was sourced.\n\
         \n\
         Document Text:\n\
         {document_text}\n\
         \n\
         Provide the response in this format:\n\
         Platform: <name>\n\
         Advisor Type: <Robo/Hybrid/Traditional>\n\
         Fund Name: <name or blank>\n\
         Management Fees: <numeric value or blank>\n\
         Transaction Fees: <numeric value or blank>\n\
         AUM: <numeric value or blank>\n\
         Turnover Rate: <percentage as float or blank>\n\
         Tax Efficiency: <numeric 0-10 scale or blank>\n\
         Document Date: <YYYY-MM-DD or blank>\n\
         Notes: <short paragraph explaining sources or estimations>"
    )
}

#[async_trait]
impl FeeExtractor for OpenAiExtractor {
    async fn extract_fee_structure(&self, document_text: &str) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(0.0)
            .messages([
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(SYSTEM_PROMPT)
                    .build()
                    .map_err(|e| AdvError::Service(e.to_string()))?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(fee_prompt(document_text))
                    .build()
                    .map_err(|e| AdvError::Service(e.to_string()))?
                    .into(),
            ])
            .build()
            .map_err(|e| AdvError::Service(e.to_string()))?;

        debug!(model = %self.model, "requesting fee structure");

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AdvError::Service(e.to_string()))?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| AdvError::Service("no content in completion response".into()))?;

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_document_and_template() {
        let prompt = fee_prompt("ADVISORY FIRM BROCHURE TEXT");
        assert!(prompt.contains("ADVISORY FIRM BROCHURE TEXT"));
        assert!(prompt.contains("Platform: <name>"));
        assert!(prompt.contains("Tax Efficiency: <numeric 0-10 scale or blank>"));
        assert!(prompt.contains("$500,000"));
    }

    #[test]
    fn from_env_requires_api_key() {
        // Only meaningful when the variable is absent in the environment.
        if std::env::var("OPENAI_API_KEY").is_err() {
            let err = OpenAiExtractor::from_env(&ExtractionSettings::default()).unwrap_err();
            assert!(matches!(err, AdvError::Config(_)));
        }
    }
}
