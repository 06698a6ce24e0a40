//! "Stuff" summarization: every document goes into a single prompt.

use tracing::debug;

use super::predict;
use super::prompt::{PromptTemplate, SUMMARY_STUFF_TEMPLATE};
use crate::error::ChainError;
use crate::model::ChatModel;

/// Separator placed between documents inside `{text}`.
const DOCUMENT_SEPARATOR: &str = "\n\n";

/// Summarizes documents with one model call.
#[derive(Debug, Clone)]
pub struct StuffSummarizer {
    prompt: PromptTemplate,
}

impl StuffSummarizer {
    /// Creates a summarizer with the default summary prompt.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Template`] if the built-in prompt fails to parse.
    pub fn new() -> Result<Self, ChainError> {
        Self::with_prompt(PromptTemplate::new(SUMMARY_STUFF_TEMPLATE)?)
    }

    /// Creates a summarizer with a custom prompt.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Template`] if the prompt does not use `{text}`.
    pub fn with_prompt(prompt: PromptTemplate) -> Result<Self, ChainError> {
        if !prompt.input_variables().iter().any(|v| v == "text") {
            return Err(ChainError::Template {
                message: "summary prompt must reference {text}".to_string(),
            });
        }
        Ok(Self { prompt })
    }

    /// Summarizes `documents`.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::EmptyInput`] if every document is blank, or a
    /// model error.
    pub async fn summarize(
        &self,
        model: &dyn ChatModel,
        documents: &[String],
    ) -> Result<String, ChainError> {
        let text = documents
            .iter()
            .map(|d| d.trim())
            .filter(|d| !d.is_empty())
            .collect::<Vec<_>>()
            .join(DOCUMENT_SEPARATOR);
        if text.is_empty() {
            return Err(ChainError::EmptyInput {
                what: "documents to summarize".to_string(),
            });
        }

        debug!(documents = documents.len(), chars = text.chars().count(), "summarizing");
        let prompt = self.prompt.format_with(&[("text", text.as_str())])?;
        predict(model, &prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::ScriptedModel;

    #[tokio::test]
    async fn test_summarize_stuffs_all_documents() {
        let model = ScriptedModel::new(&["краткое содержание"]);
        let summarizer = StuffSummarizer::new().unwrap_or_else(|_| unreachable!());
        let docs = vec!["Первый абзац.".to_string(), "Второй абзац.".to_string()];

        let summary = summarizer
            .summarize(&model, &docs)
            .await
            .unwrap_or_default();
        assert_eq!(summary, "краткое содержание");

        let calls = model.calls();
        assert_eq!(calls.len(), 1);
        let prompt = &calls[0][0].content;
        assert!(prompt.contains("Первый абзац.\n\nВторой абзац."));
        assert!(prompt.starts_with("Напиши краткое"));
    }

    #[tokio::test]
    async fn test_summarize_rejects_blank_input() {
        let model = ScriptedModel::default();
        let summarizer = StuffSummarizer::new().unwrap_or_else(|_| unreachable!());
        let result = summarizer
            .summarize(&model, &["   ".to_string()])
            .await;
        assert!(matches!(result, Err(ChainError::EmptyInput { .. })));
        assert!(model.calls().is_empty());
    }

    #[test]
    fn test_custom_prompt_requires_text_variable() {
        let prompt = PromptTemplate::new("Summarize {doc}").unwrap_or_else(|_| unreachable!());
        assert!(StuffSummarizer::with_prompt(prompt).is_err());
    }
}
