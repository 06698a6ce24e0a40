//! Retrieval-augmented question answering.
//!
//! Splits a document, indexes the chunks with BM25, and answers each
//! question from the top-ranked chunks.

use serde::Serialize;
use tracing::debug;

use super::prompt::{PromptTemplate, QA_SYSTEM_TEMPLATE};
use super::retriever::{Bm25Retriever, DEFAULT_TOP_K, ScoredChunk};
use super::splitter::CharacterTextSplitter;
use crate::error::ChainError;
use crate::model::{ChatModel, system_message, user_message};

/// Separator between retrieved chunks inside `{context}`.
const CONTEXT_SEPARATOR: &str = "\n\n";

/// An answer together with the chunks it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct QaAnswer {
    /// Model answer.
    pub answer: String,
    /// Retrieved chunks, best first.
    pub sources: Vec<ScoredChunk>,
}

/// Question answering over an indexed document.
#[derive(Debug)]
pub struct RetrievalQa {
    retriever: Bm25Retriever,
    prompt: PromptTemplate,
    top_k: usize,
}

impl RetrievalQa {
    /// Splits and indexes `text`.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::EmptyInput`] if the splitter yields no chunks,
    /// or [`ChainError::Index`] if indexing fails.
    pub fn from_text(text: &str, splitter: &CharacterTextSplitter) -> Result<Self, ChainError> {
        let chunks = splitter.split_text(text);
        if chunks.is_empty() {
            return Err(ChainError::EmptyInput {
                what: "document for question answering".to_string(),
            });
        }
        debug!(chunks = chunks.len(), "indexed document for QA");
        Ok(Self {
            retriever: Bm25Retriever::new(chunks)?,
            prompt: PromptTemplate::new(QA_SYSTEM_TEMPLATE)?,
            top_k: DEFAULT_TOP_K,
        })
    }

    /// Sets how many chunks are placed into the context.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::InvalidConfig`] if `top_k` is zero.
    pub fn with_top_k(mut self, top_k: usize) -> Result<Self, ChainError> {
        if top_k == 0 {
            return Err(ChainError::InvalidConfig {
                message: "top_k must be positive".to_string(),
            });
        }
        self.top_k = top_k;
        Ok(self)
    }

    /// Replaces the system prompt.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Template`] if the prompt does not use `{context}`.
    pub fn with_prompt(mut self, prompt: PromptTemplate) -> Result<Self, ChainError> {
        if !prompt.input_variables().iter().any(|v| v == "context") {
            return Err(ChainError::Template {
                message: "QA prompt must reference {context}".to_string(),
            });
        }
        self.prompt = prompt;
        Ok(self)
    }

    /// Number of indexed chunks.
    pub fn chunk_count(&self) -> usize {
        self.retriever.len()
    }

    /// Answers `question` from the retrieved context.
    ///
    /// Sends `[system(prompt with context), user(question)]`.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::EmptyInput`] for a blank question,
    /// [`ChainError::Index`] if retrieval fails, or a model error.
    pub async fn ask(&self, model: &dyn ChatModel, question: &str) -> Result<QaAnswer, ChainError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ChainError::EmptyInput {
                what: "question".to_string(),
            });
        }

        let sources = self.retriever.retrieve(question, self.top_k)?;
        debug!(retrieved = sources.len(), "retrieved context");
        let context = sources
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);
        let system = self.prompt.format_with(&[("context", context.as_str())])?;

        let answer = model
            .complete(&[system_message(&system), user_message(question)], None)
            .await?;
        Ok(QaAnswer { answer, sources })
    }
}
