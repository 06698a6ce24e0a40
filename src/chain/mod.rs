//! Chains built on the [`ChatModel`] trait.
//!
//! Each chain takes any chat model, so the same chain runs against the
//! GigaChat backend or a test double.
//!
//! # Chains
//!
//! ```text
//! summarize   documents → SUMMARY prompt → model → summary
//! qa          text → splitter → BM25 → QA system prompt + question → model
//! checker     question → draft → assertions → checked → revised answer
//! dialogue    agents take turns; every reply is broadcast to all histories
//! roleplay    character descriptions + opening line → seated dialogue
//! ```

pub mod checker;
pub mod dialogue;
pub mod prompt;
pub mod qa;
pub mod retriever;
pub mod roleplay;
pub mod splitter;
pub mod summarize;

use crate::error::ChainError;
use crate::model::{ChatModel, user_message};

pub use checker::{CheckResult, SelfCheckChain};
pub use dialogue::{DialogueAgent, DialogueSimulator, round_robin};
pub use prompt::PromptTemplate;
pub use qa::{QaAnswer, RetrievalQa};
pub use retriever::{Bm25Retriever, ScoredChunk};
pub use roleplay::{CharacterDescriptions, DndScenario, RoleplaySetup};
pub use splitter::CharacterTextSplitter;
pub use summarize::StuffSummarizer;

/// Sends `prompt` as a single user message and returns the reply.
///
/// # Errors
///
/// Propagates model errors as [`ChainError::Model`].
pub async fn predict(model: &dyn ChatModel, prompt: &str) -> Result<String, ChainError> {
    Ok(model.complete(&[user_message(prompt)], None).await?)
}
