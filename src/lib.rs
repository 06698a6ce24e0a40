//! # gigachain
//!
//! A GigaChat chat-model backend behind a provider-agnostic [`ChatModel`]
//! trait, plus chains built on it: prompt templates, stuff summarization,
//! retrieval QA, a self-checking chain and a multi-agent dialogue.
//!
//! ## Example
//!
//! ```no_run
//! use gigachain::{ChatModel, GigaChatConfig, GigaChatModel, system_message, user_message};
//!
//! # async fn demo() -> gigachain::Result<()> {
//! let config = GigaChatConfig::builder().from_env().build()?;
//! let model = GigaChatModel::new(config)?;
//! let reply = model
//!     .complete(&[system_message("You are helpful"), user_message("Hi")], None)
//!     .await?;
//! # let _ = reply;
//! # Ok(())
//! # }
//! ```

pub mod chain;
pub mod cli;
pub mod error;
pub mod model;

pub use chain::{
    CharacterTextSplitter, CheckResult, DialogueAgent, DialogueSimulator, DndScenario,
    PromptTemplate, QaAnswer, RetrievalQa, SelfCheckChain, StuffSummarizer, predict,
};
pub use error::{ChainError, CommandError, Error, ModelError, Result};
pub use model::{
    ChatChunk, ChatModel, GigaChatConfig, GigaChatModel, Message, Role, assistant_message,
    system_message, user_message,
};
