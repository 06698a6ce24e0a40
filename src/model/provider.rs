//! Pluggable chat-model trait.
//!
//! Backends translate provider-agnostic [`Message`] sequences into their
//! own wire requests. Chains depend only on this trait, never on a
//! concrete backend.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use serde_json::Value;

use super::message::{ChatChunk, Message, assistant_message};
use crate::error::ModelError;

/// Boxed stream of output chunks returned by [`ChatModel::stream`].
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatChunk, ModelError>> + Send>>;

/// Trait for chat-model backends.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Backend type identifier (e.g., `"giga-chat-model"`).
    fn llm_type(&self) -> &'static str;

    /// Parameters that identify this model instance, for logging.
    fn identifying_params(&self) -> Value {
        Value::Object(serde_json::Map::new())
    }

    /// Runs a single-turn completion over the ordered `messages`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] on authentication, transport, or parse failures.
    async fn complete(
        &self,
        messages: &[Message],
        stop: Option<&[String]>,
    ) -> Result<String, ModelError>;

    /// Streams the completion as chunks.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if the stream cannot be started.
    async fn stream(
        &self,
        messages: &[Message],
        stop: Option<&[String]>,
    ) -> Result<ChunkStream, ModelError>;

    /// Completes `messages` and wraps the reply as an assistant message.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`ChatModel::complete`].
    async fn invoke(&self, messages: &[Message]) -> Result<Message, ModelError> {
        let text = self.complete(messages, None).await?;
        Ok(assistant_message(&text))
    }
}
