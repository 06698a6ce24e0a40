//! Chat-model layer.
//!
//! Defines the provider-agnostic [`Message`] model and the [`ChatModel`]
//! trait, plus the GigaChat backend that implements it.
//!
//! # Request flow
//!
//! ```text
//! &[Message] → GigaChatModel::complete
//!   ├── token held? ── no ──→ POST /v1/token (basic auth) → hold `tok`
//!   ├── serialize messages by role
//!   ├── POST /v1/chat/completions (bearer auth)
//!   └── choices[0].message.content
//! ```

pub mod config;
pub mod gigachat;
pub mod message;
pub mod provider;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{GigaChatConfig, GigaChatConfigBuilder};
pub use gigachat::GigaChatModel;
pub use message::{
    ChatChunk, Message, Role, assistant_function_call_message, assistant_message, chat_message,
    function_message, system_message, user_message,
};
pub use provider::{ChatModel, ChunkStream};
