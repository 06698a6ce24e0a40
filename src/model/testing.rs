//! Scripted chat model for chain tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::message::{ChatChunk, Message};
use super::provider::{ChatModel, ChunkStream};
use crate::error::ModelError;

/// Replays queued replies and records every request it receives.
///
/// Once the queue is empty, replies with `reply-<n>` where `n` counts calls.
#[derive(Default)]
pub(crate) struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedModel {
    pub(crate) fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(ToString::to_string).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn llm_type(&self) -> &'static str {
        "scripted"
    }

    async fn complete(
        &self,
        messages: &[Message],
        _stop: Option<&[String]>,
    ) -> Result<String, ModelError> {
        let n = {
            let mut calls = self.calls.lock().map_err(ModelError::service)?;
            calls.push(messages.to_vec());
            calls.len()
        };
        let next = self
            .replies
            .lock()
            .map_err(ModelError::service)?
            .pop_front();
        Ok(next.unwrap_or_else(|| format!("reply-{n}")))
    }

    async fn stream(
        &self,
        messages: &[Message],
        stop: Option<&[String]>,
    ) -> Result<ChunkStream, ModelError> {
        let content = self.complete(messages, stop).await?;
        Ok(Box::pin(futures_util::stream::once(async move {
            Ok(ChatChunk { content })
        })))
    }
}
