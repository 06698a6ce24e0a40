//! Turn-based multi-agent dialogue.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::ChainError;
use crate::model::{ChatModel, Message, user_message};

/// First line of every agent's history.
pub const HISTORY_HEADER: &str = "Вот разговор:";

/// Picks the index of the next speaker from the step counter and the agents.
pub type SpeakerSelector = fn(usize, &[DialogueAgent]) -> usize;

/// Default selector: agents speak in order, `step % n`.
pub fn round_robin(step: usize, agents: &[DialogueAgent]) -> usize {
    step % agents.len().max(1)
}

/// A named participant backed by a chat model.
pub struct DialogueAgent {
    name: String,
    system_message: Message,
    model: Arc<dyn ChatModel>,
    history: Vec<String>,
}

impl fmt::Debug for DialogueAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogueAgent")
            .field("name", &self.name)
            .field("model", &self.model.llm_type())
            .field("history", &self.history.len())
            .finish_non_exhaustive()
    }
}

impl DialogueAgent {
    /// Creates an agent with a fresh history.
    pub fn new(name: impl Into<String>, system_message: Message, model: Arc<dyn ChatModel>) -> Self {
        Self {
            name: name.into(),
            system_message,
            model,
            history: vec![HISTORY_HEADER.to_string()],
        }
    }

    /// Agent name, also used as the speaker prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The system message sent with every turn.
    pub fn system_message(&self) -> &Message {
        &self.system_message
    }

    /// Lines heard so far, starting with [`HISTORY_HEADER`].
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Forgets everything but the header.
    pub fn reset(&mut self) {
        self.history.clear();
        self.history.push(HISTORY_HEADER.to_string());
    }

    /// Asks the model for this agent's next line.
    ///
    /// # Errors
    ///
    /// Propagates model errors.
    pub async fn send(&self) -> Result<String, ChainError> {
        let prefix = format!("{}:", self.name);
        let prompt = self
            .history
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(prefix.as_str()))
            .collect::<Vec<_>>()
            .join("\n");
        let messages = [self.system_message.clone(), user_message(&prompt)];
        Ok(self.model.complete(&messages, None).await?)
    }

    /// Records that `name` said `message`.
    pub fn receive(&mut self, name: &str, message: &str) {
        self.history.push(format!("{name}: {message}"));
    }
}

/// Runs a conversation between agents, broadcasting each line to everyone.
pub struct DialogueSimulator {
    agents: Vec<DialogueAgent>,
    step: usize,
    select_next_speaker: SpeakerSelector,
}

impl fmt::Debug for DialogueSimulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogueSimulator")
            .field("agents", &self.agents)
            .field("step", &self.step)
            .finish_non_exhaustive()
    }
}

impl DialogueSimulator {
    /// Creates a simulator.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::InvalidConfig`] when `agents` is empty.
    pub fn new(agents: Vec<DialogueAgent>, selector: SpeakerSelector) -> Result<Self, ChainError> {
        if agents.is_empty() {
            return Err(ChainError::InvalidConfig {
                message: "dialogue needs at least one agent".to_string(),
            });
        }
        Ok(Self {
            agents,
            step: 0,
            select_next_speaker: selector,
        })
    }

    /// Participants in seating order.
    pub fn agents(&self) -> &[DialogueAgent] {
        &self.agents
    }

    /// Number of turns taken, injected lines included.
    pub fn current_step(&self) -> usize {
        self.step
    }

    /// Clears every agent's history. The step counter is kept.
    pub fn reset(&mut self) {
        for agent in &mut self.agents {
            agent.reset();
        }
    }

    /// Broadcasts an opening line from `name` and advances the step.
    pub fn inject(&mut self, name: &str, message: &str) {
        self.broadcast(name, message);
        self.step += 1;
    }

    /// Lets the next speaker talk and broadcasts the line.
    ///
    /// Returns `(speaker, message)`.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::InvalidConfig`] if the selector picks an index
    /// out of range, or the speaker's model error.
    pub async fn step(&mut self) -> Result<(String, String), ChainError> {
        let index = (self.select_next_speaker)(self.step, &self.agents);
        let speaker = self.agents.get(index).ok_or_else(|| ChainError::InvalidConfig {
            message: format!(
                "speaker selector returned {index} for {} agents",
                self.agents.len()
            ),
        })?;

        debug!(step = self.step, speaker = %speaker.name, "dialogue turn");
        let message = speaker.send().await?;
        let name = speaker.name.clone();

        self.broadcast(&name, &message);
        self.step += 1;
        Ok((name, message))
    }

    fn broadcast(&mut self, name: &str, message: &str) {
        for agent in &mut self.agents {
            agent.receive(name, message);
        }
    }
}
