//! Provider-agnostic message types for chat-model communication.
//!
//! Messages are immutable values; backends only read them when building
//! their wire requests.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a chat message participant.
///
/// Serialized as its lowercase name; any role string that is not one of
/// the well-known roles becomes [`Role::Chat`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// System instructions.
    System,
    /// End-user input.
    User,
    /// Model reply.
    Assistant,
    /// Result of a function invocation.
    Function,
    /// Generic named participant.
    Chat(String),
}

impl Role {
    /// Parses a role name. `human` and `ai` are accepted as aliases.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "system" => Self::System,
            "user" | "human" => Self::User,
            "assistant" | "ai" => Self::Assistant,
            "function" => Self::Function,
            other => Self::Chat(other.to_string()),
        }
    }

    /// Returns the wire name of the role.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Function => "function",
            Self::Chat(role) => role,
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender.
    pub role: Role,
    /// Message content. Empty for assistant messages that only carry a function call.
    #[serde(default)]
    pub content: String,
    /// Participant or function name. Required for [`Role::Function`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Function call requested by the assistant, forwarded verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<Value>,
}

impl Message {
    fn new(role: Role, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
            name: None,
            function_call: None,
        }
    }

    /// Returns a copy of this message carrying the given name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Creates a system message.
#[must_use]
pub fn system_message(content: &str) -> Message {
    Message::new(Role::System, content)
}

/// Creates a user message.
#[must_use]
pub fn user_message(content: &str) -> Message {
    Message::new(Role::User, content)
}

/// Creates an assistant message.
#[must_use]
pub fn assistant_message(content: &str) -> Message {
    Message::new(Role::Assistant, content)
}

/// Creates an assistant message carrying a function call.
#[must_use]
pub fn assistant_function_call_message(content: &str, function_call: Value) -> Message {
    Message {
        function_call: Some(function_call),
        ..Message::new(Role::Assistant, content)
    }
}

/// Creates a function result message.
#[must_use]
pub fn function_message(name: &str, content: &str) -> Message {
    Message::new(Role::Function, content).with_name(name)
}

/// Creates a message for an arbitrary role.
#[must_use]
pub fn chat_message(role: &str, content: &str) -> Message {
    Message::new(Role::parse(role), content)
}

/// A unit of streamed model output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatChunk {
    /// Text carried by this chunk.
    pub content: String,
}
