//! GigaChat backend.
//!
//! Obtains a bearer token from `/v1/token` with basic auth on first use,
//! then posts every completion to `/v1/chat/completions`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::config::GigaChatConfig;
use super::message::{ChatChunk, Message, Role};
use super::provider::{ChatModel, ChunkStream};
use crate::error::ModelError;

const TOKEN_PATH: &str = "/v1/token";
const COMPLETIONS_PATH: &str = "/v1/chat/completions";
/// Text of the single chunk produced by [`GigaChatModel::stream`].
pub const STREAM_PLACEHOLDER: &str = "Async is not supported yet";

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    profanity_check: bool,
    messages: Vec<ApiMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    /// `None` serializes as an explicit `null`.
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<&'a Value>,
}

#[derive(Deserialize)]
struct TokenResponse {
    tok: String,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Chat-model backend for the GigaChat HTTP API.
///
/// The held token starts as [`GigaChatConfig::token`] and is otherwise
/// obtained lazily. It is never refreshed; an expired token keeps failing
/// until [`GigaChatModel::clear_token`] is called.
pub struct GigaChatModel {
    client: reqwest::Client,
    config: GigaChatConfig,
    token: Mutex<Option<String>>,
}

impl GigaChatModel {
    /// Creates a backend from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfig`] if the HTTP client cannot be
    /// initialised.
    pub fn new(config: GigaChatConfig) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("gigachain/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ModelError::InvalidConfig {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        let token = config.token.clone().filter(|t| !t.is_empty());
        Ok(Self {
            client,
            config,
            token: Mutex::new(token),
        })
    }

    /// Returns the configuration this backend was built with.
    pub const fn config(&self) -> &GigaChatConfig {
        &self.config
    }

    /// Returns `true` if a non-empty bearer token is currently held.
    pub async fn has_token(&self) -> bool {
        self.token.lock().await.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Drops the held token so the next completion re-authenticates.
    pub async fn clear_token(&self) {
        *self.token.lock().await = None;
    }

    /// Obtains a fresh token from the token endpoint and holds it.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MissingCredentials`] without any network call if
    /// user or password is absent and [`ModelError::Unauthorized`] on a
    /// non-success status. Transport failures, unparsable bodies and an
    /// empty token are [`ModelError::Service`]; nothing is held in that case.
    pub async fn authenticate(&self) -> Result<(), ModelError> {
        let mut guard = self.token.lock().await;
        *guard = Some(self.request_token().await?);
        Ok(())
    }

    async fn request_token(&self) -> Result<String, ModelError> {
        let (Some(user), Some(password)) = (&self.config.user, &self.config.password) else {
            return Err(ModelError::MissingCredentials);
        };

        debug!(url = %self.config.api_url, "requesting GigaChat token");
        let response = self
            .client
            .post(format!("{}{TOKEN_PATH}", self.config.api_url))
            .basic_auth(user, Some(password))
            .timeout(self.config.auth_timeout)
            .send()
            .await
            .map_err(ModelError::service)?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "GigaChat token endpoint rejected credentials");
            return Err(ModelError::Unauthorized {
                status: status.as_u16(),
            });
        }

        let body: TokenResponse = response.json().await.map_err(ModelError::service)?;
        if body.tok.is_empty() {
            warn!("GigaChat token endpoint returned an empty token");
            return Err(ModelError::service("token endpoint returned an empty token"));
        }
        Ok(body.tok)
    }

    /// Returns the held token, authenticating first if no non-empty token is
    /// held.
    ///
    /// The lock is kept across authentication so concurrent first callers
    /// share a single token request.
    async fn bearer_token(&self) -> Result<String, ModelError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_deref().filter(|t| !t.is_empty()) {
            return Ok(token.to_string());
        }
        let token = self.request_token().await?;
        *guard = Some(token.clone());
        Ok(token)
    }

    /// Converts a message to its wire form.
    fn convert_message(index: usize, msg: &Message) -> Result<ApiMessage<'_>, ModelError> {
        let (content, function_call) = match &msg.role {
            Role::System | Role::User | Role::Function => (Some(msg.content.as_str()), None),
            Role::Assistant => {
                let function_call = msg.function_call.as_ref();
                let content = if function_call.is_some() && msg.content.is_empty() {
                    None
                } else {
                    Some(msg.content.as_str())
                };
                (content, function_call)
            }
            Role::Chat(role) if role.trim().is_empty() => {
                return Err(ModelError::UnsupportedMessage {
                    message: format!("message {index} has an empty role"),
                });
            }
            Role::Chat(_) => (Some(msg.content.as_str()), None),
        };

        if msg.role == Role::Function && msg.name.is_none() {
            return Err(ModelError::UnsupportedMessage {
                message: format!("function message {index} has no name"),
            });
        }

        Ok(ApiMessage {
            role: msg.role.as_str(),
            content,
            name: msg.name.as_deref(),
            function_call,
        })
    }

    /// Builds the completion request body.
    fn build_request<'a>(&'a self, messages: &'a [Message]) -> Result<ApiRequest<'a>, ModelError> {
        if messages.is_empty() {
            return Err(ModelError::UnsupportedMessage {
                message: "at least one message is required".to_string(),
            });
        }

        let messages = messages
            .iter()
            .enumerate()
            .map(|(index, msg)| Self::convert_message(index, msg))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ApiRequest {
            model: &self.config.model,
            profanity_check: self.config.profanity_check,
            messages,
        })
    }

    async fn send_completion(
        &self,
        token: &str,
        request: &ApiRequest<'_>,
    ) -> Result<String, ModelError> {
        let response = self
            .client
            .post(format!("{}{COMPLETIONS_PATH}", self.config.api_url))
            .bearer_auth(token)
            .timeout(self.config.request_timeout)
            .json(request)
            .send()
            .await
            .map_err(ModelError::service)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, %body, "GigaChat completion endpoint returned an error");
            return Err(ModelError::service(format!(
                "completion endpoint returned {status}"
            )));
        }

        let body: ApiResponse = response.json().await.map_err(ModelError::service)?;
        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ModelError::service("response contained no choices"))
    }
}

impl std::fmt::Debug for GigaChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GigaChatModel")
            .field("config", &self.config)
            .field("client", &"<reqwest::Client>")
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ChatModel for GigaChatModel {
    fn llm_type(&self) -> &'static str {
        "giga-chat-model"
    }

    fn identifying_params(&self) -> Value {
        serde_json::json!({
            "model": self.config.model,
            "profanity_check": self.config.profanity_check,
            "temperature": self.config.temperature,
        })
    }

    /// Runs one completion.
    ///
    /// `stop` is accepted for interface compatibility but is not sent.
    /// Messages are converted before any token is requested, so an
    /// unconvertible history fails with [`ModelError::UnsupportedMessage`]
    /// even when credentials are missing.
    #[allow(clippy::print_stdout)]
    async fn complete(
        &self,
        messages: &[Message],
        stop: Option<&[String]>,
    ) -> Result<String, ModelError> {
        if let Some(stop) = stop.filter(|s| !s.is_empty()) {
            debug!(?stop, "stop sequences are not forwarded to GigaChat");
        }

        let request = self.build_request(messages)?;
        let token = self.bearer_token().await?;

        if self.config.verbose {
            let payload = serde_json::to_string(&request).unwrap_or_default();
            println!("Giga request: {payload}");
            info!(%payload, "Giga request");
        }

        let text = self.send_completion(&token, &request).await?;

        if self.config.verbose {
            println!("Giga response: {text}");
            info!(response = %text, "Giga response");
        }

        Ok(text)
    }

    /// Streaming is not supported: yields one fixed placeholder chunk.
    async fn stream(
        &self,
        _messages: &[Message],
        _stop: Option<&[String]>,
    ) -> Result<ChunkStream, ModelError> {
        let chunk = ChatChunk {
            content: STREAM_PLACEHOLDER.to_string(),
        };
        Ok(Box::pin(futures_util::stream::once(async move { Ok(chunk) })))
    }
}
