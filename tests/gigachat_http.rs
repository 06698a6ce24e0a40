//! HTTP-level tests for the GigaChat backend against a mock server.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::StreamExt;
use serde_json::json;
use wiremock::matchers::{basic_auth, bearer_token, body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gigachain::model::assistant_function_call_message;
use gigachain::{
    CharacterTextSplitter, ChatModel, GigaChatConfig, GigaChatModel, ModelError, RetrievalQa,
    system_message, user_message,
};

fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    }))
}

fn token(tok: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "tok": tok }))
}

fn model_for(server: &MockServer) -> GigaChatModel {
    let config = GigaChatConfig::builder()
        .api_url(server.uri())
        .user("alice")
        .password("secret")
        .build()
        .unwrap_or_else(|e| panic!("config: {e}"));
    GigaChatModel::new(config).unwrap_or_else(|e| panic!("model: {e}"))
}

#[tokio::test]
async fn test_authenticates_once_then_reuses_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .and(basic_auth("alice", "secret"))
        .respond_with(token("tok-1"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(bearer_token("tok-1"))
        .respond_with(completion("ok"))
        .expect(2)
        .mount(&server)
        .await;

    let model = model_for(&server);
    assert!(!model.has_token().await);
    for _ in 0..2 {
        let reply = model
            .complete(&[user_message("ping")], None)
            .await
            .unwrap_or_else(|e| panic!("complete: {e}"));
        assert_eq!(reply, "ok");
    }
    assert!(model.has_token().await);
}

#[tokio::test]
async fn test_end_to_end_request_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(token("tok-e2e"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(bearer_token("tok-e2e"))
        .and(body_json(json!({
            "model": "GigaChat:v1.13.0",
            "profanity_check": true,
            "messages": [
                { "role": "system", "content": "You are helpful" },
                { "role": "user", "content": "Hi" }
            ]
        })))
        .respond_with(completion("Hello!"))
        .expect(1)
        .mount(&server)
        .await;

    let model = model_for(&server);
    let reply = model
        .complete(
            &[system_message("You are helpful"), user_message("Hi")],
            Some(&["\n".to_string()][..]),
        )
        .await
        .unwrap_or_else(|e| panic!("complete: {e}"));
    assert_eq!(reply, "Hello!");
}

#[tokio::test]
async fn test_function_call_sends_null_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_json(json!({
            "model": "GigaChat:v1.13.0",
            "profanity_check": true,
            "messages": [
                {
                    "role": "assistant",
                    "content": null,
                    "function_call": { "name": "get_weather", "arguments": "{}" }
                }
            ]
        })))
        .respond_with(completion("done"))
        .expect(1)
        .mount(&server)
        .await;

    let config = GigaChatConfig::builder()
        .api_url(server.uri())
        .token("preset")
        .build()
        .unwrap_or_else(|e| panic!("config: {e}"));
    let model = GigaChatModel::new(config).unwrap_or_else(|e| panic!("model: {e}"));
    let message =
        assistant_function_call_message("", json!({ "name": "get_weather", "arguments": "{}" }));
    let reply = model.complete(&[message], None).await;
    assert_eq!(reply.ok().as_deref(), Some("done"));
}

#[tokio::test]
async fn test_injected_token_skips_authentication() {
    let server = MockServer::start().await;
    Mock::given(path("/v1/token"))
        .respond_with(token("unused"))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(bearer_token("preset"))
        .respond_with(completion("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let config = GigaChatConfig::builder()
        .api_url(server.uri())
        .token("preset")
        .build()
        .unwrap_or_else(|e| panic!("config: {e}"));
    let model = GigaChatModel::new(config).unwrap_or_else(|e| panic!("model: {e}"));
    let reply = model.complete(&[user_message("ping")], None).await;
    assert_eq!(reply.ok().as_deref(), Some("ok"));
}

#[tokio::test]
async fn test_rejected_credentials_report_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/v1/chat/completions"))
        .respond_with(completion("never"))
        .expect(0)
        .mount(&server)
        .await;

    let model = model_for(&server);
    let err = model
        .complete(&[user_message("ping")], None)
        .await
        .err()
        .unwrap_or_else(|| panic!("expected an error"));
    assert!(matches!(err, ModelError::Unauthorized { status: 401 }));
    assert!(err.to_string().contains("401"));
    assert!(!model.has_token().await);
}

#[tokio::test]
async fn test_missing_credentials_make_no_requests() {
    let server = MockServer::start().await;
    let config = GigaChatConfig::builder()
        .api_url(server.uri())
        .user("alice")
        .build()
        .unwrap_or_else(|e| panic!("config: {e}"));
    let model = GigaChatModel::new(config).unwrap_or_else(|e| panic!("model: {e}"));

    let result = model.complete(&[user_message("ping")], None).await;
    assert!(matches!(result, Err(ModelError::MissingCredentials)));
    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_clear_token_forces_reauthentication() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(token("tok-again"))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(completion("ok"))
        .expect(2)
        .mount(&server)
        .await;

    let model = model_for(&server);
    assert!(model.complete(&[user_message("a")], None).await.is_ok());
    model.clear_token().await;
    assert!(!model.has_token().await);
    assert!(model.complete(&[user_message("b")], None).await.is_ok());
}

#[tokio::test]
async fn test_non_success_completion_is_service_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let config = GigaChatConfig::builder()
        .api_url(server.uri())
        .token("preset")
        .build()
        .unwrap_or_else(|e| panic!("config: {e}"));
    let result = GigaChatModel::new(config)
        .unwrap_or_else(|e| panic!("model: {e}"))
        .complete(&[user_message("ping")], None)
        .await;
    assert!(matches!(result, Err(ModelError::Service { .. })));
}

#[tokio::test]
async fn test_malformed_completion_is_service_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let config = GigaChatConfig::builder()
        .api_url(server.uri())
        .token("preset")
        .build()
        .unwrap_or_else(|e| panic!("config: {e}"));
    let result = GigaChatModel::new(config)
        .unwrap_or_else(|e| panic!("model: {e}"))
        .complete(&[user_message("ping")], None)
        .await;
    assert!(matches!(result, Err(ModelError::Service { .. })));

    let result = model_for(&server).authenticate().await;
    assert!(matches!(result, Err(ModelError::Service { .. })));
}

#[tokio::test]
async fn test_stream_yields_single_placeholder_without_network() {
    let server = MockServer::start().await;
    let model = model_for(&server);

    let chunks: Vec<_> = model
        .stream(&[user_message("ping")], None)
        .await
        .unwrap_or_else(|e| panic!("stream: {e}"))
        .collect()
        .await;
    assert_eq!(chunks.len(), 1);
    let content = chunks[0].as_ref().map(|c| c.content.clone()).unwrap_or_default();
    assert_eq!(content, "Async is not supported yet");
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_concurrent_first_calls_authenticate_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(token("shared"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(bearer_token("shared"))
        .respond_with(completion("ok"))
        .expect(4)
        .mount(&server)
        .await;

    let model = Arc::new(model_for(&server));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let model = Arc::clone(&model);
            tokio::spawn(async move { model.complete(&[user_message(&format!("q{i}"))], None).await })
        })
        .collect();
    for handle in handles {
        let result = handle.await.unwrap_or_else(|e| panic!("join: {e}"));
        assert!(result.is_ok());
    }
}

#[tokio::test]
async fn test_retrieval_qa_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(token("tok-qa"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(completion("Джулиан Джейнс"))
        .expect(1)
        .mount(&server)
        .await;

    let text = "Идею бикамерального сознания предложил Джулиан Джейнс.\n\nКошки спят.";
    let splitter = CharacterTextSplitter::new("\n\n", 60, 0).unwrap_or_else(|e| panic!("{e}"));
    let qa = RetrievalQa::from_text(text, &splitter).unwrap_or_else(|e| panic!("{e}"));
    let model = model_for(&server);

    let answer = qa
        .ask(&model, "Кто придумал идею бикамерального сознания?")
        .await
        .unwrap_or_else(|e| panic!("ask: {e}"));
    assert_eq!(answer.answer, "Джулиан Джейнс");

    let requests = server.received_requests().await.unwrap_or_default();
    let completion_request = requests
        .iter()
        .find(|r| r.url.path() == "/v1/chat/completions")
        .unwrap_or_else(|| panic!("no completion request"));
    let body: serde_json::Value =
        serde_json::from_slice(&completion_request.body).unwrap_or_default();
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "Кто придумал идею бикамерального сознания?");
    assert!(
        body["messages"][0]["content"]
            .as_str()
            .is_some_and(|s| s.contains("Джулиан Джейнс") && !s.contains("Кошки"))
    );
}

#[tokio::test]
async fn test_empty_token_is_never_held() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(token(""))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(path("/v1/chat/completions"))
        .respond_with(completion("never"))
        .expect(0)
        .mount(&server)
        .await;

    let model = model_for(&server);
    for _ in 0..2 {
        let result = model.complete(&[user_message("ping")], None).await;
        assert!(
            matches!(result, Err(ModelError::Service { ref message }) if message.contains("empty token"))
        );
        assert!(!model.has_token().await);
    }
}

#[tokio::test]
async fn test_empty_injected_token_authenticates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(token("fresh"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(bearer_token("fresh"))
        .respond_with(completion("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let config = GigaChatConfig::builder()
        .api_url(server.uri())
        .user("alice")
        .password("secret")
        .token("")
        .build()
        .unwrap_or_else(|e| panic!("config: {e}"));
    let model = GigaChatModel::new(config).unwrap_or_else(|e| panic!("model: {e}"));
    assert!(!model.has_token().await);
    let reply = model.complete(&[user_message("ping")], None).await;
    assert_eq!(reply.ok().as_deref(), Some("ok"));
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        let buf = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_verbose_logs_payload_and_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(bearer_token("preset"))
        .respond_with(completion("pong"))
        .expect(1)
        .mount(&server)
        .await;

    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let config = GigaChatConfig::builder()
        .api_url(server.uri())
        .token("preset")
        .verbose(true)
        .build()
        .unwrap_or_else(|e| panic!("config: {e}"));
    let model = GigaChatModel::new(config).unwrap_or_else(|e| panic!("model: {e}"));
    let reply = model.complete(&[user_message("ping")], None).await;
    assert_eq!(reply.ok().as_deref(), Some("pong"));

    let output = logs.contents();
    assert!(output.contains("Giga request"));
    assert!(output.contains(r#""content":"ping""#));
    assert!(output.contains("Giga response"));
    assert!(output.contains("pong"));
}
