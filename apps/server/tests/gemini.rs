//! Generative client against a mock HTTP server.

use std::time::Duration;

use kasir_server::generative::{GeminiClient, GenerationConfig, GenerativeError, GenerativeModel};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL_PATH: &str = "/models/gemini-test:generateContent";

fn client(server: &MockServer) -> GeminiClient {
    GeminiClient::new(
        &format!("{}/", server.uri()),
        "gemini-test",
        "test-key".to_string(),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn config() -> GenerationConfig {
    GenerationConfig {
        temperature: 0.7,
        max_output_tokens: 1024,
    }
}

#[tokio::test]
async fn test_generate_sends_prompt_and_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{"parts": [{"text": "User: halo"}]}],
            "generationConfig": {"maxOutputTokens": 1024}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "Halo! "}, {"text": "Ada yang bisa dibantu?"}]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let text = client(&server).generate("User: halo", config()).await.unwrap();
    assert_eq!(text, "Halo! Ada yang bisa dibantu?");
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&server)
        .await;

    let err = client(&server).generate("halo", config()).await.unwrap_err();
    match err {
        GenerativeError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "internal");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_alternate_output_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output": [{"content": [{"type": "output_text", "text": "Stok aman."}]}]
        })))
        .mount(&server)
        .await;

    let text = client(&server).generate("halo", config()).await.unwrap();
    assert_eq!(text, "Stok aman.");
}

#[tokio::test]
async fn test_body_without_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [],
            "promptFeedback": {"blockReason": "SAFETY"}
        })))
        .mount(&server)
        .await;

    let err = client(&server).generate("halo", config()).await.unwrap_err();
    assert!(matches!(err, GenerativeError::NoText));
}
