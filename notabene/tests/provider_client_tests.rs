use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use notabene::config::{ChatConfig, EmbeddingsConfig};
use notabene::embeddings::{Embedder, EmbeddingApiClient};
use notabene::error::NotabeneError;
use notabene::llm::{prompts, ChatApiClient, ChatModel, ChatRequest, PromptMessage, ReplyContent};

fn embeddings_config(base_url: String, max_retries: u32) -> EmbeddingsConfig {
    EmbeddingsConfig {
        model: "mistral/mistral-embed".to_string(),
        api_key: Some("test-key".to_string()),
        base_url: Some(base_url),
        timeout_secs: 5,
        max_retries,
    }
}

fn chat_config(base_url: String) -> ChatConfig {
    ChatConfig {
        model: "mistral/mistral-large-latest".to_string(),
        title_model: "mistral/ministral-3b-latest".to_string(),
        api_key: Some("test-key".to_string()),
        base_url: Some(base_url),
        temperature: 0.3,
        max_tokens: 800,
        timeout_secs: 5,
        max_retries: 0,
        history_window: 10,
        max_iterations: 3,
    }
}

fn chat_request() -> ChatRequest {
    ChatRequest {
        messages: vec![PromptMessage::User {
            content: "What is the mitochondria?".to_string(),
        }],
        tools: vec![prompts::search_sources_tool()],
        temperature: 0.3,
        max_tokens: 800,
    }
}

fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1,
        "model": "mistral-large-latest",
        "choices": [
            {
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": content
                },
                "finish_reason": "stop"
            }
        ],
        "usage": {
            "prompt_tokens": 1,
            "completion_tokens": 1,
            "total_tokens": 2
        }
    })
}

fn tool_call_body(query: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1,
        "model": "mistral-large-latest",
        "choices": [
            {
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        {
                            "id": "call_1",
                            "type": "function",
                            "function": {
                                "name": "search_sources",
                                "arguments": format!("{{\"query\":\"{query}\"}}")
                            }
                        }
                    ]
                },
                "finish_reason": "tool_calls"
            }
        ],
        "usage": {
            "prompt_tokens": 1,
            "completion_tokens": 1,
            "total_tokens": 2
        }
    })
}

#[tokio::test]
async fn embed_returns_vectors_in_input_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"embedding": [0.1, 0.2]},
                {"embedding": [0.3, 0.4]}
            ]
        })))
        .mount(&server)
        .await;

    let client = EmbeddingApiClient::new(&embeddings_config(server.uri(), 0)).unwrap();
    let vectors = client
        .embed(vec!["first".to_string(), "second".to_string()])
        .await
        .unwrap();

    assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
}

#[tokio::test]
async fn embed_empty_input_never_calls_the_provider() {
    // No mock mounted: a request would 404 and error.
    let server = MockServer::start().await;
    let client = EmbeddingApiClient::new(&embeddings_config(server.uri(), 0)).unwrap();
    let vectors = client.embed(Vec::new()).await.unwrap();
    assert!(vectors.is_empty());
}

#[tokio::test]
async fn embed_unauthorized_maps_to_the_auth_error_kind() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let client = EmbeddingApiClient::new(&embeddings_config(server.uri(), 3)).unwrap();
    let error = client.embed(vec!["text".to_string()]).await.unwrap_err();

    assert!(matches!(error, NotabeneError::ApiAuth(_)));
    // Auth failures are terminal, not retried.
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn embed_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"embedding": [1.0, 0.0]}]
        })))
        .mount(&server)
        .await;

    let client = EmbeddingApiClient::new(&embeddings_config(server.uri(), 1)).unwrap();
    let vectors = client.embed(vec!["text".to_string()]).await.unwrap();
    assert_eq!(vectors.len(), 1);
}

#[tokio::test]
async fn embed_length_mismatch_is_a_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"embedding": [1.0, 0.0]}]
        })))
        .mount(&server)
        .await;

    let client = EmbeddingApiClient::new(&embeddings_config(server.uri(), 0)).unwrap();
    let error = client
        .embed(vec!["one".to_string(), "two".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(error, NotabeneError::Embedding(_)));
}

#[tokio::test]
async fn chat_parses_a_text_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"tool_choice": "auto"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion_body("It makes energy.")),
        )
        .mount(&server)
        .await;

    let client = ChatApiClient::new(&chat_config(server.uri())).unwrap();
    let reply = client.chat(chat_request()).await.unwrap();

    assert!(reply.tool_calls.is_empty());
    match reply.content {
        Some(ReplyContent::Text(text)) => assert_eq!(text, "It makes energy."),
        other => panic!("expected text content, got {other:?}"),
    }
}

#[tokio::test]
async fn chat_parses_a_tool_call_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tool_call_body("mitochondria")))
        .mount(&server)
        .await;

    let client = ChatApiClient::new(&chat_config(server.uri())).unwrap();
    let reply = client.chat(chat_request()).await.unwrap();

    assert!(reply.content.is_none());
    assert_eq!(reply.tool_calls.len(), 1);
    assert_eq!(reply.tool_calls[0].id, "call_1");
    assert_eq!(reply.tool_calls[0].name, "search_sources");
    assert!(reply.tool_calls[0].arguments.contains("mitochondria"));
}

#[tokio::test]
async fn chat_auth_api_error_maps_to_the_auth_error_kind() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {
                "message": "Invalid API key",
                "type": "invalid_request_error",
                "param": null,
                "code": "invalid_api_key"
            }
        })))
        .mount(&server)
        .await;

    let client = ChatApiClient::new(&chat_config(server.uri())).unwrap();
    let error = client.chat(chat_request()).await.unwrap_err();
    assert!(matches!(error, NotabeneError::ApiAuth(_)));
}

#[tokio::test]
async fn complete_brief_uses_the_title_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "ministral-3b-latest"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Cell Energy Basics")))
        .mount(&server)
        .await;

    let client = ChatApiClient::new(&chat_config(server.uri())).unwrap();
    let title = client.complete_brief("Generate a title", 30).await.unwrap();
    assert_eq!(title, "Cell Energy Basics");
}
