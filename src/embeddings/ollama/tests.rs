use super::*;
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, method, path},
};

fn config_for(server: &MockServer) -> OllamaConfig {
    OllamaConfig {
        host: server.address().ip().to_string(),
        port: server.address().port(),
        embedding_dimension: 4,
        ..OllamaConfig::default()
    }
}

fn embedder_for(server: &MockServer) -> OllamaEmbedder {
    let config = config_for(server);
    let client = OllamaClient::new(&config).expect("should create client");
    OllamaEmbedder::new(client, "nomic-embed-text:latest", 4)
}

#[test]
fn client_configuration() {
    let config = OllamaConfig {
        host: "test-host".to_string(),
        port: 1234,
        retry_attempts: 3,
        ..OllamaConfig::default()
    };
    let client = OllamaClient::new(&config).expect("should create client");

    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, 3);
}

#[test]
fn client_builder_methods() {
    let client = OllamaClient::new(&OllamaConfig::default())
        .expect("should create client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(5);
    assert_eq!(client.retry_attempts, 5);

    // zero attempts would never send a request
    let client = client.with_retry_attempts(0);
    assert_eq!(client.retry_attempts, 1);
}

#[tokio::test]
async fn embed_posts_cleaned_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({
            "model": "nomic-embed-text:latest",
            "input": "Return policy details"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({
                "model": "nomic-embed-text:latest",
                "embeddings": [[0.1, 0.2, 0.3, 0.4]]
            })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let embedder = embedder_for(&server);
    let vector = embedder
        .embed("  Return\n\n policy\tdetails ")
        .await
        .expect("should embed");

    assert_eq!(vector, vec![0.1, 0.2, 0.3, 0.4]);
    assert_eq!(embedder.dimension(), 4);
}

#[tokio::test]
async fn embed_rejects_empty_text_without_calling_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = embedder_for(&server)
        .embed(" \n\t ")
        .await
        .expect_err("empty text should fail");

    assert_eq!(err.kind(), crate::ErrorKind::Embedding);
}

#[tokio::test]
async fn embed_rejects_wrong_dimension() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "embeddings": [[0.1, 0.2]] })),
        )
        .mount(&server)
        .await;

    let err = embedder_for(&server)
        .embed("some text")
        .await
        .expect_err("dimension mismatch should fail");

    assert_eq!(err.kind(), crate::ErrorKind::Embedding);
    assert!(err.to_string().contains("expected 4"));
}

#[tokio::test]
async fn embed_surfaces_missing_model_as_embedding_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({ "error": "model \"nomic-embed-text\" not found" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = embedder_for(&server)
        .embed("some text")
        .await
        .expect_err("missing model should fail");

    assert_eq!(err.kind(), crate::ErrorKind::Embedding);
}

#[tokio::test]
async fn embed_fails_on_empty_embedding_list() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "embeddings": [] })))
        .mount(&server)
        .await;

    assert!(embedder_for(&server).embed("some text").await.is_err());
}

#[tokio::test]
async fn server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server))
        .expect("should create client")
        .with_retry_attempts(2);

    let result = tokio::task::spawn_blocking(move || client.list_models())
        .await
        .expect("task should complete");
    assert!(result.is_err());
}

#[tokio::test]
async fn health_check_requires_model() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                { "name": "llama3.1:8b", "size": 4_920_753_328_u64 },
                { "name": "nomic-embed-text:latest" }
            ]
        })))
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("should create client");

    let result = tokio::task::spawn_blocking(move || {
        let models = client.list_models()?;
        client.health_check("llama3.1:8b")?;
        let missing = client.health_check("mistral:7b");
        Ok::<_, anyhow::Error>((models, missing))
    })
    .await
    .expect("task should complete");

    let (models, missing) = result.expect("listing and health check should succeed");
    assert_eq!(models.len(), 2);
    assert_eq!(models[0].size, Some(4_920_753_328));
    assert!(missing.is_err());
}
