//! End-to-end HTTP API tests over deterministic fakes
//!
//! The embedding and generation services are replaced with in-process
//! fakes, so these tests exercise the full ingest -> retrieve -> answer
//! path without any network beyond the loopback server itself.

use kbrag::answer::AnswerComposer;
use kbrag::embed::{Embedder, FakeEmbedder};
use kbrag::generate::FakeGenerator;
use kbrag::ingest::Ingestor;
use kbrag::retrieve::Retriever;
use kbrag::server::{router, AppState};
use kbrag::store::PageStore;
use std::net::SocketAddr;
use std::sync::Arc;

async fn spawn_app(embedder: FakeEmbedder, generator: FakeGenerator) -> SocketAddr {
    let store = PageStore::in_memory().await.unwrap();
    let embedder: Arc<dyn Embedder> = Arc::new(embedder);

    let state = Arc::new(AppState {
        ingestor: Ingestor::new(store.clone(), Arc::clone(&embedder)),
        retriever: Retriever::new(store, embedder),
        composer: AnswerComposer::new(Arc::new(generator)),
        default_k: 15,
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn add_page_then_ask_streams_answer() {
    let addr = spawn_app(
        FakeEmbedder::new(),
        FakeGenerator::new(["The answer", " is here."]),
    )
    .await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{}/api/add-page", addr))
        .json(&serde_json::json!({
            "url": "https://x/a",
            "title": "A",
            "content": "## H1\nfoo\n## H2\nbar",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["page_id"].is_i64());

    let response = client
        .post(format!("http://{}/api/ask-bot-smart", addr))
        .json(&serde_json::json!({"prompt": "foo"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "The answer is here.");
}

#[tokio::test]
async fn add_page_validation_failure_is_400_with_error_body() {
    let addr = spawn_app(FakeEmbedder::new(), FakeGenerator::new(["x"])).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{}/api/add-page", addr))
        .json(&serde_json::json!({
            "url": "https://x/a",
            "title": "",
            "content": "text",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("title"));
}

#[tokio::test]
async fn failed_embedding_leaves_no_page_behind() {
    let addr = spawn_app(FakeEmbedder::failing_on("poison"), FakeGenerator::new(["x"])).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{}/api/add-page", addr))
        .json(&serde_json::json!({
            "url": "https://x/a",
            "title": "A",
            "content": "## H1\nfine\n## H2\npoison",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 502);

    // a question now finds nothing, so the prompt carries no pages and
    // the fake generator still streams; the page must not have survived
    let response = client
        .post(format!("http://{}/api/ask-bot-smart", addr))
        .json(&serde_json::json!({"prompt": "fine"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn unavailable_generator_fails_before_streaming() {
    let addr = spawn_app(FakeEmbedder::new(), FakeGenerator::unavailable()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{}/api/ask-bot-smart", addr))
        .json(&serde_json::json!({"prompt": "anything"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 503);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn ask_bot_answers_without_context() {
    let addr = spawn_app(FakeEmbedder::new(), FakeGenerator::new(["plain"])).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{}/api/ask-bot", addr))
        .json(&serde_json::json!({"prompt": "anything"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "plain");
}

#[tokio::test]
async fn health_endpoint_responds() {
    let addr = spawn_app(FakeEmbedder::new(), FakeGenerator::new(["x"])).await;

    let response = reqwest::get(format!("http://{}/health", addr)).await.unwrap();
    assert_eq!(response.status(), 200);
}
