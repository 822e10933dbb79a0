use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chat_web::{AppState, router};
use chatbot::chat::{CompletionRequest, CompletionService, Fragment, FragmentStream};
use chatbot::responder::StreamingResponder;
use chatbot::{Error, Result};
use serde_json::{Value, json};
use tokio::sync::Notify;

/// Answers every request with the same fragments, optionally waiting for a
/// signal before the first one.
#[derive(Clone, Default)]
struct FixedService {
    texts: Vec<&'static str>,
    fail_with: Option<&'static str>,
    gate: Option<Arc<Notify>>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl CompletionService for FixedService {
    async fn stream(&self, _request: &CompletionRequest) -> Result<FragmentStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let texts = self.texts.clone();
        let fail_with = self.fail_with;
        let gate = self.gate.clone();

        Ok(Box::pin(async_stream::stream! {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            for text in texts {
                yield Ok(Fragment::text(text));
            }
            if let Some(message) = fail_with {
                yield Err(Error::ApiError { status: 500, message: message.to_string() });
            }
        }))
    }
}

async fn serve(state: AppState) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    addr
}

fn ready(service: FixedService) -> AppState {
    AppState::ready(StreamingResponder::new(service, "gemini-2.0-flash"))
}

/// Splits an SSE body into (event name, JSON data) pairs.
fn parse_events(body: &str) -> Vec<(String, Value)> {
    body.split("\n\n")
        .filter_map(|frame| {
            let mut name = None;
            let mut data = None;
            for line in frame.lines() {
                if let Some(value) = line.strip_prefix("event:") {
                    name = Some(value.trim().to_string());
                } else if let Some(value) = line.strip_prefix("data:") {
                    data = Some(serde_json::from_str(value.trim()).unwrap());
                }
            }
            Some((name?, data?))
        })
        .collect()
}

async fn post_chat(client: &reqwest::Client, addr: SocketAddr, message: &str) -> reqwest::Response {
    client
        .post(format!("http://{addr}/api/chat"))
        .json(&json!({ "message": message }))
        .send()
        .await
        .unwrap()
}

async fn messages(client: &reqwest::Client, addr: SocketAddr) -> Value {
    client
        .get(format!("http://{addr}/api/messages"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn chat_streams_render_events_and_commits_the_turn() {
    let addr = serve(ready(FixedService {
        texts: vec!["Hi", " there"],
        ..Default::default()
    }))
    .await;
    let client = reqwest::Client::new();

    let response = post_chat(&client, addr, "hello").await;
    assert_eq!(200, response.status().as_u16());
    let events = parse_events(&response.text().await.unwrap());

    assert_eq!(
        vec![
            ("turn".to_string(), json!({"type": "turn", "role": "user", "content": "hello"})),
            ("pending".to_string(), json!({"type": "pending"})),
            ("replace".to_string(), json!({"type": "replace", "content": "Hi"})),
            ("replace".to_string(), json!({"type": "replace", "content": "Hi there"})),
            ("turn".to_string(), json!({"type": "turn", "role": "assistant", "content": "Hi there"})),
        ],
        events
    );
    assert_eq!(
        json!({"messages": [
            {"role": "user", "content": "hello"},
            {"role": "assistant", "content": "Hi there"}
        ]}),
        messages(&client, addr).await
    );
}

#[tokio::test]
async fn failed_turn_keeps_only_the_user_message() {
    let addr = serve(ready(FixedService {
        texts: vec!["Part"],
        fail_with: Some("quota exceeded"),
        ..Default::default()
    }))
    .await;
    let client = reqwest::Client::new();

    let body = post_chat(&client, addr, "hello").await.text().await.unwrap();
    let events = parse_events(&body);

    assert_eq!(
        Some(&(
            "error".to_string(),
            json!({"type": "error", "message": "API error (500): quota exceeded"})
        )),
        events.last()
    );
    assert_eq!(
        json!({"messages": [{"role": "user", "content": "hello"}]}),
        messages(&client, addr).await
    );
}

#[tokio::test]
async fn second_chat_and_clear_are_refused_while_streaming() {
    let gate = Arc::new(Notify::new());
    let addr = serve(ready(FixedService {
        texts: vec!["done"],
        gate: Some(gate.clone()),
        ..Default::default()
    }))
    .await;
    let client = reqwest::Client::new();

    let first = post_chat(&client, addr, "first").await;
    assert_eq!(200, first.status().as_u16());

    let second = post_chat(&client, addr, "second").await;
    assert_eq!(409, second.status().as_u16());
    let clear = client
        .post(format!("http://{addr}/api/clear"))
        .send()
        .await
        .unwrap();
    assert_eq!(409, clear.status().as_u16());

    // History stays readable mid-stream and shows only finished turns.
    let during = tokio::time::timeout(Duration::from_secs(5), messages(&client, addr))
        .await
        .unwrap();
    assert_eq!(json!({"messages": []}), during);

    gate.notify_one();
    let events = parse_events(&first.text().await.unwrap());
    assert_eq!("turn", events.last().unwrap().0);
    assert_eq!(2, messages(&client, addr).await["messages"].as_array().unwrap().len());
}

#[tokio::test]
async fn clear_empties_the_session() {
    let addr = serve(ready(FixedService {
        texts: vec!["ok"],
        ..Default::default()
    }))
    .await;
    let client = reqwest::Client::new();

    post_chat(&client, addr, "one").await.text().await.unwrap();
    post_chat(&client, addr, "two").await.text().await.unwrap();
    assert_eq!(4, messages(&client, addr).await["messages"].as_array().unwrap().len());

    for _ in 0..2 {
        let response = client
            .post(format!("http://{addr}/api/clear"))
            .send()
            .await
            .unwrap();
        assert_eq!(204, response.status().as_u16());
    }
    assert_eq!(json!({"messages": []}), messages(&client, addr).await);
}

#[tokio::test]
async fn blank_message_is_rejected_without_a_request() {
    let service = FixedService::default();
    let calls = service.calls.clone();
    let addr = serve(ready(service)).await;
    let client = reqwest::Client::new();

    let response = post_chat(&client, addr, "   ").await;

    assert_eq!(400, response.status().as_u16());
    assert_eq!(0, calls.load(Ordering::SeqCst));
    assert_eq!(json!({"messages": []}), messages(&client, addr).await);
}

#[tokio::test]
async fn misconfigured_app_shows_diagnostic_and_refuses_chat() {
    let addr = serve(AppState::from_startup(Err(Error::MissingCredential(
        "GEMINI_API_KEY".to_string(),
    ))))
    .await;
    let client = reqwest::Client::new();

    let status: Value = client
        .get(format!("http://{addr}/api/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        json!({
            "ready": false,
            "error": "API key not found. Please set GEMINI_API_KEY in your .env file."
        }),
        status
    );

    let response = post_chat(&client, addr, "hello").await;
    assert_eq!(503, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!("UNAVAILABLE", body["error"]["code"]);

    let page = client
        .get(format!("http://{addr}/"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("Clear Conversation"));
}

#[tokio::test]
async fn status_reports_the_model() {
    let addr = serve(ready(FixedService::default())).await;

    let status: Value = reqwest::get(format!("http://{addr}/api/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(json!({"ready": true, "model": "gemini-2.0-flash"}), status);
}

#[tokio::test]
async fn page_redraws_from_history_after_a_finished_turn() {
    let addr = serve(ready(FixedService::default())).await;

    let page = reqwest::get(format!("http://{addr}/"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(page.contains(r#"fetch("/api/messages")"#));
    assert!(page.contains("if (finished) await redraw();"));
}
