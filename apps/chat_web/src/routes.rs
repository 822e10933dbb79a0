use std::convert::Infallible;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use chatbot::display::ChannelDisplay;
use chatbot::session::Session;
use futures::Stream;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::state::AppState;

const INDEX_HTML: &str = include_str!("../static/index.html");

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/status", get(status))
        .route("/api/messages", get(messages))
        .route("/api/chat", post(chat))
        .route("/api/clear", post(clear))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(match &state {
        AppState::Ready(chat) => StatusResponse {
            ready: true,
            model: Some(chat.responder.model().to_string()),
            error: None,
        },
        AppState::Misconfigured(message) => StatusResponse {
            ready: false,
            model: None,
            error: Some(message.to_string()),
        },
    })
}

async fn messages(State(state): State<AppState>) -> Result<Json<Session>, AppError> {
    let chat = state.chat()?;
    Ok(Json(chat.snapshot().await))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let chat = state.chat()?.clone();
    if body.message.trim().is_empty() {
        return Err(AppError::Validation("Message must not be empty".to_string()));
    }

    // Held by the spawned turn until it resolves; later requests get 409.
    let mut session = chat.try_begin_turn()?;
    let (mut display, mut receiver) = ChannelDisplay::new();

    tokio::spawn(async move {
        match chat
            .responder
            .submit(&mut session, &mut display, &body.message)
            .await
        {
            Ok(reply) => tracing::debug!(
                completed = reply.is_completed(),
                turns = session.len(),
                "turn finished"
            ),
            Err(err) => tracing::error!(error = %err, "turn aborted"),
        }
        chat.publish(&session).await;
    });

    // One event per render call; the stream ends when the turn task drops the
    // display.
    let events = async_stream::stream! {
        while let Some(event) = receiver.recv().await {
            let data = match serde_json::to_string(&event) {
                Ok(data) => data,
                Err(err) => {
                    tracing::error!(error = %err, "failed to encode display event");
                    continue;
                }
            };
            yield Ok::<_, Infallible>(Event::default().event(event.kind()).data(data));
        }
    };

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

async fn clear(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let chat = state.chat()?;
    let mut session = chat.try_begin_turn()?;
    session.clear();
    chat.publish(&session).await;
    Ok(StatusCode::NO_CONTENT)
}
