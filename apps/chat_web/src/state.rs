use std::sync::Arc;

use chatbot::responder::StreamingResponder;
use chatbot::session::Session;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::error::AppError;

#[derive(Clone)]
pub enum AppState {
    Ready(Arc<ChatState>),
    /// Startup failed; every chat action is refused with this message.
    Misconfigured(Arc<str>),
}

pub struct ChatState {
    pub responder: StreamingResponder,
    session: Arc<Mutex<Session>>,
    /// Copy of the session as of the last finished turn or clear.
    committed: RwLock<Session>,
}

impl ChatState {
    /// Takes the session for one turn. Fails instead of queueing while another
    /// turn holds it.
    pub fn try_begin_turn(&self) -> Result<OwnedMutexGuard<Session>, AppError> {
        self.session.clone().try_lock_owned().map_err(|_| AppError::Busy)
    }

    /// History as of the last finished turn. Does not wait for a turn that
    /// is still streaming.
    pub async fn snapshot(&self) -> Session {
        self.committed.read().await.clone()
    }

    pub async fn publish(&self, session: &Session) {
        *self.committed.write().await = session.clone();
    }
}

impl AppState {
    pub fn ready(responder: StreamingResponder) -> Self {
        AppState::Ready(Arc::new(ChatState {
            responder,
            session: Arc::new(Mutex::new(Session::new())),
            committed: RwLock::new(Session::new()),
        }))
    }

    pub fn misconfigured(message: impl Into<String>) -> Self {
        AppState::Misconfigured(Arc::from(message.into()))
    }

    pub fn from_startup(result: chatbot::Result<StreamingResponder>) -> Self {
        match result {
            Ok(responder) => Self::ready(responder),
            Err(err) => {
                tracing::error!(error = %err, "startup failed; chat is disabled");
                Self::misconfigured(err.to_string())
            }
        }
    }

    pub fn chat(&self) -> Result<&Arc<ChatState>, AppError> {
        match self {
            AppState::Ready(chat) => Ok(chat),
            AppState::Misconfigured(message) => Err(AppError::Unavailable(message.to_string())),
        }
    }
}
