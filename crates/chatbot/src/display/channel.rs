use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::DisplaySurface;
use crate::Result;
use crate::chat::Role;

/// One render call in serialisable form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DisplayEvent {
    Turn { role: Role, content: String },
    Pending,
    Replace { content: String },
    Error { message: String },
}

impl DisplayEvent {
    /// Same as the serialised `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            DisplayEvent::Turn { .. } => "turn",
            DisplayEvent::Pending => "pending",
            DisplayEvent::Replace { .. } => "replace",
            DisplayEvent::Error { .. } => "error",
        }
    }
}

/// Forwards render calls to a channel, for surfaces living in another task
/// (such as a browser behind an event stream).
///
/// A closed receiver is not an error: the turn still runs to completion.
#[derive(Debug)]
pub struct ChannelDisplay {
    sender: UnboundedSender<DisplayEvent>,
    last_replace: Option<String>,
}

impl ChannelDisplay {
    pub fn new() -> (Self, UnboundedReceiver<DisplayEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::from_sender(sender), receiver)
    }

    pub fn from_sender(sender: UnboundedSender<DisplayEvent>) -> Self {
        Self {
            sender,
            last_replace: None,
        }
    }

    fn send(&self, event: DisplayEvent) {
        if self.sender.send(event).is_err() {
            tracing::debug!("display receiver dropped");
        }
    }
}

impl DisplaySurface for ChannelDisplay {
    fn render_turn(&mut self, role: Role, content: &str) -> Result<()> {
        self.last_replace = None;
        self.send(DisplayEvent::Turn {
            role,
            content: content.to_string(),
        });
        Ok(())
    }

    fn render_pending(&mut self) -> Result<()> {
        self.last_replace = None;
        self.send(DisplayEvent::Pending);
        Ok(())
    }

    fn render_pending_replace(&mut self, content: &str) -> Result<()> {
        if self.last_replace.as_deref() == Some(content) {
            return Ok(());
        }
        self.last_replace = Some(content.to_string());
        self.send(DisplayEvent::Replace {
            content: content.to_string(),
        });
        Ok(())
    }

    fn render_error(&mut self, message: &str) -> Result<()> {
        self.last_replace = None;
        self.send(DisplayEvent::Error {
            message: message.to_string(),
        });
        Ok(())
    }
}
