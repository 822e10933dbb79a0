use futures::StreamExt;

use crate::chat::{
    ChatTurn, CompletionRequest, CompletionRequestBuilder, CompletionService, Fragment, Role,
};
use crate::display::DisplaySurface;
use crate::session::Session;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderState {
    Idle,
    Requested,
    Streaming,
    Completed,
    Failed,
}

impl ResponderState {
    /// Whether `next` is a legal successor of this state.
    pub fn can_advance_to(self, next: ResponderState) -> bool {
        use ResponderState::*;
        matches!(
            (self, next),
            (Idle, Requested)
                | (Requested, Streaming)
                | (Requested, Failed)
                // empty response
                | (Requested, Completed)
                | (Streaming, Streaming)
                | (Streaming, Completed)
                | (Streaming, Failed)
        )
    }
}

/// Text accumulated for the one in-flight response.
#[derive(Debug, Default)]
pub struct StreamBuffer {
    text: String,
}

impl StreamBuffer {
    /// Appends a fragment's text verbatim and returns the full contents.
    pub fn push(&mut self, text: &str) -> &str {
        self.text.push_str(text);
        &self.text
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

/// Outcome of one responder invocation.
#[derive(Debug)]
pub enum Reply {
    /// The fragment sequence ended cleanly; carries the full response text.
    Completed(String),
    /// The service failed; the error has already been rendered.
    Failed(Error),
}

impl Reply {
    pub fn text(&self) -> Option<&str> {
        match self {
            Reply::Completed(text) => Some(text),
            Reply::Failed(_) => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Reply::Completed(_))
    }
}

/// Per-invocation state machine.
#[derive(Debug)]
struct Exchange {
    state: ResponderState,
    fragments: usize,
}

impl Exchange {
    fn new() -> Self {
        Self {
            state: ResponderState::Idle,
            fragments: 0,
        }
    }

    fn advance(&mut self, next: ResponderState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        if self.state != next {
            tracing::debug!(from = ?self.state, to = ?next, "responder state");
        }
        self.state = next;
    }
}

/// Executes exactly one streamed completion per call against a service bound
/// to a fixed model.
#[derive(Clone)]
pub struct StreamingResponder {
    service: Box<dyn CompletionService>,
    model: String,
    include_history: bool,
    system_instruction: Option<String>,
    temperature: Option<f64>,
    max_output_tokens: Option<u32>,
}

impl std::fmt::Debug for StreamingResponder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingResponder")
            .field("model", &self.model)
            .field("include_history", &self.include_history)
            .field("system_instruction", &self.system_instruction)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .finish_non_exhaustive()
    }
}

impl StreamingResponder {
    pub fn new<S>(service: S, model: impl Into<String>) -> Self
    where
        S: CompletionService + 'static,
    {
        Self {
            service: Box::new(service),
            model: model.into(),
            include_history: false,
            system_instruction: None,
            temperature: None,
            max_output_tokens: None,
        }
    }

    /// Send the earlier turns of the session along with each prompt.
    pub fn with_history(mut self, include_history: bool) -> Self {
        self.include_history = include_history;
        self
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn includes_history(&self) -> bool {
        self.include_history
    }

    fn request(&self, prompt: &str, history: &[ChatTurn]) -> Result<CompletionRequest> {
        let mut builder = CompletionRequestBuilder::default();
        builder.model(self.model.as_str()).prompt(prompt);
        if self.include_history {
            builder.history(history.to_vec());
        }
        if let Some(instruction) = &self.system_instruction {
            builder.system_instruction(instruction.as_str());
        }
        if let Some(temperature) = self.temperature {
            builder.temperature(temperature);
        }
        if let Some(max_output_tokens) = self.max_output_tokens {
            builder.max_output_tokens(max_output_tokens);
        }
        Ok(builder.build()?)
    }

    /// Streams one response for `prompt` onto `display`.
    ///
    /// Service failures are rendered and returned as [`Reply::Failed`]; an
    /// `Err` means the display itself failed.
    pub async fn respond<D>(
        &self,
        prompt: &str,
        history: &[ChatTurn],
        display: &mut D,
    ) -> Result<Reply>
    where
        D: DisplaySurface + ?Sized,
    {
        let request = self.request(prompt, history)?;
        let mut exchange = Exchange::new();

        exchange.advance(ResponderState::Requested);
        display.render_pending()?;

        let mut stream = match self.service.stream(&request).await {
            Ok(stream) => stream,
            Err(err) => return fail(&mut exchange, display, err),
        };

        let mut buffer = StreamBuffer::default();
        while let Some(item) = stream.next().await {
            match item {
                Ok(fragment) => {
                    exchange.advance(ResponderState::Streaming);
                    exchange.fragments += 1;
                    accept(&mut buffer, &fragment, display)?;
                }
                Err(err) => return fail(&mut exchange, display, err),
            }
        }

        exchange.advance(ResponderState::Completed);
        tracing::debug!(
            fragments = exchange.fragments,
            chars = buffer.as_str().chars().count(),
            "response completed"
        );
        Ok(Reply::Completed(buffer.into_string()))
    }

    /// Runs a whole turn: records and renders the user turn, streams the
    /// reply and commits it to `session` only if it completed.
    pub async fn submit<D>(
        &self,
        session: &mut Session,
        display: &mut D,
        prompt: &str,
    ) -> Result<Reply>
    where
        D: DisplaySurface + ?Sized,
    {
        let history_len = session.len();
        session.append(ChatTurn::user(prompt));
        display.render_turn(Role::User, prompt)?;

        let reply = self
            .respond(prompt, &session.all()[..history_len], display)
            .await?;

        if let Reply::Completed(text) = &reply {
            session.append(ChatTurn::assistant(text.as_str()));
            display.render_turn(Role::Assistant, text)?;
        }
        Ok(reply)
    }
}

fn accept<D>(buffer: &mut StreamBuffer, fragment: &Fragment, display: &mut D) -> Result<()>
where
    D: DisplaySurface + ?Sized,
{
    if let Some(usage) = &fragment.usage {
        tracing::debug!(?usage, "usage reported");
    }
    match &fragment.text {
        Some(text) => display.render_pending_replace(buffer.push(text)),
        None => {
            tracing::trace!(finish_reason = ?fragment.finish_reason, "skipping fragment without text");
            Ok(())
        }
    }
}

fn fail<D>(exchange: &mut Exchange, display: &mut D, err: Error) -> Result<Reply>
where
    D: DisplaySurface + ?Sized,
{
    exchange.advance(ResponderState::Failed);
    tracing::warn!(error = %err, fragments = exchange.fragments, "completion failed");
    display.render_error(&err.to_string())?;
    Ok(Reply::Failed(err))
}
