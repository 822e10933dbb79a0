use std::fmt;
use std::pin::Pin;

use crate::Result;
use async_trait::async_trait;
use derive_builder::Builder;
use dyn_clone::DynClone;
use futures::Stream;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

/// One role-tagged message of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Blocklist,
    ProhibitedContent,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_token_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates_token_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_token_count: Option<u32>,
}

/// One incremental unit of a streamed response.
///
/// `text` is `None` for control chunks (usage reports, safety verdicts) that
/// carry nothing to display.
#[derive(Default, Debug, Clone, PartialEq, Builder)]
#[builder(pattern = "mutable")]
#[builder(setter(into, strip_option), default)]
#[builder(derive(Debug))]
pub struct Fragment {
    pub text: Option<String>,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<UsageMetadata>,
}

impl Fragment {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Builder)]
#[builder(pattern = "mutable")]
#[builder(setter(into, strip_option))]
#[builder(derive(Debug))]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    /// Earlier turns sent ahead of the prompt, oldest first.
    #[builder(default)]
    pub history: Vec<ChatTurn>,
    #[builder(default = "None")]
    pub system_instruction: Option<String>,
    #[builder(default = "None")]
    pub temperature: Option<f64>,
    #[builder(default = "None")]
    pub max_output_tokens: Option<u32>,
}

/// Lazy, finite, non-restartable sequence of fragments. Each pull yields a
/// fragment, a typed error, or `None` at the end.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment>> + Send>>;

#[async_trait]
pub trait CompletionService: DynClone + Send + Sync {
    /// Issues one streamed completion. Errors may surface here, before any
    /// fragment, or as an item of the returned stream.
    async fn stream(&self, request: &CompletionRequest) -> Result<FragmentStream>;
}

dyn_clone::clone_trait_object!(CompletionService);
