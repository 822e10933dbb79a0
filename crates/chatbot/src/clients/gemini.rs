use std::time::Duration;

use crate::chat::{
    ChatTurn, CompletionRequest, CompletionService, FinishReason, Fragment, FragmentStream, Role,
    UsageMetadata,
};
use crate::config::{Config, DEFAULT_BASE_URL};
use crate::utils::sse::SseDecoder;
use crate::utils::url::trim_trailing_slashes;
use crate::{Error, Result};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

const API_KEY_HEADER: &str = "x-goog-api-key";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Streaming client for the Gemini `streamGenerateContent` endpoint.
///
/// Cloning is cheap; clones share the underlying `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct Client {
    http_client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl Client {
    pub fn new(api_key: &str) -> Result<Self> {
        Self::from_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn from_url(api_key: &str, base_url: &str) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self::with_http_client(
            http_client,
            SecretString::from(api_key),
            base_url,
        ))
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::from_url(config.api_key.expose_secret(), &config.base_url)
    }

    pub fn with_http_client(
        http_client: reqwest::Client,
        api_key: SecretString,
        base_url: &str,
    ) -> Self {
        Self {
            http_client,
            base_url: trim_trailing_slashes(base_url),
            api_key,
        }
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut api_key = HeaderValue::from_str(self.api_key.expose_secret())
            .map_err(|e| Error::InvalidHeaderValue(API_KEY_HEADER.to_string(), e))?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(API_KEY_HEADER), api_key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        Ok(headers)
    }
}

impl super::Client for Client {}

#[async_trait]
impl CompletionService for Client {
    async fn stream(&self, request: &CompletionRequest) -> Result<FragmentStream> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, request.model
        );
        tracing::debug!(
            model = %request.model,
            history = request.history.len(),
            "requesting streamed completion"
        );

        let response = self
            .http_client
            .post(url)
            .headers(self.headers()?)
            .json(&GenerateContentRequest::from(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(api_error(status.as_u16(), &body));
        }

        Ok(Box::pin(fragments(response.bytes_stream())))
    }
}

/// Decodes an SSE body into fragments, ending at the end of the body or at a
/// `[DONE]` sentinel.
fn fragments<S, B>(body: S) -> impl Stream<Item = Result<Fragment>> + Send
where
    S: Stream<Item = reqwest::Result<B>> + Send + 'static,
    B: AsRef<[u8]> + Send,
{
    try_stream! {
        futures::pin_mut!(body);
        let mut decoder = SseDecoder::new();

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for data in decoder.push(chunk.as_ref())? {
                if data.trim() == "[DONE]" {
                    return;
                }
                yield parse_event(&data)?;
            }
        }

        if let Some(data) = decoder.finish()? {
            if data.trim() != "[DONE]" {
                yield parse_event(&data)?;
            }
        }
    }
}

fn parse_event(data: &str) -> Result<Fragment> {
    let response: GenerateContentResponse = serde_json::from_str(data)?;
    if let Some(error) = response.error {
        return Err(Error::ApiError {
            status: error.code.unwrap_or(500),
            message: error.message,
        });
    }
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_deref())
    {
        tracing::warn!(reason, "prompt blocked by the service");
    }
    Ok(Fragment::from(response))
}

fn api_error(status: u16, body: &str) -> Error {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) if body.trim().is_empty() => reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|status| status.canonical_reason())
            .unwrap_or("unknown error")
            .to_string(),
        Err(_) => body.trim().to_string(),
    };
    Error::ApiError { status, message }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl From<&CompletionRequest> for GenerateContentRequest {
    fn from(request: &CompletionRequest) -> Self {
        let mut contents: Vec<Content> = request.history.iter().map(Content::from).collect();
        contents.push(Content::from(&ChatTurn::user(request.prompt.as_str())));

        let generation_config =
            if request.temperature.is_some() || request.max_output_tokens.is_some() {
                Some(GenerationConfig {
                    temperature: request.temperature,
                    max_output_tokens: request.max_output_tokens,
                })
            } else {
                None
            };

        Self {
            contents,
            system_instruction: request.system_instruction.as_ref().map(|text| Content {
                role: None,
                parts: vec![Part::text(text.as_str())],
            }),
            generation_config,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl From<&ChatTurn> for Content {
    fn from(turn: &ChatTurn) -> Self {
        let role = match turn.role {
            Role::User => "user",
            Role::Assistant => "model",
        };
        Self {
            role: Some(role.to_string()),
            parts: vec![Part::text(turn.content.as_str())],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateContentResponse {
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
    pub model_version: Option<String>,
    pub prompt_feedback: Option<PromptFeedback>,
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<FinishReason>,
    pub index: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub code: Option<u16>,
    pub message: String,
    pub status: Option<String>,
}

impl From<GenerateContentResponse> for Fragment {
    fn from(response: GenerateContentResponse) -> Self {
        let candidate = response.candidates.into_iter().next();
        let finish_reason = candidate.as_ref().and_then(|c| c.finish_reason);

        // Text of every part of the first candidate; none at all means a
        // control chunk rather than an empty string.
        let text = candidate
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
            })
            .filter(|texts| !texts.is_empty())
            .map(|texts| texts.concat());

        Fragment {
            text,
            finish_reason,
            usage: response.usage_metadata,
        }
    }
}
