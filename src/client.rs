//! HTTP client for the VibeTune API and its error type.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http::{apply_transport_headers, build_http_client};
use crate::model::{
    AnalyticsAck, AnalyticsEvent, ChatReply, ChatRequest, ConversationRecord, DeepgramKey,
    RealtimeToken, VoiceReply, VoiceRequest,
};
use crate::options::TransportOptions;
use crate::stream::{DeltaStream, SSEResponseExt};
use crate::validate::{ValidationError, Validator};

const DEFAULT_API_BASE: &str = "http://localhost:3000";

/// Errors that can occur during client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The chat stream could not be opened; nothing was decoded.
    #[error("Stream unavailable: {message}")]
    StreamUnavailable {
        status: Option<StatusCode>,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(String),

    #[error("Server error ({status}): {message}")]
    Server { status: StatusCode, message: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Anything that can open a streamed chat reply.
///
/// # Example
/// ```rust,ignore
/// async fn reply_to(chat: &impl ChatStreaming, text: &str) -> Result<String, ClientError> {
///     let reply = chat.chat(&ChatRequest::new(text)).await?;
///     Ok(reply.text)
/// }
/// ```
#[async_trait]
pub trait ChatStreaming: Send + Sync {
    /// Open a delta stream for the request.
    ///
    /// Fails with [`ClientError::StreamUnavailable`] when the endpoint does
    /// not answer with a streamable body.
    async fn stream_chat(&self, request: &ChatRequest) -> Result<DeltaStream, ClientError>;

    /// Stream the reply and concatenate every fragment.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, ClientError> {
        let stream = self.stream_chat(request).await?;
        let text = stream.collect_text().await?;
        Ok(ChatReply { text })
    }
}

/// Client for the VibeTune HTTP handlers.
pub struct VibeTuneClient {
    transport_options: TransportOptions,
    validator: Validator,
    http: reqwest::Client,
}

impl VibeTuneClient {
    /// Create a client; fails if the HTTP client cannot be built.
    pub fn new(transport_options: TransportOptions) -> Result<Self, ClientError> {
        let http = build_http_client(&transport_options)?;
        Ok(Self {
            transport_options,
            validator: Validator::default(),
            http,
        })
    }

    /// Replace the validator run before each request.
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn transport_options(&self) -> &TransportOptions {
        &self.transport_options
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Generate a spoken reply for a practice utterance.
    pub async fn voice(&self, request: &VoiceRequest) -> Result<VoiceReply, ClientError> {
        self.validator.voice_request(request)?;
        self.post_json("/api/voice", request).await
    }

    /// Persist a conversation and return the stored record.
    pub async fn save_conversation(
        &self,
        record: &ConversationRecord,
    ) -> Result<ConversationRecord, ClientError> {
        self.validator.conversation(record)?;
        self.post_json("/api/save-conversation", record).await
    }

    /// Record an analytics event.
    ///
    /// Best-effort: failures are logged and reported as `false`, never as
    /// an error, so callers can ignore the outcome.
    pub async fn track(&self, event: &AnalyticsEvent) -> bool {
        if let Err(e) = self.validator.analytics_event(event) {
            tracing::warn!(error = %e, "dropping invalid analytics event");
            return false;
        }

        match self.post_json::<_, AnalyticsAck>("/api/analytics", event).await {
            Ok(ack) => ack.success,
            Err(e) => {
                tracing::warn!(event_type = %event.event_type, error = %e, "analytics event not recorded");
                false
            }
        }
    }

    /// Fetch a short-lived Deepgram key for speech-to-text.
    pub async fn deepgram_key(&self) -> Result<DeepgramKey, ClientError> {
        self.post_empty("/api/deepgram-tempkey").await
    }

    /// Fetch an ephemeral OpenAI realtime session secret.
    pub async fn realtime_token(&self) -> Result<RealtimeToken, ClientError> {
        self.post_empty("/api/realtime-token").await
    }

    fn endpoint(&self, path: &str) -> String {
        let api_base = self
            .transport_options
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE);
        format!("{}{}", api_base.trim_end_matches('/'), path)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        let url = self.endpoint(path);
        tracing::debug!(%url, "sending request");

        let req = self.http.post(url).header(CONTENT_TYPE, "application/json");
        apply_transport_headers(req, &self.transport_options)
    }

    async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, ClientError>
    where
        Req: Serialize + ?Sized + Sync,
        Resp: DeserializeOwned,
    {
        let response = self.post(path).json(body).send().await?;
        Self::read_json(response).await
    }

    async fn post_empty<Resp: DeserializeOwned>(&self, path: &str) -> Result<Resp, ClientError> {
        let response = self.post(path).body("{}").send().await?;
        Self::read_json(response).await
    }

    async fn read_json<Resp: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<Resp, ClientError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Self::handle_error_response(status, &body));
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Map a non-success response onto the error taxonomy.
    fn handle_error_response(status: StatusCode, body: &str) -> ClientError {
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|e| match e.details {
                Some(details) => format!("{}: {}", e.error, details),
                None => e.error,
            })
            .unwrap_or_else(|_| format!("HTTP {}: {}", status, body));

        match status {
            StatusCode::BAD_REQUEST => ClientError::BadRequest(message),
            StatusCode::SERVICE_UNAVAILABLE => ClientError::PersistenceUnavailable(message),
            _ => ClientError::Server { status, message },
        }
    }
}

#[async_trait]
impl ChatStreaming for VibeTuneClient {
    async fn stream_chat(&self, request: &ChatRequest) -> Result<DeltaStream, ClientError> {
        self.validator.chat_request(request)?;

        let response = self
            .post("/api/chat")
            .header(ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await?;

        response.delta_stream().await
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    details: Option<String>,
}
