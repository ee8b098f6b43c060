//! Request and response bodies of the VibeTune endpoints.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::options::SecretString;

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// What the learner said or typed.
    pub text: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    /// Lesson stage, e.g. "warmup" or "practice".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,

    /// Learner level, e.g. "beginner".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Recent pronunciation mistakes the tutor should revisit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_mistakes: Option<Vec<String>>,
}

impl ChatRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    pub fn with_last_mistakes(mut self, mistakes: Vec<String>) -> Self {
        self.last_mistakes = Some(mistakes);
        self
    }
}

/// A chat reply assembled from all streamed deltas.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ChatReply {
    pub text: String,
}

/// Body of `POST /api/voice`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoiceRequest {
    pub text: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
}

impl VoiceRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_profile_id(mut self, profile_id: impl Into<String>) -> Self {
        self.profile_id = Some(profile_id.into());
        self
    }
}

/// Response of `POST /api/voice`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoiceReply {
    /// Whether the client should read the reply aloud.
    pub speak_reply: bool,
    pub reply_text: String,
}

/// One turn of a stored conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationMessage {
    pub role: String,
    pub content: String,

    /// Columns the client does not interpret (timestamps, scores, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConversationMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            extra: Map::new(),
        }
    }
}

/// Conversation row sent to and returned by `POST /api/save-conversation`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationRecord {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub profile_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<ConversationMessage>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConversationRecord {
    pub fn new(id: impl Into<String>, profile_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            profile_id: profile_id.into(),
            topic: None,
            messages: None,
            extra: Map::new(),
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Append a turn, creating the message list if needed.
    pub fn push_message(&mut self, message: ConversationMessage) {
        self.messages.get_or_insert_with(Vec::new).push(message);
    }
}

/// Body of `POST /api/analytics`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsEvent {
    pub event_type: String,

    #[serde(default)]
    pub metadata: Value,

    pub user_id: Option<String>,
}

impl AnalyticsEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            metadata: Value::Object(Map::new()),
            user_id: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct AnalyticsAck {
    #[serde(default)]
    pub success: bool,
}

/// Response of `POST /api/deepgram-tempkey`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeepgramKey {
    pub key: SecretString,
}

/// Response of `POST /api/realtime-token`.
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeToken {
    pub client_secret: ClientSecret,
}

/// OpenAI hands out the realtime secret either bare or with its expiry.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ClientSecret {
    Plain(SecretString),
    WithExpiry {
        value: SecretString,
        /// Unix timestamp in seconds.
        #[serde(default)]
        expires_at: Option<u64>,
    },
}

impl ClientSecret {
    pub fn secret(&self) -> &SecretString {
        match self {
            ClientSecret::Plain(value) | ClientSecret::WithExpiry { value, .. } => value,
        }
    }

    pub fn expires_at(&self) -> Option<u64> {
        match self {
            ClientSecret::Plain(_) => None,
            ClientSecret::WithExpiry { expires_at, .. } => *expires_at,
        }
    }
}
