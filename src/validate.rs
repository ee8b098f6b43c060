//! Checks run on request bodies before they leave the client.
//!
//! Every rule is evaluated; a [`ValidationError`] lists all offending
//! fields rather than the first one found.

use itertools::Itertools;
use thiserror::Error;

use crate::model::{AnalyticsEvent, ChatRequest, ConversationRecord, VoiceRequest};

/// Longest utterance accepted by the chat and voice endpoints, in characters.
pub const MAX_TEXT_LEN: usize = 4000;

/// Roles a stored conversation turn may have.
pub const MESSAGE_ROLES: [&str; 3] = ["user", "assistant", "system"];

/// A single rule violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Path of the field, e.g. `messages[2].role`.
    pub field: String,
    pub reason: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Validation failed: {}", .errors.iter().join("; "))]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    /// Whether `field` is among the violations.
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

/// Collects violations for one value.
#[derive(Default)]
struct Violations(Vec<FieldError>);

impl Violations {
    fn push(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            reason: reason.into(),
        });
    }

    fn required(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.push(field, "is required");
        }
    }

    fn text(&mut self, field: &str, value: &str, max_len: usize) {
        self.required(field, value);
        let len = value.chars().count();
        if len > max_len {
            self.push(field, format!("is {len} characters, limit is {max_len}"));
        }
    }

    fn finish(self) -> Result<(), ValidationError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { errors: self.0 })
        }
    }
}

/// Request validator.
#[derive(Debug, Clone)]
pub struct Validator {
    max_text_len: usize,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            max_text_len: MAX_TEXT_LEN,
        }
    }
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the utterance length limit.
    pub fn with_max_text_len(mut self, max_text_len: usize) -> Self {
        self.max_text_len = max_text_len;
        self
    }

    pub fn max_text_len(&self) -> usize {
        self.max_text_len
    }

    /// A conversation needs an id and an owning profile; each stored turn
    /// needs a known role.
    pub fn conversation(&self, record: &ConversationRecord) -> Result<(), ValidationError> {
        let mut v = Violations::default();
        v.required("id", &record.id);
        v.required("profile_id", &record.profile_id);

        for (i, message) in record.messages.iter().flatten().enumerate() {
            let role = message.role.trim();
            if role.is_empty() {
                v.push(format!("messages[{i}].role"), "is required");
            } else if !MESSAGE_ROLES.contains(&role) {
                v.push(
                    format!("messages[{i}].role"),
                    format!("must be one of {}, got {role:?}", MESSAGE_ROLES.join(", ")),
                );
            }
        }

        v.finish()
    }

    pub fn chat_request(&self, request: &ChatRequest) -> Result<(), ValidationError> {
        let mut v = Violations::default();
        v.text("text", &request.text, self.max_text_len);
        v.finish()
    }

    pub fn voice_request(&self, request: &VoiceRequest) -> Result<(), ValidationError> {
        let mut v = Violations::default();
        v.text("text", &request.text, self.max_text_len);
        v.finish()
    }

    pub fn analytics_event(&self, event: &AnalyticsEvent) -> Result<(), ValidationError> {
        let mut v = Violations::default();
        v.required("event_type", &event.event_type);
        v.finish()
    }
}
