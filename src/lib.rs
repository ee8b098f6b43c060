//! # vibetune - client for the VibeTune pronunciation practice API
//!
//! A small Rust library for talking to the VibeTune handlers: streamed
//! tutor chat, spoken replies, conversation persistence, analytics and
//! short-lived speech credentials.
//!
//! ## Features
//! - Async-first, tokio compatible
//! - Incremental decoding of streamed chat replies (Server-Sent Events)
//! - Typed request/response bodies for every endpoint
//! - Request validation before anything is sent
//!
//! ## Streaming
//!
//! `POST /api/chat` answers with blank-line separated `data:` frames,
//! each holding a JSON object with a `delta` field, ended by
//! `data: [DONE]`. [`sse::DeltaDecoder`] turns raw body chunks into those
//! deltas; [`DeltaStream`] drives it from an HTTP body and
//! [`stream::Deltas`] from any blocking iterator of chunks.
//!
//! ## Example
//! ```no_run
//! use futures::StreamExt;
//! use vibetune::client::{ChatStreaming, VibeTuneClient};
//! use vibetune::model::ChatRequest;
//! use vibetune::options::TransportOptions;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = VibeTuneClient::new(TransportOptions::from_env()?)?;
//!
//!     let request = ChatRequest::new("¿Cómo se dice 'rice'?").with_level("beginner");
//!     let mut deltas = client.stream_chat(&request).await?;
//!     while let Some(delta) = deltas.next().await {
//!         print!("{}", delta?);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod http;
pub mod model;
pub mod options;
pub mod sse;
pub mod stream;
pub mod validate;

// Re-exports for convenience
pub use client::{ChatStreaming, ClientError, VibeTuneClient};
pub use model::{ChatReply, ChatRequest, ConversationRecord, VoiceReply, VoiceRequest};
pub use sse::DeltaDecoder;
pub use stream::{DeltaStream, Deltas};
pub use validate::{ValidationError, Validator};
