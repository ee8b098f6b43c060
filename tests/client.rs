//! Integration tests for the VibeTune client using wiremock.

use futures::StreamExt;
use reqwest::StatusCode;
use serde_json::json;
use vibetune::client::{ChatStreaming, ClientError, VibeTuneClient};
use vibetune::model::{AnalyticsEvent, ChatRequest, ConversationRecord, VoiceRequest};
use vibetune::options::TransportOptions;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SSE_BODY: &str = "data: {\"delta\":\"Hi\"}\n\ndata: {\"delta\":\" there\"}\n\ndata: [DONE]\n\n";

fn client_for(server: &MockServer) -> VibeTuneClient {
    VibeTuneClient::new(
        TransportOptions::default()
            .with_base_url(server.uri())
            .with_api_key("test-token"),
    )
    .unwrap()
}

fn sse_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/event-stream")
}

#[tokio::test]
async fn stream_chat_yields_deltas() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("accept", "text/event-stream"))
        .and(body_json(json!({
            "text": "Hola",
            "topic": "greetings",
            "lastMistakes": ["h is silent"]
        })))
        .respond_with(sse_response(SSE_BODY))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let request = ChatRequest::new("Hola")
        .with_topic("greetings")
        .with_last_mistakes(vec!["h is silent".to_string()]);

    let mut stream = client.stream_chat(&request).await.unwrap();
    let mut deltas = Vec::new();
    while let Some(delta) = stream.next().await {
        deltas.push(delta.unwrap());
    }

    assert_eq!(deltas, vec!["Hi", " there"]);
}

#[tokio::test]
async fn chat_concatenates_reply() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(sse_response(
            "data: {\"delta\":\"Muy \"}\n\ndata: oops\n\ndata: {\"delta\":\"bien\"}\n\n",
        ))
        .mount(&mock_server)
        .await;

    let reply = client_for(&mock_server)
        .chat(&ChatRequest::new("Buenos días"))
        .await
        .unwrap();

    assert_eq!(reply.text, "Muy bien");
}

#[tokio::test]
async fn stream_chat_error_status_is_stream_unavailable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server)
        .stream_chat(&ChatRequest::new("Hola"))
        .await
        .unwrap_err();

    match err {
        ClientError::StreamUnavailable { status, message } => {
            assert_eq!(status, Some(StatusCode::INTERNAL_SERVER_ERROR));
            assert!(message.contains("upstream exploded"), "got: {message}");
        }
        other => panic!("expected StreamUnavailable, got: {other:?}"),
    }
}

#[tokio::test]
async fn stream_chat_error_status_without_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server)
        .stream_chat(&ChatRequest::new("Hola"))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Stream unavailable: HTTP 503 Service Unavailable");
}

#[tokio::test]
async fn stream_chat_can_stop_after_first_delta() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(sse_response(SSE_BODY))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let mut stream = client.stream_chat(&ChatRequest::new("Hola")).await.unwrap();

    assert_eq!(stream.next().await.unwrap().unwrap(), "Hi");
    drop(stream);

    // Abandoning a stream leaves the client usable for the next turn.
    Mock::given(method("POST"))
        .and(path("/api/voice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "speakReply": false,
            "replyText": "Vale"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let reply = client.voice(&VoiceRequest::new("Otra vez")).await.unwrap();
    assert_eq!(reply.reply_text, "Vale");
}

#[tokio::test]
async fn stream_chat_empty_body_is_stream_unavailable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server)
        .stream_chat(&ChatRequest::new("Hola"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::StreamUnavailable { .. }));
}

#[tokio::test]
async fn blank_chat_text_is_rejected_locally() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(sse_response(SSE_BODY))
        .expect(0)
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server)
        .stream_chat(&ChatRequest::new("  "))
        .await
        .unwrap_err();

    match err {
        ClientError::Validation(e) => assert!(e.has_field("text")),
        other => panic!("expected Validation, got: {other:?}"),
    }
}

#[tokio::test]
async fn voice_round_trip() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/voice"))
        .and(body_json(json!({
            "text": "Quiero un café",
            "conversationId": "c1",
            "profileId": "p1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "speakReply": true,
            "replyText": "¡Claro! ¿Con leche?"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let reply = client_for(&mock_server)
        .voice(
            &VoiceRequest::new("Quiero un café")
                .with_conversation_id("c1")
                .with_profile_id("p1"),
        )
        .await
        .unwrap();

    assert!(reply.speak_reply);
    assert_eq!(reply.reply_text, "¡Claro! ¿Con leche?");
}

#[tokio::test]
async fn save_conversation_returns_stored_record() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/save-conversation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "c1",
            "profile_id": "p1",
            "topic": "food",
            "created_at": "2025-03-01T10:00:00Z"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let saved = client_for(&mock_server)
        .save_conversation(&ConversationRecord::new("c1", "p1").with_topic("food"))
        .await
        .unwrap();

    assert_eq!(saved.id, "c1");
    assert_eq!(saved.topic.as_deref(), Some("food"));
    assert_eq!(saved.extra["created_at"], "2025-03-01T10:00:00Z");
}

#[tokio::test]
async fn save_conversation_status_mapping() {
    let cases = [
        (400u16, json!({ "error": "Missing required fields" })),
        (503, json!({ "error": "Database not configured" })),
        (500, json!({ "error": "Failed to save conversation", "details": "timeout" })),
    ];

    for (status, body) in cases {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/save-conversation"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&mock_server)
            .await;

        let err = client_for(&mock_server)
            .save_conversation(&ConversationRecord::new("c1", "p1"))
            .await
            .unwrap_err();

        match (status, err) {
            (400, ClientError::BadRequest(m)) => assert_eq!(m, "Missing required fields"),
            (503, ClientError::PersistenceUnavailable(m)) => {
                assert_eq!(m, "Database not configured")
            }
            (500, ClientError::Server { message, .. }) => {
                assert_eq!(message, "Failed to save conversation: timeout")
            }
            (status, other) => panic!("status {status}: unexpected {other:?}"),
        }
    }
}

#[tokio::test]
async fn save_conversation_without_ids_never_hits_server() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server)
        .save_conversation(&ConversationRecord::new("", "p1"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Validation(ref e) if e.has_field("id")));
}

#[tokio::test]
async fn track_is_best_effort() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/analytics"))
        .and(body_json(json!({
            "event_type": "lesson_completed",
            "metadata": { "score": 92 },
            "user_id": "p1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let event = AnalyticsEvent::new("lesson_completed")
        .with_metadata(json!({ "score": 92 }))
        .with_user_id("p1");
    assert!(client.track(&event).await);

    // Unmatched body: wiremock answers 404, which must not surface as an error.
    assert!(!client.track(&AnalyticsEvent::new("other")).await);
}

#[tokio::test]
async fn short_lived_credentials() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/deepgram-tempkey"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "key": "dg-temp" })))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/realtime-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "client_secret": { "value": "ek_abc", "expires_at": 1767225600 }
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);

    let key = client.deepgram_key().await.unwrap();
    assert_eq!(key.key.expose_secret(), "dg-temp");
    assert_eq!(format!("{:?}", key.key), "SecretString([REDACTED])");

    let token = client.realtime_token().await.unwrap();
    assert_eq!(token.client_secret.secret().expose_secret(), "ek_abc");
    assert_eq!(token.client_secret.expires_at(), Some(1767225600));
}
