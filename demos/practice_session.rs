//! One practice turn: spoken reply, saved conversation, analytics.
//!
//! Run with:
//! ```bash
//! export VIBETUNE_API_BASE="http://localhost:3000"
//! cargo run --example practice_session
//! ```

use serde_json::json;
use tracing_subscriber::EnvFilter;
use vibetune::client::VibeTuneClient;
use vibetune::model::{
    AnalyticsEvent, ConversationMessage, ConversationRecord, VoiceRequest,
};
use vibetune::options::TransportOptions;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let client = VibeTuneClient::new(TransportOptions::from_env()?)?;

    let conversation_id = "demo-conversation";
    let profile_id = "demo-profile";
    let utterance = "Me gustaría pedir una paella, por favor.";

    let reply = client
        .voice(
            &VoiceRequest::new(utterance)
                .with_conversation_id(conversation_id)
                .with_topic("restaurant")
                .with_profile_id(profile_id),
        )
        .await?;

    println!("Tutor: {}", reply.reply_text);
    if reply.speak_reply {
        println!("(the client would read this reply aloud)");
    }

    let mut record = ConversationRecord::new(conversation_id, profile_id).with_topic("restaurant");
    record.push_message(ConversationMessage::new("user", utterance));
    record.push_message(ConversationMessage::new("assistant", reply.reply_text.clone()));

    match client.save_conversation(&record).await {
        Ok(saved) => println!("Saved conversation {}", saved.id),
        Err(e) => eprintln!("Could not save conversation: {}", e),
    }

    let tracked = client
        .track(
            &AnalyticsEvent::new("practice_turn")
                .with_metadata(json!({ "topic": "restaurant", "spoken": reply.speak_reply }))
                .with_user_id(profile_id),
        )
        .await;
    println!("Analytics recorded: {}", tracked);

    match client.deepgram_key().await {
        Ok(key) => println!("Deepgram key acquired: {:?}", key.key),
        Err(e) => eprintln!("No Deepgram key: {}", e),
    }

    Ok(())
}
