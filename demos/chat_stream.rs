//! Stream a tutor reply from the chat endpoint.
//!
//! Run with:
//! ```bash
//! export VIBETUNE_API_BASE="http://localhost:3000"
//! cargo run --example chat_stream -- "¿Cómo pronuncio 'perro'?"
//! ```

use std::io::Write;

use futures::StreamExt;
use tracing_subscriber::EnvFilter;
use vibetune::client::{ChatStreaming, VibeTuneClient};
use vibetune::model::ChatRequest;
use vibetune::options::TransportOptions;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let text = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Hola, ¿qué tal?".to_string());

    let client = VibeTuneClient::new(TransportOptions::from_env()?)?;

    let request = ChatRequest::new(text)
        .with_topic("small talk")
        .with_stage("practice")
        .with_level("beginner");

    println!("Streaming reply...\n");

    let mut deltas = client.stream_chat(&request).await?;
    let mut stdout = std::io::stdout();
    while let Some(delta) = deltas.next().await {
        match delta {
            Ok(delta) => {
                print!("{}", delta);
                stdout.flush()?;
            }
            Err(e) => {
                eprintln!("\nStream failed: {}", e);
                return Err(e.into());
            }
        }
    }

    println!();
    Ok(())
}
