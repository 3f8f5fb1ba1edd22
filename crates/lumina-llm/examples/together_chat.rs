//! Stream a short answer from Together AI
//!
//! Run with: `TOGETHER_API_KEY=... cargo run -p lumina-llm --example together_chat`

use futures::StreamExt;
use lumina_llm::providers::OpenAIProvider;
use lumina_llm::{CompletionRequest, LLMProvider, Message};
use std::io::Write;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let provider = OpenAIProvider::from_env()?;
    println!("Provider: {}", provider.name());

    let request = CompletionRequest::builder("meta-llama/Llama-3.2-3B-Instruct-Turbo")
        .system("You are a concise financial assistant.")
        .add_message(Message::user("In two sentences, what is a P/E ratio?"))
        .max_tokens(200)
        .temperature(0.3)
        .build();

    let mut stream = provider.complete_stream(request).await?;
    let mut stdout = std::io::stdout();
    while let Some(delta) = stream.next().await {
        print!("{}", delta?);
        stdout.flush()?;
    }
    println!();
    Ok(())
}
