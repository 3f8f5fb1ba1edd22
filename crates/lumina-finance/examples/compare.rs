//! End-to-end comparison example
//!
//! Runs the full workflow for one query and prints progress events as they
//! arrive.
//!
//! To run this example:
//! ```bash
//! export TOGETHER_API_KEY=your_key_here
//! cargo run --example compare -- "Compare AAPL vs MSFT"
//! ```

use lumina_finance::{FinanceConfig, FinanceWorkflow, Session, WorkflowEvent};
use std::env;
use std::io::Write;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("warn,lumina_finance=info")
        .with_writer(std::io::stderr)
        .init();

    let query = env::args()
        .nth(1)
        .unwrap_or_else(|| "Compare AAPL vs MSFT".to_string());

    let config = FinanceConfig::from_env()?;
    let workflow = FinanceWorkflow::from_config(&config)?;
    let mut session = Session::new();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                WorkflowEvent::Stage(stage) => println!("\n[{:>3}%] {}", stage.progress(), stage),
                WorkflowEvent::Warning(msg) => println!("warning: {msg}"),
                WorkflowEvent::NewsUpdated { count } => println!("news items: {count}"),
                WorkflowEvent::ChartReady { rasterized } => {
                    println!("chart ready (png: {rasterized})")
                }
                WorkflowEvent::AnalysisChunk(chunk) => {
                    print!("{chunk}");
                    let _ = std::io::stdout().flush();
                }
                WorkflowEvent::Completed => println!("\n=== done ==="),
            }
        }
    });

    workflow
        .run(&mut session, &query, config.default_period, config.default_chart, &tx)
        .await?;

    session.join_news().await;
    drop(tx);
    drop(session);
    printer.await?;

    Ok(())
}
