//! Terminal rendering of progress, news, analysis and summaries

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use lumina_finance::report::{self, ArticleDetail, SummaryRow};
use lumina_finance::{MarketSnapshot, NewsItem, WorkflowEvent};
use std::io::{self, Write};

pub fn print_banner() {
    println!(
        r"
╔══════════════════════════════════════════════════════════════╗
║                 LuminaFi Financial Assistant                 ║
║                                                              ║
║  Ask in natural language:                                    ║
║    Compare AAPL vs GOOGL vs MSFT                             ║
║    Analyze TSLA and NVDA                                     ║
║                                                              ║
║  Type /help for commands, /exit to quit                      ║
╚══════════════════════════════════════════════════════════════╝
"
    );
}

/// Prints workflow events as they arrive
#[derive(Debug, Default)]
pub struct EventPrinter {
    streamed: bool,
}

impl EventPrinter {
    /// Forget whether the previous run streamed any text
    pub fn start_run(&mut self) {
        self.streamed = false;
    }

    /// Whether analysis text has already been written to stdout
    pub fn streamed(&self) -> bool {
        self.streamed
    }

    pub fn handle(&mut self, event: &WorkflowEvent) {
        match event {
            WorkflowEvent::Stage(stage) => {
                println!("[{:>3}%] {}...", stage.progress(), stage);
            }
            WorkflowEvent::Warning(msg) => println!("⚠ {msg}"),
            WorkflowEvent::NewsUpdated { count } => println!("📰 News updated: {count} items"),
            WorkflowEvent::ChartReady { rasterized } => {
                if *rasterized {
                    println!("✅ Chart converted for AI vision analysis");
                } else {
                    println!("Chart built; analysis will use text only");
                }
            }
            WorkflowEvent::AnalysisChunk(chunk) => {
                if !self.streamed {
                    println!("\n📊 AI Analysis\n");
                    self.streamed = true;
                }
                print!("{chunk}");
                let _ = io::stdout().flush();
            }
            WorkflowEvent::Completed => {
                if self.streamed {
                    println!();
                }
                println!("✅ Workflow completed successfully!");
            }
        }
    }
}

pub fn print_analysis(analysis: &str) {
    println!("\n📊 AI Analysis\n");
    println!("{analysis}\n");
}

/// Headline ticker plus the first few articles
pub fn print_news(news: &[NewsItem]) {
    println!("\n📰 Latest Financial News");
    if news.is_empty() {
        println!("No news available.");
        return;
    }

    println!("📈 BREAKING NEWS: {}\n", report::news_ticker(news));
    for ArticleDetail {
        index,
        title,
        description,
        url,
        published,
    } in report::article_details(news)
    {
        println!("{index}. {title}");
        if let Some(description) = description {
            println!("   {description}");
        }
        if let Some(url) = url {
            println!("   🔗 {url}");
        }
        println!("   📅 Published: {published}");
    }
    println!();
}

/// Comfy-table rendering of the data summary
pub fn summary_table(snapshot: &MarketSnapshot) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Symbol", "Current Price", "Change", "Change %", "Market Cap"]);

    for SummaryRow {
        symbol,
        current_price,
        change,
        change_pct,
        market_cap,
    } in report::summary_rows(snapshot)
    {
        table.add_row(vec![symbol, current_price, change, change_pct, market_cap]);
    }
    table
}

pub fn print_summary(snapshot: &MarketSnapshot) {
    println!("📋 Data Summary");
    println!("{}\n", summary_table(snapshot));
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumina_finance::{CompanyInfo, SymbolRecord};

    #[test]
    fn test_summary_table_rows() {
        let mut snapshot = MarketSnapshot::new();
        snapshot.push("AAPL", SymbolRecord::available(Vec::new(), CompanyInfo::default()));
        snapshot.push("MSFT", SymbolRecord::unavailable("boom"));

        let rendered = summary_table(&snapshot).to_string();
        assert!(rendered.contains("Current Price"));
        assert!(rendered.contains("AAPL"));
        assert!(rendered.contains("N/A"));
        assert!(rendered.contains("No Data"));
    }

    #[test]
    fn test_event_printer_tracks_streaming() {
        let mut printer = EventPrinter::default();
        printer.handle(&WorkflowEvent::NewsUpdated { count: 3 });
        assert!(!printer.streamed());

        printer.handle(&WorkflowEvent::AnalysisChunk("hello".to_string()));
        assert!(printer.streamed());

        printer.start_run();
        assert!(!printer.streamed());
    }
}
