//! REPL command parsing

use anyhow::{Result, anyhow, bail};
use lumina_finance::{ChartKind, Period};

/// Parsed line of REPL input
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Show help
    Help,
    /// Show (`None`) or change the history period
    Period(Option<Period>),
    /// Show (`None`) or change the chart style
    Chart(Option<ChartKind>),
    /// Show the news gathered so far
    News,
    /// Show the data summary table
    Summary,
    /// Exit the REPL
    Exit,
    /// Free-text query for the workflow
    Query { text: String },
}

impl Command {
    /// Parse one line of input
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        if input.is_empty() {
            bail!("Empty input");
        }

        let Some(rest) = input.strip_prefix('/') else {
            return Ok(Command::Query {
                text: input.to_string(),
            });
        };

        let parts: Vec<&str> = rest.split_whitespace().collect();
        let Some((cmd, args)) = parts.split_first() else {
            bail!("Empty command");
        };

        match cmd.to_lowercase().as_str() {
            "help" | "h" | "?" => Ok(Command::Help),
            "period" | "p" => {
                let period = args.first().map(|p| p.parse::<Period>()).transpose()?;
                Ok(Command::Period(period))
            }
            "chart" | "c" => {
                let kind = args.first().map(|k| k.parse::<ChartKind>()).transpose()?;
                Ok(Command::Chart(kind))
            }
            "news" | "n" => Ok(Command::News),
            "summary" | "s" => Ok(Command::Summary),
            "exit" | "quit" | "q" => Ok(Command::Exit),
            other => Err(anyhow!("Unknown command: /{other}. Type /help for commands")),
        }
    }
}

pub fn help_text() -> &'static str {
    r"Commands:
  /period [1mo|3mo|6mo|1y|2y|5y]  show or set the history period
  /chart [line|candlestick]       show or set the chart style
  /news                           show the latest news for this session
  /summary                        show the data summary table
  /help                           show this help
  /exit                           quit

Anything else is treated as a query, e.g. Compare AAPL vs GOOGL vs MSFT"
}
