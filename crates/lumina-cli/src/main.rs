//! LuminaFi terminal client
//!
//! # Usage
//!
//! ```bash
//! export TOGETHER_API_KEY=your_key_here
//!
//! # One-shot query
//! lumina "Compare AAPL vs MSFT" --period 6mo --chart-out chart.png
//!
//! # Interactive session
//! lumina
//! ```

mod commands;
mod render;

use anyhow::Context;
use clap::Parser;
use commands::Command;
use lumina_finance::{
    ChartKind, FinanceConfig, FinanceError, FinanceWorkflow, Period, Session, WorkflowEvent,
};
use lumina_utils::LogFormat;
use lumina_utils::logging::DEFAULT_FILTER;
use render::EventPrinter;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "lumina")]
#[command(about = "Compare stocks and get an AI-written analysis", long_about = None)]
struct Args {
    /// Query to run once; starts an interactive session when omitted
    query: Vec<String>,

    /// History period (1mo, 3mo, 6mo, 1y, 2y, 5y)
    #[arg(short, long)]
    period: Option<Period>,

    /// Chart style (line, candlestick)
    #[arg(short, long)]
    chart_kind: Option<ChartKind>,

    /// Write the rendered chart PNG to this file after each query
    #[arg(long)]
    chart_out: Option<PathBuf>,

    /// Wait for background news before printing results
    #[arg(long)]
    wait_news: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    json_logs: bool,
}

struct App {
    workflow: FinanceWorkflow,
    session: Session,
    period: Period,
    chart_kind: ChartKind,
    chart_out: Option<PathBuf>,
    wait_news: bool,
    events: UnboundedSender<WorkflowEvent>,
    receiver: UnboundedReceiver<WorkflowEvent>,
    printer: EventPrinter,
}

impl App {
    fn new(workflow: FinanceWorkflow, config: &FinanceConfig, args: &Args) -> Self {
        let (events, receiver) = mpsc::unbounded_channel();
        Self {
            workflow,
            session: Session::new(),
            period: args.period.unwrap_or(config.default_period),
            chart_kind: args.chart_kind.unwrap_or(config.default_chart),
            chart_out: args.chart_out.clone(),
            wait_news: args.wait_news,
            events,
            receiver,
            printer: EventPrinter::default(),
        }
    }

    /// Run one query, printing events while the workflow progresses
    async fn ask(&mut self, query: &str) -> Result<(), FinanceError> {
        self.printer.start_run();
        let result = {
            let run = self.workflow.run(
                &mut self.session,
                query,
                self.period,
                self.chart_kind,
                &self.events,
            );
            tokio::pin!(run);

            loop {
                tokio::select! {
                    result = &mut run => break result,
                    Some(event) = self.receiver.recv() => self.printer.handle(&event),
                }
            }
        };
        self.drain_events();
        let analysis = result?;

        if self.wait_news && self.session.join_news().await {
            self.drain_events();
        }

        render::print_news(&self.session.data().news.snapshot());
        if !self.printer.streamed() {
            render::print_analysis(&analysis);
        }
        if let Some(snapshot) = &self.session.data().snapshot {
            render::print_summary(snapshot);
        }
        self.write_chart();
        Ok(())
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.receiver.try_recv() {
            self.printer.handle(&event);
        }
    }

    fn write_chart(&self) {
        let Some(path) = &self.chart_out else {
            return;
        };
        let png = &self.session.data().chart_png;
        if png.is_empty() {
            println!("No chart image to write");
            return;
        }
        match std::fs::write(path, png) {
            Ok(()) => println!("Chart written to {}", path.display()),
            Err(e) => eprintln!("Error writing chart to {}: {}", path.display(), e),
        }
    }

    /// Handle one REPL line; returns `false` on exit
    async fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Help => println!("{}\n", commands::help_text()),
            Command::Period(Some(period)) => {
                self.period = period;
                println!("Period set to {period}");
            }
            Command::Period(None) => println!("Period: {}", self.period),
            Command::Chart(Some(kind)) => {
                self.chart_kind = kind;
                println!("Chart style set to {kind}");
            }
            Command::Chart(None) => println!("Chart style: {}", self.chart_kind),
            Command::News => render::print_news(&self.session.data().news.snapshot()),
            Command::Summary => match &self.session.data().snapshot {
                Some(snapshot) => render::print_summary(snapshot),
                None => println!("No data yet. Ask a question first."),
            },
            Command::Exit => return false,
            Command::Query { text } => {
                if let Err(e) = self.ask(&text).await {
                    eprintln!("Error: {e}\n");
                }
            }
        }
        true
    }

    async fn repl(&mut self) -> anyhow::Result<()> {
        render::print_banner();
        println!("Period: {}  Chart: {}\n", self.period, self.chart_kind);

        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            self.drain_events();
            print!("lumina> ");
            stdout.flush()?;

            let mut input = String::new();
            match stdin.lock().read_line(&mut input) {
                Ok(0) => {
                    println!("\nGoodbye!");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("Error reading input: {}", e);
                    continue;
                }
            }

            if input.trim().is_empty() {
                continue;
            }

            match Command::parse(&input) {
                Ok(command) => {
                    if !self.handle(command).await {
                        println!("Goodbye!");
                        break;
                    }
                }
                Err(e) => eprintln!("{e}\n"),
            }
        }

        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let format = if args.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    lumina_utils::init_tracing_with(DEFAULT_FILTER, format);

    let config = FinanceConfig::from_env().context("Failed to load configuration")?;
    let workflow = FinanceWorkflow::from_config(&config)?;
    info!("Starting lumina with models {} / {}", config.vision_model, config.text_model);

    let mut app = App::new(workflow, &config, &args);

    if args.query.is_empty() {
        return app.repl().await;
    }

    let query = args.query.join(" ");
    app.ask(&query).await?;
    Ok(())
}
