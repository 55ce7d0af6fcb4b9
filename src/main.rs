//! Close-price prediction CLI.
//!
//! ```bash
//! # One prediction
//! close-inference predict --open 100 --high 105 --low 98
//!
//! # Interactive session: one "open high low" line per prediction
//! close-inference --artifacts ./artifacts session
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use close_inference::{
    ArtifactStore, Config, HistoryLedger, PredictionReport, PredictionSession, RawInput,
    SystemMonitor,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tabled::{Table, Tabled};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "close-inference", version, about = "Predict a stock's Close from Open, High and Low")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the model and scaler artifacts
    #[arg(short, long, global = true)]
    artifacts: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Predict once and exit
    Predict {
        /// Opening price, clamped to [0, 10000]
        #[arg(long, allow_negative_numbers = true)]
        open: f64,

        /// High price, clamped to [0, 10000]
        #[arg(long, allow_negative_numbers = true)]
        high: f64,

        /// Low price, clamped to [0, 10000]
        #[arg(long, allow_negative_numbers = true)]
        low: f64,
    },

    /// Read "open high low" lines from stdin until EOF or `quit`
    Session,
}

#[derive(Tabled)]
struct InputTableRow {
    #[tabled(rename = "Open")]
    open: String,
    #[tabled(rename = "High")]
    high: String,
    #[tabled(rename = "Low")]
    low: String,
}

#[derive(Tabled)]
struct HistoryTableRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Open")]
    open: String,
    #[tabled(rename = "High")]
    high: String,
    #[tabled(rename = "Low")]
    low: String,
    #[tabled(rename = "Prediction")]
    prediction: String,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("close_inference=info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(dir) = cli.artifacts {
        config.artifacts.dir = dir;
    }

    let monitor = SystemMonitor::new(&config.monitor);
    let store = ArtifactStore::new(config);
    let mut session = PredictionSession::new(monitor);

    match cli.command {
        Commands::Predict { open, high, low } => {
            let report = session.submit(&store, RawInput::new(open, high, low))?;
            print_report(&report, session.history());
        }
        Commands::Session => run_session(&store, &mut session)?,
    }

    Ok(())
}

fn run_session(store: &ArtifactStore, session: &mut PredictionSession<SystemMonitor>) -> Result<()> {
    info!(artifacts = %store.artifact_dir().display(), "session started");

    // Load up front so a missing artifact is reported before the first prompt
    if let Err(e) = store.get() {
        eprintln!("error: {e}");
        return Ok(());
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    prompt(&mut stdout)?;

    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();

        match trimmed {
            "" => {}
            "quit" | "exit" => break,
            "history" => println!("{}", history_table(session.history())),
            _ => match RawInput::parse_line(trimmed) {
                Ok(input) => match session.submit(store, input) {
                    Ok(report) => print_report(&report, session.history()),
                    Err(e) => eprintln!("error: {e}"),
                },
                Err(e) => eprintln!("error: {e:#}"),
            },
        }

        prompt(&mut stdout)?;
    }

    info!(predictions = session.history().len(), "session ended");
    Ok(())
}

fn prompt(stdout: &mut io::Stdout) -> Result<()> {
    write!(stdout, "open high low> ")?;
    stdout.flush()?;
    Ok(())
}

fn print_report(report: &PredictionReport, history: &HistoryLedger) {
    let input = InputTableRow {
        open: format!("{:.2}", report.input.open()),
        high: format!("{:.2}", report.input.high()),
        low: format!("{:.2}", report.input.low()),
    };

    println!("User input:");
    println!("{}", Table::new([input]));
    println!();
    println!("Prediction: {}", report.prediction);
    println!();
    println!("History:");
    println!("{}", history_table(history));
    println!();
    println!("System monitoring:");
    println!("  Runtime: {:.2} seconds", report.runtime.as_secs_f64());
    println!("  CPU Usage: {:.1}%", report.system.cpu_percent);
    println!("  Memory Usage: {:.1}%", report.system.memory_percent);
}

fn history_table(history: &HistoryLedger) -> Table {
    Table::new(history.iter().enumerate().map(|(index, row)| HistoryTableRow {
        index,
        open: format!("{:.2}", row.open),
        high: format!("{:.2}", row.high),
        low: format!("{:.2}", row.low),
        prediction: format!("{:.4}", row.prediction),
    }))
}
