use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod app;
mod config;

use app::{App, Command, Flow};
use config::{AppConfig, OutputFormat};

/// tracesync - filter a live trace stream and keep views in time sync
#[derive(Parser, Debug)]
#[command(name = "tracesync")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML config file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Drain interval in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Shortest delay between generated records, in milliseconds
    #[arg(long)]
    jitter_min_ms: Option<u64>,

    /// Longest delay between generated records, in milliseconds
    #[arg(long)]
    jitter_max_ms: Option<u64>,

    /// Records generated before streaming starts
    #[arg(long)]
    backlog: Option<usize>,

    /// Seed for reproducible record generation
    #[arg(long)]
    seed: Option<u64>,

    /// Number of independent views
    #[arg(long)]
    views: Option<usize>,

    /// Initial filter for view 0, e.g. 'module eq "net"'
    #[arg(short, long)]
    filter: Option<String>,

    /// Display format, e.g. '[{timestamp}][{module:10}] : {message}'
    #[arg(long)]
    format: Option<String>,

    /// Output format
    #[arg(long, value_enum)]
    output: Option<OutputFormat>,

    /// Log level used when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    /// Command-line values take precedence over the config file
    fn apply(self, config: &mut AppConfig) {
        if let Some(tick_ms) = self.tick_ms {
            config.tick_ms = tick_ms;
        }
        if let Some(min) = self.jitter_min_ms {
            config.jitter_min_ms = min;
        }
        if let Some(max) = self.jitter_max_ms {
            config.jitter_max_ms = max;
        }
        if let Some(backlog) = self.backlog {
            config.backlog = backlog;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(views) = self.views {
            config.views = views;
        }
        if self.filter.is_some() {
            config.filter = self.filter;
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(log_level) = self.log_level {
            config.log_level = log_level;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let result = run().await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

async fn run() -> Result<()> {
    let args = Args::parse();
    let mut config = AppConfig::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    // Logs go to stderr; stdout carries rows only
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut app = App::new(&config, std::io::stdout())?;
    app.start();

    let mut ticks = tokio::time::interval(config.tick());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = ticks.tick() => app.tick()?,

            line = lines.next_line(), if stdin_open => {
                let Some(line) = line? else {
                    // Keep streaming until interrupted
                    stdin_open = false;
                    continue;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(command) => {
                        if app.handle(command)? == Flow::Quit {
                            break;
                        }
                    }
                    Err(e) => app.reject(&e)?,
                }
            }

            _ = tokio::signal::ctrl_c() => break,
        }
    }

    app.shutdown();
    Ok(())
}
