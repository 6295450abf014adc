mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::attribute::AttributeArgs;
use commands::list::ListArgs;

/// Performance attribution over portfolio and benchmark holdings
#[derive(Parser)]
#[command(
    name = "attrib",
    version,
    about = "Performance attribution over portfolio and benchmark holdings",
    long_about = "Decomposes a portfolio's excess return over its benchmark with \
                  Brinson-Fachler, Brinson-Hood-Beebower or fixed-income effects \
                  analysis, grouped by a classification criterion and linked \
                  across periods with decimal precision."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Round numbers to this many decimal places (table, csv and minimal output)
    #[arg(long, global = true)]
    decimals: Option<u32>,

    /// Log pipeline stages to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an attribution and link it from the reference date
    Attribute(AttributeArgs),
    /// List portfolios, benchmarks, models, criteria and effects
    List(ListArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("perf_attribution_core=debug,attrib=debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // stdout carries the results
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Attribute(args) => commands::attribute::run_attribute(args),
        Commands::List(args) => commands::list::run_list(args),
        Commands::Version => {
            println!("attrib {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value, cli.decimals);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
