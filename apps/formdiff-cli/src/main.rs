//! formdiff
//!
//! Extracts the interactive fields of PDF forms and reports what changed
//! between two versions of a form:
//!
//! - `extract`: field records of one PDF as JSON
//! - `compare`: extract two PDFs and compare them as consecutive versions
//! - `diff-snapshots`: compare two previously saved version snapshots
//!
//! Results go to stdout; logs go to stderr.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;
mod report;

use commands::OutputFormat;
use config::FormdiffConfig;

#[derive(Parser, Debug)]
#[command(name = "formdiff")]
#[command(version, about = "Extract PDF form fields and compare form versions")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Position tolerance in PDF units (overrides the config file)
    #[arg(long, global = true)]
    tolerance: Option<f64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the form fields of a PDF as JSON
    Extract {
        /// PDF to read
        pdf: PathBuf,
    },

    /// Compare two PDFs as versions 1 and 2 of the same form
    Compare {
        source: PathBuf,
        target: PathBuf,

        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Template the versions belong to (default: source file name)
        #[arg(long)]
        template_id: Option<String>,
    },

    /// Compare two saved version snapshots (JSON)
    DiffSnapshots {
        source: PathBuf,
        target: PathBuf,

        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    // stdout carries the JSON output
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = FormdiffConfig::load(args.config.as_deref())?;
    if let Some(tolerance) = args.tolerance {
        config.compare.position_tolerance = tolerance;
    }
    config.validate()?;
    tracing::debug!(?config, "Loaded configuration");

    let output = match args.command {
        Command::Extract { pdf } => commands::extract(&pdf, &config).await?,
        Command::Compare {
            source,
            target,
            format,
            template_id,
        } => {
            let template_id =
                template_id.unwrap_or_else(|| commands::default_template_id(&source));
            commands::compare(&source, &target, &template_id, format, &config).await?
        }
        Command::DiffSnapshots {
            source,
            target,
            format,
        } => tokio::task::spawn_blocking(move || {
            commands::diff_snapshots(&source, &target, format, &config)
        })
        .await
        .context("Comparison task failed")??,
    };

    println!("{}", output);
    Ok(())
}
