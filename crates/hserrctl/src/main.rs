//! hserrctl - explain a JVM fatal error log
//!
//! Reads one hs_err dump, runs the diagnostic rules and prints a report
//! (text or JSON) to stdout or a file.

mod cli;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use hserr_common::{analyze_file, HserrConfig};
use std::fs;
use std::io::{self, IsTerminal, Write};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Log filter override, e.g. `HSERR_LOG=hserr_common=trace`
const LOG_ENV: &str = "HSERR_LOG";

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    info!("hserrctl v{}", env!("HSERR_VERSION"));

    let config = HserrConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    let log = analyze_file(&cli.dump, &config)
        .with_context(|| format!("failed to analyze {}", cli.dump.display()))?;
    debug!("{} findings", log.findings.len());

    let rendered = if cli.json {
        report::render_json(&log)?
    } else {
        let mode = cli.color.unwrap_or(config.output.color);
        let to_terminal = cli.output.is_none() && io::stdout().is_terminal();
        let source = cli.dump.display().to_string();
        report::render_text(&log, &source, report::use_color(mode, to_terminal))
    };

    match &cli.output {
        Some(path) => {
            fs::write(path, rendered.as_bytes())
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            info!("report written to {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(rendered.as_bytes())
                .and_then(|_| stdout.flush())
                .context("failed to write report")?;
        }
    }

    Ok(())
}

/// Diagnostics go to stderr so stdout carries only the report.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
