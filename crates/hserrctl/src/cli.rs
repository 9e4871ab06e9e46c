//! CLI - Command-line argument parsing
//!
//! Keeps argument parsing separate from execution logic.

use clap::Parser;
use hserr_common::ColorMode;
use std::path::PathBuf;

/// hserrctl - explain a JVM fatal error log
#[derive(Parser, Debug)]
#[command(name = "hserrctl")]
#[command(about = "Interpret a JVM fatal error log (hs_err_pid<N>.log)", long_about = None)]
#[command(version = env!("HSERR_VERSION"))]
pub struct Cli {
    /// Fatal error log to analyze
    pub dump: PathBuf,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Emit the full model and findings as JSON
    #[arg(long)]
    pub json: bool,

    /// Config file (default: ~/.config/hserr/config.toml, then /etc/hserr/config.toml)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Color: auto, always or never (overrides the config file)
    #[arg(long, value_name = "WHEN", value_parser = parse_color)]
    pub color: Option<ColorMode>,

    /// Debug logging on stderr (HSERR_LOG takes precedence)
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_color(value: &str) -> Result<ColorMode, String> {
    ColorMode::parse(value).ok_or_else(|| format!("expected auto, always or never, got `{}`", value))
}
