//! hserr common - interpretation engine for JVM fatal error logs
//! (`hs_err_pid<N>.log`).
//!
//! Lines are classified against a pattern catalog, built into typed
//! records, reconstructed into a [`FatalErrorLog`] in one pass and then
//! inspected by the [`DiagnosticEngine`].

pub mod analysis;
pub mod classifier;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fatal_error_log;
pub mod jdk_release;
pub mod jvm_options;
pub mod patterns;
pub mod reader;
pub mod record_type;
pub mod records;
pub mod units;

pub use analysis::{Analysis, Finding, Severity};
pub use classifier::classify;
pub use config::{ColorMode, HserrConfig};
pub use diagnostics::DiagnosticEngine;
pub use error::HserrError;
pub use fatal_error_log::FatalErrorLog;
pub use reader::{parse_file, parse_str, read_log, LogReader};
pub use record_type::{Disposition, MergePolicy, RecordType};
pub use records::Record;

use std::path::Path;

/// Read a dump from disk and run every diagnostic rule over it.
pub fn analyze_file(path: &Path, config: &HserrConfig) -> Result<FatalErrorLog, HserrError> {
    let engine = DiagnosticEngine::from_config(config)?;
    let mut log = parse_file(path, config.parser.unidentified_capacity)?;
    engine.analyze(&mut log);
    Ok(log)
}

/// Same as [`analyze_file`] for text already in memory.
pub fn analyze_str(text: &str, config: &HserrConfig) -> Result<FatalErrorLog, HserrError> {
    let engine = DiagnosticEngine::from_config(config)?;
    let mut log = parse_str(text, config.parser.unidentified_capacity);
    engine.analyze(&mut log);
    Ok(log)
}
