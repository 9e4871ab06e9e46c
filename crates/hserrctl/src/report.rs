//! Report rendering: plain/colored text for people, JSON for tools.
//!
//! Findings come first in the order the engine produced them, then a short
//! summary of the crash and finally the lines nothing recognized.

use anyhow::{Context, Result};
use hserr_common::units::format_size;
use hserr_common::{ColorMode, FatalErrorLog, Finding, Severity};
use owo_colors::OwoColorize;
use std::fmt::Write;

const SEPARATOR: &str = "------------------------------------------------------------";

/// Whether to emit ANSI colors. Files never get colors.
pub fn use_color(mode: ColorMode, to_terminal: bool) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => to_terminal,
    }
}

pub fn render_json(log: &FatalErrorLog) -> Result<String> {
    serde_json::to_string_pretty(log).context("failed to serialize analysis")
}

pub fn render_text(log: &FatalErrorLog, source: &str, color: bool) -> String {
    let mut out = String::new();
    write_text(&mut out, log, source, color);
    out
}

fn write_text(out: &mut String, log: &FatalErrorLog, source: &str, color: bool) {
    writeln!(out, "{}", heading(&format!("Fatal error log: {}", source), color)).ok();
    writeln!(out, "{}", SEPARATOR).ok();

    writeln!(out).ok();
    writeln!(out, "{}", heading(&format!("Findings ({})", log.findings.len()), color)).ok();
    if log.findings.is_empty() {
        writeln!(out, "  none").ok();
    }
    for finding in &log.findings {
        write_finding(out, finding, color);
    }

    writeln!(out).ok();
    writeln!(out, "{}", heading("Summary", color)).ok();
    for (label, value) in summary(log) {
        writeln!(out, "  {:<18} {}", format!("{}:", label), value).ok();
    }

    if !log.unidentified.is_empty() {
        writeln!(out).ok();
        let title = if log.is_truncated() {
            format!(
                "Unidentified lines ({} shown, {} more dropped)",
                log.unidentified.len(),
                log.unidentified_dropped
            )
        } else {
            format!("Unidentified lines ({})", log.unidentified.len())
        };
        writeln!(out, "{}", heading(&title, color)).ok();
        for line in &log.unidentified {
            writeln!(out, "  | {}", line).ok();
        }
    }
}

fn write_finding(out: &mut String, finding: &Finding, color: bool) {
    let tag = format!("[{}]", finding.severity());
    let tag = if color {
        match finding.severity() {
            Severity::Error => tag.bright_red().bold().to_string(),
            Severity::Warn => tag.yellow().to_string(),
            Severity::Info => tag.cyan().to_string(),
        }
    } else {
        tag
    };
    writeln!(out, "  {:<7} {}", tag, finding.analysis.key()).ok();
    writeln!(out, "          {}", finding.message()).ok();
    if let Some(detail) = &finding.detail {
        let detail = format!("detail: {}", detail);
        if color {
            writeln!(out, "          {}", detail.dimmed()).ok();
        } else {
            writeln!(out, "          {}", detail).ok();
        }
    }
}

fn heading(text: &str, color: bool) -> String {
    if color {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}

/// Label/value pairs for the fields a reader checks first. Absent fields
/// are left out.
fn summary(log: &FatalErrorLog) -> Vec<(&'static str, String)> {
    let mut rows = Vec::new();
    if let Some(signal) = log.signal() {
        rows.push(("Signal", signal.to_string()));
    }
    if let Some(frame) = log.problematic_frame() {
        rows.push(("Problematic frame", frame.raw.trim_start_matches('#').trim().to_string()));
    }
    if let Some(thread) = &log.current_thread {
        rows.push(("Current thread", thread.value.clone()));
    }
    match (log.jdk_version(), &log.vm_info) {
        (Some(version), Some(info)) => rows.push((
            "JDK",
            format!("{} built by {}", version, info.builder.as_deref().unwrap_or("unknown")),
        )),
        (Some(version), None) => rows.push(("JDK", version.to_string())),
        (None, Some(info)) => rows.push(("JDK", info.description.clone())),
        (None, None) => {}
    }
    if let Some(os) = &log.os {
        rows.push(("OS", os.description.clone()));
    }
    if let Some(host) = &log.host {
        rows.push(("Host", host.value.clone()));
    }
    if let Some(cpu) = &log.cpu {
        if let Some(total) = cpu.total {
            rows.push(("CPUs", total.to_string()));
        }
    }
    if let Some(memory) = &log.memory {
        if let Some(physical) = memory.physical_bytes {
            rows.push(("Physical memory", format_size(physical)));
        }
    }
    if let Some(rss) = log
        .process_memory_stat("Resident Set Size")
        .and_then(|stat| stat.bytes)
    {
        rows.push(("Resident set", format_size(rss)));
    }
    if let Some(heap) = log.jvm_options().max_heap() {
        rows.push(("Max heap", format_size(heap)));
    }
    let elapsed = log
        .elapsed_time
        .as_ref()
        .and_then(|e| e.seconds)
        .or_else(|| log.time.as_ref().and_then(|t| t.elapsed_seconds));
    if let Some(seconds) = elapsed {
        rows.push(("Uptime", format!("{:.0}s", seconds)));
    }
    rows.push((
        "Model",
        format!(
            "{} frames, {} threads, {} libraries, {} events",
            log.frames.len(),
            log.threads.len(),
            log.dynamic_libraries.len(),
            log.events.len()
        ),
    ));
    rows
}
