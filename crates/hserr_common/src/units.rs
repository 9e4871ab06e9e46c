//! Sizes as HotSpot prints them.
//!
//! JVM options (`-Xmx4g`, `-XX:MaxMetaspaceSize=536870912`), heap summaries
//! (`305664K`), code cache lines (`245760Kb`), `/proc/meminfo` (`16266508 kB`)
//! and the container section (`2097152 k`) all use whole numbers with an
//! optional binary unit letter. Everything is normalized to bytes.

use thiserror::Error;

/// Why a size string could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SizeError {
    #[error("negative size")]
    NegativeValue,
    #[error("no digits in size")]
    EmptyNumber,
    #[error("unknown size unit `{0}`")]
    UnknownSuffix(String),
    #[error("size overflows u64")]
    Overflow,
}

const KIB: u64 = 1 << 10;
const MIB: u64 = 1 << 20;
const GIB: u64 = 1 << 30;
const TIB: u64 = 1 << 40;

/// Parse `512m`, `1G`, `305664K`, `245760Kb` or `536870912` into bytes.
///
/// The unit letter is `k/m/g/t` in either case and may be followed by `B`
/// (`kB`, `MB`). No unit means bytes. Whitespace between the number and
/// the unit is allowed.
pub fn parse_size(s: &str) -> Result<u64, SizeError> {
    let s = s.trim();
    let digits_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(digits_end);

    if digits.is_empty() {
        return Err(if s.starts_with('-') {
            SizeError::NegativeValue
        } else {
            SizeError::EmptyNumber
        });
    }

    let multiplier = unit_multiplier(unit.trim_start())?;
    digits
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or(SizeError::Overflow)
}

fn unit_multiplier(unit: &str) -> Result<u64, SizeError> {
    let letter = match unit.strip_suffix(['B', 'b']) {
        Some(letter) if !letter.is_empty() => letter,
        _ => unit,
    };
    match letter {
        "" | "B" | "b" => Ok(1),
        "K" | "k" => Ok(KIB),
        "M" | "m" => Ok(MIB),
        "G" | "g" => Ok(GIB),
        "T" | "t" => Ok(TIB),
        _ => Err(SizeError::UnknownSuffix(unit.to_string())),
    }
}

/// Byte-normalize a size, or `None` when it cannot be parsed.
///
/// Diagnostics treat a malformed value as absent, never as an error.
pub fn normalize(s: &str) -> Option<u64> {
    parse_size(s).ok()
}

/// Bytes with the largest binary unit that divides them exactly.
///
/// `1073741824` → `1G`, `805306368` → `768M`, `1000` → `1000B`.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0B".to_string();
    }
    [(TIB, "T"), (GIB, "G"), (MIB, "M"), (KIB, "K")]
        .iter()
        .find(|(unit, _)| bytes % unit == 0)
        .map(|(unit, suffix)| format!("{}{}", bytes / unit, suffix))
        .unwrap_or_else(|| format!("{}B", bytes))
}
