//! SYSTEM section and summary records: OS identity, limits, memory, CPU,
//! vm_info and timing.

use super::squash_whitespace;
use crate::jdk_release::JdkVersion;
use crate::patterns::compile_field;
use crate::record_type::RecordType;
use crate::units;
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static OS_RELEASE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r"(?:release |DISTRIB_RELEASE=)(\d+(?:\.\d+)*)"));
static RLIMIT_ENTRY: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile_field(r"\b([A-Z]+) (infinity|unlimited|\d+[kKmMgG]?)\b")
});
static CPU_TOTAL: LazyLock<Option<Regex>> = LazyLock::new(|| compile_field(r"total (\d+)"));
static CPU_ACTIVE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r"initial active (\d+)"));
static MEMORY_PAGE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r"^Memory: (\d+[kKmMgG]?) page"));
static MEMORY_PHYSICAL: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile_field(r"physical (\d+[kKmMgG]?)\s*\((\d+[kKmMgG]?) free\)")
});
static MEMORY_SWAP: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r"swap (\d+[kKmMgG]?)\s*\((\d+[kKmMgG]?) free\)"));
static PROCESS_MEMORY_SIZE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r"^[^:]+:\s*(\d+[kKmMgG])\b"));
static PROCESS_MEMORY_PEAK: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r"\(peak: (\d+[kKmMgG])\)"));
static VM_INFO_JRE: LazyLock<Option<Regex>> = LazyLock::new(|| compile_field(r"\(([^()]*)\)"));
static VM_INFO_ARCH: LazyLock<Option<Regex>> = LazyLock::new(|| compile_field(r"\bfor (\S+)"));
static VM_INFO_BUILT_ON: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile_field(r"built on (\d{4}-\d{2}-\d{2}|[A-Z][a-z]{2}\s+\d{1,2} \d{4})")
});
static VM_INFO_BUILDER: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r#"\bby "([^"]*)""#));
static VM_INFO_COMPILER: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r#"\bby "[^"]*" with (.+)$"#));
static ELAPSED: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r"elapsed time: (\d+(?:\.\d+)?) seconds"));
static THP_SETTING: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r"transparent_hugepage/([a-z_]+)"));
static THP_MODE: LazyLock<Option<Regex>> = LazyLock::new(|| compile_field(r"\[([a-z+]+)\]"));

fn first_capture(re: &LazyLock<Option<Regex>>, text: &str) -> Option<String> {
    re.as_ref()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1).map(|m| m.as_str().to_string()))
}

/// Text after the first `:` of a labeled line.
fn payload(line: &str) -> &str {
    line.split_once(':').map(|(_, rest)| rest.trim()).unwrap_or("")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsFamily {
    Linux,
    Windows,
    MacOs,
    Solaris,
    Aix,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsVendor {
    RedHat,
    CentOs,
    Oracle,
    Rocky,
    Alma,
    Fedora,
    Ubuntu,
    Debian,
    Suse,
    Amazon,
    Alpine,
    Microsoft,
    Apple,
    Unknown,
}

impl OsVendor {
    fn detect(lower: &str) -> Self {
        const VENDORS: &[(&str, OsVendor)] = &[
            ("red hat", OsVendor::RedHat),
            ("centos", OsVendor::CentOs),
            ("oracle linux", OsVendor::Oracle),
            ("rocky", OsVendor::Rocky),
            ("almalinux", OsVendor::Alma),
            ("fedora", OsVendor::Fedora),
            ("ubuntu", OsVendor::Ubuntu),
            ("debian", OsVendor::Debian),
            ("suse", OsVendor::Suse),
            ("amazon linux", OsVendor::Amazon),
            ("alpine", OsVendor::Alpine),
            ("windows", OsVendor::Microsoft),
            ("mac os", OsVendor::Apple),
            ("macos", OsVendor::Apple),
            ("darwin", OsVendor::Apple),
        ];
        VENDORS
            .iter()
            .find(|(needle, _)| lower.contains(needle))
            .map(|(_, vendor)| *vendor)
            .unwrap_or(OsVendor::Unknown)
    }

    pub fn is_linux_distribution(&self) -> bool {
        !matches!(self, OsVendor::Microsoft | OsVendor::Apple | OsVendor::Unknown)
    }
}

impl OsFamily {
    fn detect(lower: &str, vendor: OsVendor) -> Self {
        if lower.contains("windows") {
            OsFamily::Windows
        } else if vendor == OsVendor::Apple || lower.contains("bsduname") {
            OsFamily::MacOs
        } else if lower.contains("solaris") || lower.contains("sunos") {
            OsFamily::Solaris
        } else if lower.contains("aix") {
            OsFamily::Aix
        } else if vendor.is_linux_distribution()
            || lower.contains("linux")
            || lower.contains("distrib_")
        {
            OsFamily::Linux
        } else {
            OsFamily::Unknown
        }
    }
}

/// The OS descriptor, possibly assembled from several consecutive lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsInfo {
    pub raw: String,
    pub description: String,
    pub family: OsFamily,
    pub vendor: OsVendor,
}

impl OsInfo {
    pub fn parse(line: &str) -> Self {
        let text = line.trim();
        let description = text.strip_prefix("OS:").unwrap_or(text).trim();
        Self::from_parts(line.to_string(), description.to_string())
    }

    fn from_parts(raw: String, description: String) -> Self {
        let lower = description.to_lowercase();
        let vendor = OsVendor::detect(&lower);
        Self {
            family: OsFamily::detect(&lower, vendor),
            vendor,
            raw,
            description,
        }
    }

    /// Raw lines joined by newline, payloads by a single space; empty
    /// payloads (a bare `OS:`) contribute nothing.
    pub fn merged(&self, next: &OsInfo) -> Self {
        let raw = format!("{}\n{}", self.raw, next.raw);
        let description = [self.description.as_str(), next.description.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        Self::from_parts(raw, description)
    }

    /// `8.4` from `... release 8.4 (Ootpa)` or `DISTRIB_RELEASE=18.04`.
    pub fn release(&self) -> Option<String> {
        first_capture(&OS_RELEASE, &self.description)
    }
}

/// `uname:Linux 3.10.0-1127.el7.x86_64 #1 SMP ... x86_64`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnameInfo {
    pub raw: String,
    pub system: Option<String>,
    pub kernel: Option<String>,
    pub machine: Option<String>,
}

impl UnameInfo {
    pub fn parse(line: &str) -> Self {
        let tokens: Vec<&str> = payload(line).split_whitespace().collect();
        Self {
            raw: line.to_string(),
            system: tokens.first().map(|s| s.to_string()),
            kernel: tokens.get(1).map(|s| s.to_string()),
            machine: (tokens.len() > 2)
                .then(|| tokens.last().map(|s| s.to_string()))
                .flatten(),
        }
    }
}

/// One resource limit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Limit {
    Unlimited,
    /// Bytes for size limits (`8192k`), a plain count otherwise
    Value(u64),
}

impl Limit {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "infinity" | "unlimited" => Some(Limit::Unlimited),
            _ => units::normalize(s).map(Limit::Value),
        }
    }
}

/// `rlimit: STACK 8192k, CORE 0k, NPROC 4096, NOFILE 4096, AS infinity`
/// or the JDK 17 `rlimit (soft/hard):` form; only soft limits are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RlimitInfo {
    pub raw: String,
    pub limits: BTreeMap<String, Limit>,
}

impl RlimitInfo {
    pub fn parse(line: &str) -> Self {
        let mut limits = BTreeMap::new();
        if let Some(re) = RLIMIT_ENTRY.as_ref() {
            for caps in re.captures_iter(payload(line)) {
                if let Some(limit) = Limit::parse(&caps[2]) {
                    limits.entry(caps[1].to_string()).or_insert(limit);
                }
            }
        }
        Self {
            raw: line.to_string(),
            limits,
        }
    }

    pub fn get(&self, name: &str) -> Option<Limit> {
        self.limits.get(name).copied()
    }

    pub fn core(&self) -> Option<Limit> {
        self.get("CORE")
    }
}

/// `CPU:total 4 (initial active 4) (2 cores per cpu, 1 threads per core) ...`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuSummary {
    pub raw: String,
    pub total: Option<u32>,
    pub active: Option<u32>,
    pub description: String,
}

impl CpuSummary {
    pub fn parse(line: &str) -> Self {
        Self {
            raw: line.to_string(),
            total: first_capture(&CPU_TOTAL, line).and_then(|n| n.parse().ok()),
            active: first_capture(&CPU_ACTIVE, line).and_then(|n| n.parse().ok()),
            description: payload(line).to_string(),
        }
    }
}

/// `Memory: 4k page, physical 16266508k(1234567k free), swap 8388604k(8388604k free)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySummary {
    pub raw: String,
    pub page_size_bytes: Option<u64>,
    pub physical_bytes: Option<u64>,
    pub physical_free_bytes: Option<u64>,
    pub swap_bytes: Option<u64>,
    pub swap_free_bytes: Option<u64>,
}

impl MemorySummary {
    pub fn parse(line: &str) -> Self {
        let pair = |re: &LazyLock<Option<Regex>>| {
            re.as_ref()
                .and_then(|re| re.captures(line))
                .map(|caps| (units::normalize(&caps[1]), units::normalize(&caps[2])))
                .unwrap_or((None, None))
        };
        let (physical_bytes, physical_free_bytes) = pair(&MEMORY_PHYSICAL);
        let (swap_bytes, swap_free_bytes) = pair(&MEMORY_SWAP);
        Self {
            raw: line.to_string(),
            page_size_bytes: first_capture(&MEMORY_PAGE, line).and_then(|p| units::normalize(&p)),
            physical_bytes,
            physical_free_bytes,
            swap_bytes,
            swap_free_bytes,
        }
    }
}

/// One line of the `Process Memory:` block (JDK 21+).
///
/// `Resident Set Size: 283708K (peak: 283708K) (anon: 262148K, file: 21560K, shmem: 0K)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessMemoryStat {
    pub raw: String,
    /// `Virtual Size`, `Resident Set Size`, `Swapped out`, ...
    pub name: String,
    /// Leading size after the label; `None` for text values such as tunables
    pub bytes: Option<u64>,
    pub peak_bytes: Option<u64>,
}

impl ProcessMemoryStat {
    pub fn parse(line: &str) -> Self {
        let name = line
            .split_once(':')
            .map(|(name, _)| name.trim())
            .unwrap_or_else(|| line.trim());
        Self {
            raw: line.to_string(),
            name: name.to_string(),
            bytes: first_capture(&PROCESS_MEMORY_SIZE, line).and_then(|b| units::normalize(&b)),
            peak_bytes: first_capture(&PROCESS_MEMORY_PEAK, line).and_then(|b| units::normalize(&b)),
        }
    }
}

/// `vm_info: OpenJDK 64-Bit Server VM (...) for linux-amd64 JRE (1.8.0_252-b09),
/// built on Apr 14 2020 14:59:33 by "mockbuild" with gcc 4.8.5 ...`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmInfo {
    pub raw: String,
    pub description: String,
    pub version: Option<JdkVersion>,
    /// The string `version` was parsed from, e.g. `11.0.7+10-LTS`
    pub version_text: Option<String>,
    pub build_date: Option<NaiveDate>,
    pub builder: Option<String>,
    pub compiler: Option<String>,
    /// `linux-amd64`, `windows-amd64`
    pub platform: Option<String>,
}

impl VmInfo {
    pub fn parse(line: &str) -> Self {
        let description = payload(line).to_string();
        let (version, version_text) = jre_version(&description);
        Self {
            raw: line.to_string(),
            version,
            version_text,
            build_date: first_capture(&VM_INFO_BUILT_ON, &description).and_then(|d| parse_build_date(&d)),
            builder: first_capture(&VM_INFO_BUILDER, &description),
            compiler: first_capture(&VM_INFO_COMPILER, &description).map(|c| c.trim().to_string()),
            platform: first_capture(&VM_INFO_ARCH, &description),
            description,
        }
    }
}

/// The JRE version is in the first parenthesis after `JRE` that parses;
/// the one after the VM name is the HotSpot version and is skipped.
fn jre_version(description: &str) -> (Option<JdkVersion>, Option<String>) {
    let Some(start) = description.find("JRE") else {
        return (None, None);
    };
    let Some(re) = VM_INFO_JRE.as_ref() else {
        return (None, None);
    };
    re.captures_iter(&description[start..])
        .find_map(|caps| {
            let text = caps[1].trim().to_string();
            JdkVersion::parse(&text).map(|v| (Some(v), Some(text)))
        })
        .unwrap_or((None, None))
}

fn parse_build_date(text: &str) -> Option<NaiveDate> {
    let text = squash_whitespace(text);
    NaiveDate::parse_from_str(&text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&text, "%b %d %Y"))
        .ok()
}

fn elapsed_seconds(text: &str) -> Option<f64> {
    first_capture(&ELAPSED, text).and_then(|s| s.parse().ok())
}

/// `time: Tue May  5 18:32:04 2020` (JDK 8) or
/// `Time: Thu Nov 18 12:34:56 2021 EST elapsed time: 0.512345 seconds (0d 0h 0m 0s)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeRecord {
    pub raw: String,
    pub timestamp: Option<NaiveDateTime>,
    pub timezone: Option<String>,
    pub elapsed_seconds: Option<f64>,
}

impl TimeRecord {
    pub fn parse(line: &str) -> Self {
        let text = payload(line);
        let clock = text
            .split_once("elapsed time:")
            .map(|(clock, _)| clock)
            .unwrap_or(text);
        let tokens: Vec<&str> = clock.split_whitespace().collect();
        let timestamp = (tokens.len() >= 5)
            .then(|| NaiveDateTime::parse_from_str(&tokens[..5].join(" "), "%a %b %d %H:%M:%S %Y").ok())
            .flatten();
        let timezone = (tokens.len() > 5).then(|| tokens[5..].join(" "));
        Self {
            raw: line.to_string(),
            timestamp,
            timezone,
            elapsed_seconds: elapsed_seconds(text),
        }
    }
}

/// `elapsed time: 123456 seconds (1d 10h 17m 36s)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElapsedTime {
    pub raw: String,
    pub seconds: Option<f64>,
}

impl ElapsedTime {
    pub fn parse(line: &str) -> Self {
        Self {
            raw: line.to_string(),
            seconds: elapsed_seconds(line),
        }
    }
}

/// `/proc/sys/...` kernel limit. The value sits on the next line in the
/// dump and arrives through a continuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelLimit {
    pub kind: RecordType,
    pub raw: String,
    pub value: Option<u64>,
}

impl KernelLimit {
    pub fn parse(kind: RecordType, line: &str) -> Self {
        let value = line
            .rfind("):")
            .map(|i| &line[i + 2..])
            .and_then(|tail| tail.split_whitespace().last())
            .and_then(|token| token.parse().ok());
        Self {
            kind,
            raw: line.to_string(),
            value,
        }
    }
}

/// `/sys/kernel/mm/transparent_hugepage/enabled: [always] madvise never`,
/// with the mode list either inline or on the following line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThpSetting {
    pub raw: String,
    /// `enabled`, `defrag`, `shmem_enabled`
    pub setting: Option<String>,
    /// The bracketed, active choice
    pub mode: Option<String>,
}

impl ThpSetting {
    pub fn parse(line: &str) -> Self {
        Self {
            raw: line.to_string(),
            setting: first_capture(&THP_SETTING, line),
            mode: first_capture(&THP_MODE, line),
        }
    }
}
