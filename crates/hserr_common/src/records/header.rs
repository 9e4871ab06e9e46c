//! Header block (`#` lines) and the crash-site records of the THREAD section.

use super::{parse_hex, parse_id};
use crate::jdk_release::JdkVersion;
use crate::patterns::compile_field;
use crate::units;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static SIGNAL: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile_field(
        r"^([A-Z][A-Z0-9_]+) \(0x[0-9a-fA-F]+\) at pc=(0x[0-9a-fA-F]+), pid=(\d+), tid=(0x[0-9a-fA-F]+|\d+)",
    )
});
static INTERNAL_ERROR: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile_field(r"^Internal Error \(([^)]*)\)(?:, pid=(\d+), tid=(0x[0-9a-fA-F]+|\d+))?")
});
static OUT_OF_MEMORY: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile_field(
        r"^(?:Out of Memory Error|There is insufficient memory|Native memory allocation|java\.lang\.OutOfMemoryError)",
    )
});
static ASSERTION: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile_field(r"^(?:Error: |guarantee\(|assert\(|fatal error|ShouldNotReachHere|Unimplemented)")
});
static PAREN: LazyLock<Option<Regex>> = LazyLock::new(|| compile_field(r"\(([^()]*)\)"));
static BUILD_PAREN: LazyLock<Option<Regex>> = LazyLock::new(|| compile_field(r"\(build ([^)]+)\)"));
static FRAME_START: LazyLock<Option<Regex>> = LazyLock::new(|| compile_field(r"^[CJjVv]\s+\S"));
static NATIVE_LOCATION: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r"^\[([^\]]+?)(?:\+(0x[0-9a-fA-F]+))?\]\s*(.*)$"));
static ADDRESS_LOCATION: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r"^(0x[0-9a-fA-F]+)\s*(.*)$"));
static COMPILED_METHOD: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r"^(?:\d+%?\s+)?(?:(?:[cC][12]|JVMCI)\s+)?(\S+)"));
static AT_ADDRESS: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r"@\s*(0x[0-9a-fA-F]+)"));
static SIGNAL_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r"\b(SIG[A-Z0-9]+|EXCEPTION_[A-Z_]+)\b"));
static SI_CODE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r"si_code[:=]\s*-?\d+ \(([A-Z_]+)\)"));
static FAULT_ADDRESS: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r"(?:si_addr[:=]\s*|address )(0x[0-9a-fA-F]+)"));
static STACK_BOUNDS: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile_field(
        r"^Stack: \[(0x[0-9a-fA-F]+),\s*(0x[0-9a-fA-F]+)\](?:,\s*sp=(0x[0-9a-fA-F]+))?(?:,\s*free space=(\d+[kKmMgG]?))?",
    )
});

/// What the runtime said about core files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoreDumpStatus {
    Written,
    Disabled,
    NotWritten,
    Unknown,
}

/// Interpretation of one `#` line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderDetail {
    /// `#`, `# A fatal error has been detected...`
    Banner,
    /// `#  SIGSEGV (0xb) at pc=0x..., pid=1961, tid=0x...`
    Signal {
        name: String,
        pc: Option<u64>,
        pid: Option<u32>,
        tid: Option<u64>,
    },
    /// `#  Internal Error (os_linux.cpp:1234), pid=..., tid=...`
    InternalError {
        location: String,
        pid: Option<u32>,
        tid: Option<u64>,
    },
    /// Native allocation failure or heap exhaustion reported by the VM itself
    OutOfMemory { message: String },
    /// `#  Error: ...`, `#  guarantee(...) failed: ...`
    Error { message: String },
    /// `# JRE version: OpenJDK Runtime Environment (8.0_252-b09) (build 1.8.0_252-b09)`
    JreVersion {
        text: String,
        version: Option<JdkVersion>,
    },
    /// `# Java VM: OpenJDK 64-Bit Server VM (25.252-b09 mixed mode linux-amd64 compressed oops)`
    JavaVm { text: String },
    /// `# Problematic frame:`
    ProblematicFrameLabel,
    /// The frame line printed under `# Problematic frame:`
    ProblematicFrame(StackFrame),
    CoreDump(CoreDumpStatus),
    Note { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderLine {
    pub raw: String,
    pub detail: HeaderDetail,
}

impl HeaderLine {
    pub fn parse(line: &str) -> Self {
        let content = line.strip_prefix('#').unwrap_or(line).trim();
        Self {
            raw: line.to_string(),
            detail: header_detail(content),
        }
    }
}

fn header_detail(content: &str) -> HeaderDetail {
    if content.is_empty() || content.starts_with("A fatal error has been detected") {
        return HeaderDetail::Banner;
    }

    if let Some(caps) = SIGNAL.as_ref().and_then(|re| re.captures(content)) {
        return HeaderDetail::Signal {
            name: caps[1].to_string(),
            pc: parse_hex(&caps[2]),
            pid: caps[3].parse().ok(),
            tid: parse_id(&caps[4]),
        };
    }

    if let Some(caps) = INTERNAL_ERROR.as_ref().and_then(|re| re.captures(content)) {
        return HeaderDetail::InternalError {
            location: caps[1].to_string(),
            pid: caps.get(2).and_then(|m| m.as_str().parse().ok()),
            tid: caps.get(3).and_then(|m| parse_id(m.as_str())),
        };
    }

    if is_match(&OUT_OF_MEMORY, content) {
        return HeaderDetail::OutOfMemory {
            message: content.to_string(),
        };
    }

    if is_match(&ASSERTION, content) {
        return HeaderDetail::Error {
            message: content.to_string(),
        };
    }

    if let Some(text) = content.strip_prefix("JRE version:") {
        let text = text.trim();
        return HeaderDetail::JreVersion {
            text: text.to_string(),
            version: jre_version(text),
        };
    }

    if let Some(text) = content.strip_prefix("Java VM:") {
        return HeaderDetail::JavaVm {
            text: text.trim().to_string(),
        };
    }

    if content.starts_with("Problematic frame:") {
        return HeaderDetail::ProblematicFrameLabel;
    }

    if is_match(&FRAME_START, content) {
        return HeaderDetail::ProblematicFrame(StackFrame::parse(content));
    }

    let lower = content.to_lowercase();
    if lower.contains("core dump") {
        let status = if lower.contains("disabled") {
            CoreDumpStatus::Disabled
        } else if lower.contains("no core dump") || lower.contains("not enabled") {
            CoreDumpStatus::NotWritten
        } else if lower.contains("core dump written") || lower.contains("core dump will be written") {
            CoreDumpStatus::Written
        } else {
            CoreDumpStatus::Unknown
        };
        return HeaderDetail::CoreDump(status);
    }

    HeaderDetail::Note {
        text: content.to_string(),
    }
}

/// Prefer `(build X)`; early-crash dumps print an empty build and only
/// carry the version in the first parenthesis.
fn jre_version(text: &str) -> Option<JdkVersion> {
    let from_build = BUILD_PAREN
        .as_ref()
        .and_then(|re| re.captures(text))
        .and_then(|caps| JdkVersion::parse(&caps[1]));
    if from_build.is_some() {
        return from_build;
    }
    PAREN
        .as_ref()?
        .captures_iter(text)
        .find_map(|caps| JdkVersion::parse(&caps[1]))
}

fn is_match(re: &LazyLock<Option<Regex>>, text: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(text))
}

/// Frame type letter from the `Native frames:` legend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    /// `C` native code
    Native,
    /// `V` VM code
    Vm,
    /// `j` interpreted Java
    Interpreted,
    /// `J` compiled Java
    Compiled,
    /// `v` VM-generated stub
    VmGenerated,
    Unknown,
}

impl FrameKind {
    pub fn is_native_code(&self) -> bool {
        matches!(self, FrameKind::Native | FrameKind::Vm)
    }
}

/// One stack frame line.
///
/// Native and VM frames locate code as `[library+offset]` or a bare address
/// and carry a symbol only when the library has one. Java frames always
/// name a method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    pub raw: String,
    pub kind: FrameKind,
    pub library: Option<String>,
    pub offset: Option<u64>,
    pub address: Option<u64>,
    pub symbol: Option<String>,
}

impl StackFrame {
    pub fn parse(line: &str) -> Self {
        let text = line.trim();
        let kind = match text.chars().next() {
            Some('C') => FrameKind::Native,
            Some('V') => FrameKind::Vm,
            Some('j') => FrameKind::Interpreted,
            Some('J') => FrameKind::Compiled,
            Some('v') => FrameKind::VmGenerated,
            _ => FrameKind::Unknown,
        };
        let rest = text.get(1..).unwrap_or("").trim();

        let mut frame = Self {
            raw: line.to_string(),
            kind,
            library: None,
            offset: None,
            address: None,
            symbol: None,
        };

        match kind {
            FrameKind::Native | FrameKind::Vm => {
                if let Some(caps) = NATIVE_LOCATION.as_ref().and_then(|re| re.captures(rest)) {
                    frame.library = Some(caps[1].trim().to_string());
                    frame.offset = caps.get(2).and_then(|m| parse_hex(m.as_str()));
                    frame.symbol = non_empty(&caps[3]);
                } else if let Some(caps) = ADDRESS_LOCATION.as_ref().and_then(|re| re.captures(rest)) {
                    frame.address = parse_hex(&caps[1]);
                    frame.symbol = non_empty(&caps[2]);
                }
            }
            FrameKind::Compiled => {
                frame.symbol = COMPILED_METHOD
                    .as_ref()
                    .and_then(|re| re.captures(rest))
                    .map(|caps| caps[1].to_string());
                frame.address = AT_ADDRESS
                    .as_ref()
                    .and_then(|re| re.captures(rest))
                    .and_then(|caps| parse_hex(&caps[1]));
            }
            FrameKind::Interpreted | FrameKind::VmGenerated => {
                frame.symbol = rest.split_whitespace().next().map(str::to_string);
            }
            FrameKind::Unknown => {}
        }

        frame
    }

    pub fn has_symbol(&self) -> bool {
        self.symbol.is_some()
    }

    /// Short human form: `libfoo.so+0x12 foo_bar+0x4` or the Java method.
    pub fn location(&self) -> String {
        let place = match (&self.library, self.offset, self.address) {
            (Some(lib), Some(offset), _) => format!("{}+0x{:x}", lib, offset),
            (Some(lib), None, _) => lib.clone(),
            (None, _, Some(address)) => format!("0x{:x}", address),
            (None, _, None) => String::new(),
        };
        match (&self.symbol, place.is_empty()) {
            (Some(symbol), true) => symbol.clone(),
            (Some(symbol), false) if self.kind.is_native_code() => format!("{} {}", place, symbol),
            (Some(symbol), false) => symbol.clone(),
            (None, _) => place,
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// `siginfo:` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigInfo {
    pub raw: String,
    /// `SIGSEGV`, `EXCEPTION_ACCESS_VIOLATION`
    pub signal: Option<String>,
    /// `SEGV_MAPERR`
    pub code: Option<String>,
    pub fault_address: Option<u64>,
}

impl SigInfo {
    pub fn parse(line: &str) -> Self {
        let capture = |re: &LazyLock<Option<Regex>>| {
            re.as_ref()
                .and_then(|re| re.captures(line))
                .map(|caps| caps[1].to_string())
        };
        Self {
            raw: line.to_string(),
            signal: capture(&SIGNAL_NAME),
            code: capture(&SI_CODE),
            fault_address: capture(&FAULT_ADDRESS).and_then(|a| parse_hex(&a)),
        }
    }
}

/// `Stack: [lo,hi],  sp=...,  free space=1015k`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackBounds {
    pub raw: String,
    pub base: Option<u64>,
    pub top: Option<u64>,
    pub sp: Option<u64>,
    pub free_bytes: Option<u64>,
}

impl StackBounds {
    pub fn parse(line: &str) -> Self {
        let caps = STACK_BOUNDS.as_ref().and_then(|re| re.captures(line));
        let group = |i: usize| {
            caps.as_ref()
                .and_then(|c| c.get(i))
                .map(|m| m.as_str().to_string())
        };
        Self {
            raw: line.to_string(),
            base: group(1).and_then(|s| parse_hex(&s)),
            top: group(2).and_then(|s| parse_hex(&s)),
            sp: group(3).and_then(|s| parse_hex(&s)),
            free_bytes: group(4).and_then(|s| units::normalize(&s)),
        }
    }
}
