//! PROCESS section records: threads, heap, code cache, events, libraries,
//! flags and signal handlers.

use super::{parse_hex, squash_whitespace};
use crate::patterns::compile_field;
use crate::record_type::RecordType;
use crate::units;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static THREAD: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile_field(
        r#"^(=>)?\s*(0x[0-9a-fA-F]+)\s+(?:\(exited\)\s+)?([A-Za-z]*Thread)\b(?:\s+"([^"]*)")?"#,
    )
});
static THREAD_STATE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r"\[(_thread_[a-z_]+)"));
static THREAD_ID: LazyLock<Option<Regex>> = LazyLock::new(|| compile_field(r"\bid=(\d+)"));
static PARENTHESIZED: LazyLock<Option<Regex>> = LazyLock::new(|| compile_field(r"\(([^)]*)\)"));
static HEAP_ADDRESS: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile_field(
        r"^[Hh]eap address: (0x[0-9a-fA-F]+), size: (\d+) MB(?:, Compressed Oops mode: ([^,]+))?(?:, Oop shift amount: (\d+))?",
    )
});
static CLASS_SPACE_SIZE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r"(?:space size|reserved size): (\d+)"));
static CLASS_SPACE_ADDRESS: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r"(?:Address|mapped at): (0x[0-9a-fA-F]+)"));
static REGION_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r"^\s+(.+?)\s+(?:total|used|capacity|\d+[KMG]\b)"));
static REGION_TOTAL: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r"total (\d+[KMG])"));
static REGION_USED: LazyLock<Option<Regex>> = LazyLock::new(|| compile_field(r"used (\d+[KMG])"));
static REGION_CAPACITY: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r"(?:^|[^x] )capacity (\d+[KMG])"));
static SPACE_USAGE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r"^\s+\D*?\s(\d+[KMG]),\s+(\d+)% used"));
static METASPACE_FIELD: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r"\b(used|capacity|committed|reserved) (\d+[KMG])"));
static CODE_CACHE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile_field(
        r"^(?:CodeCache|CodeHeap '([^']+)'): size=(\d+)Kb used=(\d+)Kb max_used=(\d+)Kb free=(\d+)Kb",
    )
});
static EVENT: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r"^Event: (\d+(?:\.\d+)?) (.*)$"));
static LINUX_MAPPING: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile_field(
        r"^([0-9a-fA-F]+)-([0-9a-fA-F]+)\s+(\S{4})\s+[0-9a-fA-F]+\s+\S+\s+\d+\s*(.*)$",
    )
});
static WINDOWS_MODULE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r"^(0x[0-9a-fA-F]+) - (0x[0-9a-fA-F]+)\s+(.*)$"));
static GLOBAL_FLAG: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r"^\s+(\S+)\s+(\w+)\s+:?= (.*)$"));
static FLAG_ORIGIN: LazyLock<Option<Regex>> = LazyLock::new(|| compile_field(r"\{([^}]*)\}"));
static SIGNAL_HANDLER: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r"^\s*(SIG[A-Z0-9]+): (.*)$"));
static EXPECTED_HANDLER: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r"\*\*\* Expected: ([^,]+)"));
static EXCEPTION_COUNT: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_field(r"^(OutOfMemoryError|StackOverflowErrors)(?: (\w+))?=(\d+)"));

fn first_capture(re: &LazyLock<Option<Regex>>, text: &str) -> Option<String> {
    re.as_ref()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1).map(|m| m.as_str().to_string()))
}

/// One entry of the `Java Threads:` / `Other Threads:` lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRecord {
    pub raw: String,
    /// Marked with `=>`
    pub current: bool,
    pub address: Option<u64>,
    /// `JavaThread`, `VMThread`, `GCTaskThread`...
    pub thread_type: Option<String>,
    pub name: Option<String>,
    pub daemon: bool,
    /// `_thread_in_native`, `_thread_blocked`...
    pub state: Option<String>,
    pub os_id: Option<u64>,
}

impl ThreadRecord {
    pub fn parse(line: &str) -> Self {
        let caps = THREAD.as_ref().and_then(|re| re.captures(line));
        let group = |i: usize| {
            caps.as_ref()
                .and_then(|c| c.get(i))
                .map(|m| m.as_str().to_string())
        };
        Self {
            raw: line.to_string(),
            current: group(1).is_some(),
            address: group(2).and_then(|a| parse_hex(&a)),
            thread_type: group(3),
            name: group(4),
            daemon: line.contains(" daemon "),
            state: first_capture(&THREAD_STATE, line),
            os_id: first_capture(&THREAD_ID, line).and_then(|id| id.parse().ok()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VmState {
    NotAtSafepoint,
    AtSafepoint,
    Synchronizing,
    Unknown,
}

/// `VM state:not at safepoint (normal execution)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmStateRecord {
    pub raw: String,
    pub state: VmState,
    pub description: Option<String>,
}

impl VmStateRecord {
    pub fn parse(line: &str) -> Self {
        let payload = line
            .split_once(':')
            .map(|(_, rest)| rest.trim())
            .unwrap_or("");
        let state = if payload.starts_with("not at safepoint") {
            VmState::NotAtSafepoint
        } else if payload.starts_with("at safepoint") {
            VmState::AtSafepoint
        } else if payload.starts_with("synchronizing") {
            VmState::Synchronizing
        } else {
            VmState::Unknown
        };
        Self {
            raw: line.to_string(),
            state,
            description: first_capture(&PARENTHESIZED, payload),
        }
    }
}

/// `heap address: 0x..., size: 4096 MB, Compressed Oops mode: Zero based, Oop shift amount: 3`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapAddress {
    pub raw: String,
    pub address: Option<u64>,
    pub size_bytes: Option<u64>,
    pub compressed_oops_mode: Option<String>,
    pub oop_shift: Option<u32>,
}

impl HeapAddress {
    pub fn parse(line: &str) -> Self {
        let caps = HEAP_ADDRESS.as_ref().and_then(|re| re.captures(line));
        let group = |i: usize| {
            caps.as_ref()
                .and_then(|c| c.get(i))
                .map(|m| m.as_str().trim().to_string())
        };
        Self {
            raw: line.to_string(),
            address: group(1).and_then(|a| parse_hex(&a)),
            size_bytes: group(2).and_then(|mb| units::normalize(&format!("{}M", mb))),
            compressed_oops_mode: group(3),
            oop_shift: group(4).and_then(|s| s.parse().ok()),
        }
    }
}

/// `Compressed class space size: 1073741824 Address: 0x...` (JDK 8) or
/// `Compressed class space mapped at: 0x...-0x..., reserved size: 1073741824`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedClassSpace {
    pub raw: String,
    pub size_bytes: Option<u64>,
    pub address: Option<u64>,
}

impl CompressedClassSpace {
    pub fn parse(line: &str) -> Self {
        Self {
            raw: line.to_string(),
            size_bytes: first_capture(&CLASS_SPACE_SIZE, line).and_then(|s| s.parse().ok()),
            address: first_capture(&CLASS_SPACE_ADDRESS, line).and_then(|a| parse_hex(&a)),
        }
    }
}

/// A generation or space line of the `Heap:` summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapRegion {
    pub raw: String,
    /// `PSYoungGen`, `eden space`, `garbage-first heap`...
    pub name: String,
    pub total_bytes: Option<u64>,
    pub used_bytes: Option<u64>,
    pub used_percent: Option<u8>,
}

impl HeapRegion {
    pub fn parse(line: &str) -> Self {
        let name = first_capture(&REGION_NAME, line)
            .map(|n| squash_whitespace(&n))
            .unwrap_or_else(|| squash_whitespace(line));
        let size = |re: &LazyLock<Option<Regex>>| {
            first_capture(re, line).and_then(|s| units::normalize(&s))
        };

        let mut region = Self {
            raw: line.to_string(),
            name,
            total_bytes: size(&REGION_TOTAL).or_else(|| size(&REGION_CAPACITY)),
            used_bytes: size(&REGION_USED),
            used_percent: None,
        };

        if let Some(caps) = SPACE_USAGE.as_ref().and_then(|re| re.captures(line)) {
            region.total_bytes = units::normalize(&caps[1]);
            region.used_percent = caps[2].parse().ok();
        }
        region
    }
}

/// `Metaspace used ..., capacity ..., committed ..., reserved ...` and the
/// `class space` line below it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaspaceUsage {
    pub kind: RecordType,
    pub raw: String,
    pub used_bytes: Option<u64>,
    pub capacity_bytes: Option<u64>,
    pub committed_bytes: Option<u64>,
    pub reserved_bytes: Option<u64>,
}

impl MetaspaceUsage {
    pub fn parse(kind: RecordType, line: &str) -> Self {
        let mut usage = Self {
            kind,
            raw: line.to_string(),
            used_bytes: None,
            capacity_bytes: None,
            committed_bytes: None,
            reserved_bytes: None,
        };
        if let Some(re) = METASPACE_FIELD.as_ref() {
            for caps in re.captures_iter(line) {
                let value = units::normalize(&caps[2]);
                match &caps[1] {
                    "used" => usage.used_bytes = value,
                    "capacity" => usage.capacity_bytes = value,
                    "committed" => usage.committed_bytes = value,
                    "reserved" => usage.reserved_bytes = value,
                    _ => {}
                }
            }
        }
        usage
    }
}

/// `CodeCache: size=...Kb used=...Kb max_used=...Kb free=...Kb` or one
/// `CodeHeap '<segment>'` line of a segmented code cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeCacheSegment {
    pub raw: String,
    pub name: String,
    pub size_bytes: Option<u64>,
    pub used_bytes: Option<u64>,
    pub max_used_bytes: Option<u64>,
    pub free_bytes: Option<u64>,
}

impl CodeCacheSegment {
    pub fn parse(line: &str) -> Self {
        let caps = CODE_CACHE.as_ref().and_then(|re| re.captures(line));
        let kb = |i: usize| {
            caps.as_ref()
                .and_then(|c| c.get(i))
                .and_then(|m| units::normalize(&format!("{}K", m.as_str())))
        };
        let name = caps
            .as_ref()
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| "CodeCache".to_string());
        Self {
            raw: line.to_string(),
            name,
            size_bytes: kb(2),
            used_bytes: kb(3),
            max_used_bytes: kb(4),
            free_bytes: kb(5),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.free_bytes == Some(0)
    }
}

/// Event log a line belongs to, taken from the nearest header above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSection {
    Compilation,
    GcHeapHistory,
    Deoptimization,
    ClassesRedefined,
    ClassesLoaded,
    ClassesUnloaded,
    InternalExceptions,
    VmOperations,
    DllOperations,
    Events,
    Other,
    #[default]
    Unknown,
}

impl EventSection {
    /// `Compilation events (10 events):` → `Compilation`
    pub fn from_header(line: &str) -> Self {
        let title = line
            .split_once(" (")
            .map(|(title, _)| title)
            .unwrap_or(line)
            .trim()
            .to_lowercase();
        match title.as_str() {
            "compilation events" => EventSection::Compilation,
            "gc heap history" => EventSection::GcHeapHistory,
            "deoptimization events" => EventSection::Deoptimization,
            "classes redefined" => EventSection::ClassesRedefined,
            "classes loaded" | "classes loaded events" => EventSection::ClassesLoaded,
            "classes unloaded" | "classes unloaded events" => EventSection::ClassesUnloaded,
            "internal exceptions" => EventSection::InternalExceptions,
            "vm operations" => EventSection::VmOperations,
            "dll operation events" => EventSection::DllOperations,
            "events" => EventSection::Events,
            _ => EventSection::Other,
        }
    }
}

/// `Event: 1.234 <message>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub raw: String,
    pub section: EventSection,
    /// Seconds since VM start
    pub timestamp: Option<f64>,
    pub message: String,
}

impl EventRecord {
    pub fn parse(line: &str) -> Self {
        let caps = EVENT.as_ref().and_then(|re| re.captures(line));
        Self {
            raw: line.to_string(),
            section: EventSection::Unknown,
            timestamp: caps.as_ref().and_then(|c| c[1].parse().ok()),
            message: caps
                .as_ref()
                .map(|c| c[2].trim().to_string())
                .unwrap_or_default(),
        }
    }
}

/// One memory mapping (Linux) or loaded module (Windows).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicLibrary {
    pub raw: String,
    pub start: Option<u64>,
    pub end: Option<u64>,
    /// `r-xp`; Linux only
    pub permissions: Option<String>,
    /// Anonymous mappings have no path
    pub path: Option<String>,
}

impl DynamicLibrary {
    pub fn parse(line: &str) -> Self {
        let mut library = Self {
            raw: line.to_string(),
            start: None,
            end: None,
            permissions: None,
            path: None,
        };
        if let Some(caps) = LINUX_MAPPING.as_ref().and_then(|re| re.captures(line)) {
            library.start = parse_hex(&caps[1]);
            library.end = parse_hex(&caps[2]);
            library.permissions = Some(caps[3].to_string());
            library.path = non_empty(&caps[4]);
        } else if let Some(caps) = WINDOWS_MODULE.as_ref().and_then(|re| re.captures(line)) {
            library.start = parse_hex(&caps[1]);
            library.end = parse_hex(&caps[2]);
            library.path = non_empty(&caps[3]);
        }
        library
    }

    /// Last path component, for either separator.
    pub fn file_name(&self) -> Option<&str> {
        let path = self.path.as_deref()?;
        path.rsplit(['/', '\\']).next()
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// One `[Global flags]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalFlag {
    pub raw: String,
    pub flag_type: Option<String>,
    pub name: Option<String>,
    pub value: Option<String>,
    /// `product`, `ergonomic`, `command line`...
    pub origins: Vec<String>,
}

impl GlobalFlag {
    pub fn parse(line: &str) -> Self {
        let mut flag = Self {
            raw: line.to_string(),
            flag_type: None,
            name: None,
            value: None,
            origins: Vec::new(),
        };
        if let Some(caps) = GLOBAL_FLAG.as_ref().and_then(|re| re.captures(line)) {
            flag.flag_type = Some(caps[1].to_string());
            flag.name = Some(caps[2].to_string());
            let rest = &caps[3];
            let value_end = rest.find('{').unwrap_or(rest.len());
            flag.value = Some(rest[..value_end].trim().to_string());
            if let Some(re) = FLAG_ORIGIN.as_ref() {
                flag.origins = re
                    .captures_iter(&rest[value_end..])
                    .map(|c| c[1].to_string())
                    .collect();
            }
        }
        flag
    }
}

/// One `Signal Handlers:` entry, possibly extended by `***` notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalHandler {
    pub raw: String,
    pub signal: Option<String>,
    /// `libjvm.so+0x9a1b20`, `crash_handler in libjvm.so`, `SIG_DFL`
    pub handler: Option<String>,
    pub modified: bool,
    pub expected: Option<String>,
}

impl SignalHandler {
    pub fn parse(line: &str) -> Self {
        let caps = SIGNAL_HANDLER.as_ref().and_then(|re| re.captures(line));
        let handler = caps.as_ref().and_then(|c| {
            let rest = c[2].split(", ").next().unwrap_or("");
            let rest = rest.split(" *** ").next().unwrap_or(rest);
            non_empty(rest.trim_start_matches('[').trim_end_matches(']'))
        });
        Self {
            raw: line.to_string(),
            signal: caps.as_ref().map(|c| c[1].to_string()),
            handler,
            modified: line.contains("Handler was modified"),
            expected: first_capture(&EXPECTED_HANDLER, line)
                .map(|e| e.trim_start_matches('[').trim_end_matches(']').trim().to_string()),
        }
    }

    /// Installed by the JVM itself, or chained through libjsig.
    pub fn is_jvm_handler(&self) -> bool {
        self.handler.as_deref().is_some_and(|h| {
            h.contains("libjvm") || h.contains("jvm.dll") || h.contains("libjsig")
        })
    }
}

/// `OutOfMemoryError java_heap_errors=1`, `StackOverflowErrors=3`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionCount {
    pub raw: String,
    /// `OutOfMemoryError` or `StackOverflowErrors`
    pub exception: Option<String>,
    /// `java_heap_errors`, `metaspace_errors`, `class_metaspace_errors`;
    /// absent for stack overflows
    pub counter: Option<String>,
    pub count: u64,
}

impl ExceptionCount {
    pub fn parse(line: &str) -> Self {
        let caps = EXCEPTION_COUNT.as_ref().and_then(|re| re.captures(line));
        Self {
            raw: line.to_string(),
            exception: caps.as_ref().map(|c| c[1].to_string()),
            counter: caps
                .as_ref()
                .and_then(|c| c.get(2))
                .map(|m| m.as_str().to_string()),
            count: caps
                .as_ref()
                .and_then(|c| c[3].parse().ok())
                .unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_record() {
        let thread = ThreadRecord::parse(
            "=>0x00007fcd3c5a1800 JavaThread \"AWT-EventQueue-0\" daemon [_thread_in_native, id=1987, stack(0x00007fcd2c5f2000,0x00007fcd2c6f2000)]",
        );
        assert!(thread.current);
        assert_eq!(thread.address, Some(0x7fcd_3c5a_1800));
        assert_eq!(thread.thread_type.as_deref(), Some("JavaThread"));
        assert_eq!(thread.name.as_deref(), Some("AWT-EventQueue-0"));
        assert!(thread.daemon);
        assert_eq!(thread.state.as_deref(), Some("_thread_in_native"));
        assert_eq!(thread.os_id, Some(1987));

        let gc = ThreadRecord::parse("  0x00007fcd3c01e800 GCTaskThread \"GC Thread#0\" [stack: 0x0,0x0] [id=1963]");
        assert!(!gc.current);
        assert_eq!(gc.thread_type.as_deref(), Some("GCTaskThread"));
        assert_eq!(gc.os_id, Some(1963));
    }

    #[test]
    fn test_vm_state() {
        let state = VmStateRecord::parse("VM state:not at safepoint (normal execution)");
        assert_eq!(state.state, VmState::NotAtSafepoint);
        assert_eq!(state.description.as_deref(), Some("normal execution"));
        assert_eq!(VmStateRecord::parse("VM state: at safepoint (shutting down)").state, VmState::AtSafepoint);
        assert_eq!(VmStateRecord::parse("VM state: weird").state, VmState::Unknown);
    }

    #[test]
    fn test_heap_address() {
        let heap = HeapAddress::parse(
            "heap address: 0x00000006c0000000, size: 4096 MB, Compressed Oops mode: Zero based, Oop shift amount: 3",
        );
        assert_eq!(heap.address, Some(0x6_c000_0000));
        assert_eq!(heap.size_bytes, Some(4096 * 1024 * 1024));
        assert_eq!(heap.compressed_oops_mode.as_deref(), Some("Zero based"));
        assert_eq!(heap.oop_shift, Some(3));
    }

    #[test]
    fn test_compressed_class_space() {
        let jdk8 = CompressedClassSpace::parse(
            "Compressed class space size: 1073741824 Address: 0x00000007c0000000",
        );
        assert_eq!(jdk8.size_bytes, Some(1_073_741_824));
        assert_eq!(jdk8.address, Some(0x7_c000_0000));

        let jdk17 = CompressedClassSpace::parse(
            "Compressed class space mapped at: 0x0000000800000000-0x0000000840000000, reserved size: 1073741824",
        );
        assert_eq!(jdk17.size_bytes, Some(1_073_741_824));
        assert_eq!(jdk17.address, Some(0x8_0000_0000));
    }

    #[test]
    fn test_heap_regions() {
        let young = HeapRegion::parse(
            " PSYoungGen      total 305664K, used 123456K [0x000000076ab00000, 0x0000000780000000, 0x00000007c0000000)",
        );
        assert_eq!(young.name, "PSYoungGen");
        assert_eq!(young.total_bytes, Some(305_664 * 1024));
        assert_eq!(young.used_bytes, Some(123_456 * 1024));

        let eden = HeapRegion::parse(
            "  eden space 262144K, 40% used [0x000000076ab00000,0x0000000771b00000,0x000000077ab00000)",
        );
        assert_eq!(eden.name, "eden space");
        assert_eq!(eden.total_bytes, Some(262_144 * 1024));
        assert_eq!(eden.used_percent, Some(40));

        let to = HeapRegion::parse("  to   space 43520K, 0% used [0x000000077d580000,0x000000077d580000,0x0000000780000000)");
        assert_eq!(to.name, "to space");

        let g1 = HeapRegion::parse(" garbage-first heap   total 262144K, used 20000K [0x0000000700000000, 0x0000000800000000)");
        assert_eq!(g1.name, "garbage-first heap");
    }

    #[test]
    fn test_metaspace_usage() {
        let meta = MetaspaceUsage::parse(
            RecordType::Metaspace,
            " Metaspace       used 20000K, capacity 20500K, committed 20736K, reserved 1067008K",
        );
        assert_eq!(meta.used_bytes, Some(20_000 * 1024));
        assert_eq!(meta.capacity_bytes, Some(20_500 * 1024));
        assert_eq!(meta.reserved_bytes, Some(1_067_008 * 1024));

        let jdk17 = MetaspaceUsage::parse(
            RecordType::Metaspace,
            " Metaspace       used 1234K, committed 1536K, reserved 1056768K",
        );
        assert_eq!(jdk17.capacity_bytes, None);
        assert_eq!(jdk17.committed_bytes, Some(1536 * 1024));
    }

    #[test]
    fn test_code_cache() {
        let cache = CodeCacheSegment::parse("CodeCache: size=245760Kb used=245759Kb max_used=245760Kb free=0Kb");
        assert_eq!(cache.name, "CodeCache");
        assert_eq!(cache.size_bytes, Some(245_760 * 1024));
        assert!(cache.is_exhausted());

        let heap = CodeCacheSegment::parse(
            "CodeHeap 'non-profiled nmethods': size=120032Kb used=1234Kb max_used=1234Kb free=118797Kb",
        );
        assert_eq!(heap.name, "non-profiled nmethods");
        assert!(!heap.is_exhausted());
    }

    #[test]
    fn test_event_sections() {
        assert_eq!(EventSection::from_header("Compilation events (10 events):"), EventSection::Compilation);
        assert_eq!(EventSection::from_header("GC Heap History (10 events):"), EventSection::GcHeapHistory);
        assert_eq!(EventSection::from_header("Internal exceptions (3 events):"), EventSection::InternalExceptions);
        assert_eq!(EventSection::from_header("Dll operation events (2 events):"), EventSection::DllOperations);
        assert_eq!(EventSection::from_header("ZGC Phase Switch (0 events):"), EventSection::Other);

        let event = EventRecord::parse("Event: 0.511 Loaded shared library /usr/lib/jvm/jre/lib/amd64/libzip.so");
        assert_eq!(event.timestamp, Some(0.511));
        assert!(event.message.starts_with("Loaded shared library"));
        assert_eq!(event.section, EventSection::Unknown);
    }

    #[test]
    fn test_dynamic_library_linux() {
        let lib = DynamicLibrary::parse(
            "7fcd2a8a7000-7fcd2b5a1000 r-xp 00000000 fd:00 1234567                    /usr/lib/jvm/java-1.8.0-openjdk/jre/lib/amd64/server/libjvm.so",
        );
        assert_eq!(lib.start, Some(0x7fcd_2a8a_7000));
        assert_eq!(lib.permissions.as_deref(), Some("r-xp"));
        assert_eq!(lib.file_name(), Some("libjvm.so"));

        let anon = DynamicLibrary::parse("7fcd2a8a7000-7fcd2b5a1000 rw-p 00000000 00:00 0 ");
        assert_eq!(anon.path, None);
        assert_eq!(anon.file_name(), None);
    }

    #[test]
    fn test_dynamic_library_windows() {
        let lib = DynamicLibrary::parse(
            "0x00007ffc1b2a0000 - 0x00007ffc1b2b9000 \tC:\\Program Files\\Java\\jdk-17\\bin\\jvm.dll",
        );
        assert_eq!(lib.start, Some(0x7ffc_1b2a_0000));
        assert_eq!(lib.permissions, None);
        assert_eq!(lib.file_name(), Some("jvm.dll"));
    }

    #[test]
    fn test_global_flag() {
        let flag = GlobalFlag::parse(
            "     intx CICompilerCount                          = 3                                         {product} {ergonomic}",
        );
        assert_eq!(flag.flag_type.as_deref(), Some("intx"));
        assert_eq!(flag.name.as_deref(), Some("CICompilerCount"));
        assert_eq!(flag.value.as_deref(), Some("3"));
        assert_eq!(flag.origins, vec!["product".to_string(), "ergonomic".to_string()]);

        let jdk8 = GlobalFlag::parse("    uintx MaxHeapSize                              := 4294967296                          {product}");
        assert_eq!(jdk8.value.as_deref(), Some("4294967296"));
    }

    #[test]
    fn test_signal_handler() {
        let handler = SignalHandler::parse(
            "SIGSEGV: [libjvm.so+0x9a1b20], sa_mask[0]=11111111011111111101111111111110, sa_flags=SA_RESTART|SA_SIGINFO",
        );
        assert_eq!(handler.signal.as_deref(), Some("SIGSEGV"));
        assert_eq!(handler.handler.as_deref(), Some("libjvm.so+0x9a1b20"));
        assert!(handler.is_jvm_handler());
        assert!(!handler.modified);

        let jdk17 = SignalHandler::parse("   SIGBUS: crash_handler in libjvm.so, mask=11100100010111111101111111111110, flags=SA_RESTART|SA_SIGINFO");
        assert_eq!(jdk17.handler.as_deref(), Some("crash_handler in libjvm.so"));

        let foreign = SignalHandler::parse(
            "SIGSEGV: [libfoo.so+0x1234], sa_mask[0]=0, sa_flags=SA_SIGINFO *** Handler was modified! *** Expected: [libjvm.so+0x9a1b20], sa_mask[0]=1",
        );
        assert!(foreign.modified);
        assert!(!foreign.is_jvm_handler());
        assert_eq!(foreign.expected.as_deref(), Some("libjvm.so+0x9a1b20"));
    }

    #[test]
    fn test_exception_count() {
        let oom = ExceptionCount::parse("OutOfMemoryError java_heap_errors=1");
        assert_eq!(oom.exception.as_deref(), Some("OutOfMemoryError"));
        assert_eq!(oom.counter.as_deref(), Some("java_heap_errors"));
        assert_eq!(oom.count, 1);

        let soe = ExceptionCount::parse("StackOverflowErrors=3");
        assert_eq!(soe.exception.as_deref(), Some("StackOverflowErrors"));
        assert_eq!(soe.counter, None);
        assert_eq!(soe.count, 3);
    }
}
