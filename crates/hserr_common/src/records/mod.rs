//! Record builders: typed views over classified lines.
//!
//! `build` never fails. A field that cannot be extracted is `None` (or an
//! `Unknown` enum value) and the raw text is always kept, so a reporter can
//! fall back to printing what the dump said.

mod header;
mod process;
mod system;

pub use header::{CoreDumpStatus, FrameKind, HeaderDetail, HeaderLine, SigInfo, StackBounds, StackFrame};
pub use process::{
    CodeCacheSegment, CompressedClassSpace, DynamicLibrary, EventRecord, EventSection,
    ExceptionCount, GlobalFlag, HeapAddress, HeapRegion, MetaspaceUsage, SignalHandler,
    ThreadRecord, VmState, VmStateRecord,
};
pub use system::{
    CpuSummary, ElapsedTime, KernelLimit, Limit, MemorySummary, OsFamily, OsInfo, OsVendor,
    ProcessMemoryStat, RlimitInfo, ThpSetting, TimeRecord, UnameInfo, VmInfo,
};

use crate::record_type::RecordType;
use crate::units;
use serde::{Deserialize, Serialize};

/// A structured record built from one or more raw lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Record {
    Header(HeaderLine),
    Frame(StackFrame),
    SigInfo(SigInfo),
    StackBounds(StackBounds),
    Thread(ThreadRecord),
    VmState(VmStateRecord),
    HeapAddress(HeapAddress),
    CompressedClassSpace(CompressedClassSpace),
    HeapRegion(HeapRegion),
    Metaspace(MetaspaceUsage),
    CodeCache(CodeCacheSegment),
    Event(EventRecord),
    DynamicLibrary(DynamicLibrary),
    GlobalFlag(GlobalFlag),
    SignalHandler(SignalHandler),
    ExceptionCount(ExceptionCount),
    Os(OsInfo),
    Uname(UnameInfo),
    Rlimit(RlimitInfo),
    Cpu(CpuSummary),
    Memory(MemorySummary),
    ProcessMemory(ProcessMemoryStat),
    VmInfo(VmInfo),
    Time(TimeRecord),
    ElapsedTime(ElapsedTime),
    KernelLimit(KernelLimit),
    Hugepage(ThpSetting),
    KeyValue(KeyValue),
    Text(TextRecord),
    Plain(PlainRecord),
}

/// `key: value` or `KEY=value` lines: environment, release file, meminfo,
/// container, cpuinfo and GC precious log entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub kind: RecordType,
    pub raw: String,
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn parse(kind: RecordType, line: &str) -> Self {
        let separator = match kind {
            RecordType::EnvironmentVariable | RecordType::ReleaseProperty => '=',
            _ => ':',
        };
        let (key, value) = match line.split_once(separator) {
            Some((key, value)) => (key.trim(), value.trim()),
            None => (line.trim(), ""),
        };
        let value = if kind == RecordType::ReleaseProperty {
            value.trim_matches('"')
        } else {
            value
        };
        Self {
            kind,
            raw: line.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    /// Value normalized to bytes (`2097152 k`, `16266508 kB`, `4G`).
    pub fn size_bytes(&self) -> Option<u64> {
        units::normalize(&self.value)
    }
}

/// A singleton whose payload is kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRecord {
    pub kind: RecordType,
    pub raw: String,
    pub value: String,
}

impl TextRecord {
    pub fn parse(kind: RecordType, line: &str) -> Self {
        use RecordType as T;
        let labeled = matches!(
            kind,
            T::CommandLine
                | T::Host
                | T::Timezone
                | T::CurrentThread
                | T::VmMutex
                | T::JvmArgs
                | T::JavaCommand
                | T::ClassPath
                | T::LauncherType
                | T::Libc
                | T::LoadAverage
        );
        let value = match line.split_once(':') {
            Some((_, value)) if labeled => value.trim(),
            _ => line.trim(),
        };
        Self {
            kind,
            raw: line.to_string(),
            value: value.to_string(),
        }
    }
}

/// A line kept only as text: registers, code cache details, and every
/// discarded, continuation or unknown line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlainRecord {
    pub kind: RecordType,
    pub raw: String,
}

impl PlainRecord {
    pub fn new(kind: RecordType, line: &str) -> Self {
        Self {
            kind,
            raw: line.to_string(),
        }
    }
}

/// Build the typed record for a classified line.
pub fn build(record_type: RecordType, line: &str) -> Record {
    use RecordType as T;
    match record_type {
        T::Header => Record::Header(HeaderLine::parse(line)),
        T::Frame => Record::Frame(StackFrame::parse(line)),
        T::SigInfo => Record::SigInfo(SigInfo::parse(line)),
        T::StackBounds => Record::StackBounds(StackBounds::parse(line)),
        T::Thread => Record::Thread(ThreadRecord::parse(line)),
        T::VmState => Record::VmState(VmStateRecord::parse(line)),
        T::HeapAddress => Record::HeapAddress(HeapAddress::parse(line)),
        T::CompressedClassSpace => Record::CompressedClassSpace(CompressedClassSpace::parse(line)),
        T::HeapRegion => Record::HeapRegion(HeapRegion::parse(line)),
        T::Metaspace | T::ClassSpace => Record::Metaspace(MetaspaceUsage::parse(record_type, line)),
        T::CodeCache => Record::CodeCache(CodeCacheSegment::parse(line)),
        T::Event => Record::Event(EventRecord::parse(line)),
        T::DynamicLibrary => Record::DynamicLibrary(DynamicLibrary::parse(line)),
        T::GlobalFlag => Record::GlobalFlag(GlobalFlag::parse(line)),
        T::SignalHandler => Record::SignalHandler(SignalHandler::parse(line)),
        T::ExceptionCount => Record::ExceptionCount(ExceptionCount::parse(line)),
        T::Os => Record::Os(OsInfo::parse(line)),
        T::Uname => Record::Uname(UnameInfo::parse(line)),
        T::Rlimit => Record::Rlimit(RlimitInfo::parse(line)),
        T::Cpu => Record::Cpu(CpuSummary::parse(line)),
        T::Memory => Record::Memory(MemorySummary::parse(line)),
        T::ProcessMemory => Record::ProcessMemory(ProcessMemoryStat::parse(line)),
        T::VmInfo => Record::VmInfo(VmInfo::parse(line)),
        T::Time => Record::Time(TimeRecord::parse(line)),
        T::ElapsedTime => Record::ElapsedTime(ElapsedTime::parse(line)),
        T::ThreadsMax | T::MaxMapCount | T::PidMax => {
            Record::KernelLimit(KernelLimit::parse(record_type, line))
        }
        T::TransparentHugepage => Record::Hugepage(ThpSetting::parse(line)),
        T::EnvironmentVariable
        | T::ReleaseProperty
        | T::Meminfo
        | T::ContainerInfo
        | T::CpuInfo
        | T::GcPrecious => Record::KeyValue(KeyValue::parse(record_type, line)),
        T::CommandLine
        | T::Host
        | T::Timezone
        | T::CurrentThread
        | T::CompileTask
        | T::VmMutex
        | T::NarrowKlass
        | T::CompiledMethod
        | T::JvmArgs
        | T::JavaCommand
        | T::ClassPath
        | T::LauncherType
        | T::Libc
        | T::LoadAverage
        | T::Virtualization => Record::Text(TextRecord::parse(record_type, line)),
        _ => Record::Plain(PlainRecord::new(record_type, line)),
    }
}

impl Record {
    pub fn record_type(&self) -> RecordType {
        match self {
            Record::Header(_) => RecordType::Header,
            Record::Frame(_) => RecordType::Frame,
            Record::SigInfo(_) => RecordType::SigInfo,
            Record::StackBounds(_) => RecordType::StackBounds,
            Record::Thread(_) => RecordType::Thread,
            Record::VmState(_) => RecordType::VmState,
            Record::HeapAddress(_) => RecordType::HeapAddress,
            Record::CompressedClassSpace(_) => RecordType::CompressedClassSpace,
            Record::HeapRegion(_) => RecordType::HeapRegion,
            Record::Metaspace(r) => r.kind,
            Record::CodeCache(_) => RecordType::CodeCache,
            Record::Event(_) => RecordType::Event,
            Record::DynamicLibrary(_) => RecordType::DynamicLibrary,
            Record::GlobalFlag(_) => RecordType::GlobalFlag,
            Record::SignalHandler(_) => RecordType::SignalHandler,
            Record::ExceptionCount(_) => RecordType::ExceptionCount,
            Record::Os(_) => RecordType::Os,
            Record::Uname(_) => RecordType::Uname,
            Record::Rlimit(_) => RecordType::Rlimit,
            Record::Cpu(_) => RecordType::Cpu,
            Record::Memory(_) => RecordType::Memory,
            Record::ProcessMemory(_) => RecordType::ProcessMemory,
            Record::VmInfo(_) => RecordType::VmInfo,
            Record::Time(_) => RecordType::Time,
            Record::ElapsedTime(_) => RecordType::ElapsedTime,
            Record::KernelLimit(r) => r.kind,
            Record::Hugepage(_) => RecordType::TransparentHugepage,
            Record::KeyValue(r) => r.kind,
            Record::Text(r) => r.kind,
            Record::Plain(r) => r.kind,
        }
    }

    /// Every raw line this record was built from.
    pub fn raw(&self) -> &str {
        match self {
            Record::Header(r) => &r.raw,
            Record::Frame(r) => &r.raw,
            Record::SigInfo(r) => &r.raw,
            Record::StackBounds(r) => &r.raw,
            Record::Thread(r) => &r.raw,
            Record::VmState(r) => &r.raw,
            Record::HeapAddress(r) => &r.raw,
            Record::CompressedClassSpace(r) => &r.raw,
            Record::HeapRegion(r) => &r.raw,
            Record::Metaspace(r) => &r.raw,
            Record::CodeCache(r) => &r.raw,
            Record::Event(r) => &r.raw,
            Record::DynamicLibrary(r) => &r.raw,
            Record::GlobalFlag(r) => &r.raw,
            Record::SignalHandler(r) => &r.raw,
            Record::ExceptionCount(r) => &r.raw,
            Record::Os(r) => &r.raw,
            Record::Uname(r) => &r.raw,
            Record::Rlimit(r) => &r.raw,
            Record::Cpu(r) => &r.raw,
            Record::Memory(r) => &r.raw,
            Record::ProcessMemory(r) => &r.raw,
            Record::VmInfo(r) => &r.raw,
            Record::Time(r) => &r.raw,
            Record::ElapsedTime(r) => &r.raw,
            Record::KernelLimit(r) => &r.raw,
            Record::Hugepage(r) => &r.raw,
            Record::KeyValue(r) => &r.raw,
            Record::Text(r) => &r.raw,
            Record::Plain(r) => &r.raw,
        }
    }

    /// Extend this record with a continuation line.
    ///
    /// The two raw texts are joined with one space and re-parsed as this
    /// record's type. Returns `None` when the type does not accept `next`.
    pub fn combine(&self, next: &Record) -> Option<Record> {
        let own_type = self.record_type();
        if !own_type.accepts_continuation(next.record_type()) {
            return None;
        }
        let joined = format!("{} {}", self.raw().trim_end(), next.raw().trim());
        Some(build(own_type, &joined))
    }

    /// Join a consecutive occurrence of a concatenating singleton.
    /// Types that overwrite just yield `next`.
    pub fn merge(&self, next: &Record) -> Record {
        match (self, next) {
            (Record::Os(first), Record::Os(second)) => Record::Os(first.merged(second)),
            _ => next.clone(),
        }
    }
}

/// `0x00007fcd2af94e64` → 140519843008100. Accepts a missing `0x`.
pub(crate) fn parse_hex(s: &str) -> Option<u64> {
    let s = s.trim();
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u64::from_str_radix(digits, 16).ok()
}

/// Thread ids are hex on Linux (`tid=0x00007f...`) and decimal on Windows.
pub(crate) fn parse_id(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.starts_with("0x") || s.starts_with("0X") {
        parse_hex(s)
    } else {
        s.parse().ok()
    }
}

/// Collapse runs of whitespace to single spaces.
pub(crate) fn squash_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_dispatches_by_type() {
        let record = build(RecordType::Os, "OS:Red Hat Enterprise Linux Server release 7.8 (Maipo)");
        assert_eq!(record.record_type(), RecordType::Os);
        assert!(matches!(record, Record::Os(_)));

        let record = build(RecordType::HexDump, "0x00007fcd2c6eff00:   00007fcd2c6eff30");
        assert!(matches!(record, Record::Plain(_)));
        assert_eq!(record.record_type(), RecordType::HexDump);

        let record = build(RecordType::Unknown, "garbage");
        assert_eq!(record.raw(), "garbage");
    }

    #[test]
    fn test_every_type_round_trips_its_kind() {
        for record_type in RecordType::ALL {
            let record = build(*record_type, "x");
            assert_eq!(record.record_type(), *record_type, "{:?}", record_type);
            assert_eq!(record.raw(), "x");
        }
    }

    #[test]
    fn test_combine_kernel_limit_with_number() {
        let label = build(
            RecordType::ThreadsMax,
            "/proc/sys/kernel/threads-max (system-wide limit on the number of threads):",
        );
        let number = build(RecordType::Number, "255813");
        let combined = label.combine(&number).unwrap();
        assert_eq!(combined.record_type(), RecordType::ThreadsMax);
        match combined {
            Record::KernelLimit(limit) => assert_eq!(limit.value, Some(255_813)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_combine_rejects_wrong_pairing() {
        let label = build(RecordType::ThreadsMax, "/proc/sys/kernel/threads-max (x):");
        let mode = build(RecordType::ModeChoice, "[always] madvise never");
        assert_eq!(label.combine(&mode), None);

        let host = build(RecordType::Host, "Host: box");
        let number = build(RecordType::Number, "1");
        assert_eq!(host.combine(&number), None);
    }

    #[test]
    fn test_merge_os_lines() {
        let first = build(RecordType::Os, "OS:");
        let second = build(RecordType::Os, "Red Hat Enterprise Linux release 8.4 (Ootpa)");
        let merged = first.merge(&second);
        match &merged {
            Record::Os(os) => {
                assert_eq!(os.description, "Red Hat Enterprise Linux release 8.4 (Ootpa)");
                assert_eq!(os.vendor, OsVendor::RedHat);
                assert_eq!(os.family, OsFamily::Linux);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(merged.raw(), "OS:\nRed Hat Enterprise Linux release 8.4 (Ootpa)");
    }

    #[test]
    fn test_merge_non_concatenating_overwrites() {
        let first = build(RecordType::Host, "Host: a");
        let second = build(RecordType::Host, "Host: b");
        assert_eq!(first.merge(&second), second);
    }

    #[test]
    fn test_key_value_forms() {
        let env = KeyValue::parse(RecordType::EnvironmentVariable, "JAVA_OPTS=-Dx=y");
        assert_eq!(env.key, "JAVA_OPTS");
        assert_eq!(env.value, "-Dx=y");

        let limit = KeyValue::parse(RecordType::ContainerInfo, "memory_limit_in_bytes: 2097152 k");
        assert_eq!(limit.key, "memory_limit_in_bytes");
        assert_eq!(limit.size_bytes(), Some(2_147_483_648));

        let unlimited = KeyValue::parse(RecordType::ContainerInfo, "memory_limit_in_bytes: unlimited");
        assert_eq!(unlimited.size_bytes(), None);

        let release = KeyValue::parse(RecordType::ReleaseProperty, "IMPLEMENTOR=\"Eclipse Adoptium\"");
        assert_eq!(release.key, "IMPLEMENTOR");
        assert_eq!(release.value, "Eclipse Adoptium");

        let meminfo = KeyValue::parse(RecordType::Meminfo, "MemTotal:       16266508 kB");
        assert_eq!(meminfo.size_bytes(), Some(16_266_508 * 1024));
    }

    #[test]
    fn test_text_record_strips_label() {
        let args = TextRecord::parse(RecordType::JvmArgs, "jvm_args: -Xms1g -Xmx4g");
        assert_eq!(args.value, "-Xms1g -Xmx4g");

        let task = TextRecord::parse(RecordType::CompileTask, "C2:   1234   4       java.lang.String::hashCode (55 bytes)");
        assert!(task.value.starts_with("C2:"));
    }

    #[test]
    fn test_hex_and_id_helpers() {
        assert_eq!(parse_hex("0x00007fcd2af94e64"), Some(0x7fcd_2af9_4e64));
        assert_eq!(parse_hex("ff"), Some(255));
        assert_eq!(parse_hex("0xzz"), None);
        assert_eq!(parse_id("0x10"), Some(16));
        assert_eq!(parse_id("5678"), Some(5678));
        assert_eq!(squash_whitespace("Apr  5   2020"), "Apr 5 2020");
    }
}
