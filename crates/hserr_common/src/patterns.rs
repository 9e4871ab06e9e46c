//! Pattern catalog: ordered line-matching rules for every record type.
//!
//! Order is priority. The first rule whose pattern matches a line decides
//! its type, so specific rules must precede generic ones: register dumps
//! and `DISTRIB_*` lines before quoted release properties, both before
//! environment variables, container keys before `/proc/meminfo` keys, and
//! the bare-number / mode-choice continuations after everything else. All
//! patterns are anchored on both ends.

use crate::record_type::RecordType;
use regex::{Regex, RegexSet};
use std::sync::LazyLock;

/// A compiled classification rule.
#[derive(Debug)]
pub struct ClassificationRule {
    /// Type assigned when this rule wins
    pub record_type: RecordType,
    /// Position in the catalog; lower wins
    pub priority: usize,
    regex: Regex,
}

impl ClassificationRule {
    /// Whether this rule's predicate accepts the line.
    pub fn matches(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }

    /// Source pattern.
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }
}

/// Catalog source, in priority order.
const CATALOG_SOURCE: &[(RecordType, &str)] = &[
    (RecordType::Blank, r"^\s*$"),
    // Header block
    (RecordType::Header, r"^#.*$"),
    (RecordType::SectionSeparator, r"^-{3,}\s+[A-Z](?: [A-Z])*\s+-{3,}\s*$"),
    // Summary / identity
    (RecordType::CommandLine, r"^Command Line: ?.*$"),
    (RecordType::Host, r"^Host: .*$"),
    (RecordType::Time, r"^[Tt]ime: .*$"),
    (RecordType::Timezone, r"^timezone: .*$"),
    (RecordType::ElapsedTime, r"^elapsed time: .*$"),
    // Thread section
    (RecordType::CurrentThread, r"^Current thread\b.*$"),
    (RecordType::CurrentCompileTaskHeader, r"^Current CompileTask:\s*$"),
    (RecordType::CompileTask, r"^(?:C1|C2|JVMCI):\s*\d+.*$"),
    (RecordType::SigInfo, r"^siginfo: ?.*$"),
    (RecordType::RegistersHeader, r"^Registers:\s*$"),
    (RecordType::RegisterToMemoryHeader, r"^Register to memory mapping:\s*$"),
    (
        RecordType::RegisterMapping,
        r"^\s*[A-Za-z][A-Za-z0-9]{0,6}\s*=\s*(?:0x[0-9a-fA-F]+\s+\S.*|\{.*)$",
    ),
    (
        RecordType::Register,
        r"^\s*[A-Za-z][A-Za-z0-9]{0,6}\s*=\s*0x[0-9a-fA-F]+(?:\s*,\s*[A-Za-z][A-Za-z0-9]{0,6}\s*=\s*0x[0-9a-fA-F]+)*\s*,?\s*$",
    ),
    (RecordType::StackSlotMapping, r"^\s*stack at sp \+ \d+ slots:.*$"),
    (RecordType::TopOfStack, r"^Top of Stack: \(sp=0x[0-9a-fA-F]+\)\s*$"),
    (RecordType::Instructions, r"^Instructions: \(pc=0x[0-9a-fA-F]+\)\s*$"),
    (RecordType::HexDump, r"^0x[0-9a-fA-F]+:(?:\s+[0-9a-fA-F]+)*\s*(?:\|.*)?$"),
    (RecordType::StackBounds, r"^Stack: \[0x[0-9a-fA-F]+,\s*0x[0-9a-fA-F]+\].*$"),
    (RecordType::FramesHeader, r"^(?:Native|Java) frames: .*$"),
    (RecordType::MoreFrames, r"^\.\.\.<more frames>\.\.\.\s*$"),
    (RecordType::Frame, r"^[CJjVv]\s+\S.*$"),
    // Process section
    (RecordType::JavaThreadsHeader, r"^Java Threads: \( => current thread \)\s*$"),
    (RecordType::OtherThreadsHeader, r"^Other Threads:\s*$"),
    (
        RecordType::Thread,
        r"^(?:=>|\s+)0x[0-9a-fA-F]+\s+(?:\(exited\)\s+)?[A-Z][A-Za-z]*Thread\b.*$",
    ),
    (
        RecordType::ThreadsSmr,
        r"^(?:Threads class SMR info:|_java_thread_list=.*|_to_delete_list=.*|_smr_.*|Threads with active compile tasks:|\s*0x[0-9a-fA-F]+(?:,\s*0x[0-9a-fA-F]+)*,?)\s*$",
    ),
    (RecordType::VmState, r"^VM state: ?.*$"),
    (RecordType::VmMutex, r"^VM Mutex/Monitor currently owned by a thread:.*$"),
    (RecordType::HeapAddress, r"^[Hh]eap address: 0x[0-9a-fA-F]+, size: \d+ MB.*$"),
    (RecordType::NarrowKlass, r"^Narrow klass base: 0x[0-9a-fA-F]+.*$"),
    (RecordType::CompressedClassSpace, r"^Compressed class space (?:size|mapped at): .*$"),
    (RecordType::CdsArchive, r"^CDS (?:archive|disabled).*$"),
    (RecordType::HeapHeader, r"^Heap:\s*$"),
    (RecordType::Metaspace, r"^\s*Metaspace\s+used \d+K,.*$"),
    (RecordType::ClassSpace, r"^\s*class space\s+used \d+K,.*$"),
    (
        RecordType::HeapRegion,
        r"^\s+(?:PSYoungGen|ParOldGen|PSOldGen|PSPermGen|def new generation|tenured generation|concurrent mark-sweep generation|par new generation|concurrent-mark-sweep perm gen|garbage-first heap|ZHeap|Shenandoah Heap|eden space|from space|to\s+space|object space|the space|region size)\b.*$",
    ),
    (
        RecordType::MetaspaceReport,
        r"^(?:Metaspace:|Usage:|Virtual space:|Chunk freelists:|Internal statistics:|\s+(?:Non-[Cc]lass|Class|Both)(?: space)?:\s+.*|(?:MaxMetaspaceSize|CompressedClassSpaceSize|Initial GC threshold|Current GC threshold|CDS|MetaspaceReclaimPolicy): .*|\s*- [a-z_]+: .*|num_[a-z_]+: .*)\s*$",
    ),
    (
        RecordType::G1RegionTable,
        r"^(?:Heap Regions: .*|\|\s*\d+\|.*|.*TAMS=top-at-mark-start.*)$",
    ),
    (
        RecordType::GcMisc,
        r"^(?:Card table byte_map: .*|Marking Bits.*|Mark Bits: .*|Prev Bits: .*|Next Bits: .*|\s*(?:Begin|End) Bits:\s+.*|Polling page: .*|Encoding Range: .*|Klass Range: .*)$",
    ),
    (RecordType::CodeCache, r"^(?:CodeCache|CodeHeap '[^']+'): size=\d+Kb.*$"),
    (
        RecordType::CodeCacheDetail,
        r"^\s+(?:bounds \[.*|total_blobs=.*|compilation: .*|stopped_count=.*|full_count=.*)$",
    ),
    (RecordType::EventsHeader, r"^[A-Z][A-Za-z /]*? \(\d+ events\):\s*$"),
    (RecordType::Event, r"^Event: \d+(?:\.\d+)? .*$"),
    (RecordType::NoEvents, r"^No [Ee]vents\s*$"),
    (RecordType::HeapHistoryOpen, r"^\{Heap (?:before|after) .*$"),
    (RecordType::BraceClose, r"^\s*\}\s*$"),
    (RecordType::CompiledMethod, r"^Compiled method \([a-zA-Z0-9]+\)\s+.*$"),
    (
        RecordType::CompiledMethodDetail,
        r"^\s+(?:total in heap|relocation|main code|stub code|oops|metadata|scopes data|scopes pcs|dependencies|handler table|nul chk table|constants|content|immutable data|mutable data)\s+\[.*$",
    ),
    (RecordType::DynamicLibrariesHeader, r"^Dynamic libraries:\s*$"),
    (
        RecordType::DynamicLibrary,
        r"^(?:[0-9a-fA-F]{8,16}-[0-9a-fA-F]{8,16}\s+[-r][-w][-x][-psS]\s+[0-9a-fA-F]+\s+[0-9a-fA-F]+:[0-9a-fA-F]+\s+\d+.*|0x[0-9a-fA-F]{8,16} - 0x[0-9a-fA-F]{8,16}\s+.*)$",
    ),
    (RecordType::VmArgumentsHeader, r"^VM Arguments:\s*$"),
    (RecordType::JvmArgs, r"^jvm_args: ?.*$"),
    (RecordType::JavaCommand, r"^java_command: ?.*$"),
    (RecordType::ClassPath, r"^java_class_path \(initial\): ?.*$"),
    (RecordType::LauncherType, r"^Launcher Type: ?.*$"),
    (RecordType::GlobalFlagsHeader, r"^\[Global flags\]\s*$"),
    (
        RecordType::GlobalFlag,
        r"^\s+(?:bool|int|intx|uint|uintx|uint64_t|size_t|double|ccstr|ccstrlist)\s+\w+\s+:?= .*$",
    ),
    (RecordType::EnvironmentHeader, r"^Environment Variables:\s*$"),
    (RecordType::SignalHandlersHeader, r"^Signal Handlers:\s*$"),
    (RecordType::SignalHandler, r"^\s*SIG[A-Z0-9]+: .*$"),
    (RecordType::HandlerNote, r"^\s*\*\*\* (?:Handler was modified!|Expected: .*)\s*$"),
    (
        RecordType::ExceptionCountsHeader,
        r"^OutOfMemory and StackOverflow Exception counts:\s*$",
    ),
    (RecordType::ExceptionCount, r"^(?:OutOfMemoryError \w+|StackOverflowErrors)=\d+\s*$"),
    (RecordType::LoggingConfig, r"^(?:Logging:|Log output configuration:|\s+#\d+: .*)\s*$"),
    // System section
    (
        RecordType::Os,
        r"^(?:OS:.*|\s*(?:Red Hat Enterprise Linux|CentOS|Oracle Linux|Rocky Linux|AlmaLinux|Fedora|Ubuntu|Debian GNU/Linux|SUSE Linux|openSUSE|Amazon Linux|Alpine Linux|Windows)\b.*|DISTRIB_[A-Z]+=.*)$",
    ),
    (RecordType::ReleaseFileHeader, r"^Release file:\s*$"),
    (RecordType::ReleaseProperty, r#"^[A-Z][A-Z0-9_]*="[^"]*"\s*$"#),
    (RecordType::Uname, r"^uname: ?.*$"),
    (RecordType::Libc, r"^libc: ?.*$"),
    (RecordType::Rlimit, r"^rlimit(?: \(soft/hard\))?: .*$"),
    (RecordType::LoadAverage, r"^load average: ?.*$"),
    (RecordType::MeminfoHeader, r"^/proc/meminfo:\s*$"),
    (RecordType::ContainerHeader, r"^container \(cgroup\) information:\s*$"),
    (
        RecordType::ContainerInfo,
        r"^(?:container_type|cpu_cpuset_cpus|cpu_memory_nodes|active_processor_count|cpu_quota|cpu_period|cpu_shares|memory_limit_in_bytes|memory_and_swap_limit_in_bytes|memory_soft_limit_in_bytes|memory_usage_in_bytes|memory_max_usage_in_bytes|memory_swap_current_in_bytes|memory_swap_max_limit_in_bytes|kernel_memory_usage_in_bytes|kernel_memory_max_usage_in_bytes|kernel_memory_limit_in_bytes|rss_usage_in_bytes|cache_usage_in_bytes|maximum number of tasks|current number of tasks): ?.*$",
    ),
    (RecordType::CpuInfoHeader, r"^(?:/proc/cpuinfo:|CPU Model and flags from /proc/cpuinfo:)\s*$"),
    (
        RecordType::CpuInfo,
        r"^(?:processor|vendor_id|cpu family|model|model name|stepping|microcode|cpu MHz|cache size|physical id|siblings|core id|cpu cores|apicid|initial apicid|fpu|fpu_exception|cpuid level|wp|flags|vmx flags|bugs|bogomips|clflush size|cache_alignment|address sizes|power management)\s*: ?.*$",
    ),
    (RecordType::ProcessMemoryHeader, r"^Process Memory:\s*$"),
    (
        RecordType::ProcessMemory,
        r"^(?:Virtual Size|Resident Set Size|Swapped out|C-Heap outstanding allocations|glibc malloc tunables): .*$",
    ),
    (RecordType::Meminfo, r"^[A-Za-z][A-Za-z0-9_()]*:\s+\d+(?: kB)?\s*$"),
    (RecordType::Cpu, r"^CPU: ?total \d+.*$"),
    (RecordType::Memory, r"^Memory: \d+k page.*$"),
    (RecordType::VmInfo, r"^vm_info: .*$"),
    (RecordType::ThreadsMax, r"^/proc/sys/kernel/threads-max \(.*\):.*$"),
    (RecordType::MaxMapCount, r"^/proc/sys/vm/max_map_count \(.*\):.*$"),
    (RecordType::PidMax, r"^/proc/sys/kernel/pid_max \(.*\):.*$"),
    (
        RecordType::TransparentHugepage,
        r"^/sys/kernel/mm/transparent_hugepage/(?:enabled|defrag|shmem_enabled)(?: \(.*\))?:.*$",
    ),
    (RecordType::Virtualization, r"^[A-Za-z-]+ virtualization detected\s*$"),
    (RecordType::GcPreciousHeader, r"^GC Precious Log:\s*$"),
    (
        RecordType::GcPrecious,
        r"^\s+(?:CPUs|Memory|Large Page Support|NUMA Support|NUMA Nodes|Compressed Oops|Heap Region Size|Heap Min Capacity|Heap Initial Capacity|Heap Max Capacity|Pre-touch|Parallel Workers|Concurrent Workers|Concurrent Refinement Workers|Periodic GC|Min Capacity|Initial Capacity|Max Capacity|Soft Max Capacity|Medium Page Size|Uncommit|GC Workers|Runtime Workers|Address Space Type|Address Space Size|Heap Backing File|Heap Backing Filesystem|Available space on backing filesystem|Alignments): .*$",
    ),
    (RecordType::End, r"^END\.\s*$"),
    // Generic catch-alls: only after every specific KEY=value / number form
    (RecordType::EnvironmentVariable, r"^[A-Za-z_][A-Za-z0-9_.]*=.*$"),
    (
        RecordType::ModeChoice,
        r"^\s*(?:[a-z][a-z+]*\s+)*\[[a-z][a-z+]*\](?:\s+[a-z][a-z+]*)*\s*$",
    ),
    (RecordType::Number, r"^\s*\d+\s*$"),
];

/// Compiled catalog, in priority order.
static PATTERN_CATALOG: LazyLock<Vec<ClassificationRule>> = LazyLock::new(|| {
    CATALOG_SOURCE
        .iter()
        .enumerate()
        .filter_map(|(priority, (record_type, pattern))| match Regex::new(pattern) {
            Ok(regex) => Some(ClassificationRule {
                record_type: *record_type,
                priority,
                regex,
            }),
            Err(e) => {
                tracing::error!("catalog pattern for {} failed to compile: {}", record_type, e);
                None
            }
        })
        .collect()
});

/// All catalog patterns in one set; match indices map into `PATTERN_CATALOG`.
static PATTERN_SET: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new(PATTERN_CATALOG.iter().map(|rule| rule.pattern()))
        .unwrap_or_else(|_| RegexSet::empty())
});

/// Compile a field-extraction pattern used by the record builders.
///
/// A pattern that fails to compile is logged and yields `None`; callers
/// then treat the field as absent.
pub(crate) fn compile_field(pattern: &str) -> Option<Regex> {
    Regex::new(pattern)
        .map_err(|e| tracing::error!("field pattern {:?} failed to compile: {}", pattern, e))
        .ok()
}

/// The compiled catalog, in priority order.
pub fn catalog() -> &'static [ClassificationRule] {
    &PATTERN_CATALOG
}

/// Type of the highest-priority rule matching `line`, if any.
pub fn first_match(line: &str) -> Option<RecordType> {
    PATTERN_SET
        .matches(line)
        .iter()
        .next()
        .map(|index| PATTERN_CATALOG[index].record_type)
}

/// Every rule matching `line`, in priority order. Used to audit ambiguity.
pub fn all_matches(line: &str) -> Vec<RecordType> {
    PATTERN_SET
        .matches(line)
        .iter()
        .map(|index| PATTERN_CATALOG[index].record_type)
        .collect()
}
