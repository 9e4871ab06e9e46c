//! Record types: the closed set of semantic line kinds in a fatal error log.
//!
//! Every line of a dump is assigned exactly one `RecordType`. The type also
//! decides how the reconstructor routes the built record (its
//! [`Disposition`]), whether a repeated singleton is merged or overwritten,
//! and whether a following continuation line may extend it.

use serde::{Deserialize, Serialize};

/// How the reconstructor routes a record of a given type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// One per dump, stored in a model field
    Singleton,
    /// Many per dump, appended to an ordered collection
    Repeating,
    /// Only meaningful combined with the preceding record
    Continuation,
    /// Recognized but not retained
    Discard,
    /// Empty or whitespace-only line
    Blank,
    /// Matched no classification rule
    Unknown,
}

/// What happens when a singleton type is seen a second time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Later occurrence replaces the earlier one
    Overwrite,
    /// Consecutive occurrences are joined into one logical record
    Concatenate,
}

/// Semantic kind of a single fatal error log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Blank,
    Unknown,

    // Header block
    Header,
    SectionSeparator,

    // Summary / identity
    CommandLine,
    Host,
    Time,
    Timezone,
    ElapsedTime,

    // Thread section
    CurrentThread,
    CurrentCompileTaskHeader,
    CompileTask,
    SigInfo,
    RegistersHeader,
    Register,
    RegisterToMemoryHeader,
    RegisterMapping,
    StackSlotMapping,
    TopOfStack,
    Instructions,
    HexDump,
    StackBounds,
    FramesHeader,
    Frame,
    MoreFrames,

    // Process section
    JavaThreadsHeader,
    OtherThreadsHeader,
    Thread,
    ThreadsSmr,
    VmState,
    VmMutex,
    HeapAddress,
    NarrowKlass,
    CompressedClassSpace,
    CdsArchive,
    HeapHeader,
    HeapRegion,
    Metaspace,
    ClassSpace,
    MetaspaceReport,
    G1RegionTable,
    GcMisc,
    CodeCache,
    CodeCacheDetail,
    EventsHeader,
    Event,
    NoEvents,
    HeapHistoryOpen,
    BraceClose,
    CompiledMethod,
    CompiledMethodDetail,
    DynamicLibrariesHeader,
    DynamicLibrary,
    VmArgumentsHeader,
    JvmArgs,
    JavaCommand,
    ClassPath,
    LauncherType,
    GlobalFlagsHeader,
    GlobalFlag,
    EnvironmentHeader,
    EnvironmentVariable,
    SignalHandlersHeader,
    SignalHandler,
    HandlerNote,
    ExceptionCountsHeader,
    ExceptionCount,
    LoggingConfig,

    // System section
    Os,
    ReleaseFileHeader,
    ReleaseProperty,
    Uname,
    Libc,
    Rlimit,
    LoadAverage,
    MeminfoHeader,
    Meminfo,
    ContainerHeader,
    ContainerInfo,
    Cpu,
    CpuInfoHeader,
    CpuInfo,
    Memory,
    ProcessMemoryHeader,
    ProcessMemory,
    VmInfo,
    ThreadsMax,
    MaxMapCount,
    PidMax,
    TransparentHugepage,
    Virtualization,
    GcPreciousHeader,
    GcPrecious,

    // Continuations
    Number,
    ModeChoice,

    End,
}

impl RecordType {
    /// Every record type, in declaration order.
    pub const ALL: &'static [RecordType] = &[
        RecordType::Blank,
        RecordType::Unknown,
        RecordType::Header,
        RecordType::SectionSeparator,
        RecordType::CommandLine,
        RecordType::Host,
        RecordType::Time,
        RecordType::Timezone,
        RecordType::ElapsedTime,
        RecordType::CurrentThread,
        RecordType::CurrentCompileTaskHeader,
        RecordType::CompileTask,
        RecordType::SigInfo,
        RecordType::RegistersHeader,
        RecordType::Register,
        RecordType::RegisterToMemoryHeader,
        RecordType::RegisterMapping,
        RecordType::StackSlotMapping,
        RecordType::TopOfStack,
        RecordType::Instructions,
        RecordType::HexDump,
        RecordType::StackBounds,
        RecordType::FramesHeader,
        RecordType::Frame,
        RecordType::MoreFrames,
        RecordType::JavaThreadsHeader,
        RecordType::OtherThreadsHeader,
        RecordType::Thread,
        RecordType::ThreadsSmr,
        RecordType::VmState,
        RecordType::VmMutex,
        RecordType::HeapAddress,
        RecordType::NarrowKlass,
        RecordType::CompressedClassSpace,
        RecordType::CdsArchive,
        RecordType::HeapHeader,
        RecordType::HeapRegion,
        RecordType::Metaspace,
        RecordType::ClassSpace,
        RecordType::MetaspaceReport,
        RecordType::G1RegionTable,
        RecordType::GcMisc,
        RecordType::CodeCache,
        RecordType::CodeCacheDetail,
        RecordType::EventsHeader,
        RecordType::Event,
        RecordType::NoEvents,
        RecordType::HeapHistoryOpen,
        RecordType::BraceClose,
        RecordType::CompiledMethod,
        RecordType::CompiledMethodDetail,
        RecordType::DynamicLibrariesHeader,
        RecordType::DynamicLibrary,
        RecordType::VmArgumentsHeader,
        RecordType::JvmArgs,
        RecordType::JavaCommand,
        RecordType::ClassPath,
        RecordType::LauncherType,
        RecordType::GlobalFlagsHeader,
        RecordType::GlobalFlag,
        RecordType::EnvironmentHeader,
        RecordType::EnvironmentVariable,
        RecordType::SignalHandlersHeader,
        RecordType::SignalHandler,
        RecordType::HandlerNote,
        RecordType::ExceptionCountsHeader,
        RecordType::ExceptionCount,
        RecordType::LoggingConfig,
        RecordType::Os,
        RecordType::ReleaseFileHeader,
        RecordType::ReleaseProperty,
        RecordType::Uname,
        RecordType::Libc,
        RecordType::Rlimit,
        RecordType::LoadAverage,
        RecordType::MeminfoHeader,
        RecordType::Meminfo,
        RecordType::ContainerHeader,
        RecordType::ContainerInfo,
        RecordType::Cpu,
        RecordType::CpuInfoHeader,
        RecordType::CpuInfo,
        RecordType::Memory,
        RecordType::ProcessMemoryHeader,
        RecordType::ProcessMemory,
        RecordType::VmInfo,
        RecordType::ThreadsMax,
        RecordType::MaxMapCount,
        RecordType::PidMax,
        RecordType::TransparentHugepage,
        RecordType::Virtualization,
        RecordType::GcPreciousHeader,
        RecordType::GcPrecious,
        RecordType::Number,
        RecordType::ModeChoice,
        RecordType::End,
    ];

    /// Routing class used by the reconstructor.
    pub fn disposition(&self) -> Disposition {
        use RecordType::*;
        match self {
            Blank => Disposition::Blank,
            Unknown => Disposition::Unknown,

            CommandLine | Host | Time | Timezone | ElapsedTime | CurrentThread | CompileTask
            | SigInfo | StackBounds | VmState | VmMutex | HeapAddress | NarrowKlass
            | CompressedClassSpace | Metaspace | ClassSpace | CompiledMethod | JvmArgs
            | JavaCommand | ClassPath | LauncherType | Os | Uname | Libc | Rlimit
            | LoadAverage | Cpu | Memory | VmInfo | ThreadsMax | MaxMapCount | PidMax
            | Virtualization => Disposition::Singleton,

            Header | Register | Frame | Thread | HeapRegion | CodeCache | CodeCacheDetail
            | Event | DynamicLibrary | GlobalFlag | EnvironmentVariable | SignalHandler
            | ExceptionCount | Meminfo | ContainerInfo | CpuInfo | TransparentHugepage
            | GcPrecious | ReleaseProperty | ProcessMemory => Disposition::Repeating,

            Number | ModeChoice | HandlerNote => Disposition::Continuation,

            SectionSeparator | CurrentCompileTaskHeader | RegistersHeader
            | RegisterToMemoryHeader | RegisterMapping | StackSlotMapping | TopOfStack
            | Instructions | HexDump | FramesHeader | MoreFrames | JavaThreadsHeader
            | OtherThreadsHeader | ThreadsSmr | CdsArchive | HeapHeader | MetaspaceReport
            | G1RegionTable | GcMisc | EventsHeader | NoEvents | HeapHistoryOpen | BraceClose
            | CompiledMethodDetail | DynamicLibrariesHeader | VmArgumentsHeader
            | GlobalFlagsHeader | EnvironmentHeader | SignalHandlersHeader
            | ExceptionCountsHeader | LoggingConfig | MeminfoHeader | ContainerHeader
            | CpuInfoHeader | GcPreciousHeader | ReleaseFileHeader | ProcessMemoryHeader
            | End => Disposition::Discard,
        }
    }

    /// Policy for a second occurrence of a singleton type.
    ///
    /// Only the OS descriptor is legitimately split over several lines
    /// (`OS:` followed by the release text on JDK 17+).
    pub fn merge_policy(&self) -> MergePolicy {
        match self {
            RecordType::Os => MergePolicy::Concatenate,
            _ => MergePolicy::Overwrite,
        }
    }

    /// Whether a following continuation line of type `next` extends this record.
    pub fn accepts_continuation(&self, next: RecordType) -> bool {
        matches!(
            (self, next),
            (
                RecordType::ThreadsMax | RecordType::MaxMapCount | RecordType::PidMax,
                RecordType::Number
            ) | (RecordType::TransparentHugepage, RecordType::ModeChoice)
                | (RecordType::SignalHandler, RecordType::HandlerNote)
        )
    }

    /// Stable snake_case name, matching the serde representation.
    pub fn name(&self) -> &'static str {
        use RecordType::*;
        match self {
            Blank => "blank",
            Unknown => "unknown",
            Header => "header",
            SectionSeparator => "section_separator",
            CommandLine => "command_line",
            Host => "host",
            Time => "time",
            Timezone => "timezone",
            ElapsedTime => "elapsed_time",
            CurrentThread => "current_thread",
            CurrentCompileTaskHeader => "current_compile_task_header",
            CompileTask => "compile_task",
            SigInfo => "sig_info",
            RegistersHeader => "registers_header",
            Register => "register",
            RegisterToMemoryHeader => "register_to_memory_header",
            RegisterMapping => "register_mapping",
            StackSlotMapping => "stack_slot_mapping",
            TopOfStack => "top_of_stack",
            Instructions => "instructions",
            HexDump => "hex_dump",
            StackBounds => "stack_bounds",
            FramesHeader => "frames_header",
            Frame => "frame",
            MoreFrames => "more_frames",
            JavaThreadsHeader => "java_threads_header",
            OtherThreadsHeader => "other_threads_header",
            Thread => "thread",
            ThreadsSmr => "threads_smr",
            VmState => "vm_state",
            VmMutex => "vm_mutex",
            HeapAddress => "heap_address",
            NarrowKlass => "narrow_klass",
            CompressedClassSpace => "compressed_class_space",
            CdsArchive => "cds_archive",
            HeapHeader => "heap_header",
            HeapRegion => "heap_region",
            Metaspace => "metaspace",
            ClassSpace => "class_space",
            MetaspaceReport => "metaspace_report",
            G1RegionTable => "g1_region_table",
            GcMisc => "gc_misc",
            CodeCache => "code_cache",
            CodeCacheDetail => "code_cache_detail",
            EventsHeader => "events_header",
            Event => "event",
            NoEvents => "no_events",
            HeapHistoryOpen => "heap_history_open",
            BraceClose => "brace_close",
            CompiledMethod => "compiled_method",
            CompiledMethodDetail => "compiled_method_detail",
            DynamicLibrariesHeader => "dynamic_libraries_header",
            DynamicLibrary => "dynamic_library",
            VmArgumentsHeader => "vm_arguments_header",
            JvmArgs => "jvm_args",
            JavaCommand => "java_command",
            ClassPath => "class_path",
            LauncherType => "launcher_type",
            GlobalFlagsHeader => "global_flags_header",
            GlobalFlag => "global_flag",
            EnvironmentHeader => "environment_header",
            EnvironmentVariable => "environment_variable",
            SignalHandlersHeader => "signal_handlers_header",
            SignalHandler => "signal_handler",
            HandlerNote => "handler_note",
            ExceptionCountsHeader => "exception_counts_header",
            ExceptionCount => "exception_count",
            LoggingConfig => "logging_config",
            Os => "os",
            ReleaseFileHeader => "release_file_header",
            ReleaseProperty => "release_property",
            Uname => "uname",
            Libc => "libc",
            Rlimit => "rlimit",
            LoadAverage => "load_average",
            MeminfoHeader => "meminfo_header",
            Meminfo => "meminfo",
            ContainerHeader => "container_header",
            ContainerInfo => "container_info",
            Cpu => "cpu",
            CpuInfoHeader => "cpu_info_header",
            CpuInfo => "cpu_info",
            Memory => "memory",
            ProcessMemoryHeader => "process_memory_header",
            ProcessMemory => "process_memory",
            VmInfo => "vm_info",
            ThreadsMax => "threads_max",
            MaxMapCount => "max_map_count",
            PidMax => "pid_max",
            TransparentHugepage => "transparent_hugepage",
            Virtualization => "virtualization",
            GcPreciousHeader => "gc_precious_header",
            GcPrecious => "gc_precious",
            Number => "number",
            ModeChoice => "mode_choice",
            End => "end",
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
