//! The aggregate model of one fatal error log.
//!
//! Filled by [`crate::reader::LogReader`] in a single pass, then findings
//! are appended once by [`crate::diagnostics::DiagnosticEngine`]. Reporters
//! treat it as read-only.

use crate::analysis::{Analysis, Finding};
use crate::config::DEFAULT_UNIDENTIFIED_CAPACITY;
use crate::jdk_release::JdkVersion;
use crate::jvm_options::JvmOptions;
use crate::record_type::RecordType;
use crate::records::{
    CodeCacheSegment, CompressedClassSpace, CpuSummary, DynamicLibrary, ElapsedTime, EventRecord,
    ExceptionCount, GlobalFlag, HeaderDetail, HeaderLine, HeapAddress, HeapRegion, KernelLimit,
    KeyValue, MemorySummary, MetaspaceUsage, OsInfo, PlainRecord, ProcessMemoryStat, Record,
    RlimitInfo, SigInfo,
    SignalHandler, StackBounds, StackFrame, TextRecord, ThpSetting, ThreadRecord, TimeRecord,
    UnameInfo, VmInfo, VmStateRecord,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FatalErrorLog {
    // Summary and THREAD section
    pub command_line: Option<TextRecord>,
    pub host: Option<TextRecord>,
    pub time: Option<TimeRecord>,
    pub timezone: Option<TextRecord>,
    pub elapsed_time: Option<ElapsedTime>,
    pub current_thread: Option<TextRecord>,
    pub compile_task: Option<TextRecord>,
    pub sig_info: Option<SigInfo>,
    pub stack_bounds: Option<StackBounds>,

    // PROCESS section
    pub vm_state: Option<VmStateRecord>,
    pub vm_mutex: Option<TextRecord>,
    pub heap_address: Option<HeapAddress>,
    pub narrow_klass: Option<TextRecord>,
    pub compressed_class_space: Option<CompressedClassSpace>,
    pub metaspace: Option<MetaspaceUsage>,
    pub class_space: Option<MetaspaceUsage>,
    pub compiled_method: Option<TextRecord>,
    pub jvm_args: Option<TextRecord>,
    pub java_command: Option<TextRecord>,
    pub class_path: Option<TextRecord>,
    pub launcher_type: Option<TextRecord>,

    // SYSTEM section
    pub os: Option<OsInfo>,
    pub uname: Option<UnameInfo>,
    pub libc: Option<TextRecord>,
    pub rlimit: Option<RlimitInfo>,
    pub load_average: Option<TextRecord>,
    pub cpu: Option<CpuSummary>,
    pub memory: Option<MemorySummary>,
    pub vm_info: Option<VmInfo>,
    pub threads_max: Option<KernelLimit>,
    pub max_map_count: Option<KernelLimit>,
    pub pid_max: Option<KernelLimit>,
    pub virtualization: Option<TextRecord>,

    pub header: Vec<HeaderLine>,
    pub frames: Vec<StackFrame>,
    pub registers: Vec<PlainRecord>,
    pub threads: Vec<ThreadRecord>,
    pub heap_regions: Vec<HeapRegion>,
    pub code_cache: Vec<CodeCacheSegment>,
    pub code_cache_details: Vec<PlainRecord>,
    pub events: Vec<EventRecord>,
    pub dynamic_libraries: Vec<DynamicLibrary>,
    pub global_flags: Vec<GlobalFlag>,
    pub environment: Vec<KeyValue>,
    /// `KEY="value"` lines under `Release file:`
    pub release_file: Vec<KeyValue>,
    pub signal_handlers: Vec<SignalHandler>,
    pub meminfo: Vec<KeyValue>,
    pub container_info: Vec<KeyValue>,
    pub cpu_info: Vec<KeyValue>,
    pub gc_precious: Vec<KeyValue>,
    pub hugepages: Vec<ThpSetting>,
    pub exception_counts: Vec<ExceptionCount>,
    pub process_memory: Vec<ProcessMemoryStat>,

    /// Lines no rule recognized, in input order, up to the capacity
    pub unidentified: Vec<String>,
    /// Unrecognized lines seen after the bucket was full
    pub unidentified_dropped: usize,
    pub unidentified_capacity: usize,

    pub findings: Vec<Finding>,
}

impl Default for FatalErrorLog {
    fn default() -> Self {
        Self::new(DEFAULT_UNIDENTIFIED_CAPACITY)
    }
}

fn push_or_replace<T>(items: &mut Vec<T>, item: T, replace_last: bool) {
    if replace_last {
        items.pop();
    }
    items.push(item);
}

impl FatalErrorLog {
    pub fn new(unidentified_capacity: usize) -> Self {
        Self {
            command_line: None,
            host: None,
            time: None,
            timezone: None,
            elapsed_time: None,
            current_thread: None,
            compile_task: None,
            sig_info: None,
            stack_bounds: None,
            vm_state: None,
            vm_mutex: None,
            heap_address: None,
            narrow_klass: None,
            compressed_class_space: None,
            metaspace: None,
            class_space: None,
            compiled_method: None,
            jvm_args: None,
            java_command: None,
            class_path: None,
            launcher_type: None,
            os: None,
            uname: None,
            libc: None,
            rlimit: None,
            load_average: None,
            cpu: None,
            memory: None,
            vm_info: None,
            threads_max: None,
            max_map_count: None,
            pid_max: None,
            virtualization: None,
            header: Vec::new(),
            frames: Vec::new(),
            registers: Vec::new(),
            threads: Vec::new(),
            heap_regions: Vec::new(),
            code_cache: Vec::new(),
            code_cache_details: Vec::new(),
            events: Vec::new(),
            dynamic_libraries: Vec::new(),
            global_flags: Vec::new(),
            environment: Vec::new(),
            release_file: Vec::new(),
            signal_handlers: Vec::new(),
            meminfo: Vec::new(),
            container_info: Vec::new(),
            cpu_info: Vec::new(),
            gc_precious: Vec::new(),
            hugepages: Vec::new(),
            exception_counts: Vec::new(),
            process_memory: Vec::new(),
            unidentified: Vec::new(),
            unidentified_dropped: 0,
            unidentified_capacity,
            findings: Vec::new(),
        }
    }

    /// Route a built record into its field or collection.
    ///
    /// Singletons always overwrite (merging is decided by the reader).
    /// With `replace_last`, a repeating record replaces the last element
    /// of its collection instead of being appended.
    pub(crate) fn store(&mut self, record: Record, replace_last: bool) {
        match record {
            Record::Header(r) => push_or_replace(&mut self.header, r, replace_last),
            Record::Frame(r) => push_or_replace(&mut self.frames, r, replace_last),
            Record::SigInfo(r) => self.sig_info = Some(r),
            Record::StackBounds(r) => self.stack_bounds = Some(r),
            Record::Thread(r) => push_or_replace(&mut self.threads, r, replace_last),
            Record::VmState(r) => self.vm_state = Some(r),
            Record::HeapAddress(r) => self.heap_address = Some(r),
            Record::CompressedClassSpace(r) => self.compressed_class_space = Some(r),
            Record::HeapRegion(r) => push_or_replace(&mut self.heap_regions, r, replace_last),
            Record::Metaspace(r) => {
                if r.kind == RecordType::ClassSpace {
                    self.class_space = Some(r);
                } else {
                    self.metaspace = Some(r);
                }
            }
            Record::CodeCache(r) => push_or_replace(&mut self.code_cache, r, replace_last),
            Record::Event(r) => push_or_replace(&mut self.events, r, replace_last),
            Record::DynamicLibrary(r) => {
                push_or_replace(&mut self.dynamic_libraries, r, replace_last)
            }
            Record::GlobalFlag(r) => push_or_replace(&mut self.global_flags, r, replace_last),
            Record::SignalHandler(r) => {
                push_or_replace(&mut self.signal_handlers, r, replace_last)
            }
            Record::ExceptionCount(r) => {
                push_or_replace(&mut self.exception_counts, r, replace_last)
            }
            Record::Os(r) => self.os = Some(r),
            Record::Uname(r) => self.uname = Some(r),
            Record::Rlimit(r) => self.rlimit = Some(r),
            Record::Cpu(r) => self.cpu = Some(r),
            Record::Memory(r) => self.memory = Some(r),
            Record::ProcessMemory(r) => {
                push_or_replace(&mut self.process_memory, r, replace_last)
            }
            Record::VmInfo(r) => self.vm_info = Some(r),
            Record::Time(r) => self.time = Some(r),
            Record::ElapsedTime(r) => self.elapsed_time = Some(r),
            Record::KernelLimit(r) => match r.kind {
                RecordType::ThreadsMax => self.threads_max = Some(r),
                RecordType::MaxMapCount => self.max_map_count = Some(r),
                _ => self.pid_max = Some(r),
            },
            Record::Hugepage(r) => push_or_replace(&mut self.hugepages, r, replace_last),
            Record::KeyValue(r) => {
                let items = match r.kind {
                    RecordType::EnvironmentVariable => &mut self.environment,
                    RecordType::ReleaseProperty => &mut self.release_file,
                    RecordType::Meminfo => &mut self.meminfo,
                    RecordType::ContainerInfo => &mut self.container_info,
                    RecordType::CpuInfo => &mut self.cpu_info,
                    _ => &mut self.gc_precious,
                };
                push_or_replace(items, r, replace_last);
            }
            Record::Text(r) => match self.text_slot(r.kind) {
                Some(slot) => *slot = Some(r),
                None => debug!("no field for {} text record", r.kind),
            },
            Record::Plain(r) => match r.kind {
                RecordType::Register => push_or_replace(&mut self.registers, r, replace_last),
                RecordType::CodeCacheDetail => {
                    push_or_replace(&mut self.code_cache_details, r, replace_last)
                }
                kind => debug!("{} records are not retained", kind),
            },
        }
    }

    fn text_slot(&mut self, kind: RecordType) -> Option<&mut Option<TextRecord>> {
        use RecordType as T;
        let slot = match kind {
            T::CommandLine => &mut self.command_line,
            T::Host => &mut self.host,
            T::Timezone => &mut self.timezone,
            T::CurrentThread => &mut self.current_thread,
            T::CompileTask => &mut self.compile_task,
            T::VmMutex => &mut self.vm_mutex,
            T::NarrowKlass => &mut self.narrow_klass,
            T::CompiledMethod => &mut self.compiled_method,
            T::JvmArgs => &mut self.jvm_args,
            T::JavaCommand => &mut self.java_command,
            T::ClassPath => &mut self.class_path,
            T::LauncherType => &mut self.launcher_type,
            T::Libc => &mut self.libc,
            T::LoadAverage => &mut self.load_average,
            T::Virtualization => &mut self.virtualization,
            _ => return None,
        };
        Some(slot)
    }

    /// Keep an unrecognized line while there is room; count it otherwise.
    pub(crate) fn push_unidentified(&mut self, line: &str) {
        if self.unidentified.len() < self.unidentified_capacity {
            debug!("unidentified line: {:?}", line);
            self.unidentified.push(line.to_string());
        } else {
            if self.unidentified_dropped == 0 {
                warn!(
                    "unidentified line capacity ({}) reached, further lines are only counted",
                    self.unidentified_capacity
                );
            }
            self.unidentified_dropped += 1;
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.unidentified_dropped > 0
    }

    pub fn header_details(&self) -> impl Iterator<Item = &HeaderDetail> {
        self.header.iter().map(|h| &h.detail)
    }

    /// The frame under `# Problematic frame:`, else the top of the native stack.
    pub fn problematic_frame(&self) -> Option<&StackFrame> {
        self.header
            .iter()
            .find_map(|h| match &h.detail {
                HeaderDetail::ProblematicFrame(frame) => Some(frame),
                _ => None,
            })
            .or_else(|| self.frames.first())
    }

    /// `SIGSEGV`, `EXCEPTION_ACCESS_VIOLATION`: from the header, else siginfo.
    pub fn signal(&self) -> Option<&str> {
        self.header_details()
            .find_map(|d| match d {
                HeaderDetail::Signal { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .or_else(|| self.sig_info.as_ref().and_then(|s| s.signal.as_deref()))
    }

    /// From `vm_info:`, else the `# JRE version:` header line.
    pub fn jdk_version(&self) -> Option<JdkVersion> {
        self.vm_info
            .as_ref()
            .and_then(|info| info.version)
            .or_else(|| {
                self.header_details().find_map(|d| match d {
                    HeaderDetail::JreVersion { version, .. } => *version,
                    _ => None,
                })
            })
    }

    pub fn build_date(&self) -> Option<NaiveDate> {
        self.vm_info.as_ref().and_then(|info| info.build_date)
    }

    /// Options from `jvm_args:`, or `Command Line:` when the dump has no
    /// VM Arguments section.
    pub fn jvm_options(&self) -> JvmOptions {
        self.jvm_args
            .as_ref()
            .or(self.command_line.as_ref())
            .map(|r| JvmOptions::parse(&r.value))
            .unwrap_or_default()
    }

    /// A `[Global flags]` entry by flag name.
    pub fn global_flag(&self, name: &str) -> Option<&GlobalFlag> {
        self.global_flags
            .iter()
            .find(|f| f.name.as_deref() == Some(name))
    }

    /// Container (cgroup) value such as `memory_limit_in_bytes`.
    pub fn container_value(&self, key: &str) -> Option<&KeyValue> {
        self.container_info.iter().find(|kv| kv.key == key)
    }

    pub fn environment_variable(&self, name: &str) -> Option<&str> {
        self.environment
            .iter()
            .find(|kv| kv.key == name)
            .map(|kv| kv.value.as_str())
    }

    /// A property of the JDK `release` file, unquoted.
    pub fn release_property(&self, key: &str) -> Option<&str> {
        self.release_file
            .iter()
            .find(|kv| kv.key == key)
            .map(|kv| kv.value.as_str())
    }

    /// A `Process Memory:` entry such as `Resident Set Size`.
    pub fn process_memory_stat(&self, name: &str) -> Option<&ProcessMemoryStat> {
        self.process_memory.iter().find(|stat| stat.name == name)
    }

    /// Path of the loaded `libjvm.so` / `jvm.dll`.
    pub fn libjvm_path(&self) -> Option<&str> {
        self.dynamic_libraries
            .iter()
            .find(|lib| matches!(lib.file_name(), Some("libjvm.so" | "jvm.dll")))
            .and_then(|lib| lib.path.as_deref())
    }

    /// Sum of the exception counters for `exception`.
    pub fn exception_total(&self, exception: &str) -> u64 {
        self.exception_counts
            .iter()
            .filter(|c| c.exception.as_deref() == Some(exception))
            .fold(0u64, |total, c| total.saturating_add(c.count))
    }

    pub fn has_finding(&self, analysis: Analysis) -> bool {
        self.findings.iter().any(|f| f.analysis == analysis)
    }
}
