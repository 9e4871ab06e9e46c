//! Rule-based diagnostics over a reconstructed fatal error log.
//!
//! Rules are independent predicates evaluated in registration order. A
//! rule marked [`Placement::Front`] lands ahead of every in-order finding
//! so it is the first thing a reader sees. Evaluation is pure: no clock,
//! no randomness, and a second run yields the same list.

use crate::analysis::{Analysis, Finding};
use crate::config::HserrConfig;
use crate::error::HserrError;
use crate::fatal_error_log::FatalErrorLog;
use crate::jdk_release::ReleaseTable;
use crate::records::{CoreDumpStatus, FrameKind, HeaderDetail, Limit};
use crate::units::{self, format_size};
use tracing::debug;

/// JDK-shipped native libraries, by file stem.
const JDK_NATIVE_LIBRARIES: &[&str] = &[
    "libjvm", "libjava", "libjsig", "libjli", "libzip", "libnio", "libnet", "libverify",
    "libjimage", "libawt", "libawt_xawt", "libawt_headless", "libfontmanager", "liblcms",
    "libmlib_image", "libjpeg", "libsplashscreen", "libjawt", "libjsound", "libmanagement",
    "libmanagement_ext", "libinstrument", "libattach", "libprefs", "libsunec", "libj2pkcs11",
    "libj2gss", "libsctp", "libextnet", "librmi", "libjaas", "libjdwp", "libdt_socket",
    "libhprof", "libunpack", "libsaproc", "libsvml", "libsyslookup", "libjsvml", "jvm", "java",
    "jsig", "jli", "zip", "nio", "net", "verify", "jimage", "awt", "fontmanager", "management",
    "instrument", "attach", "sunec", "jdwp", "dt_socket", "jawt",
];

/// Operating system libraries. A crash there usually has its cause in the
/// caller, so they are not reported as third-party code.
const OS_NATIVE_LIBRARIES: &[&str] = &[
    "libc", "libpthread", "libdl", "libm", "librt", "libgcc_s", "libstdc++", "ld-linux-x86-64",
    "ld-linux-aarch64", "ld-linux", "ld-musl-x86_64", "linux-vdso", "ntdll", "kernel32",
    "kernelbase", "msvcrt", "ucrtbase", "vcruntime140", "msvcr100", "msvcr120",
];

/// Default `CompressedClassSpaceSize`.
const DEFAULT_COMPRESSED_CLASS_SPACE: u64 = 1024 * 1024 * 1024;

/// Heaps under this size can use compressed oops.
const COMPRESSED_OOPS_LIMIT: u64 = 32 * 1024 * 1024 * 1024;

/// Where a rule's finding goes in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Ahead of all in-order findings
    Front,
    /// In registration order
    InOrder,
}

/// Shared, read-only inputs to the rules.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub releases: &'a ReleaseTable,
}

pub type RuleCheck = fn(&FatalErrorLog, &RuleContext<'_>) -> Option<Finding>;

#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub placement: Placement,
    pub check: RuleCheck,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("placement", &self.placement)
            .finish()
    }
}

const RULES: &[Rule] = &[
    Rule { name: "unidentified_lines", placement: Placement::Front, check: unidentified_lines },
    Rule { name: "unidentified_lines_truncated", placement: Placement::Front, check: unidentified_lines_truncated },
    Rule { name: "oom_native", placement: Placement::InOrder, check: oom_native },
    Rule { name: "oom_java_heap", placement: Placement::InOrder, check: oom_java_heap },
    Rule { name: "stack_overflow", placement: Placement::InOrder, check: stack_overflow },
    Rule { name: "code_cache_full", placement: Placement::InOrder, check: code_cache_full },
    Rule { name: "debug_symbols_missing", placement: Placement::InOrder, check: debug_symbols_missing },
    Rule { name: "third_party_library", placement: Placement::InOrder, check: third_party_library },
    Rule { name: "jdk_not_latest", placement: Placement::InOrder, check: jdk_not_latest },
    Rule { name: "metaspace_lt_compressed_class_space", placement: Placement::InOrder, check: metaspace_lt_compressed_class_space },
    Rule { name: "heap_min_not_max_adaptive_disabled", placement: Placement::InOrder, check: heap_min_not_max_adaptive_disabled },
    Rule { name: "compressed_oops_disabled_small_heap", placement: Placement::InOrder, check: compressed_oops_disabled_small_heap },
    Rule { name: "heap_exceeds_container_limit", placement: Placement::InOrder, check: heap_exceeds_container_limit },
    Rule { name: "remote_debugging", placement: Placement::InOrder, check: remote_debugging },
    Rule { name: "build_provenance", placement: Placement::InOrder, check: build_provenance },
    Rule { name: "signal_handler_modified", placement: Placement::InOrder, check: signal_handler_modified },
    Rule { name: "core_dump_disabled", placement: Placement::InOrder, check: core_dump_disabled },
    Rule { name: "swap_disabled", placement: Placement::InOrder, check: swap_disabled },
    Rule { name: "thp_always", placement: Placement::InOrder, check: thp_always },
    Rule { name: "max_map_count_near_limit", placement: Placement::InOrder, check: max_map_count_near_limit },
];

/// Runs the registered rules against a finished log.
#[derive(Debug, Clone)]
pub struct DiagnosticEngine {
    releases: ReleaseTable,
}

impl Default for DiagnosticEngine {
    fn default() -> Self {
        Self::new(ReleaseTable::builtin())
    }
}

impl DiagnosticEngine {
    pub fn new(releases: ReleaseTable) -> Self {
        Self { releases }
    }

    /// Builtin release table extended with the configured releases.
    pub fn from_config(config: &HserrConfig) -> Result<Self, HserrError> {
        Ok(Self::new(ReleaseTable::with_entries(&config.releases)?))
    }

    pub fn rules(&self) -> &'static [Rule] {
        RULES
    }

    /// Findings for `log`, front findings first, one per analysis code.
    pub fn evaluate(&self, log: &FatalErrorLog) -> Vec<Finding> {
        let ctx = RuleContext {
            releases: &self.releases,
        };
        let mut front = Vec::new();
        let mut in_order = Vec::new();
        for rule in self.rules() {
            if let Some(finding) = (rule.check)(log, &ctx) {
                debug!("rule {} produced {}", rule.name, finding.analysis);
                match rule.placement {
                    Placement::Front => front.push(finding),
                    Placement::InOrder => in_order.push(finding),
                }
            }
        }

        let mut findings: Vec<Finding> = Vec::new();
        for finding in front.into_iter().chain(in_order) {
            if !findings.iter().any(|f| f.analysis == finding.analysis) {
                findings.push(finding);
            }
        }
        findings
    }

    /// Append this engine's findings to the log. Codes already present are
    /// skipped, so running twice changes nothing.
    pub fn analyze(&self, log: &mut FatalErrorLog) {
        for finding in self.evaluate(log) {
            if !log.has_finding(finding.analysis) {
                log.findings.push(finding);
            }
        }
    }
}

/// `libstdc++.so.6` → `libstdc++`, `C:\...\jvm.dll` → `jvm`.
fn library_stem(library: &str) -> String {
    let name = library.rsplit(['/', '\\']).next().unwrap_or(library).to_lowercase();
    match name.find(".so") {
        Some(i) => name[..i].to_string(),
        None => name.strip_suffix(".dll").unwrap_or(&name).to_string(),
    }
}

fn unidentified_lines(log: &FatalErrorLog, _: &RuleContext<'_>) -> Option<Finding> {
    (!log.unidentified.is_empty()).then(|| {
        Finding::with_detail(
            Analysis::WarnUnidentifiedLines,
            format!("{} unidentified line(s)", log.unidentified.len()),
        )
    })
}

fn unidentified_lines_truncated(log: &FatalErrorLog, _: &RuleContext<'_>) -> Option<Finding> {
    log.is_truncated().then(|| {
        Finding::with_detail(
            Analysis::WarnUnidentifiedLinesTruncated,
            format!(
                "kept {}, dropped {}",
                log.unidentified.len(),
                log.unidentified_dropped
            ),
        )
    })
}

fn oom_native(log: &FatalErrorLog, _: &RuleContext<'_>) -> Option<Finding> {
    let messages: Vec<&str> = log
        .header_details()
        .filter_map(|d| match d {
            HeaderDetail::OutOfMemory { message } if !message.starts_with("java.lang.") => {
                Some(message.as_str())
            }
            _ => None,
        })
        .collect();
    let detail = messages
        .iter()
        .find(|m| m.starts_with("Native memory allocation"))
        .or_else(|| messages.first())?;
    Some(Finding::with_detail(Analysis::ErrorOomNative, *detail))
}

fn oom_java_heap(log: &FatalErrorLog, _: &RuleContext<'_>) -> Option<Finding> {
    let counters: Vec<String> = log
        .exception_counts
        .iter()
        .filter(|c| c.exception.as_deref() == Some("OutOfMemoryError") && c.count > 0)
        .map(|c| format!("{}={}", c.counter.as_deref().unwrap_or("errors"), c.count))
        .collect();
    if !counters.is_empty() {
        return Some(Finding::with_detail(Analysis::ErrorOomJavaHeap, counters.join(", ")));
    }
    log.header_details().find_map(|d| match d {
        HeaderDetail::OutOfMemory { message } if message.starts_with("java.lang.OutOfMemoryError") => {
            Some(Finding::with_detail(Analysis::ErrorOomJavaHeap, message.clone()))
        }
        _ => None,
    })
}

fn stack_overflow(log: &FatalErrorLog, _: &RuleContext<'_>) -> Option<Finding> {
    let count = log.exception_total("StackOverflowErrors");
    if count > 0 {
        return Some(Finding::with_detail(
            Analysis::ErrorStackOverflow,
            format!("StackOverflowErrors={}", count),
        ));
    }
    let in_header = log
        .header
        .iter()
        .any(|h| h.raw.to_lowercase().contains("stack overflow"));
    let windows_signal = log.signal() == Some("EXCEPTION_STACK_OVERFLOW");
    (in_header || windows_signal).then(|| Finding::new(Analysis::ErrorStackOverflow))
}

/// The JIT reported it stopped compiling, or a code heap has no free space.
fn code_cache_full(log: &FatalErrorLog, _: &RuleContext<'_>) -> Option<Finding> {
    log.code_cache_details
        .iter()
        .find(|d| d.raw.contains("compilation: disabled"))
        .map(|d| d.raw.trim())
        .or_else(|| {
            log.code_cache
                .iter()
                .find(|segment| segment.is_exhausted())
                .map(|segment| segment.raw.trim())
        })
        .map(|evidence| Finding::with_detail(Analysis::ErrorCodeCacheFull, evidence))
}

fn debug_symbols_missing(log: &FatalErrorLog, _: &RuleContext<'_>) -> Option<Finding> {
    let frame = log.problematic_frame()?;
    (frame.kind.is_native_code() && !frame.has_symbol())
        .then(|| Finding::with_detail(Analysis::WarnDebugSymbolsMissing, frame.location()))
}

fn third_party_library(log: &FatalErrorLog, _: &RuleContext<'_>) -> Option<Finding> {
    let frame = log.problematic_frame()?;
    if frame.kind != FrameKind::Native {
        return None;
    }
    let library = frame.library.as_deref()?;
    let stem = library_stem(library);
    let known = JDK_NATIVE_LIBRARIES.contains(&stem.as_str())
        || OS_NATIVE_LIBRARIES.contains(&stem.as_str());
    (!known).then(|| Finding::with_detail(Analysis::InfoCrashInThirdPartyLibrary, library))
}

fn jdk_not_latest(log: &FatalErrorLog, ctx: &RuleContext<'_>) -> Option<Finding> {
    if let Some(version) = log.jdk_version() {
        let latest = ctx.releases.latest(version.major)?;
        if !version.is_older_than(&latest.version) {
            return None;
        }
        let behind = ctx.releases.releases_behind(&version);
        return Some(Finding::with_detail(
            Analysis::WarnJdkNotLatest,
            format!(
                "{} is {} known release(s) behind {} ({})",
                version, behind, latest.version, latest.date
            ),
        ));
    }

    let built = log.build_date()?;
    let newest = ctx.releases.newest_date()?;
    (built < newest).then(|| {
        Finding::with_detail(
            Analysis::WarnJdkNotLatest,
            format!("built on {}, latest known release {}", built, newest),
        )
    })
}

/// A size option from the command line, else from `[Global flags]`
/// (which prints plain bytes).
fn option_size(log: &FatalErrorLog, name: &str) -> Option<u64> {
    log.jvm_options().size(name).or_else(|| {
        log.global_flag(name)
            .filter(|f| f.origins.iter().any(|o| o == "command line"))
            .and_then(|f| f.value.as_deref())
            .and_then(units::normalize)
    })
}

fn metaspace_lt_compressed_class_space(log: &FatalErrorLog, _: &RuleContext<'_>) -> Option<Finding> {
    if log.jvm_options().flag("UseCompressedClassPointers") == Some(false) {
        return None;
    }
    let max_metaspace = option_size(log, "MaxMetaspaceSize")?;
    let class_space =
        option_size(log, "CompressedClassSpaceSize").unwrap_or(DEFAULT_COMPRESSED_CLASS_SPACE);
    (max_metaspace < class_space).then(|| {
        Finding::with_detail(
            Analysis::ErrorMetaspaceLtCompressedClassSpace,
            format!(
                "MaxMetaspaceSize={} < CompressedClassSpaceSize={}",
                format_size(max_metaspace),
                format_size(class_space)
            ),
        )
    })
}

fn heap_min_not_max_adaptive_disabled(log: &FatalErrorLog, _: &RuleContext<'_>) -> Option<Finding> {
    let options = log.jvm_options();
    if options.flag("UseAdaptiveSizePolicy") != Some(false) {
        return None;
    }
    let initial = options.initial_heap()?;
    let max = options.max_heap()?;
    (initial != max).then(|| {
        Finding::with_detail(
            Analysis::WarnHeapMinNotMaxAdaptiveDisabled,
            format!("-Xms{} -Xmx{}", format_size(initial), format_size(max)),
        )
    })
}

/// Configured max heap, else the reserved heap size the VM reported.
fn max_heap(log: &FatalErrorLog) -> Option<u64> {
    log.jvm_options()
        .max_heap()
        .or_else(|| log.heap_address.as_ref().and_then(|h| h.size_bytes))
}

fn compressed_oops_disabled_small_heap(log: &FatalErrorLog, _: &RuleContext<'_>) -> Option<Finding> {
    if log.jvm_options().flag("UseCompressedOops") != Some(false) {
        return None;
    }
    let heap = max_heap(log)?;
    (heap < COMPRESSED_OOPS_LIMIT).then(|| {
        Finding::with_detail(
            Analysis::WarnCompressedOopsDisabledSmallHeap,
            format!("max heap {}", format_size(heap)),
        )
    })
}

fn heap_exceeds_container_limit(log: &FatalErrorLog, _: &RuleContext<'_>) -> Option<Finding> {
    let limit = log.container_value("memory_limit_in_bytes")?.size_bytes()?;
    let heap = max_heap(log)?;
    (heap >= limit).then(|| {
        Finding::with_detail(
            Analysis::WarnHeapExceedsContainerLimit,
            format!("max heap {} >= container limit {}", format_size(heap), format_size(limit)),
        )
    })
}

fn remote_debugging(log: &FatalErrorLog, _: &RuleContext<'_>) -> Option<Finding> {
    log.jvm_options()
        .find_prefix(&["-agentlib:jdwp", "-Xrunjdwp", "-Xdebug"])
        .map(|option| Finding::with_detail(Analysis::WarnRemoteDebugging, option))
}

/// Exactly one provenance finding when vm_info is present.
fn build_provenance(log: &FatalErrorLog, _: &RuleContext<'_>) -> Option<Finding> {
    let info = log.vm_info.as_ref()?;
    let builder = info.builder.as_deref().unwrap_or("").to_lowercase();

    let adoptium_release = log.release_property("IMPLEMENTOR") == Some("Eclipse Adoptium");
    if builder.contains("temurin") || info.description.contains("Temurin") || adoptium_release {
        return Some(Finding::with_detail(Analysis::InfoAdoptiumBuild, builder));
    }
    if builder == "mockbuild" || builder.contains("red_hat") {
        let finding = match log.libjvm_path() {
            Some(path) if path.starts_with("/usr/lib/jvm/") => {
                Finding::with_detail(Analysis::InfoRhBuildRpm, path)
            }
            Some(path) => Finding::with_detail(Analysis::InfoRhBuildZip, path),
            None => Finding::new(Analysis::InfoRhBuildZip),
        };
        return Some(finding);
    }
    Some(Finding::new(Analysis::InfoNotRhBuild))
}

fn signal_handler_modified(log: &FatalErrorLog, _: &RuleContext<'_>) -> Option<Finding> {
    log.signal_handlers
        .iter()
        .find(|h| {
            let crash_signal = matches!(h.signal.as_deref(), Some("SIGSEGV" | "SIGBUS"));
            h.modified || (crash_signal && h.handler.is_some() && !h.is_jvm_handler())
        })
        .map(|h| {
            Finding::with_detail(
                Analysis::WarnSignalHandlerModified,
                format!(
                    "{}: {}",
                    h.signal.as_deref().unwrap_or("?"),
                    h.handler.as_deref().unwrap_or("?")
                ),
            )
        })
}

fn core_dump_disabled(log: &FatalErrorLog, _: &RuleContext<'_>) -> Option<Finding> {
    let in_header = log
        .header_details()
        .any(|d| *d == HeaderDetail::CoreDump(CoreDumpStatus::Disabled));
    let rlimit_zero = log
        .rlimit
        .as_ref()
        .and_then(|r| r.core())
        == Some(Limit::Value(0));
    (in_header || rlimit_zero).then(|| Finding::new(Analysis::InfoCoreDumpDisabled))
}

fn swap_disabled(log: &FatalErrorLog, _: &RuleContext<'_>) -> Option<Finding> {
    let swap = log
        .memory
        .as_ref()
        .and_then(|m| m.swap_bytes)
        .or_else(|| {
            log.meminfo
                .iter()
                .find(|kv| kv.key == "SwapTotal")
                .and_then(|kv| kv.size_bytes())
        })?;
    (swap == 0).then(|| Finding::new(Analysis::InfoSwapDisabled))
}

fn thp_always(log: &FatalErrorLog, _: &RuleContext<'_>) -> Option<Finding> {
    log.hugepages
        .iter()
        .find(|t| t.setting.as_deref() == Some("enabled") && t.mode.as_deref() == Some("always"))
        .map(|t| Finding::with_detail(Analysis::WarnThpAlways, t.raw.clone()))
}

fn max_map_count_near_limit(log: &FatalErrorLog, _: &RuleContext<'_>) -> Option<Finding> {
    let limit = log.max_map_count.as_ref()?.value?;
    let mapped = log.dynamic_libraries.len() as u64;
    // 90% of the limit; u128 so a kernel value near u64::MAX cannot wrap
    (limit > 0 && u128::from(mapped) * 10 >= u128::from(limit) * 9).then(|| {
        Finding::with_detail(
            Analysis::WarnMaxMapCountNearLimit,
            format!("{} of {} mappings", mapped, limit),
        )
    })
}
