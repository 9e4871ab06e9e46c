//! Diagnostic findings: the analysis codes, their severity and message text.

use serde::{Deserialize, Serialize};

/// How much attention a finding deserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Context for whoever reads the dump
    Info,
    /// Likely contributor or misconfiguration
    Warn,
    /// Direct cause of the crash
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warn => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Analysis code. The serde name is the stable identifier used in JSON
/// output and for de-duplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Analysis {
    WarnUnidentifiedLines,
    WarnUnidentifiedLinesTruncated,
    ErrorOomNative,
    ErrorOomJavaHeap,
    ErrorStackOverflow,
    ErrorCodeCacheFull,
    WarnDebugSymbolsMissing,
    InfoCrashInThirdPartyLibrary,
    WarnJdkNotLatest,
    ErrorMetaspaceLtCompressedClassSpace,
    WarnHeapMinNotMaxAdaptiveDisabled,
    WarnCompressedOopsDisabledSmallHeap,
    WarnHeapExceedsContainerLimit,
    WarnRemoteDebugging,
    InfoRhBuildRpm,
    InfoRhBuildZip,
    InfoNotRhBuild,
    InfoAdoptiumBuild,
    WarnSignalHandlerModified,
    InfoCoreDumpDisabled,
    InfoSwapDisabled,
    WarnThpAlways,
    WarnMaxMapCountNearLimit,
}

impl Analysis {
    /// `warn_jdk_not_latest`
    pub fn key(&self) -> &'static str {
        use Analysis::*;
        match self {
            WarnUnidentifiedLines => "warn_unidentified_lines",
            WarnUnidentifiedLinesTruncated => "warn_unidentified_lines_truncated",
            ErrorOomNative => "error_oom_native",
            ErrorOomJavaHeap => "error_oom_java_heap",
            ErrorStackOverflow => "error_stack_overflow",
            ErrorCodeCacheFull => "error_code_cache_full",
            WarnDebugSymbolsMissing => "warn_debug_symbols_missing",
            InfoCrashInThirdPartyLibrary => "info_crash_in_third_party_library",
            WarnJdkNotLatest => "warn_jdk_not_latest",
            ErrorMetaspaceLtCompressedClassSpace => "error_metaspace_lt_compressed_class_space",
            WarnHeapMinNotMaxAdaptiveDisabled => "warn_heap_min_not_max_adaptive_disabled",
            WarnCompressedOopsDisabledSmallHeap => "warn_compressed_oops_disabled_small_heap",
            WarnHeapExceedsContainerLimit => "warn_heap_exceeds_container_limit",
            WarnRemoteDebugging => "warn_remote_debugging",
            InfoRhBuildRpm => "info_rh_build_rpm",
            InfoRhBuildZip => "info_rh_build_zip",
            InfoNotRhBuild => "info_not_rh_build",
            InfoAdoptiumBuild => "info_adoptium_build",
            WarnSignalHandlerModified => "warn_signal_handler_modified",
            InfoCoreDumpDisabled => "info_core_dump_disabled",
            InfoSwapDisabled => "info_swap_disabled",
            WarnThpAlways => "warn_thp_always",
            WarnMaxMapCountNearLimit => "warn_max_map_count_near_limit",
        }
    }

    pub fn severity(&self) -> Severity {
        use Analysis::*;
        match self {
            ErrorOomNative
            | ErrorOomJavaHeap
            | ErrorStackOverflow
            | ErrorCodeCacheFull
            | ErrorMetaspaceLtCompressedClassSpace => Severity::Error,

            WarnUnidentifiedLines
            | WarnUnidentifiedLinesTruncated
            | WarnDebugSymbolsMissing
            | WarnJdkNotLatest
            | WarnHeapMinNotMaxAdaptiveDisabled
            | WarnCompressedOopsDisabledSmallHeap
            | WarnHeapExceedsContainerLimit
            | WarnRemoteDebugging
            | WarnSignalHandlerModified
            | WarnThpAlways
            | WarnMaxMapCountNearLimit => Severity::Warn,

            InfoCrashInThirdPartyLibrary
            | InfoRhBuildRpm
            | InfoRhBuildZip
            | InfoNotRhBuild
            | InfoAdoptiumBuild
            | InfoCoreDumpDisabled
            | InfoSwapDisabled => Severity::Info,
        }
    }

    pub fn message(&self) -> &'static str {
        use Analysis::*;
        match self {
            WarnUnidentifiedLines => {
                "The fatal error log contains lines that were not recognized. Review them, the analysis may be incomplete."
            }
            WarnUnidentifiedLinesTruncated => {
                "Too many unrecognized lines; only the first ones were kept. The log may be corrupt or not a fatal error log."
            }
            ErrorOomNative => {
                "The JVM could not allocate native memory. Check physical memory, swap, container limits and native memory use (thread stacks, direct buffers, metaspace)."
            }
            ErrorOomJavaHeap => {
                "OutOfMemoryError was thrown before the crash. Size the heap for the workload or investigate a leak with a heap dump."
            }
            ErrorStackOverflow => {
                "A stack overflow occurred. Look for unbounded recursion, or raise the thread stack size (-Xss)."
            }
            ErrorCodeCacheFull => {
                "The code cache is full and the JIT compiler was disabled. Increase ReservedCodeCacheSize."
            }
            WarnDebugSymbolsMissing => {
                "The problematic frame has no symbol. Install debug symbols for the JDK (and any native library) to get a usable native stack."
            }
            InfoCrashInThirdPartyLibrary => {
                "The crash happened in a native library that is not part of the JDK. Start with that library's vendor."
            }
            WarnJdkNotLatest => {
                "The JDK is not the latest release of its line. Upgrade: the crash may be a known, fixed bug."
            }
            ErrorMetaspaceLtCompressedClassSpace => {
                "MaxMetaspaceSize is smaller than CompressedClassSpaceSize. Raise MaxMetaspaceSize or lower CompressedClassSpaceSize."
            }
            WarnHeapMinNotMaxAdaptiveDisabled => {
                "Initial and maximum heap differ while UseAdaptiveSizePolicy is disabled, so the heap will not resize as intended. Set -Xms equal to -Xmx."
            }
            WarnCompressedOopsDisabledSmallHeap => {
                "UseCompressedOops is disabled with a heap under 32G. This wastes memory and slows the application; remove -XX:-UseCompressedOops."
            }
            WarnHeapExceedsContainerLimit => {
                "The maximum heap is at or above the container memory limit, leaving nothing for native memory. Lower -Xmx or raise the limit."
            }
            WarnRemoteDebugging => {
                "Remote debugging is enabled. It is not recommended in production."
            }
            InfoRhBuildRpm => "Red Hat build of OpenJDK installed from RPM.",
            InfoRhBuildZip => "Red Hat build of OpenJDK installed from a zip/tar archive.",
            InfoNotRhBuild => "The JDK is not a Red Hat build of OpenJDK.",
            InfoAdoptiumBuild => "The JDK is an Eclipse Adoptium (Temurin) build.",
            WarnSignalHandlerModified => {
                "A JVM signal handler was replaced by native code. Use libjsig to chain handlers."
            }
            InfoCoreDumpDisabled => {
                "Core dumps are disabled. Enable them (ulimit -c unlimited) to capture the next crash."
            }
            InfoSwapDisabled => "Swap is disabled.",
            WarnThpAlways => {
                "Transparent huge pages are set to 'always', which can cause latency spikes and memory bloat. Use 'madvise'."
            }
            WarnMaxMapCountNearLimit => {
                "The number of memory mappings is close to vm.max_map_count. Raise the limit to avoid native allocation failures."
            }
        }
    }
}

impl std::fmt::Display for Analysis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// A diagnostic conclusion about one dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub analysis: Analysis,
    /// Dump-specific evidence (option values, frame, library)
    pub detail: Option<String>,
}

impl Finding {
    pub fn new(analysis: Analysis) -> Self {
        Self {
            analysis,
            detail: None,
        }
    }

    pub fn with_detail(analysis: Analysis, detail: impl Into<String>) -> Self {
        Self {
            analysis,
            detail: Some(detail.into()),
        }
    }

    pub fn severity(&self) -> Severity {
        self.analysis.severity()
    }

    pub fn message(&self) -> &'static str {
        self.analysis.message()
    }
}
