//! End-to-end tests: whole dumps in, model and findings out.

use hserr_common::records::{CoreDumpStatus, FrameKind, HeaderDetail, Limit, OsVendor};
use hserr_common::{analyze_file, analyze_str, Analysis, FatalErrorLog, HserrConfig, HserrError};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

const JDK8_RHEL7: &str = include_str!("fixtures/hs_err_jdk8_rhel7.log");
const JDK17_CONTAINER: &str = include_str!("fixtures/hs_err_jdk17_container.log");
const JDK21_TEMURIN: &str = include_str!("fixtures/hs_err_jdk21_temurin.log");

fn analyze(text: &str) -> FatalErrorLog {
    analyze_str(text, &HserrConfig::default()).unwrap()
}

fn codes(log: &FatalErrorLog) -> Vec<Analysis> {
    log.findings.iter().map(|f| f.analysis).collect()
}

// ============================================================================
// Full dumps
// ============================================================================

#[test]
fn test_jdk8_dump_model() {
    let log = analyze(JDK8_RHEL7);
    assert!(log.unidentified.is_empty(), "unidentified: {:?}", log.unidentified);

    assert_eq!(log.signal(), Some("SIGSEGV"));
    let frame = log.problematic_frame().unwrap();
    assert_eq!(frame.kind, FrameKind::Native);
    assert_eq!(frame.library.as_deref(), Some("libnativebridge.so"));

    assert_eq!(log.frames.len(), 5);
    assert_eq!(log.threads.len(), 3);
    assert_eq!(log.dynamic_libraries.len(), 3);
    assert_eq!(log.signal_handlers.len(), 2);
    assert_eq!(log.environment_variable("SHELL"), Some("/bin/bash"));
    assert_eq!(log.events.len(), 2);
    assert_eq!(log.heap_regions.len(), 3);

    let os = log.os.as_ref().unwrap();
    assert_eq!(os.vendor, OsVendor::RedHat);
    assert_eq!(os.release().as_deref(), Some("7.8"));

    assert_eq!(log.rlimit.as_ref().and_then(|r| r.core()), Some(Limit::Value(0)));
    assert_eq!(
        log.memory.as_ref().and_then(|m| m.swap_bytes),
        Some(8_388_604 * 1024)
    );
    assert_eq!(log.jdk_version().map(|v| (v.major, v.update)), Some((8, 252)));
    assert!(log
        .header_details()
        .any(|d| *d == HeaderDetail::CoreDump(CoreDumpStatus::Disabled)));
    assert!(log.libjvm_path().unwrap().starts_with("/usr/lib/jvm/"));
}

#[test]
fn test_jdk8_dump_findings() {
    let log = analyze(JDK8_RHEL7);
    assert_eq!(
        codes(&log),
        vec![
            Analysis::WarnDebugSymbolsMissing,
            Analysis::InfoCrashInThirdPartyLibrary,
            Analysis::WarnJdkNotLatest,
            Analysis::ErrorMetaspaceLtCompressedClassSpace,
            Analysis::WarnRemoteDebugging,
            Analysis::InfoRhBuildRpm,
            Analysis::InfoCoreDumpDisabled,
        ]
    );
}

#[test]
fn test_jdk17_dump_model() {
    let log = analyze(JDK17_CONTAINER);
    assert!(log.unidentified.is_empty(), "unidentified: {:?}", log.unidentified);

    let os = log.os.as_ref().unwrap();
    assert_eq!(os.description, "Red Hat Enterprise Linux release 8.4 (Ootpa)");
    assert_eq!(log.threads_max.as_ref().and_then(|k| k.value), Some(30133));
    assert_eq!(log.max_map_count.as_ref().and_then(|k| k.value), Some(65530));
    assert_eq!(log.pid_max.as_ref().and_then(|k| k.value), Some(4_194_304));
    assert_eq!(log.hugepages.len(), 2);
    assert_eq!(log.hugepages[1].mode.as_deref(), Some("madvise"));
    assert_eq!(log.gc_precious.len(), 3);
    assert_eq!(
        log.container_value("memory_limit_in_bytes")
            .and_then(|kv| kv.size_bytes()),
        Some(2 * 1024 * 1024 * 1024)
    );
    assert_eq!(log.rlimit.as_ref().and_then(|r| r.core()), Some(Limit::Unlimited));
    assert_eq!(log.jdk_version().map(|v| (v.major, v.update)), Some((17, 10)));
}

#[test]
fn test_jdk17_dump_findings() {
    let log = analyze(JDK17_CONTAINER);
    assert_eq!(
        codes(&log),
        vec![
            Analysis::WarnJdkNotLatest,
            Analysis::WarnCompressedOopsDisabledSmallHeap,
            Analysis::WarnHeapExceedsContainerLimit,
            Analysis::InfoAdoptiumBuild,
            Analysis::InfoSwapDisabled,
            Analysis::WarnThpAlways,
        ]
    );
    let behind = log
        .findings
        .iter()
        .find(|f| f.analysis == Analysis::WarnJdkNotLatest)
        .and_then(|f| f.detail.clone())
        .unwrap();
    assert!(behind.contains("6 known release(s) behind"), "{}", behind);
}

#[test]
fn test_jdk21_dump_model() {
    let log = analyze(JDK21_TEMURIN);
    assert!(log.unidentified.is_empty(), "unidentified: {:?}", log.unidentified);

    let names: Vec<&str> = log.environment.iter().map(|kv| kv.key.as_str()).collect();
    assert_eq!(names, vec!["JAVA_HOME", "PATH", "LANG"]);
    assert_eq!(log.release_file.len(), 7);
    assert_eq!(log.release_property("IMPLEMENTOR"), Some("Eclipse Adoptium"));
    assert_eq!(log.release_property("JAVA_VERSION"), Some("21.0.2"));

    assert_eq!(log.process_memory.len(), 5);
    let rss = log.process_memory_stat("Resident Set Size").unwrap();
    assert_eq!(rss.bytes, Some(283_708 * 1024));
    assert_eq!(rss.peak_bytes, Some(283_708 * 1024));
    assert_eq!(log.process_memory_stat("Swapped out").and_then(|s| s.bytes), Some(0));

    let os = log.os.as_ref().unwrap();
    assert_eq!(os.vendor, OsVendor::Ubuntu);
    assert_eq!(log.code_cache.len(), 2);
    assert!(log.code_cache.iter().all(|segment| !segment.is_exhausted()));
    assert_eq!(log.hugepages[0].mode.as_deref(), Some("madvise"));
    assert_eq!(log.jdk_version().map(|v| (v.major, v.update)), Some((21, 2)));
}

#[test]
fn test_jdk21_dump_findings() {
    let log = analyze(JDK21_TEMURIN);
    assert_eq!(
        codes(&log),
        vec![Analysis::WarnJdkNotLatest, Analysis::InfoAdoptiumBuild]
    );
}

// ============================================================================
// Focused scenarios
// ============================================================================

#[test]
fn test_symbol_presence_decides_debug_symbols_finding() {
    let with_symbol = analyze(
        "#  SIGSEGV (0xb) at pc=0x00007f3b4c5a1e64, pid=1961, tid=1962\n\
         # Problematic frame:\n\
         # V  [libjvm.so+0x8a4e10]  G1ParScanThreadState::trim_queue_to_threshold(unsigned int)+0x230\n",
    );
    assert_eq!(with_symbol.signal(), Some("SIGSEGV"));
    assert!(!with_symbol.has_finding(Analysis::WarnDebugSymbolsMissing));

    let address_only = analyze(
        "#  SIGSEGV (0xb) at pc=0x00007f3b4c5a1e64, pid=1961, tid=1962\n\
         # Problematic frame:\n\
         # V  [libjvm.so+0x8a4e10]\n",
    );
    assert!(address_only.has_finding(Analysis::WarnDebugSymbolsMissing));
}

#[test]
fn test_metaspace_smaller_than_class_space() {
    let fires = analyze("jvm_args: -XX:MaxMetaspaceSize=512m -XX:CompressedClassSpaceSize=1g\n");
    assert!(fires.has_finding(Analysis::ErrorMetaspaceLtCompressedClassSpace));

    let quiet = analyze("jvm_args: -XX:MaxMetaspaceSize=1g -XX:CompressedClassSpaceSize=512m\n");
    assert!(!quiet.has_finding(Analysis::ErrorMetaspaceLtCompressedClassSpace));
}

#[test]
fn test_split_os_descriptor_concatenates() {
    let log = analyze("OS:\nRed Hat Enterprise Linux release 8.4 (Ootpa)\n");
    let os = log.os.unwrap();
    assert_eq!(os.description, "Red Hat Enterprise Linux release 8.4 (Ootpa)");
    assert_eq!(os.raw, "OS:\nRed Hat Enterprise Linux release 8.4 (Ootpa)");
    assert_eq!(os.vendor, OsVendor::RedHat);
}

#[test]
fn test_crlf_dump_matches_lf_dump() {
    let crlf = JDK8_RHEL7.replace('\n', "\r\n");
    let lf_log = analyze(JDK8_RHEL7);
    let crlf_log = analyze(&crlf);
    assert_eq!(codes(&crlf_log), codes(&lf_log));
    assert_eq!(crlf_log.frames, lf_log.frames);
    assert!(crlf_log.unidentified.is_empty());
}

#[test]
fn test_noise_appended_to_dump_goes_first() {
    let text = format!("{}this is not a dump line\n", JDK17_CONTAINER);
    let log = analyze(&text);
    assert_eq!(log.unidentified, vec!["this is not a dump line"]);
    assert_eq!(codes(&log)[0], Analysis::WarnUnidentifiedLines);
}

// ============================================================================
// Files and configuration
// ============================================================================

#[test]
fn test_analyze_file_from_disk() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(JDK17_CONTAINER.as_bytes()).unwrap();
    file.flush().unwrap();

    let log = analyze_file(file.path(), &HserrConfig::default()).unwrap();
    assert_eq!(codes(&log), codes(&analyze(JDK17_CONTAINER)));
}

#[test]
fn test_unreadable_file_reports_path() {
    let path = Path::new("/nonexistent/dir/hs_err_pid1.log");
    let err = analyze_file(path, &HserrConfig::default()).unwrap_err();
    match &err {
        HserrError::UnreadableInput { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.to_string().contains("hs_err_pid1.log"));
}

#[test]
fn test_configured_release_extends_table() {
    let config = HserrConfig::from_toml_str(
        r#"
[[releases]]
version = "17.0.99+1"
date = "2030-01-01"
"#,
    )
    .unwrap();
    let log = analyze_str(JDK17_CONTAINER, &config).unwrap();
    let detail = log
        .findings
        .iter()
        .find(|f| f.analysis == Analysis::WarnJdkNotLatest)
        .and_then(|f| f.detail.clone())
        .unwrap();
    assert!(detail.contains("17.0.99"), "{}", detail);
    assert!(detail.contains("7 known release(s) behind"), "{}", detail);
}

#[test]
fn test_invalid_configured_release_is_an_error() {
    let config = HserrConfig::from_toml_str(
        r#"
[[releases]]
version = "not-a-version"
date = "2030-01-01"
"#,
    )
    .unwrap();
    assert!(matches!(
        analyze_str(JDK8_RHEL7, &config),
        Err(HserrError::InvalidRelease(_))
    ));
}

#[test]
fn test_small_bucket_from_config() {
    let config = HserrConfig::from_toml_str("[parser]\nunidentified_capacity = 1\n").unwrap();
    let log = analyze_str("junk one\njunk two\n", &config).unwrap();
    assert_eq!(log.unidentified, vec!["junk one"]);
    assert_eq!(
        codes(&log),
        vec![Analysis::WarnUnidentifiedLines, Analysis::WarnUnidentifiedLinesTruncated]
    );
}

#[test]
fn test_model_serializes_to_json() {
    let log = analyze(JDK8_RHEL7);
    let json = serde_json::to_string(&log).unwrap();
    assert!(json.contains("\"info_rh_build_rpm\""));
    let back: FatalErrorLog = serde_json::from_str(&json).unwrap();
    assert_eq!(back.findings, log.findings);
}
