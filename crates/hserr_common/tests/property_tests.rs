//! Property-based tests for hserr_common.
//!
//! Invariants exercised:
//! - classify is total: any string maps to exactly one record type
//! - classify is deterministic and ignores line endings
//! - overlapping patterns resolve to the higher-priority type
//! - the unidentified bucket never grows past its capacity
//! - size normalization orders and equates sizes across suffixes
//! - a blank line always breaks a continuation
//! - kernel limits of any magnitude parse and analyze without panicking
//!
//! Randomness comes from a seeded xorshift so failures reproduce.

use hserr_common::patterns::all_matches;
use hserr_common::units::normalize;
use hserr_common::{classify, parse_str, DiagnosticEngine, RecordType};

// ============================================================================
// Deterministic generator
// ============================================================================

struct TestRng {
    state: u64,
}

impl TestRng {
    fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn next_range(&mut self, max: u64) -> u64 {
        self.next_u64() % max
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.next_range(items.len() as u64) as usize]
    }

    /// Mix of printable ASCII, dump punctuation, control bytes and non-ASCII.
    fn line(&mut self, max_len: u64) -> String {
        const ALPHABET: &[char] = &[
            'a', 'Z', '0', '9', ' ', '\t', ':', '=', '#', '[', ']', '(', ')', '{', '}', '-',
            '+', '.', ',', '/', '\\', '*', '_', 'x', '\u{0}', '\u{7f}', 'é', '→', '\u{fffd}',
        ];
        let len = self.next_range(max_len + 1);
        (0..len)
            .map(|_| ALPHABET[self.next_range(ALPHABET.len() as u64) as usize])
            .collect()
    }
}

/// Line prefixes seen in real dumps, used to steer random lines toward
/// the interesting parts of the catalog.
const PREFIXES: &[&str] = &[
    "# ", "OS:", "Host: ", "V  [libjvm.so+", "C  [", "Event: ", "SIGSEGV: ", "rlimit: ",
    "/proc/sys/", "RAX=", "jvm_args: ", "Memory: ", "CPU:", "  0x", "=>0x", "*** ",
    "heap address: ", "Heap:", " Metaspace ", "}", "{Heap before GC", "vm_info: ",
    "Release file:", "IMPLEMENTOR=\"", "Virtual Size: ",
];

// ============================================================================
// Classifier properties
// ============================================================================

mod classifier_properties {
    use super::*;

    #[test]
    fn test_prop_classify_total_and_deterministic() {
        let mut rng = TestRng::new(0x5eed_0001);
        for _ in 0..2000 {
            let line = format!("{}{}", rng.pick(PREFIXES), rng.line(60));
            let first = classify(&line);
            let second = classify(&line);
            assert_eq!(first, second, "line {:?}", line);
        }
    }

    #[test]
    fn test_prop_classify_agrees_with_catalog_order() {
        let mut rng = TestRng::new(42);
        for _ in 0..2000 {
            let line = format!("{}{}", rng.pick(PREFIXES), rng.line(40));
            let expected = if line.trim().is_empty() {
                RecordType::Blank
            } else {
                all_matches(&line)
                    .first()
                    .copied()
                    .unwrap_or(RecordType::Unknown)
            };
            assert_eq!(classify(&line), expected, "line {:?}", line);
        }
    }

    #[test]
    fn test_prop_line_endings_ignored() {
        let mut rng = TestRng::new(7);
        for _ in 0..500 {
            let line = format!("{}{}", rng.pick(PREFIXES), rng.line(30));
            if line.ends_with('\r') {
                continue;
            }
            let expected = classify(&line);
            assert_eq!(classify(&format!("{}\r\n", line)), expected);
            assert_eq!(classify(&format!("{}\n", line)), expected);
        }
    }

    #[test]
    fn test_prop_whitespace_only_is_blank() {
        let mut rng = TestRng::new(99);
        for _ in 0..200 {
            let len = rng.next_range(12);
            let line: String = (0..len)
                .map(|_| if rng.next_range(2) == 0 { ' ' } else { '\t' })
                .collect();
            assert_eq!(classify(&line), RecordType::Blank);
        }
    }

    #[test]
    fn test_prop_overlapping_lines_take_priority_type() {
        let cases = [
            ("StackOverflowErrors=3", RecordType::ExceptionCount, RecordType::EnvironmentVariable),
            ("DISTRIB_RELEASE=18.04", RecordType::Os, RecordType::EnvironmentVariable),
            ("DISTRIB_DESCRIPTION=\"Ubuntu 22.04.3 LTS\"", RecordType::Os, RecordType::ReleaseProperty),
            ("JAVA_VERSION=\"21.0.2\"", RecordType::ReleaseProperty, RecordType::EnvironmentVariable),
            ("cpu_shares: 1024", RecordType::ContainerInfo, RecordType::Meminfo),
            ("processor: 0", RecordType::CpuInfo, RecordType::Meminfo),
            (
                "RAX=0x0000000000000000, RBX=0x00007fcd3c0ed4a0",
                RecordType::Register,
                RecordType::EnvironmentVariable,
            ),
        ];
        for (line, winner, loser) in cases {
            let matches = all_matches(line);
            assert!(matches.contains(&loser), "{:?} should also match {:?}", line, loser);
            assert_eq!(matches.first(), Some(&winner), "line {:?}", line);
            assert_eq!(classify(line), winner);
        }
    }
}

// ============================================================================
// Reader properties
// ============================================================================

mod reader_properties {
    use super::*;

    #[test]
    fn test_prop_bucket_never_exceeds_capacity() {
        let mut rng = TestRng::new(0xdead_beef);
        for round in 0..50 {
            let capacity = rng.next_range(20) as usize;
            let count = rng.next_range(60) as usize;
            let text: String = (0..count)
                .map(|i| format!("unrecognized {} {}\n", round, i))
                .collect();
            let log = parse_str(&text, capacity);
            assert!(log.unidentified.len() <= capacity);
            assert_eq!(log.unidentified.len() + log.unidentified_dropped, count);
            assert_eq!(log.is_truncated(), count > capacity);
        }
    }

    #[test]
    fn test_prop_blank_line_breaks_continuation() {
        let labels = [
            "/proc/sys/kernel/threads-max (system-wide limit on the number of threads):",
            "/proc/sys/vm/max_map_count (maximum number of memory map areas a process may have):",
            "/proc/sys/kernel/pid_max (system-wide limit on number of process identifiers):",
        ];
        let mut rng = TestRng::new(3);
        for _ in 0..100 {
            let label = rng.pick(&labels);
            let value = rng.next_range(1_000_000);
            let blanks = 1 + rng.next_range(3) as usize;

            let joined = parse_str(&format!("{}\n{}\n", label, value), 10);
            assert!(joined.unidentified.is_empty());

            let broken = parse_str(&format!("{}\n{}{}\n", label, "\n".repeat(blanks), value), 10);
            assert_eq!(broken.unidentified, vec![value.to_string()]);
        }
    }

    #[test]
    fn test_prop_huge_kernel_limits_analyze() {
        let labels = [
            "/proc/sys/kernel/threads-max (system-wide limit on the number of threads):",
            "/proc/sys/vm/max_map_count (maximum number of memory map areas a process may have):",
            "/proc/sys/kernel/pid_max (system-wide limit on number of process identifiers):",
        ];
        let mapping = "7f1c2a000000-7f1c2b000000 r-xp 00000000 fd:00 1234 /usr/lib64/libz.so.1\n";
        let engine = DiagnosticEngine::default();
        let mut rng = TestRng::new(64);
        for _ in 0..200 {
            let value = match rng.next_range(4) {
                0 => u64::MAX.to_string(),
                1 => (u64::MAX - rng.next_range(1000)).to_string(),
                2 => rng.next_u64().to_string(),
                // Wider than u64: stays unparsed rather than wrapping
                _ => format!("{}{:020}", 1 + rng.next_range(9), rng.next_u64()),
            };
            let mut text = String::new();
            for label in labels {
                text.push_str(&format!("{}\n{}\n", label, value));
            }
            text.push_str(&mapping.repeat(rng.next_range(5) as usize));

            let mut log = parse_str(&text, 10);
            assert!(log.unidentified.is_empty(), "{:?}", log.unidentified);
            assert_eq!(
                log.max_map_count.as_ref().and_then(|m| m.value),
                value.parse::<u64>().ok()
            );
            engine.analyze(&mut log);
        }
    }

    #[test]
    fn test_prop_random_dump_lines_do_not_panic() {
        let mut rng = TestRng::new(11);
        for _ in 0..100 {
            let lines = rng.next_range(40);
            let text: String = (0..lines)
                .map(|_| format!("{}{}\n", rng.pick(PREFIXES), rng.line(50)))
                .collect();
            let log = parse_str(&text, 1000);
            assert!(log.unidentified.len() <= lines as usize);
        }
    }
}

// ============================================================================
// Size normalization properties
// ============================================================================

mod units_properties {
    use super::*;

    #[test]
    fn test_prop_suffixes_are_binary() {
        assert!(normalize("768m") < normalize("1G"));
        assert_eq!(normalize("1G"), normalize("1024M"));
        assert_eq!(normalize("1024k"), normalize("1m"));

        let mut rng = TestRng::new(2024);
        for _ in 0..500 {
            let n = 1 + rng.next_range(4096);
            assert_eq!(normalize(&format!("{}k", n)), Some(n * 1024));
            assert_eq!(normalize(&format!("{}K", n)), normalize(&format!("{}k", n)));
            assert_eq!(normalize(&format!("{}", n * 1024)), normalize(&format!("{}k", n)));
            assert_eq!(normalize(&format!("{}g", n)), normalize(&format!("{}m", n * 1024)));
        }
    }

    #[test]
    fn test_prop_size_order_follows_value() {
        let mut rng = TestRng::new(77);
        for _ in 0..500 {
            let a = rng.next_range(100_000);
            let b = rng.next_range(100_000);
            let left = normalize(&format!("{}m", a));
            let right = normalize(&format!("{}m", b));
            assert_eq!(left.cmp(&right), a.cmp(&b));
        }
    }
}
