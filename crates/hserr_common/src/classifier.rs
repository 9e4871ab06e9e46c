//! Line classifier.
//!
//! `classify` is a pure function of one line: same input, same type, every
//! time. It is total: every string, including the empty string and binary
//! garbage, maps to exactly one `RecordType`.

use crate::patterns;
use crate::record_type::RecordType;

/// Assign a record type to one line of a fatal error log.
///
/// A trailing carriage return is ignored so CRLF dumps classify the same
/// as LF dumps. Empty and whitespace-only lines are `Blank`; lines no rule
/// accepts are `Unknown`.
pub fn classify(line: &str) -> RecordType {
    let line = strip_line_ending(line);
    if line.trim().is_empty() {
        return RecordType::Blank;
    }
    patterns::first_match(line).unwrap_or(RecordType::Unknown)
}

/// Drop a trailing `\n`, `\r\n` or `\r`.
pub(crate) fn strip_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_type(line: &str, expected: RecordType) {
        assert_eq!(classify(line), expected, "line: {:?}", line);
    }

    #[test]
    fn test_blank_and_unknown() {
        assert_type("", RecordType::Blank);
        assert_type("   \t ", RecordType::Blank);
        assert_type("\r", RecordType::Blank);
        assert_type("this is not part of any dump", RecordType::Unknown);
        assert_type("\u{0}\u{1}\u{fffd}", RecordType::Unknown);
    }

    #[test]
    fn test_header_block() {
        assert_type("#", RecordType::Header);
        assert_type(
            "#  SIGSEGV (0xb) at pc=0x00007fcd2af94e64, pid=1961, tid=0x00007fcd2c6f1700",
            RecordType::Header,
        );
        assert_type("# C  [libcairo.so.2+0x66e64]  cairo_region_num_rectangles+0x4", RecordType::Header);
        assert_type("---------------  T H R E A D  ---------------", RecordType::SectionSeparator);
        assert_type("---------------  S U M M A R Y ------------", RecordType::SectionSeparator);
    }

    #[test]
    fn test_thread_section() {
        assert_type(
            "Current thread (0x00007fcd3c5a1800):  JavaThread \"AWT-EventQueue-0\" daemon [_thread_in_native, id=1987, stack(0x00007fcd2c5f2000,0x00007fcd2c6f2000)]",
            RecordType::CurrentThread,
        );
        assert_type(
            "siginfo: si_signo: 11 (SIGSEGV), si_code: 1 (SEGV_MAPERR), si_addr: 0x0000000000000000",
            RecordType::SigInfo,
        );
        assert_type(
            "RAX=0x0000000000000000, RBX=0x00007fcd3c0ed4a0, RCX=0x0000000000000001, RDX=0x00007fcd2c6f0018",
            RecordType::Register,
        );
        assert_type("R8 =0x0000000000000001, R9 =0x00007f3ef4a29e50", RecordType::Register);
        assert_type("RAX=0x0000000000000000 is an unknown value", RecordType::RegisterMapping);
        assert_type("stack at sp + 0 slots: 0x0 is NULL", RecordType::StackSlotMapping);
        assert_type("Top of Stack: (sp=0x00007fcd2c6eff00)", RecordType::TopOfStack);
        assert_type(
            "0x00007fcd2c6eff00:   00007fcd2c6eff30 00007fcd2af94ec8",
            RecordType::HexDump,
        );
        assert_type(
            "Stack: [0x00007fcd2c5f2000,0x00007fcd2c6f2000],  sp=0x00007fcd2c6eff00,  free space=1015k",
            RecordType::StackBounds,
        );
        assert_type(
            "Native frames: (J=compiled Java code, j=interpreted, Vv=VM code, C=native code)",
            RecordType::FramesHeader,
        );
        assert_type("C  [libcairo.so.2+0x66e64]  cairo_region_num_rectangles+0x4", RecordType::Frame);
        assert_type(
            "J 1234 C2 java.lang.String.hashCode()I (55 bytes) @ 0x00007f0a1d2e3f40 [0x00007f0a1d2e3e00+0x140]",
            RecordType::Frame,
        );
        assert_type("v  ~StubRoutines::call_stub", RecordType::Frame);
        assert_type("C2:   1234   4       java.lang.String::hashCode (55 bytes)", RecordType::CompileTask);
    }

    #[test]
    fn test_process_section() {
        assert_type(
            "  0x00007fcd3c0e1000 JavaThread \"Service Thread\" daemon [_thread_blocked, id=1975, stack(0x00007fcd2d9fa000,0x00007fcd2dafb000)]",
            RecordType::Thread,
        );
        assert_type(
            "=>0x00007fcd3c5a1800 JavaThread \"AWT-EventQueue-0\" daemon [_thread_in_native, id=1987, stack(0x00007fcd2c5f2000,0x00007fcd2c6f2000)]",
            RecordType::Thread,
        );
        assert_type("VM state:not at safepoint (normal execution)", RecordType::VmState);
        assert_type(
            "heap address: 0x00000006c0000000, size: 4096 MB, Compressed Oops mode: Zero based, Oop shift amount: 3",
            RecordType::HeapAddress,
        );
        assert_type(
            " PSYoungGen      total 305664K, used 123456K [0x000000076ab00000, 0x0000000780000000, 0x00000007c0000000)",
            RecordType::HeapRegion,
        );
        assert_type(
            " Metaspace       used 20000K, capacity 20500K, committed 20736K, reserved 1067008K",
            RecordType::Metaspace,
        );
        assert_type(
            "  class space    used 2500K, capacity 2700K, committed 2816K, reserved 1048576K",
            RecordType::ClassSpace,
        );
        assert_type(
            "CodeCache: size=245760Kb used=12345Kb max_used=12345Kb free=233415Kb",
            RecordType::CodeCache,
        );
        assert_type(" compilation: disabled (not enough contiguous free space left)", RecordType::CodeCacheDetail);
        assert_type("Compilation events (10 events):", RecordType::EventsHeader);
        assert_type("GC Heap History (10 events):", RecordType::EventsHeader);
        assert_type("Event: 1.234 Thread 0x00007fcd3c0e1000 nmethod 1234 0x00007f", RecordType::Event);
        assert_type("{Heap before GC invocations=1 (full 0):", RecordType::HeapHistoryOpen);
        assert_type("}", RecordType::BraceClose);
        assert_type(
            "00400000-00401000 r-xp 00000000 fd:00 123456                             /usr/lib/jvm/java-1.8.0-openjdk/jre/bin/java",
            RecordType::DynamicLibrary,
        );
        assert_type(
            "0x00007ff6c5c20000 - 0x00007ff6c5c67000 \tC:\\Program Files\\Java\\jdk-17\\bin\\java.exe",
            RecordType::DynamicLibrary,
        );
        assert_type("jvm_args: -Xms1g -Xmx4g", RecordType::JvmArgs);
        assert_type(
            "     intx CICompilerCount                          = 3                                         {product} {ergonomic}",
            RecordType::GlobalFlag,
        );
        assert_type("JAVA_HOME=/usr/lib/jvm/jre", RecordType::EnvironmentVariable);
        assert_type(
            "SIGSEGV: [libjvm.so+0x9a1b20], sa_mask[0]=11111111011111111101111111111110, sa_flags=SA_RESTART|SA_SIGINFO",
            RecordType::SignalHandler,
        );
        assert_type("  *** Handler was modified!", RecordType::HandlerNote);
        assert_type("OutOfMemoryError java_heap_errors=1", RecordType::ExceptionCount);
        assert_type("StackOverflowErrors=3", RecordType::ExceptionCount);
    }

    #[test]
    fn test_system_section() {
        assert_type("OS:Red Hat Enterprise Linux Server release 7.8 (Maipo)", RecordType::Os);
        assert_type("OS:", RecordType::Os);
        assert_type("Red Hat Enterprise Linux release 8.4 (Ootpa)", RecordType::Os);
        assert_type("uname:Linux 3.10.0-1127.el7.x86_64 #1 SMP Tue Feb 18 16:39:12 EST 2020 x86_64", RecordType::Uname);
        assert_type("libc:glibc 2.17 NPTL 2.17 ", RecordType::Libc);
        assert_type("rlimit: STACK 8192k, CORE 0k, NPROC 4096, NOFILE 4096, AS infinity", RecordType::Rlimit);
        assert_type("load average:0.50 0.60 0.70", RecordType::LoadAverage);
        assert_type("MemTotal:       16266508 kB", RecordType::Meminfo);
        assert_type("container_type: cgroupv1", RecordType::ContainerInfo);
        assert_type("CPU:total 4 (initial active 4) (2 cores per cpu, 1 threads per core)", RecordType::Cpu);
        assert_type("processor\t: 0", RecordType::CpuInfo);
        assert_type(
            "Memory: 4k page, physical 16266508k(1234567k free), swap 8388604k(8388604k free)",
            RecordType::Memory,
        );
        assert_type(
            "vm_info: OpenJDK 64-Bit Server VM (25.252-b09) for linux-amd64 JRE (1.8.0_252-b09), built on Apr 14 2020 14:59:33 by \"mockbuild\" with gcc 4.8.5 20150623 (Red Hat 4.8.5-39)",
            RecordType::VmInfo,
        );
        assert_type(
            "/proc/sys/kernel/threads-max (system-wide limit on the number of threads):",
            RecordType::ThreadsMax,
        );
        assert_type("/sys/kernel/mm/transparent_hugepage/enabled:", RecordType::TransparentHugepage);
        assert_type("KVM virtualization detected", RecordType::Virtualization);
        assert_type(" Heap Max Capacity: 4G", RecordType::GcPrecious);
        assert_type("elapsed time: 123456 seconds (1d 10h 17m 36s)", RecordType::ElapsedTime);
        assert_type("Release file:", RecordType::ReleaseFileHeader);
        assert_type("Process Memory:", RecordType::ProcessMemoryHeader);
        assert_type("Virtual Size: 5187192K (peak: 5187192K)", RecordType::ProcessMemory);
        assert_type(
            "Resident Set Size: 283708K (peak: 283708K) (anon: 262148K, file: 21560K, shmem: 0K)",
            RecordType::ProcessMemory,
        );
        assert_type("C-Heap outstanding allocations: 72351K, retained: 5380K", RecordType::ProcessMemory);
        assert_type("glibc malloc tunables: (default)", RecordType::ProcessMemory);
        assert_type("END.", RecordType::End);
    }

    #[test]
    fn test_continuation_lines() {
        assert_type("255813", RecordType::Number);
        assert_type("  65530 ", RecordType::Number);
        assert_type("[always] madvise never", RecordType::ModeChoice);
        assert_type("always defer defer+madvise [madvise] never", RecordType::ModeChoice);
    }

    #[test]
    fn test_specific_rules_beat_generic_ones() {
        // Register dump vs KEY=value environment variable
        assert_type("RAX=0x0000000000000000, RBX=0x0000000000000001", RecordType::Register);
        // Register mapping vs environment variable
        assert_type("RBX=0x00007fcd3c0ed4a0 points into unknown readable memory", RecordType::RegisterMapping);
        // lsb-release content vs environment variable
        assert_type("DISTRIB_ID=Ubuntu", RecordType::Os);
        assert_type("DISTRIB_DESCRIPTION=\"Ubuntu 22.04.3 LTS\"", RecordType::Os);
        // Quoted release property vs environment variable
        assert_type("IMPLEMENTOR=\"Eclipse Adoptium\"", RecordType::ReleaseProperty);
        assert_type("JAVA_HOME=/usr/lib/jvm/jre", RecordType::EnvironmentVariable);
        // Process memory size vs /proc/meminfo key
        assert_type("Swapped out: 0K", RecordType::ProcessMemory);
        // Container key vs /proc/meminfo key
        assert_type("active_processor_count: 4", RecordType::ContainerInfo);
        // Structured lines vs bare numbers
        assert_type("MemTotal:       16266508 kB", RecordType::Meminfo);
        assert_type("  eden space 262144K, 40% used [0x000000076ab00000,0x0000000771b00000,0x000000077ab00000)", RecordType::HeapRegion);
        // Header frame vs stack frame
        assert_type("# C  [libc.so.6+0x15b7d5]", RecordType::Header);
        // Metaspace summary vs metaspace report
        assert_type(" Metaspace       used 1K, committed 2K, reserved 3K", RecordType::Metaspace);
    }

    #[test]
    fn test_crlf_is_ignored() {
        assert_eq!(classify("END.\r"), RecordType::End);
        assert_eq!(classify("255813\r\n"), RecordType::Number);
    }

    #[test]
    fn test_deterministic() {
        let line = "Event: 0.511 Loaded shared library /usr/lib/jvm/jre/lib/amd64/libzip.so";
        let first = classify(line);
        for _ in 0..100 {
            assert_eq!(classify(line), first);
        }
    }
}
