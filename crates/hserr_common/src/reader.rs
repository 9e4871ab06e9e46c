//! Single-pass reconstruction of a fatal error log.
//!
//! Each line is classified, built into a record and routed into the model
//! by its disposition. The last non-blank record is kept as context so a
//! continuation line can extend it and a split OS descriptor can be joined.

use crate::classifier::{classify, strip_line_ending};
use crate::config::DEFAULT_UNIDENTIFIED_CAPACITY;
use crate::error::HserrError;
use crate::fatal_error_log::FatalErrorLog;
use crate::record_type::{Disposition, MergePolicy, RecordType};
use crate::records::{build, EventSection, Record};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

/// Stateful line consumer that builds a [`FatalErrorLog`].
#[derive(Debug)]
pub struct LogReader {
    log: FatalErrorLog,
    /// Most recent non-blank record
    prior: Option<Record>,
    /// Set by the last `... events (N events):` header
    event_section: EventSection,
    /// Inside a `{Heap before GC ...` ... `}` block
    in_heap_history: bool,
    /// Directly below `Release file:`, until the first other line
    in_release_file: bool,
    lines_read: usize,
}

impl Default for LogReader {
    fn default() -> Self {
        Self::new()
    }
}

impl LogReader {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_UNIDENTIFIED_CAPACITY)
    }

    pub fn with_capacity(unidentified_capacity: usize) -> Self {
        Self {
            log: FatalErrorLog::new(unidentified_capacity),
            prior: None,
            event_section: EventSection::Unknown,
            in_heap_history: false,
            in_release_file: false,
            lines_read: 0,
        }
    }

    /// Consume one line. A trailing `\n` / `\r\n` is ignored.
    pub fn read_line(&mut self, line: &str) {
        let line = strip_line_ending(line);
        self.lines_read += 1;

        let record_type = self.in_context(classify(line));
        let mut record = build(record_type, line);

        match record_type.disposition() {
            Disposition::Blank => {
                self.prior = None;
                return;
            }
            Disposition::Singleton => {
                if !self.is_heap_history_noise(record_type) {
                    if record_type.merge_policy() == MergePolicy::Concatenate {
                        if let Some(prior) = self
                            .prior
                            .as_ref()
                            .filter(|p| p.record_type() == record_type)
                        {
                            record = prior.merge(&record);
                        }
                    }
                    self.log.store(record.clone(), false);
                }
            }
            Disposition::Repeating => {
                if !self.is_heap_history_noise(record_type) {
                    if let Record::Event(event) = &mut record {
                        event.section = self.event_section;
                    }
                    self.log.store(record.clone(), false);
                }
            }
            Disposition::Continuation => {
                match self.prior.as_ref().and_then(|p| p.combine(&record)) {
                    Some(combined) => {
                        self.log.store(combined.clone(), true);
                        record = combined;
                    }
                    None => {
                        debug!(
                            "{} line {} has no record to continue",
                            record_type, self.lines_read
                        );
                        self.log.push_unidentified(line);
                    }
                }
            }
            Disposition::Discard => self.track_section(record_type, line),
            Disposition::Unknown => self.log.push_unidentified(line),
        }

        self.prior = Some(record);
    }

    /// Adjust a context-free classification to the block the line is in.
    ///
    /// `KEY="value"` is a release property only directly below
    /// `Release file:`; anywhere else it is an environment variable. Any
    /// other line closes the release block.
    fn in_context(&mut self, record_type: RecordType) -> RecordType {
        match record_type {
            RecordType::ReleaseFileHeader => {
                self.in_release_file = true;
                record_type
            }
            RecordType::ReleaseProperty if !self.in_release_file => {
                RecordType::EnvironmentVariable
            }
            RecordType::ReleaseProperty => record_type,
            RecordType::EnvironmentVariable if self.in_release_file => {
                RecordType::ReleaseProperty
            }
            RecordType::EnvironmentVariable => record_type,
            _ => {
                self.in_release_file = false;
                record_type
            }
        }
    }

    /// Heap and metaspace lines printed by the GC heap history describe
    /// earlier collections, not the heap at crash time.
    fn is_heap_history_noise(&self, record_type: RecordType) -> bool {
        self.in_heap_history
            && matches!(
                record_type,
                RecordType::HeapRegion | RecordType::Metaspace | RecordType::ClassSpace
            )
    }

    fn track_section(&mut self, record_type: RecordType, line: &str) {
        match record_type {
            RecordType::EventsHeader => {
                self.event_section = EventSection::from_header(line);
                self.in_heap_history = false;
            }
            RecordType::HeapHistoryOpen => self.in_heap_history = true,
            RecordType::BraceClose => self.in_heap_history = false,
            RecordType::SectionSeparator => {
                self.in_heap_history = false;
                self.event_section = EventSection::Unknown;
            }
            _ => {}
        }
    }

    /// End of input: hand over the reconstructed model.
    pub fn finish(self) -> FatalErrorLog {
        info!(
            "read {} lines: {} frames, {} threads, {} libraries, {} unidentified ({} dropped)",
            self.lines_read,
            self.log.frames.len(),
            self.log.threads.len(),
            self.log.dynamic_libraries.len(),
            self.log.unidentified.len(),
            self.log.unidentified_dropped
        );
        self.log
    }
}

/// Reconstruct a log already held in memory.
pub fn parse_str(text: &str, unidentified_capacity: usize) -> FatalErrorLog {
    let mut reader = LogReader::with_capacity(unidentified_capacity);
    for line in text.lines() {
        reader.read_line(line);
    }
    reader.finish()
}

/// Reconstruct a log from any buffered source. Invalid UTF-8 is replaced,
/// never rejected.
pub fn read_log<R: BufRead>(mut source: R, unidentified_capacity: usize) -> io::Result<FatalErrorLog> {
    let mut reader = LogReader::with_capacity(unidentified_capacity);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if source.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        reader.read_line(&String::from_utf8_lossy(&buf));
    }
    Ok(reader.finish())
}

/// Reconstruct a log from a file.
pub fn parse_file(path: &Path, unidentified_capacity: usize) -> Result<FatalErrorLog, HserrError> {
    let unreadable = |source| HserrError::UnreadableInput {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(unreadable)?;
    debug!("reading {}", path.display());
    read_log(BufReader::new(file), unidentified_capacity).map_err(unreadable)
}
