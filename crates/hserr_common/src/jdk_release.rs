//! JDK versions and the release-currency table.
//!
//! The table is hand-maintained: one list per major line, newest first.
//! Config files may add entries for releases newer than this build.

use crate::config::ReleaseEntry;
use crate::error::HserrError;
use crate::patterns::compile_field;
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

/// Known releases: (version, GA date). Newest first within each line.
const BUILTIN_RELEASES: &[(&str, &str)] = &[
    // 25
    ("25+36", "2025-09-16"),
    // 21
    ("21.0.8+9", "2025-07-15"),
    ("21.0.7+6", "2025-04-15"),
    ("21.0.6+7", "2025-01-21"),
    ("21.0.5+11", "2024-10-15"),
    ("21.0.4+7", "2024-07-16"),
    ("21.0.3+9", "2024-04-16"),
    ("21.0.2+13", "2024-01-16"),
    // 17
    ("17.0.16+8", "2025-07-15"),
    ("17.0.15+6", "2025-04-15"),
    ("17.0.14+7", "2025-01-21"),
    ("17.0.13+11", "2024-10-15"),
    ("17.0.12+7", "2024-07-16"),
    ("17.0.11+9", "2024-04-16"),
    ("17.0.10+7", "2024-01-16"),
    // 11
    ("11.0.28+6", "2025-07-15"),
    ("11.0.27+6", "2025-04-15"),
    ("11.0.26+4", "2025-01-21"),
    ("11.0.25+9", "2024-10-15"),
    ("11.0.24+8", "2024-07-16"),
    ("11.0.23+9", "2024-04-16"),
    ("11.0.22+7", "2024-01-16"),
    // 8
    ("1.8.0_462-b08", "2025-07-15"),
    ("1.8.0_452-b09", "2025-04-15"),
    ("1.8.0_442-b06", "2025-01-21"),
    ("1.8.0_432-b06", "2024-10-15"),
    ("1.8.0_422-b05", "2024-07-16"),
    ("1.8.0_412-b08", "2024-04-16"),
    ("1.8.0_402-b06", "2024-01-16"),
    ("1.8.0_392-b08", "2023-10-17"),
];

/// `1.8.0_252-b09`, `8.0_252-b09`, `1.7.0_80-b15`
static LEGACY_VERSION: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile_field(r"^(?:1\.)?([1-8])\.0(?:_(\d+))?(?:-(?:[A-Za-z]+-)?b(\d+))?")
});

/// `11.0.7+10-LTS`, `17.0.2+8`, `21+35`, `21.0.1+12-LTS-29`, `17-ea+5`
static MODERN_VERSION: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile_field(r"^(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:\.\d+)*(?:-[0-9A-Za-z.]+)?(?:\+(\d+))?")
});

static BUILTIN_TABLE: LazyLock<ReleaseTable> = LazyLock::new(|| {
    let mut table = ReleaseTable::default();
    for (version, date) in BUILTIN_RELEASES {
        match JdkRelease::parse(version, date) {
            Ok(release) => table.insert(release),
            Err(e) => tracing::error!("builtin release table entry rejected: {}", e),
        }
    }
    table
});

/// A JDK version reduced to what matters for currency checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JdkVersion {
    /// Feature release: 8, 11, 17, 21...
    pub major: u32,
    /// Update (security) number: the 252 in 8u252, the 7 in 11.0.7
    pub update: u32,
    /// Build number when the string carries one
    pub build: Option<u32>,
}

impl JdkVersion {
    pub fn new(major: u32, update: u32, build: Option<u32>) -> Self {
        Self {
            major,
            update,
            build,
        }
    }

    /// Parse a JRE version string as printed in `vm_info:` or the
    /// `# JRE version:` header. Leading whitespace is ignored; trailing
    /// vendor suffixes are tolerated.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();

        if let Some(caps) = LEGACY_VERSION.as_ref().and_then(|re| re.captures(s)) {
            let major = caps.get(1)?.as_str().parse().ok()?;
            let update = caps
                .get(2)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0);
            let build = caps.get(3).and_then(|m| m.as_str().parse().ok());
            return Some(Self::new(major, update, build));
        }

        let caps = MODERN_VERSION.as_ref()?.captures(s)?;
        let major: u32 = caps.get(1)?.as_str().parse().ok()?;
        if major < 9 {
            return None;
        }
        let update = caps
            .get(3)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        let build = caps.get(4).and_then(|m| m.as_str().parse().ok());
        Some(Self::new(major, update, build))
    }

    /// Strictly older within the same major line.
    ///
    /// Builds are only compared when both sides carry one, so a dump that
    /// printed `11.0.28` is not reported as older than `11.0.28+6`.
    pub fn is_older_than(&self, other: &JdkVersion) -> bool {
        if self.major != other.major {
            return false;
        }
        match self.update.cmp(&other.update) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Greater => false,
            std::cmp::Ordering::Equal => match (self.build, other.build) {
                (Some(mine), Some(theirs)) => mine < theirs,
                _ => false,
            },
        }
    }

    fn sort_key(&self) -> (u32, u32, u32) {
        (self.major, self.update, self.build.unwrap_or(0))
    }
}

impl fmt::Display for JdkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.major <= 8 {
            write!(f, "1.{}.0_{}", self.major, self.update)?;
            if let Some(build) = self.build {
                write!(f, "-b{:02}", build)?;
            }
        } else {
            if self.update == 0 {
                write!(f, "{}", self.major)?;
            } else {
                write!(f, "{}.0.{}", self.major, self.update)?;
            }
            if let Some(build) = self.build {
                write!(f, "+{}", build)?;
            }
        }
        Ok(())
    }
}

/// A published release and its GA date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JdkRelease {
    pub version: JdkVersion,
    pub date: NaiveDate,
}

impl JdkRelease {
    pub fn parse(version: &str, date: &str) -> Result<Self, HserrError> {
        let parsed = JdkVersion::parse(version)
            .ok_or_else(|| HserrError::InvalidRelease(format!("bad version `{}`", version)))?;
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|e| {
            HserrError::InvalidRelease(format!("bad date `{}` for {}: {}", date, version, e))
        })?;
        Ok(Self {
            version: parsed,
            date,
        })
    }
}

/// Release lists per major line, newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseTable {
    lines: BTreeMap<u32, Vec<JdkRelease>>,
}

impl ReleaseTable {
    /// The table compiled into this build.
    pub fn builtin() -> Self {
        BUILTIN_TABLE.clone()
    }

    /// Builtin table plus config entries. A config entry for a version
    /// already present replaces its date.
    pub fn with_entries(entries: &[ReleaseEntry]) -> Result<Self, HserrError> {
        let mut table = Self::builtin();
        for entry in entries {
            table.insert(JdkRelease::parse(&entry.version, &entry.date)?);
        }
        Ok(table)
    }

    pub fn insert(&mut self, release: JdkRelease) {
        let line = self.lines.entry(release.version.major).or_default();
        line.retain(|r| r.version != release.version);
        line.push(release);
        line.sort_by(|a, b| b.version.sort_key().cmp(&a.version.sort_key()));
    }

    /// Newest known release of a major line.
    pub fn latest(&self, major: u32) -> Option<&JdkRelease> {
        self.lines.get(&major).and_then(|line| line.first())
    }

    /// Most recent GA date across all lines.
    pub fn newest_date(&self) -> Option<NaiveDate> {
        self.lines
            .values()
            .filter_map(|line| line.first())
            .map(|r| r.date)
            .max()
    }

    /// How many known releases of the same line are newer than `version`.
    pub fn releases_behind(&self, version: &JdkVersion) -> usize {
        self.lines
            .get(&version.major)
            .map(|line| {
                line.iter()
                    .filter(|r| version.is_older_than(&r.version))
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.lines.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
