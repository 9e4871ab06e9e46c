//! Read-only view over the JVM options a dump was started with.
//!
//! Options come from `jvm_args:` (or `Command Line:` when that is all the
//! dump has). The JVM applies options left to right, so for every lookup
//! the last occurrence wins.

use crate::units;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JvmOptions {
    tokens: Vec<String>,
}

impl JvmOptions {
    pub fn parse(args: &str) -> Self {
        Self {
            tokens: args.split_whitespace().map(str::to_string).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Value of `-XX:<name>=<value>`.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.tokens.iter().rev().find_map(|token| {
            token
                .strip_prefix("-XX:")?
                .strip_prefix(name)?
                .strip_prefix('=')
        })
    }

    /// Byte-normalized value of a size option such as `MaxMetaspaceSize`.
    pub fn size(&self, name: &str) -> Option<u64> {
        self.value(name).and_then(units::normalize)
    }

    /// State of a boolean `-XX:+<name>` / `-XX:-<name>` option, when given.
    pub fn flag(&self, name: &str) -> Option<bool> {
        self.tokens.iter().rev().find_map(|token| {
            let rest = token.strip_prefix("-XX:")?;
            match rest.split_at_checked(1)? {
                ("+", n) if n == name => Some(true),
                ("-", n) if n == name => Some(false),
                _ => None,
            }
        })
    }

    /// `-Xmx<size>` or `-XX:MaxHeapSize=<size>`, whichever comes last.
    pub fn max_heap(&self) -> Option<u64> {
        self.heap_size("-Xmx", "MaxHeapSize")
    }

    /// `-Xms<size>` or `-XX:InitialHeapSize=<size>`, whichever comes last.
    pub fn initial_heap(&self) -> Option<u64> {
        self.heap_size("-Xms", "InitialHeapSize")
    }

    fn heap_size(&self, short: &str, long: &str) -> Option<u64> {
        self.tokens.iter().rev().find_map(|token| {
            let value = token.strip_prefix(short).or_else(|| {
                token
                    .strip_prefix("-XX:")
                    .and_then(|rest| rest.strip_prefix(long))
                    .and_then(|rest| rest.strip_prefix('='))
            })?;
            units::normalize(value)
        })
    }

    /// First option starting with any of `prefixes`.
    pub fn find_prefix(&self, prefixes: &[&str]) -> Option<&str> {
        self.tokens
            .iter()
            .find(|token| prefixes.iter().any(|p| token.starts_with(p)))
            .map(String::as_str)
    }
}
