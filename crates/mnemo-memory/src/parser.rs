use anyhow::{Context, Result};
use regex::Regex;

/// Owner-tag prefix expected in memory records unless configured otherwise.
pub const DEFAULT_OWNER_PREFIX: &str = "user-";

/// One structured memory fact attributed to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMemory {
    pub owner: String,
    pub fact: String,
}

/// Public struct `MemoryParser` used across Mnemo components.
///
/// Matches records of the form `<prefix><digits>: "fact text"`, with the
/// surrounding quotes optional. The owner prefix is configuration, not a
/// hard-coded scheme.
#[derive(Debug, Clone)]
pub struct MemoryParser {
    record_pattern: Regex,
}

impl MemoryParser {
    /// Creates a parser for records tagged with `owner_prefix` followed by
    /// a numeric suffix.
    pub fn new(owner_prefix: &str) -> Result<Self> {
        let pattern = format!(r#"^({}\d+):\s*"?(.+?)"?$"#, regex::escape(owner_prefix));
        let record_pattern = Regex::new(&pattern).with_context(|| {
            format!("failed to compile memory record pattern for owner prefix {owner_prefix}")
        })?;
        Ok(Self { record_pattern })
    }

    /// Parses raw memory records into `(owner, fact)` pairs.
    ///
    /// Records that do not match the owner-tag grammar are skipped without
    /// error, so the output may be shorter than the input. Input order is
    /// preserved among the records that survive.
    pub fn parse_memories(&self, raw_records: &[String]) -> Vec<ParsedMemory> {
        let mut parsed = Vec::with_capacity(raw_records.len());
        for record in raw_records {
            let Some(captures) = self.record_pattern.captures(record.trim()) else {
                continue;
            };
            parsed.push(ParsedMemory {
                owner: captures[1].to_string(),
                fact: captures[2].to_string(),
            });
        }

        let dropped = raw_records.len().saturating_sub(parsed.len());
        if dropped > 0 {
            tracing::debug!(
                dropped,
                parsed = parsed.len(),
                "skipped memory records outside the owner-tag grammar"
            );
        }
        parsed
    }
}
