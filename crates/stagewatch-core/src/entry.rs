//! Log entry types and level resolution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tokens that mark a line as an error, checked first.
const ERROR_TOKENS: &[&str] = &["error", "failed", "fatal", "exception"];

/// Tokens that mark a line as a warning.
const WARN_TOKENS: &[&str] = &["warn", "warning", "deprecated"];

/// Tokens that mark a line as debug output.
const DEBUG_TOKENS: &[&str] = &["debug"];

/// Severity of a log line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Debug,
}

impl LogLevel {
    /// Get the level name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Debug => "debug",
        }
    }

    /// Infer a level from free text.
    ///
    /// Matching is a case-insensitive substring search in strict priority
    /// order: error tokens, then warning tokens, then debug, else info.
    pub fn infer(content: &str) -> LogLevel {
        let lower = content.to_lowercase();
        let contains_any = |tokens: &[&str]| tokens.iter().any(|t| lower.contains(t));

        if contains_any(ERROR_TOKENS) {
            LogLevel::Error
        } else if contains_any(WARN_TOKENS) {
            LogLevel::Warn
        } else if contains_any(DEBUG_TOKENS) {
            LogLevel::Debug
        } else {
            LogLevel::Info
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Level selector used when filtering a buffer.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LevelFilter {
    /// Matches every entry.
    #[default]
    All,
    /// Matches entries whose resolved level equals the given one.
    Only(LogLevel),
}

impl LevelFilter {
    /// Whether `level` passes this filter.
    pub fn accepts(&self, level: LogLevel) -> bool {
        match self {
            LevelFilter::All => true,
            LevelFilter::Only(wanted) => *wanted == level,
        }
    }
}

impl std::str::FromStr for LevelFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" | "" => Ok(LevelFilter::All),
            "info" => Ok(LevelFilter::Only(LogLevel::Info)),
            "warn" | "warning" => Ok(LevelFilter::Only(LogLevel::Warn)),
            "error" => Ok(LevelFilter::Only(LogLevel::Error)),
            "debug" => Ok(LevelFilter::Only(LogLevel::Debug)),
            other => Err(format!("unknown level filter: {other}")),
        }
    }
}

/// A record as delivered by the log transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransportRecord {
    /// Raw line text.
    pub output: String,

    /// RFC3339 timestamp, if the producer supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl TransportRecord {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }
}

/// A single received log line.
///
/// `id` is the arrival sequence number assigned by the buffer; ordering is
/// by arrival, never by timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEntry {
    /// Arrival sequence number.
    pub id: u64,

    /// Line text.
    pub content: String,

    /// Producer timestamp (may be missing or out of order).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Explicit level, if the producer supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<LogLevel>,

    /// Optional origin label (container, step, file).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl LogEntry {
    /// Create an entry with no timestamp, level or source.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: 0,
            content: content.into(),
            timestamp: None,
            level: None,
            source: None,
        }
    }

    /// Build an entry from a transport record.
    ///
    /// A timestamp that does not parse as RFC3339 is dropped.
    pub fn from_record(record: TransportRecord) -> Self {
        let timestamp = record
            .timestamp
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok())
            .map(|ts| ts.with_timezone(&Utc));

        Self {
            timestamp,
            ..Self::new(record.output)
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Explicit level if set, otherwise inferred from content.
    pub fn resolved_level(&self) -> LogLevel {
        self.level.unwrap_or_else(|| LogLevel::infer(&self.content))
    }
}

impl From<TransportRecord> for LogEntry {
    fn from(record: TransportRecord) -> Self {
        LogEntry::from_record(record)
    }
}
