//! Object key classification
//!
//! Extracts the hourly partition key from S3 object keys written by
//! Firehose (`{table}/YYYY/MM/DD/HH/...`) or by the alert writer
//! (`alerts/dt=YYYY-MM-DD-HH/....json`).

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fmt;

/// Both patterns must start at a path segment boundary.
static DATED_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|/)(?P<year>\d{4})/(?P<month>\d{2})/(?P<day>\d{2})/(?P<hour>\d{2})/.+")
        .expect("dated path pattern is valid")
});

static ALERTS_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:^|/)alerts/dt=(?P<year>\d{4})-(?P<month>\d{2})-(?P<day>\d{2})-(?P<hour>\d{2})/.*\.json$",
    )
    .expect("alerts path pattern is valid")
});

/// Recognized key layouts, in match priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPattern {
    /// `YYYY/MM/DD/HH/...` as written by Firehose delivery streams
    DatedPath,
    /// `alerts/dt=YYYY-MM-DD-HH/*.json`
    Alerts,
}

impl KeyPattern {
    const PRIORITY: [KeyPattern; 2] = [KeyPattern::DatedPath, KeyPattern::Alerts];

    fn regex(self) -> &'static Regex {
        match self {
            KeyPattern::DatedPath => &DATED_PATH,
            KeyPattern::Alerts => &ALERTS_PATH,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyPattern::DatedPath => "dated_path",
            KeyPattern::Alerts => "alerts",
        }
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hourly partition key, each field kept exactly as the zero-padded digits
/// found in the object key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionKey {
    pub year: String,
    pub month: String,
    pub day: String,
    pub hour: String,
    pub pattern: KeyPattern,
}

impl PartitionKey {
    fn from_captures(captures: &Captures<'_>, pattern: KeyPattern) -> Self {
        let field = |name: &str| {
            captures
                .name(name)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        };
        Self {
            year: field("year"),
            month: field("month"),
            day: field("day"),
            hour: field("hour"),
            pattern,
        }
    }

    /// `YYYY-MM-DD-HH`
    pub fn dt(&self) -> String {
        format!("{}-{}-{}-{}", self.year, self.month, self.day, self.hour)
    }

    /// Partition predicate used in `ADD PARTITION`, e.g. `(dt = '2018-08-01-01')`
    pub fn expression(&self) -> String {
        format!("(dt = '{}')", self.dt())
    }
}

/// Match `key` against the known layouts; the first matching pattern wins.
pub fn match_key(key: &str) -> Option<PartitionKey> {
    for pattern in KeyPattern::PRIORITY {
        if let Some(captures) = pattern.regex().captures(key) {
            return Some(PartitionKey::from_captures(&captures, pattern));
        }
    }
    None
}
