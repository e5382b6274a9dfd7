use crate::config::RunConfiguration;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Calendar-style timestamp format. Sorts lexicographically in chronological
/// order and never emits the `_` separator or characters unsafe in file names.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.9f";

const SEPARATOR: char = '_';

/// Unique name tying a configuration to its artifact directory.
///
/// Format: `{abilities}_{time|no_time}_{timestamp}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunIdentifier(String);

impl RunIdentifier {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The trailing timestamp component.
    ///
    /// The mode tag itself may contain the separator (`no_time`), so the
    /// timestamp is split off from the right.
    #[must_use]
    pub fn timestamp_component(&self) -> &str {
        self.0.rsplit_once(SEPARATOR).map_or(self.0.as_str(), |(_, ts)| ts)
    }
}

impl std::fmt::Display for RunIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[must_use]
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

#[must_use]
pub fn mode_tag(time_mode: bool) -> &'static str {
    if time_mode { "time" } else { "no_time" }
}

/// Derive the run identifier for `config`. Pure in `config.created_at()`.
#[must_use]
pub fn name(config: &RunConfiguration) -> RunIdentifier {
    RunIdentifier(format!(
        "{}{SEPARATOR}{}{SEPARATOR}{}",
        config.abilities(),
        mode_tag(config.time_mode()),
        format_timestamp(config.created_at())
    ))
}
