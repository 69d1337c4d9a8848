/// URL status definitions for the crawl frontier
///
/// A URL record moves through a closed set of four states. There is no
/// permanently terminal state: completed and errored records become eligible
/// again once the recrawl window elapses.
use std::fmt;

/// Represents the current crawl status of a URL record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlStatus {
    /// Known but not yet claimed by any worker
    Pending,

    /// Claimed by exactly one worker; `locked_by` and `locked_at` are set
    Processing,

    /// Last fetch and extraction succeeded
    Completed,

    /// Last attempt failed (fetch error, timeout, non-2xx, extraction failure)
    Error,
}

impl UrlStatus {
    /// Returns true while a worker owns the record
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Processing)
    }

    /// Returns true for the states that return to eligibility after the
    /// recrawl window
    pub fn is_revisitable(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// Parses a persisted status
    ///
    /// Unrecognized values (empty strings, legacy spellings, anything else)
    /// read as `Pending` so a stray value never stalls or crashes a worker.
    pub fn from_db_string(s: &str) -> Self {
        match s {
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "error" => Self::Error,
            _ => Self::Pending,
        }
    }

    /// Returns all possible statuses
    pub fn all() -> [Self; 4] {
        [Self::Pending, Self::Processing, Self::Completed, Self::Error]
    }
}

impl fmt::Display for UrlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
