use crate::state::TaskRole;
use serde::Serialize;
use std::fmt;

/// Category of a task failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The page could not be fetched
    Transport,

    /// The page could not be tied to a known key
    Correlation,

    /// A DOM field was missing or did not parse
    Extraction,

    /// The embedded JSON fragment was located but did not decode
    Decode,

    /// No embedded JSON fragment on the page
    FragmentMissing,

    /// The site reported that insights could not be loaded
    Unavailable,

    /// The crawl deadline cut the task off
    Abandoned,

    /// The worker running the task panicked or was cancelled
    Worker,
}

impl FailureKind {
    /// Hard failures mark the task failed; soft ones are only noted
    pub fn is_hard(&self) -> bool {
        !matches!(self, Self::FragmentMissing | Self::Unavailable)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Correlation => "correlation",
            Self::Extraction => "extraction",
            Self::Decode => "decode",
            Self::FragmentMissing => "fragment_missing",
            Self::Unavailable => "unavailable",
            Self::Abandoned => "abandoned",
            Self::Worker => "worker",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A problem observed while running one task
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskFailure {
    pub url: String,

    /// Key the task was about, or the key a page claimed for correlation failures
    pub key: Option<String>,

    pub role: TaskRole,
    pub kind: FailureKind,
    pub message: String,
}

impl TaskFailure {
    pub fn new(
        url: impl Into<String>,
        key: Option<String>,
        role: TaskRole,
        kind: FailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            key,
            role,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "[{}] {} ({}): {}", self.kind, self.url, key, self.message),
            None => write!(f, "[{}] {}: {}", self.kind, self.url, self.message),
        }
    }
}
