/// Task role and status definitions for tracking crawl progress
use serde::Serialize;
use std::fmt;

/// Which handler family a task's document is meant for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskRole {
    /// A seed listing page that enumerates keys
    Listing,

    /// The quote page of one discovered key
    Detail,

    /// An extra page enqueued by a handler for a key
    FollowUp,
}

impl TaskRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Listing => "listing",
            Self::Detail => "detail",
            Self::FollowUp => "follow_up",
        }
    }

    /// Roles whose documents belong to an already-discovered key
    pub fn is_keyed(&self) -> bool {
        matches!(self, Self::Detail | Self::FollowUp)
    }
}

impl fmt::Display for TaskRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents the current state of a task in the crawl
///
/// `Pending -> InFlight -> Done | Failed | Abandoned`. A failed attempt that
/// is retried goes back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    // ===== Active States =====
    /// Enqueued, waiting for a worker and a permit
    Pending,

    /// A worker holds it (waiting on a permit, fetching, or handling)
    InFlight,

    // ===== Terminal States =====
    /// Fetched and every matching handler ran
    Done,

    /// The fetch or a handler failed
    Failed,

    /// Cut off by the crawl deadline
    Abandoned,
}

impl TaskStatus {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Returns true while the task still counts as outstanding work
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::InFlight)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InFlight => "in_flight",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Abandoned => "abandoned",
        }
    }

    /// Whether `self -> next` is a legal transition
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::InFlight) => true,
            (Self::Pending, Self::Abandoned) => true,
            (Self::InFlight, Self::Pending) => true,
            (Self::InFlight, Self::Done | Self::Failed | Self::Abandoned) => true,
            _ => false,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
