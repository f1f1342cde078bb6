use crate::state::{TaskRole, TaskStatus};
use crate::url::extract_domain;
use url::Url;

/// Identifier of a task within one crawl
pub type TaskId = u64;

/// One page to fetch and the key it is expected to belong to
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlTask {
    pub id: TaskId,
    pub url: Url,

    /// Key discovered for this page; `None` for listing pages
    pub key: Option<String>,

    pub role: TaskRole,
    pub status: TaskStatus,

    /// Fetch attempts made so far
    pub attempts: u32,
}

impl CrawlTask {
    fn new(id: TaskId, url: Url, key: Option<String>, role: TaskRole) -> Self {
        Self {
            id,
            url,
            key,
            role,
            status: TaskStatus::Pending,
            attempts: 0,
        }
    }

    pub fn listing(id: TaskId, url: Url) -> Self {
        Self::new(id, url, None, TaskRole::Listing)
    }

    pub fn detail(id: TaskId, url: Url, key: impl Into<String>) -> Self {
        Self::new(id, url, Some(key.into()), TaskRole::Detail)
    }

    pub fn follow_up(id: TaskId, url: Url, key: impl Into<String>) -> Self {
        Self::new(id, url, Some(key.into()), TaskRole::FollowUp)
    }

    /// Domain used for rate limiting; empty for host-less URLs
    pub fn domain(&self) -> String {
        extract_domain(&self.url).unwrap_or_default()
    }

    /// Moves to `next` if the transition is legal; returns whether it did
    pub fn transition(&mut self, next: TaskStatus) -> bool {
        if self.status.can_transition_to(next) {
            self.status = next;
            true
        } else {
            false
        }
    }
}

/// A task a handler wants enqueued, before it has an id
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSpec {
    pub url: Url,
    pub key: String,
    pub role: TaskRole,
}

impl TaskSpec {
    pub fn detail(url: Url, key: impl Into<String>) -> Self {
        Self {
            url,
            key: key.into(),
            role: TaskRole::Detail,
        }
    }

    pub fn follow_up(url: Url, key: impl Into<String>) -> Self {
        Self {
            url,
            key: key.into(),
            role: TaskRole::FollowUp,
        }
    }

    pub fn into_task(self, id: TaskId) -> CrawlTask {
        CrawlTask::new(id, self.url, Some(self.key), self.role)
    }
}
