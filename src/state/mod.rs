//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `TaskRole` / `TaskStatus`: what a crawl task is for and where it is in its lifecycle
//! - `TaskFailure`: a problem observed while running one task
//! - `DomainState`: per-domain admission state behind the rate limiter

mod domain_state;
mod failure;
mod task_state;

pub use domain_state::DomainState;
pub use failure::{FailureKind, TaskFailure};
pub use task_state::{TaskRole, TaskStatus};
