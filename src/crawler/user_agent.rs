//! User agent selection
//!
//! The fixed policy sends the configured string. The randomized policy sends
//! a fresh string of 10 to 19 ASCII letters on every request.

use crate::config::{FetcherConfig, UserAgentPolicy};
use rand::Rng;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Produces the `User-Agent` header value for each request
#[derive(Debug, Clone)]
pub struct UserAgentSource {
    policy: UserAgentPolicy,
    fixed: String,
}

impl UserAgentSource {
    pub fn new(policy: UserAgentPolicy, fixed: impl Into<String>) -> Self {
        Self {
            policy,
            fixed: fixed.into(),
        }
    }

    pub fn from_config(config: &FetcherConfig) -> Self {
        Self::new(config.user_agent_policy, config.user_agent.clone())
    }

    /// User agent for the next request
    pub fn next(&self) -> String {
        match self.policy {
            UserAgentPolicy::Fixed => self.fixed.clone(),
            UserAgentPolicy::Randomized => random_user_agent(),
        }
    }
}

/// A random string of 10 to 19 ASCII letters
pub fn random_user_agent() -> String {
    let mut rng = rand::thread_rng();
    let len = rng.gen_range(10..20);
    (0..len)
        .map(|_| LETTERS[rng.gen_range(0..LETTERS.len())] as char)
        .collect()
}
