//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that:
//! - Issues the seed listing fetches
//! - Fans out one detail task per discovered key
//! - Runs tasks on a bounded worker pool behind the rate limiter
//! - Tracks outstanding work until the crawl is quiescent
//! - Builds the final report

use crate::config::{Config, CrawlerConfig, FanOutPolicy};
use crate::crawler::fetcher::{FetchError, FetchRequest, PageFetcher};
use crate::crawler::limiter::RateLimiter;
use crate::crawler::task::{CrawlTask, TaskId, TaskSpec};
use crate::crawler::user_agent::UserAgentSource;
use crate::site::{HandlerContext, SiteProfile};
use crate::state::{FailureKind, TaskFailure, TaskRole, TaskStatus};
use crate::store::{KeyedRecordStore, Record};
use crate::CrawlError;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use url::Url;

/// Where the crawl is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlPhase {
    /// Not started
    Idle,

    /// Seed listing fetches issued
    Discovering,

    /// Detail tasks are being released to the pool
    FanningOut,

    /// Everything left is already in flight
    Draining,

    /// Nothing pending or in flight; the snapshot is final
    Quiescent,
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Discovering => "discovering",
            Self::FanningOut => "fanning_out",
            Self::Draining => "draining",
            Self::Quiescent => "quiescent",
        };
        f.write_str(s)
    }
}

/// Outstanding-work counter
///
/// Incremented when a task is enqueued and decremented when it reaches a
/// terminal state. Follow-up tasks are counted before their parent is
/// decremented, so the counter only reaches zero at quiescence.
#[derive(Debug, Default, Clone)]
pub struct WorkCounter(Arc<AtomicUsize>);

impl WorkCounter {
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn decrement(&self) {
        let previous = self.0.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(previous > 0, "work counter underflow");
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Terminal task counts for one role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoleCounts {
    pub done: usize,
    pub failed: usize,
    pub abandoned: usize,
}

impl RoleCounts {
    pub fn total(&self) -> usize {
        self.done + self.failed + self.abandoned
    }
}

/// Terminal task counts per role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskCounts {
    pub listing: RoleCounts,
    pub detail: RoleCounts,
    pub follow_up: RoleCounts,
}

impl TaskCounts {
    fn record(&mut self, role: TaskRole, status: TaskStatus) {
        let counts = match role {
            TaskRole::Listing => &mut self.listing,
            TaskRole::Detail => &mut self.detail,
            TaskRole::FollowUp => &mut self.follow_up,
        };
        match status {
            TaskStatus::Done => counts.done += 1,
            TaskStatus::Failed => counts.failed += 1,
            TaskStatus::Abandoned => counts.abandoned += 1,
            TaskStatus::Pending | TaskStatus::InFlight => {}
        }
    }

    pub fn total(&self) -> usize {
        self.listing.total() + self.detail.total() + self.follow_up.total()
    }
}

/// Result of a finished crawl
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Every record, sorted by key
    pub records: Vec<Record>,

    /// Every task failure, including correlation failures that belong to no record
    pub failures: Vec<TaskFailure>,

    /// Phases entered, in order
    pub phases: Vec<CrawlPhase>,

    pub tasks: TaskCounts,

    /// Outstanding-work counter when the crawl ended
    pub outstanding: usize,

    pub elapsed: Duration,

    /// True when the crawl deadline forced quiescence
    pub deadline_hit: bool,
}

impl CrawlReport {
    pub fn record(&self, key: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.ticker == key)
    }

    pub fn failures_of(&self, kind: FailureKind) -> impl Iterator<Item = &TaskFailure> {
        self.failures.iter().filter(move |f| f.kind == kind)
    }
}

/// Scheduling knobs taken from `[crawler]`
#[derive(Debug, Clone)]
struct CrawlSettings {
    pool_size: usize,
    fan_out: FanOutPolicy,
    max_retries: u32,
    retry_delay: Duration,
    deadline: Option<Duration>,
}

impl From<&CrawlerConfig> for CrawlSettings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            pool_size: (config.max_concurrent_fetches as usize).max(1),
            fan_out: config.fan_out,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
            deadline: config.crawl_deadline(),
        }
    }
}

/// Everything a worker needs, shared with the coordinator
struct WorkerContext<F> {
    fetcher: Arc<F>,
    limiter: Arc<RateLimiter>,
    store: Arc<KeyedRecordStore>,
    profile: Arc<SiteProfile>,
    user_agents: Arc<UserAgentSource>,
    max_retries: u32,
    retry_delay: Duration,
}

impl<F> Clone for WorkerContext<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            limiter: Arc::clone(&self.limiter),
            store: Arc::clone(&self.store),
            profile: Arc::clone(&self.profile),
            user_agents: Arc::clone(&self.user_agents),
            max_retries: self.max_retries,
            retry_delay: self.retry_delay,
        }
    }
}

/// What a worker hands back to the coordinator
#[derive(Debug)]
struct TaskOutcome {
    task: CrawlTask,
    follow_ups: Vec<TaskSpec>,
    failures: Vec<TaskFailure>,
    fetch_error: Option<FetchError>,
}

/// Main crawler coordinator structure
pub struct Coordinator<F: PageFetcher> {
    worker: WorkerContext<F>,
    settings: CrawlSettings,
    outstanding: WorkCounter,
    phases: Vec<CrawlPhase>,
}

impl<F: PageFetcher> Coordinator<F> {
    /// Creates a coordinator using the earnings site profile
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `fetcher` - Fetcher every task goes through
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(CrawlError)` - The site profile could not be built
    pub fn new(config: &Config, fetcher: F) -> Result<Self, CrawlError> {
        let profile = SiteProfile::earnings(config)?;
        Ok(Self::with_profile(config, fetcher, profile))
    }

    /// Creates a coordinator with an explicit set of handlers
    pub fn with_profile(config: &Config, fetcher: F, profile: SiteProfile) -> Self {
        let settings = CrawlSettings::from(&config.crawler);

        Self {
            worker: WorkerContext {
                fetcher: Arc::new(fetcher),
                limiter: Arc::new(RateLimiter::from_config(&config.crawler)),
                store: Arc::new(KeyedRecordStore::new()),
                profile: Arc::new(profile),
                user_agents: Arc::new(UserAgentSource::from_config(&config.fetcher)),
                max_retries: settings.max_retries,
                retry_delay: settings.retry_delay,
            },
            settings,
            outstanding: WorkCounter::default(),
            phases: vec![CrawlPhase::Idle],
        }
    }

    pub fn store(&self) -> Arc<KeyedRecordStore> {
        Arc::clone(&self.worker.store)
    }

    pub fn limiter(&self) -> Arc<RateLimiter> {
        Arc::clone(&self.worker.limiter)
    }

    /// Handle to the live outstanding-work counter
    pub fn work_counter(&self) -> WorkCounter {
        self.outstanding.clone()
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phases.last().copied().unwrap_or(CrawlPhase::Idle)
    }

    fn enter(&mut self, phase: CrawlPhase) {
        let current = self.phase();
        if phase > current {
            info!("Crawl phase: {} -> {}", current, phase);
            self.phases.push(phase);
        }
    }

    /// Runs the crawl to quiescence
    ///
    /// # Arguments
    ///
    /// * `seeds` - Listing URLs; duplicates are fetched once
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - Quiescent snapshot, possibly with partial records
    /// * `Err(CrawlError::NoSeeds)` - Nothing to crawl
    /// * `Err(CrawlError::SeedUnreachable)` - Every listing fetch failed
    pub async fn run(&mut self, seeds: Vec<Url>) -> Result<CrawlReport, CrawlError> {
        if seeds.is_empty() {
            return Err(CrawlError::NoSeeds);
        }

        let started = Instant::now();
        let deadline = self.settings.deadline.map(|d| started + d);
        self.enter(CrawlPhase::Discovering);

        let mut loop_state = LoopState::default();
        for url in seeds {
            if loop_state.seen.insert(url.to_string()) {
                let task = CrawlTask::listing(loop_state.next_id(), url);
                loop_state.listing_outstanding += 1;
                self.outstanding.increment();
                loop_state.pending.push_back(task);
            }
        }
        info!("Seeded {} listing page(s)", loop_state.pending.len());

        let mut join_set: JoinSet<TaskOutcome> = JoinSet::new();
        let mut deadline_hit = false;

        loop {
            while join_set.len() < self.settings.pool_size {
                let Some(mut task) = loop_state.pending.pop_front() else {
                    break;
                };
                if task.role.is_keyed() {
                    self.enter(CrawlPhase::FanningOut);
                }
                task.transition(TaskStatus::InFlight);
                let task_id = task.id;
                loop_state.in_flight.insert(task_id, task.clone());
                let worker = join_set.spawn(run_task(task, self.worker.clone()));
                loop_state.workers.insert(worker.id(), task_id);
            }

            if loop_state.pending.is_empty()
                && loop_state.deferred.is_empty()
                && loop_state.listing_outstanding == 0
            {
                self.enter(CrawlPhase::Draining);
            }

            if join_set.is_empty() {
                break;
            }

            let joined = match deadline {
                Some(deadline) => tokio::select! {
                    joined = join_set.join_next_with_id() => joined,
                    _ = tokio::time::sleep_until(deadline) => {
                        deadline_hit = true;
                        break;
                    }
                },
                None => join_set.join_next_with_id().await,
            };

            match joined {
                Some(Ok((worker, outcome))) => {
                    loop_state.workers.remove(&worker);
                    self.complete(outcome, &mut loop_state);
                }
                Some(Err(join_error)) => {
                    error!("Crawl worker did not finish: {}", join_error);
                    match loop_state.workers.remove(&join_error.id()) {
                        Some(task_id) => self.lose(task_id, &mut loop_state),
                        None => error!("No task recorded for worker {}", join_error.id()),
                    }
                }
                None => break,
            }
        }

        if deadline_hit {
            self.abandon(&mut join_set, &mut loop_state).await;
        }

        self.enter(CrawlPhase::Quiescent);

        if loop_state.listing_ok == 0 && !deadline_hit {
            if let Some((url, source)) = loop_state.last_seed_error.take() {
                return Err(CrawlError::SeedUnreachable { url, source });
            }
        }

        let records = self.worker.store.snapshot();
        info!(
            "Crawl finished: {} records, {} tasks, {} failures in {:?}",
            records.len(),
            loop_state.counts.total(),
            loop_state.failures.len(),
            started.elapsed()
        );

        Ok(CrawlReport {
            records,
            failures: loop_state.failures,
            phases: self.phases.clone(),
            tasks: loop_state.counts,
            outstanding: self.outstanding.get(),
            elapsed: started.elapsed(),
            deadline_hit,
        })
    }

    /// Folds a finished task into the crawl state
    fn complete(&mut self, outcome: TaskOutcome, state: &mut LoopState) {
        let TaskOutcome {
            task,
            follow_ups,
            failures,
            fetch_error,
        } = outcome;
        state.in_flight.remove(&task.id);

        for failure in failures {
            self.attach_failure(failure, state);
        }

        if task.role == TaskRole::Listing {
            match (&task.status, fetch_error) {
                (TaskStatus::Done, _) => state.listing_ok += 1,
                (_, Some(err)) => state.last_seed_error = Some((task.url.to_string(), err)),
                _ => {}
            }
        }

        // Children are counted before the parent is released
        let hold_back = self.settings.fan_out == FanOutPolicy::AfterDiscovery
            && task.role == TaskRole::Listing;
        for spec in follow_ups {
            if !state.seen.insert(spec.url.to_string()) {
                debug!("Already queued {}, skipping", spec.url);
                continue;
            }
            let child = spec.into_task(state.next_id());
            self.outstanding.increment();
            if hold_back {
                state.deferred.push(child);
            } else {
                state.pending.push_back(child);
            }
        }

        state.counts.record(task.role, task.status);
        self.outstanding.decrement();

        if task.role == TaskRole::Listing {
            Self::listing_finished(state);
        }
    }

    /// Fails a task whose worker panicked or was cancelled
    fn lose(&mut self, task_id: TaskId, state: &mut LoopState) {
        let Some(mut task) = state.in_flight.remove(&task_id) else {
            return;
        };
        task.transition(TaskStatus::Failed);
        let failure = TaskFailure::new(
            task.url.to_string(),
            task.key.clone(),
            task.role,
            FailureKind::Worker,
            "worker did not report back",
        );
        self.attach_failure(failure, state);
        state.counts.record(task.role, task.status);
        self.outstanding.decrement();

        if task.role == TaskRole::Listing {
            Self::listing_finished(state);
        }
    }

    /// Releases held-back detail tasks once the last listing task is settled
    fn listing_finished(state: &mut LoopState) {
        state.listing_outstanding = state.listing_outstanding.saturating_sub(1);
        if state.listing_outstanding == 0 && !state.deferred.is_empty() {
            info!(
                "Discovery complete, releasing {} detail task(s)",
                state.deferred.len()
            );
            state.pending.extend(state.deferred.drain(..));
        }
    }

    /// Cancels everything still running or queued after the deadline
    async fn abandon(&mut self, join_set: &mut JoinSet<TaskOutcome>, state: &mut LoopState) {
        warn!(
            "Crawl deadline reached; abandoning {} in-flight and {} queued task(s)",
            join_set.len(),
            state.pending.len() + state.deferred.len()
        );
        join_set.abort_all();

        while let Some(joined) = join_set.join_next().await {
            if let Ok(mut outcome) = joined {
                // Finished before the abort landed; keep its results, drop its children
                outcome.follow_ups.clear();
                self.complete(outcome, state);
            }
        }

        let leftovers: Vec<CrawlTask> = state
            .in_flight
            .drain()
            .map(|(_, task)| task)
            .chain(state.pending.drain(..))
            .chain(state.deferred.drain(..))
            .collect();

        for mut task in leftovers {
            task.transition(TaskStatus::Abandoned);
            let failure = TaskFailure::new(
                task.url.to_string(),
                task.key.clone(),
                task.role,
                FailureKind::Abandoned,
                "crawl deadline reached",
            );
            self.attach_failure(failure, state);
            state.counts.record(task.role, task.status);
            if task.role == TaskRole::Listing {
                state.listing_outstanding = state.listing_outstanding.saturating_sub(1);
            }
            self.outstanding.decrement();
        }
    }

    /// Records a failure in the report and, unless it is a correlation
    /// failure, on the record of the task's key
    fn attach_failure(&self, failure: TaskFailure, state: &mut LoopState) {
        if failure.kind != FailureKind::Correlation {
            if let Some(key) = &failure.key {
                if let Err(e) = self.worker.store.record_failure(key, failure.clone()) {
                    debug!("Failure for {} not attached: {}", key, e);
                }
            }
        }
        state.failures.push(failure);
    }
}

/// Mutable bookkeeping of one `run`
#[derive(Default)]
struct LoopState {
    next_id: TaskId,
    pending: VecDeque<CrawlTask>,
    deferred: Vec<CrawlTask>,
    in_flight: HashMap<TaskId, CrawlTask>,
    workers: HashMap<tokio::task::Id, TaskId>,
    seen: HashSet<String>,
    listing_outstanding: usize,
    listing_ok: usize,
    last_seed_error: Option<(String, FetchError)>,
    failures: Vec<TaskFailure>,
    counts: TaskCounts,
}

impl LoopState {
    fn next_id(&mut self) -> TaskId {
        self.next_id += 1;
        self.next_id
    }
}

/// Fetches one task's page (with retries) and runs the matching handlers
async fn run_task<F: PageFetcher>(mut task: CrawlTask, ctx: WorkerContext<F>) -> TaskOutcome {
    let domain = task.domain();
    let mut failures = Vec::new();

    let document = loop {
        task.attempts += 1;
        let permit = ctx.limiter.acquire(&domain).await;
        info!("Visiting {}", task.url);

        let result = ctx
            .fetcher
            .fetch(FetchRequest {
                url: task.url.clone(),
                user_agent: ctx.user_agents.next(),
            })
            .await;
        permit.release();

        match result {
            Ok(document) => break document,
            Err(e) if e.is_retryable() && task.attempts <= ctx.max_retries => {
                warn!(
                    "Attempt {} for {} failed, retrying: {}",
                    task.attempts, task.url, e
                );
                task.transition(TaskStatus::Pending);
                tokio::time::sleep(ctx.retry_delay).await;
                task.transition(TaskStatus::InFlight);
            }
            Err(e) => {
                warn!("Giving up on {} after {} attempt(s): {}", task.url, task.attempts, e);
                task.transition(TaskStatus::Failed);
                failures.push(TaskFailure::new(
                    task.url.to_string(),
                    task.key.clone(),
                    task.role,
                    FailureKind::Transport,
                    e.to_string(),
                ));
                return TaskOutcome {
                    task,
                    follow_ups: Vec::new(),
                    failures,
                    fetch_error: Some(e),
                };
            }
        }
    };

    let handler_ctx = HandlerContext {
        store: &ctx.store,
        task: &task,
    };
    let mut follow_ups = Vec::new();
    let mut hard_failure = false;
    let mut matched = 0;

    for handler in ctx.profile.handlers_for(task.role, &document) {
        matched += 1;
        match handler.handle(&document, &handler_ctx) {
            Ok(output) => {
                follow_ups.extend(output.follow_ups);
                for issue in output.issues {
                    warn!("{}: {}", handler.name(), issue);
                    failures.push(issue.into_failure(&task));
                }
            }
            Err(e) => {
                if e.is_expected() {
                    warn!("{}: {}", handler.name(), e);
                } else {
                    error!("{}: {}", handler.name(), e);
                }
                hard_failure |= e.kind().is_hard();
                failures.push(e.into_failure(&task));
            }
        }
    }

    if matched == 0 {
        warn!("No handler matched {}", document.url);
        hard_failure = true;
        failures.push(TaskFailure::new(
            document.url.to_string(),
            task.key.clone(),
            task.role,
            FailureKind::Extraction,
            "no handler matched the page",
        ));
    }

    task.transition(if hard_failure {
        TaskStatus::Failed
    } else {
        TaskStatus::Done
    });

    TaskOutcome {
        task,
        follow_ups,
        failures,
        fetch_error: None,
    }
}
