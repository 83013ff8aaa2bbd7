use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

use crate::config::FrontierConfig;
use crate::error::FrontierError;
use crate::host_queue::QueueState;
use crate::item::{now_ms, CrawlItem, Disposition, FetchOutcome, SchedulingDirective, NEVER_MS};
use crate::origin::origin_of;
use crate::registry::{HostQueueRegistry, QueueSnapshot};

/// Observer hooks fired as completions are classified. Callbacks run while
/// the frontier lock is held: keep them quick and never call back into the
/// frontier from one.
pub trait FrontierEvents: Send {
    fn on_success(&mut self, _item: &CrawlItem) {}
    fn on_needs_retry(&mut self, _item: &CrawlItem) {}
    fn on_disregard(&mut self, _item: &CrawlItem) {}
    fn on_failure(&mut self, _item: &CrawlItem) {}
    /// A seed reached by redirect was registered as an additional seed.
    fn on_seed_discovered(&mut self, _item: &CrawlItem) {}
}

struct NoopEvents;

impl FrontierEvents for NoopEvents {}

/// Worker-local admission buffer. Each worker owns exactly one; candidates
/// pile up here without any locking and merge into shared state only when
/// the worker hands the batch to [`Frontier::flush`] or [`Frontier::finish`].
#[derive(Default)]
pub struct ScheduleBatch {
    pending: Vec<CrawlItem>,
}

impl ScheduleBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer a candidate. Nothing is shared until the batch is flushed.
    pub fn schedule(&mut self, item: CrawlItem) {
        self.pending.push(item);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Process-wide crawl counters, snapshotted under the frontier lock.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct FrontierStats {
    pub queued_uris: u64,
    pub hosts: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub disregarded: u64,
    pub total_bytes: u64,
}

impl std::fmt::Display for FrontierStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Frontier: {} URIs over {} hosts, {} succeeded, {} failed, {} disregarded, {} bytes",
            self.queued_uris, self.hosts, self.succeeded, self.failed, self.disregarded, self.total_bytes
        )
    }
}

#[derive(Default)]
struct Counters {
    succeeded: u64,
    failed: u64,
    disregarded: u64,
    total_bytes: u64,
}

struct Inner {
    registry: HostQueueRegistry,
    stats: Counters,
    paused: bool,
    terminated: bool,
    events: Box<dyn FrontierEvents>,
}

impl Inner {
    /// Admit one candidate: resolve its origin, ensure the queue, apply the
    /// directive promotions and enqueue non-overriding. Returns false when
    /// the candidate was dropped for having no resolvable origin.
    fn admit(&mut self, config: &FrontierConfig, mut item: CrawlItem) -> Result<bool, FrontierError> {
        let Some(origin) = origin_of(&item.url) else {
            tracing::warn!(url = %item.url, "dropping candidate with no resolvable origin");
            return Ok(false);
        };
        self.registry.create_queue(&origin, config.host_valence)?;

        if item.is_seed && item.via.is_some() {
            // Reached through a redirect from a seed; register it as an
            // additional seed and keep it ahead of ordinary links.
            item.directive = SchedulingDirective::Medium;
            self.events.on_seed_discovered(&item);
        }
        if config.preference_embed_hops > 0
            && item.embed_hops > 0
            && item.embed_hops <= config.preference_embed_hops
            && item.directive == SchedulingDirective::Normal
        {
            item.directive = SchedulingDirective::Medium;
        }

        self.registry.add(&origin, &item, false)?;
        Ok(true)
    }

    /// Drain a worker's batch. A storage fault drops the one candidate and
    /// keeps going; contract violations propagate.
    fn drain(&mut self, config: &FrontierConfig, batch: &mut ScheduleBatch) -> Result<(), FrontierError> {
        for item in batch.pending.drain(..) {
            let url = item.url.clone();
            match self.admit(config, item) {
                Ok(_) => {}
                Err(e) if e.is_storage() => {
                    tracing::error!(%url, error = %e, "candidate lost to a storage failure");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// The frontier: admits discovered items, dispatches the globally most
/// urgent ready item to idle workers and reschedules completions with
/// adaptive politeness.
///
/// Dispatch and completion serialize behind one lock; workers spend their
/// fetch I/O outside it. Host queues rely on that outer lock and have no
/// locking of their own.
pub struct Frontier {
    inner: Mutex<Inner>,
    cond: Condvar,
    config: FrontierConfig,
}

impl Frontier {
    pub fn open(data_dir: impl AsRef<Path>, config: FrontierConfig) -> Result<Self, FrontierError> {
        Self::with_events(data_dir, config, Box::new(NoopEvents))
    }

    pub fn with_events(
        data_dir: impl AsRef<Path>,
        config: FrontierConfig,
        events: Box<dyn FrontierEvents>,
    ) -> Result<Self, FrontierError> {
        let registry = HostQueueRegistry::open(data_dir.as_ref())?;
        Ok(Self {
            inner: Mutex::new(Inner {
                registry,
                stats: Counters::default(),
                paused: false,
                terminated: false,
                events,
            }),
            cond: Condvar::new(),
            config,
        })
    }

    pub fn config(&self) -> &FrontierConfig {
        &self.config
    }

    /// Schedule each URL as a seed with MEDIUM priority. Safe to re-run on
    /// a live frontier; URLs already queued are deduplicated away. Returns
    /// how many seeds were admitted.
    pub fn load_seeds<I>(&self, urls: I) -> Result<usize, FrontierError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut inner = self.inner.lock();
        let mut loaded = 0;
        for url in urls {
            let item = CrawlItem::seed(url.into());
            let url = item.url.clone();
            match inner.admit(&self.config, item) {
                Ok(true) => loaded += 1,
                Ok(false) => {}
                Err(e) if e.is_storage() => {
                    tracing::error!(%url, error = %e, "seed not loaded");
                }
                Err(e) => return Err(e),
            }
        }
        drop(inner);
        self.cond.notify_all();
        Ok(loaded)
    }

    /// Merge a worker's admission batch into the shared queues and wake any
    /// dispatcher that may now have work.
    pub fn flush(&self, batch: &mut ScheduleBatch) -> Result<(), FrontierError> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut inner = self.inner.lock();
        inner.drain(&self.config, batch)?;
        drop(inner);
        self.cond.notify_all();
        Ok(())
    }

    /// Block until an item is ready somewhere, then issue it.
    ///
    /// Returns [`FrontierError::Ended`] once the frontier is terminated.
    /// While paused, callers park here until resumed. An empty frontier
    /// blocks too; a flush of new work wakes it.
    pub fn next(&self) -> Result<CrawlItem, FrontierError> {
        enum Top {
            Idle,
            Dispatch(String),
            Sleep(u64),
        }

        let mut inner = self.inner.lock();
        loop {
            if inner.terminated {
                return Err(FrontierError::Ended);
            }
            if inner.paused {
                self.cond.wait(&mut inner);
                continue;
            }

            let now = now_ms();
            let decision = match inner.registry.top() {
                None => Top::Idle,
                Some(queue) if queue.state(now) == QueueState::Ready => {
                    Top::Dispatch(queue.origin().to_string())
                }
                Some(queue) => Top::Sleep(queue.next_ready_time()),
            };

            match decision {
                Top::Dispatch(origin) => match inner.registry.next_from(&origin, now) {
                    Ok(item) => return Ok(item),
                    Err(e) if e.is_storage() => {
                        // Sink the faulted queue so the next iteration offers
                        // the next-most-urgent healthy origin instead of
                        // re-dispatching the broken one forever.
                        tracing::error!(%origin, error = %e, "dispatch failed on the top queue; parking the origin");
                        inner.registry.sink(&origin)?;
                    }
                    Err(e) => return Err(e),
                },
                Top::Idle => {
                    self.cond.wait(&mut inner);
                }
                Top::Sleep(ready_at) => {
                    if ready_at == NEVER_MS {
                        self.cond.wait(&mut inner);
                    } else if ready_at > now {
                        // Timed wait; a completion elsewhere may move the top
                        // queue before the timeout, so the loop re-checks.
                        let _ = self
                            .cond
                            .wait_for(&mut inner, Duration::from_millis(ready_at - now));
                    }
                }
            }
        }
    }

    /// Process a completed fetch: drain the worker's pending discoveries,
    /// classify the outcome and hand the item back to its queue with the
    /// politeness wait the outcome earns. Exactly one slot on the origin is
    /// released, so a blocked dispatcher is always woken at the end.
    ///
    /// The worker's revisit policy sets `item.next_fetch_ms` before calling
    /// this on success; retry and disregard paths overwrite it here.
    pub fn finish(
        &self,
        batch: &mut ScheduleBatch,
        mut item: CrawlItem,
        outcome: FetchOutcome,
    ) -> Result<(), FrontierError> {
        let mut inner = self.inner.lock();
        let result = self.finish_locked(&mut inner, batch, &mut item, outcome);
        drop(inner);
        self.cond.notify_all();
        result
    }

    fn finish_locked(
        &self,
        inner: &mut Inner,
        batch: &mut ScheduleBatch,
        item: &mut CrawlItem,
        outcome: FetchOutcome,
    ) -> Result<(), FrontierError> {
        item.fetch_attempts += 1;
        for warning in item.take_warnings() {
            tracing::warn!(url = %item.url, %warning, "fetch warning");
        }
        inner.drain(&self.config, batch)?;

        let origin = origin_of(&item.url).ok_or_else(|| {
            FrontierError::InvalidState(format!(
                "completed item '{}' has no resolvable origin",
                item.url
            ))
        })?;

        let disposition = outcome.disposition(item, self.config.max_retries);
        item.last_outcome = Some(outcome);
        if outcome == FetchOutcome::RuntimeError {
            tracing::error!(url = %item.url, "fetch attempt died to an internal error");
        }

        let now = now_ms();
        let completed = item.fetch_completed_ms.unwrap_or(now);
        let result = match disposition {
            Disposition::Success => {
                let snooze = calculate_snooze(&self.config, item);
                inner.stats.succeeded += 1;
                inner.stats.total_bytes += item.content_size;
                inner.events.on_success(item);
                inner.registry.update(&origin, item, true, completed + snooze)
            }
            Disposition::PromptRetry => {
                self.prepare_retry(item, now);
                inner.events.on_needs_retry(item);
                inner.registry.update(&origin, item, false, 0)
            }
            Disposition::DelayedRetry => {
                let delay = item.retry_delay_ms.unwrap_or_else(|| self.config.retry_delay_ms());
                self.prepare_retry(item, now + delay);
                inner.events.on_needs_retry(item);
                inner.registry.update(&origin, item, true, now + delay)
            }
            Disposition::Disregard => {
                let snooze = calculate_snooze(&self.config, item);
                item.next_fetch_ms = NEVER_MS;
                inner.stats.disregarded += 1;
                inner.events.on_disregard(item);
                inner.registry.update(&origin, item, true, completed + snooze)
            }
            Disposition::Failure => {
                if outcome == FetchOutcome::Unauthorized && !item.credentials_loaded {
                    tracing::error!(url = %item.url, "401 with no credentials loaded; giving up");
                }
                let snooze = calculate_snooze(&self.config, item);
                inner.stats.failed += 1;
                inner.events.on_failure(item);
                inner.registry.update(&origin, item, true, completed + snooze)
            }
        };

        match result {
            Ok(()) => Ok(()),
            Err(e) if e.is_storage() => {
                tracing::error!(%origin, url = %item.url, error = %e, "completion lost to a storage failure");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Common retry rescheduling: clear attempt-scoped state and bump the
    /// directive to MEDIUM, unless the item is itself a prerequisite fetch
    /// (those already run ahead and their flag must not leak to the retry).
    fn prepare_retry(&self, item: &mut CrawlItem, next_fetch_ms: u64) {
        let prerequisite = item.is_prerequisite;
        item.clear_transient_state();
        if !prerequisite && item.directive == SchedulingDirective::Normal {
            item.directive = SchedulingDirective::Medium;
        }
        item.next_fetch_ms = next_fetch_ms;
    }

    /// Pause dispatch. Blocked dispatchers wake so they park on the pause
    /// flag instead of waiting out a stale timeout.
    pub fn pause(&self) {
        self.inner.lock().paused = true;
        self.cond.notify_all();
    }

    pub fn resume(&self) {
        self.inner.lock().paused = false;
        self.cond.notify_all();
    }

    /// End the crawl: every blocked and future `next()` call returns
    /// [`FrontierError::Ended`].
    pub fn terminate(&self) {
        self.inner.lock().terminated = true;
        self.cond.notify_all();
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().registry.uri_count() == 0
    }

    pub fn stats(&self) -> FrontierStats {
        let inner = self.inner.lock();
        FrontierStats {
            queued_uris: inner.registry.uri_count(),
            hosts: inner.registry.queue_count() as u64,
            succeeded: inner.stats.succeeded,
            failed: inner.stats.failed,
            disregarded: inner.stats.disregarded,
            total_bytes: inner.stats.total_bytes,
        }
    }

    /// Per-queue rows for the status report, most urgent first.
    pub fn queue_snapshots(&self) -> Vec<QueueSnapshot> {
        self.inner.lock().registry.snapshot(now_ms())
    }
}

/// Adaptive politeness wait after a completed fetch: a multiple of the
/// observed fetch duration, bounded by the configured min and max. Zero
/// when the fetch carried no timing, so untimed completions never stall an
/// origin. The max bound wins over a misconfigured min that exceeds it.
pub(crate) fn calculate_snooze(config: &FrontierConfig, item: &CrawlItem) -> u64 {
    match item.fetch_duration_ms() {
        Some(duration) => {
            let raw = (config.delay_factor * duration as f64) as u64;
            raw.max(config.min_delay_ms).min(config.max_delay_ms)
        }
        None => 0,
    }
}
