use redb::{Database, ReadableTable, TableDefinition};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

use crate::error::FrontierError;
use crate::host_queue::{AddOutcome, HostQueue, QueueState};
use crate::item::{CrawlItem, NEVER_MS};

/// Known origins and their configured valences, so queues survive restarts.
const ORIGINS_TABLE: TableDefinition<'static, &str, u32> = TableDefinition::new("origins");

/// Owns every [`HostQueue`] and a total order over them by next-ready time,
/// ties broken by origin name, so the most urgent queue is always `top()`.
///
/// Every mutation of a queue goes through this type. A queue's next-ready
/// time can change on any add, next or update, and the order entry must move
/// with it; routing all mutations through here is what keeps the two in
/// step. All queues share one store, opened at `<data_dir>/frontier.redb`.
pub struct HostQueueRegistry {
    db: Arc<Database>,
    queues: HashMap<String, HostQueue>,
    /// (next_ready_time, origin), ascending. One entry per queue.
    order: BTreeSet<(u64, String)>,
    /// The exact key currently in `order` for each origin, so reordering
    /// removes the right entry even if the queue has moved since.
    order_keys: HashMap<String, u64>,
    /// Sum of all queue sizes, maintained incrementally.
    uri_count: u64,
}

impl HostQueueRegistry {
    /// Open the registry at `data_dir`, creating the store if needed and
    /// reopening (with crash recovery) every origin seen by earlier runs.
    pub fn open(data_dir: &Path) -> Result<Self, FrontierError> {
        std::fs::create_dir_all(data_dir).map_err(|e| {
            FrontierError::InvalidState(format!(
                "cannot create data directory {}: {e}",
                data_dir.display()
            ))
        })?;
        let db = Arc::new(Database::create(data_dir.join("frontier.redb"))?);

        let known: Vec<(String, u32)> = {
            let txn = db.begin_write()?;
            let known = {
                let table = txn.open_table(ORIGINS_TABLE)?;
                let mut known = Vec::new();
                for entry in table.iter()? {
                    let (key, value) = entry?;
                    known.push((key.value().to_string(), value.value()));
                }
                known
            };
            txn.commit()?;
            known
        };

        let mut registry = Self {
            db,
            queues: HashMap::new(),
            order: BTreeSet::new(),
            order_keys: HashMap::new(),
            uri_count: 0,
        };
        for (origin, valence) in known {
            let queue = HostQueue::open(Arc::clone(&registry.db), &origin, valence)?;
            registry.uri_count += queue.size();
            registry.order.insert((queue.next_ready_time(), origin.clone()));
            registry.order_keys.insert(origin.clone(), queue.next_ready_time());
            registry.queues.insert(origin, queue);
        }
        if !registry.queues.is_empty() {
            tracing::info!(
                origins = registry.queues.len(),
                uris = registry.uri_count,
                "reopened host queues from disk"
            );
        }
        Ok(registry)
    }

    /// Ensure a queue exists for `origin`. Idempotent: an existing queue is
    /// returned untouched and its valence is never silently altered.
    pub fn create_queue(&mut self, origin: &str, valence: u32) -> Result<(), FrontierError> {
        if self.queues.contains_key(origin) {
            return Ok(());
        }
        let queue = HostQueue::open(Arc::clone(&self.db), origin, valence)?;

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(ORIGINS_TABLE)?;
            table.insert(origin, valence.max(1))?;
        }
        txn.commit()?;

        // A brand-new queue is empty, but opening may have recovered items
        // left behind by runs that crashed before the origin row committed.
        self.uri_count += queue.size();
        let key = queue.next_ready_time();
        self.order.insert((key, origin.to_string()));
        self.order_keys.insert(origin.to_string(), key);
        self.queues.insert(origin.to_string(), queue);
        Ok(())
    }

    pub fn get(&self, origin: &str) -> Option<&HostQueue> {
        self.queues.get(origin)
    }

    pub fn queue_count(&self) -> usize {
        self.queues.len()
    }

    /// Total items across every queue, ready plus in flight.
    pub fn uri_count(&self) -> u64 {
        self.uri_count
    }

    /// The queue with the smallest next-ready time, or None when no queue
    /// exists yet.
    pub fn top(&self) -> Option<&HostQueue> {
        let (_, origin) = self.order.first()?;
        self.queues.get(origin)
    }

    /// Add an item to its origin's queue and refresh the total order.
    /// The queue must already exist.
    pub fn add(
        &mut self,
        origin: &str,
        item: &CrawlItem,
        override_on_duplicate: bool,
    ) -> Result<AddOutcome, FrontierError> {
        let queue = self.queue_mut(origin)?;
        let outcome = queue.add(item, override_on_duplicate)?;
        if outcome == AddOutcome::Added {
            self.uri_count += 1;
        }
        self.reorder(origin)?;
        Ok(outcome)
    }

    /// Issue the most urgent item from `origin`'s queue.
    pub fn next_from(&mut self, origin: &str, now_ms: u64) -> Result<CrawlItem, FrontierError> {
        let queue = self.queue_mut(origin)?;
        let result = queue.next(now_ms);
        // The order entry moves even when next() failed; state may still
        // have been derived from a stale caller clock.
        self.reorder(origin)?;
        result
    }

    /// Hand a completed item back to `origin`'s queue.
    pub fn update(
        &mut self,
        origin: &str,
        item: &CrawlItem,
        needs_wait: bool,
        wakeup_ms: u64,
    ) -> Result<(), FrontierError> {
        let queue = self.queue_mut(origin)?;
        let result = queue.update(item, needs_wait, wakeup_ms);
        self.reorder(origin)?;
        result
    }

    fn queue_mut(&mut self, origin: &str) -> Result<&mut HostQueue, FrontierError> {
        self.queues.get_mut(origin).ok_or_else(|| {
            FrontierError::InvalidState(format!("no queue registered for origin '{origin}'"))
        })
    }

    /// Move `origin`'s order entry to match its current next-ready time.
    /// Uses the recorded key, not the queue's current one, so the stale
    /// entry is always the one removed.
    fn reorder(&mut self, origin: &str) -> Result<(), FrontierError> {
        let current = self
            .queues
            .get(origin)
            .map(|q| q.next_ready_time())
            .ok_or_else(|| {
                FrontierError::InvalidState(format!("reorder of unknown origin '{origin}'"))
            })?;
        let recorded = *self.order_keys.get(origin).ok_or_else(|| {
            FrontierError::InvalidState(format!("no order entry recorded for origin '{origin}'"))
        })?;
        if recorded == current {
            return Ok(());
        }
        if !self.order.remove(&(recorded, origin.to_string())) {
            return Err(FrontierError::InvalidState(format!(
                "order entry for origin '{origin}' is missing"
            )));
        }
        self.order.insert((current, origin.to_string()));
        self.order_keys.insert(origin.to_string(), current);
        Ok(())
    }

    /// Drop `origin` out of dispatch contention by moving its order entry
    /// to the maximal key, so every healthy queue sorts ahead of it. Used
    /// when a queue's store faults: that origin stops being offered while
    /// the rest of the crawl keeps going. The next add or update on the
    /// origin recomputes the real key and floats it back.
    pub fn sink(&mut self, origin: &str) -> Result<(), FrontierError> {
        let recorded = *self.order_keys.get(origin).ok_or_else(|| {
            FrontierError::InvalidState(format!("no order entry recorded for origin '{origin}'"))
        })?;
        if recorded == NEVER_MS {
            return Ok(());
        }
        if !self.order.remove(&(recorded, origin.to_string())) {
            return Err(FrontierError::InvalidState(format!(
                "order entry for origin '{origin}' is missing"
            )));
        }
        self.order.insert((NEVER_MS, origin.to_string()));
        self.order_keys.insert(origin.to_string(), NEVER_MS);
        Ok(())
    }

    /// Per-origin snapshot in most-urgent-first order, for reporting.
    pub fn snapshot(&self, now_ms: u64) -> Vec<QueueSnapshot> {
        self.order
            .iter()
            .filter_map(|(ready_at, origin)| {
                let queue = self.queues.get(origin)?;
                Some(QueueSnapshot {
                    origin: origin.clone(),
                    state: queue.state(now_ms),
                    size: queue.size(),
                    in_flight: queue.in_flight() as u64,
                    valence: queue.valence() as u64,
                    next_ready_ms: *ready_at,
                })
            })
            .collect()
    }

    /// Close every queue. Data stays on disk.
    pub fn close(mut self) {
        for (_, queue) in self.queues.drain() {
            queue.close();
        }
    }
}

/// Point-in-time view of one queue, used by reports.
#[derive(Debug, Clone)]
pub struct QueueSnapshot {
    pub origin: String,
    pub state: QueueState,
    pub size: u64,
    pub in_flight: u64,
    pub valence: u64,
    pub next_ready_ms: u64,
}
