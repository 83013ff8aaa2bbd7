use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use rkyv::AlignedVec;
use std::fmt;
use std::sync::Arc;

use crate::error::FrontierError;
use crate::item::{CrawlItem, NEVER_MS};

type ItemTable<'a> = TableDefinition<'a, &'static str, &'static [u8]>;
type ScheduleTable<'a> = TableDefinition<'a, (u64, &'static str), ()>;

/// Derived queue state. Computed from slots and the cached head-of-queue
/// time on every read; never stored where a caller could read a stale copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// No item has ever been added. Left once, never re-entered.
    Empty,
    /// An open slot and a matured item exist right now.
    Ready,
    /// Every slot has a fetch in flight.
    Busy,
    /// Waiting on a politeness hold or on the earliest item to mature.
    Snoozed,
}

impl fmt::Display for QueueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueueState::Empty => "empty",
            QueueState::Ready => "ready",
            QueueState::Busy => "busy",
            QueueState::Snoozed => "snoozed",
        };
        f.write_str(name)
    }
}

/// One concurrency slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// Free once the politeness hold expires; zero means immediately open.
    Open(u64),
    /// A fetch is running on this slot.
    Reserved,
}

impl Slot {
    fn reservable(self, now_ms: u64) -> bool {
        matches!(self, Slot::Open(at) if at <= now_ms)
    }
}

/// Result of [`HostQueue::add`], so the registry can keep its URI count and
/// total order current without re-reading the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Fresh insert; the queue grew by one.
    Added,
    /// An existing entry's schedule moved earlier.
    Rescheduled,
    /// Duplicate, later override, or already in flight. Nothing changed.
    Unchanged,
}

/// Durable priority queue of [`CrawlItem`]s for one origin, ordered by time
/// of next fetch and uniquely indexed by URL.
///
/// The queue does no schedule arithmetic of its own; it always trusts the
/// `next_fetch_ms` already set on the item. Three tables in the shared
/// store back it: `<origin>/ready` (url to item bytes), `<origin>/schedule`
/// ((time, url) index, iterated ascending) and `<origin>/in-flight` (items
/// issued but not yet completed). All three are mutated in one transaction
/// per operation, so a crash can never split an item across tables.
///
/// Not thread safe. The frontier's outer lock must prevent overlapping
/// calls; two worker contexts must never reach the same queue concurrently.
pub struct HostQueue {
    origin: String,
    db: Arc<Database>,
    ready_table: String,
    schedule_table: String,
    inflight_table: String,
    /// One entry per permitted concurrent fetch.
    slots: Vec<Slot>,
    /// Cached schedule time of the head of the ready set; NEVER_MS when the
    /// ready set is empty. Lowered on add/update, recomputed on next().
    next_item_ms: u64,
    /// Items owned by this queue: ready plus in flight.
    size: u64,
    /// Latches true once the first item lands; EMPTY is never re-entered.
    touched: bool,
}

impl HostQueue {
    /// Open (or create) the queue for `origin` in the shared store.
    ///
    /// Reopening an existing queue performs crash recovery: items left in
    /// flight by a dead process are folded back into the ready set with
    /// their schedules intact, and every slot reinitializes to open.
    pub(crate) fn open(db: Arc<Database>, origin: &str, valence: u32) -> Result<Self, FrontierError> {
        let valence = valence.max(1) as usize;
        let mut queue = Self {
            origin: origin.to_string(),
            ready_table: format!("{origin}/ready"),
            schedule_table: format!("{origin}/schedule"),
            inflight_table: format!("{origin}/in-flight"),
            db,
            slots: vec![Slot::Open(0); valence],
            next_item_ms: NEVER_MS,
            size: 0,
            touched: false,
        };
        queue.recover()?;
        Ok(queue)
    }

    fn ready_def(&self) -> ItemTable<'_> {
        TableDefinition::new(&self.ready_table)
    }

    fn schedule_def(&self) -> ScheduleTable<'_> {
        TableDefinition::new(&self.schedule_table)
    }

    fn inflight_def(&self) -> ItemTable<'_> {
        TableDefinition::new(&self.inflight_table)
    }

    /// Ensure the tables exist, merge any in-flight leftovers back into the
    /// ready set and prime the cached size and head time.
    fn recover(&mut self) -> Result<(), FrontierError> {
        let txn = self.db.begin_write()?;
        let (size, head_ms, recovered) = {
            let mut ready = txn.open_table(self.ready_def())?;
            let mut sched = txn.open_table(self.schedule_def())?;
            let mut inflight = txn.open_table(self.inflight_def())?;

            let mut orphans = Vec::new();
            for entry in inflight.iter()? {
                let (key, value) = entry?;
                orphans.push((key.value().to_string(), value.value().to_vec()));
            }
            let recovered = orphans.len();
            for (url, bytes) in &orphans {
                // The ready copy wins on collision; a URL must never end up
                // duplicated by recovery.
                let absent = ready.get(url.as_str())?.is_none();
                if absent {
                    let item = decode_item(bytes)?;
                    ready.insert(url.as_str(), bytes.as_slice())?;
                    sched.insert((item.next_fetch_ms, url.as_str()), ())?;
                }
                inflight.remove(url.as_str())?;
            }

            let head_ms = match sched.first()? {
                Some((key, _)) => key.value().0,
                None => NEVER_MS,
            };
            (ready.len()?, head_ms, recovered)
        };
        txn.commit()?;

        if recovered > 0 {
            tracing::info!(
                origin = %self.origin,
                recovered,
                "merged in-flight items from a previous run back into the ready set"
            );
        }
        self.size = size;
        self.touched = size > 0;
        self.next_item_ms = head_ms;
        Ok(())
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn valence(&self) -> usize {
        self.slots.len()
    }

    /// Items owned by this queue, ready plus in flight.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Number of items currently issued for fetching.
    pub fn in_flight(&self) -> usize {
        self.slots.iter().filter(|s| matches!(s, Slot::Reserved)).count()
    }

    pub fn ready_count(&self) -> u64 {
        self.size - self.in_flight() as u64
    }

    /// Add an item to this queue.
    ///
    /// A URL already in flight is left alone: it is accounted for and cannot
    /// be fetched any sooner. A URL already queued is left alone unless
    /// `override_on_duplicate` is set *and* the new time is strictly earlier;
    /// the queue always keeps the most urgent known schedule, and a later
    /// time never overwrites an earlier one. Duplicates are a normal case,
    /// resolved silently, never an error.
    pub fn add(
        &mut self,
        item: &CrawlItem,
        override_on_duplicate: bool,
    ) -> Result<AddOutcome, FrontierError> {
        let txn = self.db.begin_write()?;
        let outcome = {
            let mut ready = txn.open_table(self.ready_def())?;
            let mut sched = txn.open_table(self.schedule_def())?;
            let inflight = txn.open_table(self.inflight_def())?;

            let in_flight = inflight.get(item.url.as_str())?.is_some();
            if in_flight {
                AddOutcome::Unchanged
            } else {
                let existing = match ready.get(item.url.as_str())? {
                    Some(guard) => Some(decode_item(guard.value())?),
                    None => None,
                };
                match existing {
                    None => {
                        let bytes = encode_item(item)?;
                        ready.insert(item.url.as_str(), bytes.as_ref())?;
                        sched.insert((item.next_fetch_ms, item.url.as_str()), ())?;
                        AddOutcome::Added
                    }
                    Some(current)
                        if !override_on_duplicate
                            || item.next_fetch_ms >= current.next_fetch_ms =>
                    {
                        AddOutcome::Unchanged
                    }
                    Some(current) => {
                        // The stored item carries the crawl history; only its
                        // schedule moves up.
                        let old_ms = current.next_fetch_ms;
                        let mut updated = current;
                        updated.next_fetch_ms = item.next_fetch_ms;
                        let bytes = encode_item(&updated)?;
                        ready.insert(updated.url.as_str(), bytes.as_ref())?;
                        sched.remove((old_ms, updated.url.as_str()))?;
                        sched.insert((updated.next_fetch_ms, updated.url.as_str()), ())?;
                        AddOutcome::Rescheduled
                    }
                }
            }
        };
        match outcome {
            AddOutcome::Unchanged => txn.abort()?,
            _ => txn.commit()?,
        }

        if outcome == AddOutcome::Added {
            self.size += 1;
            self.touched = true;
        }
        if outcome != AddOutcome::Unchanged && item.next_fetch_ms < self.next_item_ms {
            self.next_item_ms = item.next_fetch_ms;
        }
        Ok(outcome)
    }

    /// Pop the most urgent ready item, reserve a slot and move the item to
    /// the in-flight set.
    ///
    /// Fails with `InvalidState` unless the queue is READY and a slot is
    /// reservable right now; this is the only mutation that removes an item
    /// from the ready set without the caller handing it back.
    pub fn next(&mut self, now_ms: u64) -> Result<CrawlItem, FrontierError> {
        let state = self.state(now_ms);
        if state != QueueState::Ready {
            return Err(FrontierError::InvalidState(format!(
                "cannot issue next item while queue '{}' is {state}",
                self.origin
            )));
        }
        let slot = self
            .slots
            .iter()
            .position(|s| s.reservable(now_ms))
            .ok_or_else(|| {
                FrontierError::InvalidState(format!(
                    "no reservable slot on queue '{}'",
                    self.origin
                ))
            })?;

        let txn = self.db.begin_write()?;
        let (item, new_head_ms) = {
            let mut ready = txn.open_table(self.ready_def())?;
            let mut sched = txn.open_table(self.schedule_def())?;
            let mut inflight = txn.open_table(self.inflight_def())?;

            let (head_ms, url) = match sched.first()? {
                Some((key, _)) => {
                    let (ms, url) = key.value();
                    (ms, url.to_string())
                }
                None => {
                    return Err(FrontierError::InvalidState(format!(
                        "queue '{}' is ready but holds no queued item",
                        self.origin
                    )))
                }
            };

            let bytes = match ready.get(url.as_str())? {
                Some(guard) => guard.value().to_vec(),
                None => {
                    return Err(FrontierError::InvalidState(format!(
                        "schedule index on queue '{}' points at missing url {url}",
                        self.origin
                    )))
                }
            };
            let item = decode_item(&bytes)?;

            let already = inflight.get(url.as_str())?.is_some();
            if already {
                return Err(FrontierError::InvalidState(format!(
                    "url {url} is already in flight on queue '{}'",
                    self.origin
                )));
            }
            inflight.insert(url.as_str(), bytes.as_slice())?;
            ready.remove(url.as_str())?;
            sched.remove((head_ms, url.as_str()))?;

            let new_head_ms = match sched.first()? {
                Some((key, _)) => key.value().0,
                None => NEVER_MS,
            };
            (item, new_head_ms)
        };
        txn.commit()?;

        self.slots[slot] = Slot::Reserved;
        self.next_item_ms = new_head_ms;
        Ok(item)
    }

    /// Return a dispatched item to the queue after its fetch completed.
    ///
    /// Re-inserts the item into the ready set (never overriding a queued
    /// copy, which would indicate caller misuse), removes it from the
    /// in-flight set and releases exactly one slot: immediately open when
    /// `needs_wait` is false, otherwise cooling down until `wakeup_ms`.
    pub fn update(
        &mut self,
        item: &CrawlItem,
        needs_wait: bool,
        wakeup_ms: u64,
    ) -> Result<(), FrontierError> {
        if !self.slots.iter().any(|s| matches!(s, Slot::Reserved)) {
            return Err(FrontierError::InvalidState(format!(
                "no reserved slot to release on queue '{}'",
                self.origin
            )));
        }

        let txn = self.db.begin_write()?;
        {
            let mut ready = txn.open_table(self.ready_def())?;
            let mut sched = txn.open_table(self.schedule_def())?;
            let mut inflight = txn.open_table(self.inflight_def())?;

            let queued = ready.get(item.url.as_str())?.is_some();
            if queued {
                return Err(FrontierError::InvalidState(format!(
                    "completing '{}' which is still queued on '{}'; only items issued by next() may be updated",
                    item.url, self.origin
                )));
            }
            let bytes = encode_item(item)?;
            ready.insert(item.url.as_str(), bytes.as_ref())?;
            sched.insert((item.next_fetch_ms, item.url.as_str()), ())?;

            if inflight.remove(item.url.as_str())?.is_none() {
                return Err(FrontierError::InvalidState(format!(
                    "'{}' was never dispatched by queue '{}'",
                    item.url, self.origin
                )));
            }
        }
        txn.commit()?;

        if item.next_fetch_ms < self.next_item_ms {
            self.next_item_ms = item.next_fetch_ms;
        }
        let wake = if needs_wait { wakeup_ms } else { 0 };
        if let Some(slot) = self.slots.iter_mut().find(|s| matches!(s, Slot::Reserved)) {
            *slot = Slot::Open(wake);
        }
        Ok(())
    }

    /// The most urgent ready item, left in place. Inspection only; a peeked
    /// item must never be fed back through `update`.
    pub fn peek(&self) -> Result<CrawlItem, FrontierError> {
        let txn = self.db.begin_read()?;
        let sched = txn.open_table(self.schedule_def())?;
        let url = match sched.first()? {
            Some((key, _)) => key.value().1.to_string(),
            None => {
                return Err(FrontierError::InvalidState(format!(
                    "peek on queue '{}' with no ready items",
                    self.origin
                )))
            }
        };
        let ready = txn.open_table(self.ready_def())?;
        match ready.get(url.as_str())? {
            Some(guard) => decode_item(guard.value()),
            None => Err(FrontierError::InvalidState(format!(
                "schedule index on queue '{}' points at missing url {url}",
                self.origin
            ))),
        }
    }

    fn is_busy(&self) -> bool {
        self.slots.iter().all(|s| matches!(s, Slot::Reserved))
    }

    /// Earliest time any open slot stops cooling down; NEVER_MS when every
    /// slot is reserved.
    fn earliest_open_wake(&self) -> u64 {
        self.slots
            .iter()
            .filter_map(|s| match s {
                Slot::Open(at) => Some(*at),
                Slot::Reserved => None,
            })
            .min()
            .unwrap_or(NEVER_MS)
    }

    /// Derive the current state. Pure function of slots and the cached head
    /// time; `now_ms` is explicit so callers and tests share one clock.
    pub fn state(&self, now_ms: u64) -> QueueState {
        if !self.touched {
            return QueueState::Empty;
        }
        if self.is_busy() {
            return QueueState::Busy;
        }
        if self.earliest_open_wake() > now_ms || self.next_item_ms > now_ms {
            QueueState::Snoozed
        } else {
            QueueState::Ready
        }
    }

    /// When this queue can next issue an item: the later of the earliest
    /// slot opening and the earliest item maturing. Busy and empty queues
    /// report NEVER_MS since nothing can be predicted for them.
    pub fn next_ready_time(&self) -> u64 {
        if !self.touched || self.is_busy() {
            return NEVER_MS;
        }
        self.next_item_ms.max(self.earliest_open_wake())
    }

    /// Release the queue's handle on the shared store. Data stays on disk.
    pub fn close(self) {}
}

fn encode_item(item: &CrawlItem) -> Result<AlignedVec, FrontierError> {
    rkyv::to_bytes::<_, 1024>(item)
        .map_err(|e| FrontierError::Serialization(format!("serialize failed: {e}")))
}

fn decode_item(bytes: &[u8]) -> Result<CrawlItem, FrontierError> {
    let mut aligned = AlignedVec::new();
    aligned.extend_from_slice(bytes);
    unsafe { rkyv::from_bytes_unchecked(&aligned) }
        .map_err(|e| FrontierError::Serialization(format!("deserialize failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_db(dir: &TempDir) -> Arc<Database> {
        Arc::new(Database::create(dir.path().join("frontier.redb")).unwrap())
    }

    fn queue(db: &Arc<Database>, valence: u32) -> HostQueue {
        HostQueue::open(Arc::clone(db), "example.com", valence).unwrap()
    }

    fn item(url: &str, ms: u64) -> CrawlItem {
        let mut item = CrawlItem::discovered(url, None, 0, 0);
        item.next_fetch_ms = ms;
        item
    }

    #[test]
    fn test_starts_empty_and_never_returns_to_empty() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let mut q = queue(&db, 1);
        assert_eq!(q.state(0), QueueState::Empty);
        assert_eq!(q.next_ready_time(), NEVER_MS);

        q.add(&item("https://example.com/a", 10), false).unwrap();
        assert_eq!(q.state(5), QueueState::Snoozed);
        assert_eq!(q.state(10), QueueState::Ready);
        assert_eq!(q.next_ready_time(), 10);
    }

    #[test]
    fn test_add_deduplicates_by_url() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let mut q = queue(&db, 1);

        assert_eq!(q.add(&item("https://example.com/a", 10), false).unwrap(), AddOutcome::Added);
        assert_eq!(q.add(&item("https://example.com/a", 5), false).unwrap(), AddOutcome::Unchanged);
        assert_eq!(q.size(), 1);
        assert_eq!(q.peek().unwrap().next_fetch_ms, 10);
    }

    #[test]
    fn test_override_only_moves_schedule_earlier() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let mut q = queue(&db, 1);
        q.add(&item("https://example.com/a", 100), false).unwrap();

        // A later time never overwrites an earlier one.
        assert_eq!(q.add(&item("https://example.com/a", 200), true).unwrap(), AddOutcome::Unchanged);
        assert_eq!(q.peek().unwrap().next_fetch_ms, 100);

        // An earlier time does.
        assert_eq!(q.add(&item("https://example.com/a", 40), true).unwrap(), AddOutcome::Rescheduled);
        assert_eq!(q.peek().unwrap().next_fetch_ms, 40);
        assert_eq!(q.size(), 1);
        assert_eq!(q.next_ready_time(), 40);
    }

    #[test]
    fn test_earlier_item_becomes_head() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let mut q = queue(&db, 1);
        q.add(&item("https://example.com/late", 200), false).unwrap();
        q.add(&item("https://example.com/early", 50), false).unwrap();

        assert_eq!(q.size(), 2);
        assert_eq!(q.peek().unwrap().url, "https://example.com/early");
        assert_eq!(q.next_ready_time(), 50);
    }

    #[test]
    fn test_next_moves_item_in_flight_and_reserves_slot() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let mut q = queue(&db, 1);
        q.add(&item("https://example.com/a", 0), false).unwrap();

        let issued = q.next(10).unwrap();
        assert_eq!(issued.url, "https://example.com/a");
        assert_eq!(q.state(10), QueueState::Busy);
        assert_eq!(q.in_flight(), 1);
        assert_eq!(q.size(), 1);
        assert_eq!(q.next_ready_time(), NEVER_MS);

        // Re-adding an in-flight url is silently absorbed.
        assert_eq!(q.add(&item("https://example.com/a", 0), false).unwrap(), AddOutcome::Unchanged);
        assert_eq!(q.size(), 1);
    }

    #[test]
    fn test_next_rejects_non_ready_queue() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let mut q = queue(&db, 1);
        assert!(matches!(q.next(0), Err(FrontierError::InvalidState(_))));

        q.add(&item("https://example.com/a", 100), false).unwrap();
        // Still snoozed at t=50.
        assert!(matches!(q.next(50), Err(FrontierError::InvalidState(_))));
    }

    #[test]
    fn test_update_releases_slot_with_cooldown() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let mut q = queue(&db, 1);
        q.add(&item("https://example.com/a", 0), false).unwrap();

        let mut issued = q.next(0).unwrap();
        issued.next_fetch_ms = 500;
        q.update(&issued, true, 100).unwrap();

        assert_eq!(q.in_flight(), 0);
        assert_eq!(q.state(50), QueueState::Snoozed);
        // Ready only once both the slot opens (100) and the item matures (500).
        assert_eq!(q.next_ready_time(), 500);
        assert_eq!(q.state(500), QueueState::Ready);
    }

    #[test]
    fn test_update_without_wait_opens_slot_immediately() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let mut q = queue(&db, 1);
        q.add(&item("https://example.com/a", 0), false).unwrap();

        let issued = q.next(0).unwrap();
        q.update(&issued, false, 9999).unwrap();
        assert_eq!(q.state(0), QueueState::Ready);
        assert_eq!(q.next_ready_time(), 0);
    }

    #[test]
    fn test_update_rejects_undispatched_item() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let mut q = queue(&db, 1);
        q.add(&item("https://example.com/a", 0), false).unwrap();
        let _ = q.next(0).unwrap();

        let stranger = item("https://example.com/other", 0);
        assert!(matches!(
            q.update(&stranger, false, 0),
            Err(FrontierError::InvalidState(_))
        ));
        // The failed update must not have leaked the stranger into the queue.
        assert_eq!(q.size(), 1);
    }

    #[test]
    fn test_slot_conservation_with_valence_two() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let mut q = queue(&db, 2);
        q.add(&item("https://example.com/a", 0), false).unwrap();
        q.add(&item("https://example.com/b", 0), false).unwrap();
        q.add(&item("https://example.com/c", 0), false).unwrap();

        let a = q.next(0).unwrap();
        assert_eq!(q.in_flight(), 1);
        assert_eq!(q.state(0), QueueState::Ready);

        let b = q.next(0).unwrap();
        assert_eq!(q.in_flight(), 2);
        assert_eq!(q.state(0), QueueState::Busy);
        assert!(matches!(q.next(0), Err(FrontierError::InvalidState(_))));

        q.update(&a, false, 0).unwrap();
        assert_eq!(q.in_flight(), 1);
        q.update(&b, false, 0).unwrap();
        assert_eq!(q.in_flight(), 0);
        assert_eq!(q.size(), 3);
    }

    #[test]
    fn test_valence_floor_is_one() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let q = HostQueue::open(db, "example.com", 0).unwrap();
        assert_eq!(q.valence(), 1);
    }

    #[test]
    fn test_peek_on_drained_queue_is_invalid_state() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let mut q = queue(&db, 1);
        q.add(&item("https://example.com/a", 0), false).unwrap();
        let _ = q.next(0).unwrap();
        assert!(matches!(q.peek(), Err(FrontierError::InvalidState(_))));
    }

    #[test]
    fn test_recovery_merges_in_flight_back_without_duplicates() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        {
            let mut q = queue(&db, 2);
            q.add(&item("https://example.com/a", 10), false).unwrap();
            q.add(&item("https://example.com/b", 20), false).unwrap();
            let _ = q.next(10).unwrap(); // "/a" dies in flight
        }

        let q = queue(&db, 2);
        assert_eq!(q.size(), 2);
        assert_eq!(q.in_flight(), 0);
        // "/a" kept its original schedule and is the head again.
        assert_eq!(q.peek().unwrap().url, "https://example.com/a");
        assert_eq!(q.next_ready_time(), 10);
        assert_eq!(q.state(10), QueueState::Ready);
    }

    #[test]
    fn test_recovery_of_untouched_queue_stays_empty() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        {
            let _ = queue(&db, 1);
        }
        let q = queue(&db, 1);
        assert_eq!(q.state(0), QueueState::Empty);
        assert_eq!(q.size(), 0);
    }

    #[test]
    fn test_update_preserves_item_history() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let mut q = queue(&db, 1);
        q.add(&item("https://example.com/a", 0), false).unwrap();

        let mut issued = q.next(0).unwrap();
        issued.fetch_attempts = 7;
        issued.next_fetch_ms = 50;
        q.update(&issued, false, 0).unwrap();

        assert_eq!(q.peek().unwrap().fetch_attempts, 7);
    }
}
