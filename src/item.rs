use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// Schedule sentinel meaning "never offered again until something external
/// changes the schedule". Busy/empty queues also report this as their ready
/// time.
pub const NEVER_MS: u64 = u64::MAX;

/// Current time as milliseconds since the UNIX epoch. The frontier's whole
/// clock is epoch milliseconds so schedule times serialize as plain u64s.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Coarse admission priority. Influences admission ordering only; the fine
/// per-host order is always the item's next fetch time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub enum SchedulingDirective {
    High,
    Medium,
    Normal,
}

/// Outcome of one fetch attempt, reported by the worker to `Frontier::finish`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub enum FetchOutcome {
    Success,
    /// Deferred so a precondition (e.g. robots or auth prerequisite) can be
    /// fetched first.
    Deferred,
    /// HTTP 401. Only retried promptly when credentials were loaded for a
    /// second pass.
    Unauthorized,
    ConnectFailed,
    ConnectionLost,
    DomainUnresolvable,
    RobotsPrecluded,
    OutOfScope,
    BlockedByUser,
    TooManyEmbedHops,
    TooManyLinkHops,
    DeletedByUser,
    /// Internal error while processing the fetch.
    RuntimeError,
    /// Any other HTTP status worth recording.
    Http(u16),
}

/// The single disposition a completed fetch resolves to. First match wins,
/// in this order; anything unrecognized is a `Failure`, never dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Success,
    PromptRetry,
    DelayedRetry,
    Disregard,
    Failure,
}

impl FetchOutcome {
    pub fn disposition(self, item: &CrawlItem, max_retries: u32) -> Disposition {
        let retryable = item.fetch_attempts < max_retries;
        match self {
            FetchOutcome::Success => Disposition::Success,
            FetchOutcome::Deferred if retryable => Disposition::PromptRetry,
            FetchOutcome::Unauthorized if retryable && item.credentials_loaded => {
                Disposition::PromptRetry
            }
            FetchOutcome::ConnectFailed
            | FetchOutcome::ConnectionLost
            | FetchOutcome::DomainUnresolvable
                if retryable =>
            {
                Disposition::DelayedRetry
            }
            FetchOutcome::RobotsPrecluded
            | FetchOutcome::OutOfScope
            | FetchOutcome::BlockedByUser
            | FetchOutcome::TooManyEmbedHops
            | FetchOutcome::TooManyLinkHops
            | FetchOutcome::DeletedByUser => Disposition::Disregard,
            _ => Disposition::Failure,
        }
    }
}

/// One discovered resource. Never "finished" in the one-shot sense: after a
/// completed fetch it is re-admitted to its host queue under whatever next
/// fetch time the worker's revisit policy assigned.
#[derive(Debug, Clone, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub struct CrawlItem {
    /// Identity key; unique within the owning host queue.
    pub url: String,
    /// Epoch ms when this item next becomes eligible for fetching.
    pub next_fetch_ms: u64,
    pub fetch_attempts: u32,
    pub fetch_began_ms: Option<u64>,
    pub fetch_completed_ms: Option<u64>,
    pub last_outcome: Option<FetchOutcome>,
    pub directive: SchedulingDirective,
    /// Link hops from the seed.
    pub link_hops: u32,
    /// Transitive embed/redirect hops from the last real link.
    pub embed_hops: u32,
    pub is_seed: bool,
    /// Discovery provenance; a seed with a non-empty via was reached through
    /// a seed redirect.
    pub via: Option<String>,
    /// Set while this item is a prerequisite fetch for another item.
    pub is_prerequisite: bool,
    /// Credentials were loaded for a retry pass (401 handling).
    pub credentials_loaded: bool,
    /// Bytes of content retrieved on the last attempt.
    pub content_size: u64,
    /// Item-local override for the delayed-retry wait, in milliseconds.
    pub retry_delay_ms: Option<u64>,
    /// Attempt-scoped diagnostics, drained to the log on completion.
    pub warnings: Vec<String>,
}

impl CrawlItem {
    /// A freshly discovered resource, eligible immediately.
    pub fn discovered(url: impl Into<String>, via: Option<String>, link_hops: u32, embed_hops: u32) -> Self {
        Self {
            url: url.into(),
            next_fetch_ms: now_ms(),
            fetch_attempts: 0,
            fetch_began_ms: None,
            fetch_completed_ms: None,
            last_outcome: None,
            directive: SchedulingDirective::Normal,
            link_hops,
            embed_hops,
            is_seed: false,
            via,
            is_prerequisite: false,
            credentials_loaded: false,
            content_size: 0,
            retry_delay_ms: None,
            warnings: Vec::new(),
        }
    }

    /// A seed. Seeds get MEDIUM scheduling so they stay ahead of ordinary links.
    pub fn seed(url: impl Into<String>) -> Self {
        let mut item = Self::discovered(url, None, 0, 0);
        item.is_seed = true;
        item.directive = SchedulingDirective::Medium;
        item
    }

    /// Duration of the last fetch, when both timestamps were recorded.
    pub fn fetch_duration_ms(&self) -> Option<u64> {
        match (self.fetch_began_ms, self.fetch_completed_ms) {
            (Some(began), Some(completed)) => Some(completed.saturating_sub(began)),
            _ => None,
        }
    }

    /// Drop state that only described the attempt that just ended, before the
    /// item goes back into its queue for a retry.
    pub fn clear_transient_state(&mut self) {
        self.is_prerequisite = false;
        self.credentials_loaded = false;
        self.fetch_began_ms = None;
        self.fetch_completed_ms = None;
        self.content_size = 0;
        self.warnings.clear();
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_with_attempts(attempts: u32) -> CrawlItem {
        let mut item = CrawlItem::discovered("https://example.com/a", None, 1, 0);
        item.fetch_attempts = attempts;
        item
    }

    #[test]
    fn test_success_disposition() {
        let item = item_with_attempts(3);
        assert_eq!(
            FetchOutcome::Success.disposition(&item, 30),
            Disposition::Success
        );
    }

    #[test]
    fn test_deferred_is_prompt_retry_until_retries_exhausted() {
        let item = item_with_attempts(3);
        assert_eq!(
            FetchOutcome::Deferred.disposition(&item, 30),
            Disposition::PromptRetry
        );
        let exhausted = item_with_attempts(30);
        assert_eq!(
            FetchOutcome::Deferred.disposition(&exhausted, 30),
            Disposition::Failure
        );
    }

    #[test]
    fn test_unauthorized_needs_credentials() {
        let mut item = item_with_attempts(1);
        assert_eq!(
            FetchOutcome::Unauthorized.disposition(&item, 30),
            Disposition::Failure
        );
        item.credentials_loaded = true;
        assert_eq!(
            FetchOutcome::Unauthorized.disposition(&item, 30),
            Disposition::PromptRetry
        );
    }

    #[test]
    fn test_network_failures_are_delayed_retries() {
        let item = item_with_attempts(2);
        for outcome in [
            FetchOutcome::ConnectFailed,
            FetchOutcome::ConnectionLost,
            FetchOutcome::DomainUnresolvable,
        ] {
            assert_eq!(outcome.disposition(&item, 30), Disposition::DelayedRetry);
        }
        let exhausted = item_with_attempts(30);
        assert_eq!(
            FetchOutcome::ConnectFailed.disposition(&exhausted, 30),
            Disposition::Failure
        );
    }

    #[test]
    fn test_policy_exclusions_are_disregarded_even_when_exhausted() {
        let exhausted = item_with_attempts(99);
        for outcome in [
            FetchOutcome::RobotsPrecluded,
            FetchOutcome::OutOfScope,
            FetchOutcome::BlockedByUser,
            FetchOutcome::TooManyEmbedHops,
            FetchOutcome::TooManyLinkHops,
            FetchOutcome::DeletedByUser,
        ] {
            assert_eq!(outcome.disposition(&exhausted, 30), Disposition::Disregard);
        }
    }

    #[test]
    fn test_unrecognized_outcomes_default_to_failure() {
        let item = item_with_attempts(0);
        assert_eq!(
            FetchOutcome::Http(500).disposition(&item, 30),
            Disposition::Failure
        );
        assert_eq!(
            FetchOutcome::RuntimeError.disposition(&item, 30),
            Disposition::Failure
        );
    }

    #[test]
    fn test_clear_transient_state_keeps_schedule_and_history() {
        let mut item = item_with_attempts(4);
        item.is_prerequisite = true;
        item.credentials_loaded = true;
        item.fetch_began_ms = Some(1);
        item.fetch_completed_ms = Some(2);
        item.content_size = 100;
        item.add_warning("slow response");
        let schedule = item.next_fetch_ms;

        item.clear_transient_state();

        assert!(!item.is_prerequisite);
        assert!(!item.credentials_loaded);
        assert!(item.fetch_began_ms.is_none());
        assert!(item.warnings.is_empty());
        assert_eq!(item.fetch_attempts, 4);
        assert_eq!(item.next_fetch_ms, schedule);
    }
}
