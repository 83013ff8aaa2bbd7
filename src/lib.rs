pub mod cli;
pub mod config;
pub mod error;
pub mod frontier;
pub mod host_queue;
pub mod item;
pub mod logging;
pub mod origin;
pub mod registry;
pub mod report;

// Re-export main types for library usage
pub use config::FrontierConfig;
pub use error::FrontierError;
pub use frontier::{Frontier, FrontierEvents, FrontierStats, ScheduleBatch};
pub use host_queue::{AddOutcome, HostQueue, QueueState};
pub use item::{now_ms, CrawlItem, Disposition, FetchOutcome, SchedulingDirective, NEVER_MS};
pub use registry::{HostQueueRegistry, QueueSnapshot};
