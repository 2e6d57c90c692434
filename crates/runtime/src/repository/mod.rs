//! Event log persistence for sessions.
//!
//! A session appends every event, presentation command and replication
//! message it observes. [`FileEventLog`] writes JSON lines to disk and
//! [`InMemoryEventLog`] keeps them for inspection.

mod error;
mod file;
mod memory;
mod traits;
mod types;

pub use error::{RepositoryError, Result};
pub use file::{FileEventLog, read_all};
pub use memory::InMemoryEventLog;
pub use traits::EventRepository;
pub use types::{LogEntry, LogRecord, Side};
