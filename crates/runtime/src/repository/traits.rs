//! Repository contract for the session event log.

use super::{LogRecord, Result};

/// Append-only log of everything a session produced.
pub trait EventRepository: Send {
    /// Appends a record. Returns the index it was written at.
    fn append(&mut self, record: &LogRecord) -> Result<u64>;

    /// Number of records appended so far.
    fn len(&self) -> Result<u64>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Persists buffered records.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
