//! In-memory event log for tests and dry runs.

use std::sync::{Arc, RwLock};

use super::{EventRepository, LogRecord, RepositoryError, Result};

/// Shared, cloneable record buffer. Clones observe the same records.
#[derive(Clone, Debug, Default)]
pub struct InMemoryEventLog {
    records: Arc<RwLock<Vec<LogRecord>>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_all(&self) -> Result<Vec<LogRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(records.clone())
    }
}

impl EventRepository for InMemoryEventLog {
    fn append(&mut self, record: &LogRecord) -> Result<u64> {
        let mut records = self
            .records
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        records.push(record.clone());
        Ok(records.len() as u64 - 1)
    }

    fn len(&self) -> Result<u64> {
        let records = self
            .records
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(records.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{LogEntry, Side};

    fn reason(text: &str) -> LogRecord {
        LogRecord::new(
            0.0,
            Side::Authority,
            LogEntry::Reason {
                accepted: true,
                text: text.to_string(),
            },
        )
    }

    #[test]
    fn clones_share_records() {
        let log = InMemoryEventLog::new();
        let mut writer = log.clone();

        assert_eq!(writer.append(&reason("first")).unwrap(), 0);
        assert_eq!(writer.append(&reason("second")).unwrap(), 1);
        assert_eq!(log.len().unwrap(), 2);
        assert!(!log.is_empty().unwrap());
        assert_eq!(log.get_all().unwrap()[1], reason("second"));
    }

    #[test]
    fn poisoned_lock_fails_every_access() {
        let mut log = InMemoryEventLog::new();
        let shared = log.clone();
        let _ = std::thread::spawn(move || {
            let _records = shared.records.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();

        assert!(matches!(log.len(), Err(RepositoryError::LockPoisoned)));
        assert!(matches!(log.is_empty(), Err(RepositoryError::LockPoisoned)));
        assert!(matches!(log.get_all(), Err(RepositoryError::LockPoisoned)));
        assert!(matches!(
            log.append(&reason("late")),
            Err(RepositoryError::LockPoisoned)
        ));
    }
}
