//! JSON-lines event log on disk.
//!
//! Each record is one `serde_json` object followed by `\n`, so the log can be
//! tailed and grepped while a session runs.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::{EventRepository, LogRecord, RepositoryError, Result};

pub struct FileEventLog {
    path: PathBuf,
    writer: BufWriter<File>,
    records: u64,
}

impl FileEventLog {
    /// Creates a new log file.
    ///
    /// # Errors
    ///
    /// Returns error if the file already exists.
    pub fn create(base_dir: impl AsRef<Path>, filename: impl AsRef<str>) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        std::fs::create_dir_all(base_dir)?;

        let path = base_dir.join(filename.as_ref());
        if path.exists() {
            return Err(RepositoryError::LogAlreadyExists(
                path.display().to_string(),
            ));
        }

        let file = OpenOptions::new().create_new(true).write(true).open(&path)?;
        tracing::debug!(path = %path.display(), "created event log");

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            records: 0,
        })
    }

    /// Opens an existing log for appending, counting the records already in it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let records = read_all(&path)?.len() as u64;
        let file = OpenOptions::new().append(true).open(&path)?;
        tracing::debug!(path = %path.display(), records, "opened event log");

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every record back, flushing pending writes first.
    pub fn read_all(&mut self) -> Result<Vec<LogRecord>> {
        self.writer.flush()?;
        read_all(&self.path)
    }
}

/// Parses a JSON-lines log. Blank lines are skipped.
pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<LogRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| RepositoryError::Json {
            line: index + 1,
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}

impl EventRepository for FileEventLog {
    fn append(&mut self, record: &LogRecord) -> Result<u64> {
        let index = self.records;
        serde_json::to_writer(&mut self.writer, record).map_err(|source| {
            RepositoryError::Json {
                line: index as usize + 1,
                source,
            }
        })?;
        self.writer.write_all(b"\n")?;
        self.records += 1;
        Ok(index)
    }

    fn len(&self) -> Result<u64> {
        Ok(self.records)
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl Drop for FileEventLog {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to flush event log on drop");
        }
    }
}
