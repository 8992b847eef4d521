use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use gleaner_core::error::AppError;
use gleaner_core::models::{Field, Record};
use gleaner_core::traits::PersistenceWriter;
use tempfile::NamedTempFile;

/// [`PersistenceWriter`] over a single CSV file.
///
/// The header row is always written, in [`Field::ALL`] order. Writes go to a
/// temp file in the same directory which is then renamed over the target, so
/// a reader sees either the previous file or the new one.
#[derive(Debug, Clone)]
pub struct CsvRecordStore {
    path: PathBuf,
}

impl CsvRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }

    fn storage_error(&self, action: &str, e: impl std::fmt::Display) -> AppError {
        AppError::StorageError(format!("Failed to {action} {}: {e}", self.path.display()))
    }
}

impl PersistenceWriter for CsvRecordStore {
    fn load(&self) -> Result<Vec<Record>, AppError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No stored records yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.storage_error("open", e)),
        };

        // Short rows and missing columns fall back to the placeholder value.
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);
        reader
            .deserialize()
            .collect::<Result<Vec<Record>, _>>()
            .map_err(|e| self.storage_error("read", e))
    }

    fn replace_all(&self, records: &[Record]) -> Result<(), AppError> {
        let dir = self.directory();
        std::fs::create_dir_all(dir).map_err(|e| self.storage_error("create directory for", e))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.storage_error("stage", e))?;
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(tmp.as_file_mut());
            writer
                .write_record(Field::ALL.iter().map(Field::header))
                .map_err(|e| self.storage_error("write", e))?;
            for record in records {
                writer
                    .serialize(record)
                    .map_err(|e| self.storage_error("write", e))?;
            }
            writer.flush().map_err(|e| self.storage_error("write", e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| self.storage_error("sync", e))?;

        // The staged file starts out owner-only; keep the target's mode.
        if let Ok(existing) = std::fs::metadata(&self.path) {
            tmp.as_file()
                .set_permissions(existing.permissions())
                .map_err(|e| self.storage_error("set permissions on", e))?;
        }

        tmp.persist(&self.path)
            .map_err(|e| self.storage_error("replace", e.error))?;
        tracing::debug!(path = %self.path.display(), records = records.len(), "Stored records replaced");
        Ok(())
    }
}
