//! The backing store: one flat directory of `.ics` records.

use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{AgendaFsError, AgendaFsResult};
use crate::ics::{generate_ics, parse_journal};
use crate::journal::Journal;

/// Metadata of a record file or of the vdir itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStat {
    pub size: u64,
    pub mtime: DateTime<Utc>,
    pub uid: u32,
    pub gid: u32,
}

#[derive(Debug, Clone)]
pub struct Vdir {
    path: PathBuf,
}

/// Whether `filename` names a record
pub fn is_record_filename(filename: &str) -> bool {
    filename.ends_with(".ics")
}

impl Vdir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Vdir { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record_path(&self, filename: &str) -> PathBuf {
        self.path.join(filename)
    }

    /// Filenames of all records, sorted so scans are deterministic.
    pub fn list(&self) -> AgendaFsResult<Vec<String>> {
        let entries = std::fs::read_dir(&self.path)?;

        let mut filenames: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| is_record_filename(name))
            .collect();

        filenames.sort();
        Ok(filenames)
    }

    pub fn read(&self, filename: &str) -> AgendaFsResult<String> {
        std::fs::read_to_string(self.record_path(filename)).map_err(|e| not_found_or(e, filename))
    }

    /// Overwrite the whole record file.
    pub fn write(&self, filename: &str, content: &str) -> AgendaFsResult<()> {
        std::fs::write(self.record_path(filename), content)?;
        Ok(())
    }

    pub fn delete(&self, filename: &str) -> AgendaFsResult<()> {
        std::fs::remove_file(self.record_path(filename)).map_err(|e| not_found_or(e, filename))
    }

    pub fn stat(&self, filename: &str) -> AgendaFsResult<StoreStat> {
        let metadata =
            std::fs::metadata(self.record_path(filename)).map_err(|e| not_found_or(e, filename))?;
        Ok(store_stat(&metadata))
    }

    /// Metadata of the vdir directory, shown for the root
    pub fn stat_dir(&self) -> AgendaFsResult<StoreStat> {
        Ok(store_stat(&std::fs::metadata(&self.path)?))
    }

    pub fn load(&self, filename: &str) -> AgendaFsResult<Journal> {
        let content = self.read(filename)?;
        parse_journal(&content).map_err(|e| match e {
            AgendaFsError::IcsParse(msg) => AgendaFsError::IcsParse(format!("{}: {}", filename, msg)),
            other => other,
        })
    }

    /// Stamp the record as modified and write it to `filename`.
    ///
    /// Records written by other tools may live under a name other than
    /// `<uid>.ics`, so the filename is passed explicitly.
    pub fn save(&self, filename: &str, journal: &mut Journal) -> AgendaFsResult<()> {
        journal.touch();
        self.write(filename, &generate_ics(journal))
    }
}

fn store_stat(metadata: &std::fs::Metadata) -> StoreStat {
    let mtime = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());

    StoreStat {
        size: metadata.len(),
        mtime,
        uid: metadata.uid(),
        gid: metadata.gid(),
    }
}

fn not_found_or(e: io::Error, filename: &str) -> AgendaFsError {
    if e.kind() == io::ErrorKind::NotFound {
        AgendaFsError::not_found(filename)
    } else {
        AgendaFsError::Io(e)
    }
}
