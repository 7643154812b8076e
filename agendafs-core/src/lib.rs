//! Core of agendafs: a directory of VJOURNAL records presented as a
//! hierarchical filesystem.
//!
//! This crate provides everything below the host filesystem adapter:
//! - `ics` and `journal` for reading and writing the records
//! - `tree` and `sync` for the projection of records onto paths
//! - `fs` for the filesystem operations themselves
//! - `watcher` for picking up edits made by other tools

pub mod attribute;
pub mod config;
pub mod constants;
pub mod error;
pub mod fs;
pub mod ics;
pub mod journal;
pub mod naming;
pub mod path;
pub mod sync;
pub mod tree;
pub mod vdir;
pub mod watcher;

pub use attribute::Attribute;
pub use config::{AgendaFsConfig, ConfigOverrides};
pub use error::{AgendaFsError, AgendaFsResult, ErrorKind};
pub use fs::{AgendaFs, DirEntry, NodeKind, NodeStat};
pub use journal::Journal;
pub use vdir::Vdir;
pub use watcher::{ChangeKind, Watcher};
