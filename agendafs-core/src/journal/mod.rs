//! Journal records and their projection onto filesystem entries.
//!
//! A `Journal` is the structured form of one backing `.ics` file. This
//! module maps it to what the tree shows: a display name, file content,
//! directory-ness and a parent reference.

mod fields;

pub use fields::{DateStart, JournalClass, JournalStatus, RawProperty, RelType, Relation};

use chrono::{DateTime, Utc};

use crate::constants::{
    CUSTOM_PROPERTY_PREFIX, DIRECTORY_MARKER_VALUE, EMPTY_EXTENSION_SENTINEL,
    FILE_EXTENSION_PROPERTY, IS_DIRECTORY_PROPERTY, UID_SUFFIX,
};
use crate::error::{AgendaFsError, AgendaFsResult};
use crate::path::{file_extension, without_file_extension};

/// A calendar journal entry (one VJOURNAL)
#[derive(Debug, Clone, PartialEq)]
pub struct Journal {
    pub uid: String,
    pub summary: String,
    /// File content
    pub description: Option<String>,
    pub dtstamp: Option<DateTime<Utc>>,
    /// Refreshed on every write
    pub last_modified: Option<DateTime<Utc>>,
    pub status: Option<JournalStatus>,
    pub class: Option<JournalClass>,
    pub categories: Vec<String>,
    pub dtstart: Option<DateStart>,
    pub relations: Vec<Relation>,
    /// X- properties, including the agendafs markers and custom attributes
    pub x_properties: Vec<(String, String)>,
    /// Everything else, preserved for round-tripping records written by other tools
    pub other_properties: Vec<RawProperty>,
}

/// Generate a fresh unique id for a new record.
pub fn new_uid() -> String {
    format!("{}{}", uuid::Uuid::new_v4(), UID_SUFFIX)
}

impl Journal {
    fn empty(uid: String, summary: String) -> Self {
        Journal {
            uid,
            summary,
            description: None,
            dtstamp: Some(Utc::now()),
            last_modified: None,
            status: None,
            class: None,
            categories: Vec::new(),
            dtstart: None,
            relations: Vec::new(),
            x_properties: Vec::new(),
            other_properties: Vec::new(),
        }
    }

    /// A new directory record: final, private, marked as directory.
    pub fn new_directory(uid: String, name: &str) -> Self {
        let mut journal = Self::empty(uid, name.to_string());
        journal.status = Some(JournalStatus::Final);
        journal.class = Some(JournalClass::Private);
        journal.mark_as_directory();
        journal
    }

    /// A new file record: draft, private, empty content.
    ///
    /// The summary is the name without its extension and the extension is
    /// stored explicitly, so `notes` stays extensionless even when a
    /// default extension is configured.
    pub fn new_file(uid: String, name: &str) -> Self {
        let mut journal = Self::empty(uid, without_file_extension(name).to_string());
        journal.status = Some(JournalStatus::Draft);
        journal.class = Some(JournalClass::Private);
        journal.set_file_extension(file_extension(name).unwrap_or(""));
        journal
    }

    /// Backing filename for this record
    pub fn vdir_filename(&self) -> String {
        format!("{}.ics", self.uid)
    }

    // NAME:

    /// Name shown in the tree.
    ///
    /// Directories show the summary verbatim; files append the record's
    /// extension marker, or `default_extension` when it has none.
    pub fn display_name(&self, default_extension: &str) -> String {
        if self.is_directory() {
            return self.summary.clone();
        }

        let extension = self.file_extension().unwrap_or(default_extension);
        if extension.is_empty() {
            self.summary.clone()
        } else {
            format!("{}.{}", self.summary, extension)
        }
    }

    /// Write a display name back to summary and extension marker.
    pub fn set_display_name(&mut self, name: &str) {
        if self.is_directory() {
            self.summary = name.to_string();
            return;
        }

        self.summary = without_file_extension(name).to_string();
        self.set_file_extension(file_extension(name).unwrap_or(""));
    }

    /// Extension override. `Some("")` means explicitly no extension.
    pub fn file_extension(&self) -> Option<&str> {
        self.x_value(FILE_EXTENSION_PROPERTY)
            .map(|ext| if ext == EMPTY_EXTENSION_SENTINEL { "" } else { ext })
    }

    pub fn set_file_extension(&mut self, extension: &str) {
        let stored = if extension.is_empty() {
            EMPTY_EXTENSION_SENTINEL
        } else {
            extension
        };
        self.set_x_value(FILE_EXTENSION_PROPERTY, stored);
    }

    // DIRECTORY:

    pub fn has_directory_marker(&self) -> bool {
        self.x_value(IS_DIRECTORY_PROPERTY) == Some(DIRECTORY_MARKER_VALUE)
    }

    pub fn has_child_relations(&self) -> bool {
        self.relations.iter().any(|r| r.rel_type == RelType::Child)
    }

    /// Record-level directory predicate (tree children are checked by the caller)
    pub fn is_directory(&self) -> bool {
        self.has_child_relations() || self.has_directory_marker()
    }

    pub fn mark_as_directory(&mut self) {
        self.set_x_value(IS_DIRECTORY_PROPERTY, DIRECTORY_MARKER_VALUE);
    }

    // PARENT:

    pub fn parent_uid(&self) -> Option<&str> {
        self.relations
            .iter()
            .find(|r| r.rel_type == RelType::Parent)
            .map(|r| r.uid.as_str())
    }

    /// Replace any parent reference with `uid`.
    pub fn set_parent(&mut self, uid: &str) {
        self.clear_parent();
        self.relations.push(Relation {
            rel_type: RelType::Parent,
            uid: uid.to_string(),
        });
    }

    pub fn clear_parent(&mut self) {
        self.relations.retain(|r| r.rel_type != RelType::Parent);
    }

    // CONTENT:

    pub fn content(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }

    pub fn content_len(&self) -> u64 {
        self.content().len() as u64
    }

    /// Write `data` at `offset`.
    ///
    /// The offset is clamped to the current length: the existing content up
    /// to the offset is kept, `data` follows, and anything after is dropped.
    pub fn write_content(&mut self, offset: u64, data: &[u8]) -> AgendaFsResult<()> {
        let old = self.content().as_bytes();
        let keep = usize::try_from(offset).unwrap_or(usize::MAX).min(old.len());

        let mut bytes = Vec::with_capacity(keep + data.len());
        bytes.extend_from_slice(&old[..keep]);
        bytes.extend_from_slice(data);

        let content = String::from_utf8(bytes)
            .map_err(|_| AgendaFsError::invalid("content must be valid UTF-8"))?;
        self.description = if content.is_empty() { None } else { Some(content) };
        Ok(())
    }

    /// Keep only the first `len` bytes of the content.
    pub fn truncate_content(&mut self, len: u64) -> AgendaFsResult<()> {
        let old = self.content();
        let keep = usize::try_from(len).unwrap_or(usize::MAX).min(old.len());
        if !old.is_char_boundary(keep) {
            return Err(AgendaFsError::invalid("truncation splits a character"));
        }

        let content = old[..keep].to_string();
        self.description = if content.is_empty() { None } else { Some(content) };
        Ok(())
    }

    // X- PROPERTIES:

    pub fn x_value(&self, key: &str) -> Option<&str> {
        self.x_properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set an X- property, replacing any previous value.
    pub fn set_x_value(&mut self, key: &str, value: &str) {
        self.remove_x_value(key);
        self.x_properties.push((key.to_string(), value.to_string()));
    }

    pub fn remove_x_value(&mut self, key: &str) {
        self.x_properties.retain(|(k, _)| k != key);
    }

    pub fn custom_value(&self, name: &str) -> Option<&str> {
        self.x_value(&format!("{}{}", CUSTOM_PROPERTY_PREFIX, name))
    }

    pub fn set_custom_value(&mut self, name: &str, value: &str) {
        self.set_x_value(&format!("{}{}", CUSTOM_PROPERTY_PREFIX, name), value);
    }

    pub fn remove_custom_value(&mut self, name: &str) {
        self.remove_x_value(&format!("{}{}", CUSTOM_PROPERTY_PREFIX, name));
    }

    /// Names of all stored custom attributes, in record order.
    pub fn custom_names(&self) -> impl Iterator<Item = &str> {
        self.x_properties
            .iter()
            .filter_map(|(k, _)| k.strip_prefix(CUSTOM_PROPERTY_PREFIX))
    }

    /// Stamp the record as modified now.
    pub fn touch(&mut self) {
        self.last_modified = Some(Utc::now());
    }
}
