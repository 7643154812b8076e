//! Closed value sets and typed fields of a journal record.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::{AgendaFsError, AgendaFsResult};

/// STATUS of a journal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalStatus {
    Draft,
    Final,
    Completed,
    Cancelled,
    NeedsAction,
    InProcess,
}

impl JournalStatus {
    /// Parse a user supplied status, ignoring case.
    pub fn parse(input: &str) -> AgendaFsResult<Self> {
        match input.to_ascii_lowercase().as_str() {
            "draft" => Ok(JournalStatus::Draft),
            "final" => Ok(JournalStatus::Final),
            "completed" => Ok(JournalStatus::Completed),
            "cancelled" => Ok(JournalStatus::Cancelled),
            "needs-action" => Ok(JournalStatus::NeedsAction),
            "in-process" => Ok(JournalStatus::InProcess),
            _ => Err(AgendaFsError::invalid(format!("unknown status '{}'", input))),
        }
    }

    pub fn as_ics_str(&self) -> &'static str {
        match self {
            JournalStatus::Draft => "DRAFT",
            JournalStatus::Final => "FINAL",
            JournalStatus::Completed => "COMPLETED",
            JournalStatus::Cancelled => "CANCELLED",
            JournalStatus::NeedsAction => "NEEDS-ACTION",
            JournalStatus::InProcess => "IN-PROCESS",
        }
    }

    pub fn from_ics_str(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(JournalStatus::Draft),
            "FINAL" => Some(JournalStatus::Final),
            "COMPLETED" => Some(JournalStatus::Completed),
            "CANCELLED" => Some(JournalStatus::Cancelled),
            "NEEDS-ACTION" => Some(JournalStatus::NeedsAction),
            "IN-PROCESS" => Some(JournalStatus::InProcess),
            _ => None,
        }
    }
}

impl fmt::Display for JournalStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_ics_str())
    }
}

/// CLASS (access classification) of a journal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalClass {
    Private,
    Public,
    Confidential,
}

impl JournalClass {
    /// Parse a user supplied class. Only the lowercase names are accepted.
    pub fn parse(input: &str) -> AgendaFsResult<Self> {
        match input {
            "private" => Ok(JournalClass::Private),
            "public" => Ok(JournalClass::Public),
            "confidential" => Ok(JournalClass::Confidential),
            _ => Err(AgendaFsError::invalid(format!("unknown class '{}'", input))),
        }
    }

    /// Name shown to filesystem users
    pub fn as_str(&self) -> &'static str {
        match self {
            JournalClass::Private => "private",
            JournalClass::Public => "public",
            JournalClass::Confidential => "confidential",
        }
    }

    pub fn as_ics_str(&self) -> &'static str {
        match self {
            JournalClass::Private => "PRIVATE",
            JournalClass::Public => "PUBLIC",
            JournalClass::Confidential => "CONFIDENTIAL",
        }
    }

    pub fn from_ics_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PRIVATE" => Some(JournalClass::Private),
            "PUBLIC" => Some(JournalClass::Public),
            "CONFIDENTIAL" => Some(JournalClass::Confidential),
            _ => None,
        }
    }
}

/// DTSTART of a journal entry, preserving how it was written.
#[derive(Debug, Clone, PartialEq)]
pub enum DateStart {
    Date(NaiveDate),
    DateTimeUtc(DateTime<Utc>),
    DateTimeFloating(NaiveDateTime),
    DateTimeZoned { datetime: NaiveDateTime, tzid: String },
}

impl DateStart {
    /// Parse a user supplied date or date-time.
    ///
    /// Accepts the iCalendar basic forms (`20250320`, `20250320T150000`,
    /// `20250320T150000Z`) and their ISO 8601 extended equivalents.
    pub fn parse(input: &str) -> AgendaFsResult<Self> {
        let s = input.trim();

        if let Some(utc) = s.strip_suffix('Z') {
            if let Ok(dt) = NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S") {
                return Ok(DateStart::DateTimeUtc(dt.and_utc()));
            }
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(DateStart::DateTimeUtc(dt.with_timezone(&Utc)));
        }
        for fmt in ["%Y%m%dT%H%M%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Ok(DateStart::DateTimeFloating(dt));
            }
        }
        for fmt in ["%Y%m%d", "%Y-%m-%d"] {
            if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
                return Ok(DateStart::Date(d));
            }
        }

        Err(AgendaFsError::invalid(format!("invalid dtstart '{}'", input)))
    }

    /// iCalendar basic form, as stored in the record.
    pub fn to_ics_string(&self) -> String {
        match self {
            DateStart::Date(d) => d.format("%Y%m%d").to_string(),
            DateStart::DateTimeUtc(dt) => dt.format("%Y%m%dT%H%M%SZ").to_string(),
            DateStart::DateTimeFloating(dt) => dt.format("%Y%m%dT%H%M%S").to_string(),
            DateStart::DateTimeZoned { datetime, .. } => {
                datetime.format("%Y%m%dT%H%M%S").to_string()
            }
        }
    }
}

/// RELTYPE of a RELATED-TO property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelType {
    Parent,
    Child,
    Sibling,
    Other(String),
}

impl RelType {
    /// A RELATED-TO without RELTYPE is a parent reference (RFC 5545 default).
    pub fn from_param(param: Option<&str>) -> Self {
        match param.map(|p| p.to_ascii_uppercase()) {
            None => RelType::Parent,
            Some(p) => match p.as_str() {
                "PARENT" => RelType::Parent,
                "CHILD" => RelType::Child,
                "SIBLING" => RelType::Sibling,
                _ => RelType::Other(p),
            },
        }
    }

    pub fn as_ics_str(&self) -> &str {
        match self {
            RelType::Parent => "PARENT",
            RelType::Child => "CHILD",
            RelType::Sibling => "SIBLING",
            RelType::Other(s) => s,
        }
    }
}

/// One RELATED-TO property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub rel_type: RelType,
    pub uid: String,
}

/// A property the projector does not model, kept verbatim for rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawProperty {
    pub name: String,
    pub params: Vec<(String, Option<String>)>,
    pub value: String,
}
