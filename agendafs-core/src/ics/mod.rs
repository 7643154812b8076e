//! ICS file generation and parsing for journal records.
//!
//! This module handles reading and writing VJOURNAL .ics files according to RFC 5545.

mod generate;
mod parse;
mod text;

pub use generate::generate_ics;
pub use parse::parse_journal;
