//! ICS file generation.
//!
//! The icalendar crate has no VJOURNAL builder (`Other` components cannot
//! be constructed), so content lines are written directly and `text.rs`
//! carries its own escaping and folding.

use chrono::{DateTime, Utc};

use super::text::{escape_text, push_folded_line};
use crate::constants::PRODID;
use crate::journal::{DateStart, Journal, RawProperty};

/// Generate .ics content for a journal record
pub fn generate_ics(journal: &Journal) -> String {
    let mut out = String::new();
    let mut line = |l: String| push_folded_line(&mut out, &l);

    line("BEGIN:VCALENDAR".into());
    line("VERSION:2.0".into());
    line(format!("PRODID:{}", PRODID));
    line("BEGIN:VJOURNAL".into());

    line(format!("UID:{}", journal.uid));

    // DTSTAMP - required by RFC 5545
    let dtstamp = journal.dtstamp.unwrap_or_else(Utc::now);
    line(format!("DTSTAMP:{}", format_utc(&dtstamp)));

    if let Some(ref last_modified) = journal.last_modified {
        line(format!("LAST-MODIFIED:{}", format_utc(last_modified)));
    }

    line(format!("SUMMARY:{}", escape_text(&journal.summary)));

    // Empty content is omitted rather than written as an empty property
    if let Some(ref desc) = journal.description {
        if !desc.is_empty() {
            line(format!("DESCRIPTION:{}", escape_text(desc)));
        }
    }

    if let Some(status) = journal.status {
        line(format!("STATUS:{}", status.as_ics_str()));
    }

    if let Some(class) = journal.class {
        line(format!("CLASS:{}", class.as_ics_str()));
    }

    if !journal.categories.is_empty() {
        let categories: Vec<String> = journal.categories.iter().map(|c| escape_text(c)).collect();
        line(format!("CATEGORIES:{}", categories.join(",")));
    }

    if let Some(ref dtstart) = journal.dtstart {
        line(format_date_start(dtstart));
    }

    for relation in &journal.relations {
        line(format!(
            "RELATED-TO;RELTYPE={}:{}",
            relation.rel_type.as_ics_str(),
            relation.uid
        ));
    }

    for (key, value) in &journal.x_properties {
        line(format!("{}:{}", key, escape_text(value)));
    }

    for prop in &journal.other_properties {
        line(format_raw_property(prop));
    }

    line("END:VJOURNAL".into());
    line("END:VCALENDAR".into());

    out
}

fn format_utc(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

fn format_date_start(dtstart: &DateStart) -> String {
    match dtstart {
        DateStart::Date(_) => format!("DTSTART;VALUE=DATE:{}", dtstart.to_ics_string()),
        DateStart::DateTimeZoned { tzid, .. } => {
            format!("DTSTART;TZID={}:{}", tzid, dtstart.to_ics_string())
        }
        DateStart::DateTimeUtc(_) | DateStart::DateTimeFloating(_) => {
            format!("DTSTART:{}", dtstart.to_ics_string())
        }
    }
}

/// Write back a property verbatim, quoting parameter values that need it
fn format_raw_property(prop: &RawProperty) -> String {
    let mut s = prop.name.clone();
    for (key, value) in &prop.params {
        s.push(';');
        s.push_str(key);
        if let Some(value) = value {
            s.push('=');
            if value.contains([':', ';', ',']) {
                s.push('"');
                s.push_str(value);
                s.push('"');
            } else {
                s.push_str(value);
            }
        }
    }
    s.push(':');
    s.push_str(&prop.value);
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ics::parse_journal;
    use crate::journal::{JournalClass, JournalStatus};
    use chrono::{NaiveDate, TimeZone};

    fn make_test_journal() -> Journal {
        let mut journal = Journal::new_file("test-123-agendafs".to_string(), "todo.txt");
        journal.dtstamp = Some(Utc.with_ymd_and_hms(2025, 3, 20, 15, 0, 0).unwrap());
        journal
    }

    #[test]
    fn test_generate_ics_has_journal_envelope() {
        let ics = generate_ics(&make_test_journal());

        assert!(ics.starts_with("BEGIN:VCALENDAR\r\nVERSION:2.0\r\n"));
        assert!(ics.contains("BEGIN:VJOURNAL\r\n"));
        assert!(ics.contains("UID:test-123-agendafs\r\n"));
        assert!(ics.contains("DTSTAMP:20250320T150000Z\r\n"));
        assert!(ics.contains("SUMMARY:todo\r\n"));
        assert!(ics.contains("STATUS:DRAFT\r\n"));
        assert!(ics.contains("CLASS:PRIVATE\r\n"));
        assert!(ics.contains("X-CALDAVFS-FILEEXT:txt\r\n"));
        assert!(ics.ends_with("END:VJOURNAL\r\nEND:VCALENDAR\r\n"));
    }

    #[test]
    fn test_generate_ics_omits_empty_description() {
        let ics = generate_ics(&make_test_journal());
        assert!(!ics.contains("DESCRIPTION"), "ICS:\n{}", ics);
    }

    #[test]
    fn test_generate_ics_all_day_dtstart_has_value_date() {
        let mut journal = make_test_journal();
        journal.dtstart = Some(DateStart::Date(NaiveDate::from_ymd_opt(2025, 3, 20).unwrap()));

        let ics = generate_ics(&journal);
        assert!(
            ics.contains("DTSTART;VALUE=DATE:20250320"),
            "DTSTART should have VALUE=DATE parameter. ICS:\n{}",
            ics
        );
    }

    #[test]
    fn test_generated_content_reads_back() {
        let mut journal = make_test_journal();
        journal.write_content(0, "line one\nline; two, with commas\n".as_bytes()).unwrap();
        journal.categories = vec!["home".into(), "work".into()];
        journal.class = Some(JournalClass::Confidential);
        journal.status = Some(JournalStatus::Final);
        journal.set_parent("parent-uid");
        journal.set_custom_value("mood", "calm");

        let parsed = parse_journal(&generate_ics(&journal)).expect("Should parse generated ICS");

        assert_eq!(parsed.content(), "line one\nline; two, with commas\n");
        assert_eq!(parsed.categories, vec!["home", "work"]);
        assert_eq!(parsed.class, Some(JournalClass::Confidential));
        assert_eq!(parsed.status, Some(JournalStatus::Final));
        assert_eq!(parsed.parent_uid(), Some("parent-uid"));
        assert_eq!(parsed.custom_value("mood"), Some("calm"));
        assert_eq!(parsed.display_name("md"), "todo.txt");
    }

    #[test]
    fn test_empty_custom_value_is_written() {
        let mut journal = make_test_journal();
        journal.set_custom_value("mood", "");

        let ics = generate_ics(&journal);
        assert!(ics.contains("X-CALDAVFS-CUSTOM-mood:\r\n"), "ICS:\n{}", ics);

        let parsed = parse_journal(&ics).expect("Should parse");
        assert_eq!(parsed.custom_value("mood"), Some(""));
    }

    #[test]
    fn test_long_description_survives_folding() {
        let mut journal = make_test_journal();
        let long = "word ".repeat(60);
        journal.write_content(0, long.as_bytes()).unwrap();

        let ics = generate_ics(&journal);
        assert!(ics.lines().all(|l| l.len() <= 75));

        let parsed = parse_journal(&ics).expect("Should parse");
        assert_eq!(parsed.content(), long);
    }
}
