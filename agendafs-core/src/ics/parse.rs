//! ICS file parsing using the icalendar crate's parser.

use chrono::{DateTime, NaiveDateTime, Utc};
use icalendar::{
    DatePerhapsTime, ValueType,
    parser::{Property, read_calendar, unfold},
};

use super::text::{escape_text, split_unescaped_commas, unescape_text};
use crate::constants::CUSTOM_PROPERTY_PREFIX;
use crate::error::{AgendaFsError, AgendaFsResult};
use crate::journal::{
    DateStart, Journal, JournalClass, JournalStatus, RawProperty, RelType, Relation,
};

/// Parse ICS content into a Journal.
///
/// The content must hold a VJOURNAL with a UID and a SUMMARY.
pub fn parse_journal(content: &str) -> AgendaFsResult<Journal> {
    let unfolded = unfold(content);
    let calendar =
        read_calendar(&unfolded).map_err(|e| AgendaFsError::IcsParse(e.to_string()))?;
    let vjournal = calendar
        .components
        .iter()
        .find(|c| c.name == "VJOURNAL")
        .ok_or_else(|| AgendaFsError::IcsParse("no VJOURNAL component".into()))?;

    let mut uid = None;
    let mut summary = None;
    let mut journal = Journal {
        uid: String::new(),
        summary: String::new(),
        description: None,
        dtstamp: None,
        last_modified: None,
        status: None,
        class: None,
        categories: Vec::new(),
        dtstart: None,
        relations: Vec::new(),
        x_properties: Vec::new(),
        other_properties: Vec::new(),
    };

    for prop in &vjournal.properties {
        let name = prop.name.as_ref().to_ascii_uppercase();
        let value = prop.val.as_ref();
        let text = text_value(prop);

        let handled = match name.as_str() {
            "UID" => {
                uid = Some(value.trim().to_string());
                true
            }
            "SUMMARY" => {
                summary = Some(text);
                true
            }
            "DESCRIPTION" => {
                journal.description = (!text.is_empty()).then_some(text);
                true
            }
            "DTSTAMP" => parse_utc(value).map(|dt| journal.dtstamp = Some(dt)).is_some(),
            "LAST-MODIFIED" => parse_utc(value)
                .map(|dt| journal.last_modified = Some(dt))
                .is_some(),
            "STATUS" => JournalStatus::from_ics_str(value.trim())
                .map(|s| journal.status = Some(s))
                .is_some(),
            "CLASS" => JournalClass::from_ics_str(value.trim())
                .map(|c| journal.class = Some(c))
                .is_some(),
            "CATEGORIES" => {
                let categories: Vec<String> = if decoded_by_parser(prop) {
                    text.split(',').map(str::to_string).collect()
                } else {
                    split_unescaped_commas(value)
                };
                journal
                    .categories
                    .extend(categories.into_iter().filter(|c| !c.is_empty()));
                true
            }
            "DTSTART" => DatePerhapsTime::try_from(prop)
                .ok()
                .map(|dpt| journal.dtstart = Some(to_date_start(dpt)))
                .is_some(),
            "RELATED-TO" => {
                journal.relations.push(parse_relation(prop));
                true
            }
            n if n.starts_with("X-") => {
                journal.x_properties.push((x_property_name(prop), text));
                true
            }
            _ => false,
        };

        if !handled {
            journal.other_properties.push(raw_property(prop));
        }
    }

    journal.uid = uid
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AgendaFsError::IcsParse("VJOURNAL has no UID".into()))?;
    journal.summary =
        summary.ok_or_else(|| AgendaFsError::IcsParse("VJOURNAL has no SUMMARY".into()))?;

    Ok(journal)
}

/// Value of a TEXT property with escapes resolved.
///
/// The parser unescapes values it types as TEXT (by `VALUE` parameter,
/// else by an all-uppercase known name), and leaves the rest raw.
fn text_value(prop: &Property) -> String {
    if decoded_by_parser(prop) {
        prop.val.to_string()
    } else {
        unescape_text(prop.val.as_ref())
    }
}

fn decoded_by_parser(prop: &Property) -> bool {
    let declared = prop
        .params
        .iter()
        .find(|p| p.key.as_str() == "VALUE")
        .and_then(|p| p.val.as_ref())
        .and_then(|v| v.as_str().parse::<ValueType>().ok());
    if let Some(value_type) = declared {
        return value_type == ValueType::Text;
    }

    let name = prop.name.as_ref();
    !name.chars().any(char::is_lowercase)
        && (name.starts_with("X-") || TEXT_PROPERTIES.contains(&name))
}

/// Properties the parser types as TEXT by name
const TEXT_PROPERTIES: &[&str] = &[
    "CALSCALE",
    "METHOD",
    "PRODID",
    "VERSION",
    "CATEGORIES",
    "CLASS",
    "COMMENT",
    "DESCRIPTION",
    "LOCATION",
    "RESOURCES",
    "STATUS",
    "SUMMARY",
    "TRANSP",
    "TZID",
    "TZNAME",
    "CONTACT",
    "RELATED-TO",
    "UID",
    "ACTION",
    "REQUEST-STATUS",
];

/// X- property name with the marker part uppercased. The suffix of a custom
/// attribute keeps its case, since it is the attribute's name.
fn x_property_name(prop: &Property) -> String {
    let name = prop.name.as_ref();
    let prefix_len = CUSTOM_PROPERTY_PREFIX.len();
    match name.get(..prefix_len) {
        Some(prefix) if prefix.eq_ignore_ascii_case(CUSTOM_PROPERTY_PREFIX) => {
            format!("{}{}", CUSTOM_PROPERTY_PREFIX, &name[prefix_len..])
        }
        _ => name.to_ascii_uppercase(),
    }
}

/// Parse a UTC (or floating, taken as UTC) iCalendar date-time
fn parse_utc(value: &str) -> Option<DateTime<Utc>> {
    let s = value.trim().trim_end_matches('Z');
    NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
        .ok()
        .map(|dt| dt.and_utc())
}

/// Convert icalendar's DatePerhapsTime to our DateStart, preserving timezone info
fn to_date_start(dpt: DatePerhapsTime) -> DateStart {
    match dpt {
        DatePerhapsTime::Date(d) => DateStart::Date(d),
        DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
            icalendar::CalendarDateTime::Utc(dt) => DateStart::DateTimeUtc(dt),
            icalendar::CalendarDateTime::Floating(naive) => DateStart::DateTimeFloating(naive),
            icalendar::CalendarDateTime::WithTimezone { date_time, tzid } => {
                DateStart::DateTimeZoned {
                    datetime: date_time,
                    tzid,
                }
            }
        },
    }
}

fn parse_relation(prop: &Property) -> Relation {
    let reltype = prop
        .params
        .iter()
        .find(|p| p.key.as_ref().eq_ignore_ascii_case("RELTYPE"))
        .and_then(|p| p.val.as_ref().map(|v| v.to_string()));

    Relation {
        rel_type: RelType::from_param(reltype.as_deref()),
        uid: prop.val.as_ref().trim().to_string(),
    }
}

fn raw_property(prop: &Property) -> RawProperty {
    RawProperty {
        name: prop.name.to_string(),
        params: prop
            .params
            .iter()
            .map(|p| (p.key.to_string(), p.val.as_ref().map(|v| v.to_string())))
            .collect(),
        // written back verbatim, so undo the parser's unescaping
        value: if decoded_by_parser(prop) {
            escape_text(prop.val.as_ref())
        } else {
            prop.val.to_string()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ics::generate_ics;
    use chrono::{NaiveDate, TimeZone};

    const FULL: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:TEST\r\n\
BEGIN:VJOURNAL\r\n\
UID:u2\r\n\
DTSTAMP:20250101T090000Z\r\n\
LAST-MODIFIED:20250102T100000Z\r\n\
SUMMARY:todo\r\n\
DESCRIPTION:buy milk\\nand eggs\r\n\
STATUS:DRAFT\r\n\
CLASS:PUBLIC\r\n\
CATEGORIES:home,errands\r\n\
DTSTART;VALUE=DATE:20250320\r\n\
RELATED-TO;RELTYPE=PARENT:u1\r\n\
X-CALDAVFS-FILEEXT:txt\r\n\
X-CALDAVFS-CUSTOM-mood:calm\r\n\
SEQUENCE:3\r\n\
END:VJOURNAL\r\n\
END:VCALENDAR\r\n";

    #[test]
    fn test_parse_full_journal() {
        let journal = parse_journal(FULL).expect("Should parse");

        assert_eq!(journal.uid, "u2");
        assert_eq!(journal.summary, "todo");
        assert_eq!(journal.content(), "buy milk\nand eggs");
        assert_eq!(journal.status, Some(JournalStatus::Draft));
        assert_eq!(journal.class, Some(JournalClass::Public));
        assert_eq!(journal.categories, vec!["home", "errands"]);
        assert_eq!(
            journal.dtstart,
            Some(DateStart::Date(NaiveDate::from_ymd_opt(2025, 3, 20).unwrap()))
        );
        assert_eq!(
            journal.last_modified,
            Some(Utc.with_ymd_and_hms(2025, 1, 2, 10, 0, 0).unwrap())
        );
        assert_eq!(journal.parent_uid(), Some("u1"));
        assert_eq!(journal.file_extension(), Some("txt"));
        assert_eq!(journal.custom_value("mood"), Some("calm"));
    }

    #[test]
    fn test_unknown_properties_are_preserved() {
        let journal = parse_journal(FULL).expect("Should parse");
        assert_eq!(journal.other_properties.len(), 1);
        assert_eq!(journal.other_properties[0].name, "SEQUENCE");
        assert_eq!(journal.other_properties[0].value, "3");

        let generated = generate_ics(&journal);
        assert!(generated.contains("SEQUENCE:3\r\n"), "ICS:\n{}", generated);
    }

    #[test]
    fn test_child_relation_marks_directory() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:TEST\r\n\
BEGIN:VJOURNAL\r\n\
UID:u1\r\n\
SUMMARY:notes\r\n\
RELATED-TO;RELTYPE=CHILD:u2\r\n\
END:VJOURNAL\r\n\
END:VCALENDAR\r\n";

        let journal = parse_journal(ics).expect("Should parse");
        assert!(journal.is_directory());
        assert_eq!(journal.parent_uid(), None);
    }

    #[test]
    fn test_rejects_records_without_journal_or_summary() {
        let event = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:TEST\r\n\
BEGIN:VEVENT\r\n\
UID:e1\r\n\
SUMMARY:meeting\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";
        assert!(matches!(parse_journal(event), Err(AgendaFsError::IcsParse(_))));

        let no_summary = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:TEST\r\n\
BEGIN:VJOURNAL\r\n\
UID:u1\r\n\
END:VJOURNAL\r\n\
END:VCALENDAR\r\n";
        assert!(matches!(parse_journal(no_summary), Err(AgendaFsError::IcsParse(_))));
    }

    #[test]
    fn test_escapes_are_decoded_once() {
        let mut journal = Journal::new_file("u3".into(), "C:\\new.txt");
        journal.write_content(0, b"C:\\new\\table, x;y\nend").unwrap();
        journal.categories = vec!["a\\b".into(), "c;d".into()];
        journal.set_custom_value("path", "x\\ny;z");

        let parsed = parse_journal(&generate_ics(&journal)).expect("Should parse");
        assert_eq!(parsed.summary, "C:\\new");
        assert_eq!(parsed.content(), "C:\\new\\table, x;y\nend");
        assert_eq!(parsed.categories, vec!["a\\b", "c;d"]);
        assert_eq!(parsed.custom_value("path"), Some("x\\ny;z"));
    }

    #[test]
    fn test_custom_attribute_names_keep_their_case() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:TEST\r\n\
BEGIN:VJOURNAL\r\n\
UID:u1\r\n\
SUMMARY:notes\r\n\
x-caldavfs-fileext:md\r\n\
X-CALDAVFS-CUSTOM-Mood:calm\r\n\
x-caldavfs-custom-energy:low\r\n\
END:VJOURNAL\r\n\
END:VCALENDAR\r\n";

        let journal = parse_journal(ics).expect("Should parse");
        assert_eq!(journal.file_extension(), Some("md"));
        assert_eq!(journal.custom_value("Mood"), Some("calm"));
        assert_eq!(journal.custom_value("energy"), Some("low"));
        assert_eq!(journal.custom_names().collect::<Vec<_>>(), vec!["Mood", "energy"]);
    }

    #[test]
    fn test_unknown_text_properties_keep_their_escapes() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:TEST\r\n\
BEGIN:VJOURNAL\r\n\
UID:u1\r\n\
SUMMARY:notes\r\n\
LOCATION:Room 1\\, floor 2\r\n\
END:VJOURNAL\r\n\
END:VCALENDAR\r\n";

        let journal = parse_journal(ics).expect("Should parse");
        let generated = generate_ics(&journal);
        assert!(generated.contains("LOCATION:Room 1\\, floor 2\r\n"), "ICS:\n{}", generated);
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        assert!(parse_journal("this is not a calendar").is_err());
    }
}
