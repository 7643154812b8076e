//! Extended attributes projected from journal fields.
//!
//! The fixed attributes map onto typed record fields; any other name is a
//! custom attribute stored as an X- property.

use crate::constants::{MAX_ATTRIBUTE_NAME_LEN, MAX_ATTRIBUTE_VALUE_LEN, XATTR_PREFIX};
use crate::error::{AgendaFsError, AgendaFsResult};
use crate::journal::{DateStart, Journal, JournalClass, JournalStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    Categories,
    Class,
    Status,
    DtStart,
    /// Read-only
    Uid,
    /// Reserved, never readable or writable
    Sibling,
    Custom(String),
}

impl Attribute {
    /// Resolve an attribute name as seen by filesystem users, without the
    /// `user.` prefix.
    pub fn from_name(name: &str) -> AgendaFsResult<Self> {
        if name.is_empty() {
            return Err(AgendaFsError::invalid("empty attribute name"));
        }
        if name.len() > MAX_ATTRIBUTE_NAME_LEN {
            return Err(AgendaFsError::invalid(format!(
                "attribute name longer than {} bytes",
                MAX_ATTRIBUTE_NAME_LEN
            )));
        }

        Ok(match name {
            "categories" => Attribute::Categories,
            "class" => Attribute::Class,
            "status" => Attribute::Status,
            "dtstart" => Attribute::DtStart,
            "uid" => Attribute::Uid,
            "sibling" => Attribute::Sibling,
            other => Attribute::Custom(other.to_string()),
        })
    }

    /// Resolve a host xattr name such as `user.class`.
    ///
    /// Names outside the `user.` namespace are not ours and yield `None`.
    pub fn from_xattr_name(name: &str) -> Option<AgendaFsResult<Self>> {
        name.strip_prefix(XATTR_PREFIX).map(Self::from_name)
    }

    pub fn name(&self) -> &str {
        match self {
            Attribute::Categories => "categories",
            Attribute::Class => "class",
            Attribute::Status => "status",
            Attribute::DtStart => "dtstart",
            Attribute::Uid => "uid",
            Attribute::Sibling => "sibling",
            Attribute::Custom(name) => name,
        }
    }

    pub fn xattr_name(&self) -> String {
        format!("{}{}", XATTR_PREFIX, self.name())
    }

    /// Current value, `None` when the record has none.
    pub fn get(&self, journal: &Journal) -> Option<String> {
        match self {
            Attribute::Categories => {
                (!journal.categories.is_empty()).then(|| journal.categories.join(","))
            }
            Attribute::Class => journal.class.map(|c| c.as_str().to_string()),
            Attribute::Status => journal.status.map(|s| s.to_string()),
            Attribute::DtStart => journal.dtstart.as_ref().map(DateStart::to_ics_string),
            Attribute::Uid => Some(journal.uid.clone()),
            Attribute::Sibling => None,
            Attribute::Custom(name) => journal.custom_value(name).map(str::to_string),
        }
    }

    /// Set the value on `journal`. On error the record is left untouched.
    pub fn set(&self, journal: &mut Journal, value: &str) -> AgendaFsResult<()> {
        if value.len() > MAX_ATTRIBUTE_VALUE_LEN {
            return Err(AgendaFsError::invalid(format!(
                "attribute value of {} bytes is too large",
                value.len()
            )));
        }

        match self {
            Attribute::Uid => return Err(AgendaFsError::denied("uid is read-only")),
            Attribute::Sibling => return Err(AgendaFsError::denied("sibling is reserved")),
            Attribute::Categories => {
                // Embedded commas cannot be expressed
                journal.categories = value
                    .split(',')
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            Attribute::Class => journal.class = Some(JournalClass::parse(value)?),
            Attribute::Status => journal.status = Some(JournalStatus::parse(value)?),
            Attribute::DtStart => {
                journal.dtstart = if value.is_empty() {
                    None
                } else {
                    Some(DateStart::parse(value)?)
                };
            }
            Attribute::Custom(name) => journal.set_custom_value(name, value),
        }
        Ok(())
    }

    /// Remove the value from `journal`.
    pub fn clear(&self, journal: &mut Journal) -> AgendaFsResult<()> {
        match self {
            Attribute::Uid => return Err(AgendaFsError::denied("uid is read-only")),
            Attribute::Sibling => return Err(AgendaFsError::denied("sibling is reserved")),
            Attribute::Status => return Err(AgendaFsError::denied("status cannot be removed")),
            Attribute::Categories => journal.categories.clear(),
            Attribute::Class => journal.class = None,
            Attribute::DtStart => journal.dtstart = None,
            Attribute::Custom(name) => journal.remove_custom_value(name),
        }
        Ok(())
    }

    /// Attributes present on `journal`: `uid` always, the other fixed ones
    /// when set, then every custom attribute.
    pub fn list(journal: &Journal) -> Vec<Attribute> {
        let mut attributes = Vec::new();
        for attribute in [Attribute::Categories, Attribute::DtStart] {
            if attribute.get(journal).is_some() {
                attributes.push(attribute);
            }
        }
        attributes.push(Attribute::Uid);
        for attribute in [Attribute::Class, Attribute::Status] {
            if attribute.get(journal).is_some() {
                attributes.push(attribute);
            }
        }
        attributes.extend(
            journal
                .custom_names()
                .map(|name| Attribute::Custom(name.to_string())),
        );
        attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn journal() -> Journal {
        Journal::new_file("u1-agendafs".to_string(), "todo.txt")
    }

    fn attr(name: &str) -> Attribute {
        Attribute::from_name(name).unwrap()
    }

    #[test]
    fn test_xattr_prefix_is_required() {
        assert_eq!(
            Attribute::from_xattr_name("user.class").unwrap().unwrap(),
            Attribute::Class
        );
        assert!(Attribute::from_xattr_name("trusted.class").is_none());
        assert_eq!(Attribute::Custom("mood".into()).xattr_name(), "user.mood");
    }

    #[test]
    fn test_overlong_names_and_values_are_rejected() {
        let long_name = "n".repeat(256);
        assert!(Attribute::from_name(&long_name).is_err());

        let mut j = journal();
        let big = "v".repeat(64 * 1024);
        assert!(attr("mood").set(&mut j, &big).is_err());
        assert_eq!(j.custom_value("mood"), None);
    }

    #[test]
    fn test_invalid_class_leaves_prior_value() {
        let mut j = journal();
        attr("class").set(&mut j, "public").unwrap();

        let err = attr("class").set(&mut j, "bogus").unwrap_err();
        assert!(matches!(err, AgendaFsError::InvalidArgument(_)));
        assert_eq!(j.class, Some(JournalClass::Public));
    }

    #[test]
    fn test_status_is_case_insensitive_and_canonical_on_read() {
        let mut j = journal();
        attr("status").set(&mut j, "In-Process").unwrap();
        assert_eq!(attr("status").get(&j).as_deref(), Some("IN-PROCESS"));
        assert!(matches!(
            attr("status").clear(&mut j),
            Err(AgendaFsError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_uid_and_sibling_are_protected() {
        let mut j = journal();
        assert_eq!(attr("uid").get(&j).as_deref(), Some("u1-agendafs"));
        assert!(matches!(
            attr("uid").set(&mut j, "other"),
            Err(AgendaFsError::PermissionDenied(_))
        ));
        assert!(matches!(
            attr("sibling").set(&mut j, "x"),
            Err(AgendaFsError::PermissionDenied(_))
        ));
        assert_eq!(j.uid, "u1-agendafs");
    }

    #[test]
    fn test_dtstart_empty_value_clears() {
        let mut j = journal();
        attr("dtstart").set(&mut j, "2025-03-20").unwrap();
        assert_eq!(attr("dtstart").get(&j).as_deref(), Some("20250320"));

        assert!(attr("dtstart").set(&mut j, "not a date").is_err());
        assert!(j.dtstart.is_some());

        attr("dtstart").set(&mut j, "").unwrap();
        assert_eq!(j.dtstart, None);
    }

    #[test]
    fn test_categories_are_comma_joined() {
        let mut j = journal();
        attr("categories").set(&mut j, "home,work").unwrap();
        assert_eq!(j.categories, vec!["home", "work"]);
        assert_eq!(attr("categories").get(&j).as_deref(), Some("home,work"));

        attr("categories").clear(&mut j).unwrap();
        assert_eq!(attr("categories").get(&j), None);
    }

    #[test]
    fn test_list_enumerates_present_attributes() {
        let mut j = journal();
        j.class = None;
        assert_eq!(
            Attribute::list(&j),
            vec![Attribute::Uid, Attribute::Status]
        );

        attr("categories").set(&mut j, "home").unwrap();
        attr("mood").set(&mut j, "calm").unwrap();
        assert_eq!(
            Attribute::list(&j),
            vec![
                Attribute::Categories,
                Attribute::Uid,
                Attribute::Status,
                Attribute::Custom("mood".into()),
            ]
        );
    }

    #[test]
    fn test_custom_empty_value_is_kept() {
        let mut j = journal();
        attr("mood").set(&mut j, "calm").unwrap();
        attr("mood").set(&mut j, "").unwrap();
        assert_eq!(attr("mood").get(&j), Some(String::new()));
        assert!(Attribute::list(&j).contains(&attr("mood")));

        attr("mood").clear(&mut j).unwrap();
        assert_eq!(attr("mood").get(&j), None);
    }
}
