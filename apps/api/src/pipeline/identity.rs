//! Candidate identity resolution from the extraction section.
//!
//! The structuring model may emit personal info as a record or as a list of
//! records, under a handful of key spellings. Resolution is explicit:
//!
//! 1. section key: `Personal Info`, then `personal_info`, then `PersonalInfo`
//!    (the first one holding a non-empty record or list wins);
//! 2. shape: a record is used as-is, a list contributes its first element;
//! 3. field keys: name `Name`, `name`, `Full Name`, `full_name`;
//!    email `Email`, `email`; phone `Phone`, `phone` (blank values skipped);
//! 4. no name resolved → the file stem.

use serde_json::{Map, Value};

const PERSONAL_INFO_KEYS: &[&str] = &["Personal Info", "personal_info", "PersonalInfo"];
const NAME_KEYS: &[&str] = &["Name", "name", "Full Name", "full_name"];
const EMAIL_KEYS: &[&str] = &["Email", "email"];
const PHONE_KEYS: &[&str] = &["Phone", "phone"];

/// The shapes personal info is found in.
#[derive(Debug, PartialEq)]
pub enum PersonalInfo<'a> {
    Record(&'a Map<String, Value>),
    List(&'a [Value]),
    Absent,
}

impl<'a> PersonalInfo<'a> {
    pub fn locate(structured_data: &'a Value) -> Self {
        PERSONAL_INFO_KEYS
            .iter()
            .filter_map(|key| structured_data.get(*key))
            .find_map(|value| match value {
                Value::Object(map) if !map.is_empty() => Some(PersonalInfo::Record(map)),
                Value::Array(items) if !items.is_empty() => Some(PersonalInfo::List(items)),
                _ => None,
            })
            .unwrap_or(PersonalInfo::Absent)
    }

    /// The single record the fields are read from.
    pub fn record(&self) -> Option<&'a Map<String, Value>> {
        match *self {
            PersonalInfo::Record(map) => Some(map),
            PersonalInfo::List(items) => items.first().and_then(Value::as_object),
            PersonalInfo::Absent => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateIdentity {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

pub fn resolve_identity(structured_data: &Value, fallback_name: &str) -> CandidateIdentity {
    let record = PersonalInfo::locate(structured_data).record();
    let field = |keys: &[&str]| record.and_then(|r| first_text(r, keys));

    CandidateIdentity {
        name: field(NAME_KEYS).unwrap_or_else(|| fallback_name.to_string()),
        email: field(EMAIL_KEYS),
        phone: field(PHONE_KEYS),
    }
}

fn first_text(record: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match record.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
