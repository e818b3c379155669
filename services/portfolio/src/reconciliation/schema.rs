//! The portfolio field schema
//!
//! Every client-mergeable portfolio field is listed in [`FIELDS`] together with
//! its default and a typed setter. Anything not in the table (ids, owner,
//! timestamps) can never be written from a client payload.

use serde_json::Value;
use thiserror::Error;

use crate::models::Portfolio;

pub const DEFAULT_TEMPLATE_ID: i32 = 1;
pub const DEFAULT_SKILLS: &str = r#"["HTML", "CSS", "JavaScript"]"#;
pub const EMPTY_SKILLS: &str = "[]";

/// Schema default of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    Text(&'static str),
    Number(i32),
}

/// A normalized value ready to be written into a portfolio
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Number(i32),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid value for {field}: {reason}")]
pub struct FieldError {
    pub field: &'static str,
    pub reason: &'static str,
}

#[derive(Clone, Copy)]
enum Slot {
    Text(fn(&mut Portfolio) -> &mut String),
    Skills,
    Template,
}

/// One mergeable portfolio field
pub struct PortfolioField {
    pub name: &'static str,
    pub default: FieldDefault,
    slot: Slot,
}

impl std::fmt::Debug for PortfolioField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortfolioField")
            .field("name", &self.name)
            .field("default", &self.default)
            .finish()
    }
}

impl PortfolioField {
    pub fn default_value(&self) -> FieldValue {
        match self.default {
            FieldDefault::Text(text) => FieldValue::Text(text.to_string()),
            FieldDefault::Number(n) => FieldValue::Number(n),
        }
    }

    /// Coerce a raw client value into the stored shape of this field
    ///
    /// The skill list is the only field whose malformed input is repaired
    /// (to an empty list); other fields reject structured values.
    pub fn normalize(&self, raw: &Value) -> Result<FieldValue, FieldError> {
        match self.slot {
            Slot::Skills => Ok(FieldValue::Text(normalize_skills(raw))),
            Slot::Template => match raw {
                Value::Number(n) => n
                    .as_i64()
                    .and_then(|n| i32::try_from(n).ok())
                    .map(FieldValue::Number)
                    .ok_or(self.error("expected an integer template id")),
                Value::String(s) => s
                    .trim()
                    .parse()
                    .map(FieldValue::Number)
                    .map_err(|_| self.error("expected an integer template id")),
                _ => Err(self.error("expected an integer template id")),
            },
            Slot::Text(_) => match raw {
                Value::String(s) => Ok(FieldValue::Text(s.clone())),
                Value::Null => Ok(FieldValue::Text(String::new())),
                Value::Bool(b) => Ok(FieldValue::Text(b.to_string())),
                Value::Number(n) => Ok(FieldValue::Text(n.to_string())),
                Value::Array(_) | Value::Object(_) => Err(self.error("expected text")),
            },
        }
    }

    /// Write a normalized value into `portfolio`
    pub fn apply(&self, portfolio: &mut Portfolio, value: FieldValue) {
        match (self.slot, value) {
            (Slot::Template, FieldValue::Number(n)) => portfolio.template_id = n,
            (Slot::Template, FieldValue::Text(text)) => {
                portfolio.template_id = text.trim().parse().unwrap_or(DEFAULT_TEMPLATE_ID)
            }
            (Slot::Skills, FieldValue::Text(text)) => portfolio.skills = text,
            (Slot::Skills, FieldValue::Number(_)) => portfolio.skills = EMPTY_SKILLS.to_string(),
            (Slot::Text(slot), FieldValue::Text(text)) => *slot(portfolio) = text,
            (Slot::Text(slot), FieldValue::Number(n)) => *slot(portfolio) = n.to_string(),
        }
    }

    /// Put the schema default back
    pub fn reset(&self, portfolio: &mut Portfolio) {
        self.apply(portfolio, self.default_value());
    }

    fn error(&self, reason: &'static str) -> FieldError {
        FieldError {
            field: self.name,
            reason,
        }
    }
}

macro_rules! text_field {
    ($name:ident, $default:expr) => {
        PortfolioField {
            name: stringify!($name),
            default: FieldDefault::Text($default),
            slot: Slot::Text({
                fn slot(p: &mut Portfolio) -> &mut String {
                    &mut p.$name
                }
                slot
            }),
        }
    };
}

/// Every mergeable portfolio field, in form order
pub static FIELDS: &[PortfolioField] = &[
    PortfolioField {
        name: "template_id",
        default: FieldDefault::Number(DEFAULT_TEMPLATE_ID),
        slot: Slot::Template,
    },
    text_field!(full_name, "Your Name"),
    text_field!(company_name, "Your Company"),
    text_field!(job_title, "Your Job Title"),
    text_field!(bio, "A little bit about yourself."),
    text_field!(profile_pic, "/static/images/default_avatar.svg"),
    text_field!(resume_file, "#"),
    text_field!(email, "your.email@example.com"),
    text_field!(phone, "+1 234 567 890"),
    text_field!(linkedin_url, "#"),
    text_field!(github_url, "#"),
    text_field!(twitter_url, "#"),
    PortfolioField {
        name: "skills",
        default: FieldDefault::Text(DEFAULT_SKILLS),
        slot: Slot::Skills,
    },
    text_field!(project1_title, "Project One"),
    text_field!(project1_desc, "Description of your first project."),
    text_field!(project1_link, "#"),
    text_field!(project2_title, "Project Two"),
    text_field!(project2_desc, "Description of your second project."),
    text_field!(project2_link, "#"),
    text_field!(project3_title, "Project Three"),
    text_field!(project3_desc, "Description of your third project."),
    text_field!(project3_link, "#"),
];

/// Look up a mergeable field by name
pub fn lookup(name: &str) -> Option<&'static PortfolioField> {
    FIELDS.iter().find(|field| field.name == name)
}

pub fn encode_skills(skills: &[String]) -> String {
    serde_json::to_string(skills).unwrap_or_else(|_| EMPTY_SKILLS.to_string())
}

pub fn decode_skills(stored: &str) -> Vec<String> {
    serde_json::from_str::<Vec<String>>(stored).unwrap_or_default()
}

/// Canonical stored form of a client skill value
///
/// A list is re-encoded; a string is parsed as an encoded list and
/// re-encoded; anything unparseable becomes the empty list.
pub fn normalize_skills(raw: &Value) -> String {
    match raw {
        Value::Array(items) => encode_skills(&skill_items(items)),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(items)) => encode_skills(&skill_items(&items)),
            _ => EMPTY_SKILLS.to_string(),
        },
        _ => EMPTY_SKILLS.to_string(),
    }
}

fn skill_items(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
        .collect()
}
