//! One row of a protocol: the configuration of one trial.

use super::error::FieldError;
use serde::{Deserialize, Serialize};
use std::any::type_name;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Field name to raw string value.
///
/// Values stay strings until a consumer asks for a typed view, so a
/// malformed field is reported by the machine that needs it, naming the
/// field and the value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrialRecord {
    fields: BTreeMap<String, String>,
}

impl TrialRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse a field that must be present.
    pub fn required<T: FromStr>(&self, field: &str) -> Result<T, FieldError> {
        match self.get(field) {
            Some(raw) => parse(field, raw),
            None => Err(FieldError::Missing {
                field: field.to_string(),
            }),
        }
    }

    /// Parse a field that may be absent. Present but malformed is an error.
    pub fn optional<T: FromStr>(&self, field: &str) -> Result<Option<T>, FieldError> {
        self.get(field).map(|raw| parse(field, raw)).transpose()
    }

    /// Parse a field, falling back to `default` when it is absent.
    pub fn or<T: FromStr>(&self, field: &str, default: T) -> Result<T, FieldError> {
        Ok(self.optional(field)?.unwrap_or(default))
    }

    /// Parse a field, falling back to `T::default()` when it is absent.
    pub fn or_default<T: FromStr + Default>(&self, field: &str) -> Result<T, FieldError> {
        Ok(self.optional(field)?.unwrap_or_default())
    }

    /// A required `true`/`false` field, case-insensitive.
    pub fn flag(&self, field: &str) -> Result<bool, FieldError> {
        match self.get(field) {
            Some(raw) => parse_flag(field, raw),
            None => Err(FieldError::Missing {
                field: field.to_string(),
            }),
        }
    }

    /// An optional `true`/`false` field, case-insensitive.
    pub fn flag_or(&self, field: &str, default: bool) -> Result<bool, FieldError> {
        match self.get(field) {
            Some(raw) => parse_flag(field, raw),
            None => Ok(default),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TrialRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn parse<T: FromStr>(field: &str, raw: &str) -> Result<T, FieldError> {
    raw.trim().parse().map_err(|_| FieldError::Malformed {
        field: field.to_string(),
        value: raw.to_string(),
        expected: short_type_name::<T>().to_string(),
    })
}

pub(crate) fn parse_flag(field: &str, raw: &str) -> Result<bool, FieldError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(FieldError::Malformed {
            field: field.to_string(),
            value: raw.to_string(),
            expected: "true or false".to_string(),
        }),
    }
}

fn short_type_name<T>() -> &'static str {
    let full = type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> TrialRecord {
        TrialRecord::new()
            .with("Trial Type", "Continuous Limb")
            .with("Waves", "3")
            .with("Threat Probability", "0.25")
            .with("Show Feedback", "TRUE")
            .with("Lights", "three")
    }

    #[test]
    fn required_parses_present_fields() {
        let r = record();
        assert_eq!(r.required::<u32>("Waves").unwrap(), 3);
        assert_eq!(r.required::<f32>("Threat Probability").unwrap(), 0.25);
        assert_eq!(
            r.required::<String>("Trial Type").unwrap(),
            "Continuous Limb"
        );
    }

    #[test]
    fn required_reports_missing_and_malformed() {
        let r = record();
        assert_eq!(
            r.required::<u32>("Blocks").unwrap_err(),
            FieldError::Missing {
                field: "Blocks".into()
            }
        );
        assert_eq!(
            r.required::<u32>("Lights").unwrap_err(),
            FieldError::Malformed {
                field: "Lights".into(),
                value: "three".into(),
                expected: "u32".into(),
            }
        );
    }

    #[test]
    fn defaults_apply_only_when_absent() {
        let r = record();
        assert_eq!(r.or("Blocks", 2u32).unwrap(), 2);
        assert_eq!(r.or_default::<u32>("Blocks").unwrap(), 0);
        assert_eq!(r.or("Waves", 9u32).unwrap(), 3);
        assert!(r.or("Lights", 4u32).is_err());
        assert_eq!(r.optional::<u32>("Blocks").unwrap(), None);
    }

    #[test]
    fn flags_are_case_insensitive_and_strict() {
        let r = record().with("Haptics", "maybe");
        assert!(r.flag("Show Feedback").unwrap());
        assert!(!r.flag_or("Mirror", false).unwrap());
        assert!(r.flag("Haptics").is_err());
        assert!(r.flag("Mirror").is_err());
    }

    #[test]
    fn serializes_as_plain_map() {
        let r: TrialRecord = [("a", "1"), ("b", "x")].into_iter().collect();
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"a":"1","b":"x"}"#);
    }
}
