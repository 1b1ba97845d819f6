//! Ordered supply of trial records.

use super::error::ProtocolError;
use super::record::TrialRecord;
use super::shuffle::Permutation;
use serde_json::Value;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

/// Where the session root draws its trials from.
pub trait TrialSource {
    fn has_more(&self) -> bool;

    /// Remove and return the next record.
    fn pop(&mut self) -> Result<TrialRecord, ProtocolError>;

    /// Records not yet popped.
    fn count(&self) -> usize;
}

/// In-memory protocol.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrialList {
    records: VecDeque<TrialRecord>,
}

impl TrialList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = TrialRecord>) -> Self {
        Self {
            records: records.into_iter().collect(),
        }
    }

    /// Parse a JSON array of flat objects.
    ///
    /// Scalar values are stringified (`3` becomes `"3"`, `true` becomes
    /// `"true"`); `null` fields are left out so they read as absent.
    pub fn from_json_str(json: &str) -> Result<Self, ProtocolError> {
        let rows: Vec<serde_json::Map<String, Value>> = match serde_json::from_str(json)? {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| match item {
                    Value::Object(map) => Ok(map),
                    _ => Err(ProtocolError::NotAnObject { index }),
                })
                .collect::<Result<_, _>>()?,
            other => return Err(ProtocolError::NotAnArray { found: kind(&other) }),
        };

        let records = rows.into_iter().map(|row| {
            row.into_iter()
                .filter_map(|(field, value)| stringify(value).map(|v| (field, v)))
                .collect::<TrialRecord>()
        });
        Ok(Self::from_records(records))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProtocolError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ProtocolError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn push(&mut self, record: TrialRecord) {
        self.records.push_back(record);
    }

    /// Reorder the remaining records by `order`.
    ///
    /// Indices beyond the list are skipped. Records `order` never names keep
    /// their relative order and follow the reordered ones.
    pub fn reorder(&mut self, order: Permutation) {
        let mut slots: Vec<Option<TrialRecord>> = self.records.drain(..).map(Some).collect();
        let mut records: VecDeque<TrialRecord> = order
            .filter_map(|index| slots.get_mut(index).and_then(Option::take))
            .collect();
        records.extend(slots.into_iter().flatten());
        self.records = records;
    }

    /// Shuffle the remaining records reproducibly.
    pub fn shuffle(&mut self, seed: u64) {
        let order = Permutation::seeded(self.records.len(), seed);
        self.reorder(order);
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrialRecord> {
        self.records.iter()
    }
}

impl TrialSource for TrialList {
    fn has_more(&self) -> bool {
        !self.records.is_empty()
    }

    fn pop(&mut self) -> Result<TrialRecord, ProtocolError> {
        self.records.pop_front().ok_or(ProtocolError::Exhausted)
    }

    fn count(&self) -> usize {
        self.records.len()
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn stringify(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROTOCOL: &str = r#"[
        {"Trial Type": "Continuous Limb", "Waves": 3, "Show Feedback": true},
        {"Trial Type": "Discrete Limb", "Waves": "2", "Notes": null}
    ]"#;

    #[test]
    fn parses_and_stringifies_scalars() {
        let mut list = TrialList::from_json_str(PROTOCOL).unwrap();
        assert_eq!(list.count(), 2);

        let first = list.pop().unwrap();
        assert_eq!(first.get("Waves"), Some("3"));
        assert_eq!(first.get("Show Feedback"), Some("true"));

        let second = list.pop().unwrap();
        assert_eq!(second.required::<u32>("Waves").unwrap(), 2);
        assert!(!second.contains("Notes"));

        assert!(!list.has_more());
        assert!(matches!(list.pop(), Err(ProtocolError::Exhausted)));
    }

    #[test]
    fn rejects_non_object_rows() {
        let err = TrialList::from_json_str(r#"[{"a": 1}, 5]"#).unwrap_err();
        assert!(matches!(err, ProtocolError::NotAnObject { index: 1 }));
        assert!(matches!(
            TrialList::from_json_str("{").unwrap_err(),
            ProtocolError::Parse(_)
        ));
    }

    #[test]
    fn rejects_a_top_level_object() {
        let err = TrialList::from_json_str(r#"{"Waves": 3}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::NotAnArray { found: "an object" }));
        assert_eq!(
            err.to_string(),
            "protocol must be an array of trial records, found an object"
        );
    }

    #[test]
    fn short_order_keeps_the_unlisted_records() {
        let records = (0..5).map(|i| TrialRecord::new().with("Index", i.to_string()));
        let mut list = TrialList::from_records(records);

        list.reorder(Permutation::identity(2));

        let order: Vec<u32> = list
            .iter()
            .map(|r| r.required::<u32>("Index").unwrap())
            .collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);

        let mut partial = TrialList::from_records(
            (0..4).map(|i| TrialRecord::new().with("Index", i.to_string())),
        );
        partial.reorder(Permutation::seeded(2, 11));
        let mut head: Vec<u32> = partial
            .iter()
            .take(2)
            .map(|r| r.required::<u32>("Index").unwrap())
            .collect();
        head.sort_unstable();
        assert_eq!(head, vec![0, 1]);
        let tail: Vec<u32> = partial
            .iter()
            .skip(2)
            .map(|r| r.required::<u32>("Index").unwrap())
            .collect();
        assert_eq!(tail, vec![2, 3]);
        assert_eq!(partial.count(), 4);
    }

    #[test]
    fn load_reports_path() {
        let err = TrialList::load("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }

    #[test]
    fn shuffle_keeps_every_record() {
        let records = (0..10).map(|i| TrialRecord::new().with("Index", i.to_string()));
        let mut list = TrialList::from_records(records);

        list.shuffle(3);

        let mut seen: Vec<u32> = list
            .iter()
            .map(|r| r.required::<u32>("Index").unwrap())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }
}
