//! Declared shape of a trial record, checked before a trial is prepared.
//!
//! Checking uses `Validation` so that every bad field is reported at once:
//! an experimenter fixing a protocol file sees the whole list, not just the
//! first problem.

use super::error::{FieldError, ProtocolError};
use super::record::{parse_flag, TrialRecord};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Expected kind of a field's value.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    Integer,
    Float,
    Flag,
    Text,
    /// One of a fixed set of spellings, compared exactly.
    OneOf(Vec<String>),
}

impl FieldKind {
    fn describe(&self) -> String {
        match self {
            FieldKind::Integer => "an integer".to_string(),
            FieldKind::Float => "a number".to_string(),
            FieldKind::Flag => "true or false".to_string(),
            FieldKind::Text => "text".to_string(),
            FieldKind::OneOf(options) => format!("one of [{}]", options.join(", ")),
        }
    }

    fn accepts(&self, field: &str, raw: &str) -> bool {
        match self {
            FieldKind::Integer => raw.trim().parse::<i64>().is_ok(),
            FieldKind::Float => raw.trim().parse::<f64>().is_ok(),
            FieldKind::Flag => parse_flag(field, raw).is_ok(),
            FieldKind::Text => true,
            FieldKind::OneOf(options) => options.iter().any(|o| o == raw.trim()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
struct FieldSpec {
    name: String,
    kind: FieldKind,
    required: bool,
}

/// Fields a trial machine reads at start.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordSchema {
    fields: Vec<FieldSpec>,
}

impl RecordSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            kind,
            required: true,
        });
        self
    }

    pub fn optional(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            kind,
            required: false,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check every declared field, accumulating ALL failures.
    pub fn validate(&self, record: &TrialRecord) -> Validation<(), NonEmptyVec<FieldError>> {
        let checks: Vec<Validation<(), NonEmptyVec<FieldError>>> = self
            .fields
            .iter()
            .map(|spec| check_field(spec, record))
            .collect();

        Validation::all_vec(checks).map(|_| ())
    }

    /// `validate`, flattened into a `Result` for use with `?`.
    pub fn check(&self, record: &TrialRecord) -> Result<(), ProtocolError> {
        match self.validate(record) {
            Validation::Success(_) => Ok(()),
            Validation::Failure(errors) => {
                Err(ProtocolError::Rejected(errors.iter().cloned().collect()))
            }
        }
    }
}

fn check_field(spec: &FieldSpec, record: &TrialRecord) -> Validation<(), NonEmptyVec<FieldError>> {
    match record.get(&spec.name) {
        None if spec.required => Validation::fail(FieldError::Missing {
            field: spec.name.clone(),
        }),
        None => Validation::success(()),
        Some(raw) if spec.kind.accepts(&spec.name, raw) => Validation::success(()),
        Some(raw) => Validation::fail(FieldError::Malformed {
            field: spec.name.clone(),
            value: raw.to_string(),
            expected: spec.kind.describe(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> RecordSchema {
        RecordSchema::new()
            .required(
                "Trial Type",
                FieldKind::OneOf(vec!["Continuous Limb".into(), "Discrete Limb".into()]),
            )
            .required("Waves", FieldKind::Integer)
            .required("Threat Probability", FieldKind::Float)
            .optional("Show Feedback", FieldKind::Flag)
            .optional("Notes", FieldKind::Text)
    }

    #[test]
    fn valid_record_passes() {
        let record = TrialRecord::new()
            .with("Trial Type", "Discrete Limb")
            .with("Waves", "4")
            .with("Threat Probability", "0.5");

        assert!(schema().validate(&record).is_success());
        assert!(schema().check(&record).is_ok());
    }

    #[test]
    fn validation_accumulates_all_errors() {
        let record = TrialRecord::new()
            .with("Trial Type", "Ballistic")
            .with("Threat Probability", "high")
            .with("Show Feedback", "yes");

        match schema().validate(&record) {
            Validation::Failure(errors) => {
                assert_eq!(errors.len(), 4);

                let missing_waves = errors
                    .iter()
                    .any(|e| matches!(e, FieldError::Missing { field } if field == "Waves"));
                let bad_type = errors.iter().any(|e| e.field() == "Trial Type");
                let bad_probability = errors.iter().any(|e| e.field() == "Threat Probability");
                let bad_flag = errors.iter().any(|e| e.field() == "Show Feedback");

                assert!(missing_waves);
                assert!(bad_type);
                assert!(bad_probability);
                assert!(bad_flag);
            }
            Validation::Success(_) => panic!("Expected failures, got success"),
        }
    }

    #[test]
    fn check_reports_rejected_record() {
        let record = TrialRecord::new().with("Trial Type", "Discrete Limb");

        let err = schema().check(&record).unwrap_err();
        match err {
            ProtocolError::Rejected(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }
}
