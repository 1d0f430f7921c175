use std::fmt::{self, Display};

/// Why a value was refused by a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationReason {
    /// Null assigned to a non nullable field without a default.
    Null,
    NotInChoices,
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
    Empty,
    TooLong {
        max_length: usize,
        length: usize,
    },
    /// Text could not be parsed into the field type.
    Malformed(String),
    /// No row of the referenced table matches the key.
    NotFound,
    /// A raw key was assigned to a reference field with no way to look it up.
    Unresolved,
    /// The referenced record does not have a primary key value yet.
    MissingKey,
    ForeignSchema {
        expected: String,
        found: String,
    },
}

impl Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationReason::Null => f.write_str("null is not allowed"),
            ValidationReason::NotInChoices => f.write_str("not one of the permitted choices"),
            ValidationReason::WrongType { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
            ValidationReason::Empty => f.write_str("empty text is not accepted"),
            ValidationReason::TooLong { max_length, length } => {
                write!(f, "{} characters exceed the maximum of {}", length, max_length)
            }
            ValidationReason::Malformed(e) => write!(f, "malformed input ({})", e),
            ValidationReason::NotFound => f.write_str("no referenced row matches"),
            ValidationReason::Unresolved => {
                f.write_str("a reference needs a record or a lookup through a record")
            }
            ValidationReason::MissingKey => f.write_str("the referenced record has no key"),
            ValidationReason::ForeignSchema { expected, found } => {
                write!(f, "expected a record of `{}`, found `{}`", expected, found)
            }
        }
    }
}

/// A value was rejected by a field, the stored value did not change.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Field `{field}` rejected `{value}`: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub value: String,
    pub reason: ValidationReason,
}

/// Execution was attempted on a connection that is not established.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Not connected to {backend}: {reason}")]
pub struct NotConnectedError {
    pub backend: String,
    pub reason: String,
}

/// The backend refused a write because of a unique constraint.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Duplicate key in `{table}`: {message}")]
pub struct DuplicateKeyError {
    pub table: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotSavedReason {
    DuplicateKey,
    /// UPDATE requested for a record that was never loaded or saved.
    MissingSnapshot,
}

impl Display for NotSavedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NotSavedReason::DuplicateKey => "duplicate key",
            NotSavedReason::MissingSnapshot => "no snapshot to identify the row",
        })
    }
}

/// Save aborted.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Record of `{table}` was not saved: {reason}")]
pub struct ObjectNotSavedError {
    pub table: String,
    pub reason: NotSavedReason,
}
