//! Error types and result alias for the crate.
//!
//! This module defines [`enum@crate::error::Error`] and the crate-wide [Result] alias. Variants cover
//! invalid replicator configuration, malformed post-spawn behaviors, records without a
//! resolvable parent, unknown names and ids, and generic errors.
use thiserror::Error;

use crate::entity::RecordId;

pub type Result<T> = std::result::Result<T, Error>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid behavior spec: {0}")]
    InvalidBehaviorSpec(String),

    #[error("invalid parent: {0}")]
    InvalidParent(String),

    #[error("unknown record {id}")]
    UnknownRecord { id: RecordId },

    #[error("unknown strategy '{name}'")]
    UnknownStrategy { name: String },

    #[error("unknown behavior '{name}'")]
    UnknownBehavior { name: String },

    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::Other(value)
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::Other(value.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_string_uses_other_variant() {
        let err: Error = String::from("boom").into();
        matches!(err, Error::Other(_))
            .then_some(())
            .expect("expected Other variant");
    }

    #[test]
    fn unknown_record_reports_id() {
        let err = Error::UnknownRecord { id: RecordId(7) };
        assert_eq!(err.to_string(), "unknown record #7");
    }

    #[test]
    fn behavior_errors_carry_message() {
        let err = Error::InvalidBehaviorSpec("missing 'duration'".into());
        assert_eq!(err.to_string(), "invalid behavior spec: missing 'duration'");
    }
}
