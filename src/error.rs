use crate::txo::{ParticipantId, TxoId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The claimed custody chain could not be justified for the requester.
    #[error(
        "participant {requester} may not see txo {id}: chain element {rejected} is not justified (chain: {chain:?})"
    )]
    AccessDenied {
        requester: ParticipantId,
        id: TxoId,
        chain: Vec<TxoId>,
        rejected: TxoId,
    },

    #[error("invariant violated for txo {id}: {check} (expected {expected}, actual {actual})")]
    InvariantViolation {
        id: TxoId,
        check: &'static str,
        expected: String,
        actual: String,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub fn invariant(
        id: TxoId,
        check: &'static str,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        Error::InvariantViolation {
            id,
            check,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn is_access_denied(&self) -> bool {
        matches!(self, Error::AccessDenied { .. })
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Error::InvariantViolation { .. })
    }
}
