use thiserror::Error;

use crate::decimal::Money;
use crate::ledger::LedgerError;
use crate::types::AccountDesignator;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("invalid payment cycle: {message}")]
    InvalidPaymentCycle {
        message: String,
    },

    #[error("no account assigned for designator {designator}")]
    MissingAccountDesignator {
        designator: AccountDesignator,
    },

    #[error("invalid configuration json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid request: {message}")]
    InvalidRequest {
        message: String,
    },

    #[error("disbursal exceeds maximum balance: current {current}, requested {requested}, maximum {maximum}")]
    DisbursalExceedsMaximum {
        current: Money,
        requested: Money,
        maximum: Money,
    },

    #[error("cannot close loan with outstanding balance {balance}")]
    OutstandingBalanceOnClose {
        balance: Money,
    },

    #[error("loan has not been disbursed")]
    NotDisbursed,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("calculation error: {message}")]
    CalculationError {
        message: String,
    },
}

/// coarse classification callers use to decide how to report an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Request,
    Conflict,
    Ledger,
    Calculation,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidConfiguration { .. }
            | EngineError::InvalidPaymentCycle { .. }
            | EngineError::MissingAccountDesignator { .. }
            | EngineError::Json(_) => ErrorKind::Configuration,
            EngineError::InvalidRequest { .. } => ErrorKind::Request,
            EngineError::DisbursalExceedsMaximum { .. }
            | EngineError::OutstandingBalanceOnClose { .. }
            | EngineError::NotDisbursed => ErrorKind::Conflict,
            EngineError::Ledger(_) => ErrorKind::Ledger,
            EngineError::CalculationError { .. } => ErrorKind::Calculation,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        EngineError::InvalidConfiguration { message: message.into() }
    }

    pub(crate) fn cycle(message: impl Into<String>) -> Self {
        EngineError::InvalidPaymentCycle { message: message.into() }
    }

    pub(crate) fn calculation(message: impl Into<String>) -> Self {
        EngineError::CalculationError { message: message.into() }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(EngineError::NotDisbursed.kind(), ErrorKind::Conflict);
        assert_eq!(EngineError::cycle("bad week").kind(), ErrorKind::Configuration);
        assert_eq!(
            EngineError::Ledger(LedgerError::Unavailable { message: "timeout".into() }).kind(),
            ErrorKind::Ledger
        );
        assert!(EngineError::OutstandingBalanceOnClose { balance: Money::from_major(5) }.is_conflict());
    }

    #[test]
    fn test_ledger_error_is_transparent() {
        let err: EngineError = LedgerError::UnknownAccount { account: "7010".into() }.into();
        assert_eq!(err.to_string(), "unknown ledger account 7010");
    }
}
