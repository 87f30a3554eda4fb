//! the ledger adapter contract the engine reads balances and history from

pub mod memory;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::decimal::Money;

pub use memory::InMemoryLedger;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("ledger unavailable: {message}")]
    Unavailable {
        message: String,
    },

    #[error("unknown ledger account {account}")]
    UnknownAccount {
        account: String,
    },

    #[error("unbalanced journal entry: debits {debits}, credits {credits}")]
    Unbalanced {
        debits: Money,
        credits: Money,
    },

    #[error("invalid journal entry: {message}")]
    InvalidEntry {
        message: String,
    },
}

/// system of record for loan accounts
///
/// implementations are expected to be thread safe; the engine only ever reads
/// through this trait, posting is done by the caller with the computed payment
pub trait Ledger {
    /// natural balance of an account (positive on the account's normal side)
    fn current_balance(&self, account_identifier: &str) -> Result<Decimal, LedgerError>;

    /// timestamp of the oldest entry touching the account whose message starts with the prefix
    fn oldest_entry_date(
        &self,
        account_identifier: &str,
        message_prefix: &str,
    ) -> Result<Option<DateTime<Utc>>, LedgerError>;

    /// total amount posted to the account by entries carrying the message since the date
    fn sum_matching_entries_since(
        &self,
        account_identifier: &str,
        since: NaiveDate,
        message: &str,
    ) -> Result<Decimal, LedgerError>;

    /// post a balanced entry atomically
    fn post_journal_entry(&self, entry: JournalEntry) -> Result<(), LedgerError>;
}

/// one side of a journal entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub account_identifier: String,
    pub amount: Money,
}

impl Posting {
    pub fn new(account_identifier: impl Into<String>, amount: Money) -> Self {
        Self {
            account_identifier: account_identifier.into(),
            amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub transaction_identifier: Uuid,
    pub transaction_date: NaiveDate,
    pub message: String,
    pub debits: Vec<Posting>,
    pub credits: Vec<Posting>,
}

impl JournalEntry {
    pub fn total_debits(&self) -> Money {
        self.debits.iter().map(|p| p.amount).sum()
    }

    pub fn total_credits(&self) -> Money {
        self.credits.iter().map(|p| p.amount).sum()
    }

    /// reject empty, negative or unbalanced entries
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.debits.is_empty() || self.credits.is_empty() {
            return Err(LedgerError::InvalidEntry {
                message: format!("entry {} needs at least one debit and one credit", self.transaction_identifier),
            });
        }

        if let Some(posting) = self
            .debits
            .iter()
            .chain(self.credits.iter())
            .find(|p| !p.amount.is_positive())
        {
            return Err(LedgerError::InvalidEntry {
                message: format!(
                    "posting to {} must be positive, got {}",
                    posting.account_identifier, posting.amount
                ),
            });
        }

        let debits = self.total_debits();
        let credits = self.total_credits();
        if debits != credits {
            return Err(LedgerError::Unbalanced { debits, credits });
        }

        Ok(())
    }
}
