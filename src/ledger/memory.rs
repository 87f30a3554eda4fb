use chrono::{DateTime, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{JournalEntry, Ledger, LedgerError};
use crate::types::AccountSign;

#[derive(Debug, Clone)]
struct LedgerAccount {
    sign: AccountSign,
    balance: Decimal,
}

#[derive(Debug, Clone)]
struct RecordedEntry {
    entry: JournalEntry,
    recorded_at: DateTime<Utc>,
}

impl RecordedEntry {
    fn amount_posted_to(&self, account_identifier: &str) -> Decimal {
        self.entry
            .debits
            .iter()
            .chain(self.entry.credits.iter())
            .filter(|p| p.account_identifier == account_identifier)
            .map(|p| p.amount.as_decimal())
            .sum()
    }

    fn touches(&self, account_identifier: &str) -> bool {
        self.entry
            .debits
            .iter()
            .chain(self.entry.credits.iter())
            .any(|p| p.account_identifier == account_identifier)
    }
}

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<String, LedgerAccount>,
    entries: Vec<RecordedEntry>,
}

/// in-process ledger used for tests and local simulation
///
/// entries are stamped with the injected time provider so tests can control
/// when history was written
pub struct InMemoryLedger<'t> {
    time: &'t SafeTimeProvider,
    state: RwLock<LedgerState>,
}

impl<'t> InMemoryLedger<'t> {
    pub fn new(time: &'t SafeTimeProvider) -> Self {
        Self {
            time,
            state: RwLock::new(LedgerState::default()),
        }
    }

    /// create an account with a zero balance; reopening keeps the balance
    pub fn open_account(&self, account_identifier: impl Into<String>, sign: AccountSign) -> Result<(), LedgerError> {
        let mut state = self.state.write().map_err(poisoned)?;
        state
            .accounts
            .entry(account_identifier.into())
            .or_insert(LedgerAccount {
                sign,
                balance: Decimal::ZERO,
            });
        Ok(())
    }

    pub fn entry_count(&self) -> Result<usize, LedgerError> {
        Ok(self.state.read().map_err(poisoned)?.entries.len())
    }

    pub fn entries(&self) -> Result<Vec<JournalEntry>, LedgerError> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.entries.iter().map(|r| r.entry.clone()).collect())
    }
}

impl Ledger for InMemoryLedger<'_> {
    fn current_balance(&self, account_identifier: &str) -> Result<Decimal, LedgerError> {
        let state = self.state.read().map_err(poisoned)?;
        state
            .accounts
            .get(account_identifier)
            .map(|a| a.balance)
            .ok_or_else(|| unknown(account_identifier))
    }

    fn oldest_entry_date(
        &self,
        account_identifier: &str,
        message_prefix: &str,
    ) -> Result<Option<DateTime<Utc>>, LedgerError> {
        let state = self.state.read().map_err(poisoned)?;
        if !state.accounts.contains_key(account_identifier) {
            return Err(unknown(account_identifier));
        }
        Ok(state
            .entries
            .iter()
            .filter(|r| r.entry.message.starts_with(message_prefix) && r.touches(account_identifier))
            .map(|r| r.recorded_at)
            .min())
    }

    fn sum_matching_entries_since(
        &self,
        account_identifier: &str,
        since: NaiveDate,
        message: &str,
    ) -> Result<Decimal, LedgerError> {
        let state = self.state.read().map_err(poisoned)?;
        if !state.accounts.contains_key(account_identifier) {
            return Err(unknown(account_identifier));
        }
        Ok(state
            .entries
            .iter()
            .filter(|r| r.entry.message == message && r.recorded_at.date_naive() >= since)
            .map(|r| r.amount_posted_to(account_identifier))
            .sum())
    }

    fn post_journal_entry(&self, entry: JournalEntry) -> Result<(), LedgerError> {
        entry.validate()?;

        let mut state = self.state.write().map_err(poisoned)?;

        // check every account before touching any balance
        if let Some(missing) = entry
            .debits
            .iter()
            .chain(entry.credits.iter())
            .find(|p| !state.accounts.contains_key(&p.account_identifier))
        {
            return Err(unknown(&missing.account_identifier));
        }

        for debit in &entry.debits {
            if let Some(account) = state.accounts.get_mut(&debit.account_identifier) {
                match account.sign {
                    AccountSign::DebitNormal => account.balance += debit.amount.as_decimal(),
                    AccountSign::CreditNormal => account.balance -= debit.amount.as_decimal(),
                }
            }
        }
        for credit in &entry.credits {
            if let Some(account) = state.accounts.get_mut(&credit.account_identifier) {
                match account.sign {
                    AccountSign::DebitNormal => account.balance -= credit.amount.as_decimal(),
                    AccountSign::CreditNormal => account.balance += credit.amount.as_decimal(),
                }
            }
        }

        tracing::debug!(
            action = %entry.message,
            transaction = %entry.transaction_identifier,
            amount = %entry.total_debits(),
            "journal entry posted"
        );

        state.entries.push(RecordedEntry {
            entry,
            recorded_at: self.time.now(),
        });

        Ok(())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> LedgerError {
    LedgerError::Unavailable {
        message: "ledger state lock poisoned".to_string(),
    }
}

fn unknown(account_identifier: &str) -> LedgerError {
    LedgerError::UnknownAccount {
        account: account_identifier.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Money;
    use crate::ledger::Posting;
    use chrono::{Duration, TimeZone};
    use hourglass_rs::TimeSource;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn clock() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
        ))
    }

    fn ledger(time: &SafeTimeProvider) -> InMemoryLedger<'_> {
        let ledger = InMemoryLedger::new(time);
        ledger.open_account("principal", AccountSign::DebitNormal).unwrap();
        ledger.open_account("entry", AccountSign::CreditNormal).unwrap();
        ledger
    }

    fn transfer(message: &str, amount: Decimal) -> JournalEntry {
        JournalEntry {
            transaction_identifier: Uuid::new_v4(),
            transaction_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            message: message.to_string(),
            debits: vec![Posting::new("principal", Money::from_decimal(amount))],
            credits: vec![Posting::new("entry", Money::from_decimal(amount))],
        }
    }

    #[test]
    fn test_posting_moves_natural_balances() {
        let time = clock();
        let ledger = ledger(&time);
        ledger.post_journal_entry(transfer("DISBURSE", dec!(500))).unwrap();

        assert_eq!(ledger.current_balance("principal").unwrap(), dec!(500));
        assert_eq!(ledger.current_balance("entry").unwrap(), dec!(500));
    }

    #[test]
    fn test_unknown_account_leaves_state_untouched() {
        let time = clock();
        let ledger = ledger(&time);
        let mut entry = transfer("DISBURSE", dec!(500));
        entry.credits[0].account_identifier = "nowhere".to_string();

        let err = ledger.post_journal_entry(entry).unwrap_err();
        assert_eq!(err, LedgerError::UnknownAccount { account: "nowhere".to_string() });
        assert_eq!(ledger.current_balance("principal").unwrap(), Decimal::ZERO);
        assert_eq!(ledger.entry_count().unwrap(), 0);
    }

    #[test]
    fn test_oldest_entry_by_prefix() {
        let time = clock();
        let control = time.test_control().unwrap();
        let ledger = ledger(&time);

        assert_eq!(ledger.oldest_entry_date("principal", "DISBURSE").unwrap(), None);

        ledger.post_journal_entry(transfer("DISBURSE", dec!(100))).unwrap();
        control.advance(Duration::days(3));
        ledger.post_journal_entry(transfer("DISBURSE", dec!(100))).unwrap();

        let oldest = ledger.oldest_entry_date("principal", "DISB").unwrap().unwrap();
        assert_eq!(oldest, Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_sum_matching_entries_since() {
        let time = clock();
        let control = time.test_control().unwrap();
        let ledger = ledger(&time);

        ledger.post_journal_entry(transfer("APPLY_INTEREST", dec!(1.25))).unwrap();
        control.advance(Duration::days(1));
        ledger.post_journal_entry(transfer("APPLY_INTEREST", dec!(1.30))).unwrap();
        ledger.post_journal_entry(transfer("ACCEPT_PAYMENT", dec!(9.00))).unwrap();

        let since_start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let since_second = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(
            ledger.sum_matching_entries_since("principal", since_start, "APPLY_INTEREST").unwrap(),
            dec!(2.55)
        );
        assert_eq!(
            ledger.sum_matching_entries_since("entry", since_second, "APPLY_INTEREST").unwrap(),
            dec!(1.30)
        );
    }
}
