//! balances the charge fold reads: live from the ledger, or simulated for projections

use chrono::NaiveDate;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use crate::case::AccountResolver;
use crate::charges::ChargeDefinition;
use crate::decimal::Money;
use crate::errors::Result;
use crate::ledger::Ledger;
use crate::types::{AccountDesignator, AccountSign, Action};

pub trait RunningBalances {
    /// natural balance of a single account
    fn account_balance(&self, designator: AccountDesignator) -> Result<Money>;

    /// amount accrued for an accrued charge and not yet settled
    fn accrued_balance_for_charge(&self, definition: &ChargeDefinition) -> Result<Money>;

    /// date the case was first disbursed, if it has been
    fn start_of_term(&self) -> Result<Option<NaiveDate>>;

    /// balance of a designator, summing the members of a ledger group
    fn ledger_balance(&self, designator: AccountDesignator) -> Result<Money> {
        designator
            .members()
            .into_iter()
            .map(|member| self.account_balance(member))
            .sum()
    }
}

/// balances read from the system of record
///
/// every account is read at most once per request so the fold sees one
/// consistent snapshot
pub struct LedgerRunningBalances<'a, L: Ledger + ?Sized> {
    ledger: &'a L,
    resolver: &'a AccountResolver,
    cache: RefCell<HashMap<AccountDesignator, Money>>,
}

impl<'a, L: Ledger + ?Sized> LedgerRunningBalances<'a, L> {
    pub fn new(ledger: &'a L, resolver: &'a AccountResolver) -> Self {
        Self {
            ledger,
            resolver,
            cache: RefCell::new(HashMap::new()),
        }
    }
}

impl<L: Ledger + ?Sized> RunningBalances for LedgerRunningBalances<'_, L> {
    fn account_balance(&self, designator: AccountDesignator) -> Result<Money> {
        if designator.is_ledger() {
            return self.ledger_balance(designator);
        }
        if let Some(balance) = self.cache.borrow().get(&designator) {
            return Ok(*balance);
        }

        let account = self.resolver.resolve_or_err(designator)?;
        let balance = Money::from_decimal(self.ledger.current_balance(account)?);
        self.cache.borrow_mut().insert(designator, balance);
        Ok(balance)
    }

    fn accrued_balance_for_charge(&self, definition: &ChargeDefinition) -> Result<Money> {
        let (Some(accrue_action), Some(accrual_designator)) =
            (definition.accrue_action, definition.accrual_account_designator)
        else {
            return Ok(Money::ZERO);
        };
        let Some(start) = self.start_of_term()? else {
            return Ok(Money::ZERO);
        };

        let account = self.resolver.resolve_or_err(accrual_designator)?;
        let accrued = self
            .ledger
            .sum_matching_entries_since(account, start, accrue_action.message())?;
        let settled = self
            .ledger
            .sum_matching_entries_since(account, start, definition.charge_action.message())?;

        Ok(Money::from_decimal(accrued - settled))
    }

    fn start_of_term(&self) -> Result<Option<NaiveDate>> {
        let principal = self.resolver.resolve_or_err(AccountDesignator::CustomerLoanPrincipal)?;
        Ok(self
            .ledger
            .oldest_entry_date(principal, Action::Disburse.message())?
            .map(|at| at.date_naive()))
    }
}

/// balances of a case that only exists on paper
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulatedRunningBalances {
    balances: BTreeMap<AccountDesignator, Money>,
    accrued: HashMap<String, Money>,
    start: Option<NaiveDate>,
}

impl SimulatedRunningBalances {
    pub fn new(start: Option<NaiveDate>) -> Self {
        Self {
            start,
            ..Self::default()
        }
    }

    pub fn with_balance(mut self, designator: AccountDesignator, balance: Money) -> Self {
        self.balances.insert(designator, balance);
        self
    }

    /// move natural balances by a pass's signed adjustments (credits positive)
    pub fn apply(&mut self, adjustments: &BTreeMap<AccountDesignator, Money>) {
        for (designator, adjustment) in adjustments {
            let balance = self.balances.entry(*designator).or_insert(Money::ZERO);
            match designator.sign() {
                AccountSign::DebitNormal => *balance -= *adjustment,
                AccountSign::CreditNormal => *balance += *adjustment,
            }
        }
    }

    pub fn record_accrual(&mut self, charge_identifier: &str, amount: Money) {
        *self.accrued.entry(charge_identifier.to_string()).or_insert(Money::ZERO) += amount;
    }

    pub fn snapshot(&self) -> BTreeMap<AccountDesignator, Money> {
        self.balances.clone()
    }
}

impl RunningBalances for SimulatedRunningBalances {
    fn account_balance(&self, designator: AccountDesignator) -> Result<Money> {
        if designator.is_ledger() {
            return self.ledger_balance(designator);
        }
        Ok(self.balances.get(&designator).copied().unwrap_or(Money::ZERO))
    }

    fn accrued_balance_for_charge(&self, definition: &ChargeDefinition) -> Result<Money> {
        Ok(self
            .accrued
            .get(&definition.identifier)
            .copied()
            .unwrap_or(Money::ZERO))
    }

    fn start_of_term(&self) -> Result<Option<NaiveDate>> {
        Ok(self.start)
    }
}
