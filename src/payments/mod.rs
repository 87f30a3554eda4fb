pub mod amortization;
pub mod builder;
pub mod plan;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::case::AccountResolver;
use crate::decimal::Money;
use crate::errors::Result;
use crate::ledger::{JournalEntry, Posting};
use crate::types::{AccountDesignator, Action};

pub use amortization::{annuity_payment, loan_payment_size};
pub use builder::PaymentBuilder;
pub use plan::{planned_payments, project_schedule};

/// amount computed for one charge, at the product's minor currency scale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostComponent {
    pub charge_identifier: String,
    pub amount: Money,
}

/// outcome of one action: what each charge costs and how every account moves
///
/// balance adjustments are signed, credits positive and debits negative
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub cost_components: Vec<CostComponent>,
    pub balance_adjustments: BTreeMap<AccountDesignator, Money>,
    pub date: Option<NaiveDate>,
}

impl Payment {
    pub fn component(&self, charge_identifier: &str) -> Option<Money> {
        self.cost_components
            .iter()
            .find(|c| c.charge_identifier == charge_identifier)
            .map(|c| c.amount)
    }

    pub fn balance_adjustment(&self, designator: AccountDesignator) -> Money {
        designator
            .members()
            .iter()
            .filter_map(|m| self.balance_adjustments.get(m))
            .sum()
    }

    /// total of all components, the synthetic payment excluded
    pub fn total_charged(&self) -> Money {
        self.cost_components
            .iter()
            .filter(|c| c.charge_identifier != crate::charges::defaults::PAYMENT_ID)
            .map(|c| c.amount)
            .sum()
    }

    /// the balanced entry a caller posts for this payment; `None` when nothing moves
    pub fn journal_entry(
        &self,
        resolver: &AccountResolver,
        action: Action,
        transaction_identifier: Uuid,
        transaction_date: NaiveDate,
    ) -> Result<Option<JournalEntry>> {
        let mut debits = Vec::new();
        let mut credits = Vec::new();

        for (designator, adjustment) in &self.balance_adjustments {
            if designator.is_ledger() || adjustment.is_zero() {
                continue;
            }
            let account = resolver.resolve_or_err(*designator)?;
            if adjustment.is_negative() {
                debits.push(Posting::new(account, -*adjustment));
            } else {
                credits.push(Posting::new(account, *adjustment));
            }
        }

        if debits.is_empty() && credits.is_empty() {
            return Ok(None);
        }

        let entry = JournalEntry {
            transaction_identifier,
            transaction_date,
            message: action.message().to_string(),
            debits,
            credits,
        };
        entry.validate()?;
        Ok(Some(entry))
    }
}

/// one row of the disclosed amortization table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedPayment {
    pub payment: Payment,
    pub remaining_principal: Money,
    /// simulated natural balances after the payment
    pub balances: BTreeMap<AccountDesignator, Money>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChargeName {
    pub identifier: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedPaymentPage {
    pub elements: Vec<PlannedPayment>,
    pub total_elements: usize,
    pub total_pages: usize,
    pub charge_names: Vec<ChargeName>,
}
