use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::{CostComponent, Payment};
use crate::balances::RunningBalances;
use crate::charges::{defaults, ChargeDefinition, PostingKind, ScheduledCharge};
use crate::decimal::Money;
use crate::errors::Result;
use crate::types::{AccountDesignator, AccountSign, Action};

/// immutable accumulator threaded through the charge fold
///
/// adjustments are signed per designator: a debit is negative and a credit
/// positive. what a charge can actually move is capped by the economic sign of
/// the accounts it touches; whatever cannot be moved is simply not charged
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentBuilder {
    minor_currency_unit_digits: u32,
    entry_limit: Option<Money>,
    accrual_accounting: bool,
    balance_adjustments: BTreeMap<AccountDesignator, Money>,
    components: Vec<(Arc<ChargeDefinition>, Money)>,
}

impl PaymentBuilder {
    /// `entry_limit` caps the total debited from the entry account in this pass
    pub fn new(minor_currency_unit_digits: u32, entry_limit: Option<Money>) -> Self {
        Self {
            minor_currency_unit_digits,
            entry_limit,
            accrual_accounting: true,
            balance_adjustments: BTreeMap::new(),
            components: Vec::new(),
        }
    }

    pub fn with_accrual_accounting(mut self, accrual_accounting: bool) -> Self {
        self.accrual_accounting = accrual_accounting;
        self
    }

    pub fn accrual_accounting(&self) -> bool {
        self.accrual_accounting
    }

    pub fn balance_adjustment(&self, designator: AccountDesignator) -> Money {
        designator
            .members()
            .iter()
            .map(|m| self.balance_adjustments.get(m).copied().unwrap_or(Money::ZERO))
            .sum()
    }

    pub fn balance_adjustments(&self) -> &BTreeMap<AccountDesignator, Money> {
        &self.balance_adjustments
    }

    /// natural balance after this pass's adjustments
    pub fn effective_balance(&self, designator: AccountDesignator, balances: &dyn RunningBalances) -> Result<Money> {
        let balance = balances.account_balance(designator)?;
        let adjustment = self.balance_adjustment(designator);
        Ok(match designator.sign() {
            AccountSign::DebitNormal => balance - adjustment,
            AccountSign::CreditNormal => balance + adjustment,
        })
    }

    /// what the payment budget still allows to be debited from the entry account
    pub fn remaining_entry_budget(&self) -> Option<Money> {
        self.entry_limit
            .map(|limit| (limit + self.balance_adjustment(AccountDesignator::Entry)).max(Money::ZERO))
    }

    /// accounts a charge moves money between under the current accounting basis
    fn posting_accounts(&self, charge: &ScheduledCharge) -> Option<(AccountDesignator, AccountDesignator)> {
        let definition = &charge.definition;
        match (definition.accrual_account_designator, charge.kind) {
            (Some(accrual), PostingKind::Accrual) if self.accrual_accounting => {
                Some((definition.from_account_designator, accrual))
            }
            (Some(accrual), PostingKind::Settlement) if self.accrual_accounting => {
                Some((accrual, definition.to_account_designator))
            }
            // cash basis recognizes an accrued charge when it accrues
            (Some(_), PostingKind::Accrual) => {
                Some((definition.from_account_designator, definition.to_account_designator))
            }
            (Some(_), PostingKind::Settlement) => None,
            (None, _) => Some((definition.from_account_designator, definition.to_account_designator)),
        }
    }

    fn debit_room(&self, designator: AccountDesignator, balances: &dyn RunningBalances) -> Result<Option<Money>> {
        if designator == AccountDesignator::Entry {
            return Ok(self.remaining_entry_budget());
        }
        match designator.sign() {
            AccountSign::DebitNormal => Ok(None),
            AccountSign::CreditNormal => Ok(Some(self.effective_balance(designator, balances)?)),
        }
    }

    fn credit_room(&self, designator: AccountDesignator, balances: &dyn RunningBalances) -> Result<Option<Money>> {
        if designator == AccountDesignator::Entry {
            return Ok(None);
        }
        match designator.sign() {
            AccountSign::DebitNormal => Ok(Some(self.effective_balance(designator, balances)?)),
            AccountSign::CreditNormal => Ok(None),
        }
    }

    /// fold one charge into the payment, returning the amount actually moved
    pub fn adjust_balances(
        self,
        charge: &ScheduledCharge,
        amount: Money,
        balances: &dyn RunningBalances,
    ) -> Result<(Self, Money)> {
        let mut builder = self.register(&charge.definition);
        if charge.definition.identifier == defaults::PAYMENT_ID {
            return Ok((builder, Money::ZERO));
        }

        let Some((from, to)) = builder.posting_accounts(charge) else {
            return Ok((builder, Money::ZERO));
        };
        if !amount.is_positive() {
            return Ok((builder, Money::ZERO));
        }

        let mut realized = amount;
        if let Some(room) = builder.debit_room(from, balances)? {
            realized = realized.min(room);
        }
        if let Some(room) = builder.credit_room(to, balances)? {
            realized = realized.min(room);
        }
        let realized = realized.max(Money::ZERO).round_to_minor(builder.minor_currency_unit_digits);

        if realized < amount {
            tracing::debug!(
                charge = %charge.definition.identifier,
                requested = %amount,
                realized = %realized,
                "charge capped by account balance"
            );
        }

        if realized.is_positive() {
            *builder.balance_adjustments.entry(from).or_insert(Money::ZERO) -= realized;
            *builder.balance_adjustments.entry(to).or_insert(Money::ZERO) += realized;
            builder.add_to_component(&charge.definition.identifier, realized);
        }

        Ok((builder, realized))
    }

    /// make sure a charge shows up in the payment even when nothing moved
    pub fn register(mut self, definition: &Arc<ChargeDefinition>) -> Self {
        let known = self
            .components
            .iter()
            .any(|(d, _)| d.identifier == definition.identifier);
        if !known {
            let zero = Money::ZERO.round_to_minor(self.minor_currency_unit_digits);
            self.components.push((Arc::clone(definition), zero));
        }
        self
    }

    fn add_to_component(&mut self, identifier: &str, amount: Money) {
        if let Some((_, total)) = self.components.iter_mut().find(|(d, _)| d.identifier == identifier) {
            *total += amount;
        }
    }

    /// pay off a leftover principal balance through the entry account
    pub fn fold_residual(mut self, residual: Money) -> Self {
        if residual.is_zero() {
            return self;
        }
        tracing::debug!(%residual, "folding rounding residual into final installment");

        *self
            .balance_adjustments
            .entry(AccountDesignator::Entry)
            .or_insert(Money::ZERO) -= residual;
        *self
            .balance_adjustments
            .entry(AccountDesignator::CustomerLoanPrincipal)
            .or_insert(Money::ZERO) += residual;

        let repay_principal = self
            .components
            .iter()
            .any(|(d, _)| d.identifier == defaults::REPAY_PRINCIPAL_ID);
        if repay_principal {
            self.add_to_component(defaults::REPAY_PRINCIPAL_ID, residual);
        } else {
            let definition = Arc::new(ChargeDefinition::fixed(
                defaults::REPAY_PRINCIPAL_ID,
                "Repay principal",
                Action::AcceptPayment,
                Decimal::ZERO,
                AccountDesignator::Entry,
                AccountDesignator::CustomerLoanPrincipal,
            ));
            self.components.push((definition, residual));
        }
        self
    }

    /// the collected installment: everything debited from the entry account
    fn realized_payment(&self) -> Money {
        (-self.balance_adjustment(AccountDesignator::Entry))
            .max(Money::ZERO)
            .round_to_minor(self.minor_currency_unit_digits)
    }

    /// assemble the payment, optionally restricted to charges touching the given designators
    pub fn build(&self, for_designators: Option<&BTreeSet<AccountDesignator>>, date: Option<NaiveDate>) -> Payment {
        let wanted: Option<BTreeSet<AccountDesignator>> =
            for_designators.map(|set| set.iter().flat_map(|d| d.members()).collect());
        let touches = |designator: AccountDesignator| match &wanted {
            None => true,
            Some(set) => designator.members().iter().any(|m| set.contains(m)),
        };

        let payment_amount = self.realized_payment();
        let cost_components = self
            .components
            .iter()
            .filter(|(definition, _)| definition.designators().any(|d| touches(d)))
            .map(|(definition, amount)| CostComponent {
                charge_identifier: definition.identifier.clone(),
                amount: if definition.identifier == defaults::PAYMENT_ID {
                    payment_amount
                } else {
                    *amount
                },
            })
            .collect();

        let balance_adjustments = self
            .balance_adjustments
            .iter()
            .filter(|(designator, adjustment)| !adjustment.is_zero() && touches(**designator))
            .map(|(designator, adjustment)| (*designator, *adjustment))
            .collect();

        Payment {
            cost_components,
            balance_adjustments,
            date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balances::SimulatedRunningBalances;
    use crate::charges::ChargeResolver;
    use crate::schedule::{Period, ScheduledAction};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn accept_payment_charges() -> Vec<ScheduledCharge> {
        let period = Period::new(date(2024, 1, 15), date(2024, 2, 15)).unwrap();
        let action = ScheduledAction::new(Action::AcceptPayment, period.end(), Some(period), Some(period));
        ChargeResolver::new(&defaults::default_charge_definitions(), &[])
            .unwrap()
            .resolve(&[action])
    }

    fn charge(charges: &[ScheduledCharge], identifier: &str) -> ScheduledCharge {
        charges
            .iter()
            .find(|c| c.definition.identifier == identifier)
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_debit_capped_at_accrual_balance() {
        let charges = accept_payment_charges();
        let interest = charge(&charges, defaults::INTEREST_ID);
        let balances = SimulatedRunningBalances::new(None)
            .with_balance(AccountDesignator::InterestAccrual, Money::from_major(50));

        let (builder, realized) = PaymentBuilder::new(2, None)
            .adjust_balances(&interest, Money::from_major(80), &balances)
            .unwrap();

        assert_eq!(realized, Money::from_major(50));
        assert_eq!(builder.balance_adjustment(AccountDesignator::InterestAccrual), Money::from_major(-50));
        assert_eq!(builder.balance_adjustment(AccountDesignator::InterestIncome), Money::from_major(50));
    }

    #[test]
    fn test_entry_budget_caps_payment_charges() {
        let charges = accept_payment_charges();
        let balances = SimulatedRunningBalances::new(None)
            .with_balance(AccountDesignator::CustomerLoanPrincipal, Money::from_major(1_000))
            .with_balance(AccountDesignator::CustomerLoanInterest, Money::from_major(30));

        let builder = PaymentBuilder::new(2, Some(Money::from_major(100)));
        let (builder, paid_interest) = builder
            .adjust_balances(&charge(&charges, defaults::REPAY_INTEREST_ID), Money::from_major(30), &balances)
            .unwrap();
        let (builder, paid_principal) = builder
            .adjust_balances(&charge(&charges, defaults::REPAY_PRINCIPAL_ID), Money::from_major(100), &balances)
            .unwrap();

        assert_eq!(paid_interest, Money::from_major(30));
        assert_eq!(paid_principal, Money::from_major(70));
        assert_eq!(builder.remaining_entry_budget(), Some(Money::ZERO));

        let payment = builder.build(None, None);
        assert_eq!(payment.component(defaults::REPAY_PRINCIPAL_ID), Some(Money::from_major(70)));
        assert_eq!(payment.balance_adjustment(AccountDesignator::Entry), Money::from_major(-100));
    }

    #[test]
    fn test_credit_capped_at_receivable_balance() {
        let charges = accept_payment_charges();
        let balances = SimulatedRunningBalances::new(None)
            .with_balance(AccountDesignator::CustomerLoanPrincipal, Money::from_major(40));

        let (_, realized) = PaymentBuilder::new(2, None)
            .adjust_balances(&charge(&charges, defaults::REPAY_PRINCIPAL_ID), Money::from_major(100), &balances)
            .unwrap();
        assert_eq!(realized, Money::from_major(40));
    }

    #[test]
    fn test_cash_basis_skips_settlement_of_accrued_charge() {
        let charges = accept_payment_charges();
        let balances = SimulatedRunningBalances::new(None)
            .with_balance(AccountDesignator::InterestAccrual, Money::from_major(50));

        let (builder, realized) = PaymentBuilder::new(2, None)
            .with_accrual_accounting(false)
            .adjust_balances(&charge(&charges, defaults::INTEREST_ID), Money::from_major(10), &balances)
            .unwrap();

        assert_eq!(realized, Money::ZERO);
        assert!(builder.balance_adjustments().is_empty());
        assert_eq!(builder.build(None, None).component(defaults::INTEREST_ID), Some(Money::ZERO));
    }

    #[test]
    fn test_build_filters_by_designator() {
        let charges = accept_payment_charges();
        let balances = SimulatedRunningBalances::new(None)
            .with_balance(AccountDesignator::CustomerLoanPrincipal, Money::from_major(1_000))
            .with_balance(AccountDesignator::InterestAccrual, Money::from_decimal(dec!(9.86)));

        let mut builder = PaymentBuilder::new(2, None);
        for c in &charges {
            let amount = match c.definition.identifier.as_str() {
                defaults::INTEREST_ID => Money::from_decimal(dec!(9.86)),
                defaults::REPAY_PRINCIPAL_ID => Money::from_major(100),
                _ => Money::ZERO,
            };
            builder = builder.adjust_balances(c, amount, &balances).unwrap().0;
        }

        let only_income: BTreeSet<_> = [AccountDesignator::InterestIncome].into_iter().collect();
        let payment = builder.build(Some(&only_income), None);
        let ids: Vec<&str> = payment
            .cost_components
            .iter()
            .map(|c| c.charge_identifier.as_str())
            .collect();
        assert_eq!(ids, vec![defaults::INTEREST_ID]);
        assert_eq!(payment.balance_adjustments.len(), 1);

        let all = builder.build(None, None);
        assert_eq!(all.component(defaults::PAYMENT_ID), Some(Money::from_major(100)));
    }
}
