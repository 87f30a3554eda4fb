use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::instrument;

use super::{ChargeName, PaymentBuilder, PlannedPayment, PlannedPaymentPage};
use crate::balances::{RunningBalances, SimulatedRunningBalances};
use crate::case::CaseContext;
use crate::charges::{defaults, ChargeResolver};
use crate::costs::{apply_scheduled_charges, contractual_payment_size, ChargeBasis};
use crate::decimal::Money;
use crate::errors::{EngineError, Result};
use crate::types::{AccountDesignator, Action};

/// one page of the disclosed amortization table of a case disbursed on `initial_disbursal_date`
#[instrument(
    name = "loan_engine.plan.project",
    skip(case),
    fields(case_id = %case.case_id),
    err
)]
pub fn project_schedule(
    case: &CaseContext,
    initial_disbursal_date: NaiveDate,
    page_index: usize,
    page_size: usize,
) -> Result<PlannedPaymentPage> {
    if page_size == 0 {
        return Err(EngineError::InvalidRequest {
            message: "page size must be at least one".to_string(),
        });
    }

    let planned = planned_payments(case, initial_disbursal_date)?;
    let total_elements = planned.len();
    let total_pages = total_elements.div_ceil(page_size);

    let elements: Vec<PlannedPayment> = planned
        .into_iter()
        .skip(page_index.saturating_mul(page_size))
        .take(page_size)
        .collect();

    let resolver = case.charge_resolver()?;
    let charge_names = charge_names(&elements, &resolver);

    Ok(PlannedPaymentPage {
        elements,
        total_elements,
        total_pages,
        charge_names,
    })
}

/// the whole projected schedule: the disbursal followed by one row per repayment period
///
/// runs on simulated balances in cash mode and ends with the principal at zero
pub fn planned_payments(case: &CaseContext, initial_disbursal_date: NaiveDate) -> Result<Vec<PlannedPayment>> {
    let schedule = case.schedule(initial_disbursal_date)?;
    let resolver = case.charge_resolver()?;
    let digits = case.minor_currency_unit_digits();
    let maximum_balance = case.parameters.maximum_balance;
    let payment_size = contractual_payment_size(case, &resolver, initial_disbursal_date)?;
    let actions = schedule.scheduled_actions()?;

    let mut balances = SimulatedRunningBalances::new(Some(initial_disbursal_date));
    let mut planned = Vec::with_capacity(schedule.number_of_periods() + 1);

    let opening: Vec<_> = actions
        .iter()
        .filter(|a| a.when == initial_disbursal_date)
        .filter(|a| matches!(a.action, Action::Open | Action::Approve | Action::Disburse))
        .copied()
        .collect();
    let basis = ChargeBasis {
        maximum_balance,
        interest_rate: case.parameters.interest_rate,
        payment_size: maximum_balance,
        principal_adjustment: maximum_balance,
    };
    let builder = apply_scheduled_charges(
        PaymentBuilder::new(digits, None).with_accrual_accounting(false),
        &resolver.resolve(&opening),
        &basis,
        &balances,
        digits,
    )?;
    planned.push(record(&mut balances, &builder, initial_disbursal_date)?);

    for period in schedule.periods() {
        let principal = balances.account_balance(AccountDesignator::CustomerLoanPrincipal)?;
        let last = schedule.is_last_period(period);
        let (entry_limit, principal_adjustment) = if last {
            (None, principal)
        } else {
            (Some(payment_size), payment_size.min(principal))
        };

        let basis = ChargeBasis {
            payment_size,
            principal_adjustment,
            ..basis
        };
        let charges = resolver.resolve(&schedule.actions_in(period)?);
        let mut builder = apply_scheduled_charges(
            PaymentBuilder::new(digits, entry_limit).with_accrual_accounting(false),
            &charges,
            &basis,
            &balances,
            digits,
        )?;

        if last {
            let residual = builder.effective_balance(AccountDesignator::CustomerLoanPrincipal, &balances)?;
            builder = builder.fold_residual(residual);
        }

        planned.push(record(&mut balances, &builder, period.end())?);
    }

    tracing::debug!(
        elements = planned.len(),
        %payment_size,
        "planned schedule projected"
    );
    Ok(planned)
}

fn record(balances: &mut SimulatedRunningBalances, builder: &PaymentBuilder, date: NaiveDate) -> Result<PlannedPayment> {
    let payment = builder.build(None, Some(date));
    balances.apply(&payment.balance_adjustments);
    let remaining_principal = balances.account_balance(AccountDesignator::CustomerLoanPrincipal)?;
    Ok(PlannedPayment {
        payment,
        remaining_principal,
        balances: balances.snapshot(),
    })
}

/// display names of the charges a page mentions, in order of first appearance
fn charge_names(elements: &[PlannedPayment], resolver: &ChargeResolver) -> Vec<ChargeName> {
    let payment = defaults::payment_charge_definition();
    let mut seen = HashSet::new();

    elements
        .iter()
        .flat_map(|e| e.payment.cost_components.iter())
        .filter(|c| seen.insert(c.charge_identifier.clone()))
        .map(|c| {
            let name = resolver
                .definitions()
                .chain(std::iter::once(&payment))
                .find(|d| d.identifier == c.charge_identifier)
                .map(|d| d.name.clone())
                .unwrap_or_else(|| c.charge_identifier.clone());
            ChargeName {
                identifier: c.charge_identifier.clone(),
                name,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CaseParameters, PaymentCycle, ProductConfig, TermRange};
    use crate::types::TemporalUnit;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use uuid::Uuid;

    fn case(payment_size: Option<Money>) -> CaseContext {
        let parameters = CaseParameters {
            customer_identifier: "bob".to_string(),
            maximum_balance: Money::from_major(2_000),
            term_range: TermRange::new(TemporalUnit::Years, 1),
            payment_cycle: PaymentCycle::new(TemporalUnit::Months, 1),
            interest_rate: dec!(12),
            payment_size,
            account_assignments: Vec::new(),
        };
        CaseContext::new(Uuid::new_v4(), Arc::new(ProductConfig::personal_loan("pl-01")), parameters).unwrap()
    }

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn test_plan_amortizes_to_zero() {
        let planned = planned_payments(&case(None), start()).unwrap();
        assert_eq!(planned.len(), 13);

        let disbursal = &planned[0];
        assert_eq!(disbursal.payment.date, Some(start()));
        assert_eq!(disbursal.remaining_principal, Money::from_major(2_000));
        assert_eq!(disbursal.payment.component(defaults::DISBURSE_PAYMENT_ID), Some(Money::from_major(2_000)));

        let remaining: Vec<Money> = planned.iter().map(|p| p.remaining_principal).collect();
        assert!(remaining.windows(2).all(|w| w[1] < w[0]));

        let last = planned.last().unwrap();
        assert!(last.remaining_principal.is_zero());
        assert_eq!(last.payment.date, NaiveDate::from_ymd_opt(2025, 1, 15));
    }

    #[test]
    fn test_installments_match_payment_size() {
        let size = Money::from_str_exact("177.78").unwrap();
        let planned = planned_payments(&case(Some(size)), start()).unwrap();

        for element in &planned[1..12] {
            assert_eq!(element.payment.component(defaults::PAYMENT_ID), Some(size));
            let interest = element.payment.component(defaults::INTEREST_ID).unwrap();
            assert!(interest.is_positive());
            assert_eq!(element.payment.component(defaults::REPAY_INTEREST_ID), Some(interest));
            assert_eq!(element.payment.component(defaults::LATE_FEE_ID), Some(Money::ZERO));
        }

        // the final installment settles whatever is left, within a few cents of the others
        let last = planned[12].payment.component(defaults::PAYMENT_ID).unwrap();
        assert!((last - size).abs() < Money::from_major(2));
    }

    #[test]
    fn test_pages() {
        let case = case(None);
        let page = project_schedule(&case, start(), 2, 5).unwrap();
        assert_eq!(page.total_elements, 13);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.elements.len(), 3);

        let identifiers: Vec<&str> = page.charge_names.iter().map(|c| c.identifier.as_str()).collect();
        assert!(identifiers.contains(&defaults::PAYMENT_ID));
        assert!(identifiers.contains(&defaults::REPAY_PRINCIPAL_ID));
        let payment = page.charge_names.iter().find(|c| c.identifier == defaults::PAYMENT_ID).unwrap();
        assert_eq!(payment.name, "Payment");

        assert!(matches!(
            project_schedule(&case, start(), 0, 0),
            Err(EngineError::InvalidRequest { .. })
        ));
        assert!(project_schedule(&case, start(), 9, 5).unwrap().elements.is_empty());
    }
}
