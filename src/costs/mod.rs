pub mod calculator;

use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::instrument;

use crate::balances::{LedgerRunningBalances, RunningBalances};
use crate::case::CaseContext;
use crate::charges::ChargeResolver;
use crate::config::AccountAssignment;
use crate::decimal::Money;
use crate::errors::{EngineError, Result};
use crate::ledger::Ledger;
use crate::payments::{loan_payment_size, Payment, PaymentBuilder};
use crate::schedule::{Period, RepaymentSchedule, ScheduledAction};
use crate::types::{AccountDesignator, Action};

pub use calculator::{apply_scheduled_charges, charge_amount, ChargeBasis};

/// one action a caller wants priced
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    pub action: Action,
    pub as_of: NaiveDate,
    /// disbursal or payment size; defaults depend on the action
    pub requested_amount: Option<Money>,
    pub days_late: Option<u32>,
    /// restrict the payment to charges touching these accounts
    pub for_account_designators: Option<BTreeSet<AccountDesignator>>,
    pub one_time_assignments: Vec<AccountAssignment>,
}

impl ActionRequest {
    pub fn new(action: Action, as_of: NaiveDate) -> Self {
        Self {
            action,
            as_of,
            requested_amount: None,
            days_late: None,
            for_account_designators: None,
            one_time_assignments: Vec::new(),
        }
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.requested_amount = Some(amount);
        self
    }

    pub fn with_days_late(mut self, days_late: u32) -> Self {
        self.days_late = Some(days_late);
        self
    }

    pub fn for_designators(mut self, designators: impl IntoIterator<Item = AccountDesignator>) -> Self {
        self.for_account_designators = Some(designators.into_iter().collect());
        self
    }

    pub fn with_assignment(mut self, assignment: AccountAssignment) -> Self {
        self.one_time_assignments.push(assignment);
        self
    }
}

/// prices live actions against the ledger
///
/// every balance is read fresh from the ledger, so repeating a request after a
/// failed post yields the same payment
pub struct CostComponentEngine<'l, L: Ledger + ?Sized> {
    ledger: &'l L,
}

impl<'l, L: Ledger + ?Sized> CostComponentEngine<'l, L> {
    pub fn new(ledger: &'l L) -> Self {
        Self { ledger }
    }

    #[instrument(
        name = "loan_engine.costs.compute",
        skip(self, case, request),
        fields(case_id = %case.case_id, action = %request.action, as_of = %request.as_of),
        err
    )]
    pub fn compute_cost_components(&self, case: &CaseContext, request: &ActionRequest) -> Result<Payment> {
        if let Some(amount) = request.requested_amount {
            if !amount.is_positive() {
                return Err(EngineError::InvalidRequest {
                    message: format!("requested amount must be positive, got {}", amount),
                });
            }
        }

        let resolver = case.account_resolver(&request.one_time_assignments);
        let balances = LedgerRunningBalances::new(self.ledger, &resolver);
        let charge_resolver = case.charge_resolver()?;
        let digits = case.minor_currency_unit_digits();
        let start = balances.start_of_term()?;

        if requires_start(request.action) && start.is_none() {
            tracing::warn!(action = %request.action, "action requires a disbursed loan");
            return Err(EngineError::NotDisbursed);
        }

        let arrears_days = match request.action {
            Action::MarkInArrears => Some(request.days_late.ok_or_else(|| EngineError::InvalidRequest {
                message: "days late is required to mark a loan in arrears".to_string(),
            })?),
            _ => None,
        };

        let schedule = start.map(|start| case.schedule(start)).transpose()?;
        let scheduled_actions = scheduled_actions_for(schedule.as_ref(), request)?;
        let charges = charge_resolver.resolve(&scheduled_actions);
        let principal = balances.account_balance(AccountDesignator::CustomerLoanPrincipal)?;

        let mut entry_limit = None;
        let basis = match request.action {
            Action::Disburse => {
                let maximum = case.parameters.maximum_balance;
                let requested = request
                    .requested_amount
                    .unwrap_or_else(|| (maximum - principal).max(Money::ZERO));
                if principal + requested > maximum {
                    tracing::warn!(current = %principal, %requested, %maximum, "disbursal over maximum balance");
                    return Err(EngineError::DisbursalExceedsMaximum {
                        current: principal,
                        requested,
                        maximum,
                    });
                }
                self.basis(case, requested, requested)
            }
            Action::AcceptPayment => {
                let size = match request.requested_amount {
                    Some(amount) => amount,
                    None => contractual_payment_size(case, &charge_resolver, start.unwrap_or(request.as_of))?,
                };
                let last_period = schedule
                    .as_ref()
                    .map(|s| s.is_last_period(&s.repayment_period_for(request.as_of)))
                    .unwrap_or(false);
                if request.requested_amount.is_some() || !last_period {
                    entry_limit = Some(size);
                }
                let principal_adjustment = if entry_limit.is_some() { size.min(principal) } else { principal };
                self.basis(case, size, principal_adjustment)
            }
            Action::WriteOff => self.basis(case, principal, principal),
            Action::Close => {
                let outstanding = balances.ledger_balance(AccountDesignator::CustomerLoanGroup)?;
                if !outstanding.is_zero() {
                    tracing::warn!(%outstanding, "close requested with outstanding balance");
                    return Err(EngineError::OutstandingBalanceOnClose { balance: outstanding });
                }
                self.basis(case, Money::ZERO, Money::ZERO)
            }
            _ => {
                let size = match request.requested_amount {
                    Some(amount) => amount,
                    None => contractual_payment_size(case, &charge_resolver, start.unwrap_or(request.as_of))?,
                };
                self.basis(case, size, size.min(principal))
            }
        };

        let builder = PaymentBuilder::new(digits, entry_limit).with_accrual_accounting(case.product.accrual_accounting);
        let mut builder = apply_scheduled_charges(builder, &charges, &basis, &balances, digits)?;

        if let Some(days_late) = arrears_days {
            let table = case.product.loss_provision_table()?;
            if let Some(amount) = table.provision_amount(days_late, principal, digits) {
                let action = scheduled_actions
                    .first()
                    .copied()
                    .map_or_else(|| ScheduledAction::on(request.action, request.as_of), Ok)?;
                builder = builder
                    .adjust_balances(&charge_resolver.provision_charge(action), amount, &balances)?
                    .0;
            }
        }

        Ok(builder.build(request.for_account_designators.as_ref(), Some(request.as_of)))
    }

    fn basis(&self, case: &CaseContext, payment_size: Money, principal_adjustment: Money) -> ChargeBasis {
        ChargeBasis {
            maximum_balance: case.parameters.maximum_balance,
            interest_rate: case.parameters.interest_rate,
            payment_size,
            principal_adjustment,
        }
    }
}

fn requires_start(action: Action) -> bool {
    matches!(
        action,
        Action::ApplyInterest | Action::AcceptPayment | Action::MarkLate | Action::MarkInArrears | Action::Close
    )
}

/// the scheduled action matching the request, or an ad hoc one covering its day
///
/// a payment belongs to the repayment period it settles, including on that period's end date
fn scheduled_actions_for(schedule: Option<&RepaymentSchedule>, request: &ActionRequest) -> Result<Vec<ScheduledAction>> {
    if let Some(schedule) = schedule {
        let repayment_period = schedule.repayment_period_for(request.as_of);
        let mut actions: Vec<ScheduledAction> = if request.action == Action::AcceptPayment {
            schedule
                .scheduled_actions()?
                .into_iter()
                .filter(|a| a.action == Action::AcceptPayment && a.repayment_period == Some(repayment_period))
                .collect()
        } else {
            schedule.actions_for(request.action, request.as_of)?
        };
        actions.truncate(1);
        if !actions.is_empty() {
            return Ok(actions);
        }
        return Ok(vec![ScheduledAction::new(
            request.action,
            request.as_of,
            Some(Period::one_day(request.as_of)?),
            Some(repayment_period),
        )]);
    }
    Ok(vec![ScheduledAction::on(request.action, request.as_of)?])
}

/// the case's installment: configured, else derived from the schedule starting at `start`
pub fn contractual_payment_size(case: &CaseContext, charge_resolver: &ChargeResolver, start: NaiveDate) -> Result<Money> {
    if let Some(size) = case.parameters.payment_size {
        return Ok(size);
    }
    let schedule = case.schedule(start)?;
    let charges = charge_resolver.resolve(&schedule.scheduled_actions()?);
    Ok(loan_payment_size(
        case.parameters.maximum_balance,
        case.parameters.interest_rate,
        &charges,
        case.minor_currency_unit_digits(),
    ))
}
