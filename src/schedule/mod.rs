pub mod cycle;
pub mod period;

use chrono::{Days, NaiveDate};
use tracing::instrument;

use crate::config::{PaymentCycle, TermRange};
use crate::errors::{EngineError, Result};
use crate::types::Action;

pub use cycle::next_payment_date;
pub use period::{Period, ScheduledAction};

/// contiguous repayment periods of a case, from disbursal to the final payment
#[derive(Debug, Clone, PartialEq)]
pub struct RepaymentSchedule {
    start: NaiveDate,
    periods: Vec<Period>,
}

impl RepaymentSchedule {
    /// generate periods until the term's rough end is reached; the last period
    /// is kept even when it runs past that date
    #[instrument(name = "loan_engine.schedule.generate", skip(term_range, cycle), err)]
    pub fn generate(start: NaiveDate, term_range: &TermRange, cycle: &PaymentCycle) -> Result<Self> {
        cycle.validate()?;
        term_range.validate()?;

        let rough_end = term_range
            .temporal_unit
            .add_to(start, term_range.maximum)
            .ok_or_else(|| EngineError::calculation(format!("term end overflows after {}", start)))?;

        let mut periods = Vec::new();
        let mut cursor = start;
        loop {
            let next = next_payment_date(cycle, cursor)?;
            periods.push(Period::new(cursor, next)?);
            cursor = next;
            if next >= rough_end {
                break;
            }
        }

        tracing::debug!(periods = periods.len(), end = %cursor, "repayment schedule generated");

        Ok(Self { start, periods })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn number_of_periods(&self) -> usize {
        self.periods.len()
    }

    pub fn first_period(&self) -> Period {
        // generate always pushes at least one period
        self.periods[0]
    }

    pub fn last_period(&self) -> Period {
        self.periods[self.periods.len() - 1]
    }

    /// the final period's end; authoritative over the configured term length
    pub fn end_of_term(&self) -> NaiveDate {
        self.last_period().end()
    }

    pub fn is_last_period(&self, period: &Period) -> bool {
        *period == self.last_period()
    }

    /// the period a payment made on `date` belongs to; a payment on a period's
    /// end date settles that period
    pub fn repayment_period_for(&self, date: NaiveDate) -> Period {
        self.periods
            .iter()
            .find(|p| date <= p.end())
            .copied()
            .unwrap_or_else(|| self.last_period())
    }

    /// every action the case would see if it ran exactly to schedule
    pub fn scheduled_actions(&self) -> Result<Vec<ScheduledAction>> {
        let first = self.first_period();
        let opening = Period::one_day(self.start)?;

        let mut actions = vec![
            ScheduledAction::new(Action::Open, self.start, Some(opening), Some(first)),
            ScheduledAction::new(Action::Approve, self.start, Some(opening), Some(first)),
            ScheduledAction::new(Action::Disburse, self.start, Some(opening), Some(first)),
        ];

        for period in &self.periods {
            actions.extend(interest_actions(period)?);
            actions.push(ScheduledAction::new(
                Action::AcceptPayment,
                period.end(),
                Some(*period),
                Some(*period),
            ));
        }

        let last = self.last_period();
        actions.push(ScheduledAction::new(
            Action::Close,
            last.end(),
            Some(Period::one_day(last.end())?),
            Some(last),
        ));

        Ok(actions)
    }

    /// scheduled actions of one kind whose window covers `date`
    pub fn actions_for(&self, action: Action, date: NaiveDate) -> Result<Vec<ScheduledAction>> {
        Ok(self
            .scheduled_actions()?
            .into_iter()
            .filter(|a| a.action == action && a.applies_on(date))
            .collect())
    }

    /// scheduled actions due inside a repayment period, excluding its begin date
    pub fn actions_in(&self, period: &Period) -> Result<Vec<ScheduledAction>> {
        Ok(self
            .scheduled_actions()?
            .into_iter()
            .filter(|a| a.when > period.begin() && a.when <= period.end())
            .filter(|a| a.action != Action::Close)
            .collect())
    }
}

/// one interest accrual per day `d` in `(begin, end]`, covering `[d - 1, d)`
fn interest_actions(period: &Period) -> Result<Vec<ScheduledAction>> {
    let mut actions = Vec::with_capacity(period.days() as usize);
    let mut day = period.begin();
    while day < period.end() {
        let next = day
            .checked_add_days(Days::new(1))
            .ok_or_else(|| EngineError::calculation(format!("date overflow after {}", day)))?;
        actions.push(ScheduledAction::new(
            Action::ApplyInterest,
            next,
            Some(Period::new(day, next)?),
            Some(*period),
        ));
        day = next;
    }
    Ok(actions)
}
