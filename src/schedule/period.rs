use chrono::{Days, Duration, NaiveDate};
use serde::Serialize;
use std::cmp::Ordering;

use crate::errors::{EngineError, Result};
use crate::types::Action;

/// half-open date range `[begin, end)`, ordered by end then begin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Period {
    begin: NaiveDate,
    end: NaiveDate,
}

impl Period {
    pub fn new(begin: NaiveDate, end: NaiveDate) -> Result<Self> {
        if begin >= end {
            return Err(EngineError::calculation(format!(
                "period must end after it begins: {} .. {}",
                begin, end
            )));
        }
        Ok(Self { begin, end })
    }

    /// the single day starting at `date`
    pub fn one_day(date: NaiveDate) -> Result<Self> {
        let end = date
            .checked_add_days(Days::new(1))
            .ok_or_else(|| EngineError::calculation(format!("date overflow after {}", date)))?;
        Self::new(date, end)
    }

    pub fn begin(&self) -> NaiveDate {
        self.begin
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.begin <= date && date < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.begin
    }

    pub fn days(&self) -> i64 {
        self.duration().num_days()
    }
}

impl Ord for Period {
    fn cmp(&self, other: &Self) -> Ordering {
        self.end
            .cmp(&other.end)
            .then_with(|| self.begin.cmp(&other.begin))
    }
}

impl PartialOrd for Period {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// an action due on a date, with the window it covers and its enclosing repayment period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScheduledAction {
    pub action: Action,
    pub when: NaiveDate,
    pub action_period: Option<Period>,
    pub repayment_period: Option<Period>,
}

impl ScheduledAction {
    pub fn new(
        action: Action,
        when: NaiveDate,
        action_period: Option<Period>,
        repayment_period: Option<Period>,
    ) -> Self {
        Self {
            action,
            when,
            action_period,
            repayment_period,
        }
    }

    /// an action outside any schedule, covering just its own day
    pub fn on(action: Action, when: NaiveDate) -> Result<Self> {
        Ok(Self::new(action, when, Some(Period::one_day(when)?), None))
    }

    pub fn applies_on(&self, date: NaiveDate) -> bool {
        match &self.action_period {
            Some(period) => period.contains(date),
            None => self.when == date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_period_rejects_empty_range() {
        assert!(Period::new(date(2024, 1, 1), date(2024, 1, 1)).is_err());
        assert!(Period::new(date(2024, 1, 2), date(2024, 1, 1)).is_err());
    }

    #[test]
    fn test_period_is_half_open() {
        let period = Period::new(date(2024, 1, 1), date(2024, 2, 1)).unwrap();
        assert!(period.contains(date(2024, 1, 1)));
        assert!(period.contains(date(2024, 1, 31)));
        assert!(!period.contains(date(2024, 2, 1)));
        assert_eq!(period.days(), 31);
    }

    #[test]
    fn test_period_orders_by_end_then_begin() {
        let long = Period::new(date(2024, 1, 1), date(2024, 3, 1)).unwrap();
        let short = Period::new(date(2024, 2, 1), date(2024, 3, 1)).unwrap();
        let early = Period::new(date(2024, 1, 15), date(2024, 2, 1)).unwrap();

        let mut periods = vec![short, long, early];
        periods.sort();
        assert_eq!(periods, vec![early, long, short]);
    }

    #[test]
    fn test_action_without_window_applies_on_its_day() {
        let action = ScheduledAction::new(Action::Close, date(2024, 5, 1), None, None);
        assert!(action.applies_on(date(2024, 5, 1)));
        assert!(!action.applies_on(date(2024, 5, 2)));

        let windowed = ScheduledAction::on(Action::MarkLate, date(2024, 5, 1)).unwrap();
        assert!(windowed.applies_on(date(2024, 5, 1)));
    }
}
