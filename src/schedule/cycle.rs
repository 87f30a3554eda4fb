//! payment date arithmetic: increment, orient, align

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};

use crate::config::PaymentCycle;
use crate::errors::{EngineError, Result};
use crate::types::TemporalUnit;

/// the payment date following `last` under the given cycle
pub fn next_payment_date(cycle: &PaymentCycle, last: NaiveDate) -> Result<NaiveDate> {
    let incremented = cycle
        .temporal_unit
        .add_to(last, cycle.period)
        .ok_or_else(|| overflow(last))?;

    let oriented = if cycle.has_alignment() {
        orient(incremented, cycle.temporal_unit)
    } else {
        incremented
    };

    let next = align(oriented, cycle)?;
    if next <= last {
        return Err(EngineError::calculation(format!(
            "payment cycle does not advance past {}",
            last
        )));
    }
    Ok(next)
}

/// move to the start of the enclosing year, month or week
fn orient(date: NaiveDate, unit: TemporalUnit) -> NaiveDate {
    match unit {
        TemporalUnit::Years => date.with_ordinal(1).unwrap_or(date),
        TemporalUnit::Months => date.with_day(1).unwrap_or(date),
        TemporalUnit::Weeks => date.week(Weekday::Mon).first_day(),
        TemporalUnit::Days => date,
    }
}

fn align(date: NaiveDate, cycle: &PaymentCycle) -> Result<NaiveDate> {
    let mut date = date;

    if let Some(month) = cycle.alignment_month {
        date = date
            .checked_add_months(Months::new(month))
            .ok_or_else(|| overflow(date))?;
    }

    if let Some(week) = cycle.alignment_week {
        date = match week {
            -1 => last_week_of_month(date)?,
            0..=2 => date
                .checked_add_days(Days::new(week as u64 * 7))
                .ok_or_else(|| overflow(date))?,
            other => {
                return Err(EngineError::cycle(format!(
                    "week alignment must be one of -1, 0, 1, 2; got {}",
                    other
                )))
            }
        };
    }

    // day alignment last so it does not overwrite week or month alignment
    if let Some(day) = cycle.alignment_day {
        date = if cycle.alignment_week == Some(-1) {
            weekday_on_or_before(last_day_of_month(date)?, day)?
        } else if cycle.aligns_by_weekday() {
            next_weekday_on_or_after(date, day)?
        } else {
            let offset = (days_in_month(date)? - 1).min(day);
            date.checked_add_days(Days::new(offset as u64))
                .ok_or_else(|| overflow(date))?
        };
    }

    Ok(date)
}

/// monday of the week holding the last day of the month
fn last_week_of_month(date: NaiveDate) -> Result<NaiveDate> {
    Ok(last_day_of_month(date)?.week(Weekday::Mon).first_day())
}

fn last_day_of_month(date: NaiveDate) -> Result<NaiveDate> {
    date.with_day(1)
        .and_then(|first| first.checked_add_months(Months::new(1)))
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| overflow(date))
}

/// `day` counts from monday (0) to sunday (6)
fn next_weekday_on_or_after(date: NaiveDate, day: u32) -> Result<NaiveDate> {
    let current = date.weekday().num_days_from_monday();
    let ahead = (checked_weekday(day)? + 7 - current) % 7;
    date.checked_add_days(Days::new(ahead as u64))
        .ok_or_else(|| overflow(date))
}

/// the latest `day` of the week not after `date`
fn weekday_on_or_before(date: NaiveDate, day: u32) -> Result<NaiveDate> {
    let current = date.weekday().num_days_from_monday();
    let behind = (current + 7 - checked_weekday(day)?) % 7;
    date.checked_sub_days(Days::new(behind as u64))
        .ok_or_else(|| overflow(date))
}

fn checked_weekday(day: u32) -> Result<u32> {
    if day > 6 {
        return Err(EngineError::cycle(format!("day of week must be 0..=6; got {}", day)));
    }
    Ok(day)
}

fn days_in_month(date: NaiveDate) -> Result<u32> {
    let first = date.with_day(1).ok_or_else(|| overflow(date))?;
    let next = first
        .checked_add_months(Months::new(1))
        .ok_or_else(|| overflow(date))?;
    Ok((next - first).num_days() as u32)
}

fn overflow(date: NaiveDate) -> EngineError {
    EngineError::calculation(format!("date overflow after {}", date))
}
