use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{EngineError, Result};

/// share of the outstanding principal to hold as allowance once a case is this late
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LossProvisionStep {
    pub days_late: u32,
    /// 0..=100
    pub percent_provision: Decimal,
}

impl LossProvisionStep {
    pub fn new(days_late: u32, percent_provision: Decimal) -> Self {
        Self {
            days_late,
            percent_provision,
        }
    }
}

/// provisioning steps sorted by lateness
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LossProvisionTable {
    steps: Vec<LossProvisionStep>,
}

impl LossProvisionTable {
    pub fn new(mut steps: Vec<LossProvisionStep>) -> Result<Self> {
        if let Some(step) = steps
            .iter()
            .find(|s| s.percent_provision < Decimal::ZERO || s.percent_provision > Decimal::ONE_HUNDRED)
        {
            return Err(EngineError::config(format!(
                "provision of {}% for {} days late is outside 0..=100",
                step.percent_provision, step.days_late
            )));
        }

        steps.sort_by_key(|s| s.days_late);
        if let Some(pair) = steps.windows(2).find(|pair| pair[0].days_late == pair[1].days_late) {
            return Err(EngineError::config(format!(
                "duplicate provision step for {} days late",
                pair[0].days_late
            )));
        }

        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[LossProvisionStep] {
        &self.steps
    }

    /// the step with the greatest threshold not above `days_late`
    pub fn step_for(&self, days_late: u32) -> Option<&LossProvisionStep> {
        self.steps.iter().rev().find(|s| s.days_late <= days_late)
    }

    pub fn provision_amount(&self, days_late: u32, outstanding_principal: Money, minor_currency_unit_digits: u32) -> Option<Money> {
        self.step_for(days_late).map(|step| {
            outstanding_principal
                .percentage(step.percent_provision)
                .round_to_minor(minor_currency_unit_digits)
        })
    }
}
