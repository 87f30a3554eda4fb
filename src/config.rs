use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::charges::{defaults, BalanceSegmentSet, ChargeDefinition, ChargeResolver};
use crate::decimal::Money;
use crate::errors::{EngineError, Result};
use crate::provision::{LossProvisionStep, LossProvisionTable};
use crate::types::{AccountDesignator, TemporalUnit};

/// loan product configuration, loaded once and shared by every case of the product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductConfig {
    pub identifier: String,
    pub name: String,
    #[serde(default = "default_minor_currency_unit_digits")]
    pub minor_currency_unit_digits: u32,
    /// when false, accrual charges are recognized directly at their accrue action
    #[serde(default = "default_accrual_accounting")]
    pub accrual_accounting: bool,
    pub balance_range: BalanceRange,
    pub interest_range: InterestRange,
    pub term_range: TermRange,
    #[serde(default)]
    pub charge_definitions: Vec<ChargeDefinition>,
    #[serde(default)]
    pub balance_segment_sets: Vec<BalanceSegmentSet>,
    #[serde(default)]
    pub loss_provision_steps: Vec<LossProvisionStep>,
    #[serde(default)]
    pub account_assignments: Vec<AccountAssignment>,
}

/// allowed maximum balances for cases of a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BalanceRange {
    pub minimum: Money,
    pub maximum: Money,
}

/// allowed annual interest rates, in percent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterestRange {
    pub minimum: Decimal,
    pub maximum: Decimal,
}

/// term length as a count of calendar units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TermRange {
    pub temporal_unit: TemporalUnit,
    pub maximum: u32,
}

impl TermRange {
    pub fn new(temporal_unit: TemporalUnit, maximum: u32) -> Self {
        Self {
            temporal_unit,
            maximum,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.maximum == 0 {
            return Err(EngineError::config("term range maximum must be at least 1"));
        }
        Ok(())
    }

    pub fn estimated_seconds(&self) -> i64 {
        self.temporal_unit.estimated_seconds() * self.maximum as i64
    }
}

/// how payment dates advance and where they land
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentCycle {
    pub temporal_unit: TemporalUnit,
    pub period: u32,
    /// day of week (0 = monday) for weekly or week-aligned cycles, else day of month (0 = the 1st)
    #[serde(default)]
    pub alignment_day: Option<u32>,
    /// week of month: 0, 1, 2 or -1 for the last week
    #[serde(default)]
    pub alignment_week: Option<i32>,
    /// month of year, 0 = january
    #[serde(default)]
    pub alignment_month: Option<u32>,
}

impl PaymentCycle {
    pub fn new(temporal_unit: TemporalUnit, period: u32) -> Self {
        Self {
            temporal_unit,
            period,
            alignment_day: None,
            alignment_week: None,
            alignment_month: None,
        }
    }

    pub fn with_alignment_day(mut self, day: u32) -> Self {
        self.alignment_day = Some(day);
        self
    }

    pub fn with_alignment_week(mut self, week: i32) -> Self {
        self.alignment_week = Some(week);
        self
    }

    pub fn with_alignment_month(mut self, month: u32) -> Self {
        self.alignment_month = Some(month);
        self
    }

    pub fn has_alignment(&self) -> bool {
        self.alignment_day.is_some() || self.alignment_week.is_some() || self.alignment_month.is_some()
    }

    /// whether the alignment day names a day of the week
    pub fn aligns_by_weekday(&self) -> bool {
        self.temporal_unit == TemporalUnit::Weeks || self.alignment_week.is_some()
    }

    pub fn validate(&self) -> Result<()> {
        if self.period == 0 {
            return Err(EngineError::cycle("period must be at least 1"));
        }

        if self.temporal_unit == TemporalUnit::Days && self.has_alignment() {
            return Err(EngineError::cycle("daily cycles take no alignment"));
        }

        if let Some(week) = self.alignment_week {
            if !matches!(week, -1..=2) {
                return Err(EngineError::cycle(format!(
                    "week alignment must be one of -1, 0, 1, 2; got {}",
                    week
                )));
            }
            if !matches!(self.temporal_unit, TemporalUnit::Months | TemporalUnit::Years) {
                return Err(EngineError::cycle("week alignment needs a monthly or yearly cycle"));
            }
        }

        if let Some(month) = self.alignment_month {
            if month > 11 {
                return Err(EngineError::cycle(format!("month alignment must be 0..=11; got {}", month)));
            }
            if self.temporal_unit != TemporalUnit::Years {
                return Err(EngineError::cycle("month alignment needs a yearly cycle"));
            }
        }

        if let Some(day) = self.alignment_day {
            let limit = if self.aligns_by_weekday() { 6 } else { 30 };
            if day > limit {
                return Err(EngineError::cycle(format!(
                    "day alignment must be 0..={}; got {}",
                    limit, day
                )));
            }
        }

        Ok(())
    }
}

/// binds a designator to a concrete ledger account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountAssignment {
    pub designator: AccountDesignator,
    pub account_identifier: String,
}

impl AccountAssignment {
    pub fn new(designator: AccountDesignator, account_identifier: impl Into<String>) -> Self {
        Self {
            designator,
            account_identifier: account_identifier.into(),
        }
    }
}

/// per-case terms chosen within the product's ranges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaseParameters {
    pub customer_identifier: String,
    pub maximum_balance: Money,
    pub term_range: TermRange,
    pub payment_cycle: PaymentCycle,
    /// annual rate in percent
    pub interest_rate: Decimal,
    /// contractual installment; derived from the annuity when absent
    #[serde(default)]
    pub payment_size: Option<Money>,
    #[serde(default)]
    pub account_assignments: Vec<AccountAssignment>,
}

impl CaseParameters {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn validate(&self, product: &ProductConfig) -> Result<()> {
        self.term_range.validate()?;
        self.payment_cycle.validate()?;

        let range = product.balance_range;
        if self.maximum_balance < range.minimum || self.maximum_balance > range.maximum {
            return Err(EngineError::config(format!(
                "maximum balance {} outside product range {} .. {}",
                self.maximum_balance, range.minimum, range.maximum
            )));
        }

        let rates = product.interest_range;
        if self.interest_rate < rates.minimum || self.interest_rate > rates.maximum {
            return Err(EngineError::config(format!(
                "interest rate {} outside product range {} .. {}",
                self.interest_rate, rates.minimum, rates.maximum
            )));
        }

        if self.term_range.estimated_seconds() > product.term_range.estimated_seconds() {
            return Err(EngineError::config(format!(
                "term of {} {:?} exceeds product maximum of {} {:?}",
                self.term_range.maximum,
                self.term_range.temporal_unit,
                product.term_range.maximum,
                product.term_range.temporal_unit
            )));
        }

        if let Some(size) = self.payment_size {
            if !size.is_positive() {
                return Err(EngineError::config(format!("payment size must be positive, got {}", size)));
            }
        }

        Ok(())
    }
}

fn default_minor_currency_unit_digits() -> u32 {
    2
}

fn default_accrual_accounting() -> bool {
    true
}

impl ProductConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let product: ProductConfig = serde_json::from_str(json)?;
        product.validate()?;
        Ok(product)
    }

    pub fn validate(&self) -> Result<()> {
        if self.minor_currency_unit_digits > 8 {
            return Err(EngineError::config(format!(
                "minor currency unit digits must be 0..=8; got {}",
                self.minor_currency_unit_digits
            )));
        }

        if self.balance_range.minimum.is_negative() || self.balance_range.minimum > self.balance_range.maximum {
            return Err(EngineError::config(format!(
                "invalid balance range {} .. {}",
                self.balance_range.minimum, self.balance_range.maximum
            )));
        }

        if self.interest_range.minimum < Decimal::ZERO || self.interest_range.minimum > self.interest_range.maximum {
            return Err(EngineError::config(format!(
                "invalid interest range {} .. {}",
                self.interest_range.minimum, self.interest_range.maximum
            )));
        }

        self.term_range.validate()?;

        for definition in &self.charge_definitions {
            definition.validate()?;
        }

        // resolves segment references, rejecting unknown sets or segments
        ChargeResolver::new(&self.charge_definitions, &self.balance_segment_sets)?;
        self.loss_provision_table()?;

        Ok(())
    }

    pub fn loss_provision_table(&self) -> Result<LossProvisionTable> {
        LossProvisionTable::new(self.loss_provision_steps.clone())
    }

    /// create personal loan product with the standard charges and provisioning steps
    pub fn personal_loan(identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        Self {
            name: format!("personal loan {}", identifier),
            identifier,
            minor_currency_unit_digits: 2,
            accrual_accounting: true,
            balance_range: BalanceRange {
                minimum: Money::ZERO,
                maximum: Money::from_major(100_000),
            },
            interest_range: InterestRange {
                minimum: dec!(0),
                maximum: dec!(25),
            },
            term_range: TermRange::new(TemporalUnit::Years, 5),
            charge_definitions: defaults::default_charge_definitions(),
            balance_segment_sets: Vec::new(),
            loss_provision_steps: vec![
                LossProvisionStep::new(0, dec!(1)),
                LossProvisionStep::new(1, dec!(9)),
                LossProvisionStep::new(30, dec!(35)),
                LossProvisionStep::new(60, dec!(55)),
            ],
            account_assignments: defaults::default_account_assignments(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn case() -> CaseParameters {
        CaseParameters {
            customer_identifier: "alice".to_string(),
            maximum_balance: Money::from_major(2_000),
            term_range: TermRange::new(TemporalUnit::Months, 12),
            payment_cycle: PaymentCycle::new(TemporalUnit::Months, 1),
            interest_rate: dec!(12),
            payment_size: None,
            account_assignments: Vec::new(),
        }
    }

    #[test]
    fn test_personal_loan_preset_is_valid() {
        let product = ProductConfig::personal_loan("pl-01");
        assert!(product.validate().is_ok());
        assert!(case().validate(&product).is_ok());
    }

    #[test]
    fn test_product_json_round_trip_keeps_defaults() {
        let product = ProductConfig::personal_loan("pl-01");
        let json = serde_json::to_string(&product).unwrap();
        let loaded = ProductConfig::from_json(&json).unwrap();
        assert_eq!(loaded, product);
    }

    #[test]
    fn test_minimal_product_json() {
        let json = r#"{
            "identifier": "micro",
            "name": "micro loan",
            "balance_range": { "minimum": "0", "maximum": "5000" },
            "interest_range": { "minimum": "0", "maximum": "30" },
            "term_range": { "temporal_unit": "MONTHS", "maximum": 24 }
        }"#;
        let product = ProductConfig::from_json(json).unwrap();
        assert_eq!(product.minor_currency_unit_digits, 2);
        assert!(product.accrual_accounting);
        assert!(product.charge_definitions.is_empty());
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let json = r#"{ "customer_identifier": "bob", "colour": "red" }"#;
        let err = CaseParameters::from_json(json).unwrap_err();
        assert!(matches!(err, EngineError::Json(_)));
    }

    #[test]
    fn test_case_outside_product_ranges() {
        let product = ProductConfig::personal_loan("pl-01");

        let mut too_big = case();
        too_big.maximum_balance = Money::from_major(250_000);
        assert!(too_big.validate(&product).is_err());

        let mut too_long = case();
        too_long.term_range = TermRange::new(TemporalUnit::Years, 6);
        assert!(too_long.validate(&product).is_err());

        let mut too_dear = case();
        too_dear.interest_rate = dec!(40);
        assert!(too_dear.validate(&product).is_err());
    }

    #[rstest]
    #[case(PaymentCycle::new(TemporalUnit::Months, 0))]
    #[case(PaymentCycle::new(TemporalUnit::Days, 1).with_alignment_day(2))]
    #[case(PaymentCycle::new(TemporalUnit::Months, 1).with_alignment_week(3))]
    #[case(PaymentCycle::new(TemporalUnit::Weeks, 1).with_alignment_week(0))]
    #[case(PaymentCycle::new(TemporalUnit::Months, 1).with_alignment_month(2))]
    #[case(PaymentCycle::new(TemporalUnit::Years, 1).with_alignment_month(12))]
    #[case(PaymentCycle::new(TemporalUnit::Weeks, 1).with_alignment_day(7))]
    #[case(PaymentCycle::new(TemporalUnit::Months, 1).with_alignment_day(31))]
    fn test_invalid_payment_cycles(#[case] cycle: PaymentCycle) {
        let err = cycle.validate().unwrap_err();
        assert!(matches!(err, EngineError::InvalidPaymentCycle { .. }));
    }

    #[test]
    fn test_valid_payment_cycles() {
        assert!(PaymentCycle::new(TemporalUnit::Months, 1).with_alignment_day(30).validate().is_ok());
        assert!(PaymentCycle::new(TemporalUnit::Months, 1)
            .with_alignment_week(-1)
            .with_alignment_day(6)
            .validate()
            .is_ok());
        assert!(PaymentCycle::new(TemporalUnit::Years, 1).with_alignment_month(11).validate().is_ok());
    }
}
