use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, Result};
use crate::types::{AccountDesignator, Action, ChargeMethod, ProportionalBasis, TemporalUnit};

/// a configured fee, interest or transfer rule owned by the product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChargeDefinition {
    pub identifier: String,
    pub name: String,
    pub charge_action: Action,
    #[serde(default)]
    pub accrue_action: Option<Action>,
    pub charge_method: ChargeMethod,
    /// flat value for fixed charges, rate otherwise
    #[serde(default)]
    pub amount: Decimal,
    #[serde(default)]
    pub proportional_to: Option<ProportionalBasis>,
    pub from_account_designator: AccountDesignator,
    #[serde(default)]
    pub accrual_account_designator: Option<AccountDesignator>,
    pub to_account_designator: AccountDesignator,
    /// the nominal period the amount is denominated over
    #[serde(default)]
    pub for_cycle_size_unit: Option<TemporalUnit>,
    #[serde(default)]
    pub segment_range: Option<SegmentRange>,
    #[serde(default)]
    pub read_only: bool,
}

/// inclusive range of segments of a named segment set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SegmentRange {
    pub segment_set: String,
    pub from_segment: String,
    pub to_segment: String,
}

impl ChargeDefinition {
    /// flat amount moved from one account to another
    pub fn fixed(
        identifier: impl Into<String>,
        name: impl Into<String>,
        charge_action: Action,
        amount: Decimal,
        from: AccountDesignator,
        to: AccountDesignator,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            charge_action,
            accrue_action: None,
            charge_method: ChargeMethod::Fixed,
            amount,
            proportional_to: None,
            from_account_designator: from,
            accrual_account_designator: None,
            to_account_designator: to,
            for_cycle_size_unit: None,
            segment_range: None,
            read_only: false,
        }
    }

    /// rate times a basis
    pub fn proportional(
        identifier: impl Into<String>,
        name: impl Into<String>,
        charge_action: Action,
        amount: Decimal,
        basis: ProportionalBasis,
        from: AccountDesignator,
        to: AccountDesignator,
    ) -> Self {
        Self {
            charge_method: ChargeMethod::Proportional,
            proportional_to: Some(basis),
            ..Self::fixed(identifier, name, charge_action, amount, from, to)
        }
    }

    /// case interest rate times a basis
    pub fn interest(
        identifier: impl Into<String>,
        name: impl Into<String>,
        charge_action: Action,
        basis: ProportionalBasis,
        from: AccountDesignator,
        to: AccountDesignator,
    ) -> Self {
        Self {
            charge_method: ChargeMethod::Interest,
            proportional_to: Some(basis),
            ..Self::fixed(identifier, name, charge_action, Decimal::ZERO, from, to)
        }
    }

    pub fn accrued(mut self, accrue_action: Action, accrual_account: AccountDesignator) -> Self {
        self.accrue_action = Some(accrue_action);
        self.accrual_account_designator = Some(accrual_account);
        self
    }

    pub fn per(mut self, unit: TemporalUnit) -> Self {
        self.for_cycle_size_unit = Some(unit);
        self
    }

    pub fn in_segments(
        mut self,
        segment_set: impl Into<String>,
        from_segment: impl Into<String>,
        to_segment: impl Into<String>,
    ) -> Self {
        self.segment_range = Some(SegmentRange {
            segment_set: segment_set.into(),
            from_segment: from_segment.into(),
            to_segment: to_segment.into(),
        });
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// has both an accrue action and an accrual account
    pub fn is_accrued(&self) -> bool {
        self.accrue_action.is_some() && self.accrual_account_designator.is_some()
    }

    /// every designator the charge can touch
    pub fn designators(&self) -> impl Iterator<Item = AccountDesignator> + '_ {
        std::iter::once(self.from_account_designator)
            .chain(self.accrual_account_designator)
            .chain(std::iter::once(self.to_account_designator))
    }

    pub fn validate(&self) -> Result<()> {
        if self.identifier.trim().is_empty() {
            return Err(EngineError::config("charge identifier must not be empty"));
        }

        if self.amount < Decimal::ZERO {
            return Err(EngineError::config(format!(
                "charge {} has negative amount {}",
                self.identifier, self.amount
            )));
        }

        if matches!(self.charge_method, ChargeMethod::Proportional | ChargeMethod::Interest)
            && self.proportional_to.is_none()
        {
            return Err(EngineError::config(format!(
                "charge {} is {:?} but has no proportional basis",
                self.identifier, self.charge_method
            )));
        }

        if self.accrue_action.is_some() != self.accrual_account_designator.is_some() {
            return Err(EngineError::config(format!(
                "charge {} needs both an accrue action and an accrual account, or neither",
                self.identifier
            )));
        }

        if let Some(designator) = self.designators().find(|d| d.is_ledger()) {
            return Err(EngineError::config(format!(
                "charge {} cannot post to ledger group {}",
                self.identifier, designator
            )));
        }

        Ok(())
    }
}

/// ordered balance boundaries naming the tiers of a tiered fee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BalanceSegmentSet {
    pub identifier: String,
    /// lower boundary of each segment, strictly ascending
    pub segments: Vec<Decimal>,
    pub segment_identifiers: Vec<String>,
}

/// `[from, to)`, unbounded above when `to` is absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeRange {
    pub from: Decimal,
    pub to: Option<Decimal>,
}

impl ChargeRange {
    pub fn contains(&self, value: Decimal) -> bool {
        self.from <= value && self.to.map_or(true, |to| value < to)
    }
}

impl BalanceSegmentSet {
    pub fn new(identifier: impl Into<String>, segments: Vec<Decimal>, segment_identifiers: Vec<&str>) -> Self {
        Self {
            identifier: identifier.into(),
            segments,
            segment_identifiers: segment_identifiers.into_iter().map(String::from).collect(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.segments.is_empty() || self.segments.len() != self.segment_identifiers.len() {
            return Err(EngineError::config(format!(
                "segment set {} needs one identifier per boundary",
                self.identifier
            )));
        }
        if self.segments.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(EngineError::config(format!(
                "segment set {} boundaries must be strictly ascending",
                self.identifier
            )));
        }
        Ok(())
    }

    fn index_of(&self, segment: &str) -> Result<usize> {
        self.segment_identifiers
            .iter()
            .position(|s| s == segment)
            .ok_or_else(|| {
                EngineError::config(format!("segment {} not in set {}", segment, self.identifier))
            })
    }

    /// the balance range covered by segments `from_segment..=to_segment`
    pub fn range(&self, from_segment: &str, to_segment: &str) -> Result<ChargeRange> {
        self.validate()?;
        let from = self.index_of(from_segment)?;
        let to = self.index_of(to_segment)?;
        if to < from {
            return Err(EngineError::config(format!(
                "segment {} comes before {} in set {}",
                to_segment, from_segment, self.identifier
            )));
        }
        Ok(ChargeRange {
            from: self.segments[from],
            to: self.segments.get(to + 1).copied(),
        })
    }
}
