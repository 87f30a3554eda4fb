pub mod defaults;
pub mod definition;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::errors::{EngineError, Result};
use crate::schedule::ScheduledAction;
use crate::types::{Action, ProportionalBasis};

pub use definition::{BalanceSegmentSet, ChargeDefinition, ChargeRange, SegmentRange};

/// whether a scheduled charge books the accrual or settles the charge
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PostingKind {
    Accrual,
    Settlement,
}

/// one charge definition firing on one scheduled action
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledCharge {
    pub scheduled_action: ScheduledAction,
    pub definition: Arc<ChargeDefinition>,
    pub range: Option<ChargeRange>,
    pub kind: PostingKind,
}

impl ScheduledCharge {
    pub fn is_accrual(&self) -> bool {
        self.kind == PostingKind::Accrual
    }

    /// the posting that recognizes the charge's amount: the accrual of an
    /// accrued charge, or the settlement of any other
    pub fn recognizes_amount(&self) -> bool {
        if self.definition.is_accrued() {
            self.kind == PostingKind::Accrual
        } else {
            self.kind == PostingKind::Settlement
        }
    }

    fn order_key(&self) -> (chrono::NaiveDate, Action, PostingKind, u8, &str) {
        (
            self.scheduled_action.when,
            self.scheduled_action.action,
            self.kind,
            ProportionalBasis::order_of_application(self.definition.proportional_to),
            self.definition.identifier.as_str(),
        )
    }
}

#[derive(Debug, Clone)]
struct ResolvedDefinition {
    definition: Arc<ChargeDefinition>,
    range: Option<ChargeRange>,
}

/// maps scheduled actions to the charges that fire on them
#[derive(Debug, Clone)]
pub struct ChargeResolver {
    definitions: Vec<ResolvedDefinition>,
    payment: Arc<ChargeDefinition>,
    provision: Arc<ChargeDefinition>,
}

impl ChargeResolver {
    /// segment references are resolved here, once per product
    pub fn new(definitions: &[ChargeDefinition], segment_sets: &[BalanceSegmentSet]) -> Result<Self> {
        let sets: HashMap<&str, &BalanceSegmentSet> =
            segment_sets.iter().map(|s| (s.identifier.as_str(), s)).collect();

        let definitions = definitions
            .iter()
            .map(|definition| {
                let range = match &definition.segment_range {
                    None => None,
                    Some(segments) => {
                        let set = sets.get(segments.segment_set.as_str()).ok_or_else(|| {
                            EngineError::config(format!(
                                "charge {} refers to unknown segment set {}",
                                definition.identifier, segments.segment_set
                            ))
                        })?;
                        Some(set.range(&segments.from_segment, &segments.to_segment)?)
                    }
                };
                Ok(ResolvedDefinition {
                    definition: Arc::new(definition.clone()),
                    range,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            definitions,
            payment: Arc::new(defaults::payment_charge_definition()),
            provision: Arc::new(defaults::provision_charge_definition()),
        })
    }

    pub fn definitions(&self) -> impl Iterator<Item = &ChargeDefinition> {
        self.definitions.iter().map(|r| r.definition.as_ref())
    }

    /// every charge firing on the given actions, in order of application
    pub fn resolve(&self, actions: &[ScheduledAction]) -> Vec<ScheduledCharge> {
        let mut charges = Vec::new();

        for scheduled_action in actions {
            for resolved in &self.definitions {
                let definition = &resolved.definition;
                if definition.is_accrued() && definition.accrue_action == Some(scheduled_action.action) {
                    charges.push(ScheduledCharge {
                        scheduled_action: *scheduled_action,
                        definition: Arc::clone(definition),
                        range: resolved.range,
                        kind: PostingKind::Accrual,
                    });
                }
                if definition.charge_action == scheduled_action.action {
                    charges.push(ScheduledCharge {
                        scheduled_action: *scheduled_action,
                        definition: Arc::clone(definition),
                        range: resolved.range,
                        kind: PostingKind::Settlement,
                    });
                }
            }

            if scheduled_action.action == Action::AcceptPayment {
                charges.push(ScheduledCharge {
                    scheduled_action: *scheduled_action,
                    definition: Arc::clone(&self.payment),
                    range: None,
                    kind: PostingKind::Settlement,
                });
            }
        }

        charges.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
        charges
    }

    /// the provision charge for an arrears action
    pub fn provision_charge(&self, scheduled_action: ScheduledAction) -> ScheduledCharge {
        ScheduledCharge {
            scheduled_action,
            definition: Arc::clone(&self.provision),
            range: None,
            kind: PostingKind::Settlement,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::Period;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn resolver() -> ChargeResolver {
        ChargeResolver::new(&defaults::default_charge_definitions(), &[]).unwrap()
    }

    fn identifiers(charges: &[ScheduledCharge]) -> Vec<(&str, PostingKind)> {
        charges
            .iter()
            .map(|c| (c.definition.identifier.as_str(), c.kind))
            .collect()
    }

    #[test]
    fn test_accept_payment_order_of_application() {
        let period = Period::new(date(2024, 1, 15), date(2024, 2, 15)).unwrap();
        let action = ScheduledAction::new(Action::AcceptPayment, period.end(), Some(period), Some(period));

        let charges = resolver().resolve(&[action]);
        assert_eq!(
            identifiers(&charges),
            vec![
                (defaults::PAYMENT_ID, PostingKind::Settlement),
                (defaults::INTEREST_ID, PostingKind::Settlement),
                (defaults::LATE_FEE_ID, PostingKind::Settlement),
                (defaults::REPAY_FEES_ID, PostingKind::Settlement),
                (defaults::REPAY_INTEREST_ID, PostingKind::Settlement),
                (defaults::REPAY_PRINCIPAL_ID, PostingKind::Settlement),
            ]
        );
    }

    #[test]
    fn test_accruals_precede_settlements_on_the_same_day() {
        let day = Period::one_day(date(2024, 2, 14)).unwrap();
        let period = Period::new(date(2024, 1, 15), date(2024, 2, 15)).unwrap();
        let actions = [
            ScheduledAction::new(Action::AcceptPayment, period.end(), Some(period), Some(period)),
            ScheduledAction::new(Action::ApplyInterest, period.end(), Some(day), Some(period)),
        ];

        let charges = resolver().resolve(&actions);
        assert_eq!(charges[0].definition.identifier, defaults::INTEREST_ID);
        assert_eq!(charges[0].kind, PostingKind::Accrual);
        assert!(charges[0].recognizes_amount());
        assert_eq!(charges[0].scheduled_action.action, Action::ApplyInterest);
    }

    #[test]
    fn test_disburse_fires_only_its_charges() {
        let action = ScheduledAction::on(Action::Disburse, date(2024, 1, 15)).unwrap();
        let charges = resolver().resolve(&[action]);
        assert_eq!(
            identifiers(&charges),
            vec![
                (defaults::DISBURSE_PAYMENT_ID, PostingKind::Settlement),
                (defaults::DISBURSEMENT_FEE_ID, PostingKind::Settlement),
            ]
        );
    }

    #[test]
    fn test_segment_range_resolved_once() {
        let sets = vec![BalanceSegmentSet::new("sizes", vec![dec!(0), dec!(1000)], vec!["small", "large"])];
        let small_fee = ChargeDefinition::fixed(
            "small-fee",
            "Small loan fee",
            crate::types::Action::Disburse,
            dec!(10),
            crate::types::AccountDesignator::Entry,
            crate::types::AccountDesignator::DisbursementFeeIncome,
        )
        .in_segments("sizes", "small", "small");

        let resolver = ChargeResolver::new(&[small_fee.clone()], &sets).unwrap();
        let action = ScheduledAction::on(Action::Disburse, date(2024, 1, 15)).unwrap();
        let charges = resolver.resolve(&[action]);
        assert_eq!(charges[0].range, Some(ChargeRange { from: dec!(0), to: Some(dec!(1000)) }));

        assert!(ChargeResolver::new(&[small_fee], &[]).is_err());
    }
}
