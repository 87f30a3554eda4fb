use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;

use crate::charges::ChargeResolver;
use crate::config::{AccountAssignment, CaseParameters, ProductConfig};
use crate::errors::{EngineError, Result};
use crate::schedule::RepaymentSchedule;
use crate::types::{AccountDesignator, CaseId};

/// everything the engine knows about one loan case
#[derive(Debug, Clone)]
pub struct CaseContext {
    pub case_id: CaseId,
    pub product: Arc<ProductConfig>,
    pub parameters: CaseParameters,
}

impl CaseContext {
    pub fn new(case_id: CaseId, product: Arc<ProductConfig>, parameters: CaseParameters) -> Result<Self> {
        parameters.validate(&product)?;
        Ok(Self {
            case_id,
            product,
            parameters,
        })
    }

    pub fn minor_currency_unit_digits(&self) -> u32 {
        self.product.minor_currency_unit_digits
    }

    pub fn charge_resolver(&self) -> Result<ChargeResolver> {
        ChargeResolver::new(&self.product.charge_definitions, &self.product.balance_segment_sets)
    }

    /// the hypothetical schedule of the case if disbursed on `start`
    pub fn schedule(&self, start: NaiveDate) -> Result<RepaymentSchedule> {
        RepaymentSchedule::generate(start, &self.parameters.term_range, &self.parameters.payment_cycle)
    }

    /// account mapping for one request, one-time assignments taking precedence
    pub fn account_resolver(&self, one_time: &[AccountAssignment]) -> AccountResolver {
        AccountResolver::new(
            one_time,
            &self.parameters.account_assignments,
            &self.product.account_assignments,
        )
    }
}

/// designator to ledger account mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountResolver {
    accounts: HashMap<AccountDesignator, String>,
}

impl AccountResolver {
    /// one-time assignments win over case assignments, which win over product ones
    pub fn new(
        one_time: &[AccountAssignment],
        case: &[AccountAssignment],
        product: &[AccountAssignment],
    ) -> Self {
        let accounts = product
            .iter()
            .chain(case.iter())
            .chain(one_time.iter())
            .map(|a| (a.designator, a.account_identifier.clone()))
            .collect();
        Self { accounts }
    }

    pub fn resolve(&self, designator: AccountDesignator) -> Option<&str> {
        self.accounts.get(&designator).map(String::as_str)
    }

    pub fn resolve_or_err(&self, designator: AccountDesignator) -> Result<&str> {
        self.resolve(designator)
            .ok_or(EngineError::MissingAccountDesignator { designator })
    }

    /// accounts behind a designator; a ledger group expands to its members
    pub fn resolve_members(&self, designator: AccountDesignator) -> Result<Vec<(AccountDesignator, &str)>> {
        designator
            .members()
            .into_iter()
            .map(|member| Ok((member, self.resolve_or_err(member)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PaymentCycle, TermRange};
    use crate::decimal::Money;
    use crate::types::TemporalUnit;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_assignment_precedence() {
        let product = vec![
            AccountAssignment::new(AccountDesignator::Entry, "product-entry"),
            AccountAssignment::new(AccountDesignator::InterestIncome, "1103"),
        ];
        let case = vec![AccountAssignment::new(AccountDesignator::Entry, "case-entry")];
        let one_time = vec![AccountAssignment::new(AccountDesignator::Entry, "teller-till")];

        let resolver = AccountResolver::new(&[], &case, &product);
        assert_eq!(resolver.resolve(AccountDesignator::Entry), Some("case-entry"));

        let resolver = AccountResolver::new(&one_time, &case, &product);
        assert_eq!(resolver.resolve(AccountDesignator::Entry), Some("teller-till"));
        assert_eq!(resolver.resolve(AccountDesignator::InterestIncome), Some("1103"));
    }

    #[test]
    fn test_missing_designator_is_an_error() {
        let resolver = AccountResolver::default();
        let err = resolver.resolve_or_err(AccountDesignator::LateFeeIncome).unwrap_err();
        assert!(matches!(
            err,
            EngineError::MissingAccountDesignator { designator: AccountDesignator::LateFeeIncome }
        ));
    }

    #[test]
    fn test_ledger_group_expands_to_members() {
        let case = vec![
            AccountAssignment::new(AccountDesignator::CustomerLoanPrincipal, "p"),
            AccountAssignment::new(AccountDesignator::CustomerLoanInterest, "i"),
            AccountAssignment::new(AccountDesignator::CustomerLoanFees, "f"),
        ];
        let resolver = AccountResolver::new(&[], &case, &[]);
        let members = resolver.resolve_members(AccountDesignator::CustomerLoanGroup).unwrap();
        let accounts: Vec<&str> = members.iter().map(|(_, a)| *a).collect();
        assert_eq!(accounts, vec!["p", "i", "f"]);
    }

    #[test]
    fn test_case_context_validates_parameters() {
        let product = Arc::new(ProductConfig::personal_loan("pl-01"));
        let parameters = CaseParameters {
            customer_identifier: "alice".to_string(),
            maximum_balance: Money::from_major(1_000_000),
            term_range: TermRange::new(TemporalUnit::Months, 12),
            payment_cycle: PaymentCycle::new(TemporalUnit::Months, 1),
            interest_rate: dec!(12),
            payment_size: None,
            account_assignments: Vec::new(),
        };
        assert!(CaseContext::new(Uuid::new_v4(), product, parameters).is_err());
    }
}
