use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// unique identifier for a loan case
pub type CaseId = Uuid;

/// lifecycle actions a loan case goes through
///
/// declaration order is the order of application for actions falling on the
/// same date
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Open,
    Deny,
    Approve,
    Disburse,
    ApplyInterest,
    AcceptPayment,
    MarkLate,
    MarkInArrears,
    WriteOff,
    Close,
    Recover,
}

impl Action {
    pub const ALL: [Action; 11] = [
        Action::Open,
        Action::Deny,
        Action::Approve,
        Action::Disburse,
        Action::ApplyInterest,
        Action::AcceptPayment,
        Action::MarkLate,
        Action::MarkInArrears,
        Action::WriteOff,
        Action::Close,
        Action::Recover,
    ];

    /// the transaction message used for ledger entries posted by this action
    pub fn message(&self) -> &'static str {
        match self {
            Action::Open => "OPEN",
            Action::Deny => "DENY",
            Action::Approve => "APPROVE",
            Action::Disburse => "DISBURSE",
            Action::ApplyInterest => "APPLY_INTEREST",
            Action::AcceptPayment => "ACCEPT_PAYMENT",
            Action::MarkLate => "MARK_LATE",
            Action::MarkInArrears => "MARK_IN_ARREARS",
            Action::WriteOff => "WRITE_OFF",
            Action::Close => "CLOSE",
            Action::Recover => "RECOVER",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// how a charge amount is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChargeMethod {
    /// configured amount, unscaled
    Fixed,
    /// configured rate scaled to the action period, times the basis
    Proportional,
    /// case interest rate scaled to the action period, times the basis
    Interest,
}

/// quantity a proportional or interest charge is multiplied against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProportionalBasis {
    /// the case's maximum balance
    MaximumBalance,
    /// customer loan principal minus principal moved earlier in the pass
    RunningBalance,
    /// size of the payment or disbursal
    PaymentSize,
    /// effective balance of the charge's own from account
    FromAccountBalance,
    /// effective balance of the charge's own to account
    ToAccountBalance,
    /// principal actually moved by the request
    PrincipalAdjustment,
}

impl ProportionalBasis {
    /// position in the order of application; charges with no basis are 0
    pub fn order_of_application(basis: Option<ProportionalBasis>) -> u8 {
        match basis {
            None => 0,
            Some(ProportionalBasis::MaximumBalance) => 1,
            Some(ProportionalBasis::RunningBalance) => 2,
            Some(ProportionalBasis::PaymentSize) => 3,
            Some(ProportionalBasis::FromAccountBalance) => 4,
            Some(ProportionalBasis::ToAccountBalance) => 5,
            Some(ProportionalBasis::PrincipalAdjustment) => 6,
        }
    }
}

/// calendar unit used for terms, payment cycles and charge cycle sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemporalUnit {
    Days,
    Weeks,
    Months,
    Years,
}

impl TemporalUnit {
    /// average length of the unit in seconds, leap years included
    pub fn estimated_seconds(&self) -> i64 {
        match self {
            TemporalUnit::Days => 86_400,
            TemporalUnit::Weeks => 604_800,
            TemporalUnit::Months => 2_629_746,
            TemporalUnit::Years => 31_556_952,
        }
    }

    /// add `amount` units to a date, clamping month ends
    pub fn add_to(&self, date: NaiveDate, amount: u32) -> Option<NaiveDate> {
        match self {
            TemporalUnit::Days => date.checked_add_days(Days::new(amount as u64)),
            TemporalUnit::Weeks => date.checked_add_days(Days::new(amount as u64 * 7)),
            TemporalUnit::Months => date.checked_add_months(Months::new(amount)),
            TemporalUnit::Years => date.checked_add_months(Months::new(amount.checked_mul(12)?)),
        }
    }
}

/// which side of a ledger account grows its balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountSign {
    /// assets and expenses
    DebitNormal,
    /// income, liabilities and allowances
    CreditNormal,
}

/// symbolic account roles, resolved per case to ledger accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccountDesignator {
    /// ledger group of the customer's principal, interest and fee receivables
    #[serde(rename = "customer-loan")]
    CustomerLoanGroup,
    CustomerLoanPrincipal,
    CustomerLoanInterest,
    CustomerLoanFees,
    LoanFundsSource,
    ProcessingFeeIncome,
    OriginationFeeIncome,
    DisbursementFeeIncome,
    InterestIncome,
    InterestAccrual,
    LateFeeIncome,
    LateFeeAccrual,
    ProductLossAllowance,
    GeneralLossAllowance,
    GeneralExpense,
    /// the caller's own account money enters or leaves through
    Entry,
}

impl AccountDesignator {
    pub fn sign(&self) -> AccountSign {
        match self {
            AccountDesignator::CustomerLoanGroup
            | AccountDesignator::CustomerLoanPrincipal
            | AccountDesignator::CustomerLoanInterest
            | AccountDesignator::CustomerLoanFees
            | AccountDesignator::LoanFundsSource
            | AccountDesignator::GeneralLossAllowance
            | AccountDesignator::GeneralExpense => AccountSign::DebitNormal,
            AccountDesignator::ProcessingFeeIncome
            | AccountDesignator::OriginationFeeIncome
            | AccountDesignator::DisbursementFeeIncome
            | AccountDesignator::InterestIncome
            | AccountDesignator::InterestAccrual
            | AccountDesignator::LateFeeIncome
            | AccountDesignator::LateFeeAccrual
            | AccountDesignator::ProductLossAllowance
            | AccountDesignator::Entry => AccountSign::CreditNormal,
        }
    }

    /// ledger groups are never posted to directly
    pub fn is_ledger(&self) -> bool {
        matches!(self, AccountDesignator::CustomerLoanGroup)
    }

    /// member accounts of a ledger group, or the designator itself
    pub fn members(&self) -> Vec<AccountDesignator> {
        match self {
            AccountDesignator::CustomerLoanGroup => vec![
                AccountDesignator::CustomerLoanPrincipal,
                AccountDesignator::CustomerLoanInterest,
                AccountDesignator::CustomerLoanFees,
            ],
            other => vec![*other],
        }
    }
}

impl fmt::Display for AccountDesignator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // serde's name is the canonical one
        match serde_json::to_value(self) {
            Ok(serde_json::Value::String(s)) => f.write_str(&s),
            _ => write!(f, "{:?}", self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_serializes_as_message() {
        for action in Action::ALL {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.message()));
        }
    }

    #[test]
    fn test_designator_names() {
        assert_eq!(AccountDesignator::CustomerLoanGroup.to_string(), "customer-loan");
        assert_eq!(AccountDesignator::CustomerLoanPrincipal.to_string(), "customer-loan-principal");
        let parsed: AccountDesignator = serde_json::from_str("\"late-fee-accrual\"").unwrap();
        assert_eq!(parsed, AccountDesignator::LateFeeAccrual);
    }

    #[test]
    fn test_ledger_group_members() {
        assert!(AccountDesignator::CustomerLoanGroup.is_ledger());
        assert_eq!(AccountDesignator::CustomerLoanGroup.members().len(), 3);
        assert_eq!(AccountDesignator::Entry.members(), vec![AccountDesignator::Entry]);
    }

    #[test]
    fn test_add_months_clamps_to_month_end() {
        let jan31 = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(
            TemporalUnit::Months.add_to(jan31, 1),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert_eq!(
            TemporalUnit::Years.add_to(jan31, 1),
            NaiveDate::from_ymd_opt(2025, 1, 31)
        );
    }

    #[test]
    fn test_basis_order() {
        assert!(
            ProportionalBasis::order_of_application(Some(ProportionalBasis::ToAccountBalance))
                < ProportionalBasis::order_of_application(Some(ProportionalBasis::PrincipalAdjustment))
        );
        assert_eq!(ProportionalBasis::order_of_application(None), 0);
    }
}
