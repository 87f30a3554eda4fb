use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::ChargeDefinition;
use crate::config::AccountAssignment;
use crate::types::{AccountDesignator, Action, ProportionalBasis, TemporalUnit};

pub const PROCESSING_FEE_ID: &str = "processing-fee";
pub const LOAN_ORIGINATION_FEE_ID: &str = "loan-origination-fee";
pub const DISBURSEMENT_FEE_ID: &str = "disbursement-fee";
pub const DISBURSE_PAYMENT_ID: &str = "disburse-payment";
pub const INTEREST_ID: &str = "interest";
pub const LATE_FEE_ID: &str = "late-fee";
pub const REPAY_PRINCIPAL_ID: &str = "repay-principal";
pub const REPAY_INTEREST_ID: &str = "repay-interest";
pub const REPAY_FEES_ID: &str = "repay-fees";
pub const WRITE_OFF_ID: &str = "write-off";
pub const PAYMENT_ID: &str = "payment";
pub const PROVISION_FOR_LOSSES_ID: &str = "provision-for-losses";

/// the installment itself; its amount is what the customer actually paid in the pass
pub fn payment_charge_definition() -> ChargeDefinition {
    ChargeDefinition::fixed(
        PAYMENT_ID,
        "Payment",
        Action::AcceptPayment,
        Decimal::ZERO,
        AccountDesignator::CustomerLoanGroup,
        AccountDesignator::Entry,
    )
    .read_only()
}

/// loss allowance moved when a case falls into arrears; the amount comes from the provision table
pub fn provision_charge_definition() -> ChargeDefinition {
    ChargeDefinition::fixed(
        PROVISION_FOR_LOSSES_ID,
        "Provision for losses",
        Action::MarkInArrears,
        Decimal::ZERO,
        AccountDesignator::GeneralLossAllowance,
        AccountDesignator::ProductLossAllowance,
    )
    .read_only()
}

/// the standard charge set of a simple amortizing loan
pub fn default_charge_definitions() -> Vec<ChargeDefinition> {
    vec![
        ChargeDefinition::proportional(
            PROCESSING_FEE_ID,
            "Processing fee",
            Action::Open,
            dec!(0.01),
            ProportionalBasis::MaximumBalance,
            AccountDesignator::Entry,
            AccountDesignator::ProcessingFeeIncome,
        ),
        ChargeDefinition::proportional(
            LOAN_ORIGINATION_FEE_ID,
            "Loan origination fee",
            Action::Approve,
            dec!(0.01),
            ProportionalBasis::MaximumBalance,
            AccountDesignator::Entry,
            AccountDesignator::OriginationFeeIncome,
        ),
        ChargeDefinition::proportional(
            DISBURSEMENT_FEE_ID,
            "Disbursement fee",
            Action::Disburse,
            dec!(0.01),
            ProportionalBasis::PrincipalAdjustment,
            AccountDesignator::Entry,
            AccountDesignator::DisbursementFeeIncome,
        ),
        ChargeDefinition::proportional(
            DISBURSE_PAYMENT_ID,
            "Disburse payment",
            Action::Disburse,
            Decimal::ONE,
            ProportionalBasis::PrincipalAdjustment,
            AccountDesignator::CustomerLoanPrincipal,
            AccountDesignator::Entry,
        )
        .read_only(),
        ChargeDefinition::interest(
            INTEREST_ID,
            "Interest",
            Action::AcceptPayment,
            ProportionalBasis::RunningBalance,
            AccountDesignator::CustomerLoanInterest,
            AccountDesignator::InterestIncome,
        )
        .accrued(Action::ApplyInterest, AccountDesignator::InterestAccrual)
        .per(TemporalUnit::Years)
        .read_only(),
        ChargeDefinition::proportional(
            LATE_FEE_ID,
            "Late fee",
            Action::AcceptPayment,
            dec!(0.01),
            ProportionalBasis::PaymentSize,
            AccountDesignator::CustomerLoanFees,
            AccountDesignator::LateFeeIncome,
        )
        .accrued(Action::MarkLate, AccountDesignator::LateFeeAccrual),
        ChargeDefinition::proportional(
            REPAY_PRINCIPAL_ID,
            "Repay principal",
            Action::AcceptPayment,
            Decimal::ONE,
            ProportionalBasis::PrincipalAdjustment,
            AccountDesignator::Entry,
            AccountDesignator::CustomerLoanPrincipal,
        )
        .read_only(),
        ChargeDefinition::proportional(
            REPAY_INTEREST_ID,
            "Repay interest",
            Action::AcceptPayment,
            Decimal::ONE,
            ProportionalBasis::ToAccountBalance,
            AccountDesignator::Entry,
            AccountDesignator::CustomerLoanInterest,
        )
        .read_only(),
        ChargeDefinition::proportional(
            REPAY_FEES_ID,
            "Repay fees",
            Action::AcceptPayment,
            Decimal::ONE,
            ProportionalBasis::ToAccountBalance,
            AccountDesignator::Entry,
            AccountDesignator::CustomerLoanFees,
        )
        .read_only(),
        ChargeDefinition::proportional(
            WRITE_OFF_ID,
            "Write off",
            Action::WriteOff,
            Decimal::ONE,
            ProportionalBasis::RunningBalance,
            AccountDesignator::GeneralExpense,
            AccountDesignator::CustomerLoanPrincipal,
        )
        .read_only(),
    ]
}

/// product-level accounts shared by every case of a product
pub fn default_account_assignments() -> Vec<AccountAssignment> {
    vec![
        AccountAssignment::new(AccountDesignator::LoanFundsSource, "7310"),
        AccountAssignment::new(AccountDesignator::ProcessingFeeIncome, "1312"),
        AccountAssignment::new(AccountDesignator::OriginationFeeIncome, "1310"),
        AccountAssignment::new(AccountDesignator::DisbursementFeeIncome, "1313"),
        AccountAssignment::new(AccountDesignator::InterestIncome, "1103"),
        AccountAssignment::new(AccountDesignator::InterestAccrual, "7810"),
        AccountAssignment::new(AccountDesignator::LateFeeIncome, "1311"),
        AccountAssignment::new(AccountDesignator::LateFeeAccrual, "7820"),
        AccountAssignment::new(AccountDesignator::ProductLossAllowance, "7353"),
        AccountAssignment::new(AccountDesignator::GeneralLossAllowance, "3010"),
        AccountAssignment::new(AccountDesignator::GeneralExpense, "3011"),
    ]
}
