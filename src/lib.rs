pub mod balances;
pub mod case;
pub mod charges;
pub mod config;
pub mod costs;
pub mod decimal;
pub mod errors;
pub mod interest;
pub mod ledger;
pub mod payments;
pub mod provision;
pub mod schedule;
pub mod types;

// re-export key types
pub use balances::{LedgerRunningBalances, RunningBalances, SimulatedRunningBalances};
pub use case::{AccountResolver, CaseContext};
pub use charges::{BalanceSegmentSet, ChargeDefinition, ChargeResolver, PostingKind, ScheduledCharge};
pub use config::{
    AccountAssignment, BalanceRange, CaseParameters, InterestRange, PaymentCycle, ProductConfig, TermRange,
};
pub use costs::{ActionRequest, CostComponentEngine};
pub use decimal::{Money, Rate};
pub use errors::{EngineError, ErrorKind, Result};
pub use interest::{compound_rates, geometric_mean_rate, RateAccumulator};
pub use ledger::{InMemoryLedger, JournalEntry, Ledger, LedgerError, Posting};
pub use payments::{
    annuity_payment, loan_payment_size, planned_payments, project_schedule, CostComponent, Payment,
    PaymentBuilder, PlannedPayment, PlannedPaymentPage,
};
pub use provision::{LossProvisionStep, LossProvisionTable};
pub use schedule::{Period, RepaymentSchedule, ScheduledAction};
pub use types::{
    AccountDesignator, AccountSign, Action, CaseId, ChargeMethod, ProportionalBasis, TemporalUnit,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
