mod clock;
mod engine;
mod error;
mod growth;
mod loan;
mod repayment;
mod report;
mod tax;
mod types;

pub use clock::{SimulationClock, expiry_date};
pub use engine::{HorizonState, PayoffState, ProjectionEngine, RepaymentPhase};
pub use error::{EngineResult, ProjectionError};
pub use growth::grow;
pub use loan::advance_month;
pub use repayment::{DEFAULT_REPAYMENT_RATE, mandatory_monthly_payment};
pub use report::{Report, format_currency, format_report};
pub use tax::{income_tax, national_insurance, take_home_breakdown, take_home_pay};
pub use types::{
    DirectDebit, GrowthTrigger, Inputs, MonthRecord, PaidOffProjection, Phase, ProjectionOutcome,
    ProjectionResult, RepaymentPolicy, SimulationConfig, StepMode, TakeHomeBreakdown, TaxSchedule,
    UnpaidProjection, default_start_date,
};
