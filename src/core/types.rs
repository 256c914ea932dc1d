use chrono::NaiveDate;
use serde::Serialize;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StepMode {
    ThirtyDay,
    CalendarMonth,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GrowthTrigger {
    AnniversaryMonth(u32),
    EveryTwelveSteps,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum DirectDebit {
    Fixed(f64),
    ShareOfTakeHome(f64),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Repaying,
    InvestingPostPayoff,
    HorizonReached,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaxSchedule {
    pub personal_allowance: f64,
    pub basic_rate_limit: f64,
    pub higher_rate_limit: f64,
    pub allowance_taper_start: f64,
    pub basic_rate: f64,
    pub higher_rate: f64,
    pub additional_rate: f64,
    pub ni_primary_threshold: f64,
    pub ni_upper_earnings_limit: f64,
    pub ni_main_rate: f64,
    pub ni_upper_rate: f64,
}

impl TaxSchedule {
    pub fn uk_2023_24() -> Self {
        Self {
            personal_allowance: 12_570.0,
            basic_rate_limit: 50_270.0,
            higher_rate_limit: 125_140.0,
            allowance_taper_start: 100_000.0,
            basic_rate: 0.20,
            higher_rate: 0.40,
            additional_rate: 0.45,
            ni_primary_threshold: 12_570.0,
            ni_upper_earnings_limit: 50_270.0,
            ni_main_rate: 0.08,
            ni_upper_rate: 0.02,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepaymentPolicy {
    pub rate_percent: f64,
    pub floor_at_zero: bool,
    pub minimum_income: Option<f64>,
}

impl Default for RepaymentPolicy {
    fn default() -> Self {
        Self {
            rate_percent: 9.0,
            floor_at_zero: false,
            minimum_income: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub start_date: NaiveDate,
    pub horizon_years: u32,
    pub step_mode: StepMode,
    pub growth_trigger: GrowthTrigger,
    pub tax_schedule: TaxSchedule,
    pub repayment: RepaymentPolicy,
    pub pension_percent: f64,
    pub deduct_repayment_from_pay: bool,
    pub horizon_annual_return_percent: f64,
}

pub fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 9, 1).unwrap_or(NaiveDate::MIN)
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_date: default_start_date(),
            horizon_years: 30,
            step_mode: StepMode::ThirtyDay,
            growth_trigger: GrowthTrigger::AnniversaryMonth(4),
            tax_schedule: TaxSchedule::uk_2023_24(),
            repayment: RepaymentPolicy::default(),
            pension_percent: 0.0,
            deduct_repayment_from_pay: true,
            horizon_annual_return_percent: 5.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Inputs {
    pub loan_balance: f64,
    pub annual_interest_rate: f64,
    pub income: f64,
    pub income_growth_percent: f64,
    pub threshold: f64,
    pub threshold_growth_percent: f64,
    pub direct_debit: DirectDebit,
    pub investment_percent: f64,
    pub fixed_monthly_contribution: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TakeHomeBreakdown {
    pub gross_income: f64,
    pub pension_contribution: f64,
    pub taxable_income: f64,
    pub income_tax: f64,
    pub national_insurance: f64,
    pub loan_repayment: f64,
    pub take_home: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaidOffProjection {
    pub months_to_payoff: u32,
    pub payoff_date: NaiveDate,
    pub total_paid: f64,
    pub overpayment: f64,
    pub total_invested: f64,
    pub total_assets_at_horizon: f64,
    pub horizon_date: NaiveDate,
    pub horizon_months: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnpaidProjection {
    pub months_elapsed: u32,
    pub total_paid_so_far: f64,
    pub remaining_balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum ProjectionOutcome {
    PaidOff(PaidOffProjection),
    NotPaidOffWithinHorizon(UnpaidProjection),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub start_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub outcome: ProjectionOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthRecord {
    pub step: u32,
    pub date: NaiveDate,
    pub phase: Phase,
    pub loan_balance: f64,
    pub income: f64,
    pub threshold: f64,
    pub take_home_monthly: f64,
    pub mandatory_payment: f64,
    pub discretionary_payment: f64,
    pub contribution: f64,
    pub running_total: f64,
}
