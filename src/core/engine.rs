use chrono::NaiveDate;
use log::{debug, warn};

use super::clock::{SimulationClock, expiry_date};
use super::error::EngineResult;
use super::growth::grow;
use super::loan::advance_month;
use super::tax::take_home_pay;
use super::types::{
    DirectDebit, Inputs, MonthRecord, PaidOffProjection, Phase, ProjectionOutcome,
    ProjectionResult, SimulationConfig, UnpaidProjection,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayoffState {
    pub months: u32,
    pub payoff_date: NaiveDate,
    pub total_paid: f64,
    pub final_balance: f64,
    pub income: f64,
    pub threshold: f64,
    clock: SimulationClock,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RepaymentPhase {
    PaidOff(PayoffState),
    NotPaidOff(UnpaidProjection),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizonState {
    pub total_assets: f64,
    pub horizon_date: NaiveDate,
    pub months: u32,
}

impl DirectDebit {
    pub fn monthly_amount(self, take_home_monthly: f64) -> f64 {
        match self {
            DirectDebit::Fixed(amount) => amount,
            DirectDebit::ShareOfTakeHome(percent) => percent / 100.0 * take_home_monthly,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProjectionEngine {
    config: SimulationConfig,
    expiry: NaiveDate,
}

impl ProjectionEngine {
    pub fn new(config: SimulationConfig) -> EngineResult<Self> {
        let expiry = expiry_date(config.start_date, config.horizon_years, config.step_mode)?;
        Ok(Self { config, expiry })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn expiry_date(&self) -> NaiveDate {
        self.expiry
    }

    pub fn run(&self, inputs: &Inputs) -> EngineResult<ProjectionResult> {
        self.project(inputs, None)
    }

    pub fn run_with_trace(
        &self,
        inputs: &Inputs,
    ) -> EngineResult<(ProjectionResult, Vec<MonthRecord>)> {
        let mut trace = Vec::new();
        let result = self.project(inputs, Some(&mut trace))?;
        Ok((result, trace))
    }

    fn project(
        &self,
        inputs: &Inputs,
        mut trace: Option<&mut Vec<MonthRecord>>,
    ) -> EngineResult<ProjectionResult> {
        let outcome = match self.repay_loan(inputs, trace.as_deref_mut())? {
            RepaymentPhase::NotPaidOff(unpaid) => {
                warn!(
                    "loan not paid off by {}: {} months elapsed, {:.2} outstanding",
                    self.expiry, unpaid.months_elapsed, unpaid.remaining_balance
                );
                ProjectionOutcome::NotPaidOffWithinHorizon(unpaid)
            }
            RepaymentPhase::PaidOff(payoff) => {
                debug!(
                    "loan paid off on {} after {} months, total paid {:.2}",
                    payoff.payoff_date, payoff.months, payoff.total_paid
                );
                let total_invested =
                    self.invest_during_repayment(inputs, payoff.months, trace.as_deref_mut())?;
                debug!("invested {total_invested:.2} over the repayment months");
                let horizon =
                    self.grow_to_horizon(inputs, &payoff, total_invested, trace.as_deref_mut())?;
                debug!(
                    "horizon {} reached after {} further months with {:.2} in assets",
                    horizon.horizon_date, horizon.months, horizon.total_assets
                );

                ProjectionOutcome::PaidOff(PaidOffProjection {
                    months_to_payoff: payoff.months,
                    payoff_date: payoff.payoff_date,
                    total_paid: payoff.total_paid,
                    overpayment: (-payoff.final_balance).max(0.0),
                    total_invested,
                    total_assets_at_horizon: horizon.total_assets,
                    horizon_date: horizon.horizon_date,
                    horizon_months: horizon.months,
                })
            }
        };

        Ok(ProjectionResult {
            start_date: self.config.start_date,
            expiry_date: self.expiry,
            outcome,
        })
    }

    fn monthly_take_home(&self, income: f64, threshold: f64) -> f64 {
        take_home_pay(&self.config, income, self.config.pension_percent, threshold) / 12.0
    }

    pub fn repay_loan(
        &self,
        inputs: &Inputs,
        mut trace: Option<&mut Vec<MonthRecord>>,
    ) -> EngineResult<RepaymentPhase> {
        let config = &self.config;
        let mut clock = SimulationClock::new(config.start_date, config.step_mode);
        let mut loan = inputs.loan_balance;
        let mut income = inputs.income;
        let mut threshold = inputs.threshold;
        let mut months = 0u32;
        let mut total_paid = 0.0;

        while loan > 0.0 || loan.is_nan() {
            let date = clock.advance()?;
            if date > self.expiry {
                return Ok(RepaymentPhase::NotPaidOff(UnpaidProjection {
                    months_elapsed: months,
                    total_paid_so_far: total_paid,
                    remaining_balance: loan,
                }));
            }

            let take_home_monthly = self.monthly_take_home(income, threshold);
            let discretionary = inputs.direct_debit.monthly_amount(take_home_monthly);
            let mandatory = config.repayment.monthly_payment(income, threshold);
            loan = advance_month(
                loan,
                income,
                discretionary,
                threshold,
                inputs.annual_interest_rate,
                &config.repayment,
            );
            total_paid += mandatory + discretionary;
            months += 1;

            if let Some(trace) = trace.as_deref_mut() {
                trace.push(MonthRecord {
                    step: clock.steps(),
                    date,
                    phase: Phase::Repaying,
                    loan_balance: loan.max(0.0),
                    income,
                    threshold,
                    take_home_monthly,
                    mandatory_payment: mandatory,
                    discretionary_payment: discretionary,
                    contribution: 0.0,
                    running_total: total_paid,
                });
            }

            if config.growth_trigger.fires(date, clock.steps()) {
                income = grow(income, inputs.income_growth_percent);
                threshold = grow(threshold, inputs.threshold_growth_percent);
            }
        }

        Ok(RepaymentPhase::PaidOff(PayoffState {
            months,
            payoff_date: clock.current(),
            total_paid,
            final_balance: loan,
            income,
            threshold,
            clock,
        }))
    }

    pub fn invest_during_repayment(
        &self,
        inputs: &Inputs,
        months: u32,
        mut trace: Option<&mut Vec<MonthRecord>>,
    ) -> EngineResult<f64> {
        let config = &self.config;
        let mut clock = SimulationClock::new(config.start_date, config.step_mode);
        let mut income = inputs.income;
        let threshold = inputs.threshold;
        let mut total_invested = 0.0;

        for _ in 0..months {
            let date = clock.advance()?;
            let take_home_monthly = self.monthly_take_home(income, threshold);
            let contribution = inputs.investment_percent / 100.0 * take_home_monthly;
            total_invested += contribution;

            if let Some(trace) = trace.as_deref_mut() {
                trace.push(MonthRecord {
                    step: clock.steps(),
                    date,
                    phase: Phase::InvestingPostPayoff,
                    loan_balance: 0.0,
                    income,
                    threshold,
                    take_home_monthly,
                    mandatory_payment: 0.0,
                    discretionary_payment: 0.0,
                    contribution,
                    running_total: total_invested,
                });
            }

            if config.growth_trigger.fires(date, clock.steps()) {
                income = grow(income, inputs.income_growth_percent);
            }
        }

        Ok(total_invested)
    }

    pub fn grow_to_horizon(
        &self,
        inputs: &Inputs,
        payoff: &PayoffState,
        opening_total: f64,
        mut trace: Option<&mut Vec<MonthRecord>>,
    ) -> EngineResult<HorizonState> {
        let config = &self.config;
        let monthly_factor = 1.0 + config.horizon_annual_return_percent / 100.0 / 12.0;
        let mut clock = payoff.clock;
        let mut income = payoff.income;
        let mut threshold = payoff.threshold;
        let mut total = opening_total;
        let mut months = 0u32;

        while clock.current() < self.expiry {
            let date = clock.advance()?;
            let take_home_monthly = self.monthly_take_home(income, threshold);
            let discretionary = inputs.direct_debit.monthly_amount(take_home_monthly);
            let mandatory = config.repayment.monthly_payment(income, threshold);
            let freed = mandatory + discretionary;
            let investment = inputs.investment_percent / 100.0 * take_home_monthly;
            let contribution = freed + inputs.fixed_monthly_contribution + investment;
            total += contribution;
            total *= monthly_factor;
            months += 1;

            if let Some(trace) = trace.as_deref_mut() {
                trace.push(MonthRecord {
                    step: clock.steps(),
                    date,
                    phase: Phase::HorizonReached,
                    loan_balance: 0.0,
                    income,
                    threshold,
                    take_home_monthly,
                    mandatory_payment: mandatory,
                    discretionary_payment: discretionary,
                    contribution,
                    running_total: total,
                });
            }

            if config.growth_trigger.fires(date, clock.steps()) {
                income = grow(income, inputs.income_growth_percent);
                threshold = grow(threshold, inputs.threshold_growth_percent);
            }
        }

        Ok(HorizonState {
            total_assets: total,
            horizon_date: clock.current(),
            months,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{GrowthTrigger, StepMode};
    use chrono::Datelike;
    use proptest::prelude::{prop_assert, proptest};

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn sample_inputs() -> Inputs {
        Inputs {
            loan_balance: 43_050.33,
            annual_interest_rate: 7.3,
            income: 60_000.0,
            income_growth_percent: 3.0,
            threshold: 28_470.0,
            threshold_growth_percent: 0.0,
            direct_debit: DirectDebit::Fixed(750.0),
            investment_percent: 10.0,
            fixed_monthly_contribution: 500.0,
        }
    }

    fn engine() -> ProjectionEngine {
        ProjectionEngine::new(SimulationConfig::default()).expect("valid config")
    }

    fn paid_off(result: &ProjectionResult) -> &PaidOffProjection {
        match &result.outcome {
            ProjectionOutcome::PaidOff(paid) => paid,
            other => panic!("expected payoff, got {other:?}"),
        }
    }

    #[test]
    fn golden_reference_scenario() {
        let result = engine().run(&sample_inputs()).expect("projection runs");
        assert_eq!(result.start_date, date(2023, 9, 1));
        assert_eq!(result.expiry_date, date(2053, 8, 24));

        let paid = paid_off(&result);
        assert_eq!(paid.months_to_payoff, 50);
        assert_eq!(paid.payoff_date, date(2027, 10, 10));
        assert_approx_tol(paid.total_paid, 50_654.209_587, 1e-5);
        assert_approx_tol(paid.total_invested, 18_440.902_997, 1e-5);
        assert_approx_tol(paid.total_assets_at_horizon, 1_518_620.262_745, 1e-4);
        assert_eq!(paid.horizon_date, date(2053, 8, 24));
        assert_eq!(paid.horizon_months, 315);
        assert!(paid.overpayment >= 0.0);
    }

    #[test]
    fn unaffordable_loan_stops_at_expiry_with_partial_totals() {
        let mut inputs = sample_inputs();
        inputs.income = 30_000.0;
        inputs.income_growth_percent = 0.0;
        inputs.direct_debit = DirectDebit::Fixed(0.0);
        inputs.investment_percent = 0.0;
        inputs.fixed_monthly_contribution = 0.0;

        let result = engine().run(&inputs).expect("projection runs");
        match result.outcome {
            ProjectionOutcome::NotPaidOffWithinHorizon(unpaid) => {
                assert_eq!(unpaid.months_elapsed, 365);
                assert_approx_tol(unpaid.total_paid_so_far, 4_188.375, 1e-6);
                assert_approx_tol(unpaid.remaining_balance, 378_513.166_142, 1e-4);
            }
            other => panic!("expected unpaid outcome, got {other:?}"),
        }
    }

    #[test]
    fn non_positive_starting_balance_is_paid_off_at_start() {
        let mut inputs = sample_inputs();
        inputs.loan_balance = 0.0;
        let result = engine().run(&inputs).expect("projection runs");
        let paid = paid_off(&result);
        assert_eq!(paid.months_to_payoff, 0);
        assert_eq!(paid.payoff_date, date(2023, 9, 1));
        assert_eq!(paid.total_paid, 0.0);
        assert_eq!(paid.total_invested, 0.0);
        assert_eq!(paid.horizon_months, 365);
    }

    #[test]
    fn trace_covers_every_phase_and_matches_totals() {
        let (result, trace) = engine()
            .run_with_trace(&sample_inputs())
            .expect("projection runs");
        let paid = paid_off(&result);

        let count = |phase: Phase| trace.iter().filter(|r| r.phase == phase).count() as u32;
        assert_eq!(count(Phase::Repaying), paid.months_to_payoff);
        assert_eq!(count(Phase::InvestingPostPayoff), paid.months_to_payoff);
        assert_eq!(count(Phase::HorizonReached), paid.horizon_months);

        let last_repayment = trace
            .iter()
            .filter(|r| r.phase == Phase::Repaying)
            .last()
            .expect("repayment rows");
        assert_eq!(last_repayment.date, paid.payoff_date);
        assert_eq!(last_repayment.loan_balance, 0.0);
        assert_approx_tol(last_repayment.running_total, paid.total_paid, 1e-9);

        let last = trace.last().expect("horizon rows");
        assert_eq!(last.date, paid.horizon_date);
        assert_approx_tol(last.running_total, paid.total_assets_at_horizon, 1e-9);
    }

    #[test]
    fn trace_and_plain_run_agree() {
        let engine = engine();
        let plain = engine.run(&sample_inputs()).expect("projection runs");
        let (traced, _) = engine
            .run_with_trace(&sample_inputs())
            .expect("projection runs");
        assert_eq!(plain, traced);
    }

    #[test]
    fn april_growth_follows_the_drifting_clock() {
        let (_, trace) = engine()
            .run_with_trace(&sample_inputs())
            .expect("projection runs");
        let repaying: Vec<_> = trace
            .iter()
            .filter(|r| r.phase == Phase::Repaying)
            .collect();
        for pair in repaying.windows(2) {
            let (before, after) = (pair[0], pair[1]);
            if before.date.month() == 4 {
                assert_approx_tol(after.income, before.income * 1.03, 1e-6);
            } else {
                assert_eq!(after.income, before.income);
            }
        }
    }

    #[test]
    fn share_of_take_home_direct_debit() {
        let mut inputs = sample_inputs();
        inputs.direct_debit = DirectDebit::ShareOfTakeHome(20.0);
        let (result, trace) = engine().run_with_trace(&inputs).expect("projection runs");
        let first = trace.first().expect("first month");
        assert_approx_tol(first.discretionary_payment, 0.2 * first.take_home_monthly, 1e-9);
        assert!(matches!(result.outcome, ProjectionOutcome::PaidOff(_)));
    }

    #[test]
    fn floor_at_zero_stops_below_threshold_income_growing_the_loan() {
        let mut inputs = sample_inputs();
        inputs.income = 20_000.0;
        inputs.income_growth_percent = 0.0;
        inputs.annual_interest_rate = 0.0;
        inputs.direct_debit = DirectDebit::Fixed(0.0);

        let mut config = SimulationConfig::default();
        config.repayment.floor_at_zero = true;
        let floored = ProjectionEngine::new(config).expect("valid config");
        match floored.run(&inputs).expect("projection runs").outcome {
            ProjectionOutcome::NotPaidOffWithinHorizon(unpaid) => {
                assert_eq!(unpaid.total_paid_so_far, 0.0);
                assert_eq!(unpaid.remaining_balance, inputs.loan_balance);
            }
            other => panic!("expected unpaid outcome, got {other:?}"),
        }

        match engine().run(&inputs).expect("projection runs").outcome {
            ProjectionOutcome::NotPaidOffWithinHorizon(unpaid) => {
                assert!(unpaid.total_paid_so_far < 0.0);
                assert!(unpaid.remaining_balance > inputs.loan_balance);
            }
            other => panic!("expected unpaid outcome, got {other:?}"),
        }
    }

    #[test]
    fn calendar_month_mode_ends_on_anniversary() {
        let config = SimulationConfig {
            step_mode: StepMode::CalendarMonth,
            ..SimulationConfig::default()
        };
        let engine = ProjectionEngine::new(config).expect("valid config");
        assert_eq!(engine.expiry_date(), date(2053, 9, 1));

        let result = engine.run(&sample_inputs()).expect("projection runs");
        let paid = paid_off(&result);
        assert_eq!(paid.horizon_date, date(2053, 9, 1));
        assert_eq!(paid.months_to_payoff + paid.horizon_months, 360);
    }

    #[test]
    fn every_twelve_steps_grows_after_first_month_then_yearly() {
        let config = SimulationConfig {
            growth_trigger: GrowthTrigger::EveryTwelveSteps,
            ..SimulationConfig::default()
        };
        let engine = ProjectionEngine::new(config).expect("valid config");
        let (_, trace) = engine
            .run_with_trace(&sample_inputs())
            .expect("projection runs");
        let repaying: Vec<_> = trace
            .iter()
            .filter(|r| r.phase == Phase::Repaying)
            .collect();
        assert_eq!(repaying[0].income, 60_000.0);
        assert_approx_tol(repaying[1].income, 61_800.0, 1e-9);
        assert_approx_tol(repaying[12].income, 61_800.0, 1e-9);
        assert_approx_tol(repaying[13].income, 63_654.0, 1e-9);
    }

    #[test]
    fn nan_balance_is_never_reported_as_paid_off() {
        let mut inputs = sample_inputs();
        inputs.loan_balance = f64::NAN;
        let result = engine().run(&inputs).expect("projection runs");
        match result.outcome {
            ProjectionOutcome::NotPaidOffWithinHorizon(unpaid) => {
                assert_eq!(unpaid.months_elapsed, 365);
                assert!(unpaid.remaining_balance.is_nan());
            }
            other => panic!("expected unpaid outcome, got {other:?}"),
        }
    }

    #[test]
    fn nan_interest_rate_does_not_pay_off_the_loan() {
        let mut inputs = sample_inputs();
        inputs.annual_interest_rate = f64::NAN;
        let result = engine().run(&inputs).expect("projection runs");
        assert!(matches!(
            result.outcome,
            ProjectionOutcome::NotPaidOffWithinHorizon(_)
        ));
    }

    #[test]
    fn higher_direct_debit_pays_off_no_later() {
        let engine = engine();
        let base = engine.run(&sample_inputs()).expect("projection runs");
        let mut faster = sample_inputs();
        faster.direct_debit = DirectDebit::Fixed(1_500.0);
        let fast = engine.run(&faster).expect("projection runs");
        assert!(paid_off(&fast).months_to_payoff <= paid_off(&base).months_to_payoff);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(32))]

        #[test]
        fn prop_every_loop_is_bounded_by_the_horizon(
            loan in 0u32..150_000,
            rate_bp in 0u32..1_500,
            income in 0u32..200_000,
            direct_debit in 0u32..3_000,
            return_bp in 1u32..1_500,
            invest_percent in 0u32..30,
        ) {
            let config = SimulationConfig {
                horizon_annual_return_percent: return_bp as f64 / 100.0,
                ..SimulationConfig::default()
            };
            let engine = ProjectionEngine::new(config).expect("valid config");
            let inputs = Inputs {
                loan_balance: loan as f64,
                annual_interest_rate: rate_bp as f64 / 100.0,
                income: income as f64,
                direct_debit: DirectDebit::Fixed(direct_debit as f64),
                investment_percent: invest_percent as f64,
                ..sample_inputs()
            };

            let (result, trace) = engine.run_with_trace(&inputs).expect("projection runs");
            prop_assert!(trace.len() <= 3 * 366);
            match result.outcome {
                ProjectionOutcome::PaidOff(paid) => {
                    prop_assert!(paid.months_to_payoff + paid.horizon_months <= 366);
                    prop_assert!(paid.horizon_date >= result.expiry_date);
                    prop_assert!(paid.total_assets_at_horizon.is_finite());
                }
                ProjectionOutcome::NotPaidOffWithinHorizon(unpaid) => {
                    prop_assert!(unpaid.months_elapsed <= 366);
                    prop_assert!(unpaid.remaining_balance > 0.0);
                }
            }
        }
    }
}
