use super::types::{SimulationConfig, TakeHomeBreakdown, TaxSchedule};

/// Income tax on the taxable base. The personal allowance taper only applies
/// once the base exceeds the higher-rate limit; between the taper start and
/// that limit the full allowance is kept.
pub fn income_tax(taxable_income: f64, schedule: &TaxSchedule) -> f64 {
    let taxable = taxable_income.max(0.0);
    let allowance = schedule.personal_allowance;
    let basic_limit = schedule.basic_rate_limit;
    let higher_limit = schedule.higher_rate_limit;

    if taxable <= allowance {
        0.0
    } else if taxable <= basic_limit {
        (taxable - allowance) * schedule.basic_rate
    } else if taxable <= higher_limit {
        (basic_limit - allowance) * schedule.basic_rate
            + (taxable - basic_limit) * schedule.higher_rate
    } else {
        let reduction = ((taxable - schedule.allowance_taper_start) / 2.0).floor();
        let tapered_allowance = (allowance - reduction).max(0.0);
        (basic_limit - tapered_allowance) * schedule.basic_rate
            + (higher_limit - basic_limit) * schedule.higher_rate
            + (taxable - higher_limit) * schedule.additional_rate
    }
}

pub fn national_insurance(gross_income: f64, schedule: &TaxSchedule) -> f64 {
    let lower = schedule.ni_primary_threshold;
    let upper = schedule.ni_upper_earnings_limit;

    if gross_income <= lower {
        0.0
    } else if gross_income <= upper {
        (gross_income - lower) * schedule.ni_main_rate
    } else {
        (upper - lower) * schedule.ni_main_rate + (gross_income - upper) * schedule.ni_upper_rate
    }
}

pub fn take_home_breakdown(
    config: &SimulationConfig,
    gross_income: f64,
    pension_percent: f64,
    repayment_threshold: f64,
) -> TakeHomeBreakdown {
    let schedule = &config.tax_schedule;
    let pension_contribution = pension_percent / 100.0 * gross_income;
    let taxable_income = (gross_income - pension_contribution).max(0.0);
    let income_tax = income_tax(taxable_income, schedule);
    let national_insurance = national_insurance(gross_income, schedule);
    let loan_repayment = if config.deduct_repayment_from_pay {
        config
            .repayment
            .annual_payment(gross_income, repayment_threshold)
    } else {
        0.0
    };

    TakeHomeBreakdown {
        gross_income,
        pension_contribution,
        taxable_income,
        income_tax,
        national_insurance,
        loan_repayment,
        take_home: gross_income
            - income_tax
            - national_insurance
            - pension_contribution
            - loan_repayment,
    }
}

pub fn take_home_pay(
    config: &SimulationConfig,
    gross_income: f64,
    pension_percent: f64,
    repayment_threshold: f64,
) -> f64 {
    take_home_breakdown(config, gross_income, pension_percent, repayment_threshold).take_home
}
