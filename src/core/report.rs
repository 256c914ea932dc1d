use std::fmt;

use super::types::{DirectDebit, Inputs, ProjectionOutcome, ProjectionResult, SimulationConfig};

pub fn format_currency(value: f64) -> String {
    let pence = (value.abs() * 100.0).round() as u64;
    let whole = (pence / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, ch) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && pence > 0 { "-" } else { "" };
    format!("{sign}£{grouped}.{:02}", pence % 100)
}

fn describe_direct_debit(direct_debit: DirectDebit) -> String {
    match direct_debit {
        DirectDebit::Fixed(amount) => format_currency(amount),
        DirectDebit::ShareOfTakeHome(percent) => format!("{percent}% of take-home"),
    }
}

pub struct Report<'a> {
    pub inputs: &'a Inputs,
    pub config: &'a SimulationConfig,
    pub result: &'a ProjectionResult,
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Report {
            inputs,
            config,
            result,
        } = self;

        writeln!(f, "Loan value:            {}", format_currency(inputs.loan_balance))?;
        writeln!(
            f,
            "Income:                {} (+{}%/yr)",
            format_currency(inputs.income),
            inputs.income_growth_percent
        )?;
        writeln!(
            f,
            "Direct debit:          {}",
            describe_direct_debit(inputs.direct_debit)
        )?;
        writeln!(
            f,
            "Threshold:             {} (+{}%/yr)",
            format_currency(inputs.threshold),
            inputs.threshold_growth_percent
        )?;
        writeln!(f, "Interest rate:         {}%", inputs.annual_interest_rate)?;
        writeln!(
            f,
            "Investment per month:  {}% of take-home + {}",
            inputs.investment_percent,
            format_currency(inputs.fixed_monthly_contribution)
        )?;
        writeln!(f, "Pension:               {}%", config.pension_percent)?;
        writeln!(f, "Start date:            {}", result.start_date)?;
        writeln!(f)?;

        match &result.outcome {
            ProjectionOutcome::PaidOff(paid) => {
                writeln!(f, "Paid off on:           {}", paid.payoff_date)?;
                writeln!(
                    f,
                    "Time to payoff:        {} months ({:.1} years)",
                    paid.months_to_payoff,
                    f64::from(paid.months_to_payoff) / 12.0
                )?;
                writeln!(f, "Total cost:            {}", format_currency(paid.total_paid))?;
                writeln!(
                    f,
                    "Invested while paying: {}",
                    format_currency(paid.total_invested)
                )?;
                writeln!(
                    f,
                    "Total assets on {}: {}",
                    paid.horizon_date,
                    format_currency(paid.total_assets_at_horizon)
                )
            }
            ProjectionOutcome::NotPaidOffWithinHorizon(unpaid) => {
                writeln!(
                    f,
                    "Not paid off by {} ({} months elapsed)",
                    result.expiry_date, unpaid.months_elapsed
                )?;
                writeln!(
                    f,
                    "Paid so far:           {}",
                    format_currency(unpaid.total_paid_so_far)
                )?;
                writeln!(
                    f,
                    "Balance written off:   {}",
                    format_currency(unpaid.remaining_balance)
                )
            }
        }
    }
}

pub fn format_report(inputs: &Inputs, config: &SimulationConfig, result: &ProjectionResult) -> String {
    Report {
        inputs,
        config,
        result,
    }
    .to_string()
}
