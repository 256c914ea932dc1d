use super::types::RepaymentPolicy;

pub fn advance_month(
    loan_balance: f64,
    income: f64,
    discretionary_payment: f64,
    threshold: f64,
    annual_rate_percent: f64,
    policy: &RepaymentPolicy,
) -> f64 {
    let mut balance = loan_balance;
    if balance > 0.0 {
        balance += annual_rate_percent / 100.0 / 12.0 * balance;
    }
    balance - policy.monthly_payment(income, threshold) - discretionary_payment
}
