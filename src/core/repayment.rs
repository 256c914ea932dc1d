use super::types::RepaymentPolicy;

pub const DEFAULT_REPAYMENT_RATE: f64 = 9.0;

/// Income-contingent monthly repayment. Not floored: income below the
/// threshold gives a negative payment.
pub fn mandatory_monthly_payment(income: f64, threshold: f64, rate_percent: f64) -> f64 {
    (rate_percent / 100.0) * ((income - threshold) / 12.0)
}

impl RepaymentPolicy {
    pub fn monthly_payment(&self, income: f64, threshold: f64) -> f64 {
        if let Some(minimum) = self.minimum_income {
            if income < minimum {
                return 0.0;
            }
        }

        let payment = mandatory_monthly_payment(income, threshold, self.rate_percent);
        if self.floor_at_zero {
            payment.max(0.0)
        } else {
            payment
        }
    }

    pub fn annual_payment(&self, income: f64, threshold: f64) -> f64 {
        self.monthly_payment(income, threshold) * 12.0
    }
}
