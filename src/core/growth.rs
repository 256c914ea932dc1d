use chrono::{Datelike, NaiveDate};

use super::types::GrowthTrigger;

pub fn grow(value: f64, annual_percent: f64) -> f64 {
    value * (1.0 + annual_percent / 100.0)
}

impl GrowthTrigger {
    pub fn fires(self, date: NaiveDate, step: u32) -> bool {
        match self {
            GrowthTrigger::AnniversaryMonth(month) => date.month() == month,
            // Steps are 1-based: growth follows the first month, then every twelfth.
            GrowthTrigger::EveryTwelveSteps => step > 0 && (step - 1) % 12 == 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn grow_applies_percent() {
        assert_eq!(grow(100.0, 3.0), 103.0);
    }

    #[test]
    fn grow_negative_percent_shrinks() {
        assert!((grow(200.0, -50.0) - 100.0).abs() < 1e-12);
    }

    #[test]
    fn anniversary_month_fires_only_in_that_month() {
        let trigger = GrowthTrigger::AnniversaryMonth(4);
        assert!(trigger.fires(date(2024, 4, 1), 7));
        assert!(trigger.fires(date(2024, 4, 30), 8));
        assert!(!trigger.fires(date(2024, 5, 1), 9));
        assert!(!trigger.fires(date(2024, 3, 31), 6));
    }

    #[test]
    fn every_twelve_steps_ignores_the_calendar() {
        let trigger = GrowthTrigger::EveryTwelveSteps;
        assert!(!trigger.fires(date(2024, 4, 1), 0));
        assert!(trigger.fires(date(2023, 10, 1), 1));
        assert!(!trigger.fires(date(2023, 11, 1), 2));
        assert!(!trigger.fires(date(2024, 9, 1), 12));
        assert!(trigger.fires(date(2024, 10, 1), 13));
        assert!(!trigger.fires(date(2025, 9, 1), 24));
        assert!(trigger.fires(date(2025, 10, 1), 25));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_grow_zero_stays_zero(percent in -99.0f64..500.0) {
            prop_assert!(grow(0.0, percent) == 0.0);
        }
    }
}
