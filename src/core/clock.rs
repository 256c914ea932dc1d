use chrono::{Days, Months, NaiveDate};

use super::error::{EngineResult, ProjectionError};
use super::types::StepMode;

pub const DAYS_PER_STEP: u64 = 30;
pub const DAYS_PER_YEAR: u64 = 365;

// Thirty-day mode counts 365-day years.
pub fn expiry_date(start: NaiveDate, horizon_years: u32, mode: StepMode) -> EngineResult<NaiveDate> {
    let expiry = match mode {
        StepMode::ThirtyDay => {
            start.checked_add_days(Days::new(DAYS_PER_YEAR * u64::from(horizon_years)))
        }
        StepMode::CalendarMonth => horizon_years
            .checked_mul(12)
            .and_then(|months| start.checked_add_months(Months::new(months))),
    };
    expiry.ok_or(ProjectionError::HorizonOutOfRange {
        start,
        years: horizon_years,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationClock {
    origin: NaiveDate,
    current: NaiveDate,
    mode: StepMode,
    steps: u32,
}

impl SimulationClock {
    pub fn new(origin: NaiveDate, mode: StepMode) -> Self {
        Self {
            origin,
            current: origin,
            mode,
            steps: 0,
        }
    }

    pub fn current(&self) -> NaiveDate {
        self.current
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn advance(&mut self) -> EngineResult<NaiveDate> {
        let next_step = self.steps + 1;
        let next = match self.mode {
            StepMode::ThirtyDay => self.current.checked_add_days(Days::new(DAYS_PER_STEP)),
            // Offsets from the origin so a 31st does not collapse to the 28th for good.
            StepMode::CalendarMonth => self.origin.checked_add_months(Months::new(next_step)),
        };
        let Some(next) = next else {
            return Err(ProjectionError::DateOutOfRange {
                from: self.current,
                step: next_step,
            });
        };
        self.current = next;
        self.steps = next_step;
        Ok(next)
    }
}
