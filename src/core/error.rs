use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("Date out of range: cannot step past {from} (step {step})")]
    DateOutOfRange { from: NaiveDate, step: u32 },

    #[error("Horizon of {years} years from {start} is out of range")]
    HorizonOutOfRange { start: NaiveDate, years: u32 },
}

pub type EngineResult<T> = Result<T, ProjectionError>;
