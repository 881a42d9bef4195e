use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    #[error("tracker name must not be empty")]
    EmptyName,
    #[error("tracker name is {length} characters, the limit is {max}")]
    NameTooLong { length: usize, max: usize },
    #[error("unknown filter mode `{0}`")]
    UnknownFilterMode(String),
    #[error("tracker {0} is not in storage")]
    UnknownTracker(Uuid),
    #[error("cannot complete a tracker on {0}, which is in the future")]
    FutureCompletion(NaiveDate),
}
