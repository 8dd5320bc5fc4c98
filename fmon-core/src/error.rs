//! Domain error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("field {field} must not be null when vesselIdentifier is {identifier}")]
    MissingIdentifier { identifier: String, field: String },

    #[error("No logbook fishing trip found for vessel {cfr}")]
    NoLogbookFishingTripFound { cfr: String },

    #[error("NATINF code {natinf_code} not found")]
    NatinfNotFound { natinf_code: i32 },

    #[error("Beacon malfunction {id} not found")]
    BeaconMalfunctionNotFound { id: i64 },

    #[error("Reporting {id} not found")]
    ReportingNotFound { id: i64 },

    #[error("Pending alert {id} not found")]
    PendingAlertNotFound { id: i64 },

    #[error("Silenced alert {id} not found")]
    SilencedAlertNotFound { id: i64 },

    #[error("Could not update beacon malfunction: {0}")]
    CouldNotUpdateBeaconMalfunction(String),

    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    #[error("Reporting {id} of type {reporting_type} cannot be edited")]
    ReportingNotEditable { id: i64, reporting_type: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Common(fmon_common::Error),
}

impl Error {
    /// Whether the error means the requested thing does not exist, as
    /// opposed to an empty result or a failure
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NoLogbookFishingTripFound { .. }
                | Error::NatinfNotFound { .. }
                | Error::BeaconMalfunctionNotFound { .. }
                | Error::ReportingNotFound { .. }
                | Error::PendingAlertNotFound { .. }
                | Error::SilencedAlertNotFound { .. }
                | Error::Common(fmon_common::Error::NotFound(_))
        )
    }
}

impl From<fmon_common::Error> for Error {
    fn from(err: fmon_common::Error) -> Self {
        match err {
            fmon_common::Error::MissingIdentifier { identifier, field } => {
                Error::MissingIdentifier { identifier, field }
            }
            fmon_common::Error::Database(e) => Error::Database(e),
            other => Error::Common(other),
        }
    }
}
