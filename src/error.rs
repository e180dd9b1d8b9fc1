use crate::grades::{GradeRangeError, RecordError};
use crate::pricing::PricingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    InvalidGradeRangeConfiguration(#[from] GradeRangeError),
    #[error(transparent)]
    InvalidPricingTiers(#[from] PricingError),
    #[error(transparent)]
    MalformedRecords(#[from] RecordError),
    /// The store could not complete the call. Nothing was changed locally.
    #[error(transparent)]
    RemoteOperationFailed(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidGradeRangeConfiguration(_) => "invalid_grade_range_configuration",
            Self::InvalidPricingTiers(_) => "invalid_pricing_tiers",
            Self::MalformedRecords(_) => "bad_params",
            Self::RemoteOperationFailed(_) => "remote_operation_failed",
        }
    }

    pub fn rule(&self) -> Option<&'static str> {
        match self {
            Self::InvalidGradeRangeConfiguration(e) => Some(e.rule()),
            Self::InvalidPricingTiers(e) => Some(e.rule()),
            _ => None,
        }
    }
}
