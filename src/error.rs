use crate::core::store::PipelineStep;
use std::num::ParseIntError;
use thiserror::Error;

pub type VcfStoreResult<T> = std::result::Result<T, VcfStoreError>;

#[derive(Debug, Error)]
pub enum VcfStoreError {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    ParseInt(#[from] ParseIntError),
    #[error("No {what} with name '{name}' can be found")]
    NotFound { what: &'static str, name: String },
    #[error("The VCF store already exists: {name}")]
    AlreadyExists { name: String },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("The {step} step failed with exit status {status}")]
    Processing { step: PipelineStep, status: i32 },
    #[error("{0}")]
    InvalidState(String),
    #[error("The VCF '{name}' has not been fully processed")]
    NotReady { name: String },
}

impl VcfStoreError {
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    pub fn dataset_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            what: "VCF",
            name: name.into(),
        }
    }

    pub fn store_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            what: "VCF store",
            name: name.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_processing_failure(&self) -> bool {
        matches!(self, Self::Processing { .. })
    }

    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady { .. })
    }
}

#[macro_export]
macro_rules! vcfstore_error {
    ($($arg:tt)*) => {
        $crate::error::VcfStoreError::message(format!($($arg)*))
    };
}
