//! Pipeline-level errors and their coarse classification.

use crate::data::DataError;
use crate::report::ReportError;
use crate::store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable category attached to every failure the pipeline reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DataUnavailable,
    MalformedData,
    NoValidData,
    StoreFailure,
    InvalidInstruction,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::DataUnavailable => "data_unavailable",
            ErrorKind::MalformedData => "malformed_data",
            ErrorKind::NoValidData => "no_valid_data",
            ErrorKind::StoreFailure => "store_failure",
            ErrorKind::InvalidInstruction => "invalid_instruction",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("store failure for {ticker}: {source}")]
    Store {
        ticker: String,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("no ticker symbols found in instruction")]
    NoTickers,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Data(DataError::Unavailable { .. }) => ErrorKind::DataUnavailable,
            PipelineError::Data(DataError::MalformedData { .. }) => ErrorKind::MalformedData,
            PipelineError::Store { .. } => ErrorKind::StoreFailure,
            PipelineError::Report(ReportError::NoValidData { .. }) => ErrorKind::NoValidData,
            PipelineError::NoTickers => ErrorKind::InvalidInstruction,
        }
    }

    /// Ticker the failure belongs to, if any.
    pub fn ticker(&self) -> Option<&str> {
        match self {
            PipelineError::Data(e) => Some(e.ticker()),
            PipelineError::Store { ticker, .. } => Some(ticker),
            PipelineError::Report(ReportError::NoValidData { ticker }) => Some(ticker),
            PipelineError::NoTickers => None,
        }
    }
}
