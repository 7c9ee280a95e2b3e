//! Errors

use thiserror::Error;

/// Sendflow error
#[derive(Debug, Error)]
pub enum Error {
    /// Node backend not supplied to the builder
    #[error("Node backend required")]
    BackendRequired,
    /// Amount error
    #[error(transparent)]
    Amount(#[from] sendflow_common::amount::Error),
    /// Invoice error
    #[error(transparent)]
    Invoice(#[from] sendflow_common::invoice::Error),
    /// Payment error
    #[error(transparent)]
    Payment(#[from] sendflow_common::payment::Error),
}
