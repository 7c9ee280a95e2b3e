//! Fake Node Error

use thiserror::Error;

/// Fake Node Error
#[derive(Debug, Error)]
pub enum Error {
    /// Scripted route query failure
    #[error("Route query failed")]
    RouteQuery,
    /// Scripted payment failure
    #[error("Payment failed")]
    PaymentFailed,
}

impl From<Error> for sendflow_common::payment::Error {
    fn from(e: Error) -> Self {
        Self::Node(Box::new(e))
    }
}
