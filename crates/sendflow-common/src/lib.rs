//! Sendflow shared types and functions.
//!
//! This crate is the base foundation for the sendflow engine and its node
//! backends: the amount and currency-unit model, the decoded invoice surface,
//! the collaborator traits a host wires in (node backend, fiat rates), and the
//! submission types the engine emits.

pub mod amount;
pub mod invoice;
pub mod payment;
pub mod rates;
pub mod types;
pub mod util;

// re-exporting external crates
pub use bitcoin;
pub use lightning_invoice::{self, Bolt11Invoice};

pub use self::amount::{Amount, CurrencyUnit};
pub use self::invoice::DecodedInvoice;
pub use self::payment::{
    LightningSubmission, NodeBackend, OnchainSubmission, Route, SubmissionOutcome,
    SubmissionRequest,
};
pub use self::rates::{NoRates, RateProvider};
pub use self::types::{Balances, OnchainFeeEstimates};
