//! Payment intent classification and submission orchestration
//!
//! One crate-sized answer to "the user pasted something, send the payment":
//! classify the raw string as an on-chain address or bolt11 invoice, walk a
//! confirmation wizard whose length depends on what was pasted, resolve the
//! amount across sat, msat, BTC and fiat entry, aggregate route fees, check
//! the right funding pool, and hand exactly one submission per confirmation
//! to the node backend.
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

pub mod balance;
pub mod classify;
pub mod error;
pub mod events;
pub mod fees;
pub mod flow;
pub mod form;
pub mod resolve;
pub mod session;
pub mod wizard;

#[doc(hidden)]
pub use bitcoin::secp256k1;
#[doc(hidden)]
pub use sendflow_common::{
    self as common, amount, invoice, payment, rates, Amount, Balances, Bolt11Invoice,
    CurrencyUnit, DecodedInvoice, NodeBackend, OnchainFeeEstimates, RateProvider, Route,
    SubmissionOutcome, SubmissionRequest,
};

pub use self::classify::{classify, Classification};
pub use self::error::Error;
pub use self::events::{BlockedReason, Command, Notification, RouteFingerprint, SessionEvent};
pub use self::flow::{PayFlow, PayFlowBuilder};
pub use self::form::{FormField, FormValues};
pub use self::session::{PaySession, SessionContext};
pub use self::wizard::{steps, WizardState, WizardStep};
