//! Session events, commands and notifications
//!
//! The session is a reducer: it consumes [`SessionEvent`]s and returns
//! [`Command`]s. Anything asynchronous (route queries, submissions) is
//! performed by the orchestrator and fed back in as another event, so the
//! session itself never blocks and is fully deterministic under test.

use bitcoin::secp256k1::PublicKey;
use sendflow_common::{
    Amount, Balances, CurrencyUnit, OnchainFeeEstimates, Route, SubmissionOutcome,
    SubmissionRequest,
};
use serde::Serialize;

use crate::classify::Classification;
use crate::wizard::WizardStep;

/// Identity of the invoice state a route query was issued for
///
/// A route result is only applied if the session still matches the
/// fingerprint it was queried under, otherwise it is stale and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouteFingerprint {
    /// Destination node
    pub payee: PublicKey,
    /// Amount in satoshis the query was made for
    pub amount: Amount,
}

/// A discrete input to the session
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The payment request field was edited in the form
    PayReqChanged(String),
    /// A new payment request arrived from outside the form, such as a
    /// scanned QR code or a payment link
    ExternalPayReq(String),
    /// The crypto amount field was edited
    AmountCryptoChanged(String),
    /// The fiat amount field was edited
    AmountFiatChanged(String),
    /// A different display unit was selected
    UnitChanged(CurrencyUnit),
    /// The user pressed next or send, also synthesized by auto-advance
    SubmitPressed,
    /// The user pressed back
    BackPressed,
    /// The node answered a route query
    RoutesResolved {
        /// Fingerprint the query was issued under
        fingerprint: RouteFingerprint,
        /// Candidate routes, possibly empty
        routes: Vec<Route>,
    },
    /// The node failed a route query
    RouteQueryFailed {
        /// Fingerprint the query was issued under
        fingerprint: RouteFingerprint,
        /// Node error, stringified
        error: String,
    },
    /// The node resolved a dispatched submission
    SubmissionResolved {
        /// Generation stamped at dispatch
        generation: u64,
        /// What the node reported
        result: Result<SubmissionOutcome, String>,
    },
    /// Fresh balances were observed
    BalancesUpdated(Balances),
    /// Fresh on-chain fee estimates were observed
    FeeEstimatesUpdated(OnchainFeeEstimates),
}

/// Side effect the session asks the orchestrator to perform
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Query candidate routes for the fingerprint
    QueryRoutes(RouteFingerprint),
    /// Hand a submission to the node backend
    Dispatch {
        /// Generation the result must carry to be applied
        generation: u64,
        /// The submission itself
        request: SubmissionRequest,
    },
    /// Publish a notification to subscribers
    Notify(Notification),
}

/// Reason a submit at the summary step was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockedReason {
    /// A submission is already in flight
    SubmissionInFlight,
    /// The resolved amount exceeds the funding pool
    InsufficientFunds,
    /// No amount could be resolved from invoice or form
    AmountUnresolved,
    /// The invoice expired before dispatch
    InvoiceExpired,
}

/// Outbound notification for presentation layers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Notification {
    /// The wizard moved between steps
    StepChanged {
        /// Step shown before the move
        previous: Option<WizardStep>,
        /// Step shown now
        current: WizardStep,
    },
    /// The payment request reclassified
    ClassificationChanged(Classification),
    /// Fee bounds over the candidate routes changed
    FeeBoundsUpdated {
        /// Cheapest candidate route fee
        min: Option<Amount>,
        /// Costliest candidate route fee
        max: Option<Amount>,
    },
    /// A submission was handed to the node backend
    SubmissionDispatched {
        /// Generation stamped on the submission
        generation: u64,
        /// What was dispatched
        request: SubmissionRequest,
    },
    /// The in-flight submission succeeded
    SubmissionSucceeded {
        /// Generation stamped at dispatch
        generation: u64,
        /// Settlement details from the node
        outcome: SubmissionOutcome,
    },
    /// The in-flight submission failed, the user may retry
    SubmissionFailed {
        /// Generation stamped at dispatch
        generation: u64,
        /// Node error, stringified
        error: String,
    },
    /// A submit at the summary step was refused
    SubmissionBlocked(BlockedReason),
}
