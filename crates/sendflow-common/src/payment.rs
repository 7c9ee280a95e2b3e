//! Node backend interface
//!
//! The engine talks to the Lightning node and the on-chain wallet through
//! [`NodeBackend`]; real hosts wire in their node RPC, tests wire in the fake
//! node crate.

use async_trait::async_trait;
use bitcoin::secp256k1::PublicKey;
use bitcoin::Address;
use lightning_invoice::Bolt11Invoice;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::amount::{Amount, CurrencyUnit};

/// Payment Error
#[derive(Debug, Error)]
pub enum Error {
    /// Invoice already paid
    #[error("Invoice already paid")]
    InvoiceAlreadyPaid,
    /// Payment is already pending
    #[error("Payment is pending")]
    PaymentPending,
    /// No route to the payee
    #[error("No route to payee")]
    NoRoute,
    /// Node reports insufficient funds
    #[error("Insufficient funds")]
    InsufficientFunds,
    /// Unsupported unit
    #[error("Unsupported unit")]
    UnsupportedUnit,
    /// Node Error
    #[error(transparent)]
    Node(Box<dyn std::error::Error + Send + Sync>),
    /// AnyHow Error
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
    /// Amount Error
    #[error(transparent)]
    Amount(#[from] crate::amount::Error),
    /// Custom
    #[error("`{0}`")]
    Custom(String),
}

/// Candidate path to an invoice's payee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Total fee along the path, in satoshis
    pub total_fee: Amount,
    /// Number of hops in the path
    pub hops: u32,
}

/// On-chain send, built at the summary step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnchainSubmission {
    /// Destination address, validated for the wallet network
    pub address: Address,
    /// Amount in satoshis
    pub amount: Amount,
    /// Display unit the user entered the amount in
    pub unit: CurrencyUnit,
    /// Fee rate in sat/vB, when an estimate was available
    pub sat_per_vbyte: Option<u64>,
}

/// Lightning payment, built at the summary step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LightningSubmission {
    /// Invoice to pay
    pub invoice: Bolt11Invoice,
    /// Amount in satoshis; only set for amount-open invoices
    pub amount: Option<Amount>,
    /// Display unit the user entered the amount in
    pub unit: CurrencyUnit,
    /// Maximum routing fee the payer authorizes, in satoshis
    pub fee_limit: Option<Amount>,
}

/// The terminal output of a wizard session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SubmissionRequest {
    /// Broadcast an on-chain transaction
    Onchain(OnchainSubmission),
    /// Pay a bolt11 invoice
    Lightning(Box<LightningSubmission>),
}

impl SubmissionRequest {
    /// Amount the submission spends, in satoshis, when one is attached
    pub fn amount(&self) -> Option<Amount> {
        match self {
            Self::Onchain(onchain) => Some(onchain.amount),
            Self::Lightning(lightning) => lightning.amount,
        }
    }
}

/// Result of a completed submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    /// Identifier the node assigned to the payment
    pub payment_id: String,
    /// Payment preimage or transaction id, when the node returns one
    pub payment_proof: Option<String>,
    /// Total spent including fees, in satoshis, when the node reports it
    pub total_spent: Option<Amount>,
}

/// Node backend trait
///
/// Route discovery and the two submission paths. Implementations perform the
/// actual network I/O; the engine only sequences calls and never retries.
#[async_trait]
pub trait NodeBackend: Send + Sync {
    /// Query candidate routes to `payee` for `amount` satoshis
    async fn query_routes(&self, payee: PublicKey, amount: Amount) -> Result<Vec<Route>, Error>;

    /// Broadcast an on-chain send
    async fn send_onchain(
        &self,
        submission: OnchainSubmission,
    ) -> Result<SubmissionOutcome, Error>;

    /// Pay a bolt11 invoice
    async fn pay_invoice(
        &self,
        submission: LightningSubmission,
    ) -> Result<SubmissionOutcome, Error>;
}
