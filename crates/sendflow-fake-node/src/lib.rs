//! Sendflow Fake Node Backend
//!
//! Used for testing where route queries and submissions answer from scripted
//! state instead of a real node. Every submission handed to the node is
//! recorded so tests can assert on exactly what was dispatched.

#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bitcoin::hashes::{sha256, Hash};
use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey};
use error::Error;
use lightning_invoice::{Bolt11Invoice, Currency, InvoiceBuilder, PaymentSecret};
use rand::Rng;
use sendflow_common::amount::MSAT_IN_SAT;
use sendflow_common::payment;
use sendflow_common::{
    Amount, CurrencyUnit, LightningSubmission, NodeBackend, OnchainSubmission, RateProvider,
    Route, SubmissionOutcome, SubmissionRequest,
};
use tokio::sync::Mutex;
use tokio::time;
use tracing::instrument;
use uuid::Uuid;

pub mod error;

/// Fallback BTC price in USD
pub const DEFAULT_USD_RATE: f64 = 110_000.0;

/// Fallback BTC price in EUR
pub const DEFAULT_EUR_RATE: f64 = 95_000.0;

/// Fake Node
///
/// Clones share the scripted state, so a test can keep one handle for
/// steering while the flow under test holds another.
#[derive(Debug, Clone)]
pub struct FakeNode {
    routes: Arc<Mutex<Vec<Route>>>,
    sent: Arc<Mutex<Vec<SubmissionRequest>>>,
    fail_route_queries: Arc<AtomicBool>,
    fail_payments: Arc<AtomicBool>,
    payment_delay: u64,
}

impl Default for FakeNode {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeNode {
    /// Create new [`FakeNode`] with no routes and no scripted failures
    pub fn new() -> Self {
        Self::with_routes(Vec::new())
    }

    /// Create new [`FakeNode`] answering route queries with `routes`
    pub fn with_routes(routes: Vec<Route>) -> Self {
        Self {
            routes: Arc::new(Mutex::new(routes)),
            sent: Arc::new(Mutex::new(Vec::new())),
            fail_route_queries: Arc::new(AtomicBool::new(false)),
            fail_payments: Arc::new(AtomicBool::new(false)),
            payment_delay: 0,
        }
    }

    /// Hold submissions for `secs` before resolving them
    pub fn with_payment_delay(mut self, secs: u64) -> Self {
        self.payment_delay = secs;
        self
    }

    /// Replace the scripted route answer
    pub async fn set_routes(&self, routes: Vec<Route>) {
        *self.routes.lock().await = routes;
    }

    /// Make route queries fail until called again with `false`
    pub fn set_fail_route_queries(&self, fail: bool) {
        self.fail_route_queries.store(fail, Ordering::SeqCst);
    }

    /// Make submissions fail until called again with `false`
    pub fn set_fail_payments(&self, fail: bool) {
        self.fail_payments.store(fail, Ordering::SeqCst);
    }

    /// Submissions handed to the node so far, oldest first
    ///
    /// Failed submissions are recorded too.
    pub async fn sent(&self) -> Vec<SubmissionRequest> {
        self.sent.lock().await.clone()
    }

    async fn settle(
        &self,
        request: SubmissionRequest,
    ) -> Result<SubmissionOutcome, payment::Error> {
        if self.payment_delay > 0 {
            time::sleep(time::Duration::from_secs(self.payment_delay)).await;
        }

        let total_spent = self.total_spent(&request).await;
        let outcome = match &request {
            SubmissionRequest::Onchain(_) => SubmissionOutcome {
                payment_id: Uuid::new_v4().to_string(),
                payment_proof: Some(random_hex()),
                total_spent,
            },
            SubmissionRequest::Lightning(lightning) => SubmissionOutcome {
                payment_id: lightning.invoice.payment_hash().to_string(),
                payment_proof: Some(random_hex()),
                total_spent,
            },
        };

        self.sent.lock().await.push(request);

        if self.fail_payments.load(Ordering::SeqCst) {
            return Err(Error::PaymentFailed.into());
        }
        Ok(outcome)
    }

    async fn total_spent(&self, request: &SubmissionRequest) -> Option<Amount> {
        let base = match request {
            SubmissionRequest::Onchain(onchain) => Some(onchain.amount),
            SubmissionRequest::Lightning(lightning) => lightning.amount.or_else(|| {
                lightning
                    .invoice
                    .amount_milli_satoshis()
                    .map(|msat| Amount::from(msat / MSAT_IN_SAT))
            }),
        };

        // pretend the cheapest quoted route was taken
        let fee = match request {
            SubmissionRequest::Lightning(_) => {
                let routes = self.routes.lock().await;
                routes.iter().map(|route| route.total_fee).min()
            }
            SubmissionRequest::Onchain(_) => None,
        };

        match (base, fee) {
            (Some(base), Some(fee)) => base.checked_add(fee),
            (base, None) => base,
            (None, Some(_)) => None,
        }
    }
}

#[async_trait]
impl NodeBackend for FakeNode {
    #[instrument(skip(self))]
    async fn query_routes(
        &self,
        _payee: PublicKey,
        amount: Amount,
    ) -> Result<Vec<Route>, payment::Error> {
        if self.fail_route_queries.load(Ordering::SeqCst) {
            return Err(Error::RouteQuery.into());
        }
        tracing::debug!(%amount, "Answering route query from script");
        Ok(self.routes.lock().await.clone())
    }

    #[instrument(skip_all)]
    async fn send_onchain(
        &self,
        submission: OnchainSubmission,
    ) -> Result<SubmissionOutcome, payment::Error> {
        self.settle(SubmissionRequest::Onchain(submission)).await
    }

    #[instrument(skip_all)]
    async fn pay_invoice(
        &self,
        submission: LightningSubmission,
    ) -> Result<SubmissionOutcome, payment::Error> {
        self.settle(SubmissionRequest::Lightning(Box::new(submission)))
            .await
    }
}

/// Fixed exchange rates
///
/// Serves scripted prices instead of hitting a ticker.
#[derive(Debug, Clone, Copy)]
pub struct FixedRates {
    /// BTC price in USD
    pub usd: f64,
    /// BTC price in EUR
    pub eur: f64,
}

impl Default for FixedRates {
    fn default() -> Self {
        Self {
            usd: DEFAULT_USD_RATE,
            eur: DEFAULT_EUR_RATE,
        }
    }
}

impl RateProvider for FixedRates {
    fn btc_price(&self, fiat: &CurrencyUnit) -> Option<f64> {
        match fiat {
            CurrencyUnit::Usd => Some(self.usd),
            CurrencyUnit::Eur => Some(self.eur),
            _ => None,
        }
    }
}

/// Create fake invoice
///
/// Signed for bitcoin mainnet with a default expiry. `None` leaves the
/// amount open.
#[instrument]
pub fn create_fake_invoice(amount_msat: Option<u64>, description: String) -> Bolt11Invoice {
    let builder = InvoiceBuilder::new(Currency::Bitcoin)
        .description(description)
        .payment_hash(random_payment_hash())
        .payment_secret(PaymentSecret([42u8; 32]))
        .current_timestamp()
        .min_final_cltv_expiry_delta(144);

    let builder = match amount_msat {
        Some(amount_msat) => builder.amount_milli_satoshis(amount_msat),
        None => builder,
    };

    builder
        .build_signed(|hash| Secp256k1::new().sign_ecdsa_recoverable(hash, &signing_key()))
        .expect("invoice signing")
}

/// Create fake invoice whose expiry already passed
#[instrument]
pub fn create_fake_expired_invoice(amount_msat: Option<u64>, description: String) -> Bolt11Invoice {
    let builder = InvoiceBuilder::new(Currency::Bitcoin)
        .description(description)
        .payment_hash(random_payment_hash())
        .payment_secret(PaymentSecret([42u8; 32]))
        .duration_since_epoch(Duration::from_secs(1))
        .expiry_time(Duration::from_secs(1))
        .min_final_cltv_expiry_delta(144);

    let builder = match amount_msat {
        Some(amount_msat) => builder.amount_milli_satoshis(amount_msat),
        None => builder,
    };

    builder
        .build_signed(|hash| Secp256k1::new().sign_ecdsa_recoverable(hash, &signing_key()))
        .expect("invoice signing")
}

fn signing_key() -> SecretKey {
    SecretKey::from_slice(
        &[
            0xe1, 0x26, 0xf6, 0x8f, 0x7e, 0xaf, 0xcc, 0x8b, 0x74, 0xf5, 0x4d, 0x26, 0x9f, 0xe2,
            0x06, 0xbe, 0x71, 0x50, 0x00, 0xf9, 0x4d, 0xac, 0x06, 0x7d, 0x1c, 0x04, 0xa8, 0xca,
            0x3b, 0x2d, 0xb7, 0x34,
        ][..],
    )
    .expect("static test key")
}

fn random_payment_hash() -> sha256::Hash {
    let random_bytes: [u8; 32] = rand::rng().random();
    sha256::Hash::from_byte_array(random_bytes)
}

fn random_hex() -> String {
    let random_bytes: [u8; 32] = rand::rng().random();
    sha256::Hash::from_byte_array(random_bytes).to_string()
}
