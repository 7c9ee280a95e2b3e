//! Decoded BOLT11 invoices
//!
//! The engine never walks bolt11 fields itself; everything it needs from an
//! invoice is pulled out once at decode time into [`DecodedInvoice`].

use std::str::FromStr;

use bitcoin::secp256k1::PublicKey;
use bitcoin::Network;
use lightning_invoice::{Bolt11Invoice, Bolt11InvoiceDescriptionRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::amount::{Amount, CurrencyUnit, MSAT_IN_SAT};

/// Invoice Error
#[derive(Debug, Error)]
pub enum Error {
    /// Bolt11 parse or semantic failure
    #[error("Invalid bolt11 invoice: {0}")]
    Bolt11(String),
    /// Invoice belongs to a different network
    #[error("Invoice network {invoice} does not match wallet network {wallet}")]
    NetworkMismatch {
        /// Network encoded in the invoice
        invoice: Network,
        /// Network the wallet is on
        wallet: Network,
    },
}

/// Payment parameters decoded out of a BOLT11 invoice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedInvoice {
    /// The parsed invoice itself, kept for submission
    pub invoice: Bolt11Invoice,
    /// Node the payment is destined for
    pub payee: PublicKey,
    /// Invoice amount in millisatoshis, if specified
    pub amount_msat: Option<Amount>,
    /// Invoice amount in whole satoshis; only set when the millisatoshi
    /// amount carries no sub-satoshi remainder
    pub amount_sat: Option<Amount>,
    /// Description, when the invoice carries one directly rather than a hash
    pub description: Option<String>,
    /// Hex encoded payment hash
    pub payment_hash: String,
    /// Unix timestamp the invoice expires at
    pub expires_at: Option<u64>,
}

impl DecodedInvoice {
    /// Decode a bolt11 string for the given network
    pub fn decode(raw: &str, network: Network) -> Result<Self, Error> {
        let invoice = Bolt11Invoice::from_str(raw).map_err(|e| Error::Bolt11(e.to_string()))?;

        if invoice.network() != network {
            return Err(Error::NetworkMismatch {
                invoice: invoice.network(),
                wallet: network,
            });
        }

        let payee = invoice
            .payee_pub_key()
            .copied()
            .unwrap_or_else(|| invoice.recover_payee_pub_key());

        let amount_msat = invoice.amount_milli_satoshis().map(Amount::from);
        let amount_sat = invoice
            .amount_milli_satoshis()
            .filter(|msat| msat % MSAT_IN_SAT == 0)
            .map(|msat| Amount::from(msat / MSAT_IN_SAT));

        let description = match invoice.description() {
            Bolt11InvoiceDescriptionRef::Direct(desc) => {
                Some(desc.to_string()).filter(|d| !d.is_empty())
            }
            Bolt11InvoiceDescriptionRef::Hash(_) => None,
        };

        Ok(Self {
            payee,
            amount_msat,
            amount_sat,
            description,
            payment_hash: invoice.payment_hash().to_string(),
            expires_at: invoice.expires_at().map(|t| t.as_secs()),
            invoice,
        })
    }

    /// Whether the invoice fixes the amount to pay
    pub fn amount_fixed(&self) -> bool {
        self.amount_sat.is_some() || self.amount_msat.is_some()
    }

    /// Fixed invoice amount in whole satoshis
    ///
    /// Prefers the satoshi field; falls back to the millisatoshi field,
    /// truncating any sub-satoshi remainder. `None` for amount-open invoices.
    pub fn fixed_amount_sat(&self) -> Option<Amount> {
        self.amount_sat.or_else(|| {
            self.amount_msat
                .and_then(|msat| msat.convert_unit(&CurrencyUnit::Msat, &CurrencyUnit::Sat).ok())
        })
    }

    /// Whether the invoice has expired at `now` (unix seconds)
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}
