//! Payment request classification
//!
//! A raw payment string is either a bolt11 invoice, an on-chain address,
//! recognizably-lightning-but-broken, or nothing yet. Decode is attempted
//! first so an invoice embedding every payment parameter wins over the
//! address fallback.

use std::str::FromStr;

use bitcoin::{Address, Network};
use sendflow_common::DecodedInvoice;
use serde::Serialize;

/// What a raw payment string turned out to be
///
/// Derived, never stored beyond the session; recomputed on every change to
/// the raw string.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub enum Classification {
    /// Nothing recognizable yet
    #[default]
    Unclassified,
    /// A valid on-chain address for the wallet network
    Onchain(Address),
    /// A bolt11 invoice for the wallet network
    Lightning(Box<DecodedInvoice>),
    /// Carries a bolt11 prefix but does not decode for this network
    Invalid,
}

impl Classification {
    /// Whether this is a Lightning payment
    pub fn is_lightning(&self) -> bool {
        matches!(self, Self::Lightning(_))
    }

    /// Whether this is an on-chain payment
    pub fn is_onchain(&self) -> bool {
        matches!(self, Self::Onchain(_))
    }

    /// The decoded invoice, when classification is Lightning
    pub fn invoice(&self) -> Option<&DecodedInvoice> {
        match self {
            Self::Lightning(invoice) => Some(invoice),
            _ => None,
        }
    }
}

/// Classify a raw payment string for `network`
///
/// First match wins: bolt11 decode, then address validation. A string with a
/// bolt11 prefix that fails to decode, or that decodes to an invoice for a
/// different network, is `Invalid` rather than `Unclassified`, so hosts can
/// tell "not lightning" apart from "broken lightning".
pub fn classify(raw: &str, network: Network) -> Classification {
    let raw = raw.trim();
    if raw.is_empty() {
        return Classification::Unclassified;
    }

    match DecodedInvoice::decode(raw, network) {
        Ok(decoded) => return Classification::Lightning(Box::new(decoded)),
        Err(err) => {
            if looks_like_lightning(raw) {
                tracing::debug!("Rejected bolt11-prefixed payment request: {}", err);
                return Classification::Invalid;
            }
        }
    }

    match Address::from_str(raw).map(|address| address.require_network(network)) {
        Ok(Ok(address)) => Classification::Onchain(address),
        _ => Classification::Unclassified,
    }
}

fn looks_like_lightning(raw: &str) -> bool {
    raw.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("ln"))
}
