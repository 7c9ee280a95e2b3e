//! Balance pools and fee estimates pushed in by the host

use serde::{Deserialize, Serialize};

use crate::amount::Amount;

/// The two balance pools funding the two payment types
///
/// Refreshed by an external poller; the engine only ever reads them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    /// Confirmed on-chain balance, in satoshis
    pub wallet_confirmed: Amount,
    /// Unconfirmed on-chain balance, in satoshis
    pub wallet_unconfirmed: Amount,
    /// Local balance across open channels, in satoshis
    pub channel_local: Amount,
    /// Balance in channels still pending open, in satoshis
    pub channel_pending_open: Amount,
}

impl Balances {
    /// Funds available to an on-chain send
    pub fn wallet_total(&self) -> Amount {
        self.wallet_confirmed + self.wallet_unconfirmed
    }

    /// Funds available to a Lightning payment
    pub fn channel_total(&self) -> Amount {
        self.channel_local + self.channel_pending_open
    }
}

/// On-chain fee estimates in sat/vB, by confirmation target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnchainFeeEstimates {
    /// Next-block target
    pub fastest: u64,
    /// Half hour target
    pub half_hour: u64,
    /// One hour target
    pub hour: u64,
}
