//! Funds sufficiency
//!
//! Lightning payments spend from channel balance, on-chain payments from the
//! wallet balance. The two pools are disjoint and must not be summed.

use sendflow_common::{Amount, Balances};

use crate::classify::Classification;

/// Check a resolved amount against the pool that funds this payment kind
///
/// Without a resolved amount there is nothing to gate on yet and the check
/// passes; it becomes load-bearing at the summary step where an amount is
/// required before dispatch.
pub fn has_sufficient_funds(
    classification: &Classification,
    amount: Option<Amount>,
    balances: &Balances,
) -> bool {
    let Some(amount) = amount else {
        return true;
    };

    match classification {
        Classification::Lightning(_) => amount <= balances.channel_total(),
        Classification::Onchain(_) => amount <= balances.wallet_total(),
        Classification::Unclassified | Classification::Invalid => true,
    }
}
