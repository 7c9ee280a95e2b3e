//! Fiat exchange rates
//!
//! The engine never fetches prices; a host supplies a [`RateProvider`] backed
//! by whatever ticker it maintains.

use crate::amount::{Amount, CurrencyUnit, SAT_IN_BTC};

/// BTC price source for fiat conversion
pub trait RateProvider: Send + Sync {
    /// Price of one bitcoin in `fiat`, when the provider knows it
    fn btc_price(&self, fiat: &CurrencyUnit) -> Option<f64>;
}

/// Rate provider that knows no prices
///
/// Fiat amounts stay unresolved under it, crypto amounts are unaffected.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRates;

impl RateProvider for NoRates {
    fn btc_price(&self, _fiat: &CurrencyUnit) -> Option<f64> {
        None
    }
}

/// Convert a fiat amount into satoshis at `btc_price`
pub fn fiat_to_sat(fiat_amount: f64, btc_price: f64) -> Option<Amount> {
    if !fiat_amount.is_finite() || fiat_amount < 0.0 || !btc_price.is_finite() || btc_price <= 0.0
    {
        return None;
    }

    let sats = (fiat_amount / btc_price * SAT_IN_BTC as f64).round();
    if sats <= u64::MAX as f64 {
        Some(Amount::from(sats as u64))
    } else {
        None
    }
}

/// Convert satoshis into a fiat amount at `btc_price`
pub fn sat_to_fiat(amount: Amount, btc_price: f64) -> Option<f64> {
    if !btc_price.is_finite() || btc_price <= 0.0 {
        return None;
    }

    Some(amount.to_u64() as f64 / SAT_IN_BTC as f64 * btc_price)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fiat_to_sat() {
        // one whole bitcoin worth of fiat
        assert_eq!(
            fiat_to_sat(110_000.0, 110_000.0),
            Some(Amount::from(SAT_IN_BTC))
        );
        assert_eq!(fiat_to_sat(50.0, 100_000.0), Some(50_000.into()));
        assert_eq!(fiat_to_sat(0.0, 100_000.0), Some(Amount::ZERO));
    }

    #[test]
    fn test_fiat_to_sat_rejects_bad_inputs() {
        assert_eq!(fiat_to_sat(-1.0, 100_000.0), None);
        assert_eq!(fiat_to_sat(f64::NAN, 100_000.0), None);
        assert_eq!(fiat_to_sat(50.0, 0.0), None);
        assert_eq!(fiat_to_sat(50.0, -100.0), None);
        assert_eq!(fiat_to_sat(50.0, f64::NAN), None);
    }

    #[test]
    fn test_sat_to_fiat() {
        let fiat = sat_to_fiat(Amount::from(SAT_IN_BTC), 95_000.0).unwrap();
        assert!((fiat - 95_000.0).abs() < f64::EPSILON);

        let fiat = sat_to_fiat(50_000.into(), 100_000.0).unwrap();
        assert!((fiat - 50.0).abs() < f64::EPSILON);

        assert_eq!(sat_to_fiat(1.into(), 0.0), None);
    }
}
