//! Effective amount resolution
//!
//! A submission spends satoshis. What the user supplied may be an
//! amount-fixed invoice, a typed amount in sats, msats or BTC, or a fiat
//! amount that needs a rate lookup. Resolution is total: anything that
//! cannot be turned into a positive satoshi amount yields `None`, never
//! zero.

use bitcoin::Denomination;
use sendflow_common::rates::{fiat_to_sat, RateProvider};
use sendflow_common::{Amount, CurrencyUnit};

use crate::classify::Classification;
use crate::form::FormValues;

/// Resolve the amount a submission would spend, in satoshis
///
/// An amount-fixed invoice is authoritative and the form is ignored.
/// Otherwise the crypto field is parsed in the selected display unit,
/// falling back to the fiat field through the rate provider when the
/// crypto field is empty.
pub fn effective_amount(
    classification: &Classification,
    form: &FormValues,
    rates: &dyn RateProvider,
) -> Option<Amount> {
    if let Classification::Lightning(invoice) = classification {
        if invoice.amount_fixed() {
            return invoice.fixed_amount_sat();
        }
    }

    form_amount(form, rates)
}

/// Resolve the form's amount fields alone, in satoshis
pub fn form_amount(form: &FormValues, rates: &dyn RateProvider) -> Option<Amount> {
    let crypto = form.amount_crypto.trim();
    if !crypto.is_empty() {
        return parse_crypto_amount(crypto, &form.unit);
    }

    let fiat = form.amount_fiat.trim();
    if !fiat.is_empty() {
        let value = fiat.parse::<f64>().ok()?;
        let btc_price = rates.btc_price(&form.fiat_unit)?;
        return fiat_to_sat(value, btc_price);
    }

    None
}

fn parse_crypto_amount(value: &str, unit: &CurrencyUnit) -> Option<Amount> {
    match unit {
        CurrencyUnit::Sat => value.parse::<u64>().ok().map(Amount::from),
        // Sub-satoshi precision is dropped, 150_000 msat resolves to 150 sat
        CurrencyUnit::Msat => {
            let msat = value.parse::<u64>().ok()?;
            Amount::from(msat)
                .convert_unit(&CurrencyUnit::Msat, &CurrencyUnit::Sat)
                .ok()
        }
        // exact decimal parse, no float round trip
        CurrencyUnit::Btc => bitcoin::Amount::from_str_in(value, Denomination::Bitcoin)
            .ok()
            .map(|btc| Amount::from(btc.to_sat())),
        CurrencyUnit::Usd | CurrencyUnit::Eur => None,
    }
}

#[cfg(test)]
mod tests {
    use sendflow_common::rates::NoRates;

    use super::*;

    struct FixedRate(f64);

    impl RateProvider for FixedRate {
        fn btc_price(&self, _fiat: &CurrencyUnit) -> Option<f64> {
            Some(self.0)
        }
    }

    fn form_with(unit: CurrencyUnit, crypto: &str, fiat: &str) -> FormValues {
        FormValues {
            amount_crypto: crypto.to_string(),
            amount_fiat: fiat.to_string(),
            unit,
            ..Default::default()
        }
    }

    #[test]
    fn test_sat_entry() {
        let form = form_with(CurrencyUnit::Sat, " 2500 ", "");
        assert_eq!(form_amount(&form, &NoRates), Some(Amount::from(2500)));
    }

    #[test]
    fn test_msat_entry_truncates() {
        let form = form_with(CurrencyUnit::Msat, "150000", "");
        assert_eq!(form_amount(&form, &NoRates), Some(Amount::from(150)));

        let form = form_with(CurrencyUnit::Msat, "150999", "");
        assert_eq!(form_amount(&form, &NoRates), Some(Amount::from(150)));
    }

    #[test]
    fn test_btc_entry() {
        let form = form_with(CurrencyUnit::Btc, "0.00000001", "");
        assert_eq!(form_amount(&form, &NoRates), Some(Amount::from(1)));

        let form = form_with(CurrencyUnit::Btc, "1.5", "");
        assert_eq!(form_amount(&form, &NoRates), Some(Amount::from(150_000_000)));
    }

    #[test]
    fn test_btc_entry_is_exact_at_high_precision() {
        // 2^53 + 1 sat, not representable in an f64
        let form = form_with(CurrencyUnit::Btc, "90071992.54740993", "");
        assert_eq!(
            form_amount(&form, &NoRates),
            Some(Amount::from(9_007_199_254_740_993))
        );

        // finer than one satoshi does not parse
        let form = form_with(CurrencyUnit::Btc, "0.000000001", "");
        assert_eq!(form_amount(&form, &NoRates), None);
    }

    #[test]
    fn test_fiat_fallback() {
        let form = form_with(CurrencyUnit::Sat, "", "55.0");
        assert_eq!(
            form_amount(&form, &FixedRate(110_000.0)),
            Some(Amount::from(50_000))
        );
    }

    #[test]
    fn test_crypto_field_wins_over_fiat() {
        let form = form_with(CurrencyUnit::Sat, "21", "55.0");
        assert_eq!(
            form_amount(&form, &FixedRate(110_000.0)),
            Some(Amount::from(21))
        );
    }

    #[test]
    fn test_unparsable_yields_none_not_zero() {
        for bad in ["abc", "-5", "1.2.3", "0x10"] {
            let form = form_with(CurrencyUnit::Sat, bad, "");
            assert_eq!(form_amount(&form, &NoRates), None);
        }

        let form = form_with(CurrencyUnit::Btc, "NaN", "");
        assert_eq!(form_amount(&form, &NoRates), None);
    }

    #[test]
    fn test_fiat_without_rate_is_unresolved() {
        let form = form_with(CurrencyUnit::Sat, "", "55.0");
        assert_eq!(form_amount(&form, &NoRates), None);
    }

    #[test]
    fn test_empty_form_is_unresolved() {
        let form = form_with(CurrencyUnit::Sat, "", "  ");
        assert_eq!(form_amount(&form, &NoRates), None);
    }
}
