//! Wizard form state
//!
//! The engine owns the form for the duration of one session so it can clear
//! values and touched markers when the payment request is superseded.

use std::collections::HashSet;

use sendflow_common::CurrencyUnit;
use serde::{Deserialize, Serialize};

/// A form field with a touched marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    /// Raw payment request entry
    PayReq,
    /// Amount in the crypto display unit
    AmountCrypto,
    /// Amount in the fiat unit
    AmountFiat,
}

/// Values the user typed, plus which fields they touched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormValues {
    /// Raw payment request string
    pub pay_req: String,
    /// Amount as typed, denominated in `unit`
    pub amount_crypto: String,
    /// Amount as typed, denominated in `fiat_unit`
    pub amount_fiat: String,
    /// Crypto display unit for `amount_crypto`
    pub unit: CurrencyUnit,
    /// Fiat unit for `amount_fiat`
    pub fiat_unit: CurrencyUnit,
    /// Fields edited since the last reset
    pub touched: HashSet<FormField>,
}

impl Default for FormValues {
    fn default() -> Self {
        Self {
            pay_req: String::new(),
            amount_crypto: String::new(),
            amount_fiat: String::new(),
            unit: CurrencyUnit::Sat,
            fiat_unit: CurrencyUnit::Usd,
            touched: HashSet::new(),
        }
    }
}

impl FormValues {
    /// Replace the session's form with a fresh one holding `pay_req`
    ///
    /// Unit selections survive the reset, typed amounts and touched markers
    /// do not.
    pub fn reset(&mut self, pay_req: String) {
        self.pay_req = pay_req;
        self.amount_crypto.clear();
        self.amount_fiat.clear();
        self.touched.clear();
    }

    /// Mark a field as edited
    pub fn touch(&mut self, field: FormField) {
        self.touched.insert(field);
    }

    /// Forget all touched markers
    pub fn clear_touched(&mut self) {
        self.touched.clear();
    }
}
