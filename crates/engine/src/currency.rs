use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Code of the ledger currency every stored amount is normalized to.
pub const BASE_CURRENCY_CODE: &str = "LKR";

/// ISO-4217-like currency code (three ASCII letters, upper case).
///
/// The engine keeps one base ledger currency ([`Currency::base`]); amounts
/// entered in any other currency are converted before they are stored, and
/// the original code is kept on the transaction for reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// The base ledger currency (`LKR`).
    #[must_use]
    pub fn base() -> Self {
        Self(BASE_CURRENCY_CODE.to_string())
    }

    /// Canonical currency code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_base(&self) -> bool {
        self.0 == BASE_CURRENCY_CODE
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::base()
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Currency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let code = value.trim().to_ascii_uppercase();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(EngineError::InvalidCurrency(format!(
                "unsupported currency: {}",
                value.trim()
            )));
        }
        Ok(Currency(code))
    }
}

impl TryFrom<String> for Currency {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Currency::try_from(value.as_str())
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.0
    }
}
