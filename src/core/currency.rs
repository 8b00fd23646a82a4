use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// ISO 4217-style currency code as published by the rate provider.
///
/// Codes are trimmed and upper-cased on construction so that user input
/// such as `" eur"` and provider keys such as `"EUR"` compare equal.
///
/// # Examples
///
/// ```
/// use fx_converter::core::currency::CurrencyCode;
///
/// let eur = CurrencyCode::new(" eur");
/// assert_eq!(eur, CurrencyCode::new("EUR"));
/// assert_eq!(eur.as_str(), "EUR");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CurrencyCode {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

/// The set of currency codes a session may select from.
///
/// Populated once from the provider's latest-rates payload and never
/// mutated afterwards. Iteration is sorted so the list renders the same
/// way every time, but equality only depends on membership.
///
/// An empty directory means the provider could not be reached; in that
/// state every code is accepted so the session stays usable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyDirectory(BTreeSet<CurrencyCode>);

impl CurrencyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, code: &CurrencyCode) -> bool {
        self.0.contains(code)
    }

    /// Whether `code` may be selected as a source or target.
    pub fn accepts(&self, code: &CurrencyCode) -> bool {
        self.0.is_empty() || self.0.contains(code)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CurrencyCode> {
        self.0.iter()
    }
}

impl FromIterator<CurrencyCode> for CurrencyDirectory {
    fn from_iter<I: IntoIterator<Item = CurrencyCode>>(iter: I) -> Self {
        Self(iter.into_iter().filter(|code| !code.is_empty()).collect())
    }
}

impl fmt::Display for CurrencyDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codes: Vec<&str> = self.0.iter().map(CurrencyCode::as_str).collect();
        write!(f, "{}", codes.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory(codes: &[&str]) -> CurrencyDirectory {
        codes.iter().map(CurrencyCode::new).collect()
    }

    #[test]
    fn test_currency_code_normalised() {
        assert_eq!(CurrencyCode::new(" usd "), CurrencyCode::new("USD"));
        assert_eq!(CurrencyCode::from("gbp").as_str(), "GBP");
    }

    #[test]
    fn test_currency_code_display() {
        assert_eq!(format!("{}", CurrencyCode::new("jpy")), "JPY");
    }

    #[test]
    fn test_directory_is_order_independent() {
        let a = directory(&["USD", "EUR", "JPY"]);
        let b = directory(&["JPY", "USD", "EUR"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn test_directory_drops_duplicates_and_blanks() {
        let dir = directory(&["USD", "usd", " "]);
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn test_code_deserialises_normalised() {
        let code: CurrencyCode = serde_json::from_str(r#"" chf""#).unwrap();
        assert_eq!(code.as_str(), "CHF");
        assert_eq!(serde_json::to_string(&code).unwrap(), r#""CHF""#);
    }

    #[test]
    fn test_empty_directory_accepts_anything() {
        let dir = CurrencyDirectory::new();
        assert!(dir.accepts(&CurrencyCode::new("XYZ")));
    }

    #[test]
    fn test_populated_directory_rejects_unknown() {
        let dir = directory(&["USD", "EUR"]);
        assert!(dir.accepts(&CurrencyCode::new("EUR")));
        assert!(!dir.accepts(&CurrencyCode::new("XYZ")));
    }

    #[test]
    fn test_directory_display_sorted() {
        let dir = directory(&["USD", "CHF", "EUR"]);
        assert_eq!(dir.to_string(), "CHF, EUR, USD");
    }
}
