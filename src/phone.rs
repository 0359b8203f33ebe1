//! Phone number canonicalization.
//!
//! People type numbers in local dialling style (`0170...`) while the transport
//! reports them in international style (`+49170...`). Every number is passed
//! through [`PhoneNormalizer::normalize`] before it is stored or compared.

/// Rewrites a leading trunk prefix `0` into `+<country code>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNormalizer {
    prefix: String,
}

impl PhoneNormalizer {
    /// Create a normalizer for the given country code.
    ///
    /// A leading `+` on the country code is accepted and ignored.
    pub fn new(country_code: &str) -> Self {
        let digits = country_code.trim().trim_start_matches('+');
        Self {
            prefix: format!("+{}", digits),
        }
    }

    /// The prefix that replaces a leading `0`, e.g. `+49`.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Canonicalize a phone identifier.
    ///
    /// Only a single leading `0` is rewritten; anything else is returned as-is,
    /// which keeps the operation idempotent.
    pub fn normalize(&self, raw: &str) -> String {
        match raw.strip_prefix('0') {
            Some(rest) => format!("{}{}", self.prefix, rest),
            None => raw.to_string(),
        }
    }
}
