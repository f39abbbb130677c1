// src/models/phone.rs

use serde::{Deserialize, Serialize};

/// Validity classification of a phone number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PhoneStatus {
    Unknown,
    Valid,
    Invalid,
    Empty,
}

/// Structured phone value produced by the normalizer.
///
/// Immutable once built: a re-parse of the raw text produces a fresh value
/// instead of mutating the status in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneNumber {
    /// National significant number, without the dial code.
    pub national_number: Option<String>,
    /// International calling prefix in `+NN` form.
    pub dial_code: Option<String>,
    /// ISO 3166-1 alpha-2 country code resolved from the dial code.
    pub country: Option<String>,
    pub status: PhoneStatus,
}

impl PhoneNumber {
    pub fn empty() -> Self {
        Self {
            national_number: None,
            dial_code: None,
            country: None,
            status: PhoneStatus::Empty,
        }
    }

    pub fn new(
        national_number: Option<String>,
        dial_code: Option<String>,
        country: Option<String>,
        status: PhoneStatus,
    ) -> Self {
        Self {
            national_number,
            dial_code,
            country,
            status,
        }
    }

    /// Dial code and national number concatenated, e.g. `+33612345678`.
    /// Empty string when there is no national number.
    pub fn full_number(&self) -> String {
        let number = self.national_number.as_deref().unwrap_or("");
        if number.trim().is_empty() {
            return String::new();
        }
        match self.dial_code.as_deref() {
            Some(dial) if !dial.trim().is_empty() => {
                if dial.starts_with('+') {
                    format!("{dial}{number}")
                } else {
                    format!("+{dial}{number}")
                }
            }
            _ => number.to_string(),
        }
    }

    fn is_blank(value: &Option<String>) -> bool {
        value.as_deref().is_none_or(|v| v.trim().is_empty())
    }

    /// Invariant: `Empty` iff both the national number and the dial code are blank.
    pub fn holds_empty_invariant(&self) -> bool {
        let blank = Self::is_blank(&self.national_number) && Self::is_blank(&self.dial_code);
        blank == (self.status == PhoneStatus::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_number_prefixes_plus_when_missing() {
        let phone = PhoneNumber::new(
            Some("612345678".into()),
            Some("33".into()),
            Some("FR".into()),
            PhoneStatus::Valid,
        );
        assert_eq!(phone.full_number(), "+33612345678");
    }

    #[test]
    fn full_number_is_blank_without_national_number() {
        let phone = PhoneNumber::new(None, Some("+33".into()), None, PhoneStatus::Invalid);
        assert_eq!(phone.full_number(), "");
    }

    #[test]
    fn empty_invariant() {
        assert!(PhoneNumber::empty().holds_empty_invariant());
        let phone = PhoneNumber::new(Some("06".into()), None, None, PhoneStatus::Unknown);
        assert!(phone.holds_empty_invariant());
    }
}
