use phonenumber::{country, metadata::DATABASE, Mode};

use crate::models::phone::{PhoneNumber, PhoneStatus};

/// Turns free-form phone input into a structured [`PhoneNumber`].
///
/// Parsing never fails: every input maps to one of the four statuses.
/// Bare dial codes (`+33`, `0033`, `33`) are recognised before the library
/// gets a chance to misread them as short national numbers.
#[derive(Clone)]
pub struct PhoneNormalizer {
    default_country: String,
}

impl PhoneNormalizer {
    pub fn new(default_country: String) -> Self {
        Self {
            default_country: default_country.to_uppercase(),
        }
    }

    /// Parses raw input using the configured default country as hint.
    pub fn parse(&self, raw: &str) -> PhoneNumber {
        self.parse_with_country(raw, &self.default_country)
    }

    /// Parses raw input with an explicit ISO country hint.
    pub fn parse_with_country(&self, raw: &str, default_country: &str) -> PhoneNumber {
        let raw = raw.trim();
        if raw.is_empty() {
            return PhoneNumber::empty();
        }

        if is_bare_dial_code(raw) {
            let country = dial_digits(raw)
                .and_then(|code| self.region_for_dial_code(code));
            let dial_code = dial_digits(raw)
                .map(|code| format!("+{code}"))
                .unwrap_or_else(|| raw.to_string());
            return PhoneNumber::new(None, Some(dial_code), country, PhoneStatus::Invalid);
        }

        let hint = region_id(default_country);
        if let Ok(parsed) = phonenumber::parse(hint, raw) {
            return self.from_parsed(&parsed);
        }

        // The library rejects national numbers without a usable hint; retry
        // with the default dial code prepended before giving up.
        if let Some(dial) = self.dial_code_for_country(default_country) {
            if let Ok(parsed) = phonenumber::parse(hint, format!("{dial}{raw}")) {
                return self.from_parsed(&parsed);
            }
            return PhoneNumber::new(
                Some(raw.to_string()),
                Some(dial),
                None,
                PhoneStatus::Invalid,
            );
        }

        PhoneNumber::new(Some(raw.to_string()), None, None, PhoneStatus::Invalid)
    }

    /// Renders a parsed number in its national display format.
    ///
    /// Falls back to the stored national digits when the number cannot be
    /// re-parsed, so display never loses user input.
    pub fn format(&self, phone: &PhoneNumber) -> String {
        let national = phone.national_number.clone().unwrap_or_default();
        if national.is_empty() {
            return national;
        }
        let hint = phone
            .country
            .as_deref()
            .and_then(region_id)
            .or_else(|| region_id(&self.default_country));
        let full = phone.full_number();
        let candidate = if full.is_empty() { national.clone() } else { full };
        match phonenumber::parse(hint, candidate) {
            Ok(parsed) => parsed.format().mode(Mode::National).to_string(),
            Err(_) => national,
        }
    }

    /// Re-checks a structured number against the library's validity rules.
    /// Returns only Valid or Invalid; the stored status is left untouched.
    pub fn validate(&self, phone: &PhoneNumber) -> PhoneStatus {
        let Some(national) = phone.national_number.as_deref() else {
            return PhoneStatus::Invalid;
        };
        let hint = phone.country.as_deref().and_then(region_id);
        match phonenumber::parse(hint, national) {
            Ok(parsed) if phonenumber::is_valid(&parsed) => PhoneStatus::Valid,
            _ => PhoneStatus::Invalid,
        }
    }

    /// Dial code for an ISO country, as `+NN`. None when the country is
    /// unknown or the metadata carries the "no dial code" sentinel.
    pub fn dial_code_for_country(&self, country: &str) -> Option<String> {
        let meta = DATABASE.by_id(&country.to_uppercase())?;
        let code = meta.country_code();
        if code == 0 {
            None
        } else {
            Some(format!("+{code}"))
        }
    }

    /// Main ISO region for a numeric dial code. None for unknown codes and
    /// for the non-geographic sentinel regions.
    pub fn region_for_dial_code(&self, code: u16) -> Option<String> {
        let regions = DATABASE.by_code(&code)?;
        let id = regions.first()?.id().to_string();
        if id == "ZZ" || id == "001" {
            None
        } else {
            Some(id)
        }
    }

    fn from_parsed(&self, parsed: &phonenumber::PhoneNumber) -> PhoneNumber {
        let national = parsed.national().value().to_string();
        let code = parsed.country().code();
        // the library reports an unknown region as a sentinel, not an error
        let country = parsed
            .country()
            .id()
            .map(|id| format!("{id:?}"))
            .filter(|id| id != "ZZ" && id != "001");
        let status = if !national.is_empty() && country.is_some() {
            PhoneStatus::Valid
        } else {
            PhoneStatus::Unknown
        };
        PhoneNumber::new(Some(national), Some(format!("+{code}")), country, status)
    }
}

fn region_id(code: &str) -> Option<country::Id> {
    code.to_uppercase().parse().ok()
}

/// `+N`, `00N` or `N` where N is one to three digits: input that is a dial
/// code and nothing else.
fn is_bare_dial_code(raw: &str) -> bool {
    let digits = match raw.strip_prefix('+') {
        Some(rest) => rest,
        None => raw.strip_prefix("00").unwrap_or(raw),
    };
    !digits.is_empty() && digits.len() <= 3 && digits.chars().all(|c| c.is_ascii_digit())
}

fn dial_digits(raw: &str) -> Option<u16> {
    let digits = match raw.strip_prefix('+') {
        Some(rest) => rest,
        None => raw.strip_prefix("00").unwrap_or(raw),
    };
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> PhoneNormalizer {
        PhoneNormalizer::new("FR".to_string())
    }

    #[test]
    fn blank_input_is_empty() {
        assert_eq!(normalizer().parse("").status, PhoneStatus::Empty);
        assert_eq!(normalizer().parse("   ").status, PhoneStatus::Empty);
    }

    #[test]
    fn bare_dial_codes_are_invalid_without_national_number() {
        let n = normalizer();
        for raw in ["+33", "0033", "33"] {
            let phone = n.parse(raw);
            assert_eq!(phone.status, PhoneStatus::Invalid, "input {raw}");
            assert_eq!(phone.national_number, None, "input {raw}");
            assert_eq!(phone.dial_code.as_deref(), Some("+33"), "input {raw}");
            assert_eq!(phone.country.as_deref(), Some("FR"), "input {raw}");
        }
    }

    #[test]
    fn unknown_dial_code_keeps_digits_but_no_country() {
        let phone = normalizer().parse("+999");
        assert_eq!(phone.status, PhoneStatus::Invalid);
        assert_eq!(phone.country, None);
        assert_eq!(phone.dial_code.as_deref(), Some("+999"));
    }

    #[test]
    fn national_number_resolves_with_default_country() {
        let phone = normalizer().parse("0612345678");
        assert_eq!(phone.status, PhoneStatus::Valid);
        assert_eq!(phone.national_number.as_deref(), Some("612345678"));
        assert_eq!(phone.dial_code.as_deref(), Some("+33"));
        assert_eq!(phone.country.as_deref(), Some("FR"));
    }

    #[test]
    fn international_number_overrides_default_country() {
        let phone = normalizer().parse("+41446681800");
        assert_eq!(phone.status, PhoneStatus::Valid);
        assert_eq!(phone.dial_code.as_deref(), Some("+41"));
        assert_eq!(phone.country.as_deref(), Some("CH"));
    }

    #[test]
    fn unparseable_input_falls_back_to_invalid_with_default_dial() {
        let phone = normalizer().parse("not a number");
        assert_eq!(phone.status, PhoneStatus::Invalid);
        assert_eq!(phone.national_number.as_deref(), Some("not a number"));
        assert_eq!(phone.dial_code.as_deref(), Some("+33"));
        assert_eq!(phone.country, None);
    }

    #[test]
    fn parse_format_parse_is_stable() {
        let n = normalizer();
        let first = n.parse("0612345678");
        let displayed = n.format(&first);
        let second = n.parse(&displayed);
        assert_eq!(first.status, second.status);
        assert_eq!(first.national_number, second.national_number);
        assert_eq!(first.dial_code, second.dial_code);
        assert_eq!(first.country, second.country);
    }

    #[test]
    fn validate_reflects_library_validity() {
        let n = normalizer();
        assert_eq!(n.validate(&n.parse("0612345678")), PhoneStatus::Valid);
        let junk = PhoneNumber::new(
            Some("12".to_string()),
            Some("+33".to_string()),
            Some("FR".to_string()),
            PhoneStatus::Unknown,
        );
        assert_eq!(n.validate(&junk), PhoneStatus::Invalid);
    }

    #[test]
    fn dial_code_lookup_round_trips() {
        let n = normalizer();
        assert_eq!(n.dial_code_for_country("FR").as_deref(), Some("+33"));
        assert_eq!(n.dial_code_for_country("fr").as_deref(), Some("+33"));
        assert_eq!(n.dial_code_for_country("XX"), None);
        assert_eq!(n.region_for_dial_code(33).as_deref(), Some("FR"));
        assert_eq!(n.region_for_dial_code(999), None);
    }
}
