//! Normalization and validity checks for rider identity fields.
//!
//! Every function here is total: any input string yields a best-effort
//! normalized value, and validity is a plain boolean.

use serde::{Deserialize, Serialize};

use super::patterns::{
    COUNTRY_CALLING_CODE, PHONE_PATTERN, SERIAL_DIGITS, SERIAL_PATTERN, SERIAL_PREFIXES,
};

/// Normalize a device serial as the user types it.
///
/// Uppercases the input, appends a hyphen to a bare known prefix, and keeps
/// at most six characters after the first hyphen.
///
/// ```
/// use ridersafe::fields::normalize_serial;
///
/// assert_eq!(normalize_serial("gcmo"), "GCMO-");
/// assert_eq!(normalize_serial("GCMO-1234567"), "GCMO-123456");
/// ```
#[must_use]
pub fn normalize_serial(raw: &str) -> String {
    let mut value = raw.to_uppercase();

    if SERIAL_PREFIXES.contains(&value.as_str()) {
        value.push('-');
    }

    match value.split_once('-') {
        Some((prefix, suffix)) => {
            let suffix: String = suffix.chars().take(SERIAL_DIGITS).collect();
            format!("{prefix}-{suffix}")
        }
        None => value,
    }
}

/// Check a serial against `^(GCMO|ELIT|PROT)-[0-9]{6}$`.
#[must_use]
pub fn is_valid_serial(value: &str) -> bool {
    SERIAL_PATTERN.matches(value)
}

/// Strip every character that is not an ASCII digit.
///
/// The result is never truncated; length is checked by [`is_valid_phone`].
#[must_use]
pub fn normalize_phone_digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Check for exactly ten decimal digits.
#[must_use]
pub fn is_valid_phone(value: &str) -> bool {
    PHONE_PATTERN.matches(value)
}

/// Convert local digits to the stored form.
///
/// Empty input stays empty. Anything else gets the country calling code,
/// whether or not it is a valid local number.
#[must_use]
pub fn to_storage_phone(local_digits: &str) -> String {
    if local_digits.is_empty() {
        String::new()
    } else {
        format!("{COUNTRY_CALLING_CODE}{local_digits}")
    }
}

/// Convert a stored phone back to local digits for editing.
///
/// Removes the first occurrence of the country calling code.
#[must_use]
pub fn from_storage_phone(stored: &str) -> String {
    stored.replacen(COUNTRY_CALLING_CODE, "", 1)
}

/// The kind of field being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Device serial number.
    Serial,
    /// Local phone number.
    Phone,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serial => write!(f, "serial"),
            Self::Phone => write!(f, "phone"),
        }
    }
}

impl FieldKind {
    /// Normalize a raw value for this kind.
    #[must_use]
    pub fn normalize(self, raw: &str) -> String {
        match self {
            Self::Serial => normalize_serial(raw),
            Self::Phone => normalize_phone_digits(raw),
        }
    }

    /// Check an already normalized value for this kind.
    #[must_use]
    pub fn is_valid(self, value: &str) -> bool {
        match self {
            Self::Serial => is_valid_serial(value),
            Self::Phone => is_valid_phone(value),
        }
    }

    /// Run one input event: normalize, then check.
    ///
    /// The caller writes `value` back into the field and shows the check
    /// mark when `valid` is set.
    #[must_use]
    pub fn apply(self, raw: &str) -> FieldState {
        let value = self.normalize(raw);
        let valid = self.is_valid(&value);
        FieldState { value, valid }
    }
}

/// Normalized value of a field plus its validity flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldState {
    /// Value to echo back into the input.
    pub value: String,
    /// Whether the value matches the canonical pattern.
    pub valid: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_serial_auto_hyphen() {
        assert_eq!(normalize_serial("gcmo"), "GCMO-");
        assert_eq!(normalize_serial("Elit"), "ELIT-");
        assert_eq!(normalize_serial("PROT"), "PROT-");
    }

    #[test]
    fn test_normalize_serial_no_hyphen_for_partial_prefix() {
        assert_eq!(normalize_serial("gcm"), "GCM");
        assert_eq!(normalize_serial("GCMO1"), "GCMO1");
        assert_eq!(normalize_serial("XYZA"), "XYZA");
    }

    #[test]
    fn test_normalize_serial_truncates_suffix() {
        assert_eq!(normalize_serial("GCMO-1234567"), "GCMO-123456");
        assert_eq!(normalize_serial("gcmo-12345678901"), "GCMO-123456");
        assert_eq!(normalize_serial("GCMO-123"), "GCMO-123");
    }

    #[test]
    fn test_normalize_serial_splits_on_first_hyphen() {
        assert_eq!(normalize_serial("ab-cd-ef"), "AB-CD-EF");
        assert_eq!(normalize_serial("ab-cd-efgh"), "AB-CD-EFG");
        assert_eq!(normalize_serial("-1234567"), "-123456");
    }

    #[test]
    fn test_normalize_serial_empty() {
        assert_eq!(normalize_serial(""), "");
    }

    #[test]
    fn test_normalize_serial_counts_characters_not_bytes() {
        assert_eq!(normalize_serial("gcmo-ñññññññ"), "GCMO-ÑÑÑÑÑÑ");
    }

    #[test]
    fn test_is_valid_serial() {
        assert!(is_valid_serial("GCMO-100123"));
        assert!(is_valid_serial("ELIT-000000"));
        assert!(is_valid_serial("PROT-999999"));
        assert!(!is_valid_serial("GCMO100123"));
        assert!(!is_valid_serial("XYZA-123456"));
        assert!(!is_valid_serial("GCMO-12345"));
        assert!(!is_valid_serial("gcmo-100123"));
        assert!(!is_valid_serial(""));
    }

    #[test]
    fn test_normalize_phone_digits() {
        assert_eq!(normalize_phone_digits("09-171 234-567"), "09171234567");
        assert_eq!(normalize_phone_digits("+63 (917) 123"), "63917123");
        assert_eq!(normalize_phone_digits("abc"), "");
        assert_eq!(normalize_phone_digits("١٢٣"), "");
    }

    #[test]
    fn test_normalize_phone_digits_never_truncates() {
        let long = "1".repeat(25);
        assert_eq!(normalize_phone_digits(&long), long);
    }

    #[test]
    fn test_is_valid_phone() {
        assert!(is_valid_phone("9171234567"));
        assert!(!is_valid_phone("09171234567"));
        assert!(!is_valid_phone("917123456"));
        assert!(!is_valid_phone("917-123-4567"));
        assert!(!is_valid_phone(""));
    }

    #[test]
    fn test_to_storage_phone() {
        assert_eq!(to_storage_phone(""), "");
        assert_eq!(to_storage_phone("9171234567"), "+639171234567");
        assert_eq!(to_storage_phone("123"), "+63123");
    }

    #[test]
    fn test_from_storage_phone() {
        assert_eq!(from_storage_phone("+639171234567"), "9171234567");
        assert_eq!(from_storage_phone(""), "");
        assert_eq!(from_storage_phone("9171234567"), "9171234567");
        assert_eq!(from_storage_phone("+63+63123"), "+63123");
    }

    #[test]
    fn test_field_kind_apply_serial() {
        let state = FieldKind::Serial.apply("gcmo-1001234");
        assert_eq!(state.value, "GCMO-100123");
        assert!(state.valid);

        let state = FieldKind::Serial.apply("gcmo");
        assert_eq!(state.value, "GCMO-");
        assert!(!state.valid);
    }

    #[test]
    fn test_field_kind_apply_phone() {
        let state = FieldKind::Phone.apply("917 123 4567");
        assert_eq!(state.value, "9171234567");
        assert!(state.valid);

        let state = FieldKind::Phone.apply("0917 123 4567");
        assert_eq!(state.value, "09171234567");
        assert!(!state.valid);
    }

    #[test]
    fn test_field_kind_display() {
        assert_eq!(FieldKind::Serial.to_string(), "serial");
        assert_eq!(FieldKind::Phone.to_string(), "phone");
    }

    proptest! {
        #[test]
        fn prop_normalize_serial_idempotent(raw in "[a-zA-Z0-9ñé -]{0,20}") {
            let once = normalize_serial(&raw);
            prop_assert_eq!(normalize_serial(&once), once);
        }

        #[test]
        fn prop_normalize_serial_suffix_bounded(raw in "[a-zA-Z0-9-]{0,24}") {
            let normalized = normalize_serial(&raw);
            if let Some((_, suffix)) = normalized.split_once('-') {
                prop_assert!(suffix.chars().count() <= SERIAL_DIGITS);
            }
        }

        #[test]
        fn prop_normalize_phone_idempotent(raw in "\\PC{0,20}") {
            let once = normalize_phone_digits(&raw);
            prop_assert_eq!(normalize_phone_digits(&once), once.clone());
            prop_assert!(once.chars().all(|c| c.is_ascii_digit()));
        }

        #[test]
        fn prop_storage_phone_prefixes_digits(digits in "[0-9]{0,15}") {
            let stored = to_storage_phone(&digits);
            if digits.is_empty() {
                prop_assert_eq!(stored, "");
            } else {
                prop_assert_eq!(stored, format!("+63{digits}"));
            }
        }
    }
}
