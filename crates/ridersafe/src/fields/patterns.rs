//! Canonical field patterns.
//!
//! This module holds the compiled regexes that decide whether a normalized
//! field value is valid. Patterns are compiled once and shared.

use std::sync::LazyLock;

use regex::Regex;

/// Device serial prefixes accepted by the hardware registry.
pub const SERIAL_PREFIXES: [&str; 3] = ["GCMO", "ELIT", "PROT"];

/// Number of digits that follow the serial hyphen.
pub const SERIAL_DIGITS: usize = 6;

/// Number of digits in a local subscriber number.
pub const PHONE_DIGITS: usize = 10;

/// Country calling code prepended to stored phone numbers.
pub const COUNTRY_CALLING_CODE: &str = "+63";

/// A compiled field pattern.
#[derive(Debug)]
pub struct FieldPattern {
    /// Name of the pattern for identification.
    pub name: &'static str,

    /// Description of what this pattern accepts.
    pub description: &'static str,

    regex: Regex,
}

impl FieldPattern {
    /// Create a new field pattern.
    ///
    /// # Panics
    ///
    /// Panics if the regex pattern is invalid.
    #[must_use]
    pub fn new(name: &'static str, description: &'static str, pattern: &str) -> Self {
        Self {
            name,
            description,
            regex: Regex::new(pattern).expect("Invalid regex pattern"),
        }
    }

    /// Check if the whole value matches this pattern.
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    /// The source text of the compiled regex.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// Pattern for a complete device serial, e.g. `GCMO-100123`.
pub static SERIAL_PATTERN: LazyLock<FieldPattern> = LazyLock::new(|| {
    FieldPattern::new(
        "serial",
        "Known device prefix, a hyphen, then exactly six digits",
        r"^(GCMO|ELIT|PROT)-[0-9]{6}$",
    )
});

/// Pattern for a local phone number, e.g. `9171234567`.
pub static PHONE_PATTERN: LazyLock<FieldPattern> = LazyLock::new(|| {
    FieldPattern::new(
        "phone",
        "Exactly ten decimal digits without country code",
        r"^[0-9]{10}$",
    )
});
