//! Validation and formatting of rider identity fields.
//!
//! Two structured identifiers are handled here:
//!
//! - **Device serials** such as `GCMO-100123`: uppercased, auto-hyphenated
//!   after a known prefix, and capped at six characters after the hyphen.
//!
//! - **Local phone numbers** such as `9171234567`: stripped to ASCII digits
//!   as typed and stored with the `+63` country calling code.
//!
//! The same rules serve per-keystroke formatting and submit-time checks.
//! Validity only drives a visual marker; nothing here refuses a value.
//!
//! # Example
//!
//! ```
//! use ridersafe::fields::{FieldKind, to_storage_phone};
//!
//! let serial = FieldKind::Serial.apply("elit-0042421");
//! assert_eq!(serial.value, "ELIT-004242");
//! assert!(serial.valid);
//!
//! let phone = FieldKind::Phone.apply("917-123-4567");
//! assert_eq!(to_storage_phone(&phone.value), "+639171234567");
//! ```

mod format;
mod patterns;
mod report;

pub use format::{
    from_storage_phone, is_valid_phone, is_valid_serial, normalize_phone_digits,
    normalize_serial, to_storage_phone, FieldKind, FieldState,
};
pub use patterns::{
    FieldPattern, COUNTRY_CALLING_CODE, PHONE_DIGITS, PHONE_PATTERN, SERIAL_DIGITS,
    SERIAL_PATTERN, SERIAL_PREFIXES,
};
pub use report::{FieldReport, InvalidField};
