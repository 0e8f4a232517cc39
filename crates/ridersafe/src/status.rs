//! Public emergency status page.
//!
//! Each rider's helmet carries a QR code linking to the status page with the
//! device serial in the `sn` query parameter. A first responder scanning it
//! sees the rider's [`EmergencyCard`].

use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::fields::normalize_serial;
use crate::profile::EmergencyContact;
use crate::store::Store;

/// Query parameter carrying the device serial.
pub const SERIAL_PARAM: &str = "sn";

/// Status page link for a device serial.
///
/// # Errors
///
/// Returns an error if `base` is not a valid URL.
pub fn status_url(base: &str, serial: &str) -> Result<Url> {
    let mut url = Url::parse(base)?;
    url.query_pairs_mut().append_pair(SERIAL_PARAM, serial);
    Ok(url)
}

/// Download name for a rider's QR image.
#[must_use]
pub fn qr_filename(serial: &str) -> String {
    format!("Giacomo-QR-{serial}.png")
}

/// What a first responder sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmergencyCard {
    /// Device serial that was scanned.
    pub serial: String,
    /// Rider's name.
    pub rider_name: String,
    /// Blood type.
    pub blood_type: String,
    /// Known allergies.
    pub allergies: String,
    /// Current medications.
    pub medications: String,
    /// First emergency contact with a phone number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<EmergencyContact>,
}

impl std::fmt::Display for EmergencyCard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Rider:       {}", self.rider_name)?;
        writeln!(f, "Device:      {}", self.serial)?;
        writeln!(f, "Blood type:  {}", self.blood_type)?;
        writeln!(f, "Allergies:   {}", self.allergies)?;
        writeln!(f, "Medications: {}", self.medications)?;
        match &self.contact {
            Some(c) => write!(f, "Contact:     {}: {}", c.name, c.phone),
            None => write!(f, "Contact:     none on file"),
        }
    }
}

/// Resolve a scanned serial to the rider's emergency card.
///
/// # Errors
///
/// Returns [`Error::RiderNotFound`] if no rider has the serial,
/// [`Error::AmbiguousSerial`] if several riders registered it,
/// [`Error::MedicalProfileMissing`] if the rider never onboarded, or a
/// store error.
pub fn emergency_card(store: &Store, serial: &str) -> Result<EmergencyCard> {
    let serial = normalize_serial(serial.trim());
    if serial.is_empty() {
        return Err(Error::rider_not_found(serial));
    }

    let profile = store
        .find_by_serial(&serial)?
        .ok_or_else(|| Error::rider_not_found(&serial))?;
    debug!(serial = %serial, user_id = %profile.id, "Serial resolved");

    let medical = store
        .get_medical(&profile.id)?
        .ok_or_else(|| Error::MedicalProfileMissing {
            user_id: profile.id.clone(),
        })?;

    Ok(EmergencyCard {
        contact: medical.primary_contact().cloned(),
        serial,
        rider_name: profile.full_name,
        blood_type: medical.blood_type,
        allergies: medical.allergies,
        medications: medical.current_medications,
    })
}
