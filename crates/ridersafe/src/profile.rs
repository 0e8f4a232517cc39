//! Rider records and the forms that produce them.
//!
//! Forms hold raw text as typed. Their `submission` methods run every
//! identity field through [`crate::fields`] and build the payload written to
//! the store. Invalid values are reported, never refused.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fields::{
    from_storage_phone, normalize_phone_digits, normalize_serial, to_storage_phone, FieldKind,
    FieldReport, FieldState,
};

/// Placeholder stored for empty free-text medical fields.
pub const NONE_TEXT: &str = "None";

/// Rider name used when an incident's profile cannot be read.
pub const UNKNOWN_RIDER: &str = "Unknown Rider";

/// Number of emergency contacts kept per rider.
pub const CONTACT_SLOTS: usize = 3;

/// Access role of a profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A rider.
    #[default]
    User,
    /// An operator of the admin board.
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A rider's account profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Opaque user identifier.
    pub id: String,
    /// Display name.
    pub full_name: String,
    /// Login email.
    pub email: String,
    /// Access role.
    pub role: Role,
    /// Registered device serial, if onboarding has run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    /// Whether a crash alert is active.
    pub is_crashed: bool,
    /// Last known latitude.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    /// Last known longitude.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

impl Profile {
    /// Last known position, when both coordinates are set.
    #[must_use]
    pub fn location(&self) -> Option<(f64, f64)> {
        self.lat.zip(self.lon)
    }
}

/// Sign-up details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Display name.
    pub full_name: String,
    /// Login email.
    pub email: String,
}

impl Registration {
    /// Build the initial profile with a fresh identifier.
    #[must_use]
    pub fn into_profile(self) -> Profile {
        Profile {
            id: Uuid::new_v4().to_string(),
            full_name: self.full_name.trim().to_string(),
            email: self.email.trim().to_string(),
            role: Role::User,
            serial_number: None,
            is_crashed: false,
            lat: None,
            lon: None,
        }
    }
}

/// An emergency contact as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    /// Contact name.
    pub name: String,
    /// Phone in storage form (`+63...`), or empty.
    pub phone: String,
}

/// A rider's medical record, one per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalProfile {
    /// Owning user identifier.
    pub user_id: String,
    /// Blood type as entered.
    pub blood_type: String,
    /// Registered organ donor.
    pub organ_donor: bool,
    /// Known allergies.
    pub allergies: String,
    /// Chronic conditions.
    pub chronic_conditions: String,
    /// Current medications.
    pub current_medications: String,
    /// Emergency contacts, in priority order.
    pub contacts: [EmergencyContact; CONTACT_SLOTS],
    /// Last write time.
    pub updated_at: DateTime<Utc>,
}

impl MedicalProfile {
    /// First contact with a phone number, if any.
    #[must_use]
    pub fn primary_contact(&self) -> Option<&EmergencyContact> {
        self.contacts.iter().find(|c| !c.phone.is_empty())
    }
}

/// Raw contact inputs as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactInput {
    /// Contact name.
    pub name: String,
    /// Phone as typed, any characters.
    pub phone: String,
}

impl ContactInput {
    fn to_stored(&self) -> EmergencyContact {
        EmergencyContact {
            name: self.name.trim().to_string(),
            phone: to_storage_phone(&normalize_phone_digits(self.phone.trim())),
        }
    }
}

/// Profile columns written by a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    /// New display name, when the form edits it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Uppercased, normalized serial.
    pub serial_number: String,
}

/// Everything a form submission writes, plus its validity report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    /// Update for the `profiles` record.
    pub profile: ProfileUpdate,
    /// Upsert for the `medical_profiles` record.
    pub medical: MedicalProfile,
    /// Fields that failed their check. Informational only.
    pub report: FieldReport,
}

fn or_none_text(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        NONE_TEXT.to_string()
    } else {
        value.to_string()
    }
}

fn check_contacts(report: &mut FieldReport, contacts: &[EmergencyContact]) {
    for (i, contact) in contacts.iter().enumerate() {
        let local = from_storage_phone(&contact.phone);
        report.check(
            &format!("contact_{}_phone", i + 1),
            FieldKind::Phone,
            &local,
            false,
        );
    }
}

/// First-run medical onboarding form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnboardingForm {
    /// Device serial as typed.
    pub serial: String,
    /// Blood type.
    pub blood_type: String,
    /// Organ donor checkbox.
    pub organ_donor: bool,
    /// Allergies, empty for none.
    pub allergies: String,
    /// Chronic conditions, empty for none.
    pub chronic_conditions: String,
    /// Up to three emergency contacts.
    pub contacts: [ContactInput; CONTACT_SLOTS],
}

impl OnboardingForm {
    /// Build the payload for this user.
    #[must_use]
    pub fn submission(&self, user_id: &str) -> Submission {
        let serial_number = normalize_serial(self.serial.trim());
        let contacts = [
            self.contacts[0].to_stored(),
            self.contacts[1].to_stored(),
            self.contacts[2].to_stored(),
        ];

        let mut report = FieldReport::new();
        report.check("serial_number", FieldKind::Serial, &serial_number, true);
        check_contacts(&mut report, &contacts);

        Submission {
            profile: ProfileUpdate {
                full_name: None,
                serial_number,
            },
            medical: MedicalProfile {
                user_id: user_id.to_string(),
                blood_type: self.blood_type.trim().to_string(),
                organ_donor: self.organ_donor,
                allergies: or_none_text(&self.allergies),
                chronic_conditions: or_none_text(&self.chronic_conditions),
                current_medications: NONE_TEXT.to_string(),
                contacts,
                updated_at: Utc::now(),
            },
            report,
        }
    }
}

/// Account settings form. Edits the name, serial, and the first two contacts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsForm {
    /// Display name.
    pub full_name: String,
    /// Device serial as typed.
    pub serial: String,
    /// Blood type.
    pub blood_type: String,
    /// Allergies, empty for none.
    pub allergies: String,
    /// First two emergency contacts, phones as local digits.
    pub contacts: [ContactInput; 2],
}

impl SettingsForm {
    /// Pre-fill from stored records. Stored phones lose their country code.
    #[must_use]
    pub fn from_records(profile: &Profile, medical: Option<&MedicalProfile>) -> Self {
        let mut form = Self {
            full_name: profile.full_name.clone(),
            serial: profile.serial_number.clone().unwrap_or_default(),
            ..Self::default()
        };

        if let Some(medical) = medical {
            form.blood_type.clone_from(&medical.blood_type);
            form.allergies.clone_from(&medical.allergies);
            for (input, stored) in form.contacts.iter_mut().zip(&medical.contacts) {
                input.name.clone_from(&stored.name);
                input.phone = from_storage_phone(&stored.phone);
            }
        }

        form
    }

    /// Check marks for the serial field.
    #[must_use]
    pub fn serial_state(&self) -> FieldState {
        FieldKind::Serial.apply(&self.serial)
    }

    /// Check marks for the two contact phones.
    #[must_use]
    pub fn phone_states(&self) -> [FieldState; 2] {
        [
            FieldKind::Phone.apply(&self.contacts[0].phone),
            FieldKind::Phone.apply(&self.contacts[1].phone),
        ]
    }

    /// Build the payload, keeping stored values the form does not edit.
    #[must_use]
    pub fn submission(&self, user_id: &str, existing: Option<&MedicalProfile>) -> Submission {
        let serial_number = normalize_serial(self.serial.trim());
        let third = existing
            .map(|m| m.contacts[2].clone())
            .unwrap_or_default();
        let contacts = [
            self.contacts[0].to_stored(),
            self.contacts[1].to_stored(),
            third,
        ];

        let mut report = FieldReport::new();
        report.check("serial_number", FieldKind::Serial, &serial_number, true);
        check_contacts(&mut report, &contacts[..2]);

        Submission {
            profile: ProfileUpdate {
                full_name: Some(self.full_name.trim().to_string()),
                serial_number,
            },
            medical: MedicalProfile {
                user_id: user_id.to_string(),
                blood_type: self.blood_type.trim().to_string(),
                organ_donor: existing.is_some_and(|m| m.organ_donor),
                allergies: or_none_text(&self.allergies),
                chronic_conditions: existing
                    .map_or_else(|| NONE_TEXT.to_string(), |m| m.chronic_conditions.clone()),
                current_medications: existing
                    .map_or_else(|| NONE_TEXT.to_string(), |m| m.current_medications.clone()),
                contacts,
                updated_at: Utc::now(),
            },
            report,
        }
    }
}

/// A black-box record written when a crash alert is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentLog {
    /// Row identifier, assigned by the store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Rider's user identifier.
    pub user_id: String,
    /// Rider's name at the time of the incident.
    pub rider_name: String,
    /// Last displayed speed, e.g. `62 KM/H`.
    pub final_velocity: String,
    /// Last displayed elevation, e.g. `152 M`.
    pub final_elevation: String,
    /// When the alert was sent.
    pub timestamp: DateTime<Utc>,
}

impl IncidentLog {
    /// Create a new, unsaved incident.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        rider_name: Option<String>,
        final_velocity: impl Into<String>,
        final_elevation: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            user_id: user_id.into(),
            rider_name: rider_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_RIDER.to_string()),
            final_velocity: final_velocity.into(),
            final_elevation: final_elevation.into(),
            timestamp: Utc::now(),
        }
    }

    /// First eight characters of the user id, for compact listings.
    #[must_use]
    pub fn short_user_id(&self) -> &str {
        match self.user_id.char_indices().nth(8) {
            Some((idx, _)) => &self.user_id[..idx],
            None => &self.user_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(name: &str, phone: &str) -> ContactInput {
        ContactInput {
            name: name.to_string(),
            phone: phone.to_string(),
        }
    }

    fn sample_profile() -> Profile {
        Profile {
            id: "user-1".to_string(),
            full_name: "Ana Cruz".to_string(),
            email: "ana@example.com".to_string(),
            role: Role::User,
            serial_number: Some("GCMO-100123".to_string()),
            is_crashed: false,
            lat: None,
            lon: None,
        }
    }

    #[test]
    fn test_role_round_trip_strings() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_registration_into_profile() {
        let profile = Registration {
            full_name: "  Ana Cruz ".to_string(),
            email: "ana@example.com".to_string(),
        }
        .into_profile();

        assert_eq!(profile.full_name, "Ana Cruz");
        assert_eq!(profile.role, Role::User);
        assert!(!profile.is_crashed);
        assert!(profile.serial_number.is_none());
        assert!(Uuid::parse_str(&profile.id).is_ok());
    }

    #[test]
    fn test_profile_location() {
        let mut profile = sample_profile();
        assert!(profile.location().is_none());
        profile.lat = Some(8.9475);
        assert!(profile.location().is_none());
        profile.lon = Some(125.543);
        assert_eq!(profile.location(), Some((8.9475, 125.543)));
    }

    #[test]
    fn test_onboarding_submission_formats_fields() {
        let form = OnboardingForm {
            serial: " gcmo-1001234 ".to_string(),
            blood_type: "O+".to_string(),
            organ_donor: true,
            allergies: String::new(),
            chronic_conditions: "Asthma".to_string(),
            contacts: [
                contact("Mara", "917-123-4567"),
                contact("", ""),
                contact("Jun", "0917 123 4567"),
            ],
        };

        let sub = form.submission("user-1");
        assert_eq!(sub.profile.serial_number, "GCMO-100123");
        assert!(sub.profile.full_name.is_none());
        assert_eq!(sub.medical.user_id, "user-1");
        assert_eq!(sub.medical.allergies, "None");
        assert_eq!(sub.medical.chronic_conditions, "Asthma");
        assert_eq!(sub.medical.current_medications, "None");
        assert_eq!(sub.medical.contacts[0].phone, "+639171234567");
        assert_eq!(sub.medical.contacts[1].phone, "");
        assert_eq!(sub.medical.contacts[2].phone, "+6309171234567");
    }

    #[test]
    fn test_onboarding_submission_does_not_gate_invalid_fields() {
        let form = OnboardingForm {
            serial: "xyza-12".to_string(),
            contacts: [contact("A", "123"), ContactInput::default(), ContactInput::default()],
            ..OnboardingForm::default()
        };

        let sub = form.submission("user-1");
        assert_eq!(sub.profile.serial_number, "XYZA-12");
        assert_eq!(sub.medical.contacts[0].phone, "+63123");
        assert!(!sub.report.is_clean());
        assert!(sub.report.is_invalid("serial_number"));
        assert!(sub.report.is_invalid("contact_1_phone"));
        assert!(!sub.report.is_invalid("contact_2_phone"));
    }

    #[test]
    fn test_settings_from_records_strips_country_code() {
        let medical = OnboardingForm {
            serial: "GCMO-100123".to_string(),
            blood_type: "A-".to_string(),
            allergies: "Penicillin".to_string(),
            contacts: [
                contact("Mara", "9171234567"),
                contact("Jun", "9187654321"),
                contact("Lia", "9190000000"),
            ],
            ..OnboardingForm::default()
        }
        .submission("user-1")
        .medical;

        let form = SettingsForm::from_records(&sample_profile(), Some(&medical));
        assert_eq!(form.full_name, "Ana Cruz");
        assert_eq!(form.serial, "GCMO-100123");
        assert_eq!(form.blood_type, "A-");
        assert_eq!(form.contacts[0].phone, "9171234567");
        assert_eq!(form.contacts[1].name, "Jun");
        assert!(form.serial_state().valid);
        assert!(form.phone_states().iter().all(|s| s.valid));
    }

    #[test]
    fn test_settings_from_records_without_medical() {
        let form = SettingsForm::from_records(&sample_profile(), None);
        assert!(form.blood_type.is_empty());
        assert!(!form.phone_states()[0].valid);
    }

    #[test]
    fn test_settings_submission_keeps_unedited_fields() {
        let existing = OnboardingForm {
            serial: "GCMO-100123".to_string(),
            organ_donor: true,
            chronic_conditions: "Diabetes".to_string(),
            contacts: [
                contact("Mara", "9171234567"),
                contact("Jun", "9187654321"),
                contact("Lia", "9190000000"),
            ],
            ..OnboardingForm::default()
        }
        .submission("user-1")
        .medical;

        let mut form = SettingsForm::from_records(&sample_profile(), Some(&existing));
        form.full_name = "Ana C. Cruz".to_string();
        form.contacts[1].phone = "918-000-1111".to_string();

        let sub = form.submission("user-1", Some(&existing));
        assert_eq!(sub.profile.full_name.as_deref(), Some("Ana C. Cruz"));
        assert!(sub.medical.organ_donor);
        assert_eq!(sub.medical.chronic_conditions, "Diabetes");
        assert_eq!(sub.medical.contacts[1].phone, "+639180001111");
        assert_eq!(sub.medical.contacts[2].name, "Lia");
        assert_eq!(sub.medical.contacts[2].phone, "+639190000000");
        assert!(sub.report.is_clean());
    }

    #[test]
    fn test_primary_contact_skips_empty() {
        let medical = OnboardingForm {
            contacts: [
                ContactInput::default(),
                contact("Jun", "9187654321"),
                ContactInput::default(),
            ],
            ..OnboardingForm::default()
        }
        .submission("user-1")
        .medical;

        assert_eq!(medical.primary_contact().unwrap().name, "Jun");
    }

    #[test]
    fn test_incident_log_unknown_rider() {
        let log = IncidentLog::new("abcdef0123456789", None, "62 KM/H", "152 M");
        assert_eq!(log.rider_name, UNKNOWN_RIDER);
        assert_eq!(log.short_user_id(), "abcdef01");

        let log = IncidentLog::new("abc", Some("  ".to_string()), "0 KM/H", "0 M");
        assert_eq!(log.rider_name, UNKNOWN_RIDER);
        assert_eq!(log.short_user_id(), "abc");
    }

    #[test]
    fn test_incident_log_serialization() {
        let log = IncidentLog::new("u1", Some("Ana".to_string()), "61 KM/H", "151 M");
        let json = serde_json::to_string(&log).unwrap();
        assert!(!json.contains("\"id\""));
        let back: IncidentLog = serde_json::from_str(&json).unwrap();
        assert_eq!(back, log);
    }
}
