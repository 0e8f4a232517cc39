//! Storage layer for ridersafe.
//!
//! This module provides `SQLite`-based persistent storage for rider profiles,
//! medical records and incident logs. Lookups that find nothing return
//! `Ok(None)`; only SQL failures are errors.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::profile::{
    EmergencyContact, IncidentLog, MedicalProfile, Profile, ProfileUpdate, Role, Submission,
};

const PROFILE_COLUMNS: &str = "id, full_name, email, role, serial_number, is_crashed, lat, lon";

const MEDICAL_COLUMNS: &str = "user_id, blood_type, organ_donor, allergies, chronic_conditions, \
     current_medications, contact_1_name, contact_1_phone, contact_2_name, contact_2_phone, \
     contact_3_name, contact_3_phone, updated_at";

const INCIDENT_COLUMNS: &str =
    "id, user_id, rider_name, final_velocity, final_elevation, timestamp";

/// Fixed-width timestamps so text ordering matches time ordering.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw).map_or_else(
        |_| {
            warn!(timestamp = %raw, "Unparsable timestamp, using now");
            Utc::now()
        },
        |dt| dt.with_timezone(&Utc),
    )
}

/// Profile store backed by `SQLite`.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    conn: Connection,
}

impl Store {
    /// Open or create a store at the given path.
    ///
    /// Creates parent directories as needed and brings the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    // === Profiles ===

    /// Insert a new profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the id already exists or the write fails.
    pub fn create_profile(&self, profile: &Profile) -> Result<()> {
        self.conn.execute(
            r"
            INSERT INTO profiles (id, full_name, email, role, serial_number, is_crashed, lat, lon)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
            params![
                profile.id,
                profile.full_name,
                profile.email,
                profile.role.to_string(),
                profile.serial_number,
                profile.is_crashed,
                profile.lat,
                profile.lon,
            ],
        )?;
        debug!(user_id = %profile.id, "Created profile");
        Ok(())
    }

    /// Get a profile by user id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_profile(&self, id: &str) -> Result<Option<Profile>> {
        let profile = self
            .conn
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"),
                [id],
                Self::row_to_profile,
            )
            .optional()?;
        Ok(profile)
    }

    /// Find a profile by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn find_by_email(&self, email: &str) -> Result<Option<Profile>> {
        let profile = self
            .conn
            .query_row(
                &format!(
                    "SELECT {PROFILE_COLUMNS} FROM profiles WHERE email = ?1 COLLATE NOCASE LIMIT 1"
                ),
                [email],
                Self::row_to_profile,
            )
            .optional()?;
        Ok(profile)
    }

    /// Find the profile registered to a device serial.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn find_by_serial(&self, serial: &str) -> Result<Option<Profile>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE serial_number = ?1"
        ))?;
        let mut matches = stmt
            .query_map([serial], Self::row_to_profile)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        match matches.len() {
            0 | 1 => Ok(matches.pop()),
            n => {
                warn!(serial = %serial, matches = n, "Serial registered to several riders");
                Err(Error::AmbiguousSerial {
                    serial: serial.to_string(),
                    matches: n,
                })
            }
        }
    }

    /// Number of other profiles already registered with a serial.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn serial_taken_by_others(&self, user_id: &str, serial: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM profiles WHERE serial_number = ?1 AND id != ?2",
            params![serial, user_id],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Apply a form's profile columns. Returns `false` if no such user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<bool> {
        let affected = self.conn.execute(
            r"
            UPDATE profiles
            SET full_name = COALESCE(?2, full_name), serial_number = ?3
            WHERE id = ?1
            ",
            params![id, update.full_name, update.serial_number],
        )?;
        Ok(affected > 0)
    }

    /// Change a profile's role. Returns `false` if no such user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn set_role(&self, id: &str, role: Role) -> Result<bool> {
        let affected = self.conn.execute(
            "UPDATE profiles SET role = ?2 WHERE id = ?1",
            params![id, role.to_string()],
        )?;
        Ok(affected > 0)
    }

    /// Record a rider's position. Returns `false` if no such user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn set_location(&self, id: &str, lat: f64, lon: f64) -> Result<bool> {
        let affected = self.conn.execute(
            "UPDATE profiles SET lat = ?2, lon = ?3 WHERE id = ?1",
            params![id, lat, lon],
        )?;
        Ok(affected > 0)
    }

    /// Raise or clear a rider's crash flag. Returns `false` if no such user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn set_crashed(&self, id: &str, crashed: bool) -> Result<bool> {
        let affected = self.conn.execute(
            "UPDATE profiles SET is_crashed = ?2 WHERE id = ?1",
            params![id, crashed],
        )?;
        if affected > 0 {
            info!(user_id = %id, crashed, "Crash flag updated");
        }
        Ok(affected > 0)
    }

    /// Clear every active crash flag, returning how many were cleared.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn reset_all_crashes(&self) -> Result<usize> {
        let affected = self
            .conn
            .execute("UPDATE profiles SET is_crashed = 0 WHERE is_crashed = 1", [])?;
        info!("Cleared {} crash alerts", affected);
        Ok(affected)
    }

    /// All rider profiles (role `user`), in registration order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_riders(&self) -> Result<Vec<Profile>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE role = 'user' ORDER BY created_at, rowid"
        ))?;
        let riders = stmt
            .query_map([], Self::row_to_profile)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(riders)
    }

    // === Medical records ===

    /// Insert or replace the medical record for its user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn upsert_medical(&self, medical: &MedicalProfile) -> Result<()> {
        let [c1, c2, c3] = &medical.contacts;
        self.conn.execute(
            &format!(
                r"
                INSERT INTO medical_profiles ({MEDICAL_COLUMNS})
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                ON CONFLICT(user_id) DO UPDATE SET
                    blood_type = excluded.blood_type,
                    organ_donor = excluded.organ_donor,
                    allergies = excluded.allergies,
                    chronic_conditions = excluded.chronic_conditions,
                    current_medications = excluded.current_medications,
                    contact_1_name = excluded.contact_1_name,
                    contact_1_phone = excluded.contact_1_phone,
                    contact_2_name = excluded.contact_2_name,
                    contact_2_phone = excluded.contact_2_phone,
                    contact_3_name = excluded.contact_3_name,
                    contact_3_phone = excluded.contact_3_phone,
                    updated_at = excluded.updated_at
                "
            ),
            params![
                medical.user_id,
                medical.blood_type,
                medical.organ_donor,
                medical.allergies,
                medical.chronic_conditions,
                medical.current_medications,
                c1.name,
                c1.phone,
                c2.name,
                c2.phone,
                c3.name,
                c3.phone,
                format_timestamp(medical.updated_at),
            ],
        )?;
        debug!(user_id = %medical.user_id, "Upserted medical profile");
        Ok(())
    }

    /// Get a user's medical record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_medical(&self, user_id: &str) -> Result<Option<MedicalProfile>> {
        let medical = self
            .conn
            .query_row(
                &format!("SELECT {MEDICAL_COLUMNS} FROM medical_profiles WHERE user_id = ?1"),
                [user_id],
                Self::row_to_medical,
            )
            .optional()?;
        Ok(medical)
    }

    /// Whether the user has completed onboarding.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn has_medical(&self, user_id: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM medical_profiles WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Write both halves of a form submission atomically.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProfileNotFound`] if the user has no profile, or an
    /// error if either write fails. Nothing is written on error.
    pub fn save_submission(&self, user_id: &str, submission: &Submission) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        if !self.update_profile(user_id, &submission.profile)? {
            return Err(Error::profile_not_found(user_id));
        }
        self.upsert_medical(&submission.medical)?;

        tx.commit()?;

        let serial = &submission.profile.serial_number;
        if !serial.is_empty() && self.serial_taken_by_others(user_id, serial)? > 0 {
            warn!(user_id = %user_id, serial = %serial, "Serial already registered to another rider");
        }
        info!(
            user_id = %user_id,
            invalid_fields = submission.report.invalid().len(),
            "Saved profile submission"
        );
        Ok(())
    }

    // === Incidents ===

    /// Record an incident, returning its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_incident(&self, incident: &IncidentLog) -> Result<i64> {
        self.conn.execute(
            r"
            INSERT INTO incident_logs (user_id, rider_name, final_velocity, final_elevation, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
            params![
                incident.user_id,
                incident.rider_name,
                incident.final_velocity,
                incident.final_elevation,
                format_timestamp(incident.timestamp),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(incident_id = id, user_id = %incident.user_id, "Recorded incident");
        Ok(id)
    }

    /// Most recent incident for a rider.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn latest_incident(&self, user_id: &str) -> Result<Option<IncidentLog>> {
        let incident = self
            .conn
            .query_row(
                &format!(
                    "SELECT {INCIDENT_COLUMNS} FROM incident_logs WHERE user_id = ?1 \
                     ORDER BY timestamp DESC, id DESC LIMIT 1"
                ),
                [user_id],
                Self::row_to_incident,
            )
            .optional()?;
        Ok(incident)
    }

    /// Most recent incidents across all riders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_incidents(&self, limit: usize) -> Result<Vec<IncidentLog>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {INCIDENT_COLUMNS} FROM incident_logs ORDER BY timestamp DESC, id DESC LIMIT ?1"
        ))?;
        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let incidents = stmt
            .query_map([limit_i64], Self::row_to_incident)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(incidents)
    }

    /// Counts for the admin header.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StoreStats> {
        let (riders, active_alerts): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(is_crashed), 0) FROM profiles WHERE role = 'user'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let incidents: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM incident_logs", [], |row| row.get(0))?;

        Ok(StoreStats {
            riders,
            active_alerts,
            incidents,
        })
    }

    fn row_to_profile(row: &rusqlite::Row) -> rusqlite::Result<Profile> {
        let role_str: String = row.get(3)?;
        let role = role_str.parse().unwrap_or_else(|_| {
            warn!("Unknown role: {}, treating as user", role_str);
            Role::User
        });

        Ok(Profile {
            id: row.get(0)?,
            full_name: row.get(1)?,
            email: row.get(2)?,
            role,
            serial_number: row.get(4)?,
            is_crashed: row.get(5)?,
            lat: row.get(6)?,
            lon: row.get(7)?,
        })
    }

    fn row_to_medical(row: &rusqlite::Row) -> rusqlite::Result<MedicalProfile> {
        let contact = |name: usize, phone: usize| -> rusqlite::Result<EmergencyContact> {
            Ok(EmergencyContact {
                name: row.get(name)?,
                phone: row.get(phone)?,
            })
        };
        let updated_at: String = row.get(12)?;

        Ok(MedicalProfile {
            user_id: row.get(0)?,
            blood_type: row.get(1)?,
            organ_donor: row.get(2)?,
            allergies: row.get(3)?,
            chronic_conditions: row.get(4)?,
            current_medications: row.get(5)?,
            contacts: [contact(6, 7)?, contact(8, 9)?, contact(10, 11)?],
            updated_at: parse_timestamp(&updated_at),
        })
    }

    fn row_to_incident(row: &rusqlite::Row) -> rusqlite::Result<IncidentLog> {
        let timestamp: String = row.get(5)?;
        Ok(IncidentLog {
            id: Some(row.get(0)?),
            user_id: row.get(1)?,
            rider_name: row.get(2)?,
            final_velocity: row.get(3)?,
            final_elevation: row.get(4)?,
            timestamp: parse_timestamp(&timestamp),
        })
    }
}

/// Counts shown in the admin header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Registered riders.
    pub riders: i64,
    /// Riders with an active crash flag.
    pub active_alerts: i64,
    /// Incident logs recorded.
    pub incidents: i64,
}
