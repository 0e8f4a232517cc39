//! Error types for ridersafe.
//!
//! Field validation never fails; these errors cover the store, configuration,
//! lookups and I/O around it.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for ridersafe operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Lookup Errors ===
    /// No profile exists for the user.
    #[error("profile not found for user {user_id}")]
    ProfileNotFound {
        /// The user identifier that was looked up.
        user_id: String,
    },

    /// No rider is registered with the serial.
    #[error("no rider registered with device {serial}")]
    RiderNotFound {
        /// The device serial that was looked up.
        serial: String,
    },

    /// More than one rider is registered with the serial.
    #[error("device {serial} is registered to {matches} riders")]
    AmbiguousSerial {
        /// The device serial that was looked up.
        serial: String,
        /// How many profiles carry it.
        matches: usize,
    },

    /// The rider has not completed the medical profile.
    #[error("medical profile missing for user {user_id}")]
    MedicalProfileMissing {
        /// The user identifier that was looked up.
        user_id: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A link could not be built.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

}

/// A specialized Result type for ridersafe operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a profile-not-found error.
    #[must_use]
    pub fn profile_not_found(user_id: impl Into<String>) -> Self {
        Self::ProfileNotFound {
            user_id: user_id.into(),
        }
    }

    /// Create a rider-not-found error.
    #[must_use]
    pub fn rider_not_found(serial: impl Into<String>) -> Self {
        Self::RiderNotFound {
            serial: serial.into(),
        }
    }

    /// Check if this error means a record was absent rather than broken.
    ///
    /// A serial shared by several riders counts as absent: no single card
    /// can be shown for it.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ProfileNotFound { .. }
                | Self::RiderNotFound { .. }
                | Self::AmbiguousSerial { .. }
                | Self::MedicalProfileMissing { .. }
        )
    }
}
