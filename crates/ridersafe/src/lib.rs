//! `ridersafe` - Rider safety profiles, crash alerts and device identity
//!
//! This library provides the core of a motorcycle rider safety service:
//! validation and formatting of device serials and phone numbers, rider and
//! medical profiles in a local `SQLite` store, the crash alert countdown,
//! the admin rider board and the public emergency card.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod crash;
pub mod dashboard;
pub mod error;
pub mod fields;
pub mod logging;
pub mod profile;
pub mod routing;
pub mod status;
pub mod store;
pub mod telemetry;

pub use config::Config;
pub use crash::{AlertHandle, CountdownOutcome, CrashAlert};
pub use dashboard::AdminBoard;
pub use error::{Error, Result};
pub use fields::{FieldKind, FieldReport, FieldState};
pub use logging::init_logging;
pub use profile::{IncidentLog, MedicalProfile, Profile, Role};
pub use store::{Store, StoreStats};
