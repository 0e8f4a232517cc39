//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::profile::ContactInput;

/// Field check commands.
#[derive(Debug, Subcommand)]
pub enum CheckCommand {
    /// Format and check a device serial
    Serial {
        /// Serial as typed
        value: String,
    },

    /// Format and check a local phone number
    Phone {
        /// Phone as typed
        value: String,
    },
}

/// Register command arguments.
#[derive(Debug, Args)]
pub struct RegisterCommand {
    /// Rider's full name
    #[arg(short, long)]
    pub name: String,

    /// Login email
    #[arg(short, long)]
    pub email: String,

    /// Give the account access to the admin board
    #[arg(long)]
    pub admin: bool,
}

/// Login command arguments.
#[derive(Debug, Args)]
pub struct LoginCommand {
    /// Login email
    #[arg(short, long)]
    pub email: String,
}

/// Onboard command arguments.
#[derive(Debug, Args)]
pub struct OnboardCommand {
    /// User id to onboard
    #[arg(short, long)]
    pub user: String,

    /// Device serial (e.g. GCMO-100123)
    #[arg(short, long)]
    pub serial: String,

    /// Blood type
    #[arg(short, long)]
    pub blood_type: String,

    /// Registered organ donor
    #[arg(long)]
    pub organ_donor: bool,

    /// Known allergies
    #[arg(long, default_value = "")]
    pub allergies: String,

    /// Chronic conditions
    #[arg(long, default_value = "")]
    pub conditions: String,

    /// Emergency contact as NAME=PHONE (up to three)
    #[arg(long = "contact", value_parser = parse_contact, num_args = 1)]
    pub contacts: Vec<ContactInput>,
}

/// Settings commands.
#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Show the settings form as pre-filled from stored records
    Show {
        /// User id
        #[arg(short, long)]
        user: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Edit settings; omitted fields keep their stored values
    Save(SettingsSaveCommand),
}

/// Settings save arguments.
#[derive(Debug, Args)]
pub struct SettingsSaveCommand {
    /// User id
    #[arg(short, long)]
    pub user: String,

    /// New full name
    #[arg(short, long)]
    pub name: Option<String>,

    /// New device serial
    #[arg(short, long)]
    pub serial: Option<String>,

    /// New blood type
    #[arg(short, long)]
    pub blood_type: Option<String>,

    /// New allergies
    #[arg(long)]
    pub allergies: Option<String>,

    /// First emergency contact as NAME=PHONE
    #[arg(long, value_parser = parse_contact)]
    pub contact1: Option<ContactInput>,

    /// Second emergency contact as NAME=PHONE
    #[arg(long, value_parser = parse_contact)]
    pub contact2: Option<ContactInput>,
}

/// Locate command arguments.
#[derive(Debug, Args)]
pub struct LocateCommand {
    /// User id
    #[arg(short, long)]
    pub user: String,

    /// Latitude
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,
}

/// Crash simulation arguments.
#[derive(Debug, Args)]
pub struct CrashCommand {
    /// User id
    #[arg(short, long)]
    pub user: String,

    /// Countdown length in seconds (defaults to the configured value)
    #[arg(short, long)]
    pub seconds: Option<u32>,
}

/// Commands that act on one rider.
#[derive(Debug, Args)]
pub struct UserCommand {
    /// User id
    #[arg(short, long)]
    pub user: String,
}

/// Riders command arguments.
#[derive(Debug, Args)]
pub struct RidersCommand {
    /// Filter riders by name
    #[arg(short, long, default_value = "")]
    pub search: String,

    /// Admin user id to leave out of the list
    #[arg(long)]
    pub admin: Option<String>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Logs command arguments.
#[derive(Debug, Args)]
pub struct LogsCommand {
    /// Maximum number of incidents
    #[arg(short, long, default_value = "50")]
    pub limit: usize,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Status page command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Device serial from the QR code
    pub serial: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Parse a `NAME=PHONE` contact.
fn parse_contact(raw: &str) -> Result<ContactInput, String> {
    let (name, phone) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=PHONE, got '{raw}'"))?;
    Ok(ContactInput {
        name: name.trim().to_string(),
        phone: phone.trim().to_string(),
    })
}
