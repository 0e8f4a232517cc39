//! Command-line interface for ridersafe.
//!
//! This module provides the CLI structure for the `ridersafe` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    CheckCommand, ConfigCommand, CrashCommand, LocateCommand, LoginCommand, LogsCommand,
    OnboardCommand, RegisterCommand, RidersCommand, SettingsCommand, SettingsSaveCommand,
    StatusCommand, UserCommand,
};

use crate::logging::Verbosity;

/// ridersafe - Rider safety profiles and crash alerts
///
/// Registers riders and their helmet devices, keeps the medical card shown
/// to first responders, and runs the crash alert countdown.
#[derive(Debug, Parser)]
#[command(name = "ridersafe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Format and check an identity field
    #[command(subcommand)]
    Check(CheckCommand),

    /// Create a rider account
    Register(RegisterCommand),

    /// Show where an account lands after login
    Login(LoginCommand),

    /// Complete the medical onboarding form
    Onboard(OnboardCommand),

    /// View or edit account settings
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Record a rider's position
    Locate(LocateCommand),

    /// Simulate a crash and run the alert countdown (Ctrl-C cancels)
    Crash(CrashCommand),

    /// Stand down a rider's crash alert
    Cancel(UserCommand),

    /// List riders as the admin board shows them
    Riders(RidersCommand),

    /// List incident logs, newest first
    Logs(LogsCommand),

    /// Clear every active crash alert
    ResetCrashes,

    /// Show the emergency card for a device serial
    Status(StatusCommand),

    /// Show a rider's QR link and image name
    Qr(UserCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet)
    }
}
