//! `ridersafe` - CLI for rider safety profiles
//!
//! This binary exposes registration, onboarding, the crash alert countdown,
//! the admin rider board and the public emergency card from the terminal.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{error, warn};

use ridersafe::cli::{
    CheckCommand, Cli, Command, ConfigCommand, CrashCommand, LocateCommand, LoginCommand,
    LogsCommand, OnboardCommand, RegisterCommand, RidersCommand, SettingsCommand,
    SettingsSaveCommand, StatusCommand,
};
use ridersafe::crash::{record_outcome, run_countdown, AlertHandle, CountdownEvent, CrashAlert};
use ridersafe::dashboard::{highlight, street_view_url, AdminBoard};
use ridersafe::fields::{to_storage_phone, FieldKind, FieldReport};
use ridersafe::profile::{
    ContactInput, OnboardingForm, Registration, Role, SettingsForm, Submission,
};
use ridersafe::routing::{guard_user_dashboard, route_after_login, Destination};
use ridersafe::status::{emergency_card, qr_filename, status_url};
use ridersafe::telemetry::TelemetrySimulator;
use ridersafe::{init_logging, Config, Error, Store};

const MARK_OPEN: &str = "\x1b[7m";
const MARK_CLOSE: &str = "\x1b[0m";

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    if let Command::Config(ConfigCommand::Validate { file }) = &cli.command {
        return validate_config(file.clone().or_else(|| cli.config.clone()));
    }

    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Check(cmd) => {
            handle_check(&cmd);
            Ok(())
        }
        Command::Config(cmd) => handle_config(&config, cmd),
        command => {
            let store = Store::open(config.database_path())
                .context("could not open the rider database")?;
            handle_store_command(&config, &store, command)
        }
    }
}

fn handle_store_command(config: &Config, store: &Store, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Register(cmd) => handle_register(store, &cmd),
        Command::Login(cmd) => handle_login(config, store, &cmd),
        Command::Onboard(cmd) => handle_onboard(store, cmd),
        Command::Settings(SettingsCommand::Show { user, json }) => {
            handle_settings_show(store, &user, json)
        }
        Command::Settings(SettingsCommand::Save(cmd)) => handle_settings_save(store, cmd),
        Command::Locate(cmd) => handle_locate(store, &cmd),
        Command::Crash(cmd) => handle_crash(config, store, &cmd),
        Command::Cancel(cmd) => {
            if !store.set_crashed(&cmd.user, false)? {
                return Err(Error::profile_not_found(cmd.user).into());
            }
            println!("Crash alert cleared.");
            Ok(())
        }
        Command::Riders(cmd) => handle_riders(config, store, &cmd),
        Command::Logs(cmd) => handle_logs(store, &cmd),
        Command::ResetCrashes => {
            let cleared = store.reset_all_crashes()?;
            println!("All crash alerts cleared ({cleared}).");
            Ok(())
        }
        Command::Status(cmd) => handle_status(store, &cmd),
        Command::Qr(cmd) => handle_qr(config, store, &cmd.user),
        Command::Check(_) | Command::Config(_) => Ok(()),
    }
}

fn handle_check(cmd: &CheckCommand) {
    let (kind, raw) = match cmd {
        CheckCommand::Serial { value } => (FieldKind::Serial, value),
        CheckCommand::Phone { value } => (FieldKind::Phone, value),
    };

    let state = kind.apply(raw);
    let mark = if state.valid { "valid" } else { "invalid" };
    println!("{kind}: {} ({mark})", state.value);
    if kind == FieldKind::Phone {
        println!("stored as: {}", to_storage_phone(&state.value));
    }
}

fn handle_register(store: &Store, cmd: &RegisterCommand) -> anyhow::Result<()> {
    if store.find_by_email(cmd.email.trim())?.is_some() {
        bail!("an account with email {} already exists", cmd.email.trim());
    }

    let profile = Registration {
        full_name: cmd.name.clone(),
        email: cmd.email.clone(),
    }
    .into_profile();
    store.create_profile(&profile)?;

    if cmd.admin {
        store.set_role(&profile.id, Role::Admin)?;
        println!("Registered admin {} ({})", profile.full_name, profile.id);
        return Ok(());
    }

    println!("Registered {} ({})", profile.full_name, profile.id);
    println!("Next: ridersafe onboard --user {}", profile.id);
    Ok(())
}

fn handle_login(config: &Config, store: &Store, cmd: &LoginCommand) -> anyhow::Result<()> {
    let profile = match store.find_by_email(cmd.email.trim()) {
        Ok(profile) => profile,
        Err(e) => {
            warn!(error = %e, "Profile lookup failed, routing as rider");
            None
        }
    };

    let mut destination = route_after_login(
        &cmd.email,
        profile.as_ref().map(|p| p.role),
        config.admin.admin_email.as_deref(),
    );
    if let (Destination::User, Some(p)) = (destination, &profile) {
        destination = guard_user_dashboard(store.has_medical(&p.id)?);
    }

    match &profile {
        Some(p) => println!("{} ({}) -> {destination}", p.full_name, p.id),
        None => println!("{} (no profile) -> {destination}", cmd.email.trim()),
    }
    Ok(())
}

fn save(store: &Store, user_id: &str, submission: &Submission) -> anyhow::Result<()> {
    if let Err(e) = store.save_submission(user_id, submission) {
        error!(user_id = %user_id, error = %e, "Saving profile failed");
        return Err(e.into());
    }
    print_report(&submission.report);
    Ok(())
}

fn print_report(report: &FieldReport) {
    for field in report.invalid() {
        println!("  ! {} looks wrong: '{}'", field.field, field.value);
    }
}

fn handle_onboard(store: &Store, cmd: OnboardCommand) -> anyhow::Result<()> {
    if cmd.contacts.len() > 3 {
        bail!("at most three emergency contacts, got {}", cmd.contacts.len());
    }
    if store.get_profile(&cmd.user)?.is_none() {
        return Err(Error::profile_not_found(cmd.user).into());
    }

    let mut contacts: [ContactInput; 3] = Default::default();
    for (slot, contact) in contacts.iter_mut().zip(cmd.contacts) {
        *slot = contact;
    }

    let form = OnboardingForm {
        serial: cmd.serial,
        blood_type: cmd.blood_type,
        organ_donor: cmd.organ_donor,
        allergies: cmd.allergies,
        chronic_conditions: cmd.conditions,
        contacts,
    };
    let submission = form.submission(&cmd.user);
    save(store, &cmd.user, &submission)?;

    println!(
        "Medical profile saved. Device {} registered.",
        submission.profile.serial_number
    );
    Ok(())
}

fn settings_form(store: &Store, user_id: &str) -> anyhow::Result<SettingsForm> {
    let profile = store
        .get_profile(user_id)?
        .ok_or_else(|| Error::profile_not_found(user_id))?;
    let medical = store.get_medical(user_id)?;
    Ok(SettingsForm::from_records(&profile, medical.as_ref()))
}

fn handle_settings_show(store: &Store, user_id: &str, json: bool) -> anyhow::Result<()> {
    let form = settings_form(store, user_id)?;
    let serial = form.serial_state();
    let phones = form.phone_states();

    if json {
        let value = serde_json::json!({
            "full_name": form.full_name,
            "serial": serial,
            "blood_type": form.blood_type,
            "allergies": form.allergies,
            "contacts": [
                { "name": form.contacts[0].name, "phone": phones[0] },
                { "name": form.contacts[1].name, "phone": phones[1] },
            ],
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let tick = |valid: bool| if valid { "ok" } else { "--" };
    println!("Full name:   {}", form.full_name);
    println!("Serial:      {} [{}]", serial.value, tick(serial.valid));
    println!("Blood type:  {}", form.blood_type);
    println!("Allergies:   {}", form.allergies);
    for (i, (contact, phone)) in form.contacts.iter().zip(&phones).enumerate() {
        println!(
            "Contact {}:   {} {} [{}]",
            i + 1,
            contact.name,
            phone.value,
            tick(phone.valid)
        );
    }
    Ok(())
}

fn handle_settings_save(store: &Store, cmd: SettingsSaveCommand) -> anyhow::Result<()> {
    let mut form = settings_form(store, &cmd.user)?;
    let existing = store.get_medical(&cmd.user)?;

    if let Some(name) = cmd.name {
        form.full_name = name;
    }
    if let Some(serial) = cmd.serial {
        form.serial = serial;
    }
    if let Some(blood_type) = cmd.blood_type {
        form.blood_type = blood_type;
    }
    if let Some(allergies) = cmd.allergies {
        form.allergies = allergies;
    }
    if let Some(contact) = cmd.contact1 {
        form.contacts[0] = contact;
    }
    if let Some(contact) = cmd.contact2 {
        form.contacts[1] = contact;
    }

    let submission = form.submission(&cmd.user, existing.as_ref());
    save(store, &cmd.user, &submission)?;
    println!("Settings saved.");
    Ok(())
}

fn handle_locate(store: &Store, cmd: &LocateCommand) -> anyhow::Result<()> {
    if !(-90.0..=90.0).contains(&cmd.lat) || !(-180.0..=180.0).contains(&cmd.lon) {
        bail!("coordinates out of range: {}, {}", cmd.lat, cmd.lon);
    }
    if !store.set_location(&cmd.user, cmd.lat, cmd.lon)? {
        return Err(Error::profile_not_found(&cmd.user).into());
    }
    println!("Position recorded: {}, {}", cmd.lat, cmd.lon);
    Ok(())
}

fn handle_crash(config: &Config, store: &Store, cmd: &CrashCommand) -> anyhow::Result<()> {
    if store.get_profile(&cmd.user)?.is_none() {
        return Err(Error::profile_not_found(&cmd.user).into());
    }

    let mut simulator = TelemetrySimulator::new();
    let reading = simulator.next_reading();
    println!(
        "Telemetry: {} | {} | {} ms | {}",
        reading.velocity_label(),
        reading.elevation_label(),
        reading.latency_ms,
        reading.coordinates
    );

    let seconds = cmd.seconds.unwrap_or(config.alert.countdown_seconds);
    let mut alert = CrashAlert::new();
    alert.start(seconds);
    println!("CRASH DETECTED. Sending alert in {seconds}s; press Ctrl-C to cancel.");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let outcome = runtime.block_on(async {
        let handle = AlertHandle::new();
        let on_signal = handle.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_signal.cancel();
            }
        });

        run_countdown(&mut alert, config.tick_interval(), &handle, |event| match event {
            CountdownEvent::Remaining(n) => println!("  {n}"),
            CountdownEvent::Sent => println!("  SENT"),
            CountdownEvent::Ignored => {}
        })
        .await
    });

    match record_outcome(store, &cmd.user, outcome, Some(&reading))? {
        Some(incident_id) => println!("Alert sent. Black box saved as incident #{incident_id}."),
        None => println!("Alert cancelled."),
    }
    Ok(())
}

fn handle_riders(config: &Config, store: &Store, cmd: &RidersCommand) -> anyhow::Result<()> {
    let mut board = AdminBoard::from_config(&config.admin, cmd.admin.clone());
    let fresh = board.refresh(store.list_riders()?);
    let cards = board.view(&cmd.search);
    let stats = board.stats();

    if cmd.json {
        let value = serde_json::json!({
            "stats": stats,
            "alerts": fresh,
            "riders": cards,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Riders: {}   Alerts: {}", stats.riders, stats.alerts);
    println!();
    for card in &cards {
        println!(
            "{:<10} {}  [{}]",
            card.status,
            highlight(&card.full_name, &cmd.search, MARK_OPEN, MARK_CLOSE),
            card.label
        );
    }

    for id in &fresh {
        if let Some(rider) = board.rider(id) {
            println!();
            println!("CRASH ALERT: {}", rider.full_name);
            if let Some((lat, lon)) = rider.location() {
                println!("  Street view: {}", street_view_url(lat, lon));
            }
            if let Some(log) = store.latest_incident(id)? {
                println!(
                    "  Last reading: {} | {} at {}",
                    log.final_velocity,
                    log.final_elevation,
                    log.timestamp.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
    }
    Ok(())
}

fn handle_logs(store: &Store, cmd: &LogsCommand) -> anyhow::Result<()> {
    let logs = store.list_incidents(cmd.limit)?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&logs)?);
        return Ok(());
    }

    if logs.is_empty() {
        println!("No incidents recorded.");
        return Ok(());
    }

    let stats = store.stats()?;
    println!(
        "Riders: {}   Active alerts: {}   Incidents: {}",
        stats.riders, stats.active_alerts, stats.incidents
    );
    println!();
    for log in &logs {
        println!(
            "UID: {}  {}  {} | {}  {}",
            log.short_user_id(),
            log.rider_name,
            log.final_velocity,
            log.final_elevation,
            log.timestamp.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

fn handle_status(store: &Store, cmd: &StatusCommand) -> anyhow::Result<()> {
    let card = emergency_card(store, &cmd.serial)?;
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&card)?);
    } else {
        println!("{card}");
    }
    Ok(())
}

fn handle_qr(config: &Config, store: &Store, user_id: &str) -> anyhow::Result<()> {
    let profile = store
        .get_profile(user_id)?
        .ok_or_else(|| Error::profile_not_found(user_id))?;
    let Some(serial) = profile.serial_number.filter(|s| !s.is_empty()) else {
        bail!("no device registered yet; run `ridersafe onboard` first");
    };

    let url = status_url(&config.status.base_url, &serial)?;
    println!("Status link: {url}");
    println!("QR image:    {}", qr_filename(&serial));
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Admin]");
                println!(
                    "  Admin email:        {}",
                    config.admin.admin_email.as_deref().unwrap_or("(none)")
                );
                println!("  Demo riders:        {}", config.admin.include_demo_riders);
                println!();
                println!("[Alert]");
                println!("  Countdown (s):      {}", config.alert.countdown_seconds);
                println!("  Tick (ms):          {}", config.alert.tick_interval_ms);
                println!();
                println!("[Status]");
                println!("  Base URL:           {}", config.status.base_url);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => return validate_config(file),
    }
    Ok(())
}

fn validate_config(file: Option<PathBuf>) -> anyhow::Result<()> {
    let path = file.unwrap_or_else(Config::default_config_path);
    println!("Validating configuration: {}", path.display());
    Config::load_from(Some(path.clone()))
        .with_context(|| format!("configuration {} is invalid", path.display()))?;
    println!("Configuration is valid.");
    Ok(())
}
