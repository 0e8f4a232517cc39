//! Admin board state.
//!
//! [`AdminBoard`] holds what the operator sees: the current rider set, which
//! crash notifications are on screen, and the search term filtering. It does
//! no I/O; callers load riders from the store and hand them to
//! [`AdminBoard::refresh`] whenever something changes.

use regex::RegexBuilder;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::AdminConfig;
use crate::profile::{Profile, Role};

/// Card label for riders without a registered serial.
pub const HARDWARE_LABEL: &str = "REAL-TIME HARDWARE";

/// Map status of a rider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerStatus {
    /// Crash alert active.
    Emergency,
    /// Reporting a position.
    Active,
    /// No position yet.
    Idle,
}

impl MarkerStatus {
    /// Status for a rider profile.
    #[must_use]
    pub fn of(profile: &Profile) -> Self {
        if profile.is_crashed {
            Self::Emergency
        } else if profile.location().is_some() {
            Self::Active
        } else {
            Self::Idle
        }
    }

    /// Marker and card accent color.
    #[must_use]
    pub fn color(self) -> &'static str {
        match self {
            Self::Emergency => "#ff2e43",
            Self::Active => "#4ade80",
            Self::Idle => "#64748b",
        }
    }
}

impl std::fmt::Display for MarkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Emergency => write!(f, "EMERGENCY"),
            Self::Active => write!(f, "ACTIVE"),
            Self::Idle => write!(f, "IDLE"),
        }
    }
}

/// One entry in the rider list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiderCard {
    /// Rider's user id.
    pub id: String,
    /// Display name.
    pub full_name: String,
    /// Device serial, or [`HARDWARE_LABEL`].
    pub label: String,
    /// Map status.
    pub status: MarkerStatus,
    /// Accent color for the status.
    pub color: &'static str,
    /// Last known position.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<(f64, f64)>,
}

impl RiderCard {
    fn from_profile(profile: &Profile) -> Self {
        let status = MarkerStatus::of(profile);
        Self {
            id: profile.id.clone(),
            full_name: profile.full_name.clone(),
            label: profile
                .serial_number
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| HARDWARE_LABEL.to_string()),
            status,
            color: status.color(),
            location: profile.location(),
        }
    }
}

/// Header counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoardStats {
    /// Riders on the board, not counting the admin.
    pub riders: usize,
    /// Riders with an active crash alert.
    pub alerts: usize,
}

/// Operator view over the rider set.
#[derive(Debug, Clone, Default)]
pub struct AdminBoard {
    admin_id: Option<String>,
    include_demo_riders: bool,
    riders: Vec<Profile>,
    notifications: Vec<String>,
}

impl AdminBoard {
    /// Empty board for the signed-in admin.
    #[must_use]
    pub fn new(admin_id: Option<String>, include_demo_riders: bool) -> Self {
        Self {
            admin_id,
            include_demo_riders,
            riders: Vec::new(),
            notifications: Vec::new(),
        }
    }

    /// Empty board using the admin section of the configuration.
    #[must_use]
    pub fn from_config(config: &AdminConfig, admin_id: Option<String>) -> Self {
        Self::new(admin_id, config.include_demo_riders)
    }

    /// Replace the rider set.
    ///
    /// Returns the ids of crashed riders whose notification is not yet on
    /// screen; they count as shown from now on. Notifications for riders no
    /// longer crashed are dropped.
    pub fn refresh(&mut self, riders: Vec<Profile>) -> Vec<String> {
        self.riders = riders;
        if self.include_demo_riders {
            self.riders.extend(demo_riders());
        }

        let crashed: Vec<&Profile> = self
            .riders
            .iter()
            .filter(|p| p.is_crashed && !self.is_admin(&p.id))
            .collect();

        self.notifications
            .retain(|id| crashed.iter().any(|p| &p.id == id));

        let mut fresh = Vec::new();
        for profile in crashed {
            if !self.notifications.contains(&profile.id) {
                warn!(user_id = %profile.id, rider = %profile.full_name, "Crash alert");
                self.notifications.push(profile.id.clone());
                fresh.push(profile.id.clone());
            }
        }

        debug!(
            riders = self.riders.len(),
            new_alerts = fresh.len(),
            "Admin board refreshed"
        );
        fresh
    }

    /// Hide a notification until the next refresh.
    ///
    /// Returns `false` if it was not on screen.
    pub fn dismiss(&mut self, id: &str) -> bool {
        let before = self.notifications.len();
        self.notifications.retain(|n| n != id);
        let dismissed = self.notifications.len() != before;
        if dismissed {
            info!(user_id = %id, "Notification dismissed");
        }
        dismissed
    }

    /// Ids of notifications on screen, oldest first.
    #[must_use]
    pub fn notifications(&self) -> &[String] {
        &self.notifications
    }

    /// Look up a rider on the board.
    #[must_use]
    pub fn rider(&self, id: &str) -> Option<&Profile> {
        self.riders.iter().find(|p| p.id == id)
    }

    /// Rider cards, crashed first, filtered by name.
    ///
    /// The filter is a case-insensitive substring match; an empty term
    /// matches everyone. The admin's own profile is never listed.
    #[must_use]
    pub fn view(&self, term: &str) -> Vec<RiderCard> {
        let needle = term.trim().to_lowercase();

        let mut visible: Vec<&Profile> = self
            .riders
            .iter()
            .filter(|p| !self.is_admin(&p.id))
            .filter(|p| needle.is_empty() || p.full_name.to_lowercase().contains(&needle))
            .collect();
        visible.sort_by_key(|p| !p.is_crashed);

        visible.into_iter().map(RiderCard::from_profile).collect()
    }

    /// Header counts over the whole board, ignoring the search term.
    #[must_use]
    pub fn stats(&self) -> BoardStats {
        let riders = self.riders.iter().filter(|p| !self.is_admin(&p.id)).count();
        let alerts = self.riders.iter().filter(|p| p.is_crashed).count();
        BoardStats { riders, alerts }
    }

    fn is_admin(&self, id: &str) -> bool {
        self.admin_id.as_deref() == Some(id)
    }
}

/// Wrap every case-insensitive occurrence of `term` in `open`/`close`.
///
/// The term is matched literally. An empty term returns the text unchanged.
#[must_use]
pub fn highlight(text: &str, term: &str, open: &str, close: &str) -> String {
    let term = term.trim();
    if term.is_empty() {
        return text.to_string();
    }

    let re = match RegexBuilder::new(&regex::escape(term))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => re,
        Err(e) => {
            warn!(error = %e, "Could not build highlight pattern");
            return text.to_string();
        }
    };

    re.replace_all(text, |caps: &regex::Captures<'_>| {
        format!("{open}{}{close}", &caps[0])
    })
    .into_owned()
}

/// Google Maps street-level view centered on a position.
#[must_use]
pub fn street_view_url(lat: f64, lon: f64) -> String {
    format!("https://www.google.com/maps/@?api=1&map_action=panoid&viewpoint={lat},{lon}")
}

/// Fixed riders around Butuan City used for demonstrations.
#[must_use]
pub fn demo_riders() -> Vec<Profile> {
    const DEMO: [(&str, &str, &str, f64, f64, bool); 5] = [
        ("D-01", "Angelo Vegafria", "GCMO-1001", 8.9475, 125.5430, false),
        ("D-02", "Harold Baja", "GCMO-1002", 8.9550, 125.5970, false),
        ("D-03", "Clint Lloyd Garcia", "GCMO-1003", 8.9200, 125.5200, false),
        ("D-04", "Drex Parba", "GCMO-1004", 9.0500, 125.5200, false),
        ("D-05", "Augustus Moongot", "GCMO-1005", 8.9700, 125.5000, true),
    ];

    DEMO.iter()
        .map(|&(id, name, serial, lat, lon, crashed)| Profile {
            id: id.to_string(),
            full_name: name.to_string(),
            email: String::new(),
            role: Role::User,
            serial_number: Some(serial.to_string()),
            is_crashed: crashed,
            lat: Some(lat),
            lon: Some(lon),
        })
        .collect()
}
