//! Where a signed-in account lands.

use serde::Serialize;
use tracing::debug;

use crate::profile::Role;

/// A landing screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// The admin board.
    Admin,
    /// The rider dashboard.
    User,
    /// Medical onboarding, required before the rider dashboard.
    Onboarding,
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::User => write!(f, "user"),
            Self::Onboarding => write!(f, "onboarding"),
        }
    }
}

/// Pick the landing screen after login.
///
/// The configured admin email always wins. Otherwise the stored role
/// decides, and an account with no profile yet is treated as a rider.
#[must_use]
pub fn route_after_login(email: &str, role: Option<Role>, admin_email: Option<&str>) -> Destination {
    if admin_email.is_some_and(|admin| admin.trim().eq_ignore_ascii_case(email.trim())) {
        debug!("Configured admin email, routing to admin board");
        return Destination::Admin;
    }

    match role {
        Some(Role::Admin) => Destination::Admin,
        Some(Role::User) => Destination::User,
        None => {
            debug!("No profile for account, routing as rider");
            Destination::User
        }
    }
}

/// Send riders without a medical record to onboarding.
#[must_use]
pub fn guard_user_dashboard(has_medical: bool) -> Destination {
    if has_medical {
        Destination::User
    } else {
        Destination::Onboarding
    }
}
