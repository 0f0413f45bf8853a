use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::principal::Role;

/// Permission string checked by route guards. The wire form is the
/// SCREAMING_SNAKE constant the platform API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Policy {
    VolunteerRead,
    VolunteerWrite,
    ProjectRead,
    ProjectWrite,
    DonationRead,
    DonationWrite,
    ProfileRead,
    ProfileWrite,
    DashboardRead,
    AdminAccess,
}

impl Policy {
    /// Every defined policy, in declaration order.
    pub const ALL: [Policy; 10] = [
        Policy::VolunteerRead,
        Policy::VolunteerWrite,
        Policy::ProjectRead,
        Policy::ProjectWrite,
        Policy::DonationRead,
        Policy::DonationWrite,
        Policy::ProfileRead,
        Policy::ProfileWrite,
        Policy::DashboardRead,
        Policy::AdminAccess,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Policy::VolunteerRead => "VOLUNTEER_READ",
            Policy::VolunteerWrite => "VOLUNTEER_WRITE",
            Policy::ProjectRead => "PROJECT_READ",
            Policy::ProjectWrite => "PROJECT_WRITE",
            Policy::DonationRead => "DONATION_READ",
            Policy::DonationWrite => "DONATION_WRITE",
            Policy::ProfileRead => "PROFILE_READ",
            Policy::ProfileWrite => "PROFILE_WRITE",
            Policy::DashboardRead => "DASHBOARD_READ",
            Policy::AdminAccess => "ADMIN_ACCESS",
        }
    }
}

impl std::fmt::Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Policy {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Policy::ALL.iter().copied().find(|p| p.as_str() == value).ok_or(())
    }
}

const ONG_POLICIES: &[Policy] = &[
    Policy::VolunteerRead,
    Policy::VolunteerWrite,
    Policy::ProjectRead,
    Policy::ProjectWrite,
    Policy::DonationRead,
    Policy::DonationWrite,
    Policy::DashboardRead,
    Policy::ProfileRead,
];

// VolunteerRead lets volunteers into their own dashboard area.
const VOLUNTEER_POLICIES: &[Policy] = &[
    Policy::ProjectRead,
    Policy::ProfileRead,
    Policy::ProfileWrite,
    Policy::VolunteerRead,
];

const SUPPORTER_POLICIES: &[Policy] = &[Policy::ProjectRead, Policy::DonationWrite];

fn table_for(role: &Role) -> &'static [Policy] {
    match role {
        Role::Admin => &Policy::ALL,
        Role::Ong => ONG_POLICIES,
        Role::Volunteer => VOLUNTEER_POLICIES,
        Role::Company | Role::User => SUPPORTER_POLICIES,
        Role::Unknown(_) => &[],
    }
}

/// Policies granted to a role. Unknown roles get nothing.
pub fn policies_for(role: &Role) -> BTreeSet<Policy> {
    table_for(role).iter().copied().collect()
}

/// Membership check without building the set.
pub fn role_has_policy(role: &Role, policy: Policy) -> bool {
    table_for(role).contains(&policy)
}
