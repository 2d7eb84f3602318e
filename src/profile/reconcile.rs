//! Matching the live machine config back to a stored profile

use crate::config::machine::MachineConfig;
use crate::profile::schema::Profile;

/// Report which stored profile the live machine config corresponds to.
///
/// A profile matches only when its projection equals the live config on
/// every comparable field: both sides absent, or both present and equal.
/// One extra or differing live field disqualifies the profile; the first
/// match in stored order wins.
pub fn find_active_profile<'a>(
    live: &MachineConfig,
    profiles: &'a [Profile],
) -> Option<&'a Profile> {
    profiles.iter().find(|p| p.machine_config() == *live)
}
