//! Resource profiles, their durable store, and live-state reconciliation

pub mod reconcile;
pub mod schema;
pub mod store;

use anyhow::Result;
use std::path::Path;

use crate::config::machine;
use schema::Profile;

/// Write the profile's projection over the machine-wide config file.
///
/// A full-file overwrite, not a merge: after an apply the file contains
/// exactly what the profile manages, and hand-edited keys outside that
/// set are gone. Takes effect on the next WSL VM start.
pub fn apply_profile(profile: &Profile, path: &Path) -> Result<()> {
    machine::write(path, &profile.machine_config())
}
