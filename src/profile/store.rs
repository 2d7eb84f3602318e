//! Durable profile and rule storage

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::profile::schema::{AutomationRule, Profile, Settings};
use crate::utils::paths::settings_path;
use crate::utils::system::now_utc;

/// Mutex-guarded collection of profiles and automation rules, persisted
/// as pretty JSON. Every mutating call writes the file before returning;
/// a failed write surfaces as the call's error.
pub struct ProfileStore {
    path: PathBuf,
    settings: Mutex<Settings>,
}

impl ProfileStore {
    /// Open the store at the default per-user location
    pub fn open_default() -> Result<Self> {
        Self::open(settings_path()?)
    }

    /// Open the store backed by the given file, seeding defaults when no
    /// persisted state exists yet.
    pub fn open(path: PathBuf) -> Result<Self> {
        let settings = if path.exists() {
            match File::open(&path)
                .map_err(anyhow::Error::from)
                .and_then(|f| serde_json::from_reader(f).map_err(anyhow::Error::from))
            {
                Ok(settings) => settings,
                Err(e) => {
                    // The file stays untouched until the next explicit
                    // mutation overwrites it.
                    warn!("unreadable settings at {}: {e}; starting from defaults", path.display());
                    Settings::seeded()
                }
            }
        } else {
            info!("no settings at {}; seeding default profiles", path.display());
            Settings::seeded()
        };
        Ok(Self {
            path,
            settings: Mutex::new(settings),
        })
    }

    pub fn list_profiles(&self) -> Vec<Profile> {
        self.lock().profiles.clone()
    }

    pub fn get_profile(&self, id: Uuid) -> Option<Profile> {
        self.lock().profiles.iter().find(|p| p.id == id).cloned()
    }

    /// Look a profile up by display name, case-insensitively
    pub fn find_profile_by_name(&self, name: &str) -> Option<Profile> {
        self.lock()
            .profiles
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn add_profile(&self, profile: Profile) -> Result<()> {
        let mut settings = self.lock();
        settings.profiles.push(profile);
        self.save(&mut settings)
    }

    pub fn update_profile(&self, profile: Profile) -> Result<()> {
        let mut settings = self.lock();
        if let Some(slot) = settings.profiles.iter_mut().find(|p| p.id == profile.id) {
            *slot = profile;
            return self.save(&mut settings);
        }
        Ok(())
    }

    /// Remove a profile and every rule targeting it
    pub fn remove_profile(&self, id: Uuid) -> Result<()> {
        let mut settings = self.lock();
        settings.profiles.retain(|p| p.id != id);
        settings.rules.retain(|r| r.target_profile != id);
        self.save(&mut settings)
    }

    /// Move profile `a` to the position `b` currently occupies
    pub fn reorder_profiles(&self, a: Uuid, b: Uuid) -> Result<()> {
        let mut settings = self.lock();
        let old_index = settings.profiles.iter().position(|p| p.id == a);
        let new_index = settings.profiles.iter().position(|p| p.id == b);
        if let (Some(old_index), Some(new_index)) = (old_index, new_index) {
            let profile = settings.profiles.remove(old_index);
            let insert_index = new_index.min(settings.profiles.len());
            settings.profiles.insert(insert_index, profile);
            return self.save(&mut settings);
        }
        Ok(())
    }

    pub fn list_rules(&self) -> Vec<AutomationRule> {
        self.lock().rules.clone()
    }

    pub fn add_rule(&self, rule: AutomationRule) -> Result<()> {
        let mut settings = self.lock();
        settings.rules.push(rule);
        self.save(&mut settings)
    }

    pub fn update_rule(&self, rule: AutomationRule) -> Result<()> {
        let mut settings = self.lock();
        if let Some(slot) = settings.rules.iter_mut().find(|r| r.id == rule.id) {
            *slot = rule;
            return self.save(&mut settings);
        }
        Ok(())
    }

    pub fn remove_rule(&self, id: Uuid) -> Result<()> {
        let mut settings = self.lock();
        settings.rules.retain(|r| r.id != id);
        self.save(&mut settings)
    }

    pub fn current_profile_id(&self) -> Option<Uuid> {
        self.lock().current_profile_id
    }

    pub fn set_current_profile_id(&self, id: Option<Uuid>) -> Result<()> {
        let mut settings = self.lock();
        settings.current_profile_id = id;
        self.save(&mut settings)
    }

    pub fn default_profile_id(&self) -> Option<Uuid> {
        self.lock().default_profile_id
    }

    pub fn set_default_profile_id(&self, id: Option<Uuid>) -> Result<()> {
        let mut settings = self.lock();
        settings.default_profile_id = id;
        self.save(&mut settings)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Settings> {
        self.settings.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn save(&self, settings: &mut Settings) -> Result<()> {
        settings.meta.generated = now_utc();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file = File::create(&self.path)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        serde_json::to_writer_pretty(file, settings)
            .with_context(|| format!("failed to serialize {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::schema::Trigger;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ProfileStore {
        ProfileStore::open(dir.path().join("config.json")).unwrap()
    }

    #[test]
    fn test_first_run_seeds_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let names: Vec<String> = store.list_profiles().iter().map(|p| p.name.clone()).collect();
        assert_eq!(names, vec!["Eco Mode", "Balanced", "Unleashed"]);
    }

    #[test]
    fn test_seeding_is_not_reapplied() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        for profile in store.list_profiles() {
            store.remove_profile(profile.id).unwrap();
        }
        drop(store);

        let store = store_in(&dir);
        assert!(store.list_profiles().is_empty());
    }

    #[test]
    fn test_mutations_persist_across_reopen() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let profile = Profile {
            name: "Gaming".into(),
            memory: "16GB".into(),
            processors: 8,
            ..Default::default()
        };
        let id = profile.id;
        store.add_profile(profile).unwrap();
        drop(store);

        let store = store_in(&dir);
        let loaded = store.get_profile(id).unwrap();
        assert_eq!(loaded.name, "Gaming");
        assert_eq!(loaded.processors, 8);
    }

    #[test]
    fn test_remove_profile_cascades_rules() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let target = store.list_profiles()[0].id;
        let other = store.list_profiles()[1].id;
        store
            .add_rule(AutomationRule {
                id: Uuid::new_v4(),
                name: "on battery".into(),
                enabled: true,
                trigger: Trigger::PowerState("OnBattery".into()),
                target_profile: target,
            })
            .unwrap();
        store
            .add_rule(AutomationRule {
                id: Uuid::new_v4(),
                name: "at the office".into(),
                enabled: true,
                trigger: Trigger::Network("CorpNet".into()),
                target_profile: other,
            })
            .unwrap();

        store.remove_profile(target).unwrap();

        let rules = store.list_rules();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].target_profile, other);
    }

    #[test]
    fn test_reorder_moves_to_former_position() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let ids: Vec<Uuid> = store.list_profiles().iter().map(|p| p.id).collect();

        // Move "Unleashed" to the front.
        store.reorder_profiles(ids[2], ids[0]).unwrap();
        let names: Vec<String> = store.list_profiles().iter().map(|p| p.name.clone()).collect();
        assert_eq!(names, vec!["Unleashed", "Eco Mode", "Balanced"]);
    }

    #[test]
    fn test_update_rule_replaces_by_id() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let target = store.list_profiles()[0].id;
        let mut rule = AutomationRule {
            id: Uuid::new_v4(),
            name: "compile watch".into(),
            enabled: true,
            trigger: Trigger::Process("cargo.exe".into()),
            target_profile: target,
        };
        store.add_rule(rule.clone()).unwrap();

        rule.enabled = false;
        store.update_rule(rule.clone()).unwrap();
        assert_eq!(store.list_rules()[0].enabled, false);
    }

    #[test]
    fn test_selection_markers_persist() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let id = store.list_profiles()[1].id;
        store.set_current_profile_id(Some(id)).unwrap();
        store.set_default_profile_id(Some(id)).unwrap();
        drop(store);

        let store = store_in(&dir);
        assert_eq!(store.current_profile_id(), Some(id));
        assert_eq!(store.default_profile_id(), Some(id));
    }
}
