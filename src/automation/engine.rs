//! Rule-driven profile switching
//!
//! A periodic tick evaluates enabled rules in stored order and applies at
//! most one profile transition. The id of the last auto-applied profile is
//! held on the engine instance: while a rule's condition stays true its
//! profile is never reapplied, and no lower-priority rule can take over.
//! When every condition is false the last state simply persists; there is
//! no revert-to-default.

use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::profile::apply_profile;
use crate::profile::schema::{Profile, Trigger};
use crate::profile::store::ProfileStore;

/// Interval between automation evaluations
pub const TICK_INTERVAL: Duration = Duration::from_secs(10);

/// Observed system state the triggers evaluate against. The system
/// implementation lives in [`super::signals`]; tests provide stubs.
pub trait SignalSource {
    /// Whether any running process has this image name (no `.exe`)
    fn process_running(&self, name: &str) -> Result<bool>;

    /// Identity of the currently associated wireless network, if any
    fn wireless_network(&self) -> Result<Option<String>>;

    /// Whether the machine is running on battery
    fn on_battery(&self) -> Result<bool>;
}

pub struct AutomationEngine<'a, S> {
    store: &'a ProfileStore,
    signals: S,
    config_path: PathBuf,
    last_applied: Option<Uuid>,
}

impl<'a, S: SignalSource> AutomationEngine<'a, S> {
    pub fn new(store: &'a ProfileStore, signals: S, config_path: PathBuf) -> Self {
        Self {
            store,
            signals,
            config_path,
            last_applied: None,
        }
    }

    /// Id of the profile this engine last applied, if any
    pub fn last_applied(&self) -> Option<Uuid> {
        self.last_applied
    }

    /// Evaluate one tick. Returns the profile that was applied, if any.
    /// Signal-source failures make the affected rule false; only a failed
    /// config write is an error.
    pub fn tick(&mut self) -> Result<Option<Profile>> {
        for rule in self.store.list_rules().into_iter().filter(|r| r.enabled) {
            if !self.evaluate(&rule.trigger) {
                continue;
            }
            // The first matching rule ends the tick either way: holding an
            // already-applied target, or applying a new one.
            if self.last_applied != Some(rule.target_profile) {
                if let Some(profile) = self.store.get_profile(rule.target_profile) {
                    apply_profile(&profile, &self.config_path)?;
                    self.last_applied = Some(profile.id);
                    info!(rule = %rule.name, profile = %profile.name, "automation applied profile");
                    return Ok(Some(profile));
                }
                debug!(rule = %rule.name, "rule target no longer exists; nothing applied");
            }
            return Ok(None);
        }
        Ok(None)
    }

    fn evaluate(&self, trigger: &Trigger) -> bool {
        match trigger {
            // Placeholder pending a product decision on schedules.
            Trigger::Time(_) => false,
            Trigger::Process(value) => {
                let name = value.trim();
                if name.is_empty() {
                    return false;
                }
                let name = strip_exe_suffix(name);
                self.signals.process_running(name).unwrap_or(false)
            }
            Trigger::Network(value) => match self.signals.wireless_network() {
                Ok(Some(identity)) => identity.eq_ignore_ascii_case(value.trim()),
                _ => false,
            },
            Trigger::PowerState(value) => {
                let Ok(on_battery) = self.signals.on_battery() else {
                    return false;
                };
                if value.eq_ignore_ascii_case("OnBattery") {
                    on_battery
                } else if value.eq_ignore_ascii_case("PluggedIn") {
                    !on_battery
                } else {
                    false
                }
            }
        }
    }
}

fn strip_exe_suffix(name: &str) -> &str {
    if name.len() >= 4 && name.to_ascii_lowercase().ends_with(".exe") {
        &name[..name.len() - 4]
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::machine::MachineConfig;
    use crate::profile::schema::AutomationRule;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Default)]
    struct StubSignals {
        processes: Vec<String>,
        network: Option<String>,
        on_battery: bool,
        processes_fail: bool,
    }

    impl SignalSource for StubSignals {
        fn process_running(&self, name: &str) -> Result<bool> {
            if self.processes_fail {
                anyhow::bail!("process list unavailable");
            }
            Ok(self
                .processes
                .iter()
                .any(|p| p.eq_ignore_ascii_case(name)))
        }

        fn wireless_network(&self) -> Result<Option<String>> {
            Ok(self.network.clone())
        }

        fn on_battery(&self) -> Result<bool> {
            Ok(self.on_battery)
        }
    }

    struct Fixture {
        _dir: TempDir,
        store: ProfileStore,
        config_path: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let store = ProfileStore::open(dir.path().join("config.json")).unwrap();
            let config_path = dir.path().join("wslconfig");
            Self {
                _dir: dir,
                store,
                config_path,
            }
        }

        fn rule(&self, name: &str, trigger: Trigger, target: Uuid) {
            self.store
                .add_rule(AutomationRule {
                    id: Uuid::new_v4(),
                    name: name.into(),
                    enabled: true,
                    trigger,
                    target_profile: target,
                })
                .unwrap();
        }

        fn profile_ids(&self) -> Vec<Uuid> {
            self.store.list_profiles().iter().map(|p| p.id).collect()
        }
    }

    #[test]
    fn test_first_true_rule_wins_and_holds() {
        let fx = Fixture::new();
        let ids = fx.profile_ids();
        fx.rule("game running", Trigger::Process("game.exe".into()), ids[2]);
        fx.rule("on battery", Trigger::PowerState("OnBattery".into()), ids[0]);

        let signals = StubSignals {
            processes: vec!["game".into()],
            on_battery: true,
            ..Default::default()
        };
        let mut engine = AutomationEngine::new(&fx.store, signals, fx.config_path.clone());

        // Both rules are true; only the first applies.
        let applied = engine.tick().unwrap().unwrap();
        assert_eq!(applied.id, ids[2]);
        assert_eq!(engine.last_applied(), Some(ids[2]));

        // Same conditions on the next tick: nothing is reapplied.
        fs::write(&fx.config_path, "sentinel").unwrap();
        assert!(engine.tick().unwrap().is_none());
        assert_eq!(fs::read_to_string(&fx.config_path).unwrap(), "sentinel");
        assert_eq!(engine.last_applied(), Some(ids[2]));
    }

    #[test]
    fn test_apply_writes_profile_projection() {
        let fx = Fixture::new();
        let ids = fx.profile_ids();
        fx.rule("docked", Trigger::Network("HomeLab".into()), ids[1]);

        let signals = StubSignals {
            network: Some("homelab".into()), // case-insensitive identity
            ..Default::default()
        };
        let mut engine = AutomationEngine::new(&fx.store, signals, fx.config_path.clone());
        let applied = engine.tick().unwrap().unwrap();

        let written = fs::read_to_string(&fx.config_path).unwrap();
        assert_eq!(MachineConfig::parse(&written), applied.machine_config());
    }

    #[test]
    fn test_state_persists_when_condition_turns_false() {
        let fx = Fixture::new();
        let ids = fx.profile_ids();
        fx.rule("compiling", Trigger::Process("cargo".into()), ids[0]);

        let mut engine = AutomationEngine::new(
            &fx.store,
            StubSignals {
                processes: vec!["cargo".into()],
                ..Default::default()
            },
            fx.config_path.clone(),
        );
        assert!(engine.tick().unwrap().is_some());

        // Condition gone: no revert, held id unchanged.
        engine.signals = StubSignals::default();
        assert!(engine.tick().unwrap().is_none());
        assert_eq!(engine.last_applied(), Some(ids[0]));
    }

    #[test]
    fn test_dangling_target_ends_tick_without_apply() {
        let fx = Fixture::new();
        let ids = fx.profile_ids();
        fx.rule("orphaned", Trigger::Process("cargo".into()), Uuid::new_v4());
        fx.rule("fallback", Trigger::Process("cargo".into()), ids[0]);

        let mut engine = AutomationEngine::new(
            &fx.store,
            StubSignals {
                processes: vec!["cargo".into()],
                ..Default::default()
            },
            fx.config_path.clone(),
        );
        assert!(engine.tick().unwrap().is_none());
        assert!(!fx.config_path.exists());
        assert_eq!(engine.last_applied(), None);
    }

    #[test]
    fn test_signal_error_only_falsifies_that_rule() {
        let fx = Fixture::new();
        let ids = fx.profile_ids();
        fx.rule("flaky process", Trigger::Process("game".into()), ids[0]);
        fx.rule("plugged in", Trigger::PowerState("PluggedIn".into()), ids[1]);

        let mut engine = AutomationEngine::new(
            &fx.store,
            StubSignals {
                processes_fail: true,
                on_battery: false,
                ..Default::default()
            },
            fx.config_path.clone(),
        );
        let applied = engine.tick().unwrap().unwrap();
        assert_eq!(applied.id, ids[1]);
    }

    #[test]
    fn test_disabled_rules_are_skipped() {
        let fx = Fixture::new();
        let ids = fx.profile_ids();
        fx.store
            .add_rule(AutomationRule {
                id: Uuid::new_v4(),
                name: "disabled".into(),
                enabled: false,
                trigger: Trigger::Process("cargo".into()),
                target_profile: ids[0],
            })
            .unwrap();

        let mut engine = AutomationEngine::new(
            &fx.store,
            StubSignals {
                processes: vec!["cargo".into()],
                ..Default::default()
            },
            fx.config_path.clone(),
        );
        assert!(engine.tick().unwrap().is_none());
    }

    #[test]
    fn test_time_trigger_is_always_false() {
        let fx = Fixture::new();
        let ids = fx.profile_ids();
        fx.rule("nightly", Trigger::Time("02:00".into()), ids[0]);

        let mut engine =
            AutomationEngine::new(&fx.store, StubSignals::default(), fx.config_path.clone());
        assert!(engine.tick().unwrap().is_none());
    }

    #[test]
    fn test_exe_suffix_is_ignored_on_trigger_values() {
        assert_eq!(strip_exe_suffix("game.exe"), "game");
        assert_eq!(strip_exe_suffix("game.EXE"), "game");
        assert_eq!(strip_exe_suffix("game"), "game");
        assert_eq!(strip_exe_suffix(".exe"), "");
    }

    #[test]
    fn test_power_state_values() {
        let fx = Fixture::new();
        let ids = fx.profile_ids();
        fx.rule("odd value", Trigger::PowerState("Hibernating".into()), ids[0]);
        fx.rule("battery", Trigger::PowerState("onbattery".into()), ids[1]);

        let mut engine = AutomationEngine::new(
            &fx.store,
            StubSignals {
                on_battery: true,
                ..Default::default()
            },
            fx.config_path.clone(),
        );
        // Unrecognized power-state value never fires; matching is
        // case-insensitive.
        let applied = engine.tick().unwrap().unwrap();
        assert_eq!(applied.id, ids[1]);
    }
}
