//! Profile and automation rule schema definitions

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::machine::{MachineConfig, NetworkingMode};
use crate::utils::system::now_utc;

/// A named bundle of machine-wide resource and networking settings
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Profile {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    /// e.g. "4GB", "512MB"; empty means unmanaged
    #[serde(default)]
    pub memory: String,
    /// 0 means unmanaged
    #[serde(default)]
    pub processors: u32,
    /// "0" disables swap entirely; empty means unmanaged
    #[serde(default)]
    pub swap: String,
    #[serde(default = "default_true")]
    pub localhost_forwarding: bool,
    /// Custom kernel path; empty means none
    #[serde(default)]
    pub kernel_path: String,
    #[serde(default)]
    pub networking_mode: NetworkingMode,
    #[serde(default = "default_true")]
    pub gui_applications: bool,
    #[serde(default)]
    pub debug_console: bool,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            name: "New Profile".into(),
            memory: "4GB".into(),
            processors: 2,
            swap: "0".into(),
            localhost_forwarding: true,
            kernel_path: String::new(),
            networking_mode: NetworkingMode::Nat,
            gui_applications: true,
            debug_console: false,
        }
    }
}

impl Profile {
    /// Project the profile onto the machine config it would write.
    ///
    /// Presence rules: memory/swap/kernel are managed only when non-blank,
    /// processors only when above zero, the flags always. Reconciliation
    /// compares against exactly this projection, so the matcher and the
    /// serializer cannot drift apart.
    pub fn machine_config(&self) -> MachineConfig {
        MachineConfig {
            memory: managed(&self.memory),
            processors: (self.processors > 0).then_some(self.processors),
            swap: managed(&self.swap),
            localhost_forwarding: Some(self.localhost_forwarding),
            kernel: managed(&self.kernel_path),
            networking_mode: (!self.networking_mode.is_blank())
                .then(|| self.networking_mode.clone()),
            gui_applications: Some(self.gui_applications),
            debug_console: Some(self.debug_console),
        }
    }
}

fn managed(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn default_true() -> bool {
    true
}

/// What causes a rule to fire. Each kind interprets its own value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Trigger {
    /// "HH:mm" wall clock; evaluation is an explicit placeholder and
    /// always reports false
    Time(String),
    /// Image name of a running process; a trailing `.exe` is ignored
    Process(String),
    /// "OnBattery" or "PluggedIn"
    PowerState(String),
    /// Wireless network identity (SSID)
    Network(String),
}

/// Applies a target profile whenever its trigger observes true
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AutomationRule {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub trigger: Trigger,
    /// May dangle after a profile is deleted externally; a dangling target
    /// makes the rule a no-op, never an error
    pub target_profile: Uuid,
}

/// Settings file metadata
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Meta {
    pub version: u32,
    pub generated: String,
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            version: 1,
            generated: now_utc(),
        }
    }
}

/// The persisted application state (profiles, rules, selection markers)
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub rules: Vec<AutomationRule>,
    #[serde(default)]
    pub current_profile_id: Option<Uuid>,
    #[serde(default)]
    pub default_profile_id: Option<Uuid>,
}

impl Settings {
    /// First-run bootstrap: three illustrative resource profiles.
    pub fn seeded() -> Self {
        Self {
            profiles: vec![
                Profile {
                    name: "Eco Mode".into(),
                    memory: "4GB".into(),
                    processors: 2,
                    swap: "0".into(),
                    ..Default::default()
                },
                Profile {
                    name: "Balanced".into(),
                    memory: "8GB".into(),
                    processors: 4,
                    swap: "2GB".into(),
                    ..Default::default()
                },
                Profile {
                    name: "Unleashed".into(),
                    memory: "32GB".into(),
                    processors: 16,
                    swap: "8GB".into(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_of_full_profile() {
        let profile = Profile {
            name: "Dev".into(),
            memory: "4GB".into(),
            processors: 2,
            swap: "0".into(),
            localhost_forwarding: true,
            networking_mode: NetworkingMode::Nat,
            gui_applications: true,
            debug_console: false,
            ..Default::default()
        };
        let text = profile.machine_config().render();
        assert!(text.contains("memory=4GB\n"));
        assert!(text.contains("processors=2\n"));
        assert!(text.contains("swap=0\n"));
        assert!(text.contains("localhostForwarding=true\n"));
        assert!(text.contains("networkingMode=NAT\n"));
        assert!(text.contains("guiApplications=true\n"));
        assert!(text.contains("debugConsole=false\n"));
        assert!(!text.contains("kernel="));
    }

    #[test]
    fn test_projection_unmanaged_fields_are_absent() {
        let profile = Profile {
            memory: String::new(),
            processors: 0,
            swap: String::new(),
            ..Default::default()
        };
        let cfg = profile.machine_config();
        assert_eq!(cfg.memory, None);
        assert_eq!(cfg.processors, None);
        assert_eq!(cfg.swap, None);
        // The flags are always managed.
        assert_eq!(cfg.localhost_forwarding, Some(true));
        assert_eq!(cfg.gui_applications, Some(true));
        assert_eq!(cfg.debug_console, Some(false));
    }

    #[test]
    fn test_trigger_serde_shape() {
        let rule = AutomationRule {
            id: Uuid::nil(),
            name: "battery saver".into(),
            enabled: true,
            trigger: Trigger::PowerState("OnBattery".into()),
            target_profile: Uuid::nil(),
        };
        let json = serde_json::to_string(&rule).unwrap();
        assert!(json.contains("\"type\":\"power_state\""));
        assert!(json.contains("\"value\":\"OnBattery\""));
        let back: AutomationRule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rule);
    }

    #[test]
    fn test_seeded_settings() {
        let settings = Settings::seeded();
        let names: Vec<&str> = settings.profiles.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Eco Mode", "Balanced", "Unleashed"]);
        assert!(settings.rules.is_empty());
    }
}
