//! Machine-wide configuration (`~/.wslconfig`, `[wsl2]` section).
//!
//! Every field is independently optional: absence means "not managed by
//! this tool, leave untouched", presence is written verbatim. Applying a
//! profile overwrites the whole file, so hand-edited keys outside the
//! managed set do not survive an apply.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use super::{entries, parse_flag};

/// Networking mode of the WSL2 VM. Unrecognized free text is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NetworkingMode {
    Nat,
    Mirrored,
    Bridged,
    Other(String),
}

impl NetworkingMode {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "nat" => Self::Nat,
            "mirrored" => Self::Mirrored,
            "bridged" => Self::Bridged,
            _ => Self::Other(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Nat => "NAT",
            Self::Mirrored => "Mirrored",
            Self::Bridged => "Bridged",
            Self::Other(s) => s,
        }
    }

    /// Blank free text counts as "no mode configured".
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Other(s) if s.trim().is_empty())
    }
}

impl Default for NetworkingMode {
    fn default() -> Self {
        Self::Nat
    }
}

impl From<String> for NetworkingMode {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<NetworkingMode> for String {
    fn from(mode: NetworkingMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for NetworkingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The subset of `[wsl2]` keys managed by wslm
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MachineConfig {
    pub memory: Option<String>,
    pub processors: Option<u32>,
    pub swap: Option<String>,
    pub localhost_forwarding: Option<bool>,
    pub kernel: Option<String>,
    pub networking_mode: Option<NetworkingMode>,
    pub gui_applications: Option<bool>,
    pub debug_console: Option<bool>,
}

impl MachineConfig {
    /// Parse the `.wslconfig` dialect. Never fails: unknown content is
    /// ignored and unparseable values stay unspecified.
    pub fn parse(text: &str) -> Self {
        let mut cfg = Self::default();
        for (section, key, value) in entries(text) {
            if section != "wsl2" {
                continue;
            }
            match key.as_str() {
                "memory" => cfg.memory = non_blank(value),
                "processors" => cfg.processors = value.trim().parse().ok(),
                "swap" => cfg.swap = non_blank(value),
                "localhostforwarding" => cfg.localhost_forwarding = parse_flag(&value),
                "kernel" => cfg.kernel = non_blank(value),
                "networkingmode" => {
                    let mode = NetworkingMode::parse(&value);
                    cfg.networking_mode = (!mode.is_blank()).then_some(mode);
                }
                "guiapplications" => cfg.gui_applications = parse_flag(&value),
                "debugconsole" => cfg.debug_console = parse_flag(&value),
                _ => {}
            }
        }
        cfg
    }

    /// Serialize to the `.wslconfig` dialect. Only present fields are
    /// emitted; the section header itself is omitted when nothing is set.
    pub fn render(&self) -> String {
        if *self == Self::default() {
            return String::new();
        }
        let mut out = String::from("[wsl2]\n");
        if let Some(memory) = &self.memory {
            out.push_str(&format!("memory={}\n", memory));
        }
        if let Some(processors) = self.processors {
            out.push_str(&format!("processors={}\n", processors));
        }
        if let Some(swap) = &self.swap {
            out.push_str(&format!("swap={}\n", swap));
        }
        if let Some(forwarding) = self.localhost_forwarding {
            out.push_str(&format!("localhostForwarding={}\n", forwarding));
        }
        if let Some(kernel) = &self.kernel {
            out.push_str(&format!("kernel={}\n", kernel));
        }
        if let Some(mode) = &self.networking_mode {
            out.push_str(&format!("networkingMode={}\n", mode));
        }
        if let Some(gui) = self.gui_applications {
            out.push_str(&format!("guiApplications={}\n", gui));
        }
        if let Some(debug) = self.debug_console {
            out.push_str(&format!("debugConsole={}\n", debug));
        }
        out
    }
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Read the live machine config; a missing file is an empty config.
pub fn read(path: &Path) -> Result<MachineConfig> {
    if !path.exists() {
        return Ok(MachineConfig::default());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(MachineConfig::parse(&text))
}

/// Overwrite the machine config file wholesale.
pub fn write(path: &Path, cfg: &MachineConfig) -> Result<()> {
    fs::write(path, cfg.render())
        .with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MachineConfig {
        MachineConfig {
            memory: Some("8GB".into()),
            processors: Some(4),
            swap: Some("2GB".into()),
            localhost_forwarding: Some(true),
            kernel: Some("C:\\kernels\\bzImage".into()),
            networking_mode: Some(NetworkingMode::Mirrored),
            gui_applications: Some(true),
            debug_console: Some(false),
        }
    }

    #[test]
    fn test_round_trip() {
        let cfg = sample();
        assert_eq!(MachineConfig::parse(&cfg.render()), cfg);
    }

    #[test]
    fn test_round_trip_partial() {
        let cfg = MachineConfig {
            memory: Some("4GB".into()),
            processors: Some(0),
            ..Default::default()
        };
        assert_eq!(MachineConfig::parse(&cfg.render()), cfg);
    }

    #[test]
    fn test_render_empty_config_is_empty() {
        assert_eq!(MachineConfig::default().render(), "");
        assert_eq!(MachineConfig::parse(""), MachineConfig::default());
    }

    #[test]
    fn test_parse_ignores_unknown_keys_and_comments() {
        let text = "# managed by hand\n[wsl2]\nmemory=4GB\nvmIdleTimeout=60000\n\n[experimental]\nsparseVhd=true\n";
        let cfg = MachineConfig::parse(text);
        assert_eq!(cfg.memory.as_deref(), Some("4GB"));
        assert_eq!(cfg.processors, None);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let cfg = MachineConfig::parse("[WSL2]\nMemory=4GB\nLocalhostForwarding=True\n");
        assert_eq!(cfg.memory.as_deref(), Some("4GB"));
        assert_eq!(cfg.localhost_forwarding, Some(true));
    }

    #[test]
    fn test_unparseable_values_are_unspecified() {
        let cfg = MachineConfig::parse("[wsl2]\nprocessors=lots\nguiApplications=enabled\nmemory=\n");
        assert_eq!(cfg.processors, None);
        assert_eq!(cfg.gui_applications, None);
        assert_eq!(cfg.memory, None);
    }

    #[test]
    fn test_explicit_zero_processors_is_present() {
        let cfg = MachineConfig::parse("[wsl2]\nprocessors=0\n");
        assert_eq!(cfg.processors, Some(0));
    }

    #[test]
    fn test_networking_mode_tokens() {
        assert_eq!(NetworkingMode::parse("nat"), NetworkingMode::Nat);
        assert_eq!(NetworkingMode::parse("Mirrored"), NetworkingMode::Mirrored);
        assert_eq!(
            NetworkingMode::parse("virtio-proxy"),
            NetworkingMode::Other("virtio-proxy".into())
        );
        assert_eq!(NetworkingMode::Bridged.as_str(), "Bridged");
    }
}
