//! Per-distribution configuration (`/etc/wsl.conf`).
//!
//! Five independent optional sub-groups; a section is written only when at
//! least one of its fields is set. Sections come out in a fixed canonical
//! order with a blank line after each.

use super::{entries, parse_flag};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuestConfig {
    pub boot: BootSection,
    pub automount: AutomountSection,
    pub network: NetworkSection,
    pub interop: InteropSection,
    pub user: UserSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootSection {
    pub systemd: Option<bool>,
    pub command: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutomountSection {
    pub enabled: Option<bool>,
    pub mount_fstab: Option<bool>,
    pub root: Option<String>,
    pub options: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkSection {
    pub generate_hosts: Option<bool>,
    pub generate_resolv_conf: Option<bool>,
    pub hostname: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InteropSection {
    pub enabled: Option<bool>,
    pub append_windows_path: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserSection {
    pub default_user: Option<String>,
}

impl BootSection {
    fn is_empty(&self) -> bool {
        self.systemd.is_none() && self.command.is_none()
    }
}

impl AutomountSection {
    fn is_empty(&self) -> bool {
        self.enabled.is_none()
            && self.mount_fstab.is_none()
            && self.root.is_none()
            && self.options.is_none()
    }
}

impl NetworkSection {
    fn is_empty(&self) -> bool {
        self.generate_hosts.is_none()
            && self.generate_resolv_conf.is_none()
            && self.hostname.is_none()
    }
}

impl InteropSection {
    fn is_empty(&self) -> bool {
        self.enabled.is_none() && self.append_windows_path.is_none()
    }
}

impl GuestConfig {
    /// Parse the wsl.conf dialect. Never fails; anything the model does
    /// not cover is skipped.
    pub fn parse(text: &str) -> Self {
        let mut conf = Self::default();
        for (section, key, value) in entries(text) {
            match (section.as_str(), key.as_str()) {
                ("boot", "systemd") => conf.boot.systemd = parse_flag(&value),
                ("boot", "command") => conf.boot.command = Some(value),
                ("automount", "enabled") => conf.automount.enabled = parse_flag(&value),
                ("automount", "mountfstab") => conf.automount.mount_fstab = parse_flag(&value),
                ("automount", "root") => conf.automount.root = Some(value),
                ("automount", "options") => conf.automount.options = Some(value),
                ("network", "generatehosts") => conf.network.generate_hosts = parse_flag(&value),
                ("network", "generateresolvconf") => {
                    conf.network.generate_resolv_conf = parse_flag(&value)
                }
                ("network", "hostname") => conf.network.hostname = Some(value),
                ("interop", "enabled") => conf.interop.enabled = parse_flag(&value),
                ("interop", "appendwindowspath") => {
                    conf.interop.append_windows_path = parse_flag(&value)
                }
                ("user", "default") => conf.user.default_user = Some(value),
                _ => {}
            }
        }
        conf
    }

    /// Serialize to the wsl.conf dialect in canonical section order.
    pub fn render(&self) -> String {
        let mut out = String::new();

        if !self.boot.is_empty() {
            out.push_str("[boot]\n");
            if let Some(systemd) = self.boot.systemd {
                out.push_str(&format!("systemd={}\n", systemd));
            }
            if let Some(command) = &self.boot.command {
                out.push_str(&format!("command=\"{}\"\n", command));
            }
            out.push('\n');
        }

        if !self.automount.is_empty() {
            out.push_str("[automount]\n");
            if let Some(enabled) = self.automount.enabled {
                out.push_str(&format!("enabled={}\n", enabled));
            }
            if let Some(mount_fstab) = self.automount.mount_fstab {
                out.push_str(&format!("mountFsTab={}\n", mount_fstab));
            }
            if let Some(root) = &self.automount.root {
                out.push_str(&format!("root=\"{}\"\n", root));
            }
            if let Some(options) = &self.automount.options {
                out.push_str(&format!("options=\"{}\"\n", options));
            }
            out.push('\n');
        }

        if !self.network.is_empty() {
            out.push_str("[network]\n");
            if let Some(generate_hosts) = self.network.generate_hosts {
                out.push_str(&format!("generateHosts={}\n", generate_hosts));
            }
            if let Some(generate_resolv_conf) = self.network.generate_resolv_conf {
                out.push_str(&format!("generateResolvConf={}\n", generate_resolv_conf));
            }
            if let Some(hostname) = &self.network.hostname {
                out.push_str(&format!("hostname=\"{}\"\n", hostname));
            }
            out.push('\n');
        }

        if !self.interop.is_empty() {
            out.push_str("[interop]\n");
            if let Some(enabled) = self.interop.enabled {
                out.push_str(&format!("enabled={}\n", enabled));
            }
            if let Some(append) = self.interop.append_windows_path {
                out.push_str(&format!("appendWindowsPath={}\n", append));
            }
            out.push('\n');
        }

        if let Some(default_user) = &self.user.default_user {
            out.push_str("[user]\n");
            out.push_str(&format!("default={}\n", default_user));
            out.push('\n');
        }

        out
    }
}
