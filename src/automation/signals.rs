//! Live system signals backing the automation triggers

use anyhow::Result;
use std::process::Command;

use super::engine::SignalSource;
use crate::utils::system::process_exists;

/// Signal source backed by the host OS tools
pub struct SystemSignals;

impl SignalSource for SystemSignals {
    fn process_running(&self, name: &str) -> Result<bool> {
        process_exists(name)
    }

    #[cfg(windows)]
    fn wireless_network(&self) -> Result<Option<String>> {
        let output = Command::new("netsh")
            .args(["wlan", "show", "interfaces"])
            .output()?;
        let text = String::from_utf8_lossy(&output.stdout);
        for line in text.lines() {
            let trimmed = line.trim();
            // The SSID row, not BSSID: "    SSID                : HomeLab"
            if trimmed.starts_with("SSID") && trimmed.contains(':') {
                if let Some((_, value)) = trimmed.split_once(':') {
                    let identity = value.trim();
                    if !identity.is_empty() {
                        return Ok(Some(identity.to_string()));
                    }
                }
            }
        }
        Ok(None)
    }

    #[cfg(not(windows))]
    fn wireless_network(&self) -> Result<Option<String>> {
        let output = Command::new("iwgetid").arg("-r").output()?;
        let identity = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(if identity.is_empty() {
            None
        } else {
            Some(identity)
        })
    }

    #[cfg(windows)]
    fn on_battery(&self) -> Result<bool> {
        let output = Command::new("powershell")
            .args([
                "-NoProfile",
                "-Command",
                "(Get-CimInstance -ClassName Win32_Battery).BatteryStatus",
            ])
            .output()?;
        let text = String::from_utf8_lossy(&output.stdout);
        // BatteryStatus 1 means discharging; no battery row means a
        // desktop, which counts as plugged in.
        Ok(text
            .lines()
            .filter_map(|l| l.trim().parse::<u32>().ok())
            .any(|status| status == 1))
    }

    #[cfg(not(windows))]
    fn on_battery(&self) -> Result<bool> {
        // A mains supply reporting online=0 means the machine runs on
        // battery; no mains entry reads as plugged in.
        for entry in std::fs::read_dir("/sys/class/power_supply")? {
            let path = entry?.path();
            let kind = std::fs::read_to_string(path.join("type")).unwrap_or_default();
            if kind.trim() == "Mains" {
                let online = std::fs::read_to_string(path.join("online")).unwrap_or_default();
                return Ok(online.trim() == "0");
            }
        }
        Ok(false)
    }
}
