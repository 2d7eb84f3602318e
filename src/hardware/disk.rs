//! Physical disk enumeration and bare passthrough
//!
//! Disks are listed through PowerShell's `Get-PhysicalDisk` serialized to
//! JSON; a single disk comes back as a bare object rather than an array,
//! and DeviceId/Size arrive as either numbers or strings depending on the
//! host. Passthrough itself goes through `wsl --mount --bare`.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::lifecycle::runner::{Runner, ToolRunner};

const LIST_TIMEOUT: Duration = Duration::from_secs(30);
const LSBLK_TIMEOUT: Duration = Duration::from_secs(10);

const POWERSHELL_LIST: &str =
    "Get-PhysicalDisk | Select-Object DeviceId, FriendlyName, Size, SerialNumber | ConvertTo-Json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalDisk {
    /// `\\.\PHYSICALDRIVEn` device path understood by `wsl --mount`
    pub device_id: String,
    pub model: String,
    pub size: String,
    pub serial: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DiskRecord {
    device_id: RawValue,
    #[serde(default)]
    friendly_name: Option<String>,
    #[serde(default)]
    size: RawValue,
    #[serde(default)]
    serial_number: Option<String>,
}

/// PowerShell emits numbers or strings for the same column depending on
/// the provider.
#[derive(Deserialize, Default)]
#[serde(untagged)]
enum RawValue {
    Num(u64),
    Text(String),
    #[default]
    Missing,
}

impl RawValue {
    fn as_string(&self) -> String {
        match self {
            Self::Num(n) => n.to_string(),
            Self::Text(s) => s.clone(),
            Self::Missing => String::new(),
        }
    }
}

/// Parse the `Get-PhysicalDisk | ConvertTo-Json` payload
pub fn parse_disks(json: &str) -> Result<Vec<PhysicalDisk>> {
    let trimmed = json.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let records: Vec<DiskRecord> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).context("unexpected disk listing payload")?
    } else {
        vec![serde_json::from_str(trimmed).context("unexpected disk listing payload")?]
    };
    Ok(records
        .into_iter()
        .map(|r| PhysicalDisk {
            device_id: format!("\\\\.\\PHYSICALDRIVE{}", r.device_id.as_string()),
            model: r.friendly_name.unwrap_or_default(),
            size: format_bytes(&r.size.as_string()),
            serial: r.serial_number.unwrap_or_default(),
        })
        .collect())
}

/// Humanize a byte count; anything unparseable passes through untouched
pub fn format_bytes(size: &str) -> String {
    let Ok(bytes) = size.trim().parse::<u64>() else {
        return size.to_string();
    };
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut len = bytes as f64;
    let mut order = 0;
    while len >= 1024.0 && order < UNITS.len() - 1 {
        order += 1;
        len /= 1024.0;
    }
    let rounded = (len * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{} {}", rounded as u64, UNITS[order])
    } else {
        format!("{} {}", rounded, UNITS[order])
    }
}

/// Disk enumeration and bare passthrough into the WSL VM
pub struct DiskBridge<R: Runner> {
    powershell: R,
    wsl: R,
}

impl DiskBridge<ToolRunner> {
    pub fn new() -> Result<Self> {
        Ok(Self {
            powershell: ToolRunner::new("powershell"),
            wsl: ToolRunner::wsl()?,
        })
    }
}

impl<R: Runner> DiskBridge<R> {
    pub fn with_runners(powershell: R, wsl: R) -> Self {
        Self { powershell, wsl }
    }

    /// List the host's physical disks
    pub fn list_physical(&self) -> Result<Vec<PhysicalDisk>> {
        let out = self.powershell.run(
            &["-NoProfile", "-Command", POWERSHELL_LIST],
            Some(LIST_TIMEOUT),
        )?;
        if !out.success() {
            bail!("disk listing failed with exit code {}", out.code);
        }
        parse_disks(&out.stdout)
    }

    /// Subset of the host disks currently visible inside the VM, matched
    /// by serial number. Degrades to an empty list when the VM is down.
    pub fn list_mounted(&self) -> Vec<PhysicalDisk> {
        let Ok(all) = self.list_physical() else {
            return Vec::new();
        };
        if all.is_empty() {
            return Vec::new();
        }
        let Ok(out) = self
            .wsl
            .run(&["-e", "lsblk", "-d", "-n", "-o", "SERIAL"], Some(LSBLK_TIMEOUT))
        else {
            return Vec::new();
        };
        if !out.success() {
            return Vec::new();
        }
        let serials: Vec<String> = out
            .stdout
            .lines()
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        all.into_iter()
            .filter(|d| serials.contains(&d.serial.to_ascii_lowercase()))
            .collect()
    }

    /// Attach a disk to the VM without mounting a filesystem
    pub fn mount(&self, device_id: &str) -> Result<()> {
        let out = self.wsl.run(&["--mount", device_id, "--bare"], None)?;
        if !out.success() {
            bail!("failed to mount disk {} (exit code {})", device_id, out.code);
        }
        Ok(())
    }

    pub fn unmount(&self, device_id: &str) -> Result<()> {
        let out = self.wsl.run(&["--unmount", device_id], None)?;
        if !out.success() {
            bail!("failed to unmount disk {} (exit code {})", device_id, out.code);
        }
        Ok(())
    }
}
