//! USB passthrough via the usbipd host tool
//!
//! `usbipd list` has no machine-readable mode; each device line is
//! classified by the marker substrings "Not shared", "Shared" and
//! "Attached", with the free-text description sitting between the
//! VID:PID column and the marker.

use anyhow::{bail, Result};
use std::fmt;
use std::time::Duration;

use crate::lifecycle::runner::{Runner, ToolRunner};

const PROBE_TIMEOUT: Duration = Duration::from_secs(1);
const LIST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsbState {
    NotShared,
    Shared,
    Attached,
    Unknown,
}

impl fmt::Display for UsbState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotShared => "Not shared",
            Self::Shared => "Shared",
            Self::Attached => "Attached",
            Self::Unknown => "Unknown",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbDevice {
    pub bus_id: String,
    pub vid_pid: String,
    pub description: String,
    pub state: UsbState,
}

impl UsbDevice {
    pub fn is_attached(&self) -> bool {
        self.state == UsbState::Attached
    }
}

/// Parse `usbipd list` output. Lines before the BUSID header and lines
/// that do not fit the column shape are skipped.
pub fn parse_usb_list(text: &str) -> Vec<UsbDevice> {
    let mut devices = Vec::new();
    let mut header_found = false;

    for line in text.lines() {
        if line.starts_with("BUSID") {
            header_found = true;
            continue;
        }
        if !header_found {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            continue;
        }
        let bus_id = parts[0];
        let vid_pid = parts[1];

        // "Shared" is a substring of "Not shared"; test the longer marker
        // first.
        let (state, marker) = if line.contains("Not shared") {
            (UsbState::NotShared, "Not shared")
        } else if line.contains("Shared") {
            (UsbState::Shared, "Shared")
        } else if line.contains("Attached") {
            (UsbState::Attached, "Attached")
        } else {
            (UsbState::Unknown, "")
        };

        let description = if marker.is_empty() {
            parts[2..].join(" ")
        } else {
            let start = line.find(vid_pid).map(|i| i + vid_pid.len()).unwrap_or(0);
            let end = line.find(marker).unwrap_or(line.len());
            line.get(start..end).unwrap_or("").trim().to_string()
        };

        devices.push(UsbDevice {
            bus_id: bus_id.to_string(),
            vid_pid: vid_pid.to_string(),
            description,
            state,
        });
    }
    devices
}

/// Thin wrapper over the usbipd subcommands
pub struct UsbBridge<R: Runner> {
    runner: R,
}

impl UsbBridge<ToolRunner> {
    pub fn new() -> Self {
        Self {
            runner: ToolRunner::new("usbipd"),
        }
    }
}

impl Default for UsbBridge<ToolRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Runner> UsbBridge<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    /// Whether usbipd is installed at all
    pub fn is_installed(&self) -> bool {
        match self.runner.run(&["--version"], Some(PROBE_TIMEOUT)) {
            Ok(out) => out.success(),
            Err(_) => false,
        }
    }

    /// List host USB devices; an absent usbipd yields an empty list
    pub fn list(&self) -> Result<Vec<UsbDevice>> {
        if !self.is_installed() {
            return Ok(Vec::new());
        }
        let out = self.runner.run(&["list"], Some(LIST_TIMEOUT))?;
        if !out.success() {
            bail!("usbipd list failed with exit code {}", out.code);
        }
        Ok(parse_usb_list(&out.stdout))
    }

    /// Share the device on the host, then attach it to the distribution
    pub fn attach(&self, bus_id: &str, distro: &str) -> Result<()> {
        self.usbipd(&["bind", "--busid", bus_id, "--force"])?;
        self.usbipd(&[
            "attach",
            "--wsl",
            "--busid",
            bus_id,
            "--distribution",
            distro,
        ])
    }

    pub fn detach(&self, bus_id: &str) -> Result<()> {
        self.usbipd(&["detach", "--busid", bus_id])
    }

    fn usbipd(&self, args: &[&str]) -> Result<()> {
        let out = self.runner.run(args, None)?;
        if !out.success() {
            bail!("usbipd {} failed with exit code {}", args.join(" "), out.code);
        }
        Ok(())
    }
}
