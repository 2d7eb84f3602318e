//! CLI command definitions

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// wslm CLI (Rust)
#[derive(Parser, Debug)]
#[command(name = "wslm", about = "WSL distribution manager in Rust")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// List registered distributions
    List,

    /// Show whether WSL is running and which profile is active
    Status,

    /// Launch an interactive shell in a distribution
    Start { name: String },

    /// Keep the default distribution alive without a visible shell
    StartBackground,

    /// Stop one distribution
    Terminate { name: String },

    /// Remove a distribution and delete its data
    Unregister {
        name: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Make a distribution the default
    SetDefault { name: String },

    /// Stop the whole WSL VM
    Shutdown,

    /// Ask the default distribution to drop its page caches
    ReclaimMemory,

    /// Export a distribution into a tar archive (can run for a long time)
    Export { name: String, dest: PathBuf },

    /// Import a tar archive as a new distribution
    Import {
        name: String,
        location: PathBuf,
        archive: PathBuf,
    },

    /// Duplicate a distribution under a new name
    Clone {
        source: String,
        name: String,
        location: PathBuf,
    },

    /// Relocate a distribution to a new install directory
    Move { name: String, location: PathBuf },

    /// Show a distribution's /etc/wsl.conf as understood by wslm
    ShowConf { name: String },

    /// List stored profiles, marking the one matching the live config
    Profiles,

    /// Write a profile over ~/.wslconfig (takes effect on next VM start)
    Apply { profile: String },

    /// List automation rules
    Rules,

    /// Run the automation evaluator in the foreground
    Watch {
        /// Seconds between rule evaluations
        #[arg(long, default_value_t = 10)]
        interval: u64,
    },

    /// List host USB devices known to usbipd
    UsbList,

    /// Share a USB device and attach it to a distribution
    UsbAttach { bus_id: String, distro: String },

    /// Detach a USB device from WSL
    UsbDetach { bus_id: String },

    /// List the host's physical disks, marking those visible in WSL
    DiskList,

    /// Attach a physical disk to the VM without mounting a filesystem
    DiskMount { device_id: String },

    /// Detach a physical disk from the VM
    DiskUnmount { device_id: String },

    /// Mount a Windows folder into a distribution via drvfs
    MountFolder {
        name: String,
        windows_path: String,
        linux_path: String,
    },

    /// Unmount a drvfs folder from a distribution
    UnmountFolder { name: String, linux_path: String },

    /// Query or toggle start-on-login
    Autostart {
        #[arg(value_parser = ["enable", "disable", "status"])]
        action: String,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Install Fish shell completions automatically
    InstallFish,

    /// Generate man page
    ManPage,
}
