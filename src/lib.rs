//! wslm - WSL Manager Library
//!
//! Profiles, layered config codecs, trigger-based automation and the
//! distribution lifecycle for a local WSL installation, driven through
//! wsl.exe and friends as subprocesses.

pub mod automation;
pub mod cli;
pub mod config;
pub mod hardware;
pub mod lifecycle;
pub mod profile;
pub mod startup;
pub mod utils;

// Re-export commonly used types
pub use cli::commands::Cli;
pub use config::guest::GuestConfig;
pub use config::machine::MachineConfig;
pub use lifecycle::manager::{Distribution, DistroManager};
pub use profile::schema::Profile;
pub use profile::store::ProfileStore;

/// Library error type
pub type Result<T> = anyhow::Result<T>;
