use anyhow::{anyhow, Result};
use clap::{CommandFactory, Parser};
use std::io::{self, Write};
use std::time::Duration;
use tracing::{info, warn, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;

use wslm::automation::{AutomationEngine, SystemSignals};
use wslm::cli::commands::{Cli, Cmd};
use wslm::cli::completions::{generate_man_page, install_fish_completions, print_completions};
use wslm::config::machine;
use wslm::hardware::{DiskBridge, UsbBridge};
use wslm::profile::reconcile::find_active_profile;
use wslm::profile::schema::Trigger;
use wslm::profile::{apply_profile, store::ProfileStore};
use wslm::utils::paths::machine_config_path;
use wslm::{startup, DistroManager};

fn main() -> Result<()> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "warn".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "info" => TraceLevel::INFO,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::List => {
            let distros = DistroManager::new()?.list()?;
            if distros.is_empty() {
                println!("No registered distributions.");
                return Ok(());
            }
            println!("  {:<24} {:<12} VERSION", "NAME", "STATE");
            for d in distros {
                let marker = if d.is_default { "*" } else { " " };
                println!("{} {:<24} {:<12} {}", marker, d.name, d.state, d.version);
            }
        }

        Cmd::Status => {
            let manager = DistroManager::new()?;
            println!(
                "WSL: {}",
                if manager.is_running() { "running" } else { "stopped" }
            );
            let store = ProfileStore::open_default()?;
            let live = machine::read(&machine_config_path()?)?;
            match find_active_profile(&live, &store.list_profiles()) {
                Some(profile) => println!("Active profile: {}", profile.name),
                None => println!("Active profile: none"),
            }
        }

        Cmd::Start { name } => {
            DistroManager::new()?.start(&name)?;
            println!("Launching '{}'", name);
        }

        Cmd::StartBackground => {
            DistroManager::new()?.start_background()?;
            println!("Started the default distribution in the background");
        }

        Cmd::Terminate { name } => {
            DistroManager::new()?.terminate(&name)?;
            println!("Terminated '{}'", name);
        }

        Cmd::Unregister { name, force } => {
            let manager = DistroManager::new()?;
            if !force {
                println!("About to unregister '{}'.", name);
                println!("This permanently deletes the distribution's filesystem.");
                print!("Are you sure? [y/N]: ");
                io::stdout().flush()?;

                let mut input = String::new();
                io::stdin().read_line(&mut input)?;

                if !matches!(input.trim().to_lowercase().as_str(), "y" | "yes") {
                    println!("Unregister cancelled.");
                    return Ok(());
                }
            }
            manager.unregister(&name)?;
            println!("Unregistered '{}'", name);
        }

        Cmd::SetDefault { name } => {
            DistroManager::new()?.set_default(&name)?;
            println!("'{}' is now the default distribution", name);
        }

        Cmd::Shutdown => {
            DistroManager::new()?.shutdown()?;
            println!("WSL shut down");
        }

        Cmd::ReclaimMemory => {
            DistroManager::new()?.reclaim_memory();
            println!("Asked the default distribution to drop its caches");
        }

        Cmd::Export { name, dest } => {
            DistroManager::new()?.export(&name, &dest)?;
            println!("Exported '{}' to {}", name, dest.display());
        }

        Cmd::Import {
            name,
            location,
            archive,
        } => {
            DistroManager::new()?.import(&name, &location, &archive)?;
            println!("Imported '{}' into {}", name, location.display());
        }

        Cmd::Clone {
            source,
            name,
            location,
        } => {
            DistroManager::new()?.clone_distro(&source, &name, &location)?;
            println!("Cloned '{}' as '{}' in {}", source, name, location.display());
        }

        Cmd::Move { name, location } => {
            DistroManager::new()?.move_distro(&name, &location)?;
            println!("Moved '{}' to {}", name, location.display());
        }

        Cmd::ShowConf { name } => {
            let conf = DistroManager::new()?.guest_config(&name);
            let text = conf.render();
            if text.is_empty() {
                println!("No managed settings in /etc/wsl.conf for '{}'", name);
            } else {
                print!("{}", text);
            }
        }

        Cmd::Profiles => {
            let store = ProfileStore::open_default()?;
            let profiles = store.list_profiles();
            let live = machine::read(&machine_config_path()?)?;
            let active = find_active_profile(&live, &profiles).map(|p| p.id);
            for p in &profiles {
                let marker = if active == Some(p.id) { "*" } else { " " };
                println!(
                    "{} {:<20} mem={:<8} cpus={:<4} swap={:<8} net={}",
                    marker,
                    p.name,
                    or_dash(&p.memory),
                    if p.processors > 0 {
                        p.processors.to_string()
                    } else {
                        "-".to_string()
                    },
                    or_dash(&p.swap),
                    p.networking_mode,
                );
            }
        }

        Cmd::Apply { profile } => {
            let store = ProfileStore::open_default()?;
            let profile = store
                .find_profile_by_name(&profile)
                .ok_or_else(|| anyhow!("no profile named '{}'", profile))?;
            let path = machine_config_path()?;
            apply_profile(&profile, &path)?;
            store.set_current_profile_id(Some(profile.id))?;
            println!("Applied profile '{}' to {}", profile.name, path.display());
            println!("Restart WSL (wslm shutdown) for the change to take effect.");
        }

        Cmd::Rules => {
            let store = ProfileStore::open_default()?;
            let rules = store.list_rules();
            if rules.is_empty() {
                println!("No automation rules.");
                return Ok(());
            }
            for rule in rules {
                let target = store
                    .get_profile(rule.target_profile)
                    .map(|p| p.name)
                    .unwrap_or_else(|| "<missing profile>".to_string());
                let (kind, value) = match &rule.trigger {
                    Trigger::Time(v) => ("time", v),
                    Trigger::Process(v) => ("process", v),
                    Trigger::PowerState(v) => ("power", v),
                    Trigger::Network(v) => ("network", v),
                };
                println!(
                    "{} {:<20} {}={:<24} -> {}",
                    if rule.enabled { "on " } else { "off" },
                    rule.name,
                    kind,
                    value,
                    target
                );
            }
        }

        Cmd::Watch { interval } => {
            let store = ProfileStore::open_default()?;
            let mut engine =
                AutomationEngine::new(&store, SystemSignals, machine_config_path()?);
            let interval = Duration::from_secs(interval.max(1));
            info!("evaluating automation rules every {}s", interval.as_secs());
            loop {
                match engine.tick() {
                    Ok(Some(profile)) => println!("Applied profile '{}'", profile.name),
                    Ok(None) => {}
                    Err(e) => warn!("automation tick failed: {e:#}"),
                }
                std::thread::sleep(interval);
            }
        }

        Cmd::UsbList => {
            let bridge = UsbBridge::new();
            if !bridge.is_installed() {
                println!("usbipd is not installed; see https://github.com/dorssel/usbipd-win");
                return Ok(());
            }
            for device in bridge.list()? {
                println!(
                    "{:<6} {:<10} {:<44} {}",
                    device.bus_id, device.vid_pid, device.description, device.state
                );
            }
        }

        Cmd::UsbAttach { bus_id, distro } => {
            UsbBridge::new().attach(&bus_id, &distro)?;
            println!("Attached {} to '{}'", bus_id, distro);
        }

        Cmd::UsbDetach { bus_id } => {
            UsbBridge::new().detach(&bus_id)?;
            println!("Detached {}", bus_id);
        }

        Cmd::DiskList => {
            let bridge = DiskBridge::new()?;
            let disks = bridge.list_physical()?;
            let mounted = bridge.list_mounted();
            for disk in disks {
                let marker = if mounted.iter().any(|m| m.device_id == disk.device_id) {
                    "*"
                } else {
                    " "
                };
                println!(
                    "{} {:<26} {:<10} {}",
                    marker, disk.device_id, disk.size, disk.model
                );
            }
        }

        Cmd::DiskMount { device_id } => {
            DiskBridge::new()?.mount(&device_id)?;
            println!("Mounted {} (bare)", device_id);
        }

        Cmd::DiskUnmount { device_id } => {
            DiskBridge::new()?.unmount(&device_id)?;
            println!("Unmounted {}", device_id);
        }

        Cmd::MountFolder {
            name,
            windows_path,
            linux_path,
        } => {
            DistroManager::new()?.mount_folder(&name, &windows_path, &linux_path)?;
            println!("Mounted {} at {} in '{}'", windows_path, linux_path, name);
        }

        Cmd::UnmountFolder { name, linux_path } => {
            DistroManager::new()?.unmount_folder(&name, &linux_path)?;
            println!("Unmounted {} in '{}'", linux_path, name);
        }

        Cmd::Autostart { action } => match action.as_str() {
            "enable" => {
                startup::set_enabled(true)?;
                println!("Start-on-login enabled");
            }
            "disable" => {
                startup::set_enabled(false)?;
                println!("Start-on-login disabled");
            }
            _ => {
                println!(
                    "Start-on-login: {}",
                    if startup::is_enabled() { "enabled" } else { "disabled" }
                );
            }
        },

        Cmd::Completions { shell } => {
            let mut cmd = Cli::command();
            print_completions(shell, &mut cmd);
        }

        Cmd::InstallFish => {
            install_fish_completions()?;
        }

        Cmd::ManPage => {
            generate_man_page()?;
        }
    }

    Ok(())
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}
