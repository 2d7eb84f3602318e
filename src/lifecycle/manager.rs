//! Distribution lifecycle management
//!
//! Every operation is a thin, validated pass-through to the WSL
//! command-line tool. Status and control calls run under a short timeout;
//! export and import wait as long as they need to.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::config::guest::GuestConfig;
use crate::lifecycle::runner::{Runner, ToolRunner};
use crate::utils::paths::temp_archive_path;
use crate::utils::system::process_exists;

/// Timeout for status and control calls
pub const CONTROL_TIMEOUT: Duration = Duration::from_secs(10);
/// Timeout for cheap read-only queries
const QUERY_TIMEOUT: Duration = Duration::from_secs(2);
/// Timeout for writing a guest config through remote exec
const CONF_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Host-side helper processes whose presence means the WSL VM is up
const HOST_VM_PROCESSES: [&str; 2] = ["vmmem", "vmmemWSL"];
/// Printed by `wsl --list --running` when nothing is up
const NO_RUNNING_SENTINEL: &str = "There are no running distributions";

/// One registered distribution as reported by `wsl --list --verbose`.
/// Never cached: re-queried before every decision that depends on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    pub name: String,
    pub state: String,
    pub version: u32,
    pub is_default: bool,
}

impl Distribution {
    pub fn is_running(&self) -> bool {
        self.state.eq_ignore_ascii_case("Running")
    }
}

/// Lifecycle operations against the registered distributions
pub struct DistroManager<R: Runner> {
    runner: R,
}

impl DistroManager<ToolRunner> {
    /// Create a manager driving the real wsl executable
    pub fn new() -> Result<Self> {
        Ok(Self {
            runner: ToolRunner::wsl()?,
        })
    }
}

impl<R: Runner> DistroManager<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    /// List all registered distributions
    pub fn list(&self) -> Result<Vec<Distribution>> {
        let out = self
            .runner
            .run(&["--list", "--verbose"], Some(CONTROL_TIMEOUT))?;
        if !out.success() {
            bail!("wsl --list failed with exit code {}", out.code);
        }
        Ok(parse_distro_list(&out.stdout))
    }

    /// Launch an interactive shell in the distribution (fire and forget)
    pub fn start(&self, name: &str) -> Result<()> {
        ensure_name(name)?;
        self.runner.spawn_detached(&["-d", name])
    }

    /// Keep the default distribution alive without a visible shell
    pub fn start_background(&self) -> Result<()> {
        self.runner
            .spawn_detached(&["-e", "sh", "-c", "nohup sleep infinity > /dev/null 2>&1 &"])
    }

    pub fn terminate(&self, name: &str) -> Result<()> {
        ensure_name(name)?;
        self.control(&["--terminate", name])
    }

    pub fn unregister(&self, name: &str) -> Result<()> {
        ensure_name(name)?;
        self.control(&["--unregister", name])
    }

    pub fn set_default(&self, name: &str) -> Result<()> {
        ensure_name(name)?;
        self.control(&["--set-default", name])
    }

    /// Stop the whole WSL VM
    pub fn shutdown(&self) -> Result<()> {
        self.control(&["--shutdown"])
    }

    /// Ask the default distribution to drop its page caches. Best-effort:
    /// needs root inside the guest, and a refusal is not worth surfacing.
    pub fn reclaim_memory(&self) {
        let _ = self.runner.run(
            &["-u", "root", "-e", "sh", "-c", "echo 3 > /proc/sys/vm/drop_caches"],
            Some(CONTROL_TIMEOUT),
        );
    }

    /// Export a distribution into a tar archive. Runs unbounded; exports
    /// of large distributions legitimately take many minutes.
    pub fn export(&self, name: &str, dest: &Path) -> Result<()> {
        ensure_name(name)?;
        ensure_path(dest, "destination path")?;
        let dest = dest.to_string_lossy();
        let out = self.runner.run(&["--export", name, &dest], None)?;
        if !out.success() {
            bail!("export of '{}' failed with exit code {}", name, out.code);
        }
        Ok(())
    }

    /// Import a tar archive as a new distribution. Creates the install
    /// directory when absent; runs unbounded.
    pub fn import(&self, name: &str, install_dir: &Path, archive: &Path) -> Result<()> {
        ensure_name(name)?;
        ensure_path(install_dir, "install location")?;
        ensure_path(archive, "archive path")?;
        if !install_dir.exists() {
            fs::create_dir_all(install_dir)
                .with_context(|| format!("failed to create {}", install_dir.display()))?;
        }
        let dir = install_dir.to_string_lossy();
        let tar = archive.to_string_lossy();
        let out = self
            .runner
            .run(&["--import", name, &dir, &tar, "--version", "2"], None)?;
        if !out.success() {
            bail!("import of '{}' failed with exit code {}", name, out.code);
        }
        Ok(())
    }

    /// Duplicate a distribution under a new name via export + import.
    /// The staging archive is deleted best-effort whatever happens.
    pub fn clone_distro(&self, source: &str, new_name: &str, new_location: &Path) -> Result<()> {
        ensure_name(source)?;
        ensure_name(new_name)?;
        if source.eq_ignore_ascii_case(new_name) {
            bail!("clone target name matches the source");
        }
        let archive = temp_archive_path(source, "clone");

        let result = self
            .export(source, &archive)
            .and_then(|_| self.import(new_name, new_location, &archive));

        rm_if_exists(&archive);
        result
    }

    /// Relocate a distribution by exporting, unregistering the original
    /// and importing at the new location under the same name.
    ///
    /// Once the original is unregistered the staging archive is the only
    /// copy of its data, so the failure path never deletes it; errors
    /// carry the archive location so the caller can recover by importing
    /// it manually. Cleanup runs only after the whole sequence succeeds.
    pub fn move_distro(&self, name: &str, new_location: &Path) -> Result<()> {
        ensure_name(name)?;
        ensure_path(new_location, "install location")?;
        let archive = temp_archive_path(name, "move");

        self.export(name, &archive)?;

        let exported = fs::metadata(&archive).map(|m| m.len()).unwrap_or(0);
        if exported == 0 {
            bail!(
                "export produced an empty archive; move aborted and '{}' was not modified",
                name
            );
        }

        self.unregister(name).map_err(|e| {
            e.context(format!(
                "move of '{}' failed while unregistering the original; the exported archive was kept at {}",
                name,
                archive.display()
            ))
        })?;

        self.import(name, new_location, &archive).map_err(|e| {
            e.context(format!(
                "import failed after '{}' was unregistered; the archive at {} is the only remaining copy of its data, import it manually to recover",
                name,
                archive.display()
            ))
        })?;

        rm_if_exists(&archive);
        Ok(())
    }

    /// Whether the WSL VM is currently up. Fast path: the host-side VM
    /// helper process exists. Slow path: ask wsl itself. Any error from
    /// either path reads as "not running".
    pub fn is_running(&self) -> bool {
        for helper in HOST_VM_PROCESSES {
            if process_exists(helper).unwrap_or(false) {
                return true;
            }
        }
        match self.runner.run(&["--list", "--running"], Some(QUERY_TIMEOUT)) {
            Ok(out) => {
                !out.stdout.trim().is_empty() && !out.stdout.contains(NO_RUNNING_SENTINEL)
            }
            Err(_) => false,
        }
    }

    /// Read a distribution's /etc/wsl.conf through remote exec. Any
    /// failure (distro down, file missing, dialect drift) degrades to an
    /// empty config rather than an error.
    pub fn guest_config(&self, name: &str) -> GuestConfig {
        match self.runner.run(
            &["-d", name, "-u", "root", "cat", "/etc/wsl.conf"],
            Some(QUERY_TIMEOUT),
        ) {
            Ok(out) if out.success() => GuestConfig::parse(&out.stdout),
            _ => GuestConfig::default(),
        }
    }

    /// Write a distribution's /etc/wsl.conf through remote exec
    pub fn set_guest_config(&self, name: &str, conf: &GuestConfig) -> Result<()> {
        ensure_name(name)?;
        let content = conf.render().replace("\r\n", "\n");
        let out = self.runner.run_with_input(
            &["-d", name, "-u", "root", "sh", "-c", "cat > /etc/wsl.conf"],
            &content,
            Some(CONF_WRITE_TIMEOUT),
        )?;
        if !out.success() {
            bail!(
                "failed to write wsl.conf for '{}' (exit code {})",
                name,
                out.code
            );
        }
        Ok(())
    }

    /// Bind-mount a Windows folder into the distribution via drvfs
    pub fn mount_folder(&self, name: &str, windows_path: &str, linux_path: &str) -> Result<()> {
        ensure_name(name)?;
        self.control(&["-d", name, "-u", "root", "mkdir", "-p", linux_path])?;
        self.control(&["-d", name, "-u", "root", "mount", "-t", "drvfs", windows_path, linux_path])
    }

    pub fn unmount_folder(&self, name: &str, linux_path: &str) -> Result<()> {
        ensure_name(name)?;
        self.control(&["-d", name, "-u", "root", "umount", linux_path])
    }

    fn control(&self, args: &[&str]) -> Result<()> {
        let out = self.runner.run(args, Some(CONTROL_TIMEOUT))?;
        if !out.success() {
            bail!("wsl {} failed with exit code {}", args.join(" "), out.code);
        }
        Ok(())
    }
}

/// Parse `wsl --list --verbose` output: a header row, then whitespace-
/// delimited columns with `*` marking the default distribution. Lines
/// that do not fit the shape are skipped.
fn parse_distro_list(text: &str) -> Vec<Distribution> {
    let mut distros = Vec::new();
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    lines.next(); // NAME STATE VERSION header

    for line in lines {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            continue;
        }
        let is_default = parts[0] == "*";
        let (name, state, version) = if is_default {
            if parts.len() < 4 {
                continue;
            }
            (parts[1], parts[2], parts[3])
        } else {
            (parts[0], parts[1], parts[2])
        };
        let Ok(version) = version.parse() else {
            continue;
        };
        distros.push(Distribution {
            name: name.to_string(),
            state: state.to_string(),
            version,
            is_default,
        });
    }
    distros
}

fn ensure_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("distribution name is required");
    }
    Ok(())
}

fn ensure_path(path: &Path, what: &str) -> Result<()> {
    if path.as_os_str().is_empty() {
        bail!("{} is required", what);
    }
    Ok(())
}

fn rm_if_exists(p: &Path) {
    let _ = fs::remove_file(p);
}
