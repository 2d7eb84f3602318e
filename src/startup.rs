//! Start-on-login toggle
//!
//! On Windows this is a single value under the user's Run key, driven
//! through reg.exe; absence of the value means "not enabled". Elsewhere
//! an XDG autostart entry stands in. Either way the registered command
//! launches the automation daemon.

use anyhow::Result;

const APP_NAME: &str = "wslm";

#[cfg(windows)]
const RUN_KEY: &str = r"HKCU\Software\Microsoft\Windows\CurrentVersion\Run";

/// Whether start-on-login is currently enabled. Query failures read as
/// "not enabled".
pub fn is_enabled() -> bool {
    #[cfg(windows)]
    {
        std::process::Command::new("reg")
            .args(["query", RUN_KEY, "/v", APP_NAME])
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    #[cfg(not(windows))]
    {
        autostart_entry().map(|p| p.exists()).unwrap_or(false)
    }
}

pub fn set_enabled(enable: bool) -> Result<()> {
    #[cfg(windows)]
    {
        use anyhow::bail;

        if enable {
            let exe = std::env::current_exe()?;
            let command = format!("\"{}\" watch", exe.display());
            let out = std::process::Command::new("reg")
                .args(["add", RUN_KEY, "/v", APP_NAME, "/t", "REG_SZ", "/d", &command, "/f"])
                .output()?;
            if !out.status.success() {
                bail!("failed to register the startup entry");
            }
        } else {
            // A missing value is already the desired state.
            let _ = std::process::Command::new("reg")
                .args(["delete", RUN_KEY, "/v", APP_NAME, "/f"])
                .output()?;
        }
        Ok(())
    }

    #[cfg(not(windows))]
    {
        let entry = autostart_entry()?;
        if enable {
            if let Some(parent) = entry.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let exe = std::env::current_exe()?;
            let contents = format!(
                "[Desktop Entry]\nType=Application\nName={}\nExec={} watch\n",
                APP_NAME,
                exe.display()
            );
            std::fs::write(&entry, contents)?;
        } else if entry.exists() {
            std::fs::remove_file(&entry)?;
        }
        Ok(())
    }
}

#[cfg(not(windows))]
fn autostart_entry() -> Result<std::path::PathBuf> {
    use anyhow::anyhow;

    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow!("no config directory found"))?
        .join("autostart")
        .join(format!("{}.desktop", APP_NAME)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(windows))]
    #[test]
    fn test_toggle_round_trip() {
        // Redirecting XDG_CONFIG_HOME per-test races other tests that read
        // it; instead just exercise the path builder.
        let entry = autostart_entry().unwrap();
        assert!(entry.ends_with("autostart/wslm.desktop"));
    }
}
