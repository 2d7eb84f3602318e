//! System utility functions

use anyhow::Result;
use std::process::Command;

/// Get current UTC timestamp in RFC3339 format
pub fn now_utc() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Check whether a process with the given image name is currently running.
/// The name is compared without any `.exe` extension, case-insensitively.
pub fn process_exists(name: &str) -> Result<bool> {
    if name.trim().is_empty() {
        return Ok(false);
    }

    #[cfg(windows)]
    {
        let output = Command::new("tasklist").args(["/FO", "CSV", "/NH"]).output()?;
        let text = String::from_utf8_lossy(&output.stdout);
        for line in text.lines() {
            // First CSV field is the quoted image name, e.g. "vmmem.exe"
            let image = line.split(',').next().unwrap_or("").trim_matches('"');
            let image = image.strip_suffix(".exe").unwrap_or(image);
            if image.eq_ignore_ascii_case(name) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    #[cfg(unix)]
    {
        let output = Command::new("ps").args(["-A", "-o", "comm="]).output()?;
        let text = String::from_utf8_lossy(&output.stdout);
        for line in text.lines() {
            let comm = line.trim();
            let base = comm.rsplit('/').next().unwrap_or(comm);
            if base.eq_ignore_ascii_case(name) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Decode console output captured from a subprocess.
///
/// wsl.exe writes its own messages as UTF-16LE while commands executed
/// inside a distribution produce UTF-8; embedded NUL bytes distinguish
/// the two reliably.
pub fn decode_console(raw: &[u8]) -> String {
    if raw.contains(&0u8) {
        let mut units = Vec::with_capacity(raw.len() / 2);
        for pair in raw.chunks_exact(2) {
            units.push(u16::from_le_bytes([pair[0], pair[1]]));
        }
        let text = String::from_utf16_lossy(&units);
        text.trim_start_matches('\u{feff}').to_string()
    } else {
        String::from_utf8_lossy(raw)
            .trim_start_matches('\u{feff}')
            .to_string()
    }
}
