// LinkVault platform abstraction
// Resolves the per-OS configuration directory at compile time via `cfg(target_os)`.

use std::path::PathBuf;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "windows")]
mod windows;

/// Returns the platform-specific configuration directory for LinkVault.
///
/// - **Linux**: `~/.config/linkvault` (or `$XDG_CONFIG_HOME/linkvault`)
/// - **macOS**: `~/Library/Application Support/LinkVault`
/// - **Windows**: `%APPDATA%/LinkVault`
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_config_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_config_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_config_dir()
    }
}
