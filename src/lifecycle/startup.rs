//! Startup side actions.
//!
//! Everything here is fire-and-forget: failures are logged and never affect
//! whether the proxy serves traffic.

use std::process::{Command, Stdio};

use crate::config::ProxyConfig;

/// URL the browser hook should open for this configuration.
pub fn browser_url(config: &ProxyConfig) -> String {
    config
        .startup
        .browser_url
        .clone()
        .unwrap_or_else(|| config.listener.public_url())
}

/// Launch the system browser on `url` without waiting for it.
pub fn open_browser(url: &str) {
    let mut command = opener_command(url);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    match command.spawn() {
        Ok(_) => tracing::info!(url = %url, "Opened browser"),
        Err(e) => tracing::debug!(url = %url, error = %e, "Could not open browser"),
    }
}

#[cfg(target_os = "macos")]
fn opener_command(url: &str) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg(url);
    cmd
}

#[cfg(target_os = "windows")]
fn opener_command(url: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", "start", "", url]);
    cmd
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn opener_command(url: &str) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(url);
    cmd
}
