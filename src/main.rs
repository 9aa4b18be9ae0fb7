//! capslang-daemon: Caps Lock as a keyboard input source switcher for macOS
//!
//! This daemon runs as a LaunchAgent and provides:
//! - A system-wide CGEventTap that swallows Caps Lock
//! - A remap state machine that cycles to the next keyboard layout instead
//! - A permission lifecycle that waits for Accessibility / Input Monitoring
//!   access and exits if it is ever revoked
//!
//! Out of scope: status bar UI, login item registration, configurable rules

#![cfg_attr(not(target_os = "macos"), allow(dead_code))]

mod clock;
mod config;
mod gateway;
mod hotkey;
mod input_source;
mod lifecycle;
mod permission;
mod platform;
mod remap;
mod timer;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::lifecycle::{LoopExit, ShutdownSignal};

fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(version = env!("CARGO_PKG_VERSION"), "capslang-daemon starting");

    let config = Config::load().context("failed to load configuration")?;
    info!(?config, "configuration loaded");

    // Signals are handled off the main thread; the OS run loop owns it
    let running = Arc::new(AtomicBool::new(true));
    ShutdownSignal::new()
        .spawn_watcher(Arc::clone(&running))
        .context("failed to start signal watcher")?;

    match platform::run(&config, &running)? {
        LoopExit::Stopped => {
            info!("capslang-daemon stopped");
            Ok(())
        }
        LoopExit::Revoked(reason) => Err(anyhow!("{reason}, exiting")),
    }
}
