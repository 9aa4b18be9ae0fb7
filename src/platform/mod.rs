//! Platform integration
//!
//! Only macOS provides the collaborators the daemon needs. Everything
//! above this module is platform-neutral and tested with fakes.

use std::sync::atomic::AtomicBool;

use crate::config::Config;
use crate::lifecycle::LoopExit;

#[cfg(target_os = "macos")]
mod macos;

/// Errors raised while bringing up the platform layer
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("unsupported platform: capslang-daemon requires macOS")]
    Unsupported,
}

#[cfg(target_os = "macos")]
pub fn run(config: &Config, running: &AtomicBool) -> Result<LoopExit, PlatformError> {
    macos::run(config, running)
}

#[cfg(not(target_os = "macos"))]
pub fn run(_config: &Config, _running: &AtomicBool) -> Result<LoopExit, PlatformError> {
    Err(PlatformError::Unsupported)
}
