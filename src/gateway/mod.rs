//! Gateway module: ownership of the system-wide keyboard hook

mod hook;

#[cfg(test)]
pub(crate) use hook::fake;
#[cfg(target_os = "macos")]
pub use hook::EventCallback;
pub use hook::{EventGateway, InstallError, Interceptor};
