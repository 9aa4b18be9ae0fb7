//! Permission module: acquiring and keeping the input-monitoring permission
//!
//! Unknown -> Polling -> Granted -> Revoked, with Revoked terminal.

mod manager;
mod state;

#[cfg(test)]
pub(crate) use manager::fake;
pub use manager::{Host, Intervals, PermissionManager, TrustQuery};
pub use state::{PermissionState, RevocationReason};
