//! Permission states and the reasons the daemon gives up

use std::fmt;

use crate::hotkey::DisableReason;

/// Where the daemon stands with the OS input-monitoring permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionState {
    /// No install attempted yet
    #[default]
    Unknown,
    /// Install refused, retrying on a timer
    Polling,
    /// Hook installed and trusted
    Granted,
    /// Permission lost; terminal for the process
    Revoked,
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionState::Unknown => write!(f, "Unknown"),
            PermissionState::Polling => write!(f, "Polling"),
            PermissionState::Granted => write!(f, "Granted"),
            PermissionState::Revoked => write!(f, "Revoked"),
        }
    }
}

/// Why the hook was lost for good
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationReason {
    /// A periodic trust check came back negative
    TrustRevoked,
    /// The OS disabled the installed hook
    HookDisabled(DisableReason),
}

impl fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevocationReason::TrustRevoked => write!(f, "accessibility permission revoked"),
            RevocationReason::HookDisabled(reason) => {
                write!(f, "event tap disabled by the system ({})", reason)
            }
        }
    }
}
