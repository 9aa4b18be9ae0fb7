//! Platform-neutral keyboard events and the decisions taken on them

use std::fmt;

use super::keys::ModifierFlags;

/// Kind of event delivered by the interception point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A modifier key changed state
    FlagsChanged,
    KeyDown,
    KeyUp,
    /// The OS disabled the hook because a callback took too long
    TapDisabledByTimeout,
    /// The hook was disabled by user input (secure input, etc.)
    TapDisabledByUserInput,
    /// Anything outside the interception scope
    Other,
}

/// Kinds the gateway asks the OS to deliver
pub const INTERCEPTED_KINDS: [EventKind; 3] =
    [EventKind::FlagsChanged, EventKind::KeyDown, EventKind::KeyUp];

/// One keyboard event as seen by the remap machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub kind: EventKind,
    pub flags: ModifierFlags,
    pub keycode: u16,
}

impl KeyEvent {
    pub fn new(kind: EventKind, flags: ModifierFlags, keycode: u16) -> Self {
        Self {
            kind,
            flags,
            keycode,
        }
    }
}

/// Why the OS turned the hook off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisableReason {
    Timeout,
    UserInput,
}

impl fmt::Display for DisableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisableReason::Timeout => write!(f, "timeout"),
            DisableReason::UserInput => write!(f, "user input"),
        }
    }
}

/// What the interception point does with a delivered event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDecision {
    /// Drop the event
    Suppress,
    /// Forward unchanged
    PassThrough,
    /// Forward this replacement instead
    PassModified(KeyEvent),
    /// The hook is gone; tear down
    FatalDisable(DisableReason),
}
