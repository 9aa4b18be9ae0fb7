//! Hotkey module: keyboard event model shared by the gateway and the remap machine
//!
//! The macOS event tap converts `CGEvent`s into these types so the rest
//! of the daemon never touches CoreGraphics directly.

mod event;
mod keys;

pub use event::{DisableReason, EventDecision, EventKind, KeyEvent, INTERCEPTED_KINDS};
pub use keys::{flags, ModifierFlags, TriggerKey};
