//! Remap module: the single fixed rule, Caps Lock to next input source
//!
//! - Caps Lock activation: switch to the next layout, swallow the event
//! - Repeats inside the debounce window: swallowed, no switch
//! - Key down/up: Caps Lock modifier bit stripped

mod machine;

pub use machine::RemapMachine;
