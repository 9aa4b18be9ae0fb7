//! Modifier flag definitions and the trigger key
//!
//! Flag masks use the same bit values as macOS `CGEventFlags`, so the
//! platform layer converts with a plain bit copy.

use std::fmt;

/// Modifier flag masks from macOS CGEventFlags
pub mod flags {
    /// Caps Lock (alpha shift) modifier flag
    pub const ALPHA_SHIFT: u64 = 0x0001_0000;
    /// Shift key modifier flag
    pub const SHIFT: u64 = 0x0002_0000;
    /// Control key modifier flag
    pub const CONTROL: u64 = 0x0004_0000;
    /// Option/Alt key modifier flag
    pub const OPTION: u64 = 0x0008_0000;
    /// Command key modifier flag
    pub const COMMAND: u64 = 0x0010_0000;
}

/// Virtual keycode of Caps Lock (`kVK_CapsLock`)
pub const CAPS_LOCK_KEYCODE: u16 = 0x39;

/// Raw modifier flags carried by a keyboard event
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ModifierFlags(u64);

impl ModifierFlags {
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn contains(self, mask: u64) -> bool {
        self.0 & mask == mask
    }

    /// Same flags with `mask` cleared
    pub const fn without(self, mask: u64) -> Self {
        Self(self.0 & !mask)
    }

    /// Bits set here that `other` no longer carries
    pub const fn cleared_in(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl fmt::Debug for ModifierFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModifierFlags({:#x})", self.0)
    }
}

/// The single key whose native toggle is replaced by the cyclic switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerKey {
    /// Virtual keycode delivered with the modifier-change event
    pub keycode: u16,
    /// Modifier bit the key sets natively
    pub flag: u64,
}

impl TriggerKey {
    pub const CAPS_LOCK: Self = Self {
        keycode: CAPS_LOCK_KEYCODE,
        flag: flags::ALPHA_SHIFT,
    };
}

impl Default for TriggerKey {
    fn default() -> Self {
        Self::CAPS_LOCK
    }
}
