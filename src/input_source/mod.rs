//! Input source module: the OS keyboard input source directory

mod directory;

#[cfg(test)]
pub(crate) use directory::fake;
#[cfg(target_os = "macos")]
pub use directory::{InputSource, SourceCategory, SourceFilter, SourceKind};
pub use directory::{InputSourceDirectory, InputSourceProvider, SwitchError};
