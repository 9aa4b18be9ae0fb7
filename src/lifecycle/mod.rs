//! Process lifecycle: the event loop and graceful shutdown

mod event_loop;
mod shutdown;

#[cfg(target_os = "macos")]
pub use event_loop::{EventLoop, RunLoop};
pub use event_loop::LoopExit;
pub use shutdown::ShutdownSignal;
