//! The single event-processing loop
//!
//! Everything the daemon does happens here, on one thread: OS event
//! delivery during a run loop slice, then timers. Handlers never overlap.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{info, trace};

use crate::clock::Clock;
use crate::gateway::Interceptor;
use crate::input_source::InputSourceProvider;
use crate::permission::{Host, PermissionManager, RevocationReason, TrustQuery};

/// OS run loop that delivers hook callbacks while it runs
pub trait RunLoop {
    /// Process OS sources for at most `max`, returning early when idle-woken
    fn run_for(&mut self, max: Duration);
}

/// How the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Stopped on request (signal)
    Stopped,
    /// Permission lost
    Revoked(RevocationReason),
}

/// Drives a permission manager until it finishes or is asked to stop
pub struct EventLoop<'a, C: ?Sized> {
    clock: &'a C,
    max_slice: Duration,
}

impl<'a, C: Clock + ?Sized> EventLoop<'a, C> {
    pub fn new(clock: &'a C, max_slice: Duration) -> Self {
        Self { clock, max_slice }
    }

    /// Run until revocation or until `running` is cleared
    pub fn run<I, P, T, H, L>(
        &self,
        mut manager: PermissionManager<I, P, T, H>,
        run_loop: &mut L,
        running: &AtomicBool,
    ) -> LoopExit
    where
        I: Interceptor,
        P: InputSourceProvider + 'static,
        T: TrustQuery,
        H: Host,
        L: RunLoop,
    {
        info!("event loop started");
        manager.start(self.clock.now());

        loop {
            if let Some(reason) = manager.revocation() {
                info!(%reason, "event loop finished");
                return LoopExit::Revoked(reason);
            }
            if !running.load(Ordering::SeqCst) {
                manager.shutdown();
                info!("event loop stopped");
                return LoopExit::Stopped;
            }

            run_loop.run_for(self.slice(manager.next_deadline()));
            manager.tick(self.clock.now());
        }
    }

    fn slice(&self, deadline: Option<Instant>) -> Duration {
        let slice = deadline
            .map(|d| d.saturating_duration_since(self.clock.now()))
            .unwrap_or(self.max_slice)
            .min(self.max_slice);
        trace!(?slice, "running OS loop slice");
        slice
    }
}
