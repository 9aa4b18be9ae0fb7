//! Event interception gateway
//!
//! Owns the installed hook and wires every delivered event into the remap
//! machine. The OS calls back synchronously on the loop thread, so state
//! shared with the callback lives in `Rc<RefCell<_>>` / `Rc<Cell<_>>`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Instant;

use tracing::{debug, error, info, trace};

use crate::clock::Clock;
use crate::hotkey::{DisableReason, EventDecision, EventKind, KeyEvent, INTERCEPTED_KINDS};
use crate::input_source::InputSourceProvider;
use crate::remap::RemapMachine;

/// Callback the interception point invokes for every delivered event
pub type EventCallback = Box<dyn FnMut(&KeyEvent) -> EventDecision>;

/// Errors that can occur while installing the hook
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum InstallError {
    #[error("event tap creation refused - check Accessibility / Input Monitoring permissions")]
    PermissionDenied,

    #[error("failed to attach event tap to the run loop")]
    RunLoopSource,
}

/// OS collaborator providing the system-wide interception point
pub trait Interceptor {
    /// Live OS resource backing an installed hook
    type Tap;

    /// Install a synchronous, event-modifying hook for `kinds`
    fn install(&mut self, kinds: &[EventKind], callback: EventCallback)
        -> Result<Self::Tap, InstallError>;

    /// Remove the hook and release its resources
    fn uninstall(&mut self, tap: Self::Tap);
}

/// Capability representing an installed, active hook
pub struct HookHandle<T> {
    tap: T,
}

/// Owns the hook and routes events into the remap machine
pub struct EventGateway<I: Interceptor, P> {
    interceptor: I,
    machine: Rc<RefCell<RemapMachine<P>>>,
    clock: Rc<dyn Clock>,
    hook: Option<HookHandle<I::Tap>>,
    fatal: Rc<Cell<Option<DisableReason>>>,
}

impl<I, P> EventGateway<I, P>
where
    I: Interceptor,
    P: InputSourceProvider + 'static,
{
    pub fn new(interceptor: I, machine: RemapMachine<P>, clock: Rc<dyn Clock>) -> Self {
        Self {
            interceptor,
            machine: Rc::new(RefCell::new(machine)),
            clock,
            hook: None,
            fatal: Rc::new(Cell::new(None)),
        }
    }

    #[cfg(test)]
    pub fn is_installed(&self) -> bool {
        self.hook.is_some()
    }

    #[cfg(test)]
    pub fn machine(&self) -> &Rc<RefCell<RemapMachine<P>>> {
        &self.machine
    }

    /// Install the hook; a no-op when one is already live
    pub fn install(&mut self) -> Result<(), InstallError> {
        if self.hook.is_some() {
            return Ok(());
        }

        let callback = event_callback(
            Rc::clone(&self.machine),
            Rc::clone(&self.clock),
            Rc::clone(&self.fatal),
        );
        let tap = self.interceptor.install(&INTERCEPTED_KINDS, callback)?;

        self.fatal.set(None);
        self.hook = Some(HookHandle { tap });
        info!("event tap installed");
        Ok(())
    }

    /// Release the hook, if any, and reset the remap machine
    pub fn uninstall(&mut self) {
        if let Some(handle) = self.hook.take() {
            self.interceptor.uninstall(handle.tap);
            info!("event tap removed");
        }
        self.machine.borrow_mut().reset();
    }

    /// Disable notification recorded by the callback since the last call
    pub fn take_fatal_disable(&self) -> Option<DisableReason> {
        self.fatal.take()
    }

    /// Run timers owned by the remap machine
    pub fn tick(&mut self, now: Instant) {
        self.machine.borrow_mut().on_tick(now);
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.machine.borrow().next_deadline()
    }
}

fn event_callback<P>(
    machine: Rc<RefCell<RemapMachine<P>>>,
    clock: Rc<dyn Clock>,
    fatal: Rc<Cell<Option<DisableReason>>>,
) -> EventCallback
where
    P: InputSourceProvider + 'static,
{
    Box::new(move |event: &KeyEvent| {
        let Ok(mut guard) = machine.try_borrow_mut() else {
            // Re-entrant delivery while the machine is busy
            debug!(?event, "event delivered re-entrantly, passing through");
            return EventDecision::PassThrough;
        };

        let decision = guard.on_event(event, clock.now());
        trace!(?event, ?decision, "event handled");

        if let EventDecision::FatalDisable(reason) = decision {
            error!(%reason, "event tap disabled by the system");
            if fatal.get().is_none() {
                fatal.set(Some(reason));
            }
        }
        decision
    })
}

#[cfg(test)]
pub(crate) mod fake {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use super::*;

    #[derive(Default)]
    struct FakeTapState {
        results: VecDeque<Result<(), InstallError>>,
        callback: Option<EventCallback>,
        installs: usize,
        uninstalls: usize,
        next_id: u32,
        live: Option<u32>,
        kinds: Vec<EventKind>,
    }

    /// Scripted interception subsystem that keeps the installed callback
    #[derive(Clone, Default)]
    pub struct FakeInterceptor {
        inner: Rc<RefCell<FakeTapState>>,
    }

    impl FakeInterceptor {
        /// Fail with `PermissionDenied` `n` times, then succeed
        pub fn denying(n: usize) -> Self {
            let fake = Self::default();
            for _ in 0..n {
                fake.push_result(Err(InstallError::PermissionDenied));
            }
            fake
        }

        pub fn push_result(&self, result: Result<(), InstallError>) {
            self.inner.borrow_mut().results.push_back(result);
        }

        /// Deliver an event the way the OS would
        pub fn deliver(&self, event: KeyEvent) -> Option<EventDecision> {
            let mut callback = self.inner.borrow_mut().callback.take()?;
            let decision = callback(&event);
            let mut inner = self.inner.borrow_mut();
            if inner.live.is_some() && inner.callback.is_none() {
                inner.callback = Some(callback);
            }
            Some(decision)
        }

        pub fn installs(&self) -> usize {
            self.inner.borrow().installs
        }

        pub fn uninstalls(&self) -> usize {
            self.inner.borrow().uninstalls
        }

        pub fn is_live(&self) -> bool {
            self.inner.borrow().live.is_some()
        }

        pub fn kinds(&self) -> Vec<EventKind> {
            self.inner.borrow().kinds.clone()
        }
    }

    impl Interceptor for FakeInterceptor {
        type Tap = u32;

        fn install(
            &mut self,
            kinds: &[EventKind],
            callback: EventCallback,
        ) -> Result<u32, InstallError> {
            let mut inner = self.inner.borrow_mut();
            inner.installs += 1;
            inner.results.pop_front().unwrap_or(Ok(()))?;
            assert!(inner.live.is_none(), "second hook installed while one is live");

            inner.next_id += 1;
            let id = inner.next_id;
            inner.live = Some(id);
            inner.callback = Some(callback);
            inner.kinds = kinds.to_vec();
            Ok(id)
        }

        fn uninstall(&mut self, tap: u32) {
            let mut inner = self.inner.borrow_mut();
            assert_eq!(inner.live, Some(tap), "uninstalling a hook that is not live");
            inner.uninstalls += 1;
            inner.live = None;
            inner.callback = None;
        }
    }
}
