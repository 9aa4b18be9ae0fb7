//! Permission lifecycle manager
//!
//! Drives hook installation until the OS grants permission, then watches
//! for the permission being taken away. Losing it is terminal: the daemon
//! tears down and exits instead of trying to win it back.

use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::gateway::{EventGateway, InstallError, Interceptor};
use crate::input_source::InputSourceProvider;
use crate::timer::{earliest, TimerSlot};

use super::state::{PermissionState, RevocationReason};

/// Polled query of the process trust state
pub trait TrustQuery {
    fn is_process_trusted(&self) -> bool;
}

/// The application hosting the daemon core (status item, dialogs, process exit)
pub trait Host {
    /// Surface the OS permission UI; called at most once per process
    fn prompt_open_permission_settings(&mut self);

    /// Show the terminal notice; the process exits once the loop winds down
    fn notify_revoked_and_exit(&mut self, reason: RevocationReason);

    /// Persistent indicator hook
    fn permission_state_changed(&mut self, _from: PermissionState, _to: PermissionState) {}
}

/// Timer periods used by the manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intervals {
    pub poll: Duration,
    pub trust_check: Duration,
}

impl From<&Config> for Intervals {
    fn from(config: &Config) -> Self {
        Self {
            poll: config.poll_interval,
            trust_check: config.trust_check_interval,
        }
    }
}

/// One-shot process flags
#[derive(Debug, Default)]
struct LifecycleFlags {
    opened_settings_once: bool,
    exit_signalled: bool,
}

/// Owns the daemon state: permission, hook, timers
pub struct PermissionManager<I: Interceptor, P, T, H> {
    gateway: EventGateway<I, P>,
    trust: T,
    host: H,
    intervals: Intervals,
    state: PermissionState,
    revoked_by: Option<RevocationReason>,
    flags: LifecycleFlags,
    poll: TimerSlot,
    trust_check: TimerSlot,
    install_attempts: u64,
}

impl<I, P, T, H> PermissionManager<I, P, T, H>
where
    I: Interceptor,
    P: InputSourceProvider + 'static,
    T: TrustQuery,
    H: Host,
{
    pub fn new(gateway: EventGateway<I, P>, trust: T, host: H, intervals: Intervals) -> Self {
        Self {
            gateway,
            trust,
            host,
            intervals,
            state: PermissionState::Unknown,
            revoked_by: None,
            flags: LifecycleFlags::default(),
            poll: TimerSlot::new("poll"),
            trust_check: TimerSlot::new("trust-check"),
            install_attempts: 0,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> PermissionState {
        self.state
    }

    #[cfg(test)]
    pub fn gateway(&self) -> &EventGateway<I, P> {
        &self.gateway
    }

    pub fn is_finished(&self) -> bool {
        self.state == PermissionState::Revoked
    }

    /// What ended the permission, once revoked
    pub fn revocation(&self) -> Option<RevocationReason> {
        self.revoked_by
    }

    /// First install attempt
    pub fn start(&mut self, now: Instant) {
        if self.state != PermissionState::Unknown {
            return;
        }
        info!("installing event tap");
        self.attempt_install(now);
    }

    /// Run every timer and pending notification due at `now`
    pub fn tick(&mut self, now: Instant) {
        if self.is_finished() {
            return;
        }

        if let Some(reason) = self.gateway.take_fatal_disable() {
            self.revoke(RevocationReason::HookDisabled(reason));
            return;
        }

        if self.poll.fire_if_due(now) {
            self.attempt_install(now);
        }

        if self.trust_check.fire_if_due(now) && !self.trust.is_process_trusted() {
            self.revoke(RevocationReason::TrustRevoked);
            return;
        }

        self.gateway.tick(now);
    }

    /// When the next timer wants to run
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.is_finished() {
            return None;
        }
        earliest([
            self.poll.deadline(),
            self.trust_check.deadline(),
            self.gateway.next_deadline(),
        ])
    }

    /// Graceful stop: release everything without the revocation notice
    pub fn shutdown(mut self) {
        self.poll.cancel();
        self.trust_check.cancel();
        self.gateway.uninstall();
        info!(state = %self.state, "permission manager stopped");
    }

    fn attempt_install(&mut self, now: Instant) {
        self.install_attempts += 1;

        match self.gateway.install() {
            Ok(()) => {
                self.poll.cancel();
                self.trust_check
                    .schedule_repeating(now, self.intervals.trust_check);
                info!(attempts = self.install_attempts, "event tap permission granted");
                self.transition_to(PermissionState::Granted);
            }
            Err(e) => {
                if self.state == PermissionState::Polling {
                    debug!(%e, attempts = self.install_attempts, "event tap still unavailable");
                } else {
                    warn!(%e, "event tap unavailable, polling until permission is granted");
                    self.transition_to(PermissionState::Polling);
                }

                if e == InstallError::PermissionDenied && !self.flags.opened_settings_once {
                    self.flags.opened_settings_once = true;
                    self.host.prompt_open_permission_settings();
                }

                self.poll.schedule_repeating(now, self.intervals.poll);
            }
        }
    }

    fn revoke(&mut self, reason: RevocationReason) {
        if self.is_finished() {
            // The other detection path got there first
            debug!(%reason, "already revoked");
            return;
        }

        error!(%reason, "permission lost, shutting down");
        self.poll.cancel();
        self.trust_check.cancel();
        self.gateway.uninstall();
        self.revoked_by = Some(reason);
        self.transition_to(PermissionState::Revoked);

        if !self.flags.exit_signalled {
            self.flags.exit_signalled = true;
            self.host.notify_revoked_and_exit(reason);
        }
    }

    fn transition_to(&mut self, new_state: PermissionState) {
        let old_state = self.state;
        if old_state == new_state {
            return;
        }

        info!(from = %old_state, to = %new_state, "permission state transition");
        self.state = new_state;
        self.host.permission_state_changed(old_state, new_state);
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;

    /// Trust query answering from a shared flag
    #[derive(Clone)]
    pub struct FakeTrust(Rc<Cell<bool>>);

    impl FakeTrust {
        pub fn new(trusted: bool) -> Self {
            Self(Rc::new(Cell::new(trusted)))
        }

        pub fn set(&self, trusted: bool) {
            self.0.set(trusted);
        }
    }

    impl TrustQuery for FakeTrust {
        fn is_process_trusted(&self) -> bool {
            self.0.get()
        }
    }

    #[derive(Default)]
    pub struct HostLog {
        pub prompts: usize,
        pub exits: Vec<RevocationReason>,
        pub transitions: Vec<(PermissionState, PermissionState)>,
    }

    impl HostLog {
        pub fn entered(&self, state: PermissionState) -> usize {
            self.transitions.iter().filter(|(_, to)| *to == state).count()
        }
    }

    /// Host that records every call
    #[derive(Clone, Default)]
    pub struct RecordingHost(Rc<RefCell<HostLog>>);

    impl RecordingHost {
        pub fn log(&self) -> std::cell::Ref<'_, HostLog> {
            self.0.borrow()
        }
    }

    impl Host for RecordingHost {
        fn prompt_open_permission_settings(&mut self) {
            self.0.borrow_mut().prompts += 1;
        }

        fn notify_revoked_and_exit(&mut self, reason: RevocationReason) {
            self.0.borrow_mut().exits.push(reason);
        }

        fn permission_state_changed(&mut self, from: PermissionState, to: PermissionState) {
            self.0.borrow_mut().transitions.push((from, to));
        }
    }
}
