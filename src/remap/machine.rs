//! Core remap state machine
//!
//! Turns Caps Lock activations into input source switches and keeps the
//! Caps Lock modifier out of ordinary typing.

use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::hotkey::{DisableReason, EventDecision, EventKind, KeyEvent, TriggerKey};
use crate::input_source::{InputSourceDirectory, InputSourceProvider, SwitchError};
use crate::timer::{TimerSlot, TimerToken};

/// Whether a trigger activation has fired and not yet been reset
#[derive(Debug)]
pub struct TriggerKeyState {
    armed_by: Option<TimerToken>,
    debounce: TimerSlot,
}

impl TriggerKeyState {
    fn new() -> Self {
        Self {
            armed_by: None,
            debounce: TimerSlot::new("debounce"),
        }
    }

    /// Armed until the debounce schedule that armed it fires or is cancelled
    pub fn is_armed(&self) -> bool {
        self.armed_by.map_or(false, |token| self.debounce.is_live(token))
    }
}

/// The remap state machine
pub struct RemapMachine<P> {
    trigger: TriggerKey,
    debounce: Duration,
    state: TriggerKeyState,
    directory: InputSourceDirectory<P>,
    switches: u64,
}

impl<P: InputSourceProvider> RemapMachine<P> {
    /// Create a machine for `trigger` that switches through `directory`
    pub fn new(
        trigger: TriggerKey,
        debounce: Duration,
        directory: InputSourceDirectory<P>,
    ) -> Self {
        Self {
            trigger,
            debounce,
            state: TriggerKeyState::new(),
            directory,
            switches: 0,
        }
    }

    #[cfg(test)]
    pub fn trigger_state(&self) -> &TriggerKeyState {
        &self.state
    }

    /// Number of cyclic switches invoked so far
    #[cfg(test)]
    pub fn switches(&self) -> u64 {
        self.switches
    }

    /// Decide what happens to one delivered event
    pub fn on_event(&mut self, event: &KeyEvent, now: Instant) -> EventDecision {
        match event.kind {
            EventKind::FlagsChanged if event.keycode == self.trigger.keycode => {
                self.handle_trigger(event, now);
                // The trigger key's native effect must never happen
                EventDecision::Suppress
            }
            EventKind::KeyDown | EventKind::KeyUp => self.strip_trigger_flag(event),
            EventKind::TapDisabledByTimeout => EventDecision::FatalDisable(DisableReason::Timeout),
            EventKind::TapDisabledByUserInput => {
                EventDecision::FatalDisable(DisableReason::UserInput)
            }
            EventKind::FlagsChanged | EventKind::Other => EventDecision::PassThrough,
        }
    }

    /// Fire the debounce reset if it is due
    pub fn on_tick(&mut self, now: Instant) {
        if self.state.debounce.fire_if_due(now) {
            trace!("trigger debounce elapsed");
            self.state.armed_by = None;
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.state.debounce.deadline()
    }

    /// Drop any pending debounce and disarm
    pub fn reset(&mut self) {
        self.state.debounce.cancel();
        self.state.armed_by = None;
    }

    fn handle_trigger(&mut self, event: &KeyEvent, now: Instant) {
        // A window that ran out before the loop got to tick is over already
        self.on_tick(now);

        let active = event.flags.contains(self.trigger.flag);
        let armed = self.state.is_armed();
        if !active || armed {
            trace!(active, armed, "trigger event ignored");
            return;
        }

        // No reliable release edge arrives for this key, so self-reset on a timer
        let token = self.state.debounce.schedule_once(now, self.debounce);
        self.state.armed_by = Some(token);
        self.switches += 1;

        match self.directory.cycle_to_next() {
            Ok(switch) => debug!(%switch, total = self.switches, "input source switched"),
            Err(e @ SwitchError::CurrentNotFound { .. }) => debug!(%e, "switch skipped"),
            Err(e) => warn!(%e, "input source switch failed"),
        }
    }

    fn strip_trigger_flag(&self, event: &KeyEvent) -> EventDecision {
        if event.flags.contains(self.trigger.flag) {
            EventDecision::PassModified(KeyEvent {
                flags: event.flags.without(self.trigger.flag),
                ..*event
            })
        } else {
            EventDecision::PassThrough
        }
    }
}
