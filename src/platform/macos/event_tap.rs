//! CGEventTap-backed interception point
//!
//! The tap is an active (event-modifying) session tap attached to the
//! current thread's CFRunLoop. Its callback runs synchronously on that
//! thread, so it must return quickly or macOS disables the tap.

use std::cell::RefCell;
use std::ffi::c_void;

use core_foundation::base::TCFType;
use core_foundation::runloop::{kCFRunLoopCommonModes, CFRunLoop, CFRunLoopSource};
use core_graphics::event::{
    CGEvent, CGEventFlags, CGEventTap, CGEventTapLocation, CGEventTapOptions,
    CGEventTapPlacement, CGEventTapProxy, CGEventType, EventField,
};
use tracing::debug;

use crate::gateway::{EventCallback, InstallError, Interceptor};
use crate::hotkey::{EventDecision, EventKind, KeyEvent, ModifierFlags};

extern "C" {
    fn CGEventTapEnable(tap: *const c_void, enable: bool);
}

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    fn CFMachPortInvalidate(port: *const c_void);
}

/// An installed tap and the run loop it is attached to
pub struct MacTap {
    tap: CGEventTap<'static>,
    source: CFRunLoopSource,
    run_loop: CFRunLoop,
}

/// Installs session-level keyboard taps on the current run loop
#[derive(Debug, Default)]
pub struct CgEventInterceptor;

impl Interceptor for CgEventInterceptor {
    type Tap = MacTap;

    fn install(
        &mut self,
        kinds: &[EventKind],
        callback: EventCallback,
    ) -> Result<MacTap, InstallError> {
        let callback = RefCell::new(callback);
        let events_of_interest = kinds.iter().filter_map(|k| cg_event_type(*k)).collect();

        let tap = CGEventTap::new(
            CGEventTapLocation::Session,
            CGEventTapPlacement::HeadInsertEventTap,
            CGEventTapOptions::Default,
            events_of_interest,
            move |_proxy: CGEventTapProxy, event_type: CGEventType, event: &CGEvent| {
                let key_event = to_key_event(event_type, event);
                let decision = match callback.try_borrow_mut() {
                    Ok(mut handle) => (*handle)(&key_event),
                    Err(_) => EventDecision::PassThrough,
                };
                apply(decision, event);
                // `None` forwards the event, possibly mutated
                None
            },
        )
        .map_err(|()| InstallError::PermissionDenied)?;

        let source = tap
            .mach_port
            .create_runloop_source(0)
            .map_err(|()| InstallError::RunLoopSource)?;
        let run_loop = CFRunLoop::get_current();

        unsafe {
            run_loop.add_source(&source, kCFRunLoopCommonModes);
        }
        tap.enable();

        Ok(MacTap {
            tap,
            source,
            run_loop,
        })
    }

    fn uninstall(&mut self, tap: MacTap) {
        let port = tap.tap.mach_port.as_concrete_TypeRef() as *const c_void;
        unsafe {
            CGEventTapEnable(port, false);
            tap.run_loop.remove_source(&tap.source, kCFRunLoopCommonModes);
            CFMachPortInvalidate(port);
        }
        debug!("event tap invalidated");
    }
}

fn cg_event_type(kind: EventKind) -> Option<CGEventType> {
    match kind {
        EventKind::FlagsChanged => Some(CGEventType::FlagsChanged),
        EventKind::KeyDown => Some(CGEventType::KeyDown),
        EventKind::KeyUp => Some(CGEventType::KeyUp),
        _ => None,
    }
}

fn to_key_event(event_type: CGEventType, event: &CGEvent) -> KeyEvent {
    let kind = match event_type {
        CGEventType::FlagsChanged => EventKind::FlagsChanged,
        CGEventType::KeyDown => EventKind::KeyDown,
        CGEventType::KeyUp => EventKind::KeyUp,
        CGEventType::TapDisabledByTimeout => EventKind::TapDisabledByTimeout,
        CGEventType::TapDisabledByUserInput => EventKind::TapDisabledByUserInput,
        _ => EventKind::Other,
    };

    match kind {
        EventKind::FlagsChanged | EventKind::KeyDown | EventKind::KeyUp => KeyEvent::new(
            kind,
            ModifierFlags::from_bits(event.get_flags().bits()),
            event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE) as u16,
        ),
        _ => KeyEvent::new(kind, ModifierFlags::default(), 0),
    }
}

fn apply(decision: EventDecision, event: &CGEvent) {
    match decision {
        EventDecision::Suppress => event.set_type(CGEventType::Null),
        EventDecision::PassModified(out) => {
            event.set_flags(stripped_flags(event.get_flags(), out.flags))
        }
        EventDecision::PassThrough | EventDecision::FatalDisable(_) => {}
    }
}

/// `current` minus whatever `out` dropped; device-dependent bits survive
fn stripped_flags(current: CGEventFlags, out: ModifierFlags) -> CGEventFlags {
    let cleared = ModifierFlags::from_bits(current.bits()).cleared_in(out);
    let mut flags = current;
    flags.remove(CGEventFlags::from_bits_truncate(cleared.bits()));
    flags
}
