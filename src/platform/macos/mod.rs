//! macOS collaborators: CoreGraphics event tap, Carbon input sources,
//! Accessibility trust, CFRunLoop

mod event_tap;
mod input_source;
mod permission;
mod run_loop;

use std::rc::Rc;
use std::sync::atomic::AtomicBool;

use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::gateway::EventGateway;
use crate::hotkey::TriggerKey;
use crate::input_source::InputSourceDirectory;
use crate::lifecycle::{EventLoop, LoopExit};
use crate::permission::{Intervals, PermissionManager};
use crate::remap::RemapMachine;

use super::PlatformError;
use event_tap::CgEventInterceptor;
use input_source::TisProvider;
use permission::{AxTrust, SettingsHost};
use run_loop::CfRunLoop;

/// Run the daemon on the calling thread, which must be the main thread
pub fn run(config: &Config, running: &AtomicBool) -> Result<LoopExit, PlatformError> {
    let clock = Rc::new(SystemClock);
    let trigger = TriggerKey::CAPS_LOCK;

    let machine = RemapMachine::new(
        trigger,
        config.debounce,
        InputSourceDirectory::new(TisProvider),
    );
    let dyn_clock: Rc<dyn Clock> = clock.clone();
    let gateway = EventGateway::new(CgEventInterceptor, machine, dyn_clock);
    let manager = PermissionManager::new(
        gateway,
        AxTrust,
        SettingsHost::new(config.open_settings),
        Intervals::from(config),
    );

    info!(keycode = trigger.keycode, "remapping trigger key to input source switch");
    let event_loop = EventLoop::new(clock.as_ref(), config.loop_slice);
    Ok(event_loop.run(manager, &mut CfRunLoop, running))
}
