//! CFRunLoop slices for the event loop

use std::thread;
use std::time::Duration;

use core_foundation::runloop::{kCFRunLoopDefaultMode, CFRunLoop, CFRunLoopRunResult};

use crate::lifecycle::RunLoop;

/// The current thread's CFRunLoop
#[derive(Debug, Default)]
pub struct CfRunLoop;

impl RunLoop for CfRunLoop {
    fn run_for(&mut self, max: Duration) {
        let result = unsafe { CFRunLoop::run_in_mode(kCFRunLoopDefaultMode, max, true) };

        // No sources attached yet (still polling for permission): nothing
        // to wait on, so sleep the slice instead of spinning
        if let CFRunLoopRunResult::Finished = result {
            thread::sleep(max);
        }
    }
}
