//! Accessibility trust checks and the permission-facing host

use std::process::Command;

use core_foundation::base::TCFType;
use core_foundation::boolean::CFBoolean;
use core_foundation::dictionary::{CFDictionary, CFDictionaryRef};
use core_foundation::string::{CFString, CFStringRef};
use tracing::{debug, error, warn};

use crate::permission::{Host, RevocationReason, TrustQuery};

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    fn AXIsProcessTrusted() -> bool;
    fn AXIsProcessTrustedWithOptions(options: CFDictionaryRef) -> bool;
    static kAXTrustedCheckOptionPrompt: CFStringRef;
}

/// System Settings panes the user has to visit
const PRIVACY_PANES: [&str; 2] = [
    "x-apple.systempreferences:com.apple.preference.security?Privacy_InputMonitoring",
    "x-apple.systempreferences:com.apple.preference.security?Privacy_Accessibility",
];

/// Trust query backed by `AXIsProcessTrusted`
#[derive(Debug, Default)]
pub struct AxTrust;

impl TrustQuery for AxTrust {
    fn is_process_trusted(&self) -> bool {
        unsafe { AXIsProcessTrusted() }
    }
}

/// Host surfacing permission prompts through the system UI
#[derive(Debug)]
pub struct SettingsHost {
    open_settings: bool,
}

impl SettingsHost {
    pub fn new(open_settings: bool) -> Self {
        Self { open_settings }
    }
}

impl Host for SettingsHost {
    fn prompt_open_permission_settings(&mut self) {
        warn!("grant Accessibility and Input Monitoring access to enable the Caps Lock switch");
        request_trust_prompt();

        if self.open_settings {
            for pane in PRIVACY_PANES {
                open_url(pane);
            }
        }
    }

    fn notify_revoked_and_exit(&mut self, reason: RevocationReason) {
        error!(
            %reason,
            "Caps Lock switching stopped; re-grant the permission and relaunch capslang-daemon"
        );
    }
}

/// Ask the OS to show its own Accessibility prompt
fn request_trust_prompt() {
    unsafe {
        let key = CFString::wrap_under_get_rule(kAXTrustedCheckOptionPrompt);
        let options = CFDictionary::from_CFType_pairs(&[(key, CFBoolean::true_value())]);
        let trusted = AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef());
        debug!(trusted, "accessibility prompt requested");
    }
}

fn open_url(url: &str) {
    match Command::new("open").arg(url).status() {
        Ok(status) if status.success() => debug!(url, "opened settings pane"),
        Ok(status) => warn!(url, ?status, "open exited with failure"),
        Err(e) => warn!(url, ?e, "failed to run open"),
    }
}
