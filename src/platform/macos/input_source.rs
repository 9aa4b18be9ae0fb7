//! Carbon Text Input Sources (TIS) directory
//!
//! HIToolbox asserts these calls happen on the main thread, which is where
//! the daemon runs its loop.

use std::ffi::c_void;

use core_foundation::array::{CFArray, CFArrayRef};
use core_foundation::base::{Boolean, CFType, CFTypeRef, TCFType};
use core_foundation::boolean::{CFBoolean, CFBooleanRef};
use core_foundation::dictionary::{CFDictionary, CFDictionaryRef};
use core_foundation::string::{CFString, CFStringRef};

use crate::input_source::{
    InputSource, InputSourceProvider, SourceCategory, SourceFilter, SourceKind, SwitchError,
};

type TISInputSourceRef = *const c_void;

#[link(name = "Carbon", kind = "framework")]
extern "C" {
    fn TISCreateInputSourceList(
        properties: CFDictionaryRef,
        include_all_installed: Boolean,
    ) -> CFArrayRef;
    fn TISCopyCurrentKeyboardInputSource() -> TISInputSourceRef;
    fn TISGetInputSourceProperty(source: TISInputSourceRef, key: CFStringRef) -> *const c_void;
    fn TISSelectInputSource(source: TISInputSourceRef) -> i32;

    static kTISPropertyInputSourceID: CFStringRef;
    static kTISPropertyInputSourceIsSelectCapable: CFStringRef;
    static kTISPropertyInputSourceType: CFStringRef;
    static kTISPropertyInputSourceCategory: CFStringRef;

    static kTISTypeKeyboardLayout: CFStringRef;
    static kTISTypeKeyboardInputMethodWithoutModes: CFStringRef;
    static kTISTypeKeyboardInputMode: CFStringRef;

    static kTISCategoryKeyboardInputSource: CFStringRef;
    static kTISCategoryPaletteInputSource: CFStringRef;
    static kTISCategoryInkInputSource: CFStringRef;
}

/// Input source provider backed by the TIS API
#[derive(Debug, Default)]
pub struct TisProvider;

impl InputSourceProvider for TisProvider {
    fn list_sources(&self, filter: &SourceFilter) -> Result<Vec<InputSource>, SwitchError> {
        let properties = unsafe { filter_properties(filter) };
        let sources = unsafe { create_list(&properties)? };

        Ok(sources
            .iter()
            .filter_map(|item| unsafe { describe(item.as_CFTypeRef()) })
            .collect())
    }

    fn current_source(&self) -> Result<InputSource, SwitchError> {
        unsafe {
            let raw = TISCopyCurrentKeyboardInputSource();
            if raw.is_null() {
                return Err(SwitchError::SourcesUnavailable);
            }
            // Copy rule: released when `owned` drops
            let owned = CFType::wrap_under_create_rule(raw as CFTypeRef);
            describe(owned.as_CFTypeRef()).ok_or(SwitchError::SourcesUnavailable)
        }
    }

    fn select(&self, source: &InputSource) -> Result<(), SwitchError> {
        unsafe {
            let key = CFString::wrap_under_get_rule(kTISPropertyInputSourceID);
            let id = CFString::new(&source.id);
            let properties = CFDictionary::from_CFType_pairs(&[(key, id.as_CFType())]);

            let matches = create_list(&properties)?;
            let Some(target) = matches.iter().next() else {
                return Err(SwitchError::SourcesUnavailable);
            };

            let status = TISSelectInputSource(target.as_CFTypeRef());
            if status != 0 {
                return Err(SwitchError::SelectFailed {
                    id: source.id.clone(),
                    status,
                });
            }
        }
        Ok(())
    }
}

unsafe fn create_list(
    properties: &CFDictionary<CFString, CFType>,
) -> Result<CFArray<CFType>, SwitchError> {
    let raw = TISCreateInputSourceList(properties.as_concrete_TypeRef(), 0);
    if raw.is_null() {
        return Err(SwitchError::SourcesUnavailable);
    }
    Ok(CFArray::wrap_under_create_rule(raw))
}

unsafe fn filter_properties(filter: &SourceFilter) -> CFDictionary<CFString, CFType> {
    let pairs = [
        (
            CFString::wrap_under_get_rule(kTISPropertyInputSourceIsSelectCapable),
            CFBoolean::from(filter.selectable).as_CFType(),
        ),
        (
            CFString::wrap_under_get_rule(kTISPropertyInputSourceType),
            kind_value(&filter.kind).as_CFType(),
        ),
        (
            CFString::wrap_under_get_rule(kTISPropertyInputSourceCategory),
            category_value(&filter.category).as_CFType(),
        ),
    ];
    CFDictionary::from_CFType_pairs(&pairs)
}

unsafe fn describe(source: TISInputSourceRef) -> Option<InputSource> {
    let id = string_property(source, kTISPropertyInputSourceID)?;
    let selectable = bool_property(source, kTISPropertyInputSourceIsSelectCapable).unwrap_or(false);
    let kind = string_property(source, kTISPropertyInputSourceType)
        .map(|s| parse_kind(&s))
        .unwrap_or_else(|| SourceKind::Other(String::new()));
    let category = string_property(source, kTISPropertyInputSourceCategory)
        .map(|s| parse_category(&s))
        .unwrap_or_else(|| SourceCategory::Other(String::new()));

    Some(InputSource {
        id,
        selectable,
        kind,
        category,
    })
}

unsafe fn string_property(source: TISInputSourceRef, key: CFStringRef) -> Option<String> {
    let raw = TISGetInputSourceProperty(source, key);
    if raw.is_null() {
        return None;
    }
    Some(CFString::wrap_under_get_rule(raw as CFStringRef).to_string())
}

unsafe fn bool_property(source: TISInputSourceRef, key: CFStringRef) -> Option<bool> {
    let raw = TISGetInputSourceProperty(source, key);
    if raw.is_null() {
        return None;
    }
    Some(CFBoolean::wrap_under_get_rule(raw as CFBooleanRef).into())
}

unsafe fn kind_value(kind: &SourceKind) -> CFString {
    match kind {
        SourceKind::KeyboardLayout => CFString::wrap_under_get_rule(kTISTypeKeyboardLayout),
        SourceKind::KeyboardInputMethod => {
            CFString::wrap_under_get_rule(kTISTypeKeyboardInputMethodWithoutModes)
        }
        SourceKind::KeyboardInputMode => CFString::wrap_under_get_rule(kTISTypeKeyboardInputMode),
        SourceKind::Other(raw) => CFString::new(raw),
    }
}

unsafe fn category_value(category: &SourceCategory) -> CFString {
    match category {
        SourceCategory::KeyboardInput => {
            CFString::wrap_under_get_rule(kTISCategoryKeyboardInputSource)
        }
        SourceCategory::PaletteInput => {
            CFString::wrap_under_get_rule(kTISCategoryPaletteInputSource)
        }
        SourceCategory::InkInput => CFString::wrap_under_get_rule(kTISCategoryInkInputSource),
        SourceCategory::Other(raw) => CFString::new(raw),
    }
}

unsafe fn parse_kind(raw: &str) -> SourceKind {
    let known = [
        SourceKind::KeyboardLayout,
        SourceKind::KeyboardInputMethod,
        SourceKind::KeyboardInputMode,
    ];
    known
        .into_iter()
        .find(|kind| kind_value(kind).to_string() == raw)
        .unwrap_or_else(|| SourceKind::Other(raw.to_string()))
}

unsafe fn parse_category(raw: &str) -> SourceCategory {
    let known = [
        SourceCategory::KeyboardInput,
        SourceCategory::PaletteInput,
        SourceCategory::InkInput,
    ];
    known
        .into_iter()
        .find(|category| category_value(category).to_string() == raw)
        .unwrap_or_else(|| SourceCategory::Other(raw.to_string()))
}
