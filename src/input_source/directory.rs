//! Ordered directory of keyboard input sources and the cyclic switch

use std::fmt;

use tracing::debug;

/// Kind of input source as reported by the OS
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    KeyboardLayout,
    KeyboardInputMethod,
    KeyboardInputMode,
    Other(String),
}

/// Category of input source as reported by the OS
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCategory {
    KeyboardInput,
    PaletteInput,
    InkInput,
    Other(String),
}

/// One entry of the OS input source directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSource {
    /// Opaque identifier, e.g. `com.apple.keylayout.US`
    pub id: String,
    pub selectable: bool,
    pub kind: SourceKind,
    pub category: SourceCategory,
}

impl InputSource {
    /// A selectable keyboard layout, the only shape that takes part in the cycle
    #[cfg(test)]
    pub fn keyboard_layout(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            selectable: true,
            kind: SourceKind::KeyboardLayout,
            category: SourceCategory::KeyboardInput,
        }
    }
}

/// Property filter applied when listing sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFilter {
    pub selectable: bool,
    pub kind: SourceKind,
    pub category: SourceCategory,
}

impl SourceFilter {
    /// Selectable keyboard layouts in the keyboard input category
    pub fn keyboard_layouts() -> Self {
        Self {
            selectable: true,
            kind: SourceKind::KeyboardLayout,
            category: SourceCategory::KeyboardInput,
        }
    }

    pub fn matches(&self, source: &InputSource) -> bool {
        source.selectable == self.selectable
            && source.kind == self.kind
            && source.category == self.category
    }
}

/// Errors from the input source subsystem
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SwitchError {
    #[error("input source directory unavailable")]
    SourcesUnavailable,

    #[error("current input source {id:?} is not among the selectable layouts")]
    CurrentNotFound { id: String },

    #[error("failed to select input source {id:?} (status {status})")]
    SelectFailed { id: String, status: i32 },
}

/// OS collaborator that owns the real input source directory
pub trait InputSourceProvider {
    /// Sources matching `filter`, in directory order
    fn list_sources(&self, filter: &SourceFilter) -> Result<Vec<InputSource>, SwitchError>;

    /// The currently active keyboard input source
    fn current_source(&self) -> Result<InputSource, SwitchError>;

    /// Make `source` the active input source
    fn select(&self, source: &InputSource) -> Result<(), SwitchError>;
}

/// A completed switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSwitch {
    pub from: String,
    pub to: String,
}

impl fmt::Display for SourceSwitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Cycles through the selectable keyboard layouts
pub struct InputSourceDirectory<P> {
    provider: P,
    filter: SourceFilter,
}

impl<P: InputSourceProvider> InputSourceDirectory<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            filter: SourceFilter::keyboard_layouts(),
        }
    }

    /// Activate the source after the current one, wrapping around.
    ///
    /// The list is fetched fresh on every call; the OS-visible set can
    /// change between invocations. Order is whatever the OS returns.
    pub fn cycle_to_next(&self) -> Result<SourceSwitch, SwitchError> {
        let sources: Vec<InputSource> = self
            .provider
            .list_sources(&self.filter)?
            .into_iter()
            .filter(|s| self.filter.matches(s))
            .collect();

        let current = self.provider.current_source()?;
        let index = sources
            .iter()
            .position(|s| s.id == current.id)
            .ok_or_else(|| SwitchError::CurrentNotFound {
                id: current.id.clone(),
            })?;

        let next = &sources[(index + 1) % sources.len()];
        debug!(
            from = %current.id,
            to = %next.id,
            count = sources.len(),
            "selecting next input source"
        );
        self.provider.select(next)?;

        Ok(SourceSwitch {
            from: current.id,
            to: next.id.clone(),
        })
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    /// In-memory input source directory
    #[derive(Clone, Default)]
    pub struct FakeProvider {
        inner: Rc<RefCell<FakeSources>>,
    }

    #[derive(Default)]
    struct FakeSources {
        sources: Vec<InputSource>,
        current: Option<String>,
        selected: Vec<String>,
        fail_select: bool,
    }

    impl FakeProvider {
        pub fn with_layouts(ids: &[&str], current: &str) -> Self {
            let provider = Self::default();
            {
                let mut inner = provider.inner.borrow_mut();
                inner.sources = ids.iter().map(|id| InputSource::keyboard_layout(*id)).collect();
                inner.current = Some(current.to_string());
            }
            provider
        }

        pub fn push_source(&self, source: InputSource) {
            self.inner.borrow_mut().sources.push(source);
        }

        pub fn fail_select(&self) {
            self.inner.borrow_mut().fail_select = true;
        }

        pub fn current(&self) -> Option<String> {
            self.inner.borrow().current.clone()
        }

        /// Ids passed to `select`, in call order
        pub fn selected(&self) -> Vec<String> {
            self.inner.borrow().selected.clone()
        }
    }

    impl InputSourceProvider for FakeProvider {
        fn list_sources(&self, _filter: &SourceFilter) -> Result<Vec<InputSource>, SwitchError> {
            // Deliberately unfiltered: the directory must filter on its own
            Ok(self.inner.borrow().sources.clone())
        }

        fn current_source(&self) -> Result<InputSource, SwitchError> {
            self.inner
                .borrow()
                .current
                .as_deref()
                .map(InputSource::keyboard_layout)
                .ok_or(SwitchError::SourcesUnavailable)
        }

        fn select(&self, source: &InputSource) -> Result<(), SwitchError> {
            let mut inner = self.inner.borrow_mut();
            if inner.fail_select {
                return Err(SwitchError::SelectFailed {
                    id: source.id.clone(),
                    status: -50,
                });
            }
            inner.selected.push(source.id.clone());
            inner.current = Some(source.id.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeProvider;
    use super::*;

    #[test]
    fn test_next_after_middle() {
        let provider = FakeProvider::with_layouts(&["A", "B", "C"], "B");
        let directory = InputSourceDirectory::new(provider.clone());

        let switch = directory.cycle_to_next().unwrap();
        assert_eq!(switch.from, "B");
        assert_eq!(switch.to, "C");
        assert_eq!(provider.selected(), vec!["C"]);
    }

    #[test]
    fn test_wraps_from_last_to_first() {
        let provider = FakeProvider::with_layouts(&["A", "B", "C"], "C");
        let directory = InputSourceDirectory::new(provider.clone());

        directory.cycle_to_next().unwrap();
        assert_eq!(provider.selected(), vec!["A"]);
    }

    #[test]
    fn test_returns_to_start_after_n_calls() {
        for n in 1..=5 {
            let ids: Vec<String> = (0..n).map(|i| format!("layout.{i}")).collect();
            let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
            let provider = FakeProvider::with_layouts(&refs, "layout.0");
            let directory = InputSourceDirectory::new(provider.clone());

            for _ in 0..n {
                directory.cycle_to_next().unwrap();
            }
            assert_eq!(provider.current().as_deref(), Some("layout.0"), "n = {n}");
            assert_eq!(provider.selected().len(), n);
        }
    }

    #[test]
    fn test_single_source_reselects_itself() {
        let us = "com.apple.keylayout.US";
        let provider = FakeProvider::with_layouts(&[us], us);
        let directory = InputSourceDirectory::new(provider.clone());

        let switch = directory.cycle_to_next().unwrap();
        assert_eq!(switch.from, switch.to);
        assert_eq!(provider.selected(), vec!["com.apple.keylayout.US"]);
    }

    #[test]
    fn test_current_absent_makes_no_selection() {
        let provider = FakeProvider::with_layouts(&["A", "B"], "com.apple.inputmethod.Kotoeri");
        let directory = InputSourceDirectory::new(provider.clone());

        let err = directory.cycle_to_next().unwrap_err();
        assert_eq!(
            err,
            SwitchError::CurrentNotFound {
                id: "com.apple.inputmethod.Kotoeri".to_string()
            }
        );
        assert!(provider.selected().is_empty());
    }

    #[test]
    fn test_empty_directory_is_current_not_found() {
        let provider = FakeProvider::with_layouts(&[], "A");
        let directory = InputSourceDirectory::new(provider.clone());

        assert!(matches!(
            directory.cycle_to_next(),
            Err(SwitchError::CurrentNotFound { .. })
        ));
    }

    #[test]
    fn test_filter_skips_non_layouts_and_keeps_order() {
        let provider = FakeProvider::with_layouts(&["A"], "A");
        provider.push_source(InputSource {
            id: "palette".to_string(),
            selectable: true,
            kind: SourceKind::Other("TISTypeCharacterPalette".to_string()),
            category: SourceCategory::PaletteInput,
        });
        provider.push_source(InputSource {
            selectable: false,
            ..InputSource::keyboard_layout("hidden")
        });
        provider.push_source(InputSource::keyboard_layout("B"));
        let directory = InputSourceDirectory::new(provider.clone());

        directory.cycle_to_next().unwrap();
        assert_eq!(provider.selected(), vec!["B"]);
    }

    #[test]
    fn test_select_failure_propagates() {
        let provider = FakeProvider::with_layouts(&["A", "B"], "A");
        provider.fail_select();
        let directory = InputSourceDirectory::new(provider);

        assert!(matches!(
            directory.cycle_to_next(),
            Err(SwitchError::SelectFailed { status: -50, .. })
        ));
    }
}
