//! Probe Capability
//!
//! The observation boundary between the synchronization core and whatever
//! actually drives the UI. A probe is bound to one element (keyed by an
//! opaque locator owned by the caller) and exposes its state without
//! ownership semantics: the core only borrows a probe for the duration of
//! one wait call.
//!
//! Observation methods (`exists`, `is_visible`, `text`) are fallible so
//! that transient instability ("not found yet", stale handles) can be
//! absorbed by the poller as predicate-false. Action methods (`click`,
//! `set_value`) are ordinary fallible calls; their errors are surfaced,
//! never polled.

use crate::result::{EsperarError, EsperarResult};
use std::cell::{Cell, RefCell};

/// Capability for observing and driving one UI element.
///
/// Implement this trait over your browser-driver handle. Observation-only
/// probes (e.g., an error banner that is never clicked) can rely on the
/// default `click`/`set_value` implementations, which report the action
/// as unsupported.
pub trait Probe {
    /// Whether the element is currently attached to the page
    fn exists(&self) -> EsperarResult<bool>;

    /// Whether the element is currently visible
    fn is_visible(&self) -> EsperarResult<bool>;

    /// Visible text of the element, if any
    fn text(&self) -> EsperarResult<Option<String>> {
        Ok(None)
    }

    /// Click the element
    fn click(&self) -> EsperarResult<()> {
        Err(EsperarError::probe(format!(
            "{} does not support click",
            self.description()
        )))
    }

    /// Replace the element's value with `value`
    fn set_value(&self, value: &str) -> EsperarResult<()> {
        let _ = value;
        Err(EsperarError::probe(format!(
            "{} does not support set_value",
            self.description()
        )))
    }

    /// Human-readable description for step records and error messages
    fn description(&self) -> String {
        "element".to_string()
    }
}

/// The canonical "appeared" predicate: element exists and is visible
pub fn appeared(probe: &dyn Probe) -> EsperarResult<bool> {
    Ok(probe.exists()? && probe.is_visible()?)
}

/// The canonical "disappeared" predicate: element absent or not visible
pub fn disappeared(probe: &dyn Probe) -> EsperarResult<bool> {
    Ok(!probe.exists()? || !probe.is_visible()?)
}

// =============================================================================
// FUNCTION PROBE
// =============================================================================

/// An observation-only probe backed by a visibility closure
pub struct FnProbe<F: Fn() -> bool> {
    func: F,
    description: String,
}

impl<F: Fn() -> bool> std::fmt::Debug for FnProbe<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnProbe")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl<F: Fn() -> bool> FnProbe<F> {
    /// Create a probe whose existence and visibility track `func`
    pub fn new(func: F, description: impl Into<String>) -> Self {
        Self {
            func,
            description: description.into(),
        }
    }
}

impl<F: Fn() -> bool> Probe for FnProbe<F> {
    fn exists(&self) -> EsperarResult<bool> {
        Ok((self.func)())
    }

    fn is_visible(&self) -> EsperarResult<bool> {
        Ok((self.func)())
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

// =============================================================================
// SCRIPTED PROBE
// =============================================================================

/// One scripted observation for a [`ScriptedProbe`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeState {
    /// Element observed with the given presence/visibility/text
    Observed {
        /// Element is attached to the page
        present: bool,
        /// Element is visible
        visible: bool,
        /// Visible text, if any
        text: Option<String>,
    },
    /// Observation fails (simulates transient DOM instability)
    Unreachable,
}

impl ProbeState {
    /// Element absent from the page
    #[must_use]
    pub fn absent() -> Self {
        Self::Observed {
            present: false,
            visible: false,
            text: None,
        }
    }

    /// Element attached but not visible
    #[must_use]
    pub fn hidden() -> Self {
        Self::Observed {
            present: true,
            visible: false,
            text: None,
        }
    }

    /// Element visible, no text
    #[must_use]
    pub fn visible() -> Self {
        Self::Observed {
            present: true,
            visible: true,
            text: None,
        }
    }

    /// Element visible with the given text
    #[must_use]
    pub fn visible_with_text(text: impl Into<String>) -> Self {
        Self::Observed {
            present: true,
            visible: true,
            text: Some(text.into()),
        }
    }
}

/// Deterministic probe test double driven by a scripted state sequence.
///
/// Each call to [`Probe::exists`] consumes the next scripted state; the
/// canonical predicates call `exists` exactly once per poll sample, so a
/// script reads as one entry per sample. `is_visible` and `text` observe
/// the most recently consumed state without advancing. Once the script is
/// exhausted the last state holds.
#[derive(Debug)]
pub struct ScriptedProbe {
    states: Vec<ProbeState>,
    cursor: Cell<usize>,
    description: String,
    clicks: Cell<usize>,
    values: RefCell<Vec<String>>,
    fail_actions: bool,
}

impl ScriptedProbe {
    /// Create a probe that replays `states` one per sample
    #[must_use]
    pub fn new(states: Vec<ProbeState>) -> Self {
        Self {
            states,
            cursor: Cell::new(0),
            description: "scripted element".to_string(),
            clicks: Cell::new(0),
            values: RefCell::new(Vec::new()),
            fail_actions: false,
        }
    }

    /// Probe that is visible on every sample
    #[must_use]
    pub fn always_visible() -> Self {
        Self::new(vec![ProbeState::visible()])
    }

    /// Probe that is absent on every sample
    #[must_use]
    pub fn always_absent() -> Self {
        Self::new(vec![ProbeState::absent()])
    }

    /// Probe that is absent for `samples` samples, then visible
    #[must_use]
    pub fn visible_after(samples: usize) -> Self {
        let mut states = vec![ProbeState::absent(); samples];
        states.push(ProbeState::visible());
        Self::new(states)
    }

    /// Set the description used in step records and messages
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Make `click`/`set_value` fail (simulates a driver-level action error)
    #[must_use]
    pub fn with_failing_actions(mut self) -> Self {
        self.fail_actions = true;
        self
    }

    /// Number of samples consumed so far
    #[must_use]
    pub fn samples_taken(&self) -> usize {
        self.cursor.get()
    }

    /// Number of clicks performed
    #[must_use]
    pub fn click_count(&self) -> usize {
        self.clicks.get()
    }

    /// Values passed to `set_value`, in call order
    #[must_use]
    pub fn values_set(&self) -> Vec<String> {
        self.values.borrow().clone()
    }

    fn advance(&self) -> &ProbeState {
        let idx = self.cursor.get().min(self.states.len().saturating_sub(1));
        if self.cursor.get() < self.states.len() {
            self.cursor.set(self.cursor.get() + 1);
        }
        &self.states[idx]
    }

    fn current(&self) -> &ProbeState {
        let consumed = self.cursor.get();
        let idx = if consumed == 0 {
            0
        } else {
            (consumed - 1).min(self.states.len() - 1)
        };
        &self.states[idx]
    }
}

impl Probe for ScriptedProbe {
    fn exists(&self) -> EsperarResult<bool> {
        match self.advance() {
            ProbeState::Observed { present, .. } => Ok(*present),
            ProbeState::Unreachable => Err(EsperarError::probe("element unreachable")),
        }
    }

    fn is_visible(&self) -> EsperarResult<bool> {
        match self.current() {
            ProbeState::Observed { visible, .. } => Ok(*visible),
            ProbeState::Unreachable => Err(EsperarError::probe("element unreachable")),
        }
    }

    fn text(&self) -> EsperarResult<Option<String>> {
        match self.current() {
            ProbeState::Observed { text, .. } => Ok(text.clone()),
            ProbeState::Unreachable => Err(EsperarError::probe("element unreachable")),
        }
    }

    fn click(&self) -> EsperarResult<()> {
        if self.fail_actions {
            return Err(EsperarError::probe(format!(
                "click on {} intercepted",
                self.description
            )));
        }
        self.clicks.set(self.clicks.get() + 1);
        Ok(())
    }

    fn set_value(&self, value: &str) -> EsperarResult<()> {
        if self.fail_actions {
            return Err(EsperarError::probe(format!(
                "set_value on {} rejected",
                self.description
            )));
        }
        self.values.borrow_mut().push(value.to_string());
        Ok(())
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}
