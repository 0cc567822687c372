//! Condition Polling
//!
//! Sleep-and-resample synchronization against a [`Probe`]. All polling is
//! blocking and single-threaded with respect to the caller: the only
//! suspension points are the sleeps between samples, and the only
//! cancellation is deadline expiry.
//!
//! Transient probe errors during sampling are absorbed as
//! predicate-false, so a not-yet-rendered element is indistinguishable
//! from one that does not satisfy the predicate.

use crate::probe::{appeared, disappeared, Probe};
use crate::result::{EsperarError, EsperarResult};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for wait operations (30 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 30_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

// =============================================================================
// WAIT SPEC
// =============================================================================

/// Timing contract for one wait call.
///
/// A zero timeout means "check once, no retry" - exactly one sample is
/// taken. The poll interval must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitSpec {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitSpec {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitSpec {
    /// Create a spec with default timing
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-sample spec: check once, no retry
    #[must_use]
    pub const fn once() -> Self {
        Self {
            timeout_ms: 0,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Validate the spec invariants
    pub fn validate(&self) -> EsperarResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(EsperarError::InvalidConfiguration {
                message: "poll interval must be positive".to_string(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// WAIT OUTCOME
// =============================================================================

/// Result of one wait call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitOutcome {
    /// Whether the predicate was satisfied before the deadline
    pub satisfied: bool,
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of samples taken
    pub samples: u32,
    /// Description of what was waited for
    pub waited_for: String,
}

impl WaitOutcome {
    /// Create a satisfied outcome
    #[must_use]
    pub fn satisfied(elapsed: Duration, samples: u32, waited_for: impl Into<String>) -> Self {
        Self {
            satisfied: true,
            elapsed,
            samples,
            waited_for: waited_for.into(),
        }
    }

    /// Create a deadline-expired outcome
    #[must_use]
    pub fn deadline(elapsed: Duration, samples: u32, waited_for: impl Into<String>) -> Self {
        Self {
            satisfied: false,
            elapsed,
            samples,
            waited_for: waited_for.into(),
        }
    }
}

// =============================================================================
// TWO-PHASE STATE
// =============================================================================

/// Phase of an appear-then-disappear wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    WaitingForAppearance,
    WaitingForDisappearance,
}

// =============================================================================
// POLLER
// =============================================================================

/// Condition poller: samples a predicate until it holds or the deadline
/// elapses.
///
/// # Example
///
/// ```
/// use esperar::{Poller, ScriptedProbe, WaitSpec};
///
/// let poller = Poller::new();
/// let probe = ScriptedProbe::visible_after(2);
/// let spec = WaitSpec::new().with_timeout(500).with_poll_interval(10);
/// let outcome = poller.wait_for_appearance(&probe, &spec).unwrap();
/// assert!(outcome.satisfied);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Poller;

impl Poller {
    /// Create a new poller
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Wait for an arbitrary predicate over a probe.
    ///
    /// Samples `predicate(probe)` once per interval. A sample that errors
    /// counts as predicate-false. Returns `Ok` with a [`WaitOutcome`]
    /// whether or not the predicate was satisfied; only an invalid spec
    /// is an error.
    pub fn wait_for<F>(
        &self,
        probe: &dyn Probe,
        predicate: F,
        spec: &WaitSpec,
        waited_for: &str,
    ) -> EsperarResult<WaitOutcome>
    where
        F: Fn(&dyn Probe) -> EsperarResult<bool>,
    {
        spec.validate()?;
        let start = Instant::now();
        let mut samples: u32 = 0;

        loop {
            samples += 1;
            // Probe errors read as "not yet satisfied".
            let holds = predicate(probe).unwrap_or(false);
            trace!(waited_for, sample = samples, holds, "poll sample");

            if holds {
                let outcome = WaitOutcome::satisfied(start.elapsed(), samples, waited_for);
                debug!(
                    waited_for,
                    samples,
                    elapsed_ms = outcome.elapsed.as_millis() as u64,
                    "wait satisfied"
                );
                return Ok(outcome);
            }
            if start.elapsed() >= spec.timeout() {
                let outcome = WaitOutcome::deadline(start.elapsed(), samples, waited_for);
                debug!(
                    waited_for,
                    samples,
                    timeout_ms = spec.timeout_ms,
                    "wait deadline elapsed"
                );
                return Ok(outcome);
            }
            std::thread::sleep(spec.poll_interval());
        }
    }

    /// Wait for the element to appear (exists and visible)
    pub fn wait_for_appearance(
        &self,
        probe: &dyn Probe,
        spec: &WaitSpec,
    ) -> EsperarResult<WaitOutcome> {
        let waited_for = format!("{} to appear", probe.description());
        self.wait_for(probe, appeared, spec, &waited_for)
    }

    /// Wait for the element to disappear (absent or not visible)
    pub fn wait_for_disappearance(
        &self,
        probe: &dyn Probe,
        spec: &WaitSpec,
    ) -> EsperarResult<WaitOutcome> {
        let waited_for = format!("{} to disappear", probe.description());
        self.wait_for(probe, disappeared, spec, &waited_for)
    }

    /// Wait for the element to appear and then disappear, under one
    /// shared deadline.
    ///
    /// Two-phase wait: first polls for appearance, then - from the next
    /// sample on - for disappearance. If the deadline expires before the
    /// element ever appears, the outcome is unsatisfied; there is no
    /// transition on timeout.
    pub fn wait_for_appearance_then_disappearance(
        &self,
        probe: &dyn Probe,
        spec: &WaitSpec,
    ) -> EsperarResult<WaitOutcome> {
        spec.validate()?;
        let waited_for = format!("{} to appear then disappear", probe.description());
        let start = Instant::now();
        let mut samples: u32 = 0;
        let mut phase = Phase::WaitingForAppearance;

        loop {
            samples += 1;
            match phase {
                Phase::WaitingForAppearance => {
                    if appeared(probe).unwrap_or(false) {
                        trace!(%waited_for, sample = samples, "appearance observed");
                        // A sample that shows the element visible cannot
                        // also count as its disappearance.
                        phase = Phase::WaitingForDisappearance;
                    }
                }
                Phase::WaitingForDisappearance => {
                    if disappeared(probe).unwrap_or(false) {
                        let outcome =
                            WaitOutcome::satisfied(start.elapsed(), samples, &waited_for);
                        debug!(%waited_for, samples, "appear-then-disappear satisfied");
                        return Ok(outcome);
                    }
                }
            }
            if start.elapsed() >= spec.timeout() {
                debug!(
                    %waited_for,
                    samples,
                    phase = ?phase,
                    "appear-then-disappear deadline elapsed"
                );
                return Ok(WaitOutcome::deadline(start.elapsed(), samples, &waited_for));
            }
            std::thread::sleep(spec.poll_interval());
        }
    }

    /// Wait for appearance, raising [`EsperarError::TimeoutExceeded`] if
    /// the deadline elapses
    pub fn expect_appearance(
        &self,
        probe: &dyn Probe,
        spec: &WaitSpec,
    ) -> EsperarResult<WaitOutcome> {
        let outcome = self.wait_for_appearance(probe, spec)?;
        if outcome.satisfied {
            Ok(outcome)
        } else {
            Err(EsperarError::TimeoutExceeded {
                action: outcome.waited_for,
                ms: spec.timeout_ms,
            })
        }
    }

    /// Wait for disappearance, raising [`EsperarError::TimeoutExceeded`]
    /// if the deadline elapses
    pub fn expect_disappearance(
        &self,
        probe: &dyn Probe,
        spec: &WaitSpec,
    ) -> EsperarResult<WaitOutcome> {
        let outcome = self.wait_for_disappearance(probe, spec)?;
        if outcome.satisfied {
            Ok(outcome)
        } else {
            Err(EsperarError::TimeoutExceeded {
                action: outcome.waited_for,
                ms: spec.timeout_ms,
            })
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
