//! Outcome Race Resolution
//!
//! Decides whether a user action "succeeded" or "failed" when the
//! failure signal may or may not appear. Two contracts, both built on
//! the same sleep-and-resample loop as the poller:
//!
//! - **Failure-only**: poll a failure indicator for a short window tuned
//!   to how quickly an error banner would render. If it appears, the
//!   action failed with the text read at the moment of detection; if the
//!   window elapses quietly, the action succeeded. Absence of a failure
//!   signal - not observation of a success signal - is success.
//! - **Two-signal race**: poll a failure and a success indicator every
//!   interval; the first to appear wins. If both are true on the same
//!   sample, failure wins - a failure must never be masked by a
//!   simultaneously-true success indicator.
//!
//! The checked entry points additionally merge the buffered step trail
//! with a failure marker into one commit before raising, so a failed
//! action is both reported and surfaced.

use crate::probe::{appeared, Probe};
use crate::result::{EsperarError, EsperarResult};
use crate::step::StepLog;
use crate::wait::WaitSpec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

/// Fallback diagnostic when a failure indicator is visible but its text
/// cannot be read
pub const NO_DIAGNOSTIC_TEXT: &str = "no diagnostic text available";

/// Verdict of an outcome race
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// The action succeeded (explicit success signal, or failure window
    /// elapsed quietly)
    Success,
    /// The failure indicator appeared; carries the diagnostic text
    /// captured at detection time
    Failure(String),
    /// Neither signal appeared before the deadline (two-signal race
    /// only)
    TimedOut,
}

impl Outcome {
    /// Whether this outcome is a success
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Whether this outcome is a failure
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// The captured diagnostic, if this is a failure
    #[must_use]
    pub fn failure_text(&self) -> Option<&str> {
        match self {
            Self::Failure(text) => Some(text),
            _ => None,
        }
    }
}

/// Outcome race resolver.
///
/// # Example
///
/// ```
/// use esperar::{Outcome, Resolver, ScriptedProbe, WaitSpec};
///
/// let resolver = Resolver::new();
/// let error_banner = ScriptedProbe::always_absent();
/// let spec = WaitSpec::new().with_timeout(100).with_poll_interval(10);
/// let outcome = resolver.resolve(&error_banner, &spec).unwrap();
/// assert_eq!(outcome, Outcome::Success);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolver;

impl Resolver {
    /// Create a new resolver
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Failure-only resolution: watch `failure_probe` for the duration
    /// of the window. Deadline elapsing without the indicator appearing
    /// is [`Outcome::Success`].
    pub fn resolve(
        &self,
        failure_probe: &dyn Probe,
        spec: &WaitSpec,
    ) -> EsperarResult<Outcome> {
        spec.validate()?;
        let start = Instant::now();

        loop {
            if appeared(failure_probe).unwrap_or(false) {
                let text = capture_text(failure_probe);
                debug!(%text, "failure indicator appeared");
                return Ok(Outcome::Failure(text));
            }
            if start.elapsed() >= spec.timeout() {
                // No failure signal within the window: success.
                debug!(
                    window_ms = spec.timeout_ms,
                    "failure window elapsed quietly"
                );
                return Ok(Outcome::Success);
            }
            std::thread::sleep(spec.poll_interval());
        }
    }

    /// Two-signal race: first indicator to appear wins; failure wins a
    /// simultaneous-true sample. Deadline with neither is
    /// [`Outcome::TimedOut`].
    pub fn resolve_race(
        &self,
        failure_probe: &dyn Probe,
        success_probe: &dyn Probe,
        spec: &WaitSpec,
    ) -> EsperarResult<Outcome> {
        spec.validate()?;
        let start = Instant::now();

        loop {
            // Failure is checked first on every sample: a
            // simultaneously-true success indicator never masks it.
            if appeared(failure_probe).unwrap_or(false) {
                let text = capture_text(failure_probe);
                debug!(%text, "failure indicator won the race");
                return Ok(Outcome::Failure(text));
            }
            if appeared(success_probe).unwrap_or(false) {
                debug!("success indicator won the race");
                return Ok(Outcome::Success);
            }
            if start.elapsed() >= spec.timeout() {
                debug!(window_ms = spec.timeout_ms, "race deadline elapsed");
                return Ok(Outcome::TimedOut);
            }
            std::thread::sleep(spec.poll_interval());
        }
    }

    /// Checked failure-only resolution for one labelled action.
    ///
    /// On [`Outcome::Failure`] this writes one merge-on-failure commit
    /// carrying `label: text` to the step log's sink and returns
    /// [`EsperarError::ActionFailureDetected`] with the same message.
    /// Otherwise the outcome is returned and no step is recorded - the
    /// caller records its own success step.
    pub fn resolve_action(
        &self,
        failure_probe: &dyn Probe,
        spec: &WaitSpec,
        action_label: &str,
        log: &mut StepLog,
    ) -> EsperarResult<Outcome> {
        let outcome = self.resolve(failure_probe, spec)?;
        self.surface(outcome, action_label, log)
    }

    /// Checked two-signal resolution for one labelled action. Failure
    /// handling matches [`Resolver::resolve_action`]; `Success` and
    /// `TimedOut` are returned for the caller to judge.
    pub fn resolve_action_race(
        &self,
        failure_probe: &dyn Probe,
        success_probe: &dyn Probe,
        spec: &WaitSpec,
        action_label: &str,
        log: &mut StepLog,
    ) -> EsperarResult<Outcome> {
        let outcome = self.resolve_race(failure_probe, success_probe, spec)?;
        self.surface(outcome, action_label, log)
    }

    fn surface(
        &self,
        outcome: Outcome,
        action_label: &str,
        log: &mut StepLog,
    ) -> EsperarResult<Outcome> {
        match outcome {
            Outcome::Failure(text) => {
                let message = format!("{action_label}: {text}");
                warn!(%message, "action failure detected");
                log.commit_failure(&message)?;
                Err(EsperarError::ActionFailureDetected { message })
            }
            other => Ok(other),
        }
    }
}

/// Read the probe's text at the moment of detection
fn capture_text(probe: &dyn Probe) -> String {
    match probe.text() {
        Ok(Some(text)) => text,
        _ => NO_DIAGNOSTIC_TEXT.to_string(),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{ProbeState, ScriptedProbe};
    use crate::step::{MemorySink, StepMode};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn fast(timeout_ms: u64) -> WaitSpec {
        WaitSpec::new().with_timeout(timeout_ms).with_poll_interval(5)
    }

    mod outcome_tests {
        use super::*;

        #[test]
        fn test_accessors() {
            assert!(Outcome::Success.is_success());
            assert!(Outcome::Failure("x".to_string()).is_failure());
            assert!(!Outcome::TimedOut.is_success());
            assert_eq!(
                Outcome::Failure("boom".to_string()).failure_text(),
                Some("boom")
            );
            assert_eq!(Outcome::Success.failure_text(), None);
        }

        #[test]
        fn test_serde_round_trip() {
            let outcome = Outcome::Failure("Email already exists".to_string());
            let json = serde_json::to_string(&outcome).unwrap();
            let back: Outcome = serde_json::from_str(&json).unwrap();
            assert_eq!(back, outcome);
        }
    }

    mod failure_only_tests {
        use super::*;

        #[test]
        fn test_quiet_window_is_success() {
            let banner = ScriptedProbe::always_absent();
            let outcome = Resolver::new().resolve(&banner, &fast(60)).unwrap();
            assert_eq!(outcome, Outcome::Success);
        }

        #[test]
        fn test_success_takes_the_full_window() {
            let banner = ScriptedProbe::always_absent();
            let start = Instant::now();
            let outcome = Resolver::new().resolve(&banner, &fast(60)).unwrap();
            assert_eq!(outcome, Outcome::Success);
            // Success comes from the deadline elapsing, not instantly.
            assert!(start.elapsed() >= Duration::from_millis(60));
        }

        #[test]
        fn test_failure_captures_text_at_detection() {
            let banner = ScriptedProbe::new(vec![
                ProbeState::absent(),
                ProbeState::visible_with_text("Email already exists"),
            ]);
            let outcome = Resolver::new().resolve(&banner, &fast(200)).unwrap();
            assert_eq!(
                outcome,
                Outcome::Failure("Email already exists".to_string())
            );
        }

        #[test]
        fn test_failure_without_text_uses_fallback() {
            let banner = ScriptedProbe::always_visible();
            let outcome = Resolver::new().resolve(&banner, &fast(100)).unwrap();
            assert_eq!(outcome, Outcome::Failure(NO_DIAGNOSTIC_TEXT.to_string()));
        }

        #[test]
        fn test_transient_probe_errors_do_not_resolve() {
            let banner = ScriptedProbe::new(vec![
                ProbeState::Unreachable,
                ProbeState::visible_with_text("late error"),
            ]);
            let outcome = Resolver::new().resolve(&banner, &fast(200)).unwrap();
            assert_eq!(outcome, Outcome::Failure("late error".to_string()));
        }

        #[test]
        fn test_invalid_spec_rejected() {
            let banner = ScriptedProbe::always_absent();
            let spec = WaitSpec::new().with_poll_interval(0);
            assert!(matches!(
                Resolver::new().resolve(&banner, &spec),
                Err(EsperarError::InvalidConfiguration { .. })
            ));
        }
    }

    mod race_tests {
        use super::*;

        #[test]
        fn test_success_signal_wins() {
            let failure = ScriptedProbe::always_absent();
            let success = ScriptedProbe::always_visible();
            let outcome = Resolver::new()
                .resolve_race(&failure, &success, &fast(200))
                .unwrap();
            assert_eq!(outcome, Outcome::Success);
        }

        #[test]
        fn test_failure_signal_wins() {
            let failure = ScriptedProbe::new(vec![
                ProbeState::absent(),
                ProbeState::visible_with_text("rejected"),
            ]);
            let success = ScriptedProbe::always_absent();
            let outcome = Resolver::new()
                .resolve_race(&failure, &success, &fast(200))
                .unwrap();
            assert_eq!(outcome, Outcome::Failure("rejected".to_string()));
        }

        #[test]
        fn test_simultaneous_true_failure_wins() {
            let failure = ScriptedProbe::new(vec![ProbeState::visible_with_text("conflict")]);
            let success = ScriptedProbe::always_visible();
            let outcome = Resolver::new()
                .resolve_race(&failure, &success, &fast(200))
                .unwrap();
            assert_eq!(outcome, Outcome::Failure("conflict".to_string()));
        }

        #[test]
        fn test_neither_signal_times_out() {
            let failure = ScriptedProbe::always_absent();
            let success = ScriptedProbe::always_absent();
            let outcome = Resolver::new()
                .resolve_race(&failure, &success, &fast(40))
                .unwrap();
            assert_eq!(outcome, Outcome::TimedOut);
        }
    }

    mod checked_tests {
        use super::*;

        #[test]
        fn test_resolve_action_success_records_nothing() {
            let sink = Arc::new(MemorySink::new());
            let mut log = StepLog::new(sink.clone());
            let banner = ScriptedProbe::always_absent();

            let outcome = Resolver::new()
                .resolve_action(&banner, &fast(40), "Submit signup", &mut log)
                .unwrap();
            assert_eq!(outcome, Outcome::Success);
            assert!(sink.is_empty());
        }

        #[test]
        fn test_resolve_action_failure_commits_and_raises() {
            let sink = Arc::new(MemorySink::new());
            let mut log = StepLog::new(sink.clone());
            log.record("Entered email", true, StepMode::Buffered).unwrap();
            log.record("Clicked submit", true, StepMode::Buffered).unwrap();

            let banner = ScriptedProbe::new(vec![
                ProbeState::absent(),
                ProbeState::visible_with_text("Email already exists"),
            ]);

            let result =
                Resolver::new().resolve_action(&banner, &fast(200), "Submit signup", &mut log);
            match result {
                Err(EsperarError::ActionFailureDetected { message }) => {
                    assert_eq!(message, "Submit signup: Email already exists");
                }
                other => panic!("expected ActionFailureDetected, got {other:?}"),
            }

            // The buffered trail and the marker arrive as one commit.
            let commits = sink.commits();
            assert_eq!(commits.len(), 1);
            let descriptions: Vec<&str> = commits[0]
                .records
                .iter()
                .map(|r| r.description.as_str())
                .collect();
            assert_eq!(
                descriptions,
                vec![
                    "Entered email",
                    "Clicked submit",
                    "Submit signup: Email already exists"
                ]
            );
            assert!(log.is_empty());
        }

        #[test]
        fn test_resolve_action_race_timeout_returned_normally() {
            let sink = Arc::new(MemorySink::new());
            let mut log = StepLog::new(sink.clone());
            let failure = ScriptedProbe::always_absent();
            let success = ScriptedProbe::always_absent();

            let outcome = Resolver::new()
                .resolve_action_race(&failure, &success, &fast(40), "Open dashboard", &mut log)
                .unwrap();
            assert_eq!(outcome, Outcome::TimedOut);
            assert!(sink.is_empty());
        }

        #[test]
        fn test_resolve_action_race_failure_commits_and_raises() {
            let sink = Arc::new(MemorySink::new());
            let mut log = StepLog::new(sink.clone());
            let failure = ScriptedProbe::new(vec![ProbeState::visible_with_text("403")]);
            let success = ScriptedProbe::always_visible();

            let result = Resolver::new().resolve_action_race(
                &failure,
                &success,
                &fast(100),
                "Open dashboard",
                &mut log,
            );
            assert!(matches!(
                result,
                Err(EsperarError::ActionFailureDetected { .. })
            ));
            assert_eq!(sink.commits().len(), 1);
        }
    }
}
