//! Test Execution Context
//!
//! One context per test execution: it owns the step log (buffer +
//! sequence counter) and the timing configuration, and hands out the
//! poller and resolver. Nothing here is shared between tests - cross-test
//! parallelism comes from giving each test its own context over the
//! shared sink, not from locking inside the core.

use crate::config::SyncConfig;
use crate::outcome::{Outcome, Resolver};
use crate::probe::Probe;
use crate::result::EsperarResult;
use crate::step::{StepLog, StepMode, StepSink};
use crate::wait::{Poller, WaitOutcome};
use std::sync::Arc;
use uuid::Uuid;

/// Per-test execution context.
///
/// # Example
///
/// ```
/// use esperar::{MemorySink, ScriptedProbe, StepMode, TestContext};
/// use std::sync::Arc;
///
/// let sink = Arc::new(MemorySink::new());
/// let mut ctx = TestContext::new("login_test", sink);
/// let button = ScriptedProbe::always_visible().with_description("login button");
///
/// ctx.wait_until_visible(&button).unwrap();
/// ctx.record("Clicked login button", true, StepMode::Immediate).unwrap();
/// ```
pub struct TestContext {
    id: Uuid,
    name: String,
    config: SyncConfig,
    log: StepLog,
}

impl std::fmt::Debug for TestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestContext")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("config", &self.config)
            .field("log", &self.log)
            .finish()
    }
}

impl TestContext {
    /// Create a context writing steps to `sink`
    #[must_use]
    pub fn new(name: impl Into<String>, sink: Arc<dyn StepSink>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            config: SyncConfig::default(),
            log: StepLog::new(sink),
        }
    }

    /// Override the timing configuration
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Unique id of this execution
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Test name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Timing configuration
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The step log owned by this context
    #[must_use]
    pub fn log(&self) -> &StepLog {
        &self.log
    }

    /// Mutable access to the step log
    pub fn log_mut(&mut self) -> &mut StepLog {
        &mut self.log
    }

    /// The poller for this context
    #[must_use]
    pub fn poller(&self) -> Poller {
        Poller::new()
    }

    /// The resolver for this context
    #[must_use]
    pub fn resolver(&self) -> Resolver {
        Resolver::new()
    }

    /// Record one step (see [`StepLog::record`])
    pub fn record(
        &mut self,
        description: impl Into<String>,
        passed: bool,
        mode: StepMode,
    ) -> EsperarResult<u64> {
        self.log.record(description, passed, mode)
    }

    /// Flush buffered steps (see [`StepLog::commit_all`])
    pub fn commit_all(&mut self) -> EsperarResult<usize> {
        self.log.commit_all()
    }

    /// Commit buffered steps with a failure marker (see
    /// [`StepLog::commit_failure`])
    pub fn commit_failure(&mut self, message: impl Into<String>) -> EsperarResult<usize> {
        self.log.commit_failure(message)
    }

    /// Wait for `probe` to appear under the context's general wait
    /// window, raising on timeout
    pub fn wait_until_visible(&self, probe: &dyn Probe) -> EsperarResult<WaitOutcome> {
        self.poller().expect_appearance(probe, &self.config.wait)
    }

    /// Wait for `probe` to disappear under the context's general wait
    /// window, raising on timeout
    pub fn wait_until_gone(&self, probe: &dyn Probe) -> EsperarResult<WaitOutcome> {
        self.poller().expect_disappearance(probe, &self.config.wait)
    }

    /// Resolve a labelled action against its failure indicator under the
    /// context's short action window. On failure this commits the
    /// buffered trail with a failure marker and raises.
    pub fn check_action(
        &mut self,
        failure_probe: &dyn Probe,
        action_label: &str,
    ) -> EsperarResult<Outcome> {
        let resolver = self.resolver();
        let spec = self.config.action_window;
        resolver.resolve_action(failure_probe, &spec, action_label, &mut self.log)
    }

    /// Two-signal variant of [`TestContext::check_action`]
    pub fn check_action_race(
        &mut self,
        failure_probe: &dyn Probe,
        success_probe: &dyn Probe,
        action_label: &str,
    ) -> EsperarResult<Outcome> {
        let resolver = self.resolver();
        let spec = self.config.action_window;
        resolver.resolve_action_race(failure_probe, success_probe, &spec, action_label, &mut self.log)
    }
}

// =============================================================================
// TESTS
// =============================================================================
