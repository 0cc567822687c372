//! Guarded Interactions
//!
//! Page-interaction helpers over a [`TestContext`]: every action first
//! drives the poller to a stable state, then performs the probe action,
//! then appends one step record. Failures follow the one error-handling
//! contract of the core - the buffered trail is committed with a failure
//! marker before the domain error propagates - instead of each call site
//! wrapping and rethrowing on its own.

use crate::context::TestContext;
use crate::probe::Probe;
use crate::result::{EsperarError, EsperarResult};
use crate::step::StepMode;
use crate::wait::WaitSpec;
use tracing::warn;

/// Read a probe's text, falling back to `fallback` when the text is
/// unavailable or unreadable
#[must_use]
pub fn text_or(probe: &dyn Probe, fallback: &str) -> String {
    match probe.text() {
        Ok(Some(text)) => text,
        _ => fallback.to_string(),
    }
}

/// Guarded interaction helpers bound to one test execution context
#[derive(Debug)]
pub struct Interactor<'a> {
    ctx: &'a mut TestContext,
}

impl<'a> Interactor<'a> {
    /// Bind an interactor to `ctx`
    pub fn new(ctx: &'a mut TestContext) -> Self {
        Self { ctx }
    }

    /// Click the element once it appears.
    ///
    /// Waits under the context's general window, clicks, and records one
    /// immediate step. If the element never appears or the click is
    /// rejected, the buffered trail is committed with a failure marker
    /// and [`EsperarError::ActionFailureDetected`] is raised.
    pub fn click(&mut self, probe: &dyn Probe) -> EsperarResult<()> {
        let description = probe.description();
        let wait = self.ctx.config().wait;
        let outcome = self.ctx.poller().wait_for_appearance(probe, &wait)?;
        if !outcome.satisfied {
            return self.fail_action(format!(
                "Click on {description} failed: element did not appear within {}ms",
                wait.timeout_ms
            ));
        }
        if let Err(cause) = probe.click() {
            return self.fail_action(format!("Click on {description} failed: {cause}"));
        }
        self.ctx
            .record(format!("Clicked {description}"), true, StepMode::Immediate)?;
        Ok(())
    }

    /// Fill the element with `value` once it appears.
    ///
    /// Same guard contract as [`Interactor::click`].
    pub fn fill(&mut self, probe: &dyn Probe, value: &str) -> EsperarResult<()> {
        let description = probe.description();
        let wait = self.ctx.config().wait;
        let outcome = self.ctx.poller().wait_for_appearance(probe, &wait)?;
        if !outcome.satisfied {
            return self.fail_action(format!(
                "Filling {description} failed: element did not appear within {}ms",
                wait.timeout_ms
            ));
        }
        if let Err(cause) = probe.set_value(value) {
            return self.fail_action(format!("Filling {description} failed: {cause}"));
        }
        self.ctx.record(
            format!("Entered {description}: {value}"),
            true,
            StepMode::Immediate,
        )?;
        Ok(())
    }

    /// Try to click within a custom short window. Returns `false` if the
    /// element never appears - no error, no commit. A rejected click is
    /// still an ordinary error.
    pub fn try_click(&mut self, probe: &dyn Probe, window: &WaitSpec) -> EsperarResult<bool> {
        let outcome = self.ctx.poller().wait_for_appearance(probe, window)?;
        if !outcome.satisfied {
            return Ok(false);
        }
        probe.click()?;
        self.ctx.record(
            format!("Clicked {}", probe.description()),
            true,
            StepMode::Immediate,
        )?;
        Ok(true)
    }

    /// Whether the element appears within `window` (no click, no step)
    pub fn is_ready(&self, probe: &dyn Probe, window: &WaitSpec) -> EsperarResult<bool> {
        Ok(self
            .ctx
            .poller()
            .wait_for_appearance(probe, window)?
            .satisfied)
    }

    /// Wait for a busy indicator to disappear under the general window.
    /// A lingering indicator is logged and reported as `false`, not
    /// raised - callers decide whether to proceed.
    pub fn settle(&self, busy_probe: &dyn Probe) -> EsperarResult<bool> {
        let wait = self.ctx.config().wait;
        let outcome = self.ctx.poller().wait_for_disappearance(busy_probe, &wait)?;
        if !outcome.satisfied {
            warn!(
                indicator = %busy_probe.description(),
                timeout_ms = wait.timeout_ms,
                "busy indicator did not disappear"
            );
        }
        Ok(outcome.satisfied)
    }

    /// Click the element after a busy indicator settles
    pub fn click_when_ready(
        &mut self,
        probe: &dyn Probe,
        busy_probe: Option<&dyn Probe>,
    ) -> EsperarResult<()> {
        if let Some(busy) = busy_probe {
            let _ = self.settle(busy)?;
        }
        self.click(probe)
    }

    /// Wait for a page-identifier element, recording one step on arrival
    /// and raising [`EsperarError::TimeoutExceeded`] when the page never
    /// loads
    pub fn expect_page(&mut self, identifier: &dyn Probe, page_name: &str) -> EsperarResult<()> {
        let wait = self.ctx.config().wait;
        let outcome = self.ctx.poller().wait_for_appearance(identifier, &wait)?;
        if !outcome.satisfied {
            return Err(EsperarError::TimeoutExceeded {
                action: format!("page '{page_name}' to load"),
                ms: wait.timeout_ms,
            });
        }
        self.ctx.record(
            format!("Page loaded: {page_name}"),
            true,
            StepMode::Immediate,
        )?;
        Ok(())
    }

    fn fail_action(&mut self, message: String) -> EsperarResult<()> {
        warn!(%message, "guarded interaction failed");
        self.ctx.commit_failure(&message)?;
        Err(EsperarError::ActionFailureDetected { message })
    }
}

// =============================================================================
// TESTS
// =============================================================================
