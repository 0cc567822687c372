//! Synchronization Configuration
//!
//! The two tunable windows of the core. General waits (page loads,
//! element appearance) run long; the post-action failure window runs
//! short, sized to how quickly an error banner would render after a
//! submit. The callers that produced this core varied these values
//! inconsistently, so they are configuration here, never constants in
//! calling code.

use crate::wait::WaitSpec;
use serde::{Deserialize, Serialize};

/// Default post-action failure window (2 seconds)
pub const DEFAULT_ACTION_WINDOW_MS: u64 = 2_000;

/// Timing configuration for one test execution context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Window for general waits (appearance, disappearance, page ready)
    pub wait: WaitSpec,
    /// Short window for post-action failure detection
    pub action_window: WaitSpec,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            wait: WaitSpec::default(),
            action_window: WaitSpec::new().with_timeout(DEFAULT_ACTION_WINDOW_MS),
        }
    }
}

impl SyncConfig {
    /// Create a config with default windows
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the general wait window
    #[must_use]
    pub const fn with_wait(mut self, wait: WaitSpec) -> Self {
        self.wait = wait;
        self
    }

    /// Set the post-action failure window
    #[must_use]
    pub const fn with_action_window(mut self, action_window: WaitSpec) -> Self {
        self.action_window = action_window;
        self
    }

    /// Validate both windows
    pub fn validate(&self) -> crate::result::EsperarResult<()> {
        self.wait.validate()?;
        self.action_window.validate()
    }
}
