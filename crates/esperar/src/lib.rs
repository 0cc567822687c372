//! Esperar: Synchronization and Step Reporting for UI Test Automation
//!
//! Esperar (Spanish: "to wait") is the synchronization core of a browser
//! test suite, reimplemented as a generic, driver-agnostic engine:
//! condition polling that tolerates transient DOM instability, outcome
//! races that decide whether an action succeeded when the failure signal
//! may or may not appear, and a buffered step log that commits the trail
//! leading up to a failure as one atomic batch.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    ESPERAR Architecture                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Probe      │───►│ Poller /   │───►│ Step Log   │            │
//! │   │ (caller's  │    │ Resolver   │    │ (buffer +  │            │
//! │   │  driver)   │    │            │    │  commits)  │───► Sink   │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every page interaction drives the poller (directly or through the
//! resolver) to a stable state, then appends one step record. All
//! polling is blocking sleep-and-resample; each test execution owns its
//! own [`TestContext`], and only the reporting sink is shared.

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod config;
mod context;
mod interact;
mod outcome;
mod probe;
mod result;
mod step;
mod wait;

pub use config::{SyncConfig, DEFAULT_ACTION_WINDOW_MS};
pub use context::TestContext;
pub use interact::{text_or, Interactor};
pub use outcome::{Outcome, Resolver, NO_DIAGNOSTIC_TEXT};
pub use probe::{appeared, disappeared, FnProbe, Probe, ProbeState, ScriptedProbe};
pub use result::{EsperarError, EsperarResult};
pub use step::{
    CommitAction, CommitEvent, JsonLinesSink, MemorySink, SinkEntry, StepLog, StepMode,
    StepRecord, StepSink, TextSink,
};
pub use wait::{
    Poller, WaitOutcome, WaitSpec, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS,
};
