//! # vigil-harness
//!
//! A scenario verification harness for web applications.
//!
//! A [`Scenario`] is a declarative, ordered list of steps (navigate, fill,
//! click, wait, assert, capture) describing one user journey. The
//! [`Harness`] runs it in an exclusive headless browser session and always
//! returns a [`RunResult`]: how the run ended, the screenshots captured as
//! evidence, and every uncaught page error seen along the way.
//!
//! ## Architecture
//!
//! - **Locator Resolver** ([`resolve`]): turns a [`Locator`] into exactly one
//!   live element, polling with exponential backoff until a deadline
//! - **Step Executor** ([`executor`]): performs one step, every browser call
//!   bounded by the step's deadline
//! - **Scenario Runner** ([`runner`]): the `Pending → Running → Completed |
//!   Failed | TimedOut` state machine for one run
//! - **Evidence Recorder** ([`evidence`]): labelled, timestamped screenshots
//!   in an [`ArtifactStore`]
//! - **Error Collector** ([`collector`]): page errors and console output,
//!   captured passively for the whole session
//! - **Harness Driver** ([`harness`]): acquires and releases one session per
//!   scenario, optionally running several scenarios in parallel
//!
//! The browser itself sits behind the [`Launcher`] and [`Session`] traits.
//! [`chrome`] implements them with chromiumoxide.
//!
//! ## Example Usage
//!
//! ```ignore
//! use vigil_harness::{Harness, HarnessConfig, Locator, Scenario, Step};
//! use std::time::Duration;
//!
//! let scenario = Scenario::builder("create", "http://localhost:3000")
//!     .step(Step::navigate("/"))
//!     .step(Step::wait_for(Locator::test_id("prompt-input")))
//!     .step(Step::fill(Locator::test_id("prompt-input"), "a cat dancing"))
//!     .step(Step::click(Locator::role("button", "Create")))
//!     .step(Step::wait_for(Locator::test_id("result-canvas")).with_timeout(Duration::from_secs(60)))
//!     .step(Step::capture("result"))
//!     .build()?;
//!
//! let harness = Harness::from_config(&HarnessConfig::default());
//! let result = harness.run(&scenario).await?;
//! assert!(result.is_success(), "{}", result.outcome);
//! ```
//!
//! ## Testing Strategy
//!
//! 1. **Unit and scripted tests**: a fake browser drives the runner through
//!    every outcome without Chrome
//! 2. **Integration tests**: real browser tests (require Chrome installed)
//!
//! Run with `cargo test` (unit) or `cargo test -- --ignored` (integration).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod chrome;
pub mod collector;
pub mod config;
pub mod error;
pub mod evidence;
pub mod executor;
pub mod harness;
pub mod locator;
pub mod resolve;
pub mod result;
pub mod runner;
pub mod scenario;
pub mod session;
pub mod wait;

// Re-export main types for convenience
pub use chrome::{ChromeConfig, ChromeLauncher};
pub use collector::{ConsoleLevel, ConsoleMessage, PageError, PageEvents};
pub use config::{HarnessConfig, RunDefaults, RunSettings};
pub use error::{DriverError, HarnessError, ResolveError, Result, ScenarioError};
pub use evidence::{
    ArtifactKind, ArtifactRef, ArtifactStore, Evidence, FsArtifactStore, MemoryArtifactStore,
};
pub use harness::Harness;
pub use locator::Locator;
pub use result::{FailureReason, RunOutcome, RunResult, RunState};
pub use scenario::{Readiness, Scenario, ScenarioBuilder, Step, StepKind, WaitState};
pub use session::{DocumentState, ElementHandle, ElementSnapshot, Launcher, Session};
pub use wait::{PollPolicy, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT};
