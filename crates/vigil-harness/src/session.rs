//! The browser collaborator seam.
//!
//! The harness does not drive a browser engine itself. It talks to a
//! [`Launcher`] that hands out [`Session`]s, and a session exposes only the
//! primitives the harness needs: navigation, locator queries, input on a
//! resolved handle, and screenshots. [`crate::chrome`] implements these
//! traits on top of chromiumoxide; tests implement them with a scripted fake.
//!
//! Both traits are object-safe so the harness can hold `Box<dyn Session>`.

use crate::collector::PageEvents;
use crate::error::{DriverResult, Result};
use crate::locator::Locator;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque reference to one live element, valid for a single action.
///
/// Handles are produced by [`Session::query`] and consumed by value by
/// [`Session::fill`] and [`Session::click`], so the type system prevents a
/// handle from being reused after the page may have re-rendered.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ElementHandle(String);

impl ElementHandle {
    /// Wraps a backend-specific token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The backend-specific token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State of one matched element at query time.
#[derive(Debug, PartialEq, Eq)]
pub struct ElementSnapshot {
    /// Handle for a subsequent action.
    pub handle: ElementHandle,
    /// Rendered with a non-empty box and not hidden by CSS.
    pub visible: bool,
    /// Not disabled (directly or via a disabled fieldset).
    pub enabled: bool,
    /// Accepts text input (input, textarea, contenteditable) and is not read-only.
    pub editable: bool,
    /// Visible text (`innerText`, or the value of form controls).
    pub text: String,
}

/// Load state of the current document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentState {
    /// `document.readyState`
    pub ready_state: String,
    /// Number of resource timing entries seen so far.
    pub resource_count: u64,
}

/// One exclusive browser session bound to a single scenario run.
#[async_trait]
pub trait Session: Send + Sync {
    /// Starts loading a URL. Readiness is awaited separately.
    async fn goto(&self, url: &str) -> DriverResult<()>;

    /// Reports the current document's load state.
    async fn document_state(&self) -> DriverResult<DocumentState>;

    /// Returns the current page URL.
    async fn current_url(&self) -> DriverResult<String>;

    /// Evaluates a locator against the live page, in document order.
    async fn query(&self, locator: &Locator) -> DriverResult<Vec<ElementSnapshot>>;

    /// Re-reads a handle's state without consuming it.
    ///
    /// Returns `None` when the element has been detached.
    async fn inspect(&self, handle: &ElementHandle) -> DriverResult<Option<ElementSnapshot>>;

    /// Clears the element's content and types `value` into it.
    async fn fill(&self, handle: ElementHandle, value: &str) -> DriverResult<()>;

    /// Clicks the element.
    async fn click(&self, handle: ElementHandle) -> DriverResult<()>;

    /// Captures the viewport as PNG bytes.
    async fn screenshot(&self) -> DriverResult<Vec<u8>>;

    /// Tears the session down. Called exactly once, by the harness driver.
    async fn close(self: Box<Self>) -> DriverResult<()>;
}

/// Creates isolated sessions.
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Launches a fresh session. Uncaught page errors and console output
    /// must be reported to `events` for the session's whole lifetime.
    ///
    /// # Errors
    ///
    /// Returns an infrastructure error when no session can be acquired.
    async fn launch(&self, events: PageEvents) -> Result<Box<dyn Session>>;
}

impl fmt::Debug for dyn Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}
