//! Chrome backend for the browser collaborator traits.
//!
//! Each [`ChromeLauncher::launch`] starts its own Chrome process with a
//! fresh user-data directory and opens a single page, so sessions never share
//! cookies, storage or process state. The page's `Runtime.exceptionThrown`
//! and `Runtime.consoleAPICalled` events are forwarded into [`PageEvents`]
//! for the whole life of the session.
//!
//! Locators are evaluated in the page by injected scripts. A query tags each
//! match with a `data-vigil-handle` attribute; the tag is the element's
//! [`ElementHandle`](crate::session::ElementHandle) for the following
//! inspection and action.
//!
//! [`PageEvents`]: crate::collector::PageEvents

mod browser;
mod events;
mod scripts;
mod session;

pub use browser::{ChromeConfig, ChromeLauncher};
pub use session::ChromeSession;
