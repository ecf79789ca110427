//! A live Chrome page driven through CDP.

use super::scripts::{self, RawElement};
use crate::error::{DriverError, DriverResult};
use crate::locator::Locator;
use crate::session::{DocumentState, ElementHandle, ElementSnapshot, Session};
use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::{Page, ScreenshotParams};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// One Chrome process with a single page.
///
/// Release it with [`Session::close`]. Dropping it without closing kills the
/// process through chromiumoxide's own `Drop`, but leaves the profile
/// directory behind.
pub struct ChromeSession {
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler_task: JoinHandle<()>,
    listener_task: JoinHandle<()>,
    user_data_dir: PathBuf,
    queries: AtomicU64,
}

impl ChromeSession {
    pub(super) fn new(
        browser: Browser,
        page: Page,
        handler_task: JoinHandle<()>,
        listener_task: JoinHandle<()>,
        user_data_dir: PathBuf,
    ) -> Self {
        Self {
            browser: Mutex::new(Some(browser)),
            page,
            handler_task,
            listener_task,
            user_data_dir,
            queries: AtomicU64::new(0),
        }
    }

    async fn evaluate<T: DeserializeOwned>(&self, script: String) -> DriverResult<T> {
        self.page
            .evaluate_expression(script)
            .await
            .map_err(|e| DriverError::ScriptExecutionFailed(e.to_string()))?
            .into_value()
            .map_err(|e| DriverError::ScriptExecutionFailed(e.to_string()))
    }

    async fn element(&self, handle: &ElementHandle) -> DriverResult<chromiumoxide::element::Element> {
        self.page
            .find_element(scripts::handle_selector(handle))
            .await
            .map_err(|_| DriverError::StaleHandle(handle.to_string()))
    }
}

#[async_trait]
impl Session for ChromeSession {
    async fn goto(&self, url: &str) -> DriverResult<()> {
        self.page
            .goto(url)
            .await
            .map(|_| ())
            .map_err(|e| DriverError::NavigationFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn document_state(&self) -> DriverResult<DocumentState> {
        self.evaluate(scripts::DOCUMENT_STATE.to_string()).await
    }

    async fn current_url(&self) -> DriverResult<String> {
        self.evaluate("window.location.href".to_string()).await
    }

    async fn query(&self, locator: &Locator) -> DriverResult<Vec<ElementSnapshot>> {
        let id = self.queries.fetch_add(1, Ordering::Relaxed);
        let raw: Vec<RawElement> = self.evaluate(scripts::query(locator, &format!("q{id}"))).await?;
        Ok(raw.into_iter().map(ElementSnapshot::from).collect())
    }

    async fn inspect(&self, handle: &ElementHandle) -> DriverResult<Option<ElementSnapshot>> {
        let raw: Vec<RawElement> = self.evaluate(scripts::inspect(handle)).await?;
        Ok(raw.into_iter().next().map(ElementSnapshot::from))
    }

    async fn fill(&self, handle: ElementHandle, value: &str) -> DriverResult<()> {
        let cleared: bool = self.evaluate(scripts::clear(&handle)).await?;
        if !cleared {
            return Err(DriverError::StaleHandle(handle.to_string()));
        }

        let element = self.element(&handle).await?;
        element
            .focus()
            .await
            .map_err(|e| DriverError::InputFailed(e.to_string()))?;
        element
            .type_str(value)
            .await
            .map_err(|e| DriverError::InputFailed(e.to_string()))?;
        Ok(())
    }

    async fn click(&self, handle: ElementHandle) -> DriverResult<()> {
        self.element(&handle)
            .await?
            .click()
            .await
            .map_err(|e| DriverError::InputFailed(e.to_string()))?;
        Ok(())
    }

    async fn screenshot(&self) -> DriverResult<Vec<u8>> {
        self.page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(false)
                    .build(),
            )
            .await
            .map_err(|e| DriverError::ScreenshotFailed(e.to_string()))
    }

    async fn close(self: Box<Self>) -> DriverResult<()> {
        self.listener_task.abort();

        let browser = self.browser.lock().await.take();
        let closed = match browser {
            Some(mut browser) => {
                debug!("closing browser");
                let result = browser
                    .close()
                    .await
                    .map(|_| ())
                    .map_err(|e| DriverError::ShutdownFailed(e.to_string()));
                if let Err(e) = browser.wait().await {
                    warn!("failed to reap browser process: {e}");
                }
                result
            }
            None => Err(DriverError::SessionClosed),
        };

        self.handler_task.abort();
        if let Err(e) = tokio::fs::remove_dir_all(&self.user_data_dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(dir = %self.user_data_dir.display(), "failed to remove profile directory: {e}");
            }
        }
        closed
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        if self.browser.get_mut().is_some() {
            warn!("ChromeSession dropped without close() - forcing shutdown via Drop");
            self.listener_task.abort();
            self.handler_task.abort();
        }
    }
}
