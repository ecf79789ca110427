//! Chrome process configuration and launch.

use super::events::forward_page_events;
use super::session::ChromeSession;
use crate::collector::PageEvents;
use crate::error::{HarnessError, Result};
use crate::session::{Launcher, Session};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::js_protocol::runtime::{EventConsoleApiCalled, EventExceptionThrown};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Options for launching Chrome.
///
/// Defaults suit CI containers: headless, with the sandbox and `/dev/shm`
/// usage disabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromeConfig {
    /// Run without a window (default: true, false with the `visible` feature).
    pub headless: bool,

    /// Browser window size in pixels.
    pub window_size: (u32, u32),

    /// Additional Chrome arguments.
    pub args: Vec<String>,

    /// Chrome executable path (None = auto-detect).
    pub chrome_path: Option<PathBuf>,
}

impl ChromeConfig {
    /// Shows the browser window.
    #[must_use]
    pub fn visible(mut self) -> Self {
        self.headless = false;
        self
    }

    /// Sets the window size.
    #[must_use]
    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_size = (width, height);
        self
    }

    /// Adds Chrome arguments.
    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.args.extend(args);
        self
    }

    /// Builds the chromiumoxide config along with the user-data directory
    /// this launch will own.
    fn to_browser_config(&self) -> Result<(BrowserConfig, PathBuf)> {
        let mut config = BrowserConfig::builder();

        if !self.headless {
            config = config.with_head();
        }

        let (width, height) = self.window_size;
        config = config
            .window_size(width, height)
            .viewport(None)
            .arg(format!("--window-size={width},{height}"));

        // One directory per launch keeps parallel sessions isolated.
        let user_data_dir =
            std::env::temp_dir().join(format!("vigil-session-{}", uuid::Uuid::new_v4()));
        config = config.arg(format!("--user-data-dir={}", user_data_dir.display()));

        for arg in &self.args {
            config = config.arg(arg.clone());
        }

        if let Some(path) = &self.chrome_path {
            config = config.chrome_executable(path.clone());
        }

        let config = config.build().map_err(|e| HarnessError::LaunchFailed {
            reason: format!("invalid browser configuration: {e}"),
            source: None,
        })?;
        Ok((config, user_data_dir))
    }
}

impl Default for ChromeConfig {
    fn default() -> Self {
        Self {
            headless: !cfg!(feature = "visible"),
            window_size: (1280, 800),
            args: vec![
                // Required where user namespaces are unavailable (containers).
                // Never point a sandboxless browser at untrusted content.
                "--no-sandbox".to_string(),
                "--disable-dev-shm-usage".to_string(),
            ],
            chrome_path: None,
        }
    }
}

/// Launches one Chrome process per session.
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher {
    config: ChromeConfig,
}

impl ChromeLauncher {
    /// Creates a launcher.
    #[must_use]
    pub fn new(config: ChromeConfig) -> Self {
        Self { config }
    }

    /// The launch options.
    #[must_use]
    pub fn config(&self) -> &ChromeConfig {
        &self.config
    }
}

#[async_trait]
impl Launcher for ChromeLauncher {
    async fn launch(&self, events: PageEvents) -> Result<Box<dyn Session>> {
        debug!(config = ?self.config, "launching browser");
        let (browser_config, user_data_dir) = self.config.to_browser_config()?;

        let (mut browser, mut handler) =
            Browser::launch(browser_config)
                .await
                .map_err(|e| HarnessError::LaunchFailed {
                    reason: "failed to launch Chrome process".to_string(),
                    source: Some(Box::new(e)),
                })?;

        // chromiumoxide only processes CDP traffic while the handler is polled.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("browser handler error: {e}");
                }
            }
        });

        let setup = async {
            let page = browser.new_page("about:blank").await?;
            let exceptions = page.event_listener::<EventExceptionThrown>().await?;
            let console = page.event_listener::<EventConsoleApiCalled>().await?;
            Ok::<_, chromiumoxide::error::CdpError>((page, exceptions, console))
        }
        .await;

        let (page, exceptions, console) = match setup {
            Ok(parts) => parts,
            Err(e) => {
                if let Err(close_err) = browser.close().await {
                    warn!("failed to close browser after setup error: {close_err}");
                }
                handler_task.abort();
                let _ = tokio::fs::remove_dir_all(&user_data_dir).await;
                return Err(HarnessError::ConnectionFailed(e.to_string()));
            }
        };

        let listener_task = tokio::spawn(forward_page_events(exceptions, console, events));
        debug!(user_data_dir = %user_data_dir.display(), "browser session ready");

        Ok(Box::new(ChromeSession::new(
            browser,
            page,
            handler_task,
            listener_task,
            user_data_dir,
        )))
    }
}
