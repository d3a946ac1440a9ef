//! Chromium-backed browser session
//!
//! Launches a headless Chrome/Chromium configured for unattended server use
//! (no sandbox, no GPU, single process) with the crawler's identifying user
//! agent, and exposes the single calculator page as a [`PageDriver`].

use super::dom::{extract_text, parse_select_options};
use super::{BrowserLauncher, PageDriver, SelectOption};
use crate::config::{BrowserConfig, Config};
use crate::{CrawlError, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
use chromiumoxide::cdp::js_protocol::runtime::{ConsoleApiCalledType, EventConsoleApiCalled};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Locates a Chrome/Chromium binary
///
/// `CHROMIUM_PATH` wins over the well-known install locations; `None` leaves
/// detection to chromiumoxide.
pub fn find_browser_executable() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
        tracing::warn!(
            "CHROMIUM_PATH points to non-existent file: {}",
            path.display()
        );
    }

    let candidates: &[&str] = if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/homebrew/bin/chromium",
        ]
    } else if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ]
    } else {
        &[
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/snap/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
    };

    candidates.iter().map(PathBuf::from).find(|p| p.exists())
}

/// Launches [`ChromiumSession`]s from the crawler configuration
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    browser: BrowserConfig,
    user_agent: String,
    navigation_timeout: Duration,
    action_timeout: Duration,
}

impl ChromiumLauncher {
    pub fn new(config: &Config) -> Self {
        Self {
            browser: config.browser.clone(),
            user_agent: config.user_agent.header_value(),
            navigation_timeout: config.crawler.navigation_timeout(),
            action_timeout: config.crawler.action_timeout(),
        }
    }

    fn chrome_config(&self) -> Result<ChromeConfig> {
        let mut builder = ChromeConfig::builder()
            .no_sandbox()
            .request_timeout(self.navigation_timeout)
            .window_size(1280, 900)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--single-process")
            .arg("--no-zygote")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-extensions")
            .arg("--mute-audio")
            .arg(format!("--user-agent={}", self.user_agent));

        if !self.browser.headless {
            builder = builder.with_head();
        }

        let executable = self
            .browser
            .chrome_executable
            .as_ref()
            .map(PathBuf::from)
            .or_else(find_browser_executable);
        if let Some(path) = executable {
            tracing::debug!("Using browser executable {}", path.display());
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(CrawlError::BrowserLaunch)
    }
}

#[async_trait(?Send)]
impl BrowserLauncher for ChromiumLauncher {
    type Page = ChromiumSession;

    async fn launch(&self) -> Result<ChromiumSession> {
        let chrome_config = self.chrome_config()?;

        tracing::info!("Launching headless browser (user agent: {})", self.user_agent);
        let (mut browser, mut handler) = Browser::launch(chrome_config)
            .await
            .map_err(|e| CrawlError::BrowserLaunch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler error: {}", e);
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                if let Err(close_err) = browser.close().await {
                    tracing::debug!("Closing browser after failed page open: {}", close_err);
                }
                handler_task.abort();
                return Err(CrawlError::BrowserLaunch(e.to_string()));
            }
        };

        let console_task = match page.event_listener::<EventConsoleApiCalled>().await {
            Ok(mut events) => Some(tokio::spawn(async move {
                while let Some(event) = events.next().await {
                    if matches!(event.r#type, ConsoleApiCalledType::Error) {
                        let message = event
                            .args
                            .iter()
                            .filter_map(|arg| {
                                arg.value
                                    .as_ref()
                                    .map(|v| v.to_string())
                                    .or_else(|| arg.description.clone())
                            })
                            .collect::<Vec<_>>()
                            .join(" ");
                        tracing::warn!("Target page console error: {}", message);
                    }
                }
            })),
            Err(e) => {
                tracing::warn!("Could not subscribe to page console: {}", e);
                None
            }
        };

        Ok(ChromiumSession {
            browser,
            page,
            handler: handler_task,
            console: console_task,
            navigation_timeout: self.navigation_timeout,
            action_timeout: self.action_timeout,
            closed: false,
        })
    }
}

/// One browser with the calculator page open
///
/// Handler tasks are aborted on close and, as a fallback, on drop.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    console: Option<JoinHandle<()>>,
    navigation_timeout: Duration,
    action_timeout: Duration,
    closed: bool,
}

impl ChromiumSession {
    /// Runs one CDP call under the default action timeout
    async fn bounded<T, F>(&self, what: &str, operation: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, chromiumoxide::error::CdpError>>,
    {
        match tokio::time::timeout(self.action_timeout, operation).await {
            Ok(result) => result.map_err(CrawlError::from),
            Err(_) => Err(CrawlError::timeout(what, self.action_timeout)),
        }
    }

    async fn snapshot(&self) -> Result<String> {
        self.bounded("page content", self.page.content()).await
    }

    fn abort_tasks(&mut self) {
        if let Some(console) = self.console.take() {
            console.abort();
        }
        self.handler.abort();
    }
}

#[async_trait(?Send)]
impl PageDriver for ChromiumSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        let navigation = async {
            self.page.goto(url).await?;
            self.page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        };

        match tokio::time::timeout(self.navigation_timeout, navigation).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(CrawlError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(CrawlError::timeout(
                format!("navigation to {}", url),
                self.navigation_timeout,
            )),
        }
    }

    async fn element_exists(&self, selector: &str) -> Result<bool> {
        match tokio::time::timeout(self.action_timeout, self.page.find_element(selector)).await {
            Ok(found) => Ok(found.is_ok()),
            Err(_) => Err(CrawlError::timeout(
                format!("lookup of {}", selector),
                self.action_timeout,
            )),
        }
    }

    async fn select_options(&self, selector: &str) -> Result<Vec<SelectOption>> {
        let html = self.snapshot().await?;
        parse_select_options(&html, selector)
    }

    async fn select_value(&self, selector: &str, value: &str) -> Result<()> {
        let script = select_script(selector, value)?;
        let evaluation = self
            .bounded(&format!("select on {}", selector), self.page.evaluate(script))
            .await?;

        let selected: bool = evaluation
            .into_value()
            .map_err(|e| CrawlError::Script(format!("select on {}: {}", selector, e)))?;

        if selected {
            Ok(())
        } else {
            Err(CrawlError::ElementMissing {
                selector: selector.to_string(),
            })
        }
    }

    async fn clear_content(&self, selector: &str) -> Result<()> {
        let script = clear_script(selector)?;
        let evaluation = self
            .bounded(&format!("clear of {}", selector), self.page.evaluate(script))
            .await?;

        let cleared: bool = evaluation
            .into_value()
            .map_err(|e| CrawlError::Script(format!("clear of {}: {}", selector, e)))?;

        if cleared {
            Ok(())
        } else {
            Err(CrawlError::ElementMissing {
                selector: selector.to_string(),
            })
        }
    }

    async fn text_content(&self, selector: &str) -> Result<Option<String>> {
        let html = self.snapshot().await?;
        extract_text(&html, selector)
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let result = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            tracing::debug!("Waiting for browser process failed: {}", e);
        }
        self.abort_tasks();

        result.map(|_| ()).map_err(CrawlError::from)
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        if !self.closed {
            tracing::warn!("Browser session dropped without close");
        }
        self.abort_tasks();
    }
}

/// Builds the script that selects `value` and fires the change events the
/// calculator listens to. Returns false when the control is missing.
fn select_script(selector: &str, value: &str) -> Result<String> {
    let selector = serde_json::to_string(selector).map_err(|e| CrawlError::Script(e.to_string()))?;
    let value = serde_json::to_string(value).map_err(|e| CrawlError::Script(e.to_string()))?;

    Ok(format!(
        r#"(() => {{
    const el = document.querySelector({selector});
    if (!el) return false;
    el.value = {value};
    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
    el.dispatchEvent(new Event('change', {{ bubbles: true }}));
    return true;
}})()"#
    ))
}

/// Builds the script that empties a select control or text element. Returns
/// false when the element is missing.
fn clear_script(selector: &str) -> Result<String> {
    let selector = serde_json::to_string(selector).map_err(|e| CrawlError::Script(e.to_string()))?;

    Ok(format!(
        r#"(() => {{
    const el = document.querySelector({selector});
    if (!el) return false;
    if (el.tagName === 'SELECT') {{
        el.options.length = 0;
    }} else {{
        el.textContent = '';
    }}
    return true;
}})()"#
    ))
}
