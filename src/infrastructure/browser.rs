//! chromiumoxide-backed implementation of the `DomSession` port.
//!
//! Owns one Chrome instance and one page. Element handles are u64 ids
//! mapped to live CDP elements in a registry that is cleared on every
//! navigation, so handles from a previous document read as stale.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::infrastructure::config::ScraperConfig;
use crate::infrastructure::session::{
    DomSession, ElementHandle, Scope, SessionError, SessionResult,
};

/// Stability and anti-automation launch arguments.
const LAUNCH_ARGS: [&str; 8] = [
    "--disable-blink-features=AutomationControlled",
    "--exclude-switches=enable-automation",
    "--disable-extensions",
    "--no-sandbox",
    "--disable-infobars",
    "--disable-dev-shm-usage",
    "--disable-browser-side-navigation",
    "--disable-gpu",
];

const IS_VISIBLE_FN: &str = "function() { \
    const rect = this.getBoundingClientRect(); \
    const style = window.getComputedStyle(this); \
    return rect.width > 0 && rect.height > 0 \
        && style.display !== 'none' && style.visibility !== 'hidden'; \
}";

const IS_ENABLED_FN: &str = "function() { return !this.disabled; }";

const FORCE_CLICK_FN: &str = "function() { this.click(); }";

struct ElementRegistry {
    elements: HashMap<u64, Element>,
    next_id: u64,
}

impl ElementRegistry {
    fn new() -> Self {
        Self {
            elements: HashMap::new(),
            next_id: 1,
        }
    }

    fn insert(&mut self, element: Element) -> ElementHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.elements.insert(id, element);
        ElementHandle(id)
    }

    fn get(&self, handle: ElementHandle) -> SessionResult<&Element> {
        self.elements
            .get(&handle.0)
            .ok_or(SessionError::Stale(handle))
    }

    fn clear(&mut self) {
        self.elements.clear();
    }
}

/// Live browser session over the Chrome DevTools Protocol.
pub struct ChromiumSession {
    page: Page,
    browser: Mutex<Option<Browser>>,
    handler_task: JoinHandle<()>,
    registry: Mutex<ElementRegistry>,
}

impl ChromiumSession {
    /// Launch a Chrome instance and open a blank page.
    pub async fn launch(config: &ScraperConfig) -> anyhow::Result<Self> {
        let mut builder = BrowserConfig::builder().window_size(1920, 1080);
        for arg in LAUNCH_ARGS {
            builder = builder.arg(arg);
        }
        builder = builder.arg(format!("--user-agent={}", config.user_agent));
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(browser_config).await?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!("browser handler event error: {err}");
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        // Hide the webdriver marker the way a regular session looks.
        let _ = page
            .evaluate("Object.defineProperty(navigator, 'webdriver', {get: () => undefined})")
            .await;

        info!("browser session launched");
        Ok(Self {
            page,
            browser: Mutex::new(Some(browser)),
            handler_task,
            registry: Mutex::new(ElementRegistry::new()),
        })
    }

    /// Close the browser and stop the event handler. Safe to call once
    /// at the end of a run; errors are logged, not propagated.
    pub async fn shutdown(&self) {
        if let Some(mut browser) = self.browser.lock().await.take() {
            if let Err(err) = browser.close().await {
                warn!("failed to close browser cleanly: {err}");
            }
        }
        self.handler_task.abort();
    }

    async fn find_in_scope(&self, scope: Scope, selector: &str) -> SessionResult<Vec<Element>> {
        let found = match scope {
            Scope::Page => self.page.find_elements(selector).await,
            Scope::Element(handle) => {
                let registry = self.registry.lock().await;
                registry.get(handle)?.find_elements(selector).await
            }
        };
        match found {
            Ok(elements) => Ok(elements),
            // A selector that matches nothing is not exceptional.
            Err(err) if err.to_string().to_lowercase().contains("not found") => Ok(Vec::new()),
            Err(err) => Err(classify(&err)),
        }
    }
}

/// Classify a CDP failure. Connection-level failures mean the browser is
/// gone and nothing in this design can repair that.
fn classify(err: &CdpError) -> SessionError {
    let message = err.to_string();
    let lowered = message.to_lowercase();
    if lowered.contains("channel")
        || lowered.contains("connection")
        || lowered.contains("websocket")
        || lowered.contains("browser closed")
        || lowered.contains("send error")
    {
        SessionError::Invalidated(message)
    } else {
        SessionError::Protocol(message)
    }
}

#[async_trait]
impl DomSession for ChromiumSession {
    async fn find(&self, scope: Scope, selector: &str) -> SessionResult<Vec<ElementHandle>> {
        let elements = self.find_in_scope(scope, selector).await?;
        let mut registry = self.registry.lock().await;
        Ok(elements
            .into_iter()
            .map(|element| registry.insert(element))
            .collect())
    }

    async fn text(&self, element: ElementHandle) -> SessionResult<String> {
        let registry = self.registry.lock().await;
        let el = registry.get(element)?;
        let text = el.inner_text().await.map_err(|err| classify(&err))?;
        Ok(text.unwrap_or_default())
    }

    async fn attribute(
        &self,
        element: ElementHandle,
        name: &str,
    ) -> SessionResult<Option<String>> {
        let registry = self.registry.lock().await;
        let el = registry.get(element)?;
        el.attribute(name).await.map_err(|err| classify(&err))
    }

    async fn navigate(&self, url: &str) -> SessionResult<()> {
        self.registry.lock().await.clear();
        self.page
            .goto(url)
            .await
            .map_err(|err| match classify(&err) {
                SessionError::Protocol(reason) => SessionError::Navigation {
                    url: url.to_string(),
                    reason,
                },
                fatal => fatal,
            })?;
        // Bounded, tolerant wait; rendering timing is unknown and the
        // caller applies its own settle delay.
        match tokio::time::timeout(Duration::from_secs(10), self.page.wait_for_navigation()).await
        {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => debug!("navigation wait error (continuing): {err}"),
            Err(_) => debug!("navigation wait timed out (continuing)"),
        }
        Ok(())
    }

    async fn current_url(&self) -> SessionResult<String> {
        let url = self.page.url().await.map_err(|err| classify(&err))?;
        Ok(url.unwrap_or_default())
    }

    async fn scroll_by(&self, dx: i64, dy: i64) -> SessionResult<()> {
        self.page
            .evaluate(format!("window.scrollBy({dx}, {dy})"))
            .await
            .map_err(|err| classify(&err))?;
        Ok(())
    }

    async fn scroll_to_bottom(&self) -> SessionResult<()> {
        self.page
            .evaluate("window.scrollTo(0, document.body.scrollHeight)")
            .await
            .map_err(|err| classify(&err))?;
        Ok(())
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> SessionResult<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.find_in_scope(Scope::Page, selector).await {
                Ok(elements) if !elements.is_empty() => return Ok(true),
                Ok(_) => {}
                Err(err) if err.is_fatal() => return Err(err),
                Err(_) => {}
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    }

    async fn is_visible(&self, element: ElementHandle) -> SessionResult<bool> {
        let registry = self.registry.lock().await;
        let el = registry.get(element)?;
        let returns = el
            .call_js_fn(IS_VISIBLE_FN, false)
            .await
            .map_err(|err| classify(&err))?;
        Ok(returns
            .result
            .value
            .and_then(|value| value.as_bool())
            .unwrap_or(false))
    }

    async fn is_enabled(&self, element: ElementHandle) -> SessionResult<bool> {
        let registry = self.registry.lock().await;
        let el = registry.get(element)?;
        let returns = el
            .call_js_fn(IS_ENABLED_FN, false)
            .await
            .map_err(|err| classify(&err))?;
        Ok(returns
            .result
            .value
            .and_then(|value| value.as_bool())
            .unwrap_or(false))
    }

    async fn click(&self, element: ElementHandle) -> SessionResult<()> {
        let registry = self.registry.lock().await;
        let el = registry.get(element)?;
        el.click().await.map(|_| ()).map_err(|err| {
            match classify(&err) {
                // A failed direct click is an interaction fault; the
                // caller escalates to force_click.
                SessionError::Protocol(reason) => SessionError::Interaction { reason },
                fatal => fatal,
            }
        })
    }

    async fn force_click(&self, element: ElementHandle) -> SessionResult<()> {
        let registry = self.registry.lock().await;
        let el = registry.get(element)?;
        el.call_js_fn(FORCE_CLICK_FN, false)
            .await
            .map(|_| ())
            .map_err(|err| classify(&err))
    }

    async fn page_source(&self) -> SessionResult<String> {
        self.page.content().await.map_err(|err| classify(&err))
    }
}
