//! Testing utilities including a scripted `DomSession` double.
//!
//! The fake session holds per-page selector tables instead of real
//! markup: tests register which elements a selector yields on each page
//! (and within each element), then drive the extraction and traversal
//! code through the same port the live browser adapter implements.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::infrastructure::session::{
    DomSession, ElementHandle, Scope, SessionError, SessionResult,
};

/// What a scripted element does when activated.
#[derive(Debug, Clone, Default)]
pub enum ClickBehavior {
    /// Accepts the click, nothing happens.
    #[default]
    Inert,
    /// A direct click navigates the session.
    Navigate(String),
    /// The direct click is intercepted; only a forced click navigates.
    InterceptedThenNavigate(String),
    /// Both activation strategies fail.
    AlwaysFails,
}

#[derive(Debug, Clone, Default)]
struct FakeElement {
    page: String,
    text: String,
    attributes: HashMap<String, String>,
    visible: bool,
    enabled: bool,
    on_click: ClickBehavior,
    children: HashMap<String, Vec<u64>>,
}

#[derive(Debug, Clone, Default)]
struct FakePage {
    matches: HashMap<String, Vec<u64>>,
    source: String,
}

#[derive(Debug, Default)]
struct Inner {
    pages: HashMap<String, FakePage>,
    elements: HashMap<u64, FakeElement>,
    current: String,
    next_id: u64,
    navigations: Vec<String>,
    invalidated: bool,
}

impl Inner {
    fn page_mut(&mut self, url: &str) -> &mut FakePage {
        self.pages.entry(url.to_string()).or_insert_with(|| FakePage {
            matches: HashMap::new(),
            source: format!("<html><!-- {url} --></html>"),
        })
    }

    fn live(&self) -> SessionResult<()> {
        if self.invalidated {
            Err(SessionError::Invalidated("session dropped".to_string()))
        } else {
            Ok(())
        }
    }

    fn element(&self, handle: ElementHandle) -> SessionResult<&FakeElement> {
        let element = self
            .elements
            .get(&handle.0)
            .ok_or(SessionError::Stale(handle))?;
        if element.page != self.current {
            return Err(SessionError::Stale(handle));
        }
        Ok(element)
    }

    fn go(&mut self, url: &str) {
        self.navigations.push(url.to_string());
        let _ = self.page_mut(url);
        self.current = url.to_string();
    }
}

/// Scripted in-memory `DomSession` implementation.
#[derive(Clone, Default)]
pub struct FakeSession {
    inner: Arc<Mutex<Inner>>,
}

impl FakeSession {
    /// Session positioned on `start_url` (the page is created empty).
    pub fn new(start_url: &str) -> Self {
        let session = Self::default();
        {
            let mut inner = session.inner.lock().unwrap();
            let _ = inner.page_mut(start_url);
            inner.current = start_url.to_string();
        }
        session
    }

    /// Share this session as the port trait object.
    pub fn arc(&self) -> Arc<dyn DomSession> {
        Arc::new(self.clone())
    }

    /// Ensure a page exists (empty until matches are registered).
    pub fn add_page(&self, url: &str) {
        let _ = self.inner.lock().unwrap().page_mut(url);
    }

    /// Replace the raw markup returned by `page_source` for a page.
    pub fn set_page_source(&self, url: &str, source: &str) {
        self.inner.lock().unwrap().page_mut(url).source = source.to_string();
    }

    /// Start building an element that lives on `page`.
    pub fn element(&self, page: &str) -> FakeElementBuilder<'_> {
        FakeElementBuilder {
            session: self,
            element: FakeElement {
                page: page.to_string(),
                visible: true,
                enabled: true,
                ..FakeElement::default()
            },
        }
    }

    /// Register what `selector` yields at page scope.
    pub fn on_page(&self, page: &str, selector: &str, handles: &[ElementHandle]) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .page_mut(page)
            .matches
            .insert(selector.to_string(), handles.iter().map(|h| h.0).collect());
    }

    /// Register what `selector` yields within `parent`.
    pub fn on_element(&self, parent: ElementHandle, selector: &str, handles: &[ElementHandle]) {
        let mut inner = self.inner.lock().unwrap();
        let ids = handles.iter().map(|h| h.0).collect();
        if let Some(element) = inner.elements.get_mut(&parent.0) {
            element.children.insert(selector.to_string(), ids);
        }
    }

    /// Simulate the underlying browser session dying.
    pub fn invalidate(&self) {
        self.inner.lock().unwrap().invalidated = true;
    }

    /// Every URL passed to `navigate`, in order.
    pub fn navigation_log(&self) -> Vec<String> {
        self.inner.lock().unwrap().navigations.clone()
    }

    /// The page the session currently sits on.
    pub fn current_page(&self) -> String {
        self.inner.lock().unwrap().current.clone()
    }

    fn register(&self, element: FakeElement) -> ElementHandle {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.elements.insert(id, element);
        ElementHandle(id)
    }
}

/// Builder for scripted elements.
pub struct FakeElementBuilder<'a> {
    session: &'a FakeSession,
    element: FakeElement,
}

impl FakeElementBuilder<'_> {
    pub fn text(mut self, text: &str) -> Self {
        self.element.text = text.to_string();
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.element
            .attributes
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.element.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.element.enabled = false;
        self
    }

    pub fn click_navigates(mut self, url: &str) -> Self {
        self.element.on_click = ClickBehavior::Navigate(url.to_string());
        self
    }

    pub fn click_intercepted_then_navigates(mut self, url: &str) -> Self {
        self.element.on_click = ClickBehavior::InterceptedThenNavigate(url.to_string());
        self
    }

    pub fn click_always_fails(mut self) -> Self {
        self.element.on_click = ClickBehavior::AlwaysFails;
        self
    }

    pub fn build(self) -> ElementHandle {
        self.session.register(self.element)
    }
}

#[async_trait]
impl DomSession for FakeSession {
    async fn find(&self, scope: Scope, selector: &str) -> SessionResult<Vec<ElementHandle>> {
        let inner = self.inner.lock().unwrap();
        inner.live()?;
        let ids = match scope {
            Scope::Page => inner
                .pages
                .get(&inner.current)
                .and_then(|page| page.matches.get(selector))
                .cloned()
                .unwrap_or_default(),
            Scope::Element(handle) => inner
                .element(handle)?
                .children
                .get(selector)
                .cloned()
                .unwrap_or_default(),
        };
        Ok(ids.into_iter().map(ElementHandle).collect())
    }

    async fn text(&self, element: ElementHandle) -> SessionResult<String> {
        let inner = self.inner.lock().unwrap();
        inner.live()?;
        Ok(inner.element(element)?.text.clone())
    }

    async fn attribute(
        &self,
        element: ElementHandle,
        name: &str,
    ) -> SessionResult<Option<String>> {
        let inner = self.inner.lock().unwrap();
        inner.live()?;
        Ok(inner.element(element)?.attributes.get(name).cloned())
    }

    async fn navigate(&self, url: &str) -> SessionResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.live()?;
        inner.go(url);
        Ok(())
    }

    async fn current_url(&self) -> SessionResult<String> {
        let inner = self.inner.lock().unwrap();
        inner.live()?;
        Ok(inner.current.clone())
    }

    async fn scroll_by(&self, _dx: i64, _dy: i64) -> SessionResult<()> {
        self.inner.lock().unwrap().live()
    }

    async fn scroll_to_bottom(&self) -> SessionResult<()> {
        self.inner.lock().unwrap().live()
    }

    async fn wait_for(&self, selector: &str, _timeout: Duration) -> SessionResult<bool> {
        let matches = self.find(Scope::Page, selector).await?;
        Ok(!matches.is_empty())
    }

    async fn is_visible(&self, element: ElementHandle) -> SessionResult<bool> {
        let inner = self.inner.lock().unwrap();
        inner.live()?;
        Ok(inner.element(element)?.visible)
    }

    async fn is_enabled(&self, element: ElementHandle) -> SessionResult<bool> {
        let inner = self.inner.lock().unwrap();
        inner.live()?;
        Ok(inner.element(element)?.enabled)
    }

    async fn click(&self, element: ElementHandle) -> SessionResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.live()?;
        let behavior = inner.element(element)?.on_click.clone();
        match behavior {
            ClickBehavior::Inert => Ok(()),
            ClickBehavior::Navigate(url) => {
                inner.go(&url);
                Ok(())
            }
            ClickBehavior::InterceptedThenNavigate(_) => Err(SessionError::Interaction {
                reason: "click intercepted by overlay".to_string(),
            }),
            ClickBehavior::AlwaysFails => Err(SessionError::Interaction {
                reason: "element not actionable".to_string(),
            }),
        }
    }

    async fn force_click(&self, element: ElementHandle) -> SessionResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.live()?;
        let behavior = inner.element(element)?.on_click.clone();
        match behavior {
            ClickBehavior::Inert => Ok(()),
            ClickBehavior::Navigate(url) | ClickBehavior::InterceptedThenNavigate(url) => {
                inner.go(&url);
                Ok(())
            }
            ClickBehavior::AlwaysFails => Err(SessionError::Interaction {
                reason: "element not actionable".to_string(),
            }),
        }
    }

    async fn page_source(&self) -> SessionResult<String> {
        let inner = self.inner.lock().unwrap();
        inner.live()?;
        Ok(inner
            .pages
            .get(&inner.current)
            .map(|page| page.source.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handles_go_stale_across_navigation() {
        let session = FakeSession::new("a");
        session.add_page("b");
        let element = session.element("a").text("hello").build();
        session.on_page("a", ".x", &[element]);

        assert_eq!(session.text(element).await.unwrap(), "hello");
        session.navigate("b").await.unwrap();
        assert!(matches!(
            session.text(element).await,
            Err(SessionError::Stale(_))
        ));

        // Returning to the page revives the scripted element.
        session.navigate("a").await.unwrap();
        assert_eq!(session.text(element).await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn intercepted_click_requires_force() {
        let session = FakeSession::new("a");
        session.add_page("b");
        let button = session
            .element("a")
            .click_intercepted_then_navigates("b")
            .build();
        session.on_page("a", "button", &[button]);

        assert!(session.click(button).await.is_err());
        session.force_click(button).await.unwrap();
        assert_eq!(session.current_page(), "b");
    }

    #[tokio::test]
    async fn invalidation_poisons_every_operation() {
        let session = FakeSession::new("a");
        session.invalidate();
        let err = session.current_url().await.unwrap_err();
        assert!(err.is_fatal());
    }
}
