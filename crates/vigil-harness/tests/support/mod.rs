//! A scripted in-memory browser for driving the harness without Chrome.
//!
//! A [`FakeApp`] holds a flat list of elements, each matching a fixed set of
//! locators. Elements can appear later (on the tokio clock, so paused-time
//! tests run instantly), and clicks or fills can trigger reactions that
//! change the page. Every launch starts from a copy of the app's page, so
//! concurrent sessions never see each other's changes.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use vigil_harness::{
    DocumentState, DriverError, ElementHandle, ElementSnapshot, HarnessError, Launcher, Locator,
    PageEvents, Session,
};

pub const FAKE_PNG: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

type Reaction = Arc<dyn Fn(&mut AppState) + Send + Sync>;

/// One element of the fake page.
#[derive(Debug, Clone)]
pub struct FakeElement {
    pub key: String,
    pub matches: Vec<Locator>,
    pub visible: bool,
    pub enabled: bool,
    pub editable: bool,
    pub text: String,
    /// `None` while detached.
    pub attached_at: Option<Instant>,
}

impl FakeElement {
    pub fn new(key: &str, matches: impl IntoIterator<Item = Locator>) -> Self {
        Self {
            key: key.to_string(),
            matches: matches.into_iter().collect(),
            visible: true,
            enabled: true,
            editable: false,
            text: String::new(),
            attached_at: Some(Instant::now()),
        }
    }

    pub fn input(mut self) -> Self {
        self.editable = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn detached(mut self) -> Self {
        self.attached_at = None;
        self
    }

    fn is_attached(&self, now: Instant) -> bool {
        self.attached_at.is_some_and(|at| at <= now)
    }

    fn snapshot(&self) -> ElementSnapshot {
        ElementSnapshot {
            handle: ElementHandle::new(self.key.clone()),
            visible: self.visible,
            enabled: self.enabled,
            editable: self.editable,
            text: self.text.clone(),
        }
    }
}

/// Mutable state of the fake page.
#[derive(Clone, Default)]
pub struct AppState {
    pub url: String,
    pub ready_state: String,
    pub elements: Vec<FakeElement>,
    pub visits: Vec<String>,
    pub clicks: Vec<String>,
    pub fills: Vec<(String, String)>,
    pub screenshots: usize,
    pub fail_screenshots: bool,
    pub fail_navigation: Option<String>,
    pub goto_delay: Option<Duration>,
    pub panic_on_query: bool,
    events: Option<PageEvents>,
    on_click: HashMap<String, Reaction>,
    on_fill: HashMap<String, Reaction>,
}

impl AppState {
    pub fn element_mut(&mut self, key: &str) -> Option<&mut FakeElement> {
        self.elements.iter_mut().find(|el| el.key == key)
    }

    pub fn element(&self, key: &str) -> Option<&FakeElement> {
        self.elements.iter().find(|el| el.key == key)
    }

    /// Attaches an element `delay` from now.
    pub fn attach_after(&mut self, key: &str, delay: Duration) {
        if let Some(el) = self.element_mut(key) {
            el.attached_at = Some(Instant::now() + delay);
        }
    }

    pub fn detach(&mut self, key: &str) {
        if let Some(el) = self.element_mut(key) {
            el.attached_at = None;
        }
    }

    /// The collector of the session this page belongs to.
    pub fn events(&self) -> Option<PageEvents> {
        self.events.clone()
    }

    /// Reports an uncaught page error to the session's collector.
    pub fn page_error(&self, message: &str) {
        if let Some(events) = &self.events {
            events.record_error(message);
        }
    }
}

/// A scriptable application under test.
///
/// [`FakeApp::page`] is the page every new session starts from. Each launch
/// gets its own copy, reachable afterwards through [`FakeApp::sessions`].
#[derive(Clone)]
pub struct FakeApp {
    page: Arc<Mutex<AppState>>,
    sessions: Arc<Mutex<Vec<SharedPage>>>,
    launches: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

type SharedPage = Arc<Mutex<AppState>>;

fn lock(page: &Mutex<AppState>) -> MutexGuard<'_, AppState> {
    page.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FakeApp {
    pub fn new(elements: impl IntoIterator<Item = FakeElement>) -> Self {
        let page = AppState {
            url: "about:blank".to_string(),
            ready_state: "complete".to_string(),
            elements: elements.into_iter().collect(),
            ..AppState::default()
        };
        Self {
            page: Arc::new(Mutex::new(page)),
            sessions: Arc::new(Mutex::new(Vec::new())),
            launches: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The page new sessions start from.
    pub fn page(&self) -> MutexGuard<'_, AppState> {
        lock(&self.page)
    }

    /// Copies of every launched session's page, in launch order.
    pub fn sessions(&self) -> Vec<AppState> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|page| lock(page).clone())
            .collect()
    }

    /// A copy of the page of the most recently launched session.
    pub fn last_session(&self) -> AppState {
        self.sessions().pop().expect("no session was launched")
    }

    pub fn on_click(&self, key: &str, reaction: impl Fn(&mut AppState) + Send + Sync + 'static) {
        self.page().on_click.insert(key.to_string(), Arc::new(reaction));
    }

    pub fn on_fill(&self, key: &str, reaction: impl Fn(&mut AppState) + Send + Sync + 'static) {
        self.page().on_fill.insert(key.to_string(), Arc::new(reaction));
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn launcher(&self) -> FakeLauncher {
        FakeLauncher {
            app: self.clone(),
            fail: false,
        }
    }

    fn open_session(&self, events: PageEvents) -> SharedPage {
        let mut page = self.page().clone();
        page.events = Some(events);
        let page = Arc::new(Mutex::new(page));
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&page));
        page
    }
}

pub struct FakeLauncher {
    app: FakeApp,
    fail: bool,
}

impl FakeLauncher {
    /// A launcher that can never acquire a session.
    pub fn failing(app: &FakeApp) -> Self {
        Self {
            app: app.clone(),
            fail: true,
        }
    }
}

#[async_trait]
impl Launcher for FakeLauncher {
    async fn launch(&self, events: PageEvents) -> vigil_harness::Result<Box<dyn Session>> {
        if self.fail {
            return Err(HarnessError::LaunchFailed {
                reason: "no browser available".to_string(),
                source: None,
            });
        }
        self.app.launches.fetch_add(1, Ordering::SeqCst);
        let page = self.app.open_session(events);
        Ok(Box::new(FakeSession {
            app: self.app.clone(),
            page,
        }))
    }
}

pub struct FakeSession {
    app: FakeApp,
    page: SharedPage,
}

impl FakeSession {
    fn state(&self) -> MutexGuard<'_, AppState> {
        lock(&self.page)
    }

    fn react(&self, reactions: impl Fn(&AppState) -> Option<Reaction>) {
        let mut state = self.state();
        if let Some(reaction) = reactions(&state) {
            reaction(&mut state);
        }
    }
}

#[async_trait]
impl Session for FakeSession {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        let delay = self.state().goto_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        state.visits.push(url.to_string());
        if let Some(reason) = state.fail_navigation.clone() {
            return Err(DriverError::NavigationFailed {
                url: url.to_string(),
                reason,
            });
        }
        state.url = url.to_string();
        Ok(())
    }

    async fn document_state(&self) -> Result<DocumentState, DriverError> {
        Ok(DocumentState {
            ready_state: self.state().ready_state.clone(),
            resource_count: 3,
        })
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.state().url.clone())
    }

    async fn query(&self, locator: &Locator) -> Result<Vec<ElementSnapshot>, DriverError> {
        let state = self.state();
        if state.panic_on_query {
            drop(state);
            panic!("query exploded");
        }
        let now = Instant::now();
        Ok(state
            .elements
            .iter()
            .filter(|el| el.is_attached(now) && el.matches.contains(locator))
            .map(FakeElement::snapshot)
            .collect())
    }

    async fn inspect(&self, handle: &ElementHandle) -> Result<Option<ElementSnapshot>, DriverError> {
        let now = Instant::now();
        Ok(self
            .state()
            .element(handle.token())
            .filter(|el| el.is_attached(now))
            .map(FakeElement::snapshot))
    }

    async fn fill(&self, handle: ElementHandle, value: &str) -> Result<(), DriverError> {
        {
            let mut state = self.state();
            let el = state
                .element_mut(handle.token())
                .ok_or_else(|| DriverError::StaleHandle(handle.to_string()))?;
            el.text = value.to_string();
            state.fills.push((handle.token().to_string(), value.to_string()));
        }
        self.react(|state| state.on_fill.get(handle.token()).cloned());
        Ok(())
    }

    async fn click(&self, handle: ElementHandle) -> Result<(), DriverError> {
        self.state().clicks.push(handle.token().to_string());
        self.react(|state| state.on_click.get(handle.token()).cloned());
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        let mut state = self.state();
        if state.fail_screenshots {
            return Err(DriverError::ScreenshotFailed("compositor unavailable".to_string()));
        }
        state.screenshots += 1;
        Ok(FAKE_PNG.to_vec())
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.app.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// The create-animation page: a prompt input, a Create button, and a result
/// canvas that appears two seconds after a non-empty prompt is submitted.
pub fn create_app() -> FakeApp {
    let app = FakeApp::new([
        FakeElement::new(
            "prompt-input",
            [Locator::test_id("prompt-input"), Locator::label("Prompt")],
        )
        .input(),
        FakeElement::new("create", [Locator::role("button", "Create")]).text("Create"),
        FakeElement::new("result-canvas", [Locator::test_id("result-canvas")]).detached(),
    ]);

    app.on_click("create", |state| {
        let prompt = state
            .element("prompt-input")
            .map(|el| el.text.trim().to_string())
            .unwrap_or_default();
        if !prompt.is_empty() {
            state.attach_after("result-canvas", Duration::from_secs(2));
        }
    });
    app
}
