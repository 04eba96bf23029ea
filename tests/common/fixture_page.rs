//! [`Page`] over static HTML documents, parsed with `scraper`.
//!
//! A site is a set of pages keyed by URL plus a set of detail panes. The
//! current page is rendered with the selected pane appended inside the pane
//! wrapper, so elements before it keep their handles when the pane changes.
//!
//! Clicks are driven by attributes on the clicked element or its ancestors:
//! - `data-goto="<url>"` loads another page (old handles go stale); only these
//!   clicks satisfy [`Page::click_and_navigate`];
//! - `data-pane="<name>"` swaps the detail pane;
//! - `data-fail-click` makes the click fail with a script error.

use async_trait::async_trait;
use jobscout::browser::{DriverError, ElementHandle, Page, WaitState};
use scraper::{ElementRef, Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
struct State {
    url: Option<String>,
    pane: Option<String>,
    generation: u64,
    /// Input values by element index.
    values: HashMap<usize, String>,
    /// Checkboxes whose state was flipped by a click.
    toggled: HashSet<usize>,
    visits: Vec<String>,
    filled: Vec<(String, String)>,
    /// Ids of checkboxes clicked, in order.
    checked: Vec<String>,
    clicks: usize,
}

#[derive(Default)]
pub struct FixturePage {
    pages: HashMap<String, String>,
    panes: HashMap<String, String>,
    state: Mutex<State>,
}

fn selector(s: &str) -> Result<Selector, DriverError> {
    Selector::parse(s).map_err(|e| DriverError::Script(format!("invalid selector '{}': {:?}", s, e)))
}

fn self_and_ancestors<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    std::iter::once(el).chain(el.ancestors().filter_map(ElementRef::wrap))
}

fn is_hidden(el: ElementRef<'_>) -> bool {
    self_and_ancestors(el).any(|e| {
        let value = e.value();
        value.attr("hidden").is_some()
            || value
                .attr("style")
                .map(|s| s.replace(' ', "").contains("display:none"))
                .unwrap_or(false)
    })
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

impl FixturePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, body: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), body.into());
        self
    }

    pub fn with_pane(mut self, name: &str, html: impl Into<String>) -> Self {
        self.panes.insert(name.to_string(), html.into());
        self
    }

    /// URLs loaded so far, by `goto` or by clicking.
    pub fn visits(&self) -> Vec<String> {
        self.state.lock().unwrap().visits.clone()
    }

    /// `(name attribute, value)` of every filled input, in order.
    pub fn filled(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().filled.clone()
    }

    /// Ids of every checkbox clicked, in order.
    pub fn checked(&self) -> Vec<String> {
        self.state.lock().unwrap().checked.clone()
    }

    pub fn clicks(&self) -> usize {
        self.state.lock().unwrap().clicks
    }

    /// Click `element`. True when the click loaded another page.
    fn press(&self, element: ElementHandle) -> Result<bool, DriverError> {
        let target = self.with_document(|state, all| {
            let index = Self::index(state, all, element)?;
            let el = all[index];
            if el.value().attr("data-fail-click").is_some() {
                return Err(DriverError::Script("element is not clickable".to_string()));
            }
            state.clicks += 1;
            if el.value().name() == "input" && el.value().attr("type") == Some("checkbox") {
                if !state.toggled.remove(&index) {
                    state.toggled.insert(index);
                }
                state.checked.push(el.value().id().unwrap_or_default().to_string());
            }
            for e in self_and_ancestors(el) {
                if let Some(url) = e.value().attr("data-goto") {
                    return Ok(Some(url.to_string()));
                }
                if let Some(pane) = e.value().attr("data-pane") {
                    state.pane = Some(pane.to_string());
                    return Ok(None);
                }
            }
            Ok(None)
        })?;

        match target {
            Some(url) => {
                let mut state = self.state.lock().unwrap();
                self.load(&mut state, &url)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn load(&self, state: &mut State, url: &str) -> Result<(), DriverError> {
        if !self.pages.contains_key(url) {
            return Err(DriverError::Connection(format!("no fixture page for {}", url)));
        }
        state.url = Some(url.to_string());
        state.pane = None;
        state.generation += 1;
        state.values.clear();
        state.toggled.clear();
        state.visits.push(url.to_string());
        Ok(())
    }

    /// Render the current document and hand every element, in document
    /// order, to `f`. Element indices in that slice are the handle payload.
    fn with_document<T>(
        &self,
        f: impl FnOnce(&mut State, &[ElementRef<'_>]) -> Result<T, DriverError>,
    ) -> Result<T, DriverError> {
        let mut state = self.state.lock().unwrap();
        let url = state
            .url
            .clone()
            .ok_or_else(|| DriverError::Protocol("no page loaded".to_string()))?;
        let body = self.pages.get(&url).map(String::as_str).unwrap_or("");
        let pane = state
            .pane
            .as_ref()
            .and_then(|name| self.panes.get(name))
            .map(String::as_str)
            .unwrap_or("");

        let html = Html::parse_document(&format!(
            "<html><head></head><body>{}<div id=\"jobsearch-ViewjobPaneWrapper\">{}</div></body></html>",
            body, pane
        ));
        let any = selector("*")?;
        let all: Vec<ElementRef<'_>> = html.select(&any).collect();
        f(&mut state, &all)
    }

    fn handle(state: &State, all: &[ElementRef<'_>], el: ElementRef<'_>) -> ElementHandle {
        let index = all.iter().position(|e| *e == el).unwrap_or(usize::MAX);
        ElementHandle((state.generation << 32) | index as u64)
    }

    fn index(state: &State, all: &[ElementRef<'_>], handle: ElementHandle) -> Result<usize, DriverError> {
        let generation = handle.0 >> 32;
        let index = (handle.0 & 0xffff_ffff) as usize;
        if generation != state.generation || index >= all.len() {
            return Err(DriverError::StaleElement);
        }
        Ok(index)
    }

    fn matching(
        state: &State,
        all: &[ElementRef<'_>],
        scope: Option<ElementHandle>,
        selector_text: &str,
    ) -> Result<Vec<ElementHandle>, DriverError> {
        let sel = selector(selector_text)?;
        let matches: Vec<ElementRef<'_>> = match scope {
            Some(scope) => {
                let scope_el = all[Self::index(state, all, scope)?];
                scope_el.select(&sel).filter(|e| *e != scope_el).collect()
            }
            None => all.iter().copied().filter(|e| sel.matches(e)).collect(),
        };
        Ok(matches
            .into_iter()
            .map(|el| Self::handle(state, all, el))
            .collect())
    }
}

#[async_trait]
impl Page for FixturePage {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        self.load(&mut state, url)
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        let state = self.state.lock().unwrap();
        Ok(state.url.clone().unwrap_or_default())
    }

    async fn query(&self, selector: &str) -> Result<Option<ElementHandle>, DriverError> {
        self.with_document(|state, all| {
            Ok(Self::matching(state, all, None, selector)?.into_iter().next())
        })
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, DriverError> {
        self.with_document(|state, all| Self::matching(state, all, None, selector))
    }

    async fn query_within(
        &self,
        scope: ElementHandle,
        selector: &str,
    ) -> Result<Option<ElementHandle>, DriverError> {
        self.with_document(|state, all| {
            Ok(Self::matching(state, all, Some(scope), selector)?
                .into_iter()
                .next())
        })
    }

    async fn query_all_within(
        &self,
        scope: ElementHandle,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, DriverError> {
        self.with_document(|state, all| Self::matching(state, all, Some(scope), selector))
    }

    async fn inner_text(&self, element: ElementHandle) -> Result<String, DriverError> {
        self.with_document(|state, all| Ok(text_of(all[Self::index(state, all, element)?])))
    }

    async fn inner_html(&self, element: ElementHandle) -> Result<String, DriverError> {
        self.with_document(|state, all| Ok(all[Self::index(state, all, element)?].inner_html()))
    }

    async fn attribute(
        &self,
        element: ElementHandle,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        self.with_document(|state, all| {
            let el = all[Self::index(state, all, element)?];
            Ok(el.value().attr(name).map(String::from))
        })
    }

    async fn is_visible(&self, element: ElementHandle) -> Result<bool, DriverError> {
        self.with_document(|state, all| Ok(!is_hidden(all[Self::index(state, all, element)?])))
    }

    async fn is_checked(&self, element: ElementHandle) -> Result<bool, DriverError> {
        self.with_document(|state, all| {
            let index = Self::index(state, all, element)?;
            let initially = all[index].value().attr("checked").is_some();
            Ok(initially != state.toggled.contains(&index))
        })
    }

    async fn fill(&self, element: ElementHandle, value: &str) -> Result<(), DriverError> {
        self.with_document(|state, all| {
            let index = Self::index(state, all, element)?;
            let el = all[index];
            if !matches!(el.value().name(), "input" | "textarea") {
                return Err(DriverError::Script(format!(
                    "cannot fill a <{}> element",
                    el.value().name()
                )));
            }
            let name = el.value().attr("name").unwrap_or_default().to_string();
            state.values.insert(index, value.to_string());
            state.filled.push((name, value.to_string()));
            Ok(())
        })
    }

    async fn click(&self, element: ElementHandle) -> Result<(), DriverError> {
        self.press(element).map(|_| ())
    }

    async fn click_and_navigate(
        &self,
        element: ElementHandle,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        if self.press(element)? {
            Ok(())
        } else {
            Err(DriverError::Timeout {
                selector: "page load after click".to_string(),
                timeout,
            })
        }
    }

    async fn scroll_into_view(&self, element: ElementHandle) -> Result<(), DriverError> {
        self.with_document(|state, all| Self::index(state, all, element).map(|_| ()))
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
        state: WaitState,
    ) -> Result<ElementHandle, DriverError> {
        // Static documents never change on their own: check once
        let found = self.with_document(|doc_state, all| {
            let handles = Self::matching(doc_state, all, None, selector)?;
            Ok(handles.into_iter().find(|handle| match state {
                WaitState::Attached => true,
                WaitState::Visible => Self::index(doc_state, all, *handle)
                    .map(|index| !is_hidden(all[index]))
                    .unwrap_or(false),
            }))
        })?;
        found.ok_or_else(|| DriverError::Timeout {
            selector: selector.to_string(),
            timeout,
        })
    }
}
