//! Automation driver trait definition.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Opaque reference to an element the driver has located.
///
/// Handles are only meaningful to the driver that produced them and may go
/// stale once the page navigates or re-renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub u64);

/// Element state to wait for in [`Page::wait_for_selector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitState {
    /// Present in the DOM.
    #[default]
    Attached,
    /// Present and rendered with a non-empty box.
    Visible,
}

/// Errors that can occur when driving the browser.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Timed out after {timeout:?} waiting for '{selector}'")]
    Timeout { selector: String, timeout: Duration },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Element is no longer attached to the page")]
    StaleElement,

    #[error("Script error: {0}")]
    Script(String),
}

impl DriverError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, DriverError::Timeout { .. })
    }
}

/// A single remote-controlled browser page.
///
/// Calls are sequential: the page is one shared resource and every method
/// blocks the caller until it completes or its timeout elapses.
#[async_trait]
pub trait Page: Send + Sync {
    /// Navigate to `url` and wait for the document to finish loading.
    async fn goto(&self, url: &str) -> Result<(), DriverError>;

    /// URL of the currently loaded document.
    async fn current_url(&self) -> Result<String, DriverError>;

    /// First element in the document matching `selector`.
    async fn query(&self, selector: &str) -> Result<Option<ElementHandle>, DriverError>;

    /// Every element in the document matching `selector`, in document order.
    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, DriverError>;

    /// First descendant of `scope` matching `selector`.
    async fn query_within(
        &self,
        scope: ElementHandle,
        selector: &str,
    ) -> Result<Option<ElementHandle>, DriverError>;

    /// Every descendant of `scope` matching `selector`.
    async fn query_all_within(
        &self,
        scope: ElementHandle,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, DriverError>;

    async fn inner_text(&self, element: ElementHandle) -> Result<String, DriverError>;

    async fn inner_html(&self, element: ElementHandle) -> Result<String, DriverError>;

    async fn attribute(
        &self,
        element: ElementHandle,
        name: &str,
    ) -> Result<Option<String>, DriverError>;

    async fn is_visible(&self, element: ElementHandle) -> Result<bool, DriverError>;

    async fn is_checked(&self, element: ElementHandle) -> Result<bool, DriverError>;

    /// Replace the value of an input element.
    async fn fill(&self, element: ElementHandle, value: &str) -> Result<(), DriverError>;

    /// Click the element even if something overlays it.
    async fn click(&self, element: ElementHandle) -> Result<(), DriverError>;

    /// Click an element that loads another document, and return once that
    /// document has replaced the current one and finished loading.
    ///
    /// Handles from the old document are stale afterwards.
    async fn click_and_navigate(
        &self,
        element: ElementHandle,
        timeout: Duration,
    ) -> Result<(), DriverError>;

    async fn scroll_into_view(&self, element: ElementHandle) -> Result<(), DriverError>;

    /// Wait until an element matching `selector` reaches `state`.
    ///
    /// Fails with [`DriverError::Timeout`] once `timeout` elapses.
    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
        state: WaitState,
    ) -> Result<ElementHandle, DriverError>;
}
