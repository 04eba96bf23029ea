//! Chrome DevTools Protocol page driver.
//!
//! Attaches to a Chromium instance started with `--remote-debugging-port`,
//! takes over its first page target and drives it with `Runtime.evaluate`.
//! Located elements are kept in a page-side array so they can be referred to
//! by index across calls; a navigation clears that array.
//!
//! Navigations are detected by tagging the outgoing document with a token
//! and polling until a document without that token has finished loading.

use super::driver::{DriverError, ElementHandle, Page, WaitState};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const HANDLES: &str = "(window.__jobscoutHandles = window.__jobscoutHandles || [])";
const DOCUMENT_TOKEN: &str = "window.__jobscoutDocument";
const STALE_MARKER: &str = "jobscout:stale-element";
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Deserialize)]
struct TargetInfo {
    #[serde(rename = "type")]
    target_type: String,
    #[serde(default)]
    url: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    web_socket_debugger_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CdpReply {
    id: Option<u64>,
    result: Option<Value>,
    error: Option<CdpErrorBody>,
}

#[derive(Debug, Deserialize)]
struct CdpErrorBody {
    message: String,
}

/// A browser page controlled over the DevTools websocket.
pub struct CdpPage {
    socket: Mutex<WsStream>,
    next_id: AtomicU64,
    command_timeout: Duration,
}

impl CdpPage {
    /// Attach to the running browser whose DevTools HTTP endpoint is `endpoint`
    /// (e.g. "http://localhost:9222").
    pub async fn attach(endpoint: &str, command_timeout: Duration) -> Result<Self, DriverError> {
        let endpoint = endpoint.trim_end_matches('/');
        let http = reqwest::Client::builder()
            .timeout(command_timeout)
            .build()
            .map_err(|e| DriverError::Connection(e.to_string()))?;

        let targets: Vec<TargetInfo> = http
            .get(format!("{}/json/list", endpoint))
            .send()
            .await
            .map_err(|e| {
                DriverError::Connection(format!(
                    "Could not reach DevTools at {} (is the browser running with --remote-debugging-port?): {}",
                    endpoint, e
                ))
            })?
            .json()
            .await
            .map_err(|e| DriverError::Protocol(format!("Invalid target list: {}", e)))?;

        let existing = targets
            .into_iter()
            .find(|t| t.target_type == "page" && t.web_socket_debugger_url.is_some());

        let target = match existing {
            Some(target) => target,
            None => {
                debug!("No page target open, creating one");
                http.put(format!("{}/json/new", endpoint))
                    .send()
                    .await
                    .map_err(|e| DriverError::Connection(e.to_string()))?
                    .json()
                    .await
                    .map_err(|e| DriverError::Protocol(format!("Invalid new target: {}", e)))?
            }
        };

        let ws_url = target
            .web_socket_debugger_url
            .ok_or_else(|| DriverError::Protocol("Page target has no debugger url".into()))?;

        let (socket, _) = connect_async(ws_url.as_str())
            .await
            .map_err(|e| DriverError::Connection(e.to_string()))?;

        info!("Attached to browser page: {}", target.url);

        let page = Self {
            socket: Mutex::new(socket),
            next_id: AtomicU64::new(1),
            command_timeout,
        };
        page.send("Page.enable", json!({})).await?;
        Ok(page)
    }

    async fn send(&self, method: &str, params: Value) -> Result<Value, DriverError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({ "id": id, "method": method, "params": params });

        let mut socket = self.socket.lock().await;
        socket
            .send(Message::Text(payload.to_string().into()))
            .await
            .map_err(|e| DriverError::Connection(e.to_string()))?;

        let read_reply = async {
            while let Some(message) = socket.next().await {
                let message = message.map_err(|e| DriverError::Connection(e.to_string()))?;
                let text = match message {
                    Message::Text(text) => text,
                    Message::Close(_) => {
                        return Err(DriverError::Connection("DevTools socket closed".into()))
                    }
                    _ => continue,
                };
                let reply: CdpReply = serde_json::from_str(text.as_str())
                    .map_err(|e| DriverError::Protocol(e.to_string()))?;
                // Events and replies to other commands are skipped
                if reply.id != Some(id) {
                    continue;
                }
                if let Some(error) = reply.error {
                    return Err(DriverError::Protocol(format!("{}: {}", method, error.message)));
                }
                return Ok(reply.result.unwrap_or(Value::Null));
            }
            Err(DriverError::Connection("DevTools socket closed".into()))
        };

        tokio::time::timeout(self.command_timeout, read_reply)
            .await
            .map_err(|_| DriverError::Timeout {
                selector: method.to_string(),
                timeout: self.command_timeout,
            })?
    }

    async fn evaluate(&self, expression: String) -> Result<Value, DriverError> {
        let result = self
            .send(
                "Runtime.evaluate",
                json!({ "expression": expression, "returnByValue": true }),
            )
            .await?;

        if let Some(details) = result.get("exceptionDetails") {
            let description = details
                .pointer("/exception/description")
                .and_then(Value::as_str)
                .or_else(|| details.get("text").and_then(Value::as_str))
                .unwrap_or("unknown script error");
            if description.contains(STALE_MARKER) {
                return Err(DriverError::StaleElement);
            }
            return Err(DriverError::Script(description.to_string()));
        }

        Ok(result.pointer("/result/value").cloned().unwrap_or(Value::Null))
    }

    async fn evaluate_on(&self, element: ElementHandle, body: &str) -> Result<Value, DriverError> {
        self.evaluate(element_script(element, body)).await
    }

    /// Tag the current document so its replacement can be told apart.
    async fn mark_document(&self) -> Result<u64, DriverError> {
        let token = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.evaluate(mark_document_script(token)).await?;
        Ok(token)
    }

    async fn wait_for_new_document(
        &self,
        token: u64,
        what: &str,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        let started = Instant::now();
        loop {
            match self.evaluate(document_replaced_script(token)).await {
                Ok(value) if value.as_bool() == Some(true) => return Ok(()),
                Ok(_) => {}
                // The execution context goes away while the new document commits
                Err(DriverError::Protocol(e)) | Err(DriverError::Script(e)) => {
                    debug!("Still waiting for {}: {}", what, e)
                }
                Err(e) => return Err(e),
            }
            if started.elapsed() >= timeout {
                return Err(DriverError::Timeout {
                    selector: what.to_string(),
                    timeout,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn find(
        &self,
        scope: Option<ElementHandle>,
        selector: &str,
        require_visible: bool,
    ) -> Result<Option<ElementHandle>, DriverError> {
        let filter = if require_visible {
            format!(
                "const el = Array.from(root.querySelectorAll({sel})).find({vis});",
                sel = js_string(selector),
                vis = IS_VISIBLE
            )
        } else {
            format!("const el = root.querySelector({});", js_string(selector))
        };
        let body = format!(
            "{} if (!el) return null; handles.push(el); return handles.length - 1;",
            filter
        );
        let value = self.evaluate(scoped_script(scope, &body)).await?;
        Ok(value.as_u64().map(ElementHandle))
    }

    async fn find_all(
        &self,
        scope: Option<ElementHandle>,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, DriverError> {
        let body = format!(
            "return Array.from(root.querySelectorAll({})).map(el => {{ handles.push(el); return handles.length - 1; }});",
            js_string(selector)
        );
        let value = self.evaluate(scoped_script(scope, &body)).await?;
        let handles = value
            .as_array()
            .map(|items| items.iter().filter_map(Value::as_u64).map(ElementHandle).collect())
            .unwrap_or_default();
        Ok(handles)
    }
}

const IS_VISIBLE: &str = "(e => { const r = e.getBoundingClientRect(); const s = getComputedStyle(e); return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none'; })";

fn mark_document_script(token: u64) -> String {
    format!("{} = {}; true", DOCUMENT_TOKEN, token)
}

fn document_replaced_script(token: u64) -> String {
    format!(
        "{} !== {} && document.readyState === 'complete'",
        DOCUMENT_TOKEN, token
    )
}

fn js_string(s: &str) -> String {
    // JSON string literals are valid JavaScript string literals
    Value::String(s.to_string()).to_string()
}

fn element_script(element: ElementHandle, body: &str) -> String {
    format!(
        "(() => {{ const handles = {handles}; const el = handles[{id}]; if (!el || !el.isConnected) throw new Error('{stale}'); {body} }})()",
        handles = HANDLES,
        id = element.0,
        stale = STALE_MARKER,
        body = body
    )
}

fn scoped_script(scope: Option<ElementHandle>, body: &str) -> String {
    match scope {
        Some(element) => element_script(element, &format!("const root = el; {{ {} }}", body)),
        None => format!(
            "(() => {{ const handles = {}; const root = document; {} }})()",
            HANDLES, body
        ),
    }
}

#[async_trait]
impl Page for CdpPage {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        let token = self.mark_document().await?;
        let result = self.send("Page.navigate", json!({ "url": url })).await?;
        if let Some(error) = result.get("errorText").and_then(Value::as_str) {
            return Err(DriverError::Connection(format!(
                "Navigation to {} failed: {}",
                url, error
            )));
        }
        self.wait_for_new_document(token, &format!("load of {}", url), self.command_timeout)
            .await
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        let value = self.evaluate("location.href".to_string()).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn query(&self, selector: &str) -> Result<Option<ElementHandle>, DriverError> {
        self.find(None, selector, false).await
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, DriverError> {
        self.find_all(None, selector).await
    }

    async fn query_within(
        &self,
        scope: ElementHandle,
        selector: &str,
    ) -> Result<Option<ElementHandle>, DriverError> {
        self.find(Some(scope), selector, false).await
    }

    async fn query_all_within(
        &self,
        scope: ElementHandle,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, DriverError> {
        self.find_all(Some(scope), selector).await
    }

    async fn inner_text(&self, element: ElementHandle) -> Result<String, DriverError> {
        let value = self.evaluate_on(element, "return el.innerText || '';").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn inner_html(&self, element: ElementHandle) -> Result<String, DriverError> {
        let value = self.evaluate_on(element, "return el.innerHTML || '';").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn attribute(
        &self,
        element: ElementHandle,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        let body = format!("return el.getAttribute({});", js_string(name));
        let value = self.evaluate_on(element, &body).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn is_visible(&self, element: ElementHandle) -> Result<bool, DriverError> {
        let body = format!("return {}(el);", IS_VISIBLE);
        let value = self.evaluate_on(element, &body).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn is_checked(&self, element: ElementHandle) -> Result<bool, DriverError> {
        let value = self.evaluate_on(element, "return !!el.checked;").await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn fill(&self, element: ElementHandle, value: &str) -> Result<(), DriverError> {
        let body = format!(
            "el.focus(); el.value = {}; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true;",
            js_string(value)
        );
        self.evaluate_on(element, &body).await?;
        Ok(())
    }

    async fn click(&self, element: ElementHandle) -> Result<(), DriverError> {
        self.evaluate_on(element, "el.click(); return true;").await?;
        Ok(())
    }

    async fn click_and_navigate(
        &self,
        element: ElementHandle,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        let token = self.mark_document().await?;
        self.click(element).await?;
        self.wait_for_new_document(token, "page load after click", timeout)
            .await
    }

    async fn scroll_into_view(&self, element: ElementHandle) -> Result<(), DriverError> {
        self.evaluate_on(element, "el.scrollIntoView({ block: 'center' }); return true;")
            .await?;
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
        state: WaitState,
    ) -> Result<ElementHandle, DriverError> {
        let started = Instant::now();
        loop {
            if let Some(handle) = self
                .find(None, selector, state == WaitState::Visible)
                .await?
            {
                return Ok(handle);
            }
            if started.elapsed() >= timeout {
                return Err(DriverError::Timeout {
                    selector: selector.to_string(),
                    timeout,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_string_escapes_quotes() {
        assert_eq!(js_string("a[aria-label='x']"), r#""a[aria-label='x']""#);
        assert_eq!(js_string(r#"say "hi""#), r#""say \"hi\"""#);
    }

    #[test]
    fn test_element_script_guards_stale_handles() {
        let script = element_script(ElementHandle(7), "return 1;");
        assert!(script.contains("handles[7]"));
        assert!(script.contains(STALE_MARKER));
        assert!(script.ends_with("})()"));
    }

    #[test]
    fn test_scoped_script_uses_document_without_scope() {
        let script = scoped_script(None, "return root === document;");
        assert!(script.contains("const root = document;"));
        let scoped = scoped_script(Some(ElementHandle(2)), "return root;");
        assert!(scoped.contains("const root = el;"));
    }

    #[test]
    fn test_new_document_needs_a_different_token_and_a_finished_load() {
        assert_eq!(mark_document_script(12), "window.__jobscoutDocument = 12; true");
        let replaced = document_replaced_script(12);
        assert!(replaced.starts_with("window.__jobscoutDocument !== 12"));
        assert!(replaced.ends_with("document.readyState === 'complete'"));
    }

    #[test]
    fn test_target_info_parses_devtools_listing() {
        let raw = r#"[{"description":"","id":"A","title":"Jobs","type":"page","url":"https://ca.indeed.com/","webSocketDebuggerUrl":"ws://localhost:9222/devtools/page/A"},
                      {"id":"B","type":"service_worker","url":"x"}]"#;
        let targets: Vec<TargetInfo> = serde_json::from_str(raw).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].target_type, "page");
        assert!(targets[1].web_socket_debugger_url.is_none());
    }
}
