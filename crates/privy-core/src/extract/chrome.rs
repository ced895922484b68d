//! headless_chrome renderer
//!
//! One browser process per page. Dropping the page drops the tab and then
//! the browser, which kills the process. Images, stylesheets, fonts and
//! media are failed at the network layer before they are requested.

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::browser::tab::{ModifierKey, RequestPausedDecision};
use headless_chrome::browser::transport::{SessionId, Transport};
use headless_chrome::protocol::cdp::Browser::{GrantPermissions, PermissionType};
use headless_chrome::protocol::cdp::Fetch::events::RequestPausedEvent;
use headless_chrome::protocol::cdp::Fetch::{FailRequest, RequestPattern, RequestStage};
use headless_chrome::protocol::cdp::Network::{ErrorReason, ResourceType};
use headless_chrome::{Browser, LaunchOptions, Tab};
use tracing::debug;

use crate::config::ExtractionConfig;
use crate::error::{Error, Result};

use super::{PageRenderer, RenderedPage};

const LAUNCH_ARGS: &[&str] = &["--ignore-certificate-errors", "--disable-infobars"];

const BUTTON_LABELS_JS: &str =
    "JSON.stringify([...document.querySelectorAll('button')].map(b => b.innerText || ''))";

/// Renderer backed by a local Chrome/Chromium
#[derive(Debug, Clone)]
pub struct ChromeRenderer {
    headless: bool,
    navigation_timeout: Duration,
}

impl ChromeRenderer {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            headless: config.headless,
            navigation_timeout: config.navigation_timeout,
        }
    }
}

fn chrome_err(action: &'static str) -> impl Fn(anyhow::Error) -> Error {
    move |e| Error::Extraction(format!("{}: {}", action, e))
}

/// Resource types that never carry policy text
const BLOCKED_RESOURCES: [ResourceType; 4] = [
    ResourceType::Image,
    ResourceType::Stylesheet,
    ResourceType::Font,
    ResourceType::Media,
];

/// Fetch patterns pausing every blocked resource before it is sent
fn blocked_request_patterns() -> Vec<RequestPattern> {
    BLOCKED_RESOURCES
        .into_iter()
        .map(|resource| RequestPattern {
            url_pattern: None,
            resource_Type: Some(resource),
            request_stage: Some(RequestStage::Request),
        })
        .collect()
}

/// Only blocked resource types are paused, so every paused request fails
fn block_paused_request(
    _transport: Arc<Transport>,
    _session_id: SessionId,
    event: RequestPausedEvent,
) -> RequestPausedDecision {
    RequestPausedDecision::Fail(FailRequest {
        request_id: event.params.request_id,
        error_reason: ErrorReason::BlockedByClient,
    })
}

/// Origin a clipboard grant can be scoped to; opaque origins get none
fn grantable_origin(origin: &str) -> Option<&str> {
    let origin = origin.trim();
    (origin.starts_with("http://") || origin.starts_with("https://")).then_some(origin)
}

impl PageRenderer for ChromeRenderer {
    fn open(&self, url: &str) -> Result<Box<dyn RenderedPage>> {
        let options = LaunchOptions::default_builder()
            .headless(self.headless)
            .args(LAUNCH_ARGS.iter().map(OsStr::new).collect())
            .idle_browser_timeout(self.navigation_timeout * 2)
            .build()
            .map_err(|e| Error::Extraction(format!("invalid browser options: {}", e)))?;

        let browser = Browser::new(options).map_err(chrome_err("Failed to launch browser"))?;
        let tab = browser
            .new_tab()
            .map_err(chrome_err("Failed to create tab"))?;
        tab.set_default_timeout(self.navigation_timeout);

        tab.enable_request_interception(Arc::new(block_paused_request))
            .map_err(chrome_err("Failed to install request filter"))?;
        let patterns = blocked_request_patterns();
        tab.enable_fetch(Some(patterns.as_slice()), None)
            .map_err(chrome_err("Failed to enable request filter"))?;

        tab.navigate_to(url)
            .map_err(chrome_err("Navigation failed"))?;
        tab.wait_until_navigated()
            .map_err(chrome_err("Page load failed"))?;

        Ok(Box::new(ChromePage {
            tab,
            _browser: browser,
        }))
    }
}

/// A loaded tab and the browser that owns it
struct ChromePage {
    tab: Arc<Tab>,
    _browser: Browser,
}

impl ChromePage {
    fn eval_string(&self, expression: &str, await_promise: bool) -> Result<String> {
        let object = self
            .tab
            .evaluate(expression, await_promise)
            .map_err(chrome_err("Script evaluation failed"))?;
        Ok(object
            .value
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default())
    }

    /// Clipboard reads need a permission grant and a focused document
    ///
    /// Best-effort: without it the later read fails and is reported there.
    fn grant_clipboard_access(&self) {
        let origin = match self.eval_string("location.origin", false) {
            Ok(origin) => origin,
            Err(e) => {
                debug!(error = %e, "Could not read page origin");
                return;
            }
        };

        if let Some(origin) = grantable_origin(&origin) {
            let grant = GrantPermissions {
                permissions: vec![PermissionType::ClipboardReadWrite],
                origin: Some(origin.to_string()),
                browser_context_id: None,
            };
            if let Err(e) = self.tab.call_method(grant) {
                debug!(origin = %origin, error = %e, "Clipboard permission grant failed");
            }
        }

        if let Err(e) = self.tab.bring_to_front() {
            debug!(error = %e, "Could not focus tab");
        }
    }
}

impl RenderedPage for ChromePage {
    fn body_text(&self) -> Result<String> {
        self.eval_string("document.body ? document.body.innerText : ''", false)
    }

    fn button_labels(&self) -> Result<Vec<String>> {
        let json = self.eval_string(BUTTON_LABELS_JS, false)?;
        if json.is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&json)?)
    }

    fn click_button(&self, index: usize) -> Result<()> {
        let script = format!(
            "(() => {{ const b = document.querySelectorAll('button')[{}]; if (b) {{ b.click(); }} return String(!!b); }})()",
            index
        );
        match self.eval_string(&script, false)?.as_str() {
            "true" => Ok(()),
            _ => Err(Error::Extraction(format!("button {} is gone", index))),
        }
    }

    fn select_all_and_copy(&self) -> Result<()> {
        self.grant_clipboard_access();
        self.tab
            .press_key_with_modifiers("a", Some(&[ModifierKey::Ctrl]))
            .map_err(chrome_err("Select-all failed"))?;
        self.tab
            .press_key_with_modifiers("c", Some(&[ModifierKey::Ctrl]))
            .map_err(chrome_err("Copy failed"))?;
        Ok(())
    }

    fn read_clipboard(&self) -> Result<String> {
        self.eval_string("navigator.clipboard.readText()", true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_blocks_non_text_resources() {
        let patterns = blocked_request_patterns();
        assert_eq!(patterns.len(), 4);
        for (pattern, expected) in patterns.iter().zip(BLOCKED_RESOURCES) {
            assert_eq!(pattern.resource_Type, Some(expected));
            assert_eq!(pattern.request_stage, Some(RequestStage::Request));
            assert!(pattern.url_pattern.is_none());
        }
        assert!(patterns
            .iter()
            .any(|p| p.resource_Type == Some(ResourceType::Stylesheet)));
        assert!(patterns
            .iter()
            .all(|p| p.resource_Type != Some(ResourceType::Document)));
    }

    #[test]
    fn test_grantable_origin() {
        assert_eq!(
            grantable_origin("https://example.com"),
            Some("https://example.com")
        );
        assert_eq!(grantable_origin(" http://127.0.0.1:8080 "), Some("http://127.0.0.1:8080"));
        assert_eq!(grantable_origin("null"), None);
        assert_eq!(grantable_origin("file://"), None);
    }
}
