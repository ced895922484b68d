//! Privacy policy text extraction
//!
//! Renders a policy page in a fresh browser, dismisses a consent banner if
//! one is obvious, and reads the visible text. Pages that hide their text
//! from `innerText` get a second attempt through select-all + copy.
//!
//! Rendering sits behind the blocking [`PageRenderer`] / [`RenderedPage`]
//! traits and runs on tokio's blocking pool.

mod chrome;
#[cfg(any(test, feature = "test-utils"))]
mod scripted;

pub use chrome::ChromeRenderer;
#[cfg(any(test, feature = "test-utils"))]
pub use scripted::ScriptedRenderer;

use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::ExtractionConfig;
use crate::error::Result;

/// Returned in place of text when the page had nothing usable
pub const NO_POLICY_FOUND: &str = "No policy found.";

/// Returned in place of text when rendering failed
pub const EXTRACTION_ERROR: &str = "Error retrieving policy.";

/// Matches consent buttons by their label
const CONSENT_LABEL_PATTERN: &str = r"(?i)\b(accept|agree|ok)\b";

/// Result of one extraction attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Policy text, untruncated
    Text(String),
    /// The page rendered but held too little text
    NotFound,
    /// Navigation or rendering failed
    Error(String),
}

impl Extraction {
    /// String form, with the sentinels standing in for non-text results
    pub fn as_str(&self) -> &str {
        match self {
            Extraction::Text(text) => text,
            Extraction::NotFound => NO_POLICY_FOUND,
            Extraction::Error(_) => EXTRACTION_ERROR,
        }
    }
}

/// Count of non-whitespace characters
pub fn meaningful_len(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// Whether text clears the policy threshold
///
/// Sentinel strings never count, whatever their length.
pub fn is_meaningful(text: &str, min_chars: usize) -> bool {
    let trimmed = text.trim();
    trimmed != NO_POLICY_FOUND
        && trimmed != EXTRACTION_ERROR
        && meaningful_len(trimmed) >= min_chars
}

/// Opens pages in an isolated rendering context
///
/// Implementations block; callers run them on the blocking pool.
pub trait PageRenderer: Send + Sync {
    /// Launch a context, navigate to `url`, and wait for the DOM
    ///
    /// The context lives as long as the returned page.
    fn open(&self, url: &str) -> Result<Box<dyn RenderedPage>>;
}

/// A loaded page
pub trait RenderedPage {
    /// `document.body.innerText`
    fn body_text(&self) -> Result<String>;

    /// Visible labels of the page's buttons, in document order
    fn button_labels(&self) -> Result<Vec<String>>;

    /// Click the button at `index` in `button_labels` order
    fn click_button(&self, index: usize) -> Result<()>;

    /// Simulate Ctrl+A then Ctrl+C
    fn select_all_and_copy(&self) -> Result<()>;

    fn read_clipboard(&self) -> Result<String>;
}

/// Policy text extractor
#[derive(Clone)]
pub struct PolicyTextExtractor {
    renderer: Arc<dyn PageRenderer>,
    min_text_chars: usize,
    clipboard_settle: Duration,
    consent_label: Regex,
}

impl PolicyTextExtractor {
    pub fn new(renderer: Arc<dyn PageRenderer>, config: &ExtractionConfig) -> Self {
        Self {
            renderer,
            min_text_chars: config.min_text_chars,
            clipboard_settle: config.clipboard_settle,
            consent_label: Regex::new(CONSENT_LABEL_PATTERN).expect("valid regex"),
        }
    }

    /// Extractor backed by headless Chrome
    pub fn chrome(config: &ExtractionConfig) -> Self {
        Self::new(Arc::new(ChromeRenderer::new(config)), config)
    }

    pub fn min_text_chars(&self) -> usize {
        self.min_text_chars
    }

    /// Extract the policy text at `url`
    ///
    /// Never fails outward: errors become [`Extraction::Error`].
    pub async fn extract(&self, url: &str) -> Extraction {
        info!(url = %url, "Opening privacy policy page");

        let this = self.clone();
        let url_owned = url.to_string();
        let handle = tokio::task::spawn_blocking(move || this.extract_blocking(&url_owned));

        match handle.await {
            Ok(Ok(Some(text))) => {
                debug!(url = %url, chars = meaningful_len(&text), "Extracted policy text");
                Extraction::Text(text)
            }
            Ok(Ok(None)) => {
                info!(url = %url, "Privacy policy not found on page");
                Extraction::NotFound
            }
            Ok(Err(e)) => {
                warn!(url = %url, error = %e, "Policy extraction failed");
                Extraction::Error(e.to_string())
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Policy extraction task panicked");
                Extraction::Error(format!("extraction task failed: {}", e))
            }
        }
    }

    fn extract_blocking(&self, url: &str) -> Result<Option<String>> {
        let page = self.renderer.open(url)?;

        self.dismiss_consent(page.as_ref());

        let mut text = page.body_text()?.trim().to_string();

        if !is_meaningful(&text, self.min_text_chars) {
            debug!(url = %url, chars = meaningful_len(&text), "Page text too short, trying clipboard copy");
            page.select_all_and_copy()?;
            std::thread::sleep(self.clipboard_settle);
            text = page.read_clipboard()?;
        }

        if is_meaningful(&text, self.min_text_chars) {
            Ok(Some(text))
        } else {
            Ok(None)
        }
    }

    /// Click the first button labelled accept/agree/ok, if any
    fn dismiss_consent(&self, page: &dyn RenderedPage) {
        let labels = match page.button_labels() {
            Ok(labels) => labels,
            Err(e) => {
                debug!(error = %e, "Could not read buttons, skipping consent dismissal");
                return;
            }
        };

        let Some(index) = labels.iter().position(|l| self.consent_label.is_match(l)) else {
            debug!("No consent button found");
            return;
        };

        match page.click_button(index) {
            Ok(()) => debug!(label = %labels[index].trim(), "Dismissed consent banner"),
            Err(e) => debug!(error = %e, "Consent button click failed"),
        }
    }
}
