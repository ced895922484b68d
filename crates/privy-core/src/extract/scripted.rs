//! Scripted renderer for tests
//!
//! Plays back a fixed page: body text, clipboard contents and button labels.
//! Clones share their records, so a test can keep a handle after giving the
//! renderer to an extractor.

use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};

use super::{PageRenderer, RenderedPage};

#[derive(Debug, Clone, Default)]
struct Script {
    open_error: Option<String>,
    body: String,
    clipboard: String,
    buttons: Vec<String>,
}

#[derive(Debug, Default)]
struct Records {
    opened: Vec<String>,
    clicked: Vec<usize>,
    copies: usize,
}

/// Renderer that plays back a fixed page
#[derive(Debug, Clone, Default)]
pub struct ScriptedRenderer {
    script: Script,
    records: Arc<Mutex<Records>>,
}

impl ScriptedRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, text: &str) -> Self {
        self.script.body = text.to_string();
        self
    }

    pub fn with_clipboard(mut self, text: &str) -> Self {
        self.script.clipboard = text.to_string();
        self
    }

    pub fn with_buttons(mut self, labels: &[&str]) -> Self {
        self.script.buttons = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    /// Make `open` fail with this message
    pub fn failing(mut self, message: &str) -> Self {
        self.script.open_error = Some(message.to_string());
        self
    }

    pub fn opened_urls(&self) -> Vec<String> {
        self.records.lock().map(|r| r.opened.clone()).unwrap_or_default()
    }

    pub fn clicked(&self) -> Vec<usize> {
        self.records.lock().map(|r| r.clicked.clone()).unwrap_or_default()
    }

    /// Number of select-all + copy simulations
    pub fn copy_attempts(&self) -> usize {
        self.records.lock().map(|r| r.copies).unwrap_or_default()
    }

    fn record(&self, f: impl FnOnce(&mut Records)) {
        if let Ok(mut records) = self.records.lock() {
            f(&mut records);
        }
    }
}

impl PageRenderer for ScriptedRenderer {
    fn open(&self, url: &str) -> Result<Box<dyn RenderedPage>> {
        self.record(|r| r.opened.push(url.to_string()));
        if let Some(message) = &self.script.open_error {
            return Err(Error::Extraction(message.clone()));
        }
        Ok(Box::new(self.clone()))
    }
}

impl RenderedPage for ScriptedRenderer {
    fn body_text(&self) -> Result<String> {
        Ok(self.script.body.clone())
    }

    fn button_labels(&self) -> Result<Vec<String>> {
        Ok(self.script.buttons.clone())
    }

    fn click_button(&self, index: usize) -> Result<()> {
        if index >= self.script.buttons.len() {
            return Err(Error::Extraction(format!("button {} is gone", index)));
        }
        self.record(|r| r.clicked.push(index));
        Ok(())
    }

    fn select_all_and_copy(&self) -> Result<()> {
        self.record(|r| r.copies += 1);
        Ok(())
    }

    fn read_clipboard(&self) -> Result<String> {
        Ok(self.script.clipboard.clone())
    }
}
