//! Webhook delivery of report text.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Serialize;

use crate::error::NotifyError;

#[derive(Debug, Serialize)]
struct TextContent<'a> {
    text: &'a str,
}

/// Body of a plain-text bot message.
#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    msg_type: &'static str,
    content: TextContent<'a>,
}

impl<'a> TextMessage<'a> {
    fn new(text: &'a str) -> Self {
        TextMessage { msg_type: "text", content: TextContent { text } }
    }
}

pub struct WebhookNotifier {
    http: Client,
    url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(url: Option<String>) -> Result<Self, NotifyError> {
        let http = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(WebhookNotifier { http, url })
    }

    /// Post `text` as one message. Only the HTTP status is checked.
    pub fn send(&self, text: &str) -> Result<(), NotifyError> {
        let url = self.url.as_deref().ok_or(NotifyError::NotConfigured)?;
        let resp = self.http.post(url).json(&TextMessage::new(text)).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        log::debug!("webhook accepted message ({} bytes)", text.len());
        Ok(())
    }
}

/// Send a report and log the outcome. Failures are warnings, never errors.
pub fn deliver(url: Option<String>, text: &str) -> bool {
    let result = WebhookNotifier::new(url).and_then(|n| n.send(text));
    match result {
        Ok(()) => {
            println!("✓ Notification sent");
            true
        }
        Err(e) => {
            log::warn!("notification not delivered: {e}");
            false
        }
    }
}
