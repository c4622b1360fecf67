use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{NotificationSender, SenderError};
use crate::server::config::SmsConfig;

/// Messages longer than this (in bytes, EUC-KR counting) go out as LMS.
const SMS_MAX_BYTES: usize = 90;

#[derive(Serialize)]
struct SmsPayload<'a> {
    from: &'a str,
    to: String,
    text: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    subject: Option<&'a str>,
}

/// Sends text messages through an HTTP SMS gateway.
pub struct SmsSender {
    client: Client,
    config: SmsConfig,
}

impl SmsSender {
    pub fn new(config: SmsConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

/// Korean carriers bill by EUC-KR bytes: two per Hangul syllable, one per ASCII char.
pub fn message_bytes(text: &str) -> usize {
    text.chars().map(|c| if c.is_ascii() { 1 } else { 2 }).sum()
}

pub fn message_kind(text: &str) -> &'static str {
    if message_bytes(text) > SMS_MAX_BYTES {
        "LMS"
    } else {
        "SMS"
    }
}

#[async_trait]
impl NotificationSender for SmsSender {
    fn channel(&self) -> &'static str {
        "sms"
    }

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), SenderError> {
        let kind = message_kind(body);
        let payload = SmsPayload {
            from: &self.config.sender,
            to: recipient.chars().filter(|c| c.is_ascii_digit()).collect(),
            text: body,
            kind,
            subject: (kind == "LMS").then_some(subject),
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .header("X-API-KEY", &self.config.api_key)
            .header("X-API-SECRET", &self.config.api_secret)
            .json(&payload)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(SenderError::SendFailed(format!(
                "SMS gateway returned non-success status: {status}. Body: {error_body}"
            )));
        }

        Ok(())
    }
}
