use std::time::Duration;

use anyhow::{Context, bail};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{
    Client, StatusCode,
    header::{ACCEPT, HeaderMap, HeaderName, HeaderValue},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    application::services::sender::MessageSender,
    domain::models::{Message, SendReceipt},
};

const ACCEPTED: &str = "Accepted";

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub url: String,
    /// Maximum number of characters sent per message; `None` sends content untouched.
    pub character_limit: Option<u32>,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

/// Delivers messages by POSTing `{"to", "content"}` to a webhook that replies
/// `202 {"message": "Accepted", "messageId": ...}`.
pub struct WebhookSender {
    http: Client,
    url: String,
    character_limit: Option<u32>,
    headers: HeaderMap,
}

impl WebhookSender {
    pub fn new(config: WebhookConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("invalid header name {name:?}"))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("invalid value for header {name}"))?;
            headers.append(name, value);
        }
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .user_agent("messaging-dispatcher/webhook")
            .timeout(config.timeout)
            .build()
            .context("building webhook client")?;

        Ok(Self {
            http,
            url: config.url,
            character_limit: config.character_limit,
            headers,
        })
    }

    fn payload<'a>(&self, message: &'a Message) -> anyhow::Result<WebhookPayload<'a>> {
        let content = match self.character_limit {
            Some(limit) => message
                .truncated_content(isize::try_from(limit).unwrap_or(isize::MAX))
                .context("truncating message")?,
            None => message.content(),
        };
        Ok(WebhookPayload {
            to: message.recipient(),
            content,
        })
    }
}

#[async_trait]
impl MessageSender for WebhookSender {
    async fn send(&self, message: &Message) -> anyhow::Result<SendReceipt> {
        let payload = self.payload(message)?;

        let sent_at = Utc::now();
        let response = self
            .http
            .post(&self.url)
            .headers(self.headers.clone())
            .json(&payload)
            .send()
            .await
            .context("sending request")?;

        let status = response.status();
        if status != StatusCode::ACCEPTED {
            bail!("sending request: received status {}", status.as_u16());
        }

        let body: WebhookResponse = response.json().await.context("parsing response")?;
        let external_id = body.into_external_id()?;
        debug!(message_id = %message.id(), %external_id, "webhook accepted message");

        Ok(SendReceipt {
            external_id,
            sent_at,
        })
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    to: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookResponse {
    #[serde(default)]
    message: String,
    #[serde(default)]
    message_id: String,
}

impl WebhookResponse {
    fn into_external_id(self) -> anyhow::Result<String> {
        if self.message != ACCEPTED {
            bail!("unexpected response message {:?}", self.message);
        }
        if self.message_id.trim().is_empty() {
            bail!("blank message id in response");
        }
        Ok(self.message_id)
    }
}
