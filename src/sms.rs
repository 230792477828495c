//! Outbound SMS notifications
//!
//! Fire-and-forget: callers log failures, nothing is retried.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// SMS gateway settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsConfig {
    pub url: String,
    pub sender_id: String,
    pub api_key: String,
    pub client_id: String,
    pub access_key: String,
    pub timeout: Duration,
}

#[derive(Debug, Error)]
pub enum SmsError {
    #[error("SMS transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("SMS gateway rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Sends a text message to a subscriber
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, msisdn: &str, text: &str) -> Result<(), SmsError>;
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendRequest<'a> {
    sender_id: &'a str,
    api_key: &'a str,
    client_id: &'a str,
    message_parameters: [MessageParameter<'a>; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct MessageParameter<'a> {
    number: &'a str,
    text: &'a str,
}

/// HTTP client for the bulk SMS gateway
pub struct SmsClient {
    client: Client,
    config: SmsConfig,
}

impl SmsClient {
    pub fn new(config: SmsConfig) -> Result<Self, SmsError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Notifier for SmsClient {
    async fn send(&self, msisdn: &str, text: &str) -> Result<(), SmsError> {
        let start = std::time::Instant::now();
        let request = SendRequest {
            sender_id: &self.config.sender_id,
            api_key: &self.config.api_key,
            client_id: &self.config.client_id,
            message_parameters: [MessageParameter {
                number: msisdn,
                text,
            }],
        };

        let response = self
            .client
            .post(&self.config.url)
            .header("accesskey", &self.config.access_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                msisdn = %msisdn,
                status = status.as_u16(),
                duration_ms = %start.elapsed().as_millis(),
                "SMS rejected"
            );
            return Err(SmsError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(
            msisdn = %msisdn,
            duration_ms = %start.elapsed().as_millis(),
            "SMS sent"
        );
        Ok(())
    }
}

/// Stand-in when no SMS gateway is configured
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, msisdn: &str, text: &str) -> Result<(), SmsError> {
        tracing::info!(msisdn = %msisdn, text = %text, "SMS disabled, message not sent");
        Ok(())
    }
}
