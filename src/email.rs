use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_RESEND_API_URL: &str = "https://api.resend.com";

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("email provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("email provider rejected the message (status {status}): {body}")]
    Rejected { status: u16, body: String },
}

// Rendered message, serialized as the Resend request body
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    // returns the provider message id
    async fn send(&self, email: &OutgoingEmail) -> Result<String, EmailError>;
}

#[derive(Deserialize)]
struct SendResponse {
    id: String,
}

pub struct ResendClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl ResendClient {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>, base_url: &str) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/emails", self.base_url)
    }
}

#[async_trait]
impl EmailSender for ResendClient {
    async fn send(&self, email: &OutgoingEmail) -> Result<String, EmailError> {
        debug!(to = ?email.to, "sending email via Resend");

        let res = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(15))
            .json(email)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Resend rejected the message");
            return Err(EmailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body = res.json::<SendResponse>().await?;
        Ok(body.id)
    }
}
