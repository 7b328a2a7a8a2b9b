use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info};

use shared_config::AppConfig;

use crate::{MessagingError, NotificationChannel};

const DEFAULT_BASE_URL: &str = "https://api.twilio.com";

/// Thin Twilio Messages API client.
pub struct TwilioSmsClient {
    http: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
    base_url: String,
}

impl TwilioSmsClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
            from_number: config.twilio_from_number.clone(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different API host. Tests use this to target a
    /// local mock server.
    pub fn with_base_url(config: &AppConfig, base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::new(config)
        }
    }
}

#[async_trait]
impl NotificationChannel for TwilioSmsClient {
    async fn send(&self, to: &str, body: &str) -> Result<String, MessagingError> {
        if self.account_sid.is_empty() || self.auth_token.is_empty() {
            return Err(MessagingError::NotConfigured(
                "Twilio credentials missing".to_string(),
            ));
        }

        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        );
        let params = [("To", to), ("From", self.from_number.as_str()), ("Body", body)];

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!("Twilio rejected SMS to {}: status {}: {}", to, status, detail);
            return Err(MessagingError::ProviderRejected {
                status: status.as_u16(),
                detail,
            });
        }

        let payload: Value = response.json().await?;
        let sid = payload["sid"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| MessagingError::Delivery("response missing message sid".to_string()))?;

        info!("SMS sent successfully. SID: {}, To: {}", sid, to);
        Ok(sid)
    }
}
