use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;

use super::{ProviderMessage, SenderError, SmsSender};
use crate::config::ServerConfig;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Sends messages through the Twilio Messages REST endpoint.
pub struct TwilioSender {
    client: Client,
    config: Arc<ServerConfig>,
}

struct TwilioCredentials<'a> {
    account_sid: &'a str,
    auth_token: &'a str,
    from_number: &'a str,
}

impl TwilioSender {
    pub fn new(config: Arc<ServerConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn credentials(&self) -> Result<TwilioCredentials<'_>, SenderError> {
        match (
            &self.config.twilio_account_sid,
            &self.config.twilio_auth_token,
            &self.config.twilio_phone_number,
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => Ok(TwilioCredentials {
                account_sid,
                auth_token,
                from_number,
            }),
            _ => Err(SenderError::InvalidConfiguration(
                "Twilio credentials are not configured".to_string(),
            )),
        }
    }
}

#[derive(Deserialize)]
struct TwilioMessageResponse {
    sid: String,
    status: String,
}

#[async_trait]
impl SmsSender for TwilioSender {
    fn ensure_configured(&self) -> Result<(), SenderError> {
        self.credentials().map(|_| ())
    }

    async fn send(&self, to: &str, body: &str) -> Result<ProviderMessage, SenderError> {
        let creds = self.credentials()?;

        let url = format!("{TWILIO_API_BASE}/Accounts/{}/Messages.json", creds.account_sid);
        let params = [("To", to), ("From", creds.from_number), ("Body", body)];

        let response = self
            .client
            .post(&url)
            .basic_auth(creds.account_sid, Some(creds.auth_token))
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(SenderError::SendFailed(format!(
                "Twilio returned non-success status: {status}. Body: {error_body}"
            )));
        }

        let message: TwilioMessageResponse = response.json().await?;
        Ok(ProviderMessage {
            sid: message.sid,
            status: message.status,
        })
    }
}
