use std::sync::Arc;

use async_trait::async_trait;
use log::error;
use thiserror::Error;
use tracing::info;

use crate::config::{SmsConfig, SmsProvider};
use crate::phone::fingerprint;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SmsMessage {
    pub to: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("rejected by provider ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait SmsGateway: Send + Sync {
    async fn send(&self, message: &SmsMessage) -> Result<(), DeliveryError>;
}

// ---------------- Twilio Programmable Messaging ----------------
pub struct TwilioGateway {
    client: reqwest::Client,
    api_base: String,
    account_sid: String,
    auth_token: String,
    from: String,
}

impl TwilioGateway {
    pub fn new(
        api_base: impl Into<String>,
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from: impl Into<String>,
        timeout: std::time::Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            from: from.into(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/2010-04-01/Accounts/{}/Messages.json", self.api_base, self.account_sid)
    }
}

#[async_trait]
impl SmsGateway for TwilioGateway {
    async fn send(&self, message: &SmsMessage) -> Result<(), DeliveryError> {
        let params = [
            ("To", message.to.as_str()),
            ("From", self.from.as_str()),
            ("Body", message.body.as_str()),
        ];
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                error!("twilio request failed: {e}");
                DeliveryError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("twilio rejected message ({status}): {body}");
            return Err(DeliveryError::Rejected { status: status.as_u16(), body });
        }
        info!(to = %fingerprint(&message.to), "SMS accepted by Twilio");
        Ok(())
    }
}

// ---------------- Development gateway ----------------
/// Logs the message instead of sending it. Never use in production: the code
/// ends up in the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogGateway;

#[async_trait]
impl SmsGateway for LogGateway {
    async fn send(&self, message: &SmsMessage) -> Result<(), DeliveryError> {
        info!(to = %fingerprint(&message.to), body = %message.body, "SMS (log gateway)");
        Ok(())
    }
}

/// Build the gateway named by `SMS_PROVIDER`.
pub fn build_sms_gateway(cfg: &SmsConfig) -> anyhow::Result<Arc<dyn SmsGateway>> {
    match cfg.provider {
        SmsProvider::Log => {
            tracing::warn!("SMS_PROVIDER=log: OTP codes are written to the log, not delivered");
            Ok(Arc::new(LogGateway))
        }
        SmsProvider::Twilio => {
            let missing = cfg.missing_vars();
            if !missing.is_empty() {
                anyhow::bail!("Twilio gateway needs {}", missing.join(", "));
            }
            let gw = TwilioGateway::new(
                cfg.twilio_api_base.clone(),
                cfg.twilio_account_sid.clone().unwrap_or_default(),
                cfg.twilio_auth_token.clone().unwrap_or_default(),
                cfg.twilio_from.clone().unwrap_or_default(),
                cfg.timeout,
            )?;
            info!("Initialized Twilio gateway ({})", cfg.twilio_api_base);
            Ok(Arc::new(gw))
        }
    }
}
