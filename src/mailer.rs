use std::fmt::Debug;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{info, instrument, trace};
use url::Url;

use crate::state::ReqwestClient;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("mail provider responded with status code: {0}")]
    Status(StatusCode),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl Email {
    pub fn verification(to: &str, code: &str) -> Self {
        Self {
            to: to.to_owned(),
            subject: "Confirm your email".to_owned(),
            html: format!("<p>Your confirmation code: <strong>{code}</strong></p>"),
        }
    }

    pub fn password_reset(to: &str, code: &str) -> Self {
        Self {
            to: to.to_owned(),
            subject: "Reset your password".to_owned(),
            html: format!("<p>Your password reset code: <strong>{code}</strong></p>"),
        }
    }

    pub fn two_factor(to: &str, code: &str) -> Self {
        Self {
            to: to.to_owned(),
            subject: "Your sign-in code".to_owned(),
            html: format!("<p>Your two-factor code: <strong>{code}</strong></p>"),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync + Debug {
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

/// Delivers through a JSON mail API authenticated with a bearer key.
#[derive(Clone)]
pub struct HttpMailer {
    client: ReqwestClient,
    endpoint: Url,
    api_key: String,
    from: String,
}

impl Debug for HttpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMailer")
            .field("endpoint", &self.endpoint.as_str())
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}

impl HttpMailer {
    pub fn new(client: ReqwestClient, endpoint: Url, api_key: String, from: String) -> Self {
        Self {
            client,
            endpoint,
            api_key,
            from,
        }
    }
}

#[derive(Serialize)]
struct MailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

#[async_trait]
impl Mailer for HttpMailer {
    #[instrument(skip_all, fields(to = %email.to))]
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        let body = MailRequest {
            from: &self.from,
            to: &email.to,
            subject: &email.subject,
            html: &email.html,
        };
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MailError::Status(status));
        }
        trace!("mail accepted by provider");
        Ok(())
    }
}

/// Writes outgoing mail to the log, used when no provider is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        info!(to = %email.to, subject = %email.subject, "{}", email.html);
        Ok(())
    }
}
