//! Customer email delivery via the Resend API.
//!
//! Email is strictly best-effort: a failed send is logged and never affects
//! fulfillment correctness. The download email is retried with exponential
//! backoff before giving up; the order confirmation is a single attempt.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Retry delays in seconds (exponential backoff: 1s, 4s, 16s)
const RETRY_DELAYS: &[u64] = &[1, 4, 16];

/// Errors from the email backend.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("email request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("email API returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// Outbound email sender.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError>;
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// Resend-backed mailer.
#[derive(Debug, Clone)]
pub struct ResendMailer {
    client: Client,
    api_key: String,
    from: String,
}

impl ResendMailer {
    pub fn new(api_key: String, from: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        let response = self
            .client
            .post(RESEND_API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&SendEmailRequest {
                from: &self.from,
                to: [to],
                subject,
                html,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Api { status, body });
        }

        Ok(())
    }
}

/// Send with bounded retry.
///
/// Attempts once, then once more after each delay in [`RETRY_DELAYS`].
/// Returns the last error when every attempt fails.
pub async fn send_with_retry(
    mailer: &dyn Mailer,
    to: &str,
    subject: &str,
    html: &str,
) -> Result<(), MailError> {
    let mut last_err = None;

    for attempt in 0..=RETRY_DELAYS.len() {
        if attempt > 0 {
            tokio::time::sleep(Duration::from_secs(RETRY_DELAYS[attempt - 1])).await;
        }
        match mailer.send(to, subject, html).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                tracing::warn!(
                    "Email send attempt {} of {} failed: {}",
                    attempt + 1,
                    RETRY_DELAYS.len() + 1,
                    e
                );
                last_err = Some(e);
            }
        }
    }

    Err(last_err.expect("at least one attempt was made"))
}

/// Subject and HTML body for the download link email.
pub fn download_ready_email(download_url: &str, expiry_days: i64) -> (String, String) {
    let subject = "Your download is ready".to_string();
    let html = format!(
        "<p>Thanks for your purchase. Download your file here:</p>\
         <p><a href=\"{download_url}\">Download</a></p>\
         <p>This link expires in {expiry_days} days.</p>"
    );
    (subject, html)
}

/// Subject and HTML body for the order confirmation email.
pub fn order_confirmation_email(transaction_id: &str) -> (String, String) {
    let subject = "Order confirmation".to_string();
    let html = format!(
        "<p>Order confirmed. Transaction: {transaction_id}. \
         Your download link has been sent in a separate email.</p>"
    );
    (subject, html)
}
