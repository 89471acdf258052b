//! Notifier (§1, §4.9) — sends a notification payload via a named provider;
//! fire-and-forget from the core's perspective. Grounded in the teacher's
//! `notifications.rs`: a webhook provider over `reqwest`, plus an email
//! provider over `lettre` (the teacher depends on both crates already).

use async_trait::async_trait;
use serde::Serialize;

use crate::model::{Heartbeat, Status};

#[derive(Debug, Clone, Serialize)]
pub struct NotificationPayload {
    pub monitor_id: String,
    pub monitor_name: String,
    pub status: Status,
    /// `"[name] [✅ Up | 🔴 Down] <msg>"` — §4.9 step 2.
    pub message: String,
    pub heartbeat: Heartbeat,
    pub server_timezone: String,
    pub server_timezone_offset: String,
    pub localized_timestamp: String,
}

fn status_emoji(status: Status) -> &'static str {
    match status {
        Status::Up => "✅ Up",
        Status::Down => "🔴 Down",
        Status::Pending => "🟡 Pending",
        Status::Maintenance => "🔧 Maintenance",
    }
}

/// Builds the notification message per §4.9 step 2.
pub fn build_message(monitor_name: &str, status: Status, msg: &str) -> String {
    let body = if msg.is_empty() { "N/A" } else { msg };
    format!("[{monitor_name}] [{}] {body}", status_emoji(status))
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send to one named provider. Failures are logged by the caller (§4.9
    /// step 3, §7) and never abort the fan-out loop.
    async fn send(&self, provider: &str, payload: &NotificationPayload) -> Result<(), String>;
}

/// Webhook + email notifier, grounded in the teacher's `fire_webhooks` /
/// `fire_emails`. Providers named `"webhook:<url>"` post JSON; providers
/// named `"email:<address>"` send via SMTP.
pub struct HttpNotifier {
    client: reqwest::Client,
    mailer: Option<lettre::AsyncSmtpTransport<lettre::Tokio1Executor>>,
    from_address: String,
}

impl HttpNotifier {
    pub fn new(client: reqwest::Client, mailer: Option<lettre::AsyncSmtpTransport<lettre::Tokio1Executor>>, from_address: impl Into<String>) -> Self {
        HttpNotifier {
            client,
            mailer,
            from_address: from_address.into(),
        }
    }

    async fn send_webhook(&self, url: &str, payload: &NotificationPayload) -> Result<(), String> {
        let resp = self
            .client
            .post(url)
            .json(payload)
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !resp.status().is_success() {
            return Err(format!("webhook {url} returned {}", resp.status()));
        }
        Ok(())
    }

    async fn send_email(&self, address: &str, payload: &NotificationPayload) -> Result<(), String> {
        use lettre::{AsyncTransport, Message};

        let mailer = self.mailer.as_ref().ok_or_else(|| "no SMTP transport configured".to_string())?;
        let email = Message::builder()
            .from(self.from_address.parse().map_err(|e: lettre::address::AddressError| e.to_string())?)
            .to(address.parse().map_err(|e: lettre::address::AddressError| e.to_string())?)
            .subject(payload.message.clone())
            .body(payload.message.clone())
            .map_err(|e| e.to_string())?;
        mailer.send(email).await.map_err(|e| e.to_string())?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, provider: &str, payload: &NotificationPayload) -> Result<(), String> {
        if let Some(url) = provider.strip_prefix("webhook:") {
            self.send_webhook(url, payload).await
        } else if let Some(address) = provider.strip_prefix("email:") {
            self.send_email(address, payload).await
        } else {
            Err(format!("unknown notification provider: {provider}"))
        }
    }
}

/// Test/embedding double that records every dispatch attempt.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: std::sync::Mutex<Vec<(String, NotificationPayload)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, provider: &str, payload: &NotificationPayload) -> Result<(), String> {
        self.sent.lock().unwrap().push((provider.to_string(), payload.clone()));
        Ok(())
    }
}
