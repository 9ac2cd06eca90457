use async_trait::async_trait;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use crate::models::ContactRequest;

// 1. Mailer Contract

/// Mailer
///
/// Defines the abstract contract for the outbound mail collaborator used by the
/// contact workflow. Delivery is best-effort and asynchronous; no delivery
/// guarantee is surfaced back to the caller. The trait allows tests to swap the
/// HTTP client for the recording Mock.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Forwards a contact-form message to the configured recipient.
    async fn send_contact_message(&self, msg: &ContactRequest) -> Result<(), String>;
}

// 2. The Real Implementation (HTTP mail API)

/// HttpMailClient
///
/// The concrete implementation posting to an HTTP mail API (Mailpit in local,
/// a managed transactional mail service in production).
#[derive(Clone)]
pub struct HttpMailClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    recipient: String,
}

impl HttpMailClient {
    pub fn new(endpoint: &str, api_key: &str, recipient: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            recipient: recipient.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailClient {
    /// send_contact_message
    ///
    /// Renders the message body and posts it to the mail API. Failures are
    /// reported to the caller, which logs and moves on; the contact workflow
    /// never blocks a response on delivery.
    async fn send_contact_message(&self, msg: &ContactRequest) -> Result<(), String> {
        let body = format!(
            "New message from the blog contact form\n\nFrom: {}\nEmail: {}\n\nMessage:\n{}",
            msg.name, msg.email, msg.message
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({
                "to": self.recipient,
                "subject": format!("[Blog Contact] {}", msg.subject),
                "text": body,
            }))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("mail API rejected message: {}", response.status()));
        }
        Ok(())
    }
}

// 3. The Mock Implementation (For Tests)

/// MockMailer
///
/// Records how many messages were dispatched so tests can assert the contact
/// workflow actually reached the collaborator, without any network traffic.
pub struct MockMailer {
    pub should_fail: bool,
    sent: AtomicUsize,
}

impl MockMailer {
    pub fn new() -> Self {
        Self {
            should_fail: false,
            sent: AtomicUsize::new(0),
        }
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            sent: AtomicUsize::new(0),
        }
    }

    /// Number of messages accepted so far.
    pub fn sent_count(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }
}

impl Default for MockMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send_contact_message(&self, _msg: &ContactRequest) -> Result<(), String> {
        if self.should_fail {
            return Err("Mock mailer error: simulation requested".to_string());
        }
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// MailerState
///
/// The concrete type used to share the mail collaborator across the application state.
pub type MailerState = Arc<dyn Mailer>;
