//! Outbound email for account flows.
//!
//! Delivery itself is an external collaborator; this module only shapes the
//! message and hands it to an [`EmailSender`]. The default sender logs the
//! payload, which together with the development-mode token echo keeps every
//! flow testable without an inbox.

use anyhow::Result;
use serde_json::json;
use tracing::info;

#[derive(Clone, Debug)]
pub struct EmailMessage {
    pub to_email: String,
    pub template: String,
    pub payload_json: String,
}

impl EmailMessage {
    #[must_use]
    pub fn verification(to_email: &str, verify_url: &str) -> Self {
        Self::templated(to_email, "verify_email", verify_url)
    }

    #[must_use]
    pub fn password_reset(to_email: &str, reset_url: &str) -> Self {
        Self::templated(to_email, "password_reset", reset_url)
    }

    #[must_use]
    pub fn magic_link(to_email: &str, magic_url: &str) -> Self {
        Self::templated(to_email, "magic_link", magic_url)
    }

    fn templated(to_email: &str, template: &str, url: &str) -> Self {
        let payload = json!({
            "email": to_email,
            "url": url,
        });
        Self {
            to_email: to_email.to_string(),
            template: template.to_string(),
            payload_json: payload.to_string(),
        }
    }
}

pub trait EmailSender: Send + Sync {
    /// Deliver (or queue) one message.
    /// # Errors
    /// Returns an error when the message cannot be handed off.
    fn send(&self, message: &EmailMessage) -> Result<()>;
}

#[derive(Clone, Debug)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to_email = %message.to_email,
            template = %message.template,
            payload = %message.payload_json,
            "email send stub"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templated_messages_carry_url_payload() {
        let message = EmailMessage::verification(
            "alice@example.com",
            "https://sokoni.dev/auth/verify-email?token=abc",
        );
        assert_eq!(message.template, "verify_email");
        assert_eq!(message.to_email, "alice@example.com");

        let payload: serde_json::Value = serde_json::from_str(&message.payload_json).unwrap();
        assert_eq!(
            payload.get("url").and_then(serde_json::Value::as_str),
            Some("https://sokoni.dev/auth/verify-email?token=abc")
        );
    }

    #[test]
    fn template_names_differ_per_flow() {
        let reset = EmailMessage::password_reset("a@b.com", "u");
        let magic = EmailMessage::magic_link("a@b.com", "u");
        assert_eq!(reset.template, "password_reset");
        assert_eq!(magic.template, "magic_link");
    }

    #[test]
    fn log_sender_accepts_messages() {
        let sender = LogEmailSender;
        assert!(sender.send(&EmailMessage::magic_link("a@b.com", "u")).is_ok());
    }
}
