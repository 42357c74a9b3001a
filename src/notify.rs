//! # Digest Delivery
//!
//! Carries the session report out of the process. The reporter only sees the
//! [`Notifier`] trait; [`SmtpNotifier`] implements it over an authenticated
//! STARTTLS relay, inlining the diagnostic charts by content id so they show
//! up inside the message body instead of as attachments. Tests substitute a
//! recorder.
//!
//! SMTP support sits behind the `smtp` feature (on by default). Without it
//! the trait and [`Digest`] remain, so headless deployments can still plug in
//! their own carrier.

use crate::render::RenderedPlot;

#[cfg(feature = "smtp")]
use crate::config::EmailConfig;
#[cfg(feature = "smtp")]
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};

/// Errors raised while assembling or delivering a digest
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Delivery settings are incomplete
    #[error("notifier misconfigured: {0}")]
    Misconfigured(String),

    /// An inline image carries an unusable content type
    #[cfg(feature = "smtp")]
    #[error("unusable image content type: {0}")]
    BadImageType(String),

    /// An address in the configuration does not parse
    #[cfg(feature = "smtp")]
    #[error("bad mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The message could not be assembled
    #[cfg(feature = "smtp")]
    #[error("message assembly failed: {0}")]
    Message(#[from] lettre::error::Error),

    /// The SMTP conversation failed
    #[cfg(feature = "smtp")]
    #[error("SMTP transport failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// One session digest, ready for delivery.
#[derive(Debug, Clone)]
pub struct Digest {
    /// Subject line
    pub subject: String,
    /// HTML body; inline images are referenced as `cid:` URLs
    pub html_body: String,
    /// Inline images keyed by the content id the body refers to
    pub images: Vec<(String, RenderedPlot)>,
}

/// Carrier of session digests.
pub trait Notifier {
    /// Deliver one digest.
    fn send(&self, digest: &Digest) -> Result<(), NotifyError>;
}

/// Notifier over an authenticated STARTTLS SMTP relay.
#[cfg(feature = "smtp")]
pub struct SmtpNotifier {
    config: EmailConfig,
}

#[cfg(feature = "smtp")]
impl SmtpNotifier {
    /// Build a notifier, rejecting settings that cannot possibly deliver.
    pub fn new(config: EmailConfig) -> Result<Self, NotifyError> {
        if config.smtp_server.is_empty() {
            return Err(NotifyError::Misconfigured("smtp_server is not set".into()));
        }
        if config.sender.is_empty() {
            return Err(NotifyError::Misconfigured("sender is not set".into()));
        }
        if config.recipients.is_empty() {
            return Err(NotifyError::Misconfigured("recipient list is empty".into()));
        }
        Ok(Self { config })
    }
}

#[cfg(feature = "smtp")]
impl Notifier for SmtpNotifier {
    fn send(&self, digest: &Digest) -> Result<(), NotifyError> {
        let message = build_message(&self.config, digest)?;

        let mut relay = SmtpTransport::starttls_relay(&self.config.smtp_server)?
            .port(self.config.smtp_port);
        if !self.config.username.is_empty() {
            relay = relay.credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ));
        }
        relay.build().send(&message)?;

        log::debug!(
            "digest '{}' handed to {}:{}",
            digest.subject,
            self.config.smtp_server,
            self.config.smtp_port
        );
        Ok(())
    }
}

/// Assemble the multipart/related message: HTML body first, then one inline
/// part per image, each tagged with the content id the body references.
#[cfg(feature = "smtp")]
fn build_message(config: &EmailConfig, digest: &Digest) -> Result<Message, NotifyError> {
    let mut related =
        MultiPart::related().singlepart(SinglePart::html(digest.html_body.clone()));
    for (cid, plot) in &digest.images {
        let content_type = ContentType::parse(&plot.mime)
            .map_err(|e| NotifyError::BadImageType(format!("{}: {}", plot.mime, e)))?;
        related = related
            .singlepart(Attachment::new_inline(cid.clone()).body(plot.bytes.clone(), content_type));
    }

    let mut builder = Message::builder()
        .from(config.sender.parse::<Mailbox>()?)
        .subject(digest.subject.clone());
    for recipient in &config.recipients {
        builder = builder.to(recipient.parse::<Mailbox>()?);
    }
    Ok(builder.multipart(related)?)
}

#[cfg(all(test, feature = "smtp"))]
mod tests {
    use super::*;

    fn delivery_config() -> EmailConfig {
        EmailConfig {
            enabled: true,
            recipients: vec!["qc@example.com".to_string()],
            sender: "station@example.com".to_string(),
            smtp_server: "smtp.example.com".to_string(),
            ..EmailConfig::default()
        }
    }

    fn digest_with_image() -> Digest {
        Digest {
            subject: "Failure in meteo station : 2024-06-01".to_string(),
            html_body: "<table></table><br><img src=\"cid:fig-0\"><br>".to_string(),
            images: vec![(
                "fig-0".to_string(),
                RenderedPlot {
                    mime: "image/svg+xml".to_string(),
                    bytes: b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>".to_vec(),
                },
            )],
        }
    }

    #[test]
    fn test_message_inlines_images_by_content_id() {
        let message = build_message(&delivery_config(), &digest_with_image()).unwrap();
        let text = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(text.contains("Failure in meteo station : 2024-06-01"));
        assert!(text.contains("multipart/related"));
        assert!(text.contains("Content-ID"));
        assert!(text.contains("fig-0"));
    }

    #[test]
    fn test_all_recipients_addressed() {
        let mut config = delivery_config();
        config.recipients.push("ops@example.com".to_string());
        let message = build_message(&config, &digest_with_image()).unwrap();
        let text = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(text.contains("qc@example.com"));
        assert!(text.contains("ops@example.com"));
    }

    #[test]
    fn test_rejects_incomplete_settings() {
        let mut config = delivery_config();
        config.smtp_server.clear();
        assert!(matches!(
            SmtpNotifier::new(config),
            Err(NotifyError::Misconfigured(_))
        ));

        let mut config = delivery_config();
        config.recipients.clear();
        assert!(matches!(
            SmtpNotifier::new(config),
            Err(NotifyError::Misconfigured(_))
        ));
    }

    #[test]
    fn test_bad_address_reported() {
        let mut config = delivery_config();
        config.sender = "not an address".to_string();
        let result = build_message(&config, &digest_with_image());
        assert!(matches!(result, Err(NotifyError::Address(_))));
    }
}
