use async_trait::async_trait;
use common::{
    env_config::SmtpConfig,
    error::{AppError, Res},
};
use db::models::smtp::UserSmtp;
use lettre::{
    Message, SmtpTransport, Transport,
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
};

use crate::compose::InvoiceEmail;

/// Delivers composed invoice emails.
#[async_trait]
pub trait InvoiceMailer: Send + Sync {
    async fn send(&self, email: &InvoiceEmail) -> Res<()>;
}

/// Sends through the sender's own relay when they enabled one, otherwise
/// through the relay configured for the whole service.
pub struct SmtpMailer {
    default: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(default: SmtpConfig) -> Self {
        SmtpMailer { default }
    }
}

#[derive(Debug, PartialEq)]
struct Relay {
    host: String,
    port: u16,
    username: String,
    password: String,
    secure: bool,
    from_email: String,
    from_name: String,
}

impl Relay {
    fn from_config(config: &SmtpConfig) -> Self {
        Relay {
            host: config.host.clone(),
            port: config.port,
            username: config.username.clone(),
            password: config.password.clone(),
            secure: config.secure,
            from_email: config.from_email.clone(),
            from_name: config.from_name.clone(),
        }
    }

    fn from_user(settings: &UserSmtp, default: &SmtpConfig) -> Res<Self> {
        let port = u16::try_from(settings.port)
            .map_err(|_| AppError::BadRequest(format!("Invalid SMTP port: {}", settings.port)))?;
        let pick = |value: &str, fallback: &str| {
            if value.trim().is_empty() {
                fallback.to_string()
            } else {
                value.to_string()
            }
        };
        Ok(Relay {
            host: settings.host.clone(),
            port,
            username: settings.username.clone(),
            password: settings.password.clone(),
            secure: settings.secure,
            from_email: pick(&settings.from_email, &default.from_email),
            from_name: pick(&settings.from_name, &default.from_name),
        })
    }
}

fn select_relay(default: &SmtpConfig, custom: Option<&UserSmtp>) -> Res<Relay> {
    match custom {
        Some(settings) if settings.use_custom => Relay::from_user(settings, default),
        _ => Ok(Relay::from_config(default)),
    }
}

fn build_transport(relay: &Relay) -> Res<SmtpTransport> {
    let host = relay.host.trim();
    if host.is_empty() {
        return Err(AppError::Internal(
            "SMTP is not configured: missing host".to_string(),
        ));
    }

    let mut builder = if relay.secure {
        // implicit TLS (SMTPS)
        SmtpTransport::relay(host)?.port(relay.port)
    } else if relay.port == 587 {
        SmtpTransport::starttls_relay(host)?.port(relay.port)
    } else {
        SmtpTransport::builder_dangerous(host).port(relay.port)
    };

    if !relay.username.trim().is_empty() {
        builder = builder.credentials(Credentials::new(
            relay.username.clone(),
            relay.password.clone(),
        ));
    }

    Ok(builder.build())
}

fn build_message(relay: &Relay, email: &InvoiceEmail) -> Res<Message> {
    let from = Mailbox::new(Some(relay.from_name.clone()), relay.from_email.parse()?);
    let to = Mailbox::new(Some(email.to_name.clone()), email.to_email.parse()?);

    let mut builder = Message::builder().from(from).to(to).subject(email.subject.clone());
    if let Some(reply_to) = email.reply_to.as_deref() {
        builder = builder.reply_to(Mailbox::new(None, reply_to.parse()?));
    }

    Ok(builder.multipart(MultiPart::alternative_plain_html(
        email.text.clone(),
        email.html.clone(),
    ))?)
}

#[async_trait]
impl InvoiceMailer for SmtpMailer {
    async fn send(&self, email: &InvoiceEmail) -> Res<()> {
        let relay = select_relay(&self.default, email.smtp.as_ref())?;
        let message = build_message(&relay, email)?;
        let transport = build_transport(&relay)?;

        // lettre's SmtpTransport is blocking
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| AppError::Internal(format!("Mail task failed: {}", e)))??;

        log::info!(
            "Invoice {} emailed to {} via {}",
            email.invoice_id,
            email.to_email,
            relay.host
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn default_config() -> SmtpConfig {
        SmtpConfig {
            host: "smtp.paytrack.test".to_string(),
            port: 587,
            username: "service".to_string(),
            password: "secret".to_string(),
            secure: false,
            from_email: "noreply@paytrack.app".to_string(),
            from_name: "PayTrack".to_string(),
        }
    }

    fn user_smtp(use_custom: bool) -> UserSmtp {
        let now = Utc::now().naive_utc();
        UserSmtp {
            user_id: Uuid::new_v4(),
            host: "mail.janedoe.test".to_string(),
            port: 465,
            username: "jane".to_string(),
            password: "hunter22".to_string(),
            from_email: "jane@janedoe.test".to_string(),
            from_name: String::new(),
            secure: true,
            use_custom,
            created_at: now,
            updated_at: now,
        }
    }

    fn email() -> InvoiceEmail {
        InvoiceEmail {
            invoice_id: Uuid::new_v4(),
            to_email: "billing@acme.test".to_string(),
            to_name: "Acme".to_string(),
            reply_to: Some("jane@example.com".to_string()),
            subject: "Invoice from Jane Doe: USD 125.00".to_string(),
            html: "<p>hi</p>".to_string(),
            text: "hi".to_string(),
            smtp: None,
        }
    }

    #[test]
    fn custom_relay_is_used_only_when_enabled() {
        let config = default_config();

        let relay = select_relay(&config, Some(&user_smtp(true))).unwrap();
        assert_eq!(relay.host, "mail.janedoe.test");
        assert_eq!(relay.port, 465);
        assert!(relay.secure);
        assert_eq!(relay.from_email, "jane@janedoe.test");
        // blank from name falls back to the service default
        assert_eq!(relay.from_name, "PayTrack");

        let relay = select_relay(&config, Some(&user_smtp(false))).unwrap();
        assert_eq!(relay, Relay::from_config(&config));

        let relay = select_relay(&config, None).unwrap();
        assert_eq!(relay.host, "smtp.paytrack.test");
    }

    #[test]
    fn out_of_range_port_is_rejected() {
        let mut settings = user_smtp(true);
        settings.port = 70000;
        let err = select_relay(&default_config(), Some(&settings)).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn missing_host_means_mail_is_not_configured() {
        let mut relay = Relay::from_config(&default_config());
        relay.host = "  ".to_string();
        let err = build_transport(&relay).unwrap_err();
        assert!(err.to_string().contains("SMTP is not configured"));
    }

    #[test]
    fn message_carries_sender_reply_to() {
        let relay = Relay::from_config(&default_config());
        let message = build_message(&relay, &email()).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("noreply@paytrack.app"));
        assert!(raw.contains("Reply-To: jane@example.com"));
        assert!(raw.contains("billing@acme.test"));
    }

    #[test]
    fn invalid_recipient_is_a_bad_request() {
        let relay = Relay::from_config(&default_config());
        let mut email = email();
        email.to_email = "not-an-address".to_string();
        let err = build_message(&relay, &email).unwrap_err();
        assert!(matches!(err, AppError::Address(_)));
    }
}
