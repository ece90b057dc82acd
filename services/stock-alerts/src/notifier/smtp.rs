//! SMTP delivery of stock alert emails.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox, MultiPart, SinglePart};
use lettre::{transport::smtp::authentication::Credentials, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use supplychainx_models::StockAlert;
use supplychainx_utils::{EmailConfig, SupplyChainError};

use super::template::{AlertTemplates, RenderedEmail};
use crate::ports::AlertNotifier;

/// Sender and recipients of alert emails.
#[derive(Debug, Clone)]
struct Mailing {
    from: Mailbox,
    recipients: Vec<Mailbox>,
}

impl Mailing {
    fn from_config(config: &EmailConfig) -> Result<Self> {
        if config.alert_recipients.is_empty() {
            return Err(SupplyChainError::configuration("email.alert_recipients must not be empty when email is enabled").into());
        }

        let from: Mailbox = format!("{} <{}>", config.from_name, config.from_address)
            .parse()
            .context("Invalid from address")?;
        let recipients = config
            .alert_recipients
            .iter()
            .map(|address| {
                address
                    .parse::<Mailbox>()
                    .with_context(|| format!("Invalid alert recipient '{}'", address))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { from, recipients })
    }

    fn message(&self, email: &RenderedEmail) -> Result<Message> {
        let mut builder = Message::builder().from(self.from.clone()).subject(email.subject.as_str());
        for recipient in &self.recipients {
            builder = builder.to(recipient.clone());
        }

        builder
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.body_text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.body_html.clone()),
                    ),
            )
            .context("Failed to build email")
    }
}

pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    mailing: Mailing,
    templates: AlertTemplates,
}

impl SmtpNotifier {
    /// Builds the transport once. Authenticates only when a username is set.
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let mailing = Mailing::from_config(config)?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .context("Failed to create SMTP transport")?
            .port(config.smtp_port);
        if !config.smtp_username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ));
        }

        Ok(Self {
            mailer: builder.build(),
            mailing,
            templates: AlertTemplates::new()?,
        })
    }
}

#[async_trait]
impl AlertNotifier for SmtpNotifier {
    async fn notify(&self, alert: &StockAlert) -> Result<()> {
        let email = self.templates.render(alert)?;
        let message = self.mailing.message(&email)?;

        let response = self
            .mailer
            .send(message)
            .await
            .map_err(|e| SupplyChainError::notification(format!("Failed to send alert {}: {}", alert.id, e)))?;

        tracing::info!(
            alert_id = alert.id,
            recipients = self.mailing.recipients.len(),
            code = %response.code(),
            "Stock alert email sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use supplychainx_models::{StockSnapshot, StockedEntityType};

    fn config(recipients: &[&str]) -> EmailConfig {
        EmailConfig {
            enabled: true,
            smtp_host: "smtp.supplychainx.io".to_string(),
            smtp_port: 587,
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_address: "alerts@supplychainx.io".to_string(),
            from_name: "SupplyChainX Alerts".to_string(),
            alert_recipients: recipients.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn test_requires_recipients() {
        let err = Mailing::from_config(&config(&[])).unwrap_err();
        assert_eq!(SupplyChainError::from(err).error_code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_rejects_invalid_recipient() {
        assert!(Mailing::from_config(&config(&["not an address"])).is_err());
    }

    #[test]
    fn test_message_goes_to_every_recipient() {
        let mailing = Mailing::from_config(&config(&["planner@supplychainx.io", "buyer@supplychainx.io"])).unwrap();
        let alert = StockAlert::raise(&StockSnapshot {
            entity_type: StockedEntityType::Product,
            entity_id: 3,
            entity_name: "Office chair".to_string(),
            current_stock: 0,
            minimum_stock: 5,
        });

        let message = mailing.message(&AlertTemplates::new().unwrap().render(&alert).unwrap()).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("planner@supplychainx.io"));
        assert!(raw.contains("buyer@supplychainx.io"));
        assert!(raw.contains("Out of stock"));
    }
}
