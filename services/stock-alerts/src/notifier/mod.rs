//! Alert notification channels.

mod smtp;
mod template;

pub use smtp::SmtpNotifier;

use anyhow::Result;
use async_trait::async_trait;
use supplychainx_models::StockAlert;

use crate::ports::AlertNotifier;

/// Used when email is disabled: alerts are logged and counted as sent.
pub struct LogNotifier;

#[async_trait]
impl AlertNotifier for LogNotifier {
    async fn notify(&self, alert: &StockAlert) -> Result<()> {
        tracing::warn!(
            alert_id = alert.id,
            level = %alert.level,
            entity_type = %alert.entity_type,
            entity_id = alert.entity_id,
            "Email disabled, stock alert logged only: {}",
            alert.message
        );
        Ok(())
    }
}
