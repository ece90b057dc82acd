pub mod bom;
pub mod config;
pub mod error;
pub mod logging;
pub mod validation;

pub use bom::*;
pub use config::*;
pub use error::*;
pub use logging::*;
pub use validation::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.scheduler.stock_check_cron, "0 */15 * * * *");
        assert_eq!(config.scheduler.resolved_alert_retention_days, 30);
        assert!(!config.email.enabled);
    }

    #[test]
    fn test_lockout_policy_from_config() {
        let policy = AppConfig::default().security.lockout_policy();
        assert_eq!(policy.max_failed_attempts, 5);
        assert_eq!(policy.lockout_duration, chrono::Duration::minutes(15));
    }

    #[test]
    fn test_error_handling() {
        let error = SupplyChainError::validation("test_field", "test message");
        assert_eq!(error.error_code(), "VALIDATION_ERROR");
        assert_eq!(error.http_status_code(), 400);
    }
}
