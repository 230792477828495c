//! Service configuration
//!
//! Read once at startup into an explicit struct and handed to the
//! components that need it.

use crate::db::DbConfig;
use crate::sms::SmsConfig;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_SMS_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db: DbConfig,
    pub port: u16,
    /// Base URL used in customer detail links
    pub public_url: String,
    /// `None` disables SMS
    pub sms: Option<SmsConfig>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (the environment in production)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = lookup("USSD_DB_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(format!("{home}/.ussd-loans/ussd.db"))
            },
            PathBuf::from,
        );

        let busy_timeout = lookup("USSD_DB_BUSY_TIMEOUT_MS")
            .and_then(|ms| ms.parse().ok())
            .map_or(DbConfig::DEFAULT_BUSY_TIMEOUT, Duration::from_millis);

        let port = lookup("USSD_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let public_url = lookup("USSD_PUBLIC_URL")
            .map_or_else(
                || format!("http://localhost:{port}"),
                |url| url.trim_end_matches('/').to_string(),
            );

        let sms = lookup("SMS_URL").map(|url| SmsConfig {
            url,
            sender_id: lookup("SMS_SENDER_ID").unwrap_or_default(),
            api_key: lookup("SMS_API_KEY").unwrap_or_default(),
            client_id: lookup("SMS_CLIENT_ID").unwrap_or_default(),
            access_key: lookup("SMS_ACCESS_KEY").unwrap_or_default(),
            timeout: Duration::from_secs(
                lookup("SMS_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SMS_TIMEOUT_SECS),
            ),
        });

        Self {
            db: DbConfig {
                busy_timeout,
                ..DbConfig::new(db_path)
            },
            port,
            public_url,
            sms,
        }
    }
}
