use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_from_number: String,
    pub batch_size: usize,
    pub hold_minutes: i64,
    pub sweep_interval_seconds: u64,
    pub priority_recalc_interval_minutes: u64,
    pub use_mock_sms: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let twilio_account_sid = env::var("TWILIO_ACCOUNT_SID").unwrap_or_else(|_| {
            warn!("TWILIO_ACCOUNT_SID not set, using empty value");
            String::new()
        });
        let twilio_auth_token = env::var("TWILIO_AUTH_TOKEN").unwrap_or_else(|_| {
            warn!("TWILIO_AUTH_TOKEN not set, using empty value");
            String::new()
        });
        let twilio_from_number = env::var("TWILIO_PHONE_NUMBER").unwrap_or_else(|_| {
            warn!("TWILIO_PHONE_NUMBER not set, using empty value");
            String::new()
        });

        let twilio_configured = !twilio_account_sid.is_empty()
            && !twilio_auth_token.is_empty()
            && !twilio_from_number.is_empty();

        let config = Self {
            twilio_account_sid,
            twilio_auth_token,
            twilio_from_number,
            batch_size: parse_env("BATCH_SIZE", 3),
            hold_minutes: parse_env("HOLD_MINUTES", 7),
            sweep_interval_seconds: parse_env("SWEEP_INTERVAL_SECONDS", 30),
            priority_recalc_interval_minutes: parse_env("PRIORITY_RECALC_INTERVAL_MINUTES", 60),
            // Without Twilio credentials the mock channel is the only usable default
            use_mock_sms: parse_env("USE_MOCK_SMS", !twilio_configured),
        };

        if !config.is_twilio_configured() && !config.use_mock_sms {
            warn!("Twilio not fully configured and mock SMS disabled - sends will fail");
        }

        config
    }

    pub fn is_twilio_configured(&self) -> bool {
        !self.twilio_account_sid.is_empty()
            && !self.twilio_auth_token.is_empty()
            && !self.twilio_from_number.is_empty()
    }
}

fn parse_env<T: std::str::FromStr + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("{} has invalid value {:?}, using default {}", key, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}
