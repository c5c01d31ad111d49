use std::time::Duration;

fn string_env(name: &str, default: &str) -> String {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty()).unwrap_or_else(|| default.to_string())
}
fn u64_env(name: &str, default: u64) -> u64 {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
fn bool_env(name: &str) -> bool {
    std::env::var(name).map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

/// OTP lifecycle settings.
#[derive(Clone, Debug)]
pub struct OtpConfig {
    pub default_country_code: String,
    pub ttl: Duration,
    /// Janitor period; `None` leaves expiry purely lazy.
    pub sweep_interval: Option<Duration>,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            default_country_code: "+91".into(),
            ttl: Duration::from_secs(300),
            sweep_interval: Some(Duration::from_secs(60)),
        }
    }
}

impl OtpConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        let sweep = u64_env("OTP_SWEEP_INTERVAL_SECS", 60);
        Self {
            default_country_code: string_env("OTP_DEFAULT_COUNTRY_CODE", &d.default_country_code),
            ttl: Duration::from_secs(u64_env("OTP_TTL_SECS", d.ttl.as_secs())),
            sweep_interval: (sweep > 0).then(|| Duration::from_secs(sweep)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SmsProvider {
    Twilio,
    /// Writes the message to the log instead of sending it (local development).
    Log,
}

#[derive(Clone, Debug)]
pub struct SmsConfig {
    pub provider: SmsProvider,
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_from: Option<String>,
    pub twilio_api_base: String,
    pub timeout: Duration,
}

impl SmsConfig {
    pub fn from_env() -> Self {
        let provider = match string_env("SMS_PROVIDER", "twilio").to_lowercase().as_str() {
            "log" => SmsProvider::Log,
            "twilio" => SmsProvider::Twilio,
            other => {
                tracing::warn!("Unknown SMS_PROVIDER '{other}', using twilio");
                SmsProvider::Twilio
            }
        };
        let opt = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            provider,
            twilio_account_sid: opt("TWILIO_ACCOUNT_SID"),
            twilio_auth_token: opt("TWILIO_AUTH_TOKEN"),
            twilio_from: opt("TWILIO_PHONE_NUMBER"),
            twilio_api_base: string_env("TWILIO_API_BASE", "https://api.twilio.com"),
            timeout: Duration::from_secs(u64_env("SMS_TIMEOUT_SECS", 10)),
        }
    }

    /// Names of the Twilio variables still missing for the chosen provider.
    pub fn missing_vars(&self) -> Vec<&'static str> {
        if self.provider != SmsProvider::Twilio {
            return Vec::new();
        }
        let mut missing = Vec::new();
        if self.twilio_account_sid.is_none() { missing.push("TWILIO_ACCOUNT_SID"); }
        if self.twilio_auth_token.is_none() { missing.push("TWILIO_AUTH_TOKEN"); }
        if self.twilio_from.is_none() { missing.push("TWILIO_PHONE_NUMBER"); }
        missing
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    pub frontend_url: Option<String>,
    pub enable_hsts: bool,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: string_env("BIND_ADDR", "0.0.0.0"),
            port: u64_env("PORT", 3000).try_into().unwrap_or(3000),
            frontend_url: std::env::var("FRONTEND_URL").ok().filter(|v| !v.is_empty()),
            enable_hsts: bool_env("ENABLE_HSTS"),
        }
    }
}
