use serial_test::serial;
use shramik::config::{OtpConfig, ServerConfig, SmsConfig, SmsProvider};
use std::time::Duration;

const VARS: &[&str] = &[
    "OTP_DEFAULT_COUNTRY_CODE", "OTP_TTL_SECS", "OTP_SWEEP_INTERVAL_SECS",
    "SMS_PROVIDER", "TWILIO_ACCOUNT_SID", "TWILIO_AUTH_TOKEN", "TWILIO_PHONE_NUMBER",
    "TWILIO_API_BASE", "SMS_TIMEOUT_SECS", "BIND_ADDR", "PORT", "FRONTEND_URL", "ENABLE_HSTS",
];

fn clear_env() {
    for v in VARS { std::env::remove_var(v); }
}

#[test]
#[serial]
fn defaults_when_unset() {
    clear_env();
    let otp = OtpConfig::from_env();
    assert_eq!(otp.default_country_code, "+91");
    assert_eq!(otp.ttl, Duration::from_secs(300));
    assert_eq!(otp.sweep_interval, Some(Duration::from_secs(60)));

    let sms = SmsConfig::from_env();
    assert_eq!(sms.provider, SmsProvider::Twilio);
    assert_eq!(sms.twilio_api_base, "https://api.twilio.com");
    assert_eq!(sms.missing_vars(), vec!["TWILIO_ACCOUNT_SID", "TWILIO_AUTH_TOKEN", "TWILIO_PHONE_NUMBER"]);

    let server = ServerConfig::from_env();
    assert_eq!(server.port, 3000);
    assert!(!server.enable_hsts);
}

#[test]
#[serial]
fn overrides_are_read() {
    clear_env();
    std::env::set_var("OTP_DEFAULT_COUNTRY_CODE", "+44");
    std::env::set_var("OTP_TTL_SECS", "120");
    std::env::set_var("OTP_SWEEP_INTERVAL_SECS", "0");
    std::env::set_var("SMS_PROVIDER", "LOG");
    std::env::set_var("PORT", "8081");
    std::env::set_var("ENABLE_HSTS", "true");

    let otp = OtpConfig::from_env();
    assert_eq!(otp.default_country_code, "+44");
    assert_eq!(otp.ttl, Duration::from_secs(120));
    assert_eq!(otp.sweep_interval, None);

    let sms = SmsConfig::from_env();
    assert_eq!(sms.provider, SmsProvider::Log);
    assert!(sms.missing_vars().is_empty());

    let server = ServerConfig::from_env();
    assert_eq!(server.port, 8081);
    assert!(server.enable_hsts);
    clear_env();
}

#[test]
#[serial]
fn garbage_numbers_fall_back_to_defaults() {
    clear_env();
    std::env::set_var("OTP_TTL_SECS", "five minutes");
    std::env::set_var("PORT", "70000");
    assert_eq!(OtpConfig::from_env().ttl, Duration::from_secs(300));
    assert_eq!(ServerConfig::from_env().port, 3000);
    clear_env();
}

#[test]
#[serial]
fn complete_twilio_credentials() {
    clear_env();
    std::env::set_var("TWILIO_ACCOUNT_SID", "AC123");
    std::env::set_var("TWILIO_AUTH_TOKEN", "token");
    std::env::set_var("TWILIO_PHONE_NUMBER", "+15005550006");
    let sms = SmsConfig::from_env();
    assert!(sms.missing_vars().is_empty());
    assert!(shramik::sms::build_sms_gateway(&sms).is_ok());
    clear_env();
}
