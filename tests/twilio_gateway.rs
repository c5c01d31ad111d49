use rand::rngs::mock::StepRng;
use shramik::config::OtpConfig;
use shramik::otp::{CodeGenerator, OtpError, OtpService, VerificationOutcome};
use shramik::sms::{DeliveryError, SmsGateway, SmsMessage, TwilioGateway};
use shramik::store::ChallengeStore;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MESSAGES_PATH: &str = "/2010-04-01/Accounts/AC123/Messages.json";

fn gateway(base: &str) -> TwilioGateway {
    TwilioGateway::new(base, "AC123", "secret-token", "+15005550006", Duration::from_secs(2)).unwrap()
}

fn message() -> SmsMessage {
    SmsMessage { to: "+919876543210".into(), body: "Your OTP is 123456".into() }
}

#[tokio::test]
async fn posts_form_to_messages_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .and(header_exists("authorization"))
        .and(body_string_contains("To=%2B919876543210"))
        .and(body_string_contains("From=%2B15005550006"))
        .and(body_string_contains("Body=Your+OTP+is+123456"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"sid": "SM1", "status": "queued"})))
        .expect(1)
        .mount(&server)
        .await;

    gateway(&server.uri()).send(&message()).await.expect("send should succeed");
}

#[tokio::test]
async fn provider_rejection_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("The 'To' number is not a valid phone number."))
        .mount(&server)
        .await;

    match gateway(&server.uri()).send(&message()).await {
        Err(DeliveryError::Rejected { status, body }) => {
            assert_eq!(status, 400);
            assert!(body.contains("not a valid phone number"));
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_provider_is_transport_error() {
    // nothing listens on the discard port
    let err = gateway("http://127.0.0.1:9").send(&message()).await.unwrap_err();
    assert!(matches!(err, DeliveryError::Transport(_)));
}

#[tokio::test]
async fn issue_through_twilio_and_rollback_on_outage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .and(body_string_contains("Body=Your+OTP+is+100000"))
        .respond_with(ResponseTemplate::new(201))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let otp = OtpService::new(&OtpConfig::default(), Arc::new(gateway(&server.uri())))
        .unwrap()
        .with_codes(CodeGenerator::with_rng(StepRng::new(0, 1)));

    otp.issue("9876543210").await.unwrap();
    assert_eq!(otp.verify("9876543210", "100000").unwrap(), VerificationOutcome::Verified);

    // second send hits the 503 mock
    let err = otp.issue("9876543210").await.unwrap_err();
    assert!(matches!(err, OtpError::Delivery(DeliveryError::Rejected { status: 503, .. })));
    assert!(otp.store().is_empty());
}
