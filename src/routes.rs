use std::sync::Arc;

use actix_web::{web, HttpResponse};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::{ApiError, OtpResponse};
use crate::otp::OtpService;

pub fn config(cfg: &mut web::ServiceConfig) {
    // malformed bodies get the same JSON shape as every other failure
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        ApiError::BadRequest(format!("Invalid request body: {err}")).into()
    }));
    cfg.service(
        web::scope("/api/v1")
            .service(web::resource("/otp/send").route(web::post().to(send_otp)))
            .service(web::resource("/otp/verify").route(web::post().to(verify_otp))),
    );
    cfg.route("/health", web::get().to(health));
    cfg.route("/metrics", web::get().to(metrics));
}

#[derive(Clone)]
pub struct AppState {
    pub otp: Arc<OtpService>,
    /// Present when a Prometheus recorder was installed at startup.
    pub metrics: Option<PrometheusHandle>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpRequest {
    #[serde(default, alias = "phone")]
    pub phone_number: Option<String>,
}

/// Codes arrive either as JSON strings or as bare numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SubmittedCode {
    Text(String),
    Number(u64),
}

impl SubmittedCode {
    pub fn into_string(self) -> String {
        match self {
            SubmittedCode::Text(s) => s,
            SubmittedCode::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    #[serde(default, alias = "phone")]
    pub phone_number: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "482913")]
    pub code: Option<SubmittedCode>,
}

#[utoipa::path(
    post,
    path = "/api/v1/otp/send",
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "OTP sent", body = OtpResponse),
        (status = 400, description = "Phone number missing", body = OtpResponse),
        (status = 502, description = "SMS gateway failed", body = OtpResponse)
    )
)]
pub async fn send_otp(
    data: web::Data<AppState>,
    payload: web::Json<SendOtpRequest>,
) -> Result<HttpResponse, ApiError> {
    let phone = payload.into_inner().phone_number.unwrap_or_default();
    if phone.is_empty() {
        return Err(ApiError::BadRequest("Phone number is required".into()));
    }
    data.otp.issue(&phone).await?;
    Ok(HttpResponse::Ok().json(OtpResponse::ok("OTP sent successfully")))
}

#[utoipa::path(
    post,
    path = "/api/v1/otp/verify",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Verification outcome; `success` is true only for a matching, unexpired code", body = OtpResponse),
        (status = 400, description = "Phone number or code missing", body = OtpResponse)
    )
)]
pub async fn verify_otp(
    data: web::Data<AppState>,
    payload: web::Json<VerifyOtpRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner();
    let phone = req.phone_number.unwrap_or_default();
    let code = req.code.map(SubmittedCode::into_string).unwrap_or_default();
    if phone.is_empty() || code.is_empty() {
        return Err(ApiError::BadRequest("Phone number and OTP code are required".into()));
    }
    let outcome = data.otp.verify(&phone, &code)?;
    let body = OtpResponse { success: outcome.is_verified(), message: outcome.message().to_string() };
    Ok(HttpResponse::Ok().json(body))
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub async fn metrics(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let handle = data.metrics.as_ref().ok_or(ApiError::NotFound)?;
    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(handle.render()))
}
