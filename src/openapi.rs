use crate::error::OtpResponse;
use crate::routes::{SendOtpRequest, VerifyOtpRequest};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::send_otp,
        crate::routes::verify_otp,
    ),
    components(schemas(SendOtpRequest, VerifyOtpRequest, OtpResponse)),
    tags(
        (name = "otp", description = "Phone verification by one-time passcode"),
    )
)]
pub struct ApiDoc;
