use actix_cors::Cors;
use actix_web::{middleware::Compress, App, HttpServer};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use shramik::config::{OtpConfig, ServerConfig, SmsConfig};
use shramik::openapi::ApiDoc;
use shramik::otp::{spawn_janitor, OtpService};
use shramik::sms::build_sms_gateway;
use shramik::{config, AppState, SecurityHeaders};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env automatically only in debug builds to reduce manual setup overhead.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    // Structured logging initialisation
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let otp_cfg = OtpConfig::from_env();
    let sms_cfg = SmsConfig::from_env();
    let server_cfg = ServerConfig::from_env();
    validate_env_vars(&sms_cfg);

    info!("Bootstrapping OTP server");
    info!("Default country code: {}", otp_cfg.default_country_code);
    info!("OTP validity: {}s", otp_cfg.ttl.as_secs());

    let gateway = match build_sms_gateway(&sms_cfg) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Failed to initialise SMS gateway: {e:#}");
            std::process::exit(1);
        }
    };
    let otp = match OtpService::new(&otp_cfg, gateway) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("Invalid OTP configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Some(every) = otp_cfg.sweep_interval {
        spawn_janitor(otp.clone(), every);
        info!("Expired-challenge janitor every {}s", every.as_secs());
    }

    let prometheus = match PrometheusBuilder::new().install_recorder() {
        Ok(h) => Some(h),
        Err(e) => {
            warn!("Prometheus recorder not installed: {e}");
            None
        }
    };

    let openapi = ApiDoc::openapi();
    let state = AppState { otp, metrics: prometheus };
    let bind = (server_cfg.bind_addr.clone(), server_cfg.port);

    let server = HttpServer::new(move || {
        let cors = {
            let mut c = Cors::default()
                // local frontend dev servers
                .allowed_origin("http://localhost:5173")
                .allowed_origin("http://127.0.0.1:5173")
                .allowed_origin("http://localhost:3000")
                .allowed_origin("http://127.0.0.1:3000")
                .allow_any_header()
                .allowed_methods(["GET", "POST", "OPTIONS"])
                .max_age(3600);
            if let Some(front) = &server_cfg.frontend_url {
                c = c.allowed_origin(front);
            }
            c
        };

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(SecurityHeaders::from_config(&server_cfg))
            .wrap(cors)
            .app_data(actix_web::web::Data::new(state.clone()))
            .configure(config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/api-docs/openapi.json", openapi.clone()))
    })
    .bind(bind.clone())?;

    info!("Listening on http://{}:{}", bind.0, bind.1);

    server.run().await
}

/// Exit early when the configured SMS provider is missing credentials.
fn validate_env_vars(sms: &SmsConfig) {
    let missing = sms.missing_vars();
    if !missing.is_empty() {
        eprintln!("Missing required environment variables: {:?}", missing);
        eprintln!("Set them, or use SMS_PROVIDER=log for local development");
        std::process::exit(1);
    }
}
