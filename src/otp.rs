//! OTP issuance and verification.
//!
//! A challenge lives in the [`ChallengeStore`] under the normalized phone
//! number. Issuing overwrites whatever was pending for that number; verifying
//! consumes the record on a correct code or once it is seen expired. A wrong
//! code leaves the record in place so the user can retry until expiry.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::OtpConfig;
use crate::phone::{fingerprint, PhoneNormalizer};
use crate::sms::{DeliveryError, SmsGateway, SmsMessage};
use crate::store::{ChallengeRecord, ChallengeStore, InMemoryChallengeStore, Lookup};

pub const CODE_MIN: u32 = 100_000;
pub const CODE_MAX: u32 = 999_999;
const CODE_SPAN: u64 = (CODE_MAX - CODE_MIN + 1) as u64;

#[derive(Debug, Error)]
pub enum OtpError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("delivery failed: {0}")]
    Delivery(#[from] DeliveryError),
    #[error("internal error: {0}")]
    Internal(String),
}

/// A six digit code in `CODE_MIN..=CODE_MAX`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OtpCode(u32);

impl OtpCode {
    /// Map a uniform 64-bit draw onto the code range.
    pub fn from_draw(draw: u64) -> Self {
        Self(CODE_MIN + (draw % CODE_SPAN) as u32)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06}", self.0)
    }
}

/// Shared random source for codes. Not cryptographic.
pub struct CodeGenerator {
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl CodeGenerator {
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_rng<R: RngCore + Send + 'static>(rng: R) -> Self {
        Self { rng: Mutex::new(Box::new(rng)) }
    }

    pub fn next_code(&self) -> OtpCode {
        let draw = self.rng.lock().unwrap_or_else(|e| e.into_inner()).next_u64();
        OtpCode::from_draw(draw)
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::from_entropy()
    }
}

/// Returned by a successful [`OtpService::issue`]. Carries no code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Confirmation {
    pub identifier: String,
    pub challenge_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified,
    Mismatch,
    Expired,
    NoChallenge,
}

impl VerificationOutcome {
    pub fn is_verified(self) -> bool {
        matches!(self, VerificationOutcome::Verified)
    }

    pub fn message(self) -> &'static str {
        match self {
            VerificationOutcome::Verified => "OTP verified successfully",
            VerificationOutcome::Mismatch => "Invalid OTP",
            VerificationOutcome::Expired => "OTP expired",
            VerificationOutcome::NoChallenge => "OTP not found or expired",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VerificationOutcome::Verified => "verified",
            VerificationOutcome::Mismatch => "mismatch",
            VerificationOutcome::Expired => "expired",
            VerificationOutcome::NoChallenge => "no_challenge",
        }
    }
}

pub struct OtpService {
    store: Arc<dyn ChallengeStore>,
    gateway: Arc<dyn SmsGateway>,
    normalizer: PhoneNormalizer,
    codes: CodeGenerator,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
}

impl OtpService {
    /// In-memory store, system clock, entropy-seeded codes.
    pub fn new(cfg: &OtpConfig, gateway: Arc<dyn SmsGateway>) -> Result<Self, OtpError> {
        let ttl = chrono::Duration::from_std(cfg.ttl)
            .map_err(|_| OtpError::InvalidInput(format!("OTP ttl out of range: {:?}", cfg.ttl)))?;
        if ttl <= chrono::Duration::zero() {
            return Err(OtpError::InvalidInput("OTP ttl must be positive".into()));
        }
        if Utc::now().checked_add_signed(ttl).is_none() {
            return Err(OtpError::InvalidInput(format!("OTP ttl out of range: {:?}", cfg.ttl)));
        }
        Ok(Self {
            store: Arc::new(InMemoryChallengeStore::new()),
            gateway,
            normalizer: PhoneNormalizer::new(cfg.default_country_code.clone())?,
            codes: CodeGenerator::from_entropy(),
            clock: Arc::new(SystemClock),
            ttl,
        })
    }

    pub fn with_store(mut self, store: Arc<dyn ChallengeStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_codes(mut self, codes: CodeGenerator) -> Self {
        self.codes = codes;
        self
    }

    pub fn store(&self) -> &Arc<dyn ChallengeStore> {
        &self.store
    }

    /// Create (or replace) the challenge for `raw_phone` and send the code.
    pub async fn issue(&self, raw_phone: &str) -> Result<Confirmation, OtpError> {
        let identifier = self.normalizer.normalize(raw_phone)?;
        let code = self.codes.next_code();
        let issued_at = self.clock.now();
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or_else(|| OtpError::Internal(format!("expiry overflows at {issued_at}")))?;
        let record = ChallengeRecord {
            id: Uuid::new_v4(),
            code: code.to_string(),
            issued_at,
            expires_at,
        };
        let challenge_id = record.id;

        if let Some(previous) = self.store.put(&identifier, record) {
            debug!(phone = %fingerprint(&identifier), replaced = %previous.id, "pending challenge replaced");
        }

        let message = SmsMessage { to: identifier.clone(), body: format!("Your OTP is {code}") };
        if let Err(e) = self.gateway.send(&message).await {
            // only undo our own write; a newer issue may have replaced it meanwhile
            let rolled_back = matches!(
                self.store.remove_if(&identifier, &|r: &ChallengeRecord| r.id == challenge_id),
                Lookup::Removed(_)
            );
            warn!(phone = %fingerprint(&identifier), challenge = %challenge_id, rolled_back, "OTP delivery failed: {e}");
            metrics::counter!("otp_delivery_failures_total").increment(1);
            return Err(OtpError::Delivery(e));
        }

        metrics::counter!("otp_issued_total").increment(1);
        info!(phone = %fingerprint(&identifier), challenge = %challenge_id, "OTP issued");
        Ok(Confirmation { identifier, challenge_id, expires_at })
    }

    /// Check `submitted_code` against the pending challenge for `raw_phone`.
    pub fn verify(&self, raw_phone: &str, submitted_code: &str) -> Result<VerificationOutcome, OtpError> {
        let identifier = self.normalizer.normalize(raw_phone)?;
        let now = self.clock.now();

        let lookup = self
            .store
            .remove_if(&identifier, &|r: &ChallengeRecord| r.is_expired_at(now) || r.code == submitted_code);
        let outcome = match lookup {
            Lookup::Absent => VerificationOutcome::NoChallenge,
            Lookup::Retained(_) => VerificationOutcome::Mismatch,
            Lookup::Removed(r) if r.is_expired_at(now) => VerificationOutcome::Expired,
            Lookup::Removed(_) => VerificationOutcome::Verified,
        };

        metrics::counter!("otp_verifications_total", "outcome" => outcome.as_str()).increment(1);
        info!(phone = %fingerprint(&identifier), outcome = outcome.as_str(), "OTP verification");
        Ok(outcome)
    }

    /// Remove every challenge that has expired by now.
    pub fn purge_expired(&self) -> usize {
        let purged = self.store.purge_expired(self.clock.now());
        if purged > 0 {
            metrics::counter!("otp_purged_total").increment(purged as u64);
        }
        purged
    }
}

/// Periodically purge abandoned challenges. Expiry is still enforced on read;
/// this only bounds memory.
pub fn spawn_janitor(service: Arc<OtpService>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(every);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            let purged = service.purge_expired();
            if purged > 0 {
                debug!(purged, "expired OTP challenges purged");
            }
        }
    })
}
