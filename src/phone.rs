use sha2::{Digest, Sha256};

use crate::otp::OtpError;

/// Maps user-supplied phone strings to the canonical identifier used as the
/// challenge store key.
#[derive(Clone, Debug)]
pub struct PhoneNormalizer {
    default_prefix: String,
}

impl PhoneNormalizer {
    /// `default_prefix` must look like `+91`: a plus sign and 1-4 digits.
    pub fn new(default_prefix: impl Into<String>) -> Result<Self, OtpError> {
        let default_prefix = default_prefix.into();
        let digits = default_prefix.strip_prefix('+').unwrap_or("");
        if digits.is_empty() || digits.len() > 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(OtpError::InvalidInput(format!(
                "invalid default country code '{default_prefix}'"
            )));
        }
        Ok(Self { default_prefix })
    }

    pub fn default_prefix(&self) -> &str {
        &self.default_prefix
    }

    pub fn normalize(&self, raw: &str) -> Result<String, OtpError> {
        if raw.is_empty() {
            return Err(OtpError::InvalidInput("Phone number is required".into()));
        }
        if raw.starts_with('+') {
            return Ok(raw.to_string());
        }
        Ok(format!("{}{}", self.default_prefix, raw))
    }
}

/// Short stable digest of an identifier, safe to put in logs.
pub fn fingerprint(identifier: &str) -> String {
    let digest = Sha256::digest(identifier.as_bytes());
    hex::encode(&digest[..6])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn india() -> PhoneNormalizer {
        PhoneNormalizer::new("+91").unwrap()
    }

    #[test]
    fn prepends_default_prefix_when_missing() {
        assert_eq!(india().normalize("9876543210").unwrap(), "+919876543210");
        // anything without a leading plus gets the prefix verbatim
        assert_eq!(india().normalize("0 98-76").unwrap(), "+910 98-76");
    }

    #[test]
    fn leading_plus_is_identity() {
        for raw in ["+919876543210", "+14155550100", "+"] {
            assert_eq!(india().normalize(raw).unwrap(), raw);
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        let n = PhoneNormalizer::new("+1").unwrap();
        let once = n.normalize("4155550100").unwrap();
        assert_eq!(n.normalize(&once).unwrap(), once);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(india().normalize(""), Err(OtpError::InvalidInput(_))));
    }

    #[test]
    fn prefix_must_be_plus_and_digits() {
        assert!(PhoneNormalizer::new("91").is_err());
        assert!(PhoneNormalizer::new("+").is_err());
        assert!(PhoneNormalizer::new("+9a").is_err());
        assert!(PhoneNormalizer::new("+12345").is_err());
        assert_eq!(PhoneNormalizer::new("+44").unwrap().default_prefix(), "+44");
    }

    #[test]
    fn fingerprint_is_stable_and_short() {
        let a = fingerprint("+919876543210");
        assert_eq!(a, fingerprint("+919876543210"));
        assert_ne!(a, fingerprint("+919876543211"));
        assert_eq!(a.len(), 12);
    }
}
