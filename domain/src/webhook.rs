//! HMAC-SHA256 signatures on job-status webhooks.

use crate::error::{config_error, webhook_error, Error, WebhookErrorKind};
use hmac::{Hmac, Mac};
use log::*;
use service::config::Config;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex signature of the raw request body.
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Checks `signature` (hex, optionally prefixed with `sha256=`) against the
/// HMAC-SHA256 of `body` keyed with `secret`. The comparison is constant-time.
pub fn verify_signature(secret: &str, signature: Option<&str>, body: &[u8]) -> Result<(), Error> {
    let signature = signature.ok_or_else(|| {
        webhook_error(
            WebhookErrorKind::MissingSignature,
            &format!("Missing signature header: {SIGNATURE_HEADER}"),
        )
    })?;

    let signature = signature.trim();
    let expected_sig = hex::decode(signature.strip_prefix("sha256=").unwrap_or(signature))
        .map_err(|_| webhook_error(WebhookErrorKind::InvalidSignature, "Invalid signature format"))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| webhook_error(WebhookErrorKind::InvalidSignature, "Invalid HMAC key"))?;
    mac.update(body);

    mac.verify_slice(&expected_sig)
        .map_err(|_| webhook_error(WebhookErrorKind::InvalidSignature, "Signature mismatch"))
}

/// Authenticates a webhook request against the configured signing secret.
///
/// Without a secret, requests pass unchecked outside production so local
/// providers can be pointed at a dev server; production refuses them.
pub fn authenticate(config: &Config, signature: Option<&str>, body: &[u8]) -> Result<(), Error> {
    match config.webhook_signing_secret() {
        Some(secret) => verify_signature(secret, signature, body),
        None if config.is_production() => {
            error!("WEBHOOK_SIGNING_SECRET is not configured; rejecting webhook");
            Err(config_error("Webhook signing secret is not configured"))
        }
        None => {
            warn!("WEBHOOK_SIGNING_SECRET is not configured; accepting unsigned webhook");
            Ok(())
        }
    }
}

/// Hex HMAC-SHA256 of `body`, as a provider would compute it.
pub fn sign(secret: &str, body: &[u8]) -> Result<String, Error> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| webhook_error(WebhookErrorKind::InvalidSignature, "Invalid HMAC key"))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainErrorKind, ExternalErrorKind, InternalErrorKind};
    use clap::Parser;

    const SECRET: &str = "whsec_test";
    const BODY: &[u8] = br#"{"job_id":"job_1","status":"COMPLETED"}"#;

    fn kind(err: Error) -> DomainErrorKind {
        err.error_kind
    }

    #[test]
    fn test_valid_signature() {
        let signature = sign(SECRET, BODY).unwrap();
        assert!(verify_signature(SECRET, Some(&signature), BODY).is_ok());
    }

    #[test]
    fn test_prefixed_signature() {
        let signature = format!("sha256={}", sign(SECRET, BODY).unwrap());
        assert!(verify_signature(SECRET, Some(&signature), BODY).is_ok());
    }

    #[test]
    fn test_tampered_body_is_rejected() {
        let signature = sign(SECRET, BODY).unwrap();
        let err = verify_signature(SECRET, Some(&signature), b"{}").unwrap_err();
        assert_eq!(
            kind(err),
            DomainErrorKind::External(ExternalErrorKind::Webhook(
                WebhookErrorKind::InvalidSignature
            ))
        );
    }

    #[test]
    fn test_repeated_prefix_is_rejected() {
        let signature = format!("sha256=sha256={}", sign(SECRET, BODY).unwrap());
        let err = verify_signature(SECRET, Some(&signature), BODY).unwrap_err();
        assert_eq!(
            kind(err),
            DomainErrorKind::External(ExternalErrorKind::Webhook(
                WebhookErrorKind::InvalidSignature
            ))
        );
    }

    #[test]
    fn test_non_hex_signature_is_rejected() {
        assert!(verify_signature(SECRET, Some("not-hex"), BODY).is_err());
    }

    #[test]
    fn test_missing_signature_is_rejected() {
        let err = verify_signature(SECRET, None, BODY).unwrap_err();
        assert_eq!(
            kind(err),
            DomainErrorKind::External(ExternalErrorKind::Webhook(
                WebhookErrorKind::MissingSignature
            ))
        );
    }

    fn config(args: &[&str]) -> Config {
        Config::parse_from(std::iter::once("creative_ink").chain(args.iter().copied()))
    }

    #[test]
    fn test_authenticate_checks_signature_when_secret_is_configured() {
        let config = config(&[]).set_webhook_signing_secret(SECRET.to_string());
        let signature = sign(SECRET, BODY).unwrap();

        assert!(authenticate(&config, Some(&signature), BODY).is_ok());
        assert!(authenticate(&config, None, BODY).is_err());
    }

    #[test]
    fn test_authenticate_skips_check_without_secret_in_development() {
        assert!(authenticate(&config(&[]), None, BODY).is_ok());
    }

    #[test]
    fn test_authenticate_refuses_without_secret_in_production() {
        let err = authenticate(&config(&["--runtime-env", "production"]), None, BODY).unwrap_err();
        assert_eq!(kind(err), DomainErrorKind::Internal(InternalErrorKind::Config));
    }
}
