//! Signed, time-boxed visit tokens.
//!
//! A token is the URL-safe base64 (no padding) of a small JSON payload:
//! `{visitorId, visitDate, issuedAt, nonce, digest}`. The digest is a hex
//! HMAC-SHA256 over the other four fields, keyed with the server's QR
//! secret, so a token can only be minted here and any edit to an embedded
//! field is detected. Tokens stop verifying once they are older than the
//! configured TTL.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

const NONCE_BYTES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenRejection {
    #[error("Invalid QR code format")]
    Malformed,
    #[error("Invalid QR code")]
    InvalidDigest,
    #[error("QR code has expired")]
    Expired,
}

impl TokenRejection {
    pub fn reason(self) -> &'static str {
        match self {
            TokenRejection::Malformed => "malformed",
            TokenRejection::InvalidDigest => "invalid-digest",
            TokenRejection::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub visitor_id: Uuid,
    pub visit_date: DateTime<Utc>,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct Payload {
    visitor_id: Uuid,
    visit_date: String,
    issued_at: i64,
    nonce: String,
    digest: String,
}

#[derive(Clone)]
pub struct QrCodec {
    mac: HmacSha256,
    ttl: Duration,
}

impl std::fmt::Debug for QrCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QrCodec").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl QrCodec {
    pub fn new(secret: &str, ttl_hours: i64) -> Result<Self> {
        if secret.is_empty() {
            return Err(Error::Config("QR secret must not be empty".to_string()));
        }
        if ttl_hours <= 0 {
            return Err(Error::Config("QR token TTL must be positive".to_string()));
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| Error::Config(format!("Invalid QR secret: {}", e)))?;
        Ok(Self {
            mac,
            ttl: Duration::hours(ttl_hours),
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, visitor_id: Uuid, visit_date: DateTime<Utc>) -> Result<IssuedToken> {
        self.issue_at(visitor_id, visit_date, Utc::now())
    }

    pub fn issue_at(
        &self,
        visitor_id: Uuid,
        visit_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken> {
        let mut nonce = [0u8; NONCE_BYTES];
        rand::thread_rng().fill_bytes(&mut nonce);
        let nonce = hex::encode(nonce);

        let visit_date = visit_date.to_rfc3339_opts(SecondsFormat::AutoSi, true);
        let issued_at = now.timestamp_millis();
        let digest = self.digest(visitor_id, &visit_date, issued_at, &nonce);

        let payload = Payload {
            visitor_id,
            visit_date,
            issued_at,
            nonce,
            digest,
        };
        let json = serde_json::to_vec(&payload)
            .map_err(|e| Error::Internal(format!("QR payload encoding failed: {}", e)))?;

        let issued_at = DateTime::from_timestamp_millis(issued_at).unwrap_or(now);
        Ok(IssuedToken {
            token: URL_SAFE_NO_PAD.encode(json),
            issued_at,
            expires_at: issued_at + self.ttl,
        })
    }

    pub fn verify(&self, token: &str) -> std::result::Result<VerifiedToken, TokenRejection> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> std::result::Result<VerifiedToken, TokenRejection> {
        let raw = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|_| TokenRejection::Malformed)?;
        let payload: Payload =
            serde_json::from_slice(&raw).map_err(|_| TokenRejection::Malformed)?;
        let visit_date = DateTime::parse_from_rfc3339(&payload.visit_date)
            .map_err(|_| TokenRejection::Malformed)?
            .with_timezone(&Utc);
        let issued_at = DateTime::from_timestamp_millis(payload.issued_at)
            .ok_or(TokenRejection::Malformed)?;

        let expected = self.digest(
            payload.visitor_id,
            &payload.visit_date,
            payload.issued_at,
            &payload.nonce,
        );
        if !bool::from(expected.as_bytes().ct_eq(payload.digest.as_bytes())) {
            return Err(TokenRejection::InvalidDigest);
        }

        if now - issued_at > self.ttl {
            return Err(TokenRejection::Expired);
        }

        Ok(VerifiedToken {
            visitor_id: payload.visitor_id,
            visit_date,
            issued_at,
        })
    }

    fn digest(&self, visitor_id: Uuid, visit_date: &str, issued_at: i64, nonce: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(format!("{}|{}|{}|{}", visitor_id, visit_date, issued_at, nonce).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn codec() -> QrCodec {
        QrCodec::new("test-qr-secret", 24).unwrap()
    }

    fn visit_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap()
    }

    fn decode(token: &str) -> serde_json::Value {
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(token).unwrap()).unwrap()
    }

    fn encode(value: &serde_json::Value) -> String {
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).unwrap())
    }

    #[test]
    fn fresh_token_verifies_with_embedded_fields() {
        let visitor = Uuid::new_v4();
        let issued = codec().issue(visitor, visit_date()).unwrap();
        assert!(!issued.token.is_empty());
        assert_eq!(issued.expires_at - issued.issued_at, Duration::hours(24));

        let verified = codec().verify(&issued.token).unwrap();
        assert_eq!(verified.visitor_id, visitor);
        assert_eq!(verified.visit_date, visit_date());
    }

    #[test]
    fn sub_millisecond_visit_dates_survive_the_token() {
        let at = DateTime::parse_from_rfc3339("2031-04-04T10:00:00.123456Z")
            .unwrap()
            .with_timezone(&Utc);
        let issued = codec().issue(Uuid::new_v4(), at).unwrap();
        assert_eq!(decode(&issued.token)["visitDate"], "2031-04-04T10:00:00.123456Z");
        assert_eq!(codec().verify(&issued.token).unwrap().visit_date, at);
    }

    #[test]
    fn expiry_is_a_hard_cutoff_at_ttl() {
        let now = Utc::now();
        let issued = codec().issue_at(Uuid::new_v4(), visit_date(), now).unwrap();

        let at_ttl = issued.issued_at + Duration::hours(24);
        assert!(codec().verify_at(&issued.token, at_ttl).is_ok());

        let past_ttl = at_ttl + Duration::milliseconds(1);
        assert_eq!(
            codec().verify_at(&issued.token, past_ttl),
            Err(TokenRejection::Expired)
        );
    }

    #[test]
    fn issued_in_future_is_not_compensated() {
        let now = Utc::now();
        let issued = codec().issue_at(Uuid::new_v4(), visit_date(), now + Duration::hours(2)).unwrap();
        assert!(codec().verify_at(&issued.token, now).is_ok());
    }

    #[test]
    fn editing_an_embedded_field_breaks_the_digest() {
        let issued = codec().issue(Uuid::new_v4(), visit_date()).unwrap();
        let original = decode(&issued.token);

        let edits: [(&str, serde_json::Value); 4] = [
            ("visitorId", serde_json::json!(Uuid::new_v4())),
            ("visitDate", serde_json::json!("2025-06-02T10:00:00.000Z")),
            ("issuedAt", serde_json::json!(original["issuedAt"].as_i64().unwrap() + 1)),
            ("nonce", serde_json::json!("00".repeat(NONCE_BYTES))),
        ];
        for (field, value) in edits {
            let mut tampered = original.clone();
            tampered[field] = value;
            assert_eq!(
                codec().verify(&encode(&tampered)),
                Err(TokenRejection::InvalidDigest),
                "{field}"
            );
        }
    }

    #[test]
    fn every_single_character_edit_is_rejected() {
        let issued = codec().issue(Uuid::new_v4(), visit_date()).unwrap();
        let chars: Vec<char> = issued.token.chars().collect();
        for i in 0..chars.len() {
            let mut mutated = chars.clone();
            mutated[i] = if chars[i] == 'A' { 'B' } else { 'A' };
            let mutated: String = mutated.into_iter().collect();
            assert!(codec().verify(&mutated).is_err(), "position {i}");
        }
    }

    #[test]
    fn other_secret_cannot_verify() {
        let issued = codec().issue(Uuid::new_v4(), visit_date()).unwrap();
        let other = QrCodec::new("another-secret", 24).unwrap();
        assert_eq!(
            other.verify(&issued.token),
            Err(TokenRejection::InvalidDigest)
        );
    }

    #[test]
    fn garbage_is_malformed() {
        assert_eq!(codec().verify("not a token"), Err(TokenRejection::Malformed));
        assert_eq!(codec().verify(""), Err(TokenRejection::Malformed));
        let not_payload = URL_SAFE_NO_PAD.encode(br#"{"hello":"world"}"#);
        assert_eq!(codec().verify(&not_payload), Err(TokenRejection::Malformed));
    }

    #[test]
    fn tokens_are_unique_per_issue() {
        let visitor = Uuid::new_v4();
        let now = Utc::now();
        let a = codec().issue_at(visitor, visit_date(), now).unwrap();
        let b = codec().issue_at(visitor, visit_date(), now).unwrap();
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn tokens_are_path_safe() {
        let issued = codec().issue(Uuid::new_v4(), visit_date()).unwrap();
        assert!(issued
            .token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
