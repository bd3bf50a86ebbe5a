// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access token signing and verification.
//!
//! Tokens use the JWS compact form with an HMAC-SHA256 signature:
//!
//! ```text
//! base64url(header) . base64url(claims) . base64url(HMAC-SHA256(secret, header.claims))
//! ```
//!
//! Verification order: signature (constant-time), then `exp`, then `iss`,
//! then `aud`. Anything that cannot be decoded is an invalid signature.

use std::sync::Arc;

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::claims::AccessTokenClaims;
use super::secrets::SigningSecret;
use crate::clock::Clock;

type HmacSha256 = Hmac<Sha256>;

/// Reasons a token is rejected by [`TokenVerifier::verify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VerificationFailure {
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    TokenExpired,
    #[error("token issuer is invalid")]
    InvalidIssuer,
    #[error("token audience is invalid")]
    InvalidAudience,
}

/// Payload could not be decoded for introspection.
#[derive(Debug, thiserror::Error)]
#[error("token payload could not be decoded: {0}")]
pub struct DecodeFailure(String);

/// Signing errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("claims serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("signing key rejected: {0}")]
    InvalidKey(String),
    #[error("algorithm {0:?} is not supported for signing")]
    UnsupportedAlgorithm(Algorithm),
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

/// Verification seam used by the authorizer.
pub trait TokenVerifier: Send + Sync {
    fn verify(
        &self,
        token: &str,
        secret: &SigningSecret,
    ) -> Result<AccessTokenClaims, VerificationFailure>;
}

/// Stateless HS256 token codec bound to the expected issuer and audience.
#[derive(Clone)]
pub struct TokenCodec {
    issuer: String,
    audience: String,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            clock,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Sign `claims` into a compact token string.
    pub fn sign(
        &self,
        claims: &AccessTokenClaims,
        secret: &SigningSecret,
    ) -> Result<String, CodecError> {
        if secret.algorithm() != Algorithm::HS256 {
            return Err(CodecError::UnsupportedAlgorithm(secret.algorithm()));
        }
        let header = TokenHeader {
            alg: algorithm_name(secret.algorithm()).to_string(),
            typ: Some("JWT".to_string()),
        };
        let signing_input = format!(
            "{}.{}",
            Base64UrlUnpadded::encode_string(&serde_json::to_vec(&header)?),
            Base64UrlUnpadded::encode_string(&serde_json::to_vec(claims)?),
        );

        let mut mac = HmacSha256::new_from_slice(secret.bytes())
            .map_err(|e| CodecError::InvalidKey(e.to_string()))?;
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();

        Ok(format!(
            "{signing_input}.{}",
            Base64UrlUnpadded::encode_string(&signature)
        ))
    }

    /// Decode claims without checking the signature.
    ///
    /// For log and error context only; never use the result to authorize.
    pub fn decode(token: &str) -> Result<AccessTokenClaims, DecodeFailure> {
        jsonwebtoken::dangerous::insecure_decode::<AccessTokenClaims>(token)
            .map(|data| data.claims)
            .map_err(|e| DecodeFailure(e.to_string()))
    }
}

impl TokenVerifier for TokenCodec {
    fn verify(
        &self,
        token: &str,
        secret: &SigningSecret,
    ) -> Result<AccessTokenClaims, VerificationFailure> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(VerificationFailure::InvalidSignature);
        };

        let header: TokenHeader = decode_segment(header_b64)?;
        if header.alg != algorithm_name(secret.algorithm()) {
            return Err(VerificationFailure::InvalidSignature);
        }

        let signature = Base64UrlUnpadded::decode_vec(signature_b64)
            .map_err(|_| VerificationFailure::InvalidSignature)?;
        let mut mac = HmacSha256::new_from_slice(secret.bytes())
            .map_err(|_| VerificationFailure::InvalidSignature)?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| VerificationFailure::InvalidSignature)?;

        let claims: AccessTokenClaims = decode_segment(claims_b64)?;

        if self.clock.now().timestamp() >= claims.exp {
            return Err(VerificationFailure::TokenExpired);
        }
        if claims.iss != self.issuer {
            return Err(VerificationFailure::InvalidIssuer);
        }
        if claims.aud != self.audience {
            return Err(VerificationFailure::InvalidAudience);
        }

        Ok(claims)
    }
}

fn decode_segment<T>(segment: &str) -> Result<T, VerificationFailure>
where
    T: serde::de::DeserializeOwned,
{
    let bytes =
        Base64UrlUnpadded::decode_vec(segment).map_err(|_| VerificationFailure::InvalidSignature)?;
    serde_json::from_slice(&bytes).map_err(|_| VerificationFailure::InvalidSignature)
}

fn algorithm_name(algorithm: Algorithm) -> &'static str {
    match algorithm {
        Algorithm::HS256 => "HS256",
        Algorithm::HS384 => "HS384",
        Algorithm::HS512 => "HS512",
        _ => "unsupported",
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::ManualClock;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use chrono::Duration;

    fn setup() -> (TokenCodec, ManualClock, SigningSecret) {
        let clock = ManualClock::starting_now();
        let codec = TokenCodec::new("token-gate", "items-api", Arc::new(clock.clone()));
        (codec, clock, SigningSecret::hs256(b"0123456789abcdef0123456789abcdef".to_vec()))
    }

    fn claims_at(clock: &ManualClock, lifetime: i64) -> AccessTokenClaims {
        let now = clock.now().timestamp();
        AccessTokenClaims {
            sub: "client-1".to_string(),
            iss: "token-gate".to_string(),
            aud: "items-api".to_string(),
            iat: now,
            exp: now + lifetime,
        }
    }

    #[test]
    fn sign_then_verify_returns_claims() {
        let (codec, clock, secret) = setup();
        let claims = claims_at(&clock, 3600);
        let token = codec.sign(&claims, &secret).unwrap();

        assert_eq!(token.split('.').count(), 3);
        assert_eq!(codec.verify(&token, &secret).unwrap(), claims);
    }

    #[test]
    fn signing_is_deterministic() {
        let (codec, clock, secret) = setup();
        let claims = claims_at(&clock, 3600);
        assert_eq!(
            codec.sign(&claims, &secret).unwrap(),
            codec.sign(&claims, &secret).unwrap()
        );
    }

    #[test]
    fn header_declares_hs256_jwt() {
        let (codec, clock, secret) = setup();
        let token = codec.sign(&claims_at(&clock, 60), &secret).unwrap();
        let header = URL_SAFE_NO_PAD.decode(token.split('.').next().unwrap()).unwrap();
        let header: serde_json::Value = serde_json::from_slice(&header).unwrap();
        assert_eq!(header["alg"], "HS256");
        assert_eq!(header["typ"], "JWT");
    }

    #[test]
    fn wrong_secret_is_invalid_signature() {
        let (codec, clock, secret) = setup();
        let token = codec.sign(&claims_at(&clock, 3600), &secret).unwrap();
        let other = SigningSecret::hs256(b"another-secret".to_vec());
        assert_eq!(
            codec.verify(&token, &other),
            Err(VerificationFailure::InvalidSignature)
        );
    }

    #[test]
    fn tampered_payload_is_invalid_signature() {
        let (codec, clock, secret) = setup();
        let token = codec.sign(&claims_at(&clock, 3600), &secret).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let mut forged = claims_at(&clock, 3600);
        forged.sub = "admin".to_string();
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let forged_token = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert_eq!(
            codec.verify(&forged_token, &secret),
            Err(VerificationFailure::InvalidSignature)
        );
    }

    #[test]
    fn garbage_is_invalid_signature() {
        let (codec, _, secret) = setup();
        for token in ["", "abc", "a.b", "a.b.c", "a.b.c.d", "!!!.???.***"] {
            assert_eq!(
                codec.verify(token, &secret),
                Err(VerificationFailure::InvalidSignature),
                "token {token:?}"
            );
        }
    }

    #[test]
    fn algorithm_none_is_rejected() {
        let (codec, clock, secret) = setup();
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims_at(&clock, 60)).unwrap());
        let token = format!("{header}.{payload}.");
        assert_eq!(
            codec.verify(&token, &secret),
            Err(VerificationFailure::InvalidSignature)
        );
    }

    #[test]
    fn correctly_signed_partial_claims_are_rejected() {
        let (codec, _, secret) = setup();
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"client-1","iss":"token-gate"}"#);
        let input = format!("{header}.{payload}");
        let mut mac = HmacSha256::new_from_slice(secret.bytes()).unwrap();
        mac.update(input.as_bytes());
        let sig = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        assert_eq!(
            codec.verify(&format!("{input}.{sig}"), &secret),
            Err(VerificationFailure::InvalidSignature)
        );
    }

    #[test]
    fn expiry_is_enforced_at_exp() {
        let (codec, clock, secret) = setup();
        let token = codec.sign(&claims_at(&clock, 60), &secret).unwrap();

        clock.advance(Duration::seconds(59));
        assert!(codec.verify(&token, &secret).is_ok());

        clock.advance(Duration::seconds(1));
        assert_eq!(
            codec.verify(&token, &secret),
            Err(VerificationFailure::TokenExpired)
        );
    }

    #[test]
    fn wrong_issuer_and_audience_are_rejected() {
        let (codec, clock, secret) = setup();

        let mut claims = claims_at(&clock, 3600);
        claims.iss = "someone-else".to_string();
        let token = codec.sign(&claims, &secret).unwrap();
        assert_eq!(
            codec.verify(&token, &secret),
            Err(VerificationFailure::InvalidIssuer)
        );

        let mut claims = claims_at(&clock, 3600);
        claims.aud = "other-api".to_string();
        let token = codec.sign(&claims, &secret).unwrap();
        assert_eq!(
            codec.verify(&token, &secret),
            Err(VerificationFailure::InvalidAudience)
        );
    }

    #[test]
    fn decode_reads_claims_without_secret() {
        let (codec, clock, secret) = setup();
        let claims = claims_at(&clock, 3600);
        let token = codec.sign(&claims, &secret).unwrap();
        assert_eq!(TokenCodec::decode(&token).unwrap().sub, "client-1");
        assert!(TokenCodec::decode("not-a-token").is_err());
    }
}
