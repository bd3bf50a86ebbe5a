// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token authorizer.
//!
//! ## Decision Flow
//!
//! 1. Header must be exactly `Bearer <token>`; anything else is denied
//!    without touching the cache
//! 2. The raw token is fingerprinted and looked up in the [`DecisionCache`]
//! 3. On a miss the signing secret is loaded and the token verified:
//!    - verification failure → `Deny`, cached
//!    - success → `Allow` with the token's `sub`/`iss`/`aud`, cached
//!    - secret unavailable → `Deny`, **not** cached
//! 4. The verdict is rendered into a policy for the presented resource

use std::sync::Arc;

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::cache::{fingerprint, short, Computed, DecisionCache, Verdict};
use super::claims::AuthorizationContext;
use super::codec::{TokenCodec, TokenVerifier};
use super::secrets::SecretAccessor;

/// Principal reported on `Deny` decisions.
pub const UNAUTHORIZED_PRINCIPAL: &str = "unauthorized";

/// Policy effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Effect {
    Allow,
    Deny,
}

/// Policy statement for the presented resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PolicyDocument {
    #[serde(rename = "Effect")]
    pub effect: Effect,
    #[serde(rename = "Resource")]
    pub resource: String,
}

/// Allow/deny outcome returned to the request router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDecision {
    pub principal_id: String,
    pub policy_document: PolicyDocument,
    /// Present only on `Allow`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<AuthorizationContext>,
}

impl PolicyDecision {
    pub fn allow(context: AuthorizationContext, resource: impl Into<String>) -> Self {
        Self {
            principal_id: context.sub.clone(),
            policy_document: PolicyDocument {
                effect: Effect::Allow,
                resource: resource.into(),
            },
            context: Some(context),
        }
    }

    pub fn deny(resource: impl Into<String>) -> Self {
        Self {
            principal_id: UNAUTHORIZED_PRINCIPAL.to_string(),
            policy_document: PolicyDocument {
                effect: Effect::Deny,
                resource: resource.into(),
            },
            context: None,
        }
    }

    pub fn is_allow(&self) -> bool {
        self.policy_document.effect == Effect::Allow
    }

    fn render(verdict: Verdict, resource: &str) -> Self {
        match verdict {
            Verdict::Allow { context, .. } => Self::allow(context, resource),
            Verdict::Deny => Self::deny(resource),
        }
    }
}

/// Extract the token from an `Authorization` header value.
///
/// Only the exact scheme `Bearer` followed by a single space and a non-empty
/// token without whitespace is accepted.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let token = header?.strip_prefix("Bearer ")?;
    if token.is_empty() || token.contains(char::is_whitespace) {
        return None;
    }
    Some(token)
}

/// Validates bearer tokens and memoizes the outcome.
pub struct Authorizer {
    secrets: Arc<SecretAccessor>,
    verifier: Arc<dyn TokenVerifier>,
    cache: DecisionCache,
}

impl Authorizer {
    pub fn new(
        secrets: Arc<SecretAccessor>,
        verifier: Arc<dyn TokenVerifier>,
        cache: DecisionCache,
    ) -> Self {
        Self {
            secrets,
            verifier,
            cache,
        }
    }

    /// Decide whether the bearer in `authorization_header` may invoke `resource`.
    pub async fn authorize(
        &self,
        authorization_header: Option<&str>,
        resource: &str,
    ) -> PolicyDecision {
        let Some(token) = bearer_token(authorization_header) else {
            tracing::debug!(resource, "Malformed or missing bearer header");
            return PolicyDecision::deny(resource);
        };

        let fingerprint = fingerprint(token);
        let verdict = self
            .cache
            .get_or_compute(&fingerprint, || self.evaluate(token, &fingerprint))
            .await;

        PolicyDecision::render(verdict, resource)
    }

    /// Decision cache, for inspection.
    pub fn cache(&self) -> &DecisionCache {
        &self.cache
    }

    async fn evaluate(&self, token: &str, fingerprint: &str) -> Computed {
        let secret = match self.secrets.signing_secret().await {
            Ok(secret) => secret,
            Err(e) => {
                tracing::warn!(
                    fingerprint = short(fingerprint),
                    error = %e,
                    "Signing secret unavailable, denying without caching"
                );
                return Computed::transient(Verdict::Deny);
            }
        };

        match self.verifier.verify(token, &secret) {
            Ok(claims) => {
                let Some(token_expires_at) = DateTime::from_timestamp(claims.exp, 0) else {
                    return Computed::cacheable(Verdict::Deny);
                };
                tracing::debug!(
                    fingerprint = short(fingerprint),
                    sub = %claims.sub,
                    "Token verified"
                );
                Computed::cacheable(Verdict::Allow {
                    context: AuthorizationContext::from(&claims),
                    token_expires_at,
                })
            }
            Err(failure) => {
                let claimed_sub = TokenCodec::decode(token).map(|c| c.sub).ok();
                tracing::info!(
                    fingerprint = short(fingerprint),
                    claimed_sub = claimed_sub.as_deref().unwrap_or("-"),
                    reason = %failure,
                    "Token rejected"
                );
                Computed::cacheable(Verdict::Deny)
            }
        }
    }
}
