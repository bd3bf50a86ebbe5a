// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Client-credentials token issuance and bearer-token authorization.
//!
//! ## Auth Flow
//!
//! 1. A provisioned client posts its credentials to `/oauth/token`
//! 2. [`TokenIssuer`] checks them against the client registry and returns an
//!    HS256 access token (`sub` = client id)
//! 3. The client sends `Authorization: Bearer <token>` to protected routes
//! 4. The router middleware asks the [`Authorizer`]:
//!    - repeated tokens are answered from the [`DecisionCache`]
//!    - new tokens are verified with the memoized [`SigningSecret`]
//!    - `Allow` forwards the request with the authorization context
//!
//! ## Security
//!
//! - The signing secret is fetched once per process and never logged
//! - Raw tokens are never logged; log lines carry a fingerprint prefix
//! - Denied tokens are cached; secret store outages are not
//! - Tokens are stateless: deactivating a client does not revoke tokens
//!   already issued to it

pub mod authorizer;
pub mod cache;
pub mod claims;
pub mod codec;
pub mod error;
pub mod extractor;
pub mod issuer;
pub mod middleware;
pub mod remote_secret;
pub mod secrets;

pub use authorizer::{Authorizer, Effect, PolicyDecision, PolicyDocument};
pub use cache::DecisionCache;
pub use claims::{AccessTokenClaims, AuthorizationContext, AuthorizedPrincipal};
pub use codec::{TokenCodec, TokenVerifier, VerificationFailure};
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth};
pub use issuer::{IssuerError, TokenIssuer};
pub use remote_secret::HttpSecretStore;
pub use secrets::{
    EnvSecretStore, SecretAccessor, SecretError, SecretStore, SigningSecret, StaticSecretStore,
};
