// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared application state.
//!
//! One [`SecretAccessor`] is built per process and shared by the issuer and
//! the authorizer, so the signing secret is fetched once.

use std::collections::HashSet;
use std::sync::Arc;

use crate::auth::{
    Authorizer, DecisionCache, SecretAccessor, SecretStore, TokenCodec, TokenIssuer,
    TokenVerifier,
};
use crate::clock::Clock;
use crate::config::Settings;
use crate::registry::{ClientRegistry, RegistryError};
use crate::storage::ClientStore;

/// Name given to the client provisioned from `SEED_ADMIN_*`.
pub const SEED_ADMIN_NAME: &str = "bootstrap admin";

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ClientRegistry>,
    pub issuer: Arc<TokenIssuer>,
    pub authorizer: Arc<Authorizer>,
    pub secrets: Arc<SecretAccessor>,
    pub admin_clients: Arc<HashSet<String>>,
}

impl AppState {
    /// Wire the service from settings and its two external stores.
    ///
    /// Provisions the seed admin client if one is configured and absent.
    pub fn new(
        settings: &Settings,
        client_store: Arc<dyn ClientStore>,
        secret_store: Arc<dyn SecretStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RegistryError> {
        let verifier = Arc::new(codec_for(settings, &clock));
        Self::with_verifier(settings, client_store, secret_store, clock, verifier)
    }

    /// Like [`new`](Self::new) but with the authorizer's verifier supplied.
    pub fn with_verifier(
        settings: &Settings,
        client_store: Arc<dyn ClientStore>,
        secret_store: Arc<dyn SecretStore>,
        clock: Arc<dyn Clock>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Result<Self, RegistryError> {
        let registry = Arc::new(ClientRegistry::new(
            client_store,
            settings.pbkdf2_iterations,
            Arc::clone(&clock),
        )?);

        if let Some(seed) = &settings.seed_admin {
            registry.seed(&seed.client_id, &seed.client_secret, SEED_ADMIN_NAME)?;
        }

        let secrets = Arc::new(SecretAccessor::new(
            settings.signing_secret_id.clone(),
            secret_store,
        ));

        let issuer = Arc::new(TokenIssuer::new(
            Arc::clone(&registry),
            Arc::clone(&secrets),
            codec_for(settings, &clock),
            settings.token.lifetime,
            Arc::clone(&clock),
        ));

        let cache = DecisionCache::new(
            settings.decision_cache_capacity,
            settings.decision_cache_ttl,
            clock,
        );
        let authorizer = Arc::new(Authorizer::new(Arc::clone(&secrets), verifier, cache));

        Ok(Self {
            registry,
            issuer,
            authorizer,
            secrets,
            admin_clients: Arc::new(settings.admin_client_ids.clone()),
        })
    }

    /// Check whether a client may use the client-management routes.
    pub fn is_admin(&self, client_id: &str) -> bool {
        self.admin_clients.contains(client_id)
    }
}

fn codec_for(settings: &Settings, clock: &Arc<dyn Clock>) -> TokenCodec {
    TokenCodec::new(
        settings.token.issuer.clone(),
        settings.token.audience.clone(),
        Arc::clone(clock),
    )
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use super::*;
    use crate::auth::codec::testing::CountingVerifier;
    use crate::auth::secrets::testing::FlakySecretStore;
    use crate::auth::SigningSecret;
    use crate::clock::testing::ManualClock;
    use crate::config::SeedAdmin;
    use crate::models::TokenRequest;
    use crate::storage::InMemoryClientStore;

    pub const TEST_SIGNING_SECRET: &[u8] = b"state-test-signing-secret";

    /// A fully wired state plus handles for observing it.
    pub struct TestState {
        pub state: AppState,
        pub admin: SeedAdmin,
        pub clock: ManualClock,
        pub verifier: Arc<CountingVerifier<TokenCodec>>,
        pub secret_store: Arc<FlakySecretStore>,
    }

    pub fn test_settings(extra: &[(&str, &str)]) -> Settings {
        let mut vars: HashMap<String, String> = [
            ("PBKDF2_ITERATIONS", "1000"),
            ("SEED_ADMIN_CLIENT_ID", "admin-client"),
            ("SEED_ADMIN_CLIENT_SECRET", "admin-secret"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in extra {
            vars.insert(k.to_string(), v.to_string());
        }
        Settings::from_lookup(|name| vars.get(name).cloned()).unwrap()
    }

    pub fn test_state() -> TestState {
        test_state_with(&[])
    }

    pub fn test_state_with(extra: &[(&str, &str)]) -> TestState {
        let settings = test_settings(extra);
        let clock = ManualClock::starting_now();
        let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());
        let secret_store = Arc::new(FlakySecretStore::new(
            SigningSecret::hs256(TEST_SIGNING_SECRET.to_vec()),
            true,
        ));
        let verifier = Arc::new(CountingVerifier::new(codec_for(&settings, &shared_clock)));

        let state = AppState::with_verifier(
            &settings,
            Arc::new(InMemoryClientStore::new()),
            secret_store.clone(),
            shared_clock,
            verifier.clone(),
        )
        .unwrap();

        TestState {
            state,
            admin: settings.seed_admin.clone().unwrap(),
            clock,
            verifier,
            secret_store,
        }
    }

    impl AppState {
        /// Issue a token directly through the issuer.
        pub async fn token_for(&self, client_id: &str, client_secret: &str) -> String {
            self.issuer
                .issue_token(TokenRequest {
                    grant_type: Some("client_credentials".to_string()),
                    client_id: Some(client_id.to_string()),
                    client_secret: Some(client_secret.to_string()),
                })
                .await
                .unwrap()
                .access_token
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{test_settings, test_state};
    use super::*;
    use crate::auth::StaticSecretStore;
    use crate::auth::SigningSecret;
    use crate::clock::SystemClock;
    use crate::storage::InMemoryClientStore;

    #[test]
    fn seed_admin_is_provisioned_and_admin() {
        let t = test_state();
        assert!(t.state.is_admin("admin-client"));
        assert!(!t.state.is_admin("someone-else"));
        assert!(t
            .state
            .registry
            .verify_credentials("admin-client", "admin-secret")
            .unwrap());
    }

    #[test]
    fn rebuilding_state_keeps_existing_seed() {
        let settings = test_settings(&[]);
        let store: Arc<dyn ClientStore> = Arc::new(InMemoryClientStore::new());
        let secrets: Arc<dyn SecretStore> =
            Arc::new(StaticSecretStore::new(SigningSecret::hs256(b"k".to_vec())));

        AppState::new(&settings, Arc::clone(&store), Arc::clone(&secrets), Arc::new(SystemClock))
            .unwrap();
        let second = AppState::new(&settings, store, secrets, Arc::new(SystemClock)).unwrap();
        assert_eq!(second.registry.list().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn issuer_and_authorizer_share_one_secret_fetch() {
        let t = test_state();
        let token = t.state.token_for("admin-client", "admin-secret").await;
        let decision = t
            .state
            .authorizer
            .authorize(Some(&format!("Bearer {token}")), "GET /v1/whoami")
            .await;

        assert!(decision.is_allow());
        assert_eq!(t.secret_store.fetches(), 1);
    }
}
