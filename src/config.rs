// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values and the
//! typed [`Settings`] loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `SIGNING_SECRET_ID` | Identifier of the signing secret in the secret store | `token-gate/signing-secret` |
//! | `SECRET_STORE_URL` | Remote secret store base URL | Unset (env secret store) |
//! | `SIGNING_SECRET` | Signing secret for the env secret store; raw bytes, or `base64url:<material>` | Required without `SECRET_STORE_URL` |
//! | `SIGNING_SECRET_ALGORITHM` | Algorithm of `SIGNING_SECRET` | `HS256` |
//! | `TOKEN_ISSUER` | `iss` claim of issued tokens | `token-gate` |
//! | `TOKEN_AUDIENCE` | `aud` claim of issued tokens | `token-gate-api` |
//! | `TOKEN_LIFETIME_SECS` | Access token lifetime | `3600` |
//! | `DECISION_CACHE_TTL_SECS` | Authorizer decision cache TTL | `300` |
//! | `DECISION_CACHE_CAPACITY` | Maximum cached decisions | `10000` |
//! | `CLIENT_DB_PATH` | redb file for client records | Unset (in-memory) |
//! | `PBKDF2_ITERATIONS` | Client secret hashing cost | `100000` |
//! | `ADMIN_CLIENT_IDS` | Comma-separated admin client ids | Empty |
//! | `SEED_ADMIN_CLIENT_ID` | Bootstrap admin client id | Unset |
//! | `SEED_ADMIN_CLIENT_SECRET` | Bootstrap admin client secret | Unset |
//! | `TLS_CERT_PATH` | PEM certificate chain (enables HTTPS) | Unset |
//! | `TLS_KEY_PATH` | PEM private key (enables HTTPS) | Unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::collections::HashSet;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const SIGNING_SECRET_ID_ENV: &str = "SIGNING_SECRET_ID";
pub const SECRET_STORE_URL_ENV: &str = "SECRET_STORE_URL";
pub const SIGNING_SECRET_ENV: &str = "SIGNING_SECRET";
pub const SIGNING_SECRET_ALGORITHM_ENV: &str = "SIGNING_SECRET_ALGORITHM";
pub const TOKEN_ISSUER_ENV: &str = "TOKEN_ISSUER";
pub const TOKEN_AUDIENCE_ENV: &str = "TOKEN_AUDIENCE";
pub const TOKEN_LIFETIME_ENV: &str = "TOKEN_LIFETIME_SECS";
pub const DECISION_CACHE_TTL_ENV: &str = "DECISION_CACHE_TTL_SECS";
pub const DECISION_CACHE_CAPACITY_ENV: &str = "DECISION_CACHE_CAPACITY";
pub const CLIENT_DB_PATH_ENV: &str = "CLIENT_DB_PATH";
pub const PBKDF2_ITERATIONS_ENV: &str = "PBKDF2_ITERATIONS";
pub const ADMIN_CLIENT_IDS_ENV: &str = "ADMIN_CLIENT_IDS";
pub const SEED_ADMIN_CLIENT_ID_ENV: &str = "SEED_ADMIN_CLIENT_ID";
pub const SEED_ADMIN_CLIENT_SECRET_ENV: &str = "SEED_ADMIN_CLIENT_SECRET";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SIGNING_SECRET_ID: &str = "token-gate/signing-secret";
pub const DEFAULT_SIGNING_ALGORITHM: &str = "HS256";
pub const DEFAULT_TOKEN_ISSUER: &str = "token-gate";
pub const DEFAULT_TOKEN_AUDIENCE: &str = "token-gate-api";

/// Default access token lifetime (1 hour).
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// Default decision cache TTL (5 minutes).
pub const DEFAULT_DECISION_CACHE_TTL: Duration = Duration::from_secs(300);

pub const DEFAULT_DECISION_CACHE_CAPACITY: usize = 10_000;
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 100_000;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Errors raised while loading [`Settings`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is not a valid {expected}: {value:?}")]
    InvalidValue {
        name: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{0} is not a valid URL: {1}")]
    InvalidUrl(&'static str, url::ParseError),

    #[error("{present} is set but {missing} is not")]
    Incomplete {
        present: &'static str,
        missing: &'static str,
    },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Where the signing secret is fetched from.
#[derive(Clone, PartialEq, Eq)]
pub enum SecretSource {
    /// `SECRET_STORE_URL` was configured.
    Remote(Url),
    /// Secret comes from the process environment.
    Environment {
        value: Option<String>,
        algorithm: String,
    },
}

impl std::fmt::Debug for SecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretSource::Remote(url) => f.debug_tuple("Remote").field(&url.as_str()).finish(),
            SecretSource::Environment { value, algorithm } => f
                .debug_struct("Environment")
                .field("value", &value.as_ref().map(|_| "<redacted>"))
                .field("algorithm", algorithm)
                .finish(),
        }
    }
}

/// Token issuance and validation parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSettings {
    pub issuer: String,
    pub audience: String,
    pub lifetime: Duration,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            issuer: DEFAULT_TOKEN_ISSUER.to_string(),
            audience: DEFAULT_TOKEN_AUDIENCE.to_string(),
            lifetime: DEFAULT_TOKEN_LIFETIME,
        }
    }
}

/// Bootstrap admin credential provisioned at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct SeedAdmin {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for SeedAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedAdmin")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Fully resolved service configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub signing_secret_id: String,
    pub secret_source: SecretSource,
    pub token: TokenSettings,
    pub decision_cache_ttl: Duration,
    pub decision_cache_capacity: usize,
    pub client_db_path: Option<PathBuf>,
    pub pbkdf2_iterations: NonZeroU32,
    pub admin_client_ids: HashSet<String>,
    pub seed_admin: Option<SeedAdmin>,
    pub tls: Option<(PathBuf, PathBuf)>,
    pub log_format: LogFormat,
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let secret_source = match get(SECRET_STORE_URL_ENV) {
            Some(raw) => SecretSource::Remote(
                Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(SECRET_STORE_URL_ENV, e))?,
            ),
            None => SecretSource::Environment {
                value: get(SIGNING_SECRET_ENV),
                algorithm: get(SIGNING_SECRET_ALGORITHM_ENV)
                    .unwrap_or_else(|| DEFAULT_SIGNING_ALGORITHM.to_string()),
            },
        };

        let token = TokenSettings {
            issuer: get(TOKEN_ISSUER_ENV).unwrap_or_else(|| DEFAULT_TOKEN_ISSUER.to_string()),
            audience: get(TOKEN_AUDIENCE_ENV)
                .unwrap_or_else(|| DEFAULT_TOKEN_AUDIENCE.to_string()),
            lifetime: parse_secs(TOKEN_LIFETIME_ENV, get(TOKEN_LIFETIME_ENV))?
                .unwrap_or(DEFAULT_TOKEN_LIFETIME),
        };

        let decision_cache_ttl = parse_secs(DECISION_CACHE_TTL_ENV, get(DECISION_CACHE_TTL_ENV))?
            .unwrap_or(DEFAULT_DECISION_CACHE_TTL);

        let decision_cache_capacity = match get(DECISION_CACHE_CAPACITY_ENV) {
            Some(raw) => {
                let capacity: usize = parse_number(DECISION_CACHE_CAPACITY_ENV, &raw)?;
                if capacity == 0 {
                    return Err(ConfigError::Zero(DECISION_CACHE_CAPACITY_ENV));
                }
                capacity
            }
            None => DEFAULT_DECISION_CACHE_CAPACITY,
        };

        let pbkdf2_iterations = match get(PBKDF2_ITERATIONS_ENV) {
            Some(raw) => NonZeroU32::new(parse_number(PBKDF2_ITERATIONS_ENV, &raw)?)
                .ok_or(ConfigError::Zero(PBKDF2_ITERATIONS_ENV))?,
            None => NonZeroU32::new(DEFAULT_PBKDF2_ITERATIONS)
                .ok_or(ConfigError::Zero(PBKDF2_ITERATIONS_ENV))?,
        };

        let port = match get(PORT_ENV) {
            Some(raw) => parse_number(PORT_ENV, &raw)?,
            None => DEFAULT_PORT,
        };

        let seed_admin = match (get(SEED_ADMIN_CLIENT_ID_ENV), get(SEED_ADMIN_CLIENT_SECRET_ENV)) {
            (Some(client_id), Some(client_secret)) => Some(SeedAdmin {
                client_id,
                client_secret,
            }),
            (Some(_), None) => {
                return Err(ConfigError::Incomplete {
                    present: SEED_ADMIN_CLIENT_ID_ENV,
                    missing: SEED_ADMIN_CLIENT_SECRET_ENV,
                })
            }
            (None, Some(_)) => {
                return Err(ConfigError::Incomplete {
                    present: SEED_ADMIN_CLIENT_SECRET_ENV,
                    missing: SEED_ADMIN_CLIENT_ID_ENV,
                })
            }
            (None, None) => None,
        };

        let mut admin_client_ids: HashSet<String> = get(ADMIN_CLIENT_IDS_ENV)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if let Some(seed) = &seed_admin {
            admin_client_ids.insert(seed.client_id.clone());
        }

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some((PathBuf::from(cert), PathBuf::from(key))),
            (Some(_), None) => {
                return Err(ConfigError::Incomplete {
                    present: TLS_CERT_PATH_ENV,
                    missing: TLS_KEY_PATH_ENV,
                })
            }
            (None, Some(_)) => {
                return Err(ConfigError::Incomplete {
                    present: TLS_KEY_PATH_ENV,
                    missing: TLS_CERT_PATH_ENV,
                })
            }
            (None, None) => None,
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref().map(str::to_lowercase) {
            Some(format) if format == "json" => LogFormat::Json,
            Some(format) if format == "pretty" => LogFormat::Pretty,
            Some(format) => {
                return Err(ConfigError::InvalidValue {
                    name: LOG_FORMAT_ENV,
                    expected: "log format (json|pretty)",
                    value: format,
                })
            }
            None => LogFormat::default(),
        };

        Ok(Self {
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            signing_secret_id: get(SIGNING_SECRET_ID_ENV)
                .unwrap_or_else(|| DEFAULT_SIGNING_SECRET_ID.to_string()),
            secret_source,
            token,
            decision_cache_ttl,
            decision_cache_capacity,
            client_db_path: get(CLIENT_DB_PATH_ENV).map(PathBuf::from),
            pbkdf2_iterations,
            admin_client_ids,
            seed_admin,
            tls,
            log_format,
        })
    }

    /// The `host:port` string the server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_number<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name,
        expected: "number",
        value: raw.to_string(),
    })
}

fn parse_secs(name: &'static str, raw: Option<String>) -> Result<Option<Duration>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let secs: u64 = parse_number(name, &raw)?;
    if secs == 0 {
        return Err(ConfigError::Zero(name));
    }
    Ok(Some(Duration::from_secs(secs)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let settings = load(&[]).unwrap();
        assert_eq!(settings.bind_address(), "0.0.0.0:8080");
        assert_eq!(settings.token, TokenSettings::default());
        assert_eq!(settings.token.lifetime, Duration::from_secs(3600));
        assert_eq!(settings.decision_cache_ttl, Duration::from_secs(300));
        assert_eq!(settings.decision_cache_capacity, 10_000);
        assert_eq!(settings.signing_secret_id, DEFAULT_SIGNING_SECRET_ID);
        assert_eq!(
            settings.secret_source,
            SecretSource::Environment {
                value: None,
                algorithm: "HS256".to_string()
            }
        );
        assert!(settings.client_db_path.is_none());
        assert!(settings.admin_client_ids.is_empty());
        assert!(settings.tls.is_none());
        assert_eq!(settings.log_format, LogFormat::Pretty);
    }

    #[test]
    fn overrides_are_parsed() {
        let settings = load(&[
            (TOKEN_ISSUER_ENV, "https://auth.example.com"),
            (TOKEN_AUDIENCE_ENV, "items-api"),
            (TOKEN_LIFETIME_ENV, "900"),
            (DECISION_CACHE_TTL_ENV, "60"),
            (SECRET_STORE_URL_ENV, "https://secrets.internal"),
            (ADMIN_CLIENT_IDS_ENV, "a, b,,c"),
            (LOG_FORMAT_ENV, "JSON"),
        ])
        .unwrap();

        assert_eq!(settings.token.issuer, "https://auth.example.com");
        assert_eq!(settings.token.audience, "items-api");
        assert_eq!(settings.token.lifetime, Duration::from_secs(900));
        assert_eq!(settings.decision_cache_ttl, Duration::from_secs(60));
        assert!(matches!(settings.secret_source, SecretSource::Remote(_)));
        assert_eq!(settings.admin_client_ids.len(), 3);
        assert_eq!(settings.log_format, LogFormat::Json);
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let err = load(&[(DECISION_CACHE_TTL_ENV, "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Zero(DECISION_CACHE_TTL_ENV)));
    }

    #[test]
    fn non_numeric_lifetime_is_rejected() {
        let err = load(&[(TOKEN_LIFETIME_ENV, "an hour")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn half_configured_tls_is_rejected() {
        let err = load(&[(TLS_CERT_PATH_ENV, "/etc/tls/cert.pem")]).unwrap_err();
        assert!(matches!(err, ConfigError::Incomplete { .. }));
    }

    #[test]
    fn seed_admin_is_implicitly_admin() {
        let settings = load(&[
            (SEED_ADMIN_CLIENT_ID_ENV, "bootstrap"),
            (SEED_ADMIN_CLIENT_SECRET_ENV, "s3cret"),
        ])
        .unwrap();
        assert!(settings.admin_client_ids.contains("bootstrap"));
        assert!(!format!("{:?}", settings.seed_admin).contains("s3cret"));
    }

    #[test]
    fn debug_output_redacts_signing_secret() {
        let settings = load(&[(SIGNING_SECRET_ENV, "top-secret-signing-key")]).unwrap();
        assert!(!format!("{settings:?}").contains("top-secret-signing-key"));
    }
}
