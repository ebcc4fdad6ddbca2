// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values and the
//! [`AppConfig`] loaded once at startup. Nothing reads the environment after
//! the configuration is built; components receive the pieces they need at
//! construction time.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding the redb database | `./data` |
//! | `JWT_SECRET` | HS256 signing secret (at least 32 bytes) | Required |
//! | `JWT_ISSUER` | `iss` claim of issued access tokens | `opendata-gateway` |
//! | `JWT_TTL_SECONDS` | Access token lifetime | `3600` |
//! | `REFRESH_TTL_DAYS` | Refresh token lifetime | `7` |
//! | `CKAN_BASE_URL` | CKAN action API base URL | `https://your-ckan-instance/api/3/action` |
//! | `ELASTIC_SEARCH_URL` | Elasticsearch base URL | Optional (analytics disabled) |
//! | `PUBLIC_BASE_URL` | Base URL used in `api_detail_url` links | `http://localhost:8080` |
//! | `SEED_DEMO_USERS` | Seed the demo users on startup | Optional |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; HTTPS when both are set | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::path::PathBuf;

use chrono::Duration;

use crate::auth::TokenSettings;
use crate::logging::LogFormat;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the database directory.
///
/// The redb file `gateway.redb` is created inside this directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_ISSUER_ENV: &str = "JWT_ISSUER";
pub const JWT_TTL_ENV: &str = "JWT_TTL_SECONDS";
pub const REFRESH_TTL_ENV: &str = "REFRESH_TTL_DAYS";
pub const CKAN_BASE_URL_ENV: &str = "CKAN_BASE_URL";
pub const ELASTIC_SEARCH_URL_ENV: &str = "ELASTIC_SEARCH_URL";
pub const PUBLIC_BASE_URL_ENV: &str = "PUBLIC_BASE_URL";
pub const SEED_DEMO_USERS_ENV: &str = "SEED_DEMO_USERS";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_JWT_ISSUER: &str = "opendata-gateway";
pub const DEFAULT_JWT_TTL_SECONDS: i64 = 3600;
pub const DEFAULT_REFRESH_TTL_DAYS: i64 = 7;
pub const DEFAULT_CKAN_BASE_URL: &str = "https://your-ckan-instance/api/3/action";
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080";

/// HS256 keys shorter than the hash output weaken the MAC.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Upper bounds on token lifetimes. Larger values overflow timestamp math.
pub const MAX_JWT_TTL_SECONDS: i64 = 86_400;
pub const MAX_REFRESH_TTL_DAYS: i64 = 365;

/// Database file name inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "gateway.redb";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// TLS material locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Upstream catalog and analytics endpoints.
#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub ckan_base_url: String,
    pub elastic_search_url: Option<String>,
    pub public_base_url: String,
}

/// Process-wide configuration, built once in `main`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub tokens: TokenSettings,
    pub refresh_ttl: Duration,
    pub catalog: CatalogSettings,
    pub seed_demo_users: bool,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match get(PORT_ENV) {
            Some(raw) => parse_number::<u16>(PORT_ENV, &raw)?,
            None => DEFAULT_PORT,
        };
        let ip: IpAddr = host.trim().parse().map_err(|e: AddrParseError| ConfigError::Invalid {
            name: HOST_ENV,
            reason: e.to_string(),
        })?;
        let bind_addr = SocketAddr::new(ip, port);

        let secret = get(JWT_SECRET_ENV).ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;
        if secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::Invalid {
                name: JWT_SECRET_ENV,
                reason: format!("must be at least {MIN_JWT_SECRET_LEN} bytes"),
            });
        }

        let access_ttl = match get(JWT_TTL_ENV) {
            Some(raw) => bounded(
                JWT_TTL_ENV,
                parse_number::<i64>(JWT_TTL_ENV, &raw)?,
                MAX_JWT_TTL_SECONDS,
            )?,
            None => DEFAULT_JWT_TTL_SECONDS,
        };
        let refresh_days = match get(REFRESH_TTL_ENV) {
            Some(raw) => bounded(
                REFRESH_TTL_ENV,
                parse_number::<i64>(REFRESH_TTL_ENV, &raw)?,
                MAX_REFRESH_TTL_DAYS,
            )?,
            None => DEFAULT_REFRESH_TTL_DAYS,
        };

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Invalid {
                    name: TLS_CERT_PATH_ENV,
                    reason: format!("{TLS_CERT_PATH_ENV} and {TLS_KEY_PATH_ENV} must be set together"),
                })
            }
        };

        let log_format = match get(LOG_FORMAT_ENV) {
            Some(raw) => LogFormat::parse(&raw).ok_or_else(|| ConfigError::Invalid {
                name: LOG_FORMAT_ENV,
                reason: format!("expected `json` or `pretty`, got `{raw}`"),
            })?,
            None => LogFormat::Pretty,
        };

        Ok(Self {
            bind_addr,
            data_dir: get(DATA_DIR_ENV)
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
                .into(),
            tokens: TokenSettings {
                secret: secret.into_bytes(),
                issuer: get(JWT_ISSUER_ENV).unwrap_or_else(|| DEFAULT_JWT_ISSUER.to_string()),
                access_ttl: Duration::seconds(access_ttl),
            },
            refresh_ttl: Duration::days(refresh_days),
            catalog: CatalogSettings {
                ckan_base_url: get(CKAN_BASE_URL_ENV)
                    .unwrap_or_else(|| DEFAULT_CKAN_BASE_URL.to_string()),
                elastic_search_url: get(ELASTIC_SEARCH_URL_ENV),
                public_base_url: get(PUBLIC_BASE_URL_ENV)
                    .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string()),
            },
            seed_demo_users: get(SEED_DEMO_USERS_ENV)
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            tls,
            log_format,
        })
    }

    /// Full path of the redb database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

fn parse_number<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}

fn bounded(name: &'static str, value: i64, max: i64) -> Result<i64, ConfigError> {
    if value <= 0 {
        return Err(ConfigError::Invalid {
            name,
            reason: "must be greater than zero".to_string(),
        });
    }
    if value > max {
        return Err(ConfigError::Invalid {
            name,
            reason: format!("must be at most {max}"),
        });
    }
    Ok(value)
}
