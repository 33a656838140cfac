//! Configuration module for environment variables and application settings

use std::env;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use jsonwebtoken::Algorithm;

use crate::database::DatabaseConfig;

#[derive(Debug, Clone)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Which credential store backs the service
    pub store: StoreBackend,

    /// Server configuration
    pub server: ServerConfig,

    /// Cookie scoping
    pub cookies: CookieConfig,

    /// Token lifetimes and key material
    pub tokens: TokenConfig,

    /// Argon2 cost parameters
    pub hashing: HashingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub domain: String,
    pub secure: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            domain: "localhost".to_string(),
            secure: false,
        }
    }
}

/// PEM key pair for one token kind.
#[derive(Clone)]
pub struct KeyPairPem {
    pub private_pem: Vec<u8>,
    pub public_pem: Vec<u8>,
}

impl std::fmt::Debug for KeyPairPem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPairPem")
            .field("private_pem", &"<redacted>")
            .field("public_pem", &format_args!("{} bytes", self.public_pem.len()))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub keys: KeyPairPem,
    pub expires_in: Duration,
    /// Cookie max-age; the token TTL unless `*_MAXAGE` (minutes) overrides it
    pub cookie_max_age: Duration,
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub algorithm: Algorithm,
    pub access: TokenSettings,
    pub refresh: TokenSettings,
}

#[derive(Debug, Clone, Copy)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        // argon2 crate defaults (OWASP minimum for Argon2id)
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let store = match env_or("STORE_BACKEND", "postgres").to_lowercase().as_str() {
            "postgres" | "postgresql" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => bail!("Unsupported STORE_BACKEND '{}'", other),
        };

        let database = match store {
            StoreBackend::Postgres => {
                let url = env::var("DATABASE_URL")
                    .context("DATABASE_URL must be set in the environment")?;
                DatabaseConfig::from_url(&url)?
            }
            StoreBackend::Memory => DatabaseConfig::default(),
        }
        .with_max_size(parse_env("DATABASE_MAX_CONNECTIONS", 16)?)
        .with_query_timeout(parse_duration(&env_or("DATABASE_QUERY_TIMEOUT", "5s"))?);

        let port = env::var("PORT")
            .or_else(|_| env::var("SERVER_PORT"))
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("SERVER_PORT must be a valid port number")?;

        let algorithm = parse_algorithm(&env_or("TOKEN_ALGORITHM", "RS256"))?;

        Ok(Self {
            database,
            store,
            server: ServerConfig {
                host: env_or("SERVER_HOST", "127.0.0.1"),
                port,
            },
            cookies: CookieConfig {
                domain: env_or("COOKIE_DOMAIN", "localhost"),
                secure: parse_env("COOKIE_SECURE", false)?,
            },
            tokens: TokenConfig {
                algorithm,
                access: token_settings("ACCESS_TOKEN", "15m")?,
                refresh: token_settings("REFRESH_TOKEN", "60m")?,
            },
            hashing: HashingConfig {
                memory_kib: parse_env("ARGON2_MEMORY_KIB", HashingConfig::default().memory_kib)?,
                iterations: parse_env("ARGON2_ITERATIONS", HashingConfig::default().iterations)?,
                parallelism: parse_env("ARGON2_PARALLELISM", HashingConfig::default().parallelism)?,
            },
        })
    }
}

fn token_settings(prefix: &str, default_ttl: &str) -> Result<TokenSettings> {
    let expires_in = parse_duration(&env_or(&format!("{prefix}_EXPIRED_IN"), default_ttl))?;
    let max_age_minutes = match env::var(format!("{prefix}_MAXAGE")) {
        Ok(raw) => Some(
            raw.trim()
                .parse::<u64>()
                .map_err(|e| anyhow!("{}_MAXAGE has an invalid value '{}': {}", prefix, raw, e))?,
        ),
        Err(_) => None,
    };
    Ok(TokenSettings {
        keys: KeyPairPem {
            private_pem: decode_key(&format!("{prefix}_PRIVATE_KEY"))?,
            public_pem: decode_key(&format!("{prefix}_PUBLIC_KEY"))?,
        },
        cookie_max_age: cookie_max_age(expires_in, max_age_minutes)?,
        expires_in,
    })
}

/// Explicit `*_MAXAGE` minutes win; otherwise the cookie lives exactly as long as its token.
pub fn cookie_max_age(expires_in: Duration, max_age_minutes: Option<u64>) -> Result<Duration> {
    let Some(minutes) = max_age_minutes else {
        return Ok(expires_in);
    };
    let secs = minutes
        .checked_mul(60)
        .filter(|secs| i64::try_from(*secs).is_ok())
        .ok_or_else(|| anyhow!("max-age of {} minutes is out of range", minutes))?;
    Ok(Duration::from_secs(secs))
}

/// Keys travel base64-encoded so a PEM fits into one environment line.
fn decode_key(name: &str) -> Result<Vec<u8>> {
    let raw = env::var(name).with_context(|| format!("{name} must be set in the environment"))?;
    STANDARD
        .decode(raw.trim())
        .with_context(|| format!("{name} is not valid base64"))
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{} has an invalid value '{}': {}", name, raw, e)),
        Err(_) => Ok(default),
    }
}

pub fn parse_algorithm(raw: &str) -> Result<Algorithm> {
    match raw.trim().to_uppercase().as_str() {
        "RS256" => Ok(Algorithm::RS256),
        "ES256" => Ok(Algorithm::ES256),
        "EDDSA" => Ok(Algorithm::EdDSA),
        other => bail!("Unsupported TOKEN_ALGORITHM '{}', expected RS256, ES256 or EdDSA", other),
    }
}

/// Parses durations like `30s`, `15m`, `1h`, `7d`. A bare number is seconds.
pub fn parse_duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let value: u64 = digits
        .parse()
        .map_err(|_| anyhow!("invalid duration '{}'", raw))?;

    let multiplier: u64 = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 60 * 60 * 24,
        _ => bail!("invalid duration unit in '{}'", raw),
    };
    // seconds must fit an i64 so they can become JWT timestamps and cookie max-ages
    let secs = value
        .checked_mul(multiplier)
        .filter(|secs| i64::try_from(*secs).is_ok())
        .ok_or_else(|| anyhow!("duration '{}' is out of range", raw))?;
    if secs == 0 {
        bail!("duration '{}' must be positive", raw);
    }
    Ok(Duration::from_secs(secs))
}
