use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub bootstrap_admin: Option<(String, String)>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = get("POINTS_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("POINTS_JWT_SECRET is unset or still a placeholder");
        }

        let db_path: PathBuf = get("POINTS_DB_PATH")
            .unwrap_or_else(|| "points.db".into())
            .into();
        let host = get("POINTS_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("POINTS_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("POINTS_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .context("POINTS_HOST/POINTS_PORT do not form a socket address")?;

        let ttl_hours: i64 = match get("POINTS_TOKEN_TTL_HOURS") {
            Some(v) => v
                .parse()
                .context("POINTS_TOKEN_TTL_HOURS must be a whole number of hours")?,
            None => 12,
        };
        if ttl_hours < 1 {
            bail!("POINTS_TOKEN_TTL_HOURS must be at least 1");
        }

        let bootstrap_admin = match (get("POINTS_ADMIN_USERNAME"), get("POINTS_ADMIN_PASSWORD")) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        };

        Ok(Self {
            db_path,
            addr,
            jwt_secret,
            token_ttl: chrono::Duration::hours(ttl_hours),
            bootstrap_admin,
        })
    }
}
