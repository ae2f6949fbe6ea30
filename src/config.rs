use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};

use crate::model::user::LeaveBalance;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    MySql,
    Memory,
}

#[derive(Clone)]
pub struct Config {
    pub server_addr: String,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub access_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub log_dir: String,

    /// Minutes east of UTC used to decide "today" for expiry.
    pub tz_offset_minutes: i32,
    pub profile_cache_ttl_secs: u64,
    pub holidays_file: Option<PathBuf>,
    pub default_balance: LeaveBalance,

    /// Seeded administrator, created at start-up when absent.
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:5000".to_string(),
            store_backend: StoreBackend::Memory,
            database_url: None,
            jwt_secret: "change-me".to_string(),
            access_token_ttl: 86_400,
            rate_login_per_min: 60,
            rate_register_per_min: 30,
            rate_protected_per_min: 1000,
            api_prefix: "/api".to_string(),
            log_dir: "logs".to_string(),
            tz_offset_minutes: 0,
            profile_cache_ttl_secs: 60,
            holidays_file: None,
            default_balance: LeaveBalance::default(),
            admin_email: None,
            admin_password: None,
        }
    }
}

fn var_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} is invalid: {}", key, e)),
        Err(_) => Ok(default),
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let store_backend = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "mysql".to_string())
            .to_lowercase()
            .as_str()
        {
            "mysql" => StoreBackend::MySql,
            "memory" => StoreBackend::Memory,
            other => bail!("STORE_BACKEND must be 'mysql' or 'memory', got '{}'", other),
        };

        let database_url = optional("DATABASE_URL");
        if store_backend == StoreBackend::MySql && database_url.is_none() {
            bail!("DATABASE_URL must be set when STORE_BACKEND is mysql");
        }

        let base = defaults.default_balance;
        let default_balance = LeaveBalance {
            annual: var_or("DEFAULT_ANNUAL_LEAVE", base.annual)?,
            sick: var_or("DEFAULT_SICK_LEAVE", base.sick)?,
            personal: var_or("DEFAULT_PERSONAL_LEAVE", base.personal)?,
            emergency: var_or("DEFAULT_EMERGENCY_LEAVE", base.emergency)?,
            maternity: var_or("DEFAULT_MATERNITY_LEAVE", base.maternity)?,
            paternity: var_or("DEFAULT_PATERNITY_LEAVE", base.paternity)?,
        };

        Ok(Self {
            server_addr: var_or("SERVER_ADDR", defaults.server_addr)?,
            store_backend,
            database_url,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            access_token_ttl: var_or("ACCESS_TOKEN_TTL", defaults.access_token_ttl)?,
            rate_login_per_min: var_or("RATE_LOGIN_PER_MIN", defaults.rate_login_per_min)?,
            rate_register_per_min: var_or("RATE_REGISTER_PER_MIN", defaults.rate_register_per_min)?,
            rate_protected_per_min: var_or(
                "RATE_PROTECTED_PER_MIN",
                defaults.rate_protected_per_min,
            )?,
            api_prefix: var_or("API_PREFIX", defaults.api_prefix)?,
            log_dir: var_or("LOG_DIR", defaults.log_dir)?,
            tz_offset_minutes: var_or("TZ_OFFSET_MINUTES", defaults.tz_offset_minutes)?,
            profile_cache_ttl_secs: var_or(
                "PROFILE_CACHE_TTL_SECS",
                defaults.profile_cache_ttl_secs,
            )?,
            holidays_file: optional("HOLIDAYS_FILE").map(PathBuf::from),
            default_balance,
            admin_email: optional("ADMIN_EMAIL"),
            admin_password: optional("ADMIN_PASSWORD"),
        })
    }

    /// Today's date in the configured offset.
    pub fn today(&self) -> chrono::NaiveDate {
        crate::utils::time::today(self.tz_offset_minutes)
    }
}
