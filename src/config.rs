// src/config.rs
use chrono::{Duration, Local};
use derive_more::Display;
use env_logger::{Env, Target};
use lazy_static::lazy_static;
use log::warn;
use regex::Regex;
use std::env;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017/dance-platform";
const DEFAULT_DATABASE: &str = "dance-platform";
const DEV_JWT_SECRET: &str = "default-secret-key-change-in-production";
const DEFAULT_POSE_SERVICE: &str = "http://127.0.0.1:8000/process-frame";
const DEFAULT_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

lazy_static! {
    static ref DURATION_FORMAT: Option<Regex> = Regex::new(r"^(?:\d+[dhms])+$").ok();
    static ref DURATION_PART: Option<Regex> = Regex::new(r"(\d+)([dhms])").ok();
}

#[derive(Debug, Display)]
pub enum ConfigError {
    #[display(fmt = "PORT must be a number between 1 and 65535, got '{}'", _0)]
    InvalidPort(String),
    #[display(fmt = "BCRYPT_COST must be between 4 and 31, got '{}'", _0)]
    InvalidCost(String),
    #[display(fmt = "JWT_SECRET must be set in production")]
    MissingSecret,
    #[display(fmt = "logger setup failed: {}", _0)]
    Logger(String),
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub mongodb_uri: String,
    pub database_name: String,
    pub storage_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub log_dir: PathBuf,
    pub jwt_secret: String,
    pub jwt_expiration: Duration,
    pub bcrypt_cost: u32,
    pub pose_service_url: String,
    pub allowed_origins: Vec<String>,
}

/// Parses durations such as `24h`, `1h30m` or `7d`. Zero-length and
/// malformed values yield `None`.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (format, parts) = (DURATION_FORMAT.as_ref()?, DURATION_PART.as_ref()?);
    if !format.is_match(raw) {
        return None;
    }

    let mut seconds: i64 = 0;
    for part in parts.captures_iter(raw) {
        let amount: i64 = part[1].parse().ok()?;
        let unit = match &part[2] {
            "d" => 86_400,
            "h" => 3_600,
            "m" => 60,
            _ => 1,
        };
        seconds = seconds.checked_add(amount.checked_mul(unit)?)?;
    }

    if seconds > 0 {
        Some(Duration::seconds(seconds))
    } else {
        None
    }
}

/// Database name from the path segment of a MongoDB-style URI.
pub fn database_name(uri: &str) -> String {
    let without_scheme = uri.split_once("://").map_or(uri, |(_, rest)| rest);
    without_scheme
        .split_once('/')
        .map(|(_, path)| path.split(['?', '/']).next().unwrap_or(""))
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_DATABASE)
        .to_string()
}

impl Config {
    /// Reads the process environment. Call [`load_dotenv`] first so `.env`
    /// values are visible.
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match var("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .ok()
                .filter(|p| *p != 0)
                .ok_or(ConfigError::InvalidPort(raw))?,
            None => 5000,
        };

        let production = var("APP_ENV").map_or(false, |v| v.eq_ignore_ascii_case("production"));
        let jwt_secret = match var("JWT_SECRET") {
            Some(secret) => secret,
            None if production => return Err(ConfigError::MissingSecret),
            None => {
                warn!("⚠️ JWT_SECRET not set, using the development default (unsafe for production)");
                DEV_JWT_SECRET.to_string()
            }
        };

        let jwt_expiration = match var("JWT_EXPIRATION") {
            Some(raw) => parse_duration(&raw).unwrap_or_else(|| {
                warn!("⚠️ Invalid JWT_EXPIRATION '{}', falling back to 24h", raw);
                Duration::hours(24)
            }),
            None => Duration::hours(24),
        };

        let bcrypt_cost = match var("BCRYPT_COST") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|c| (4..=31).contains(c))
                .ok_or(ConfigError::InvalidCost(raw))?,
            None => bcrypt::DEFAULT_COST,
        };

        let mongodb_uri = var("MONGODB_URI").unwrap_or_else(|| DEFAULT_MONGODB_URI.to_string());
        let allowed_origins = var("ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_ORIGINS.to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        Ok(Config {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            database_name: database_name(&mongodb_uri),
            mongodb_uri,
            storage_dir: PathBuf::from(var("STORAGE_DIR").unwrap_or_else(|| "./storage".to_string())),
            upload_dir: PathBuf::from(var("UPLOAD_DIR").unwrap_or_else(|| "./uploads".to_string())),
            log_dir: PathBuf::from(var("LOG_DIR").unwrap_or_else(|| "./logs".to_string())),
            jwt_secret,
            jwt_expiration,
            bcrypt_cost,
            pose_service_url: var("POSE_SERVICE_URL").unwrap_or_else(|| DEFAULT_POSE_SERVICE.to_string()),
            allowed_origins,
        })
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

// Duplicates every log line to stdout and the day's log file
struct Tee {
    file: File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stdout().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()?;
        self.file.flush()
    }
}

pub fn load_dotenv() -> Option<PathBuf> {
    dotenv::dotenv().ok()
}

pub fn log_dir_from_env() -> PathBuf {
    PathBuf::from(
        env::var("LOG_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "./logs".to_string()),
    )
}

/// Sets up `env_logger` writing to stdout and `{log_dir}/server-YYYY-MM-DD.log`.
pub fn init_logger(log_dir: &Path) -> Result<PathBuf, ConfigError> {
    fs::create_dir_all(log_dir).map_err(|e| ConfigError::Logger(e.to_string()))?;
    let path = log_dir.join(format!("server-{}.log", Local::now().format("%Y-%m-%d")));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| ConfigError::Logger(e.to_string()))?;

    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(Tee { file })))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}: {}",
                Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init()
        .map_err(|e| ConfigError::Logger(e.to_string()))?;

    Ok(path)
}
