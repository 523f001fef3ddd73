use std::path::PathBuf;

use crate::api::error::SystemError;

pub const FILE_FIELD: &str = "file";
pub const DEFAULT_PORT: u16 = 5500;
pub const DEFAULT_WORKERS: usize = 2;
pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024; // 100MB
// Room for boundaries and part headers on top of the file itself.
pub const MULTIPART_OVERHEAD: u64 = 64 * 1024;
pub const MAX_NAME_ATTEMPTS: usize = 5;

pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
    "text/plain",
    "application/json",
    "application/zip",
    "application/x-zip-compressed",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Development,
    Production,
}

#[derive(Debug, Clone)]
pub struct Env {
    pub ip: String,
    pub port: u16,
    pub base_url: String,
    pub mode: Mode,
    pub upload_dir: PathBuf,
    pub max_file_size: u64,
    pub allowed_origins: Vec<String>,
    pub workers: usize,
}

impl Env {
    pub fn from_env() -> Result<Self, SystemError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup so it can be
    /// exercised without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SystemError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ip = lookup("IP").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;

        let base_url = lookup("BASE_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| format!("http://localhost:{}", port));
        let base_url = base_url.trim_end_matches('/').to_string();

        let mode = match lookup("APP_ENV").as_deref().map(str::trim) {
            Some(m) if m.eq_ignore_ascii_case("development") => Mode::Development,
            _ => Mode::Production,
        };

        let upload_dir = lookup("UPLOAD_DIR").map(PathBuf::from).unwrap_or_else(|| "uploads".into());

        let max_file_size = parse_or(&lookup, "MAX_FILE_SIZE", MAX_FILE_SIZE)?;

        let allowed_origins = lookup("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let workers = parse_or(&lookup, "WORKERS", DEFAULT_WORKERS)?;
        if workers == 0 {
            return Err(SystemError::Config("WORKERS must be at least 1".into()));
        }

        Ok(Env {
            ip,
            port,
            base_url,
            mode,
            upload_dir,
            max_file_size,
            allowed_origins,
            workers,
        })
    }

    pub fn is_development(&self) -> bool {
        self.mode == Mode::Development
    }

    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|origin| origin == "*")
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, SystemError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| SystemError::Config(format!("{key} must be a valid number, got '{raw}'"))),
        None => Ok(default),
    }
}
