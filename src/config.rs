// src/config.rs

use std::{env, fmt::Display, str::FromStr};

use chrono::{FixedOffset, Local, Offset, Utc};
use dotenvy::dotenv;

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string. Without it progress lives in memory.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub rust_log: String,
    pub port: u16,
    /// Offset from UTC of the timezone whose midnights separate streak days.
    pub utc_offset_minutes: i32,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let local_offset_minutes = Local::now().offset().local_minus_utc() / 60;

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Self {
            database_url,
            jwt_secret,
            rust_log,
            port: parse_var("PORT", 3000),
            utc_offset_minutes: parse_var("TRACKER_UTC_OFFSET_MINUTES", local_offset_minutes),
            cors_origins,
        }
    }

    /// Timezone used to cut timestamps into streak days.
    /// Falls back to UTC when the configured offset is out of range.
    pub fn day_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }
}

fn parse_var<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("Invalid {key} value '{raw}': {e}")),
        Err(_) => default,
    }
}
