//! # アプリケーション設定
//!
//! 環境変数から設定を読み込む。`.env` ファイルの読み込みは呼び出し元
//! （`main`）で `dotenvy` により先に行う。
//!
//! 値が不正な場合は起動を中止できるよう、変数名付きの [`ConfigError`] を返す。

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::observability::LogFormat;

/// 設定読み込みのエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(name: &'static str, value: &str, reason: impl ToString) -> Self {
        ConfigError::Invalid {
            name,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// 実行環境
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "production" => Ok(Environment::Production),
            _ => Err(format!("unknown environment: {s}")),
        }
    }
}

/// データベース接続設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// CORS設定
///
/// `origins` に `*` が含まれる場合はすべてのオリジンを許可する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsConfig {
    pub origins: Vec<String>,
    pub credentials: bool,
}

impl CorsConfig {
    pub fn allows_any_origin(&self) -> bool {
        self.origins.iter().any(|o| o == "*")
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: vec!["*".to_string()],
            credentials: false,
        }
    }
}

/// サーバー全体の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// バインドアドレス
    pub host: String,
    /// ポート番号
    pub port: u16,
    pub environment: Environment,
    /// シグナル受信から強制終了までの猶予
    pub shutdown_timeout: Duration,
    /// `RUST_LOG` 未設定時のログレベル
    pub log_level: String,
    pub log_format: LogFormat,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: Environment::Development,
            shutdown_timeout: Duration::from_millis(10_000),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database: DatabaseConfig {
                url: "postgres://localhost/library".to_string(),
                max_connections: 5,
            },
            cors: CorsConfig::default(),
        }
    }
}

impl AppConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の参照関数から設定を読み込む
    ///
    /// 未設定の変数はデフォルト値になる。空文字列も未設定として扱う。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let environment = parse_or(get("APP_ENV"), "APP_ENV", defaults.environment)?;
        let log_format_default = if environment.is_production() {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        };

        let shutdown_timeout_ms = parse_or(
            get("SHUTDOWN_TIMEOUT_MS"),
            "SHUTDOWN_TIMEOUT_MS",
            defaults.shutdown_timeout.as_millis() as u64,
        )?;

        let max_connections = parse_or(
            get("DATABASE_MAX_CONNECTIONS"),
            "DATABASE_MAX_CONNECTIONS",
            defaults.database.max_connections,
        )?;
        if max_connections == 0 {
            return Err(ConfigError::invalid(
                "DATABASE_MAX_CONNECTIONS",
                "0",
                "must be at least 1",
            ));
        }

        let cors_origins = match get("CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect(),
            None => defaults.cors.origins,
        };

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or(get("PORT"), "PORT", defaults.port)?,
            environment,
            shutdown_timeout: Duration::from_millis(shutdown_timeout_ms),
            log_level: get("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: parse_or(get("LOG_FORMAT"), "LOG_FORMAT", log_format_default)?,
            database: DatabaseConfig {
                url: get("DATABASE_URL").unwrap_or(defaults.database.url),
                max_connections,
            },
            cors: CorsConfig {
                origins: cors_origins,
                credentials: parse_or(
                    get("CORS_CREDENTIALS"),
                    "CORS_CREDENTIALS",
                    defaults.cors.credentials,
                )?,
            },
        })
    }

    /// `host:port` 形式のバインドアドレス
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(raw: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(name, &value, e)),
        None => Ok(default),
    }
}
