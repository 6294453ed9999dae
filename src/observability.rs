//! # ログ基盤
//!
//! トレーシング初期化とログ出力形式の設定を提供する。

use std::str::FromStr;

use tracing_subscriber::{EnvFilter, Layer as _, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{AppConfig, Environment};

/// ログ出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON 形式（本番環境向け）
    Json,
    /// 人間が読みやすい形式（開発環境向け）
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(format!("expected \"json\" or \"pretty\", got {other:?}")),
        }
    }
}

/// `RUST_LOG` 未設定時に使うフィルタ文字列
///
/// 開発環境では `LOG_LEVEL` に関わらず debug にする。
pub fn default_filter(config: &AppConfig) -> String {
    match config.environment {
        Environment::Development => "debug".to_string(),
        _ => config.log_level.clone(),
    }
}

/// トレーシングを初期化する
///
/// `RUST_LOG` 環境変数が設定されていればそれを優先する。
///
/// JSON モードでは以下のフィールドがトップレベルに出力される:
/// - `timestamp`, `level`, `target`, `message`
/// - リクエストスパンの `method`, `path`, `correlation_id`（`span` 配下）
pub fn init_tracing(config: &AppConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(config)));

    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_target(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_formats() {
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
    }

    #[test]
    fn test_parse_rejects_unknown_format() {
        assert!("JSON".parse::<LogFormat>().is_err());
        assert!("".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_development_forces_debug_level() {
        let config = AppConfig {
            log_level: "warn".to_string(),
            ..AppConfig::default()
        };

        assert_eq!(default_filter(&config), "debug");
    }

    #[test]
    fn test_other_environments_use_log_level() {
        let config = AppConfig {
            environment: Environment::Production,
            log_level: "warn".to_string(),
            ..AppConfig::default()
        };

        assert_eq!(default_filter(&config), "warn");
    }
}
