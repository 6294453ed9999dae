//! 横断的なミドルウェア
//!
//! - 相関ID（`x-correlation-id`）の採番とレスポンスへの伝播
//! - リクエストスパンとレスポンスログ
//! - CORS
//! - エラーレスポンスの記録と `stack` の付与
//! - 未定義ルートの404

use std::time::Duration;

use axum::{
    body::Body,
    extract::{OriginalUri, Request, State},
    http::{
        HeaderName, HeaderValue, Method, Response,
        header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware::Next,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestId, RequestId},
};
use tracing::Span;
use uuid::Uuid;

use crate::config::{CorsConfig, Environment};

use super::error::{ApiError, ErrorReport};

/// 相関IDヘッダー
pub const CORRELATION_ID_HEADER: HeaderName = HeaderName::from_static("x-correlation-id");

// ============================================================================
// Correlation ID
// ============================================================================

/// 相関IDをUUID v4で生成する
///
/// `SetRequestIdLayer` はリクエストに既にヘッダーがある場合はその値を使う。
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeCorrelationId;

impl MakeRequestId for MakeCorrelationId {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

fn correlation_id(headers: &axum::http::HeaderMap) -> &str {
    headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
}

// ============================================================================
// Tracing
// ============================================================================

/// リクエストごとのスパン
///
/// このスパン内で出力されたログにはすべて相関IDが付く。
pub fn make_request_span(request: &Request) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        correlation_id = %correlation_id(request.headers()),
    )
}

/// レスポンスのステータスに応じたレベルで完了ログを出す
pub fn log_response(response: &Response<Body>, latency: Duration, _span: &Span) {
    let status = response.status().as_u16();
    let latency_ms = latency.as_millis() as u64;

    if response.status().is_server_error() {
        tracing::error!(status, latency_ms, "request completed");
    } else if response.status().is_client_error() {
        tracing::warn!(status, latency_ms, "request completed");
    } else {
        tracing::info!(status, latency_ms, "request completed");
    }
}

// ============================================================================
// CORS
// ============================================================================

/// 設定からCORSレイヤーを構築する
///
/// `*` と認証情報の許可が同時に指定された場合は、
/// リクエストのオリジンをそのまま返す（ブラウザは `*` + credentials を拒否する）。
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origin = if config.allows_any_origin() {
        if config.credentials {
            AllowOrigin::mirror_request()
        } else {
            AllowOrigin::any()
        }
    } else {
        let origins: Vec<HeaderValue> = config
            .origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(config.credentials)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION, CORRELATION_ID_HEADER])
        .expose_headers([CORRELATION_ID_HEADER])
}

// ============================================================================
// Error reporting
// ============================================================================

/// エラーレスポンスを記録する
///
/// [`ApiError`] が添付した [`ErrorReport`] を読み取り、
/// メソッド・パス・相関ID・ステータスとともにログに出す。
/// 本番環境以外ではレスポンスボディに `stack`（原因チェーン）を追加する。
pub async fn report_errors(
    State(environment): State<Environment>,
    request: Request,
    next: Next,
) -> Response<Body> {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let correlation_id = correlation_id(request.headers()).to_string();

    let response = next.run(request).await;
    let Some(report) = response.extensions().get::<ErrorReport>().cloned() else {
        return response;
    };

    let status = response.status().as_u16();
    let message = report.body.message.as_deref().unwrap_or_default();
    if response.status().is_server_error() {
        tracing::error!(
            %method, %path, %correlation_id, status,
            error = ?report.chain,
            "Request error"
        );
    } else {
        tracing::warn!(%method, %path, %correlation_id, status, error = message, "Request error");
    }

    if environment.is_production() {
        return response;
    }

    let mut body = report.body;
    body.stack = Some(report.chain);
    match serde_json::to_vec(&body) {
        Ok(bytes) => {
            let (mut parts, _) = response.into_parts();
            parts.headers.remove(CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(err) => {
            tracing::error!(error = %err, "Failed to serialize error stack");
            response
        }
    }
}

/// 未定義ルートのフォールバック
pub async fn route_not_found(method: Method, OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::RouteNotFound {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::Layer;

    #[test]
    fn test_generates_uuid_correlation_id() {
        let request = axum::http::Request::builder().body(()).unwrap();

        let id = MakeCorrelationId.make_request_id(&request).unwrap();

        let value = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(value).is_ok());
    }

    #[test]
    fn test_missing_correlation_id_is_dash() {
        let headers = axum::http::HeaderMap::new();

        assert_eq!(correlation_id(&headers), "-");
    }

    #[test]
    fn test_wildcard_with_credentials_does_not_panic() {
        let config = CorsConfig {
            origins: vec!["*".to_string()],
            credentials: true,
        };

        let _service = cors_layer(&config).layer(tower::service_fn(|_: Request| async {
            Ok::<_, std::convert::Infallible>(Response::new(Body::empty()))
        }));
    }
}
