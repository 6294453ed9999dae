use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use super::handlers::{
    AppState, borrow_book, create_author, create_book, create_member, delete_author,
    delete_book, delete_member, get_author, get_book, get_member, health_check, list_authors,
    list_books, list_loans, list_member_loans, list_members, readiness_check, return_book,
    update_author, update_book, update_member,
};
use super::middleware::{
    CORRELATION_ID_HEADER, MakeCorrelationId, cors_layer, log_response, make_request_span,
    report_errors, route_not_found,
};

/// `/api` 配下のリソースルート
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/authors", get(list_authors).post(create_author))
        .route(
            "/authors/:id",
            get(get_author).put(update_author).delete(delete_author),
        )
        .route("/books", get(list_books).post(create_book))
        .route(
            "/books/:id",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route("/members", get(list_members).post(create_member))
        .route(
            "/members/:id",
            get(get_member).put(update_member).delete(delete_member),
        )
        .route("/loans", get(list_loans))
        .route("/loans/borrow", post(borrow_book))
        .route("/loans/return/:id", post(return_book))
        .route("/loans/member/:memberId", get(list_member_loans))
}

/// アプリケーション全体のルーターを構築する
///
/// Probe endpoints（`/api` の外）:
/// - GET /health - Liveness
/// - GET /ready - Readiness（データベース疎通）
///
/// レイヤーは下に書いたものが外側になる。リクエストは次の順に通過する:
/// 1. SetRequestIdLayer: `x-correlation-id` を採番（クライアント提供値があればそれを使う）
/// 2. TraceLayer: 相関ID付きのスパンを作成し、完了ログを出す
/// 3. PropagateRequestIdLayer: レスポンスヘッダーに相関IDをコピー
/// 4. CORS
/// 5. report_errors: エラーレスポンスを記録し、本番以外では `stack` を付与
/// 6. ルーティング（未定義ルートは404のフォールバック）
pub fn create_router(state: Arc<AppState>) -> Router {
    let environment = state.config.environment;
    let cors = cors_layer(&state.config.cors);

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", api_routes())
        .fallback(route_not_found)
        .layer(from_fn_with_state(environment, report_errors))
        .layer(cors)
        .layer(PropagateRequestIdLayer::new(CORRELATION_ID_HEADER))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(make_request_span)
                .on_response(log_response)
                .on_failure(()),
        )
        .layer(SetRequestIdLayer::new(
            CORRELATION_ID_HEADER,
            MakeCorrelationId,
        ))
        .with_state(state)
}
