use crate::application::{
    catalog::{self, CatalogDependencies},
    loan::{self as loan_service, ServiceDependencies},
};
use crate::config::AppConfig;
use crate::domain::{Author, AuthorId, BookId, LoanId, Member, MemberId, commands::ReturnBook};
use crate::ports::{
    AuthorWithBooks, BookDetail, BookWithAuthor, DatabaseProbe, LoanDetails, LoanWithBook,
    MemberDetail,
};
use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

use super::{
    error::ApiError,
    types::{
        ApiResponse, BorrowBookRequest, CreateAuthorRequest, CreateBookRequest,
        CreateMemberRequest, DependencyCheck, HealthResponse, ReadinessChecks, ReadinessResponse,
        UpdateAuthorRequest, UpdateBookRequest, UpdateMemberRequest,
    },
    validation::{ApiPath, ValidatedJson},
};

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;
type Created<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
pub struct AppState {
    pub loans: ServiceDependencies,
    pub catalog: CatalogDependencies,
    /// Readinessプローブ用のデータベース疎通確認
    pub probe: Arc<dyn DatabaseProbe>,
    pub config: Arc<AppConfig>,
    pub started_at: Instant,
}

impl AppState {
    fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}

fn created<T>(data: T) -> Created<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(data))))
}

fn deleted(resource: &str) -> ApiResult<()> {
    Ok(Json(ApiResponse::message(format!(
        "{resource} deleted successfully"
    ))))
}

// ============================================================================
// Authors
// ============================================================================

/// GET /api/authors - 著者一覧（著書付き）
pub async fn list_authors(State(state): State<Arc<AppState>>) -> ApiResult<Vec<AuthorWithBooks>> {
    ok(catalog::list_authors(&state.catalog).await?)
}

pub async fn get_author(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<AuthorWithBooks> {
    ok(catalog::get_author(&state.catalog, AuthorId::new(id)).await?)
}

pub async fn create_author(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateAuthorRequest>,
) -> Created<Author> {
    created(catalog::create_author(&state.catalog, req.into_new_author()).await?)
}

pub async fn update_author(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ValidatedJson(req): ValidatedJson<UpdateAuthorRequest>,
) -> ApiResult<Author> {
    ok(catalog::update_author(&state.catalog, AuthorId::new(id), req.into()).await?)
}

/// DELETE /api/authors/:id
///
/// 著書が残っている場合は409。
pub async fn delete_author(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    catalog::delete_author(&state.catalog, AuthorId::new(id)).await?;
    deleted("Author")
}

// ============================================================================
// Books
// ============================================================================

pub async fn list_books(State(state): State<Arc<AppState>>) -> ApiResult<Vec<BookWithAuthor>> {
    ok(catalog::list_books(&state.catalog).await?)
}

/// GET /api/books/:id - 書籍詳細（著者・貸出履歴付き）
pub async fn get_book(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<BookDetail> {
    ok(catalog::get_book(&state.catalog, BookId::new(id)).await?)
}

/// POST /api/books - 書籍を登録
///
/// `quantity` 省略時は1冊。著者が存在しない場合は404。
pub async fn create_book(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateBookRequest>,
) -> Created<BookWithAuthor> {
    created(catalog::create_book(&state.catalog, req.into_new_book()).await?)
}

pub async fn update_book(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ValidatedJson(req): ValidatedJson<UpdateBookRequest>,
) -> ApiResult<BookWithAuthor> {
    ok(catalog::update_book(&state.catalog, BookId::new(id), req.into()).await?)
}

pub async fn delete_book(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    catalog::delete_book(&state.catalog, BookId::new(id)).await?;
    deleted("Book")
}

// ============================================================================
// Members
// ============================================================================

pub async fn list_members(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Member>> {
    ok(catalog::list_members(&state.catalog).await?)
}

/// GET /api/members/:id - 会員詳細（貸出履歴・書籍付き）
pub async fn get_member(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<MemberDetail> {
    ok(catalog::get_member(&state.catalog, MemberId::new(id)).await?)
}

/// POST /api/members - 会員を登録
///
/// メールアドレスが重複している場合は409。
pub async fn create_member(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateMemberRequest>,
) -> Created<Member> {
    created(catalog::create_member(&state.catalog, req.into_new_member()).await?)
}

pub async fn update_member(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ValidatedJson(req): ValidatedJson<UpdateMemberRequest>,
) -> ApiResult<Member> {
    ok(catalog::update_member(&state.catalog, MemberId::new(id), req.into()).await?)
}

pub async fn delete_member(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    catalog::delete_member(&state.catalog, MemberId::new(id)).await?;
    deleted("Member")
}

// ============================================================================
// Loans
// ============================================================================

/// GET /api/loans - 全貸出（書籍・会員付き）
pub async fn list_loans(State(state): State<Arc<AppState>>) -> ApiResult<Vec<LoanDetails>> {
    ok(loan_service::list_loans(&state.loans).await?)
}

/// POST /api/loans/borrow - 書籍を貸し出す
///
/// 強制されるビジネスルール（この順序で確認）:
/// - 書籍が存在すること（404）
/// - 貸出中の冊数が所蔵数未満であること（400）
/// - 会員が存在すること（404）
pub async fn borrow_book(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<BorrowBookRequest>,
) -> Created<LoanDetails> {
    let cmd = req.to_command();
    created(loan_service::borrow_book(&state.loans, cmd).await?)
}

/// POST /api/loans/return/:id - 書籍を返却
///
/// 強制されるビジネスルール:
/// - 貸出が存在すること（404）
/// - 既に返却済みでないこと（400）
pub async fn return_book(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<LoanDetails> {
    let cmd = ReturnBook {
        loan_id: LoanId::new(id),
    };
    ok(loan_service::return_book(&state.loans, cmd).await?)
}

/// GET /api/loans/member/:memberId - 会員の貸出（新しい順）
pub async fn list_member_loans(
    State(state): State<Arc<AppState>>,
    ApiPath(member_id): ApiPath<i64>,
) -> ApiResult<Vec<LoanWithBook>> {
    ok(loan_service::list_member_loans(&state.loans, MemberId::new(member_id)).await?)
}

// ============================================================================
// Probes
// ============================================================================

/// GET /health - Livenessプローブ（常に200）
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        uptime: state.uptime_secs(),
    })
}

/// GET /ready - Readinessプローブ
///
/// データベースに疎通できない場合は503。
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let started = Instant::now();
    let result = state.probe.ping().await;
    let response_time = started.elapsed().as_millis() as u64;

    let database = match result {
        Ok(()) => DependencyCheck {
            status: "up",
            response_time,
        },
        Err(err) => {
            tracing::error!(error = %err, "Database health check failed");
            DependencyCheck {
                status: "down",
                response_time,
            }
        }
    };

    let ready = database.status == "up";
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = ReadinessResponse {
        status: if ready { "ready" } else { "not ready" },
        timestamp: Utc::now(),
        uptime: state.uptime_secs(),
        checks: ReadinessChecks { database },
    };

    (status, Json(body))
}
