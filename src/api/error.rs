use crate::application::{catalog::CatalogError, loan::LoanApplicationError};
use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use validator::ValidationErrors;

use super::types::{ApiResponse, FieldError};

const INTERNAL_SERVER_ERROR: &str = "Internal Server Error";

/// API層のエラー型
///
/// アプリケーション層のエラーとリクエストの拒否理由をまとめ、
/// HTTPレスポンスへのマッピングを一箇所で行う。
#[derive(Debug, Error)]
pub enum ApiError {
    /// リクエストボディの検証失敗
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    /// JSONの構文・型エラー、パスパラメータの型エラー
    #[error("{0}")]
    BadRequest(String),

    #[error("Route {method} {path} not found")]
    RouteNotFound { method: String, path: String },

    #[error(transparent)]
    Loan(#[from] LoanApplicationError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::RouteNotFound { .. } => StatusCode::NOT_FOUND,

            ApiError::Loan(err) => match err {
                LoanApplicationError::BookNotFound(_)
                | LoanApplicationError::MemberNotFound(_)
                | LoanApplicationError::LoanNotFound(_) => StatusCode::NOT_FOUND,
                // 業務ルール違反（在庫なし・返却済み）
                LoanApplicationError::Borrow(_) | LoanApplicationError::Return(_) => {
                    StatusCode::BAD_REQUEST
                }
                LoanApplicationError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },

            ApiError::Catalog(err) => match err {
                CatalogError::NotFound { .. } => StatusCode::NOT_FOUND,
                CatalogError::Book(_) => StatusCode::BAD_REQUEST,
                CatalogError::AlreadyExists { .. } | CatalogError::StillReferenced { .. } => {
                    StatusCode::CONFLICT
                }
                CatalogError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// クライアントに返すメッセージ
    ///
    /// 500系は内部の詳細を含めない。
    fn public_message(&self) -> String {
        if self.status().is_server_error() {
            INTERNAL_SERVER_ERROR.to_string()
        } else {
            self.to_string()
        }
    }

    /// エラー自身とその原因（`source`）を順に並べたもの
    pub fn chain(&self) -> Vec<String> {
        let mut chain = vec![self.to_string()];
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            chain.push(err.to_string());
            source = err.source();
        }
        chain
    }
}

/// エラーレスポンスに添付される報告内容
///
/// ログ出力と `stack` の付与はミドルウェア（`report_errors`）が行う。
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub body: ApiResponse<()>,
    pub chain: Vec<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let errors = match &self {
            ApiError::Validation(errors) => Some(errors.clone()),
            _ => None,
        };
        let body = ApiResponse::error(self.public_message(), errors);
        let report = ErrorReport {
            body: body.clone(),
            chain: self.chain(),
        };

        let mut response = (status, Json(body)).into_response();
        response.extensions_mut().insert(report);
        response
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = to_camel_case(&field);
                errs.iter().map(move |err| FieldError {
                    field: field.clone(),
                    message: err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string()),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::Validation(fields)
    }
}

/// `published_year` → `publishedYear`
fn to_camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BookId, BorrowBookError, LoanId, ReturnBookError, UpdateBookError};
    use crate::ports::RepositoryError;

    #[test]
    fn test_to_camel_case() {
        assert_eq!(to_camel_case("published_year"), "publishedYear");
        assert_eq!(to_camel_case("author_id"), "authorId");
        assert_eq!(to_camel_case("name"), "name");
    }

    #[test]
    fn test_business_rule_violations_are_bad_requests() {
        let no_copies = ApiError::from(LoanApplicationError::from(BorrowBookError::NoCopiesAvailable));
        let returned = ApiError::from(LoanApplicationError::from(ReturnBookError::AlreadyReturned));

        assert_eq!(no_copies.status(), StatusCode::BAD_REQUEST);
        assert_eq!(no_copies.public_message(), "No copies available for borrowing");
        assert_eq!(returned.status(), StatusCode::BAD_REQUEST);
        assert_eq!(returned.public_message(), "Book already returned");
    }

    #[test]
    fn test_not_found_messages_name_the_resource() {
        let book = ApiError::from(LoanApplicationError::BookNotFound(BookId::new(9)));
        let loan = ApiError::from(LoanApplicationError::LoanNotFound(LoanId::new(9)));

        assert_eq!(book.status(), StatusCode::NOT_FOUND);
        assert_eq!(book.public_message(), "Book not found");
        assert_eq!(loan.public_message(), "Loan not found");
    }

    #[test]
    fn test_internal_errors_hide_details_but_keep_chain() {
        let err = ApiError::from(LoanApplicationError::Repository(RepositoryError::backend(
            std::io::Error::other("connection reset"),
        )));

        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal Server Error");
        assert_eq!(
            err.chain(),
            vec![
                "Loan repository error",
                "Repository backend error",
                "connection reset"
            ]
        );
    }

    #[test]
    fn test_conflicts_map_to_409() {
        let err = ApiError::from(CatalogError::AlreadyExists { resource: "Member" });

        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.public_message(), "Member already exists");
    }

    #[test]
    fn test_quantity_below_borrowed_is_bad_request() {
        let err = ApiError::from(CatalogError::from(UpdateBookError::QuantityBelowBorrowed {
            borrowed: 2,
        }));

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.public_message(),
            "Quantity cannot be lower than the number of borrowed copies"
        );
    }

    #[test]
    fn test_response_carries_error_report() {
        let response = ApiError::RouteNotFound {
            method: "GET".to_string(),
            path: "/nope".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let report = response.extensions().get::<ErrorReport>().unwrap();
        assert_eq!(report.body.message.as_deref(), Some("Route GET /nope not found"));
    }
}
