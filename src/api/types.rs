//! APIのリクエスト・レスポンス型
//!
//! リクエストは `serde` で受け取り、`validator` のルールで検証してから
//! ドメインの入力型に変換する。必須項目も `Option` で受け取り、
//! 欠落を `required` ルールで検出することで、違反をすべて一覧で返せるようにしている。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::{
    AuthorChanges, AuthorId, BookChanges, BookId, MemberChanges, MemberId, NewAuthor, NewBook,
    NewMember, commands::BorrowBook,
};

/// 書籍登録時の所蔵数の既定値
pub const DEFAULT_QUANTITY: i32 = 1;

// ============================================================================
// Envelope
// ============================================================================

/// 全レスポンス共通のエンベロープ
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
    /// エラーの原因チェーン（本番環境以外のみ）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<Vec<String>>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            stack: None,
        }
    }
}

impl ApiResponse<()> {
    /// データを持たない成功レスポンス（削除など）
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            errors: None,
            stack: None,
        }
    }

    pub fn error(message: impl Into<String>, errors: Option<Vec<FieldError>>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            errors,
            stack: None,
        }
    }
}

/// バリデーション違反1件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

// ============================================================================
// Authors
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAuthorRequest {
    #[validate(
        required(message = "Name is required"),
        length(min = 1, message = "Name is required")
    )]
    pub name: Option<String>,
    pub bio: Option<String>,
}

impl CreateAuthorRequest {
    /// 検証済みのリクエストをドメインの入力に変換する
    pub fn into_new_author(self) -> NewAuthor {
        NewAuthor {
            name: self.name.unwrap_or_default(),
            bio: self.bio,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAuthorRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,
    pub bio: Option<String>,
}

impl From<UpdateAuthorRequest> for AuthorChanges {
    fn from(req: UpdateAuthorRequest) -> Self {
        Self {
            name: req.name,
            bio: req.bio,
        }
    }
}

// ============================================================================
// Books
// ============================================================================

fn default_quantity() -> Option<i32> {
    Some(DEFAULT_QUANTITY)
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    #[validate(
        required(message = "Title is required"),
        length(min = 1, message = "Title is required")
    )]
    pub title: Option<String>,
    #[validate(
        required(message = "ISBN is required"),
        length(min = 1, message = "ISBN is required")
    )]
    pub isbn: Option<String>,
    pub published_year: Option<i32>,
    #[serde(default = "default_quantity")]
    #[validate(
        required(message = "Quantity is required"),
        range(min = 0, message = "Quantity must be zero or greater")
    )]
    pub quantity: Option<i32>,
    #[validate(
        required(message = "Author ID is required"),
        range(min = 1, message = "Author ID is required")
    )]
    pub author_id: Option<i64>,
}

impl CreateBookRequest {
    pub fn into_new_book(self) -> NewBook {
        NewBook {
            title: self.title.unwrap_or_default(),
            isbn: self.isbn.unwrap_or_default(),
            published_year: self.published_year,
            quantity: self.quantity.unwrap_or(DEFAULT_QUANTITY),
            author_id: AuthorId::new(self.author_id.unwrap_or_default()),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "ISBN is required"))]
    pub isbn: Option<String>,
    pub published_year: Option<i32>,
    #[validate(range(min = 0, message = "Quantity must be zero or greater"))]
    pub quantity: Option<i32>,
    #[validate(range(min = 1, message = "Author ID is required"))]
    pub author_id: Option<i64>,
}

impl From<UpdateBookRequest> for BookChanges {
    fn from(req: UpdateBookRequest) -> Self {
        Self {
            title: req.title,
            isbn: req.isbn,
            published_year: req.published_year,
            quantity: req.quantity,
            author_id: req.author_id.map(AuthorId::new),
        }
    }
}

// ============================================================================
// Members
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemberRequest {
    #[validate(
        required(message = "Name is required"),
        length(min = 1, message = "Name is required")
    )]
    pub name: Option<String>,
    #[validate(
        required(message = "Valid email is required"),
        email(message = "Valid email is required")
    )]
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl CreateMemberRequest {
    pub fn into_new_member(self) -> NewMember {
        NewMember {
            name: self.name.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            phone: self.phone,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,
    #[validate(email(message = "Valid email is required"))]
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl From<UpdateMemberRequest> for MemberChanges {
    fn from(req: UpdateMemberRequest) -> Self {
        Self {
            name: req.name,
            email: req.email,
            phone: req.phone,
        }
    }
}

// ============================================================================
// Loans
// ============================================================================

/// 貸出リクエスト
///
/// `dueDate` はRFC 3339形式。省略時は14日後。
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BorrowBookRequest {
    #[validate(
        required(message = "Book ID is required"),
        range(min = 1, message = "Book ID is required")
    )]
    pub book_id: Option<i64>,
    #[validate(
        required(message = "Member ID is required"),
        range(min = 1, message = "Member ID is required")
    )]
    pub member_id: Option<i64>,
    pub due_date: Option<DateTime<Utc>>,
}

impl BorrowBookRequest {
    /// 検証済みのリクエストをコマンドに変換する
    pub fn to_command(&self) -> BorrowBook {
        BorrowBook {
            book_id: BookId::new(self.book_id.unwrap_or_default()),
            member_id: MemberId::new(self.member_id.unwrap_or_default()),
            due_date: self.due_date,
        }
    }
}

// ============================================================================
// Probes
// ============================================================================

/// GET /health のレスポンス
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    /// 起動からの秒数
    pub uptime: u64,
}

/// GET /ready のレスポンス
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub uptime: u64,
    pub checks: ReadinessChecks,
}

#[derive(Debug, Serialize)]
pub struct ReadinessChecks {
    pub database: DependencyCheck,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyCheck {
    /// "up" または "down"
    pub status: &'static str,
    /// 応答時間（ミリ秒）
    pub response_time: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_book_defaults_quantity_to_one() {
        let req: CreateBookRequest = serde_json::from_value(serde_json::json!({
            "title": "Dune",
            "isbn": "978-0441013593",
            "authorId": 1
        }))
        .unwrap();

        assert!(req.validate().is_ok());
        let book = req.into_new_book();
        assert_eq!(book.quantity, 1);
        assert_eq!(book.published_year, None);
    }

    #[test]
    fn test_create_book_reports_every_missing_field() {
        let req: CreateBookRequest =
            serde_json::from_value(serde_json::json!({ "quantity": -1 })).unwrap();

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();

        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("isbn"));
        assert!(fields.contains_key("quantity"));
        assert!(fields.contains_key("author_id"));
    }

    #[test]
    fn test_member_email_must_be_valid() {
        let req: CreateMemberRequest = serde_json::from_value(serde_json::json!({
            "name": "Ada",
            "email": "not-an-email"
        }))
        .unwrap();

        assert!(req.validate().is_err());
    }

    #[test]
    fn test_update_requests_accept_empty_patch() {
        let req: UpdateBookRequest = serde_json::from_value(serde_json::json!({})).unwrap();

        assert!(req.validate().is_ok());
        assert_eq!(BookChanges::from(req), BookChanges::default());
    }

    #[test]
    fn test_borrow_request_parses_rfc3339_due_date() {
        let req: BorrowBookRequest = serde_json::from_value(serde_json::json!({
            "bookId": 1,
            "memberId": 2,
            "dueDate": "2030-01-15T10:00:00Z"
        }))
        .unwrap();

        assert!(req.validate().is_ok());
        let cmd = req.to_command();
        assert_eq!(cmd.book_id, BookId::new(1));
        assert_eq!(cmd.member_id, MemberId::new(2));
        assert!(cmd.due_date.is_some());
    }

    #[test]
    fn test_message_envelope_omits_data() {
        let json = serde_json::to_value(ApiResponse::message("Book deleted successfully")).unwrap();

        assert_eq!(
            json,
            serde_json::json!({ "success": true, "message": "Book deleted successfully" })
        );
    }
}
