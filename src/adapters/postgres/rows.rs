//! PostgreSQLの行データとドメイン型の相互変換
//!
//! 結合クエリでは同名カラムが衝突するため、
//! 各テーブルのカラムを `<prefix><column>` の別名で取得する。

use crate::domain::{
    Author, AuthorId, Book, BookId, LoanId, LoanStatus, Member, MemberId, loan::Loan,
};
use crate::ports::{RepositoryError, Result};
use sqlx::{Row, postgres::PgRow};
use std::str::FromStr;

const AUTHOR_FIELDS: &[&str] = &["id", "name", "bio", "created_at", "updated_at"];
const BOOK_FIELDS: &[&str] = &[
    "id",
    "title",
    "isbn",
    "published_year",
    "quantity",
    "author_id",
    "created_at",
    "updated_at",
];
const MEMBER_FIELDS: &[&str] = &["id", "name", "email", "phone", "created_at", "updated_at"];
const LOAN_FIELDS: &[&str] = &[
    "id",
    "book_id",
    "member_id",
    "status",
    "borrow_date",
    "due_date",
    "return_date",
    "created_at",
    "updated_at",
];

fn select_list(alias: &str, prefix: &str, fields: &[&str]) -> String {
    fields
        .iter()
        .map(|f| format!("{alias}.{f} AS {prefix}{f}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `a.id AS author_id, ...` 形式のSELECTリスト
pub(super) fn author_columns(alias: &str) -> String {
    select_list(alias, "author_", AUTHOR_FIELDS)
}

pub(super) fn book_columns(alias: &str) -> String {
    select_list(alias, "book_", BOOK_FIELDS)
}

pub(super) fn member_columns(alias: &str) -> String {
    select_list(alias, "member_", MEMBER_FIELDS)
}

pub(super) fn loan_columns(alias: &str) -> String {
    select_list(alias, "loan_", LOAN_FIELDS)
}

pub(super) fn map_row_to_author(row: &PgRow) -> Result<Author> {
    Ok(Author {
        id: AuthorId::new(row.try_get("author_id")?),
        name: row.try_get("author_name")?,
        bio: row.try_get("author_bio")?,
        created_at: row.try_get("author_created_at")?,
        updated_at: row.try_get("author_updated_at")?,
    })
}

pub(super) fn map_row_to_book(row: &PgRow) -> Result<Book> {
    Ok(Book {
        id: BookId::new(row.try_get("book_id")?),
        title: row.try_get("book_title")?,
        isbn: row.try_get("book_isbn")?,
        published_year: row.try_get("book_published_year")?,
        quantity: row.try_get("book_quantity")?,
        author_id: AuthorId::new(row.try_get("book_author_id")?),
        created_at: row.try_get("book_created_at")?,
        updated_at: row.try_get("book_updated_at")?,
    })
}

pub(super) fn map_row_to_member(row: &PgRow) -> Result<Member> {
    Ok(Member {
        id: MemberId::new(row.try_get("member_id")?),
        name: row.try_get("member_name")?,
        email: row.try_get("member_email")?,
        phone: row.try_get("member_phone")?,
        created_at: row.try_get("member_created_at")?,
        updated_at: row.try_get("member_updated_at")?,
    })
}

/// statusカラムの文字列から LoanStatus への変換でエラーハンドリングを行う
pub(super) fn map_row_to_loan(row: &PgRow) -> Result<Loan> {
    let status_str: &str = row.try_get("loan_status")?;
    let status = LoanStatus::from_str(status_str).map_err(|e| {
        RepositoryError::backend(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })?;

    Ok(Loan {
        id: LoanId::new(row.try_get("loan_id")?),
        book_id: BookId::new(row.try_get("loan_book_id")?),
        member_id: MemberId::new(row.try_get("loan_member_id")?),
        status,
        borrow_date: row.try_get("loan_borrow_date")?,
        due_date: row.try_get("loan_due_date")?,
        return_date: row.try_get("loan_return_date")?,
        created_at: row.try_get("loan_created_at")?,
        updated_at: row.try_get("loan_updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_list_aliases_every_field() {
        assert_eq!(
            author_columns("a"),
            "a.id AS author_id, a.name AS author_name, a.bio AS author_bio, \
             a.created_at AS author_created_at, a.updated_at AS author_updated_at"
        );
    }

    #[test]
    fn test_loan_columns_use_loan_prefix() {
        let columns = loan_columns("l");
        assert!(columns.starts_with("l.id AS loan_id"));
        assert!(columns.contains("l.book_id AS loan_book_id"));
        assert!(columns.contains("l.return_date AS loan_return_date"));
    }
}
