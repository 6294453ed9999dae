//! 関連エンティティを結合した読み取りビュー
//!
//! APIレスポンスにそのままシリアライズされる。
//! 親エンティティのフィールドは `flatten` で同じ階層に展開する。

use serde::Serialize;

use crate::domain::{Author, Book, Member, loan::Loan};

/// 著者 + 著書一覧
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorWithBooks {
    #[serde(flatten)]
    pub author: Author,
    pub books: Vec<Book>,
}

/// 書籍 + 著者
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookWithAuthor {
    #[serde(flatten)]
    pub book: Book,
    pub author: Author,
}

/// 書籍詳細（著者と貸出履歴を含む）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookDetail {
    #[serde(flatten)]
    pub book: Book,
    pub author: Author,
    pub loans: Vec<Loan>,
}

/// 貸出 + 書籍
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoanWithBook {
    #[serde(flatten)]
    pub loan: Loan,
    pub book: Book,
}

/// 会員詳細（貸出履歴と各貸出の書籍を含む）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberDetail {
    #[serde(flatten)]
    pub member: Member,
    pub loans: Vec<LoanWithBook>,
}

/// 貸出 + 書籍 + 会員
///
/// 貸出・返却の結果と貸出一覧で返される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoanDetails {
    #[serde(flatten)]
    pub loan: Loan,
    pub book: Book,
    pub member: Member,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AuthorId, BookId, LoanId, LoanStatus, MemberId};
    use chrono::Utc;

    #[test]
    fn test_loan_details_flattens_loan_fields() {
        let now = Utc::now();
        let details = LoanDetails {
            loan: Loan {
                id: LoanId::new(5),
                book_id: BookId::new(1),
                member_id: MemberId::new(2),
                status: LoanStatus::Borrowed,
                borrow_date: now,
                due_date: now,
                return_date: None,
                created_at: now,
                updated_at: now,
            },
            book: Book {
                id: BookId::new(1),
                title: "Refactoring".to_string(),
                isbn: "978-0134757599".to_string(),
                published_year: Some(2018),
                quantity: 2,
                author_id: AuthorId::new(3),
                created_at: now,
                updated_at: now,
            },
            member: Member {
                id: MemberId::new(2),
                name: "Grace".to_string(),
                email: "grace@example.com".to_string(),
                phone: None,
                created_at: now,
                updated_at: now,
            },
        };

        let json = serde_json::to_value(&details).unwrap();

        assert_eq!(json["id"], 5);
        assert_eq!(json["status"], "BORROWED");
        assert!(json["returnDate"].is_null());
        assert_eq!(json["book"]["title"], "Refactoring");
        assert_eq!(json["member"]["email"], "grace@example.com");
    }
}
