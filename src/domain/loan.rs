use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::{
    Book, BookId, BorrowBookError, LoanId, LoanStatus, MemberId, ReturnBookError, UpdateBookError,
};

/// 貸出期間（日数）
pub const LOAN_PERIOD_DAYS: i64 = 14;

/// Loan - 1冊の書籍の1回の貸出
///
/// 不変条件：
/// - status が BORROWED の間は return_date が None
/// - status が RETURNED になったら return_date が Some
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: LoanId,
    pub book_id: BookId,
    pub member_id: MemberId,
    pub status: LoanStatus,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 永続化前の新規貸出
///
/// IDはストアが採番するため持たない。状態は常に BORROWED。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoan {
    pub book_id: BookId,
    pub member_id: MemberId,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

impl NewLoan {
    pub fn status(&self) -> LoanStatus {
        LoanStatus::Borrowed
    }
}

/// 貸出可能な冊数（所蔵数 - 貸出中の件数）
pub fn available_copies(book: &Book, borrowed: i64) -> i64 {
    i64::from(book.quantity) - borrowed
}

/// 純粋関数：貸出可能かを判定する
///
/// ビジネスルール：貸出中の件数が所蔵数に達していたら貸し出せない。
pub fn ensure_copy_available(book: &Book, borrowed: i64) -> Result<(), BorrowBookError> {
    if available_copies(book, borrowed) <= 0 {
        return Err(BorrowBookError::NoCopiesAvailable);
    }
    Ok(())
}

/// 純粋関数：所蔵数を変更できるかを判定する
///
/// ビジネスルール：貸出中の冊数を下回る所蔵数には変更できない。
pub fn ensure_quantity_covers_borrowed(
    quantity: i32,
    borrowed: i64,
) -> Result<(), UpdateBookError> {
    if i64::from(quantity) < borrowed {
        return Err(UpdateBookError::QuantityBelowBorrowed { borrowed });
    }
    Ok(())
}

/// 純粋関数：新しい貸出を作る
///
/// ビジネスルール：
/// - 状態は BORROWED
/// - 貸出日は `borrowed_at`
/// - 返却期限の指定がなければ貸出日 + 14日
pub fn open_loan(
    book_id: BookId,
    member_id: MemberId,
    due_date: Option<DateTime<Utc>>,
    borrowed_at: DateTime<Utc>,
) -> NewLoan {
    NewLoan {
        book_id,
        member_id,
        borrow_date: borrowed_at,
        due_date: due_date.unwrap_or_else(|| borrowed_at + Duration::days(LOAN_PERIOD_DAYS)),
    }
}

/// 純粋関数：書籍を返却する
///
/// ビジネスルール：
/// - 返却済みの貸出は再度返却できない
/// - 返却時に return_date を設定する
///
/// 副作用なし。更新後のLoanを返す。
pub fn return_loan(loan: Loan, returned_at: DateTime<Utc>) -> Result<Loan, ReturnBookError> {
    if loan.status.is_returned() {
        return Err(ReturnBookError::AlreadyReturned);
    }

    Ok(Loan {
        status: LoanStatus::Returned,
        return_date: Some(returned_at),
        updated_at: returned_at,
        ..loan
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AuthorId;

    fn book_with_quantity(quantity: i32) -> Book {
        let now = Utc::now();
        Book {
            id: BookId::new(1),
            title: "The Pragmatic Programmer".to_string(),
            isbn: "978-0135957059".to_string(),
            published_year: Some(1999),
            quantity,
            author_id: AuthorId::new(1),
            created_at: now,
            updated_at: now,
        }
    }

    fn borrowed_loan(borrowed_at: DateTime<Utc>) -> Loan {
        let new_loan = open_loan(BookId::new(1), MemberId::new(1), None, borrowed_at);
        Loan {
            id: LoanId::new(1),
            book_id: new_loan.book_id,
            member_id: new_loan.member_id,
            status: new_loan.status(),
            borrow_date: new_loan.borrow_date,
            due_date: new_loan.due_date,
            return_date: None,
            created_at: borrowed_at,
            updated_at: borrowed_at,
        }
    }

    #[test]
    fn test_open_loan_defaults_due_date_to_14_days() {
        let now = Utc::now();
        let loan = open_loan(BookId::new(1), MemberId::new(2), None, now);

        assert_eq!(loan.borrow_date, now);
        assert_eq!(loan.due_date, now + Duration::days(14));
        assert_eq!(loan.status(), LoanStatus::Borrowed);
    }

    #[test]
    fn test_open_loan_uses_supplied_due_date() {
        let now = Utc::now();
        let due = now + Duration::days(3);
        let loan = open_loan(BookId::new(1), MemberId::new(2), Some(due), now);

        assert_eq!(loan.due_date, due);
    }

    #[test]
    fn test_copy_available_while_below_quantity() {
        let book = book_with_quantity(2);
        assert_eq!(ensure_copy_available(&book, 0), Ok(()));
        assert_eq!(ensure_copy_available(&book, 1), Ok(()));
        assert_eq!(available_copies(&book, 1), 1);
    }

    #[test]
    fn test_no_copy_available_at_quantity() {
        let book = book_with_quantity(2);
        assert_eq!(
            ensure_copy_available(&book, 2),
            Err(BorrowBookError::NoCopiesAvailable)
        );
    }

    #[test]
    fn test_zero_quantity_book_is_never_available() {
        let book = book_with_quantity(0);
        assert_eq!(
            ensure_copy_available(&book, 0),
            Err(BorrowBookError::NoCopiesAvailable)
        );
    }

    #[test]
    fn test_quantity_may_drop_to_borrowed_count() {
        assert_eq!(ensure_quantity_covers_borrowed(2, 2), Ok(()));
        assert_eq!(ensure_quantity_covers_borrowed(5, 0), Ok(()));
    }

    #[test]
    fn test_quantity_below_borrowed_count_is_rejected() {
        assert_eq!(
            ensure_quantity_covers_borrowed(0, 2),
            Err(UpdateBookError::QuantityBelowBorrowed { borrowed: 2 })
        );
    }

    #[test]
    fn test_return_loan_sets_status_and_return_date() {
        let borrowed_at = Utc::now();
        let returned_at = borrowed_at + Duration::days(2);

        let returned = return_loan(borrowed_loan(borrowed_at), returned_at).unwrap();

        assert_eq!(returned.status, LoanStatus::Returned);
        assert_eq!(returned.return_date, Some(returned_at));
        assert_eq!(returned.updated_at, returned_at);
        assert_eq!(returned.borrow_date, borrowed_at);
    }

    #[test]
    fn test_return_loan_twice_fails() {
        let borrowed_at = Utc::now();
        let returned = return_loan(borrowed_loan(borrowed_at), borrowed_at).unwrap();

        let result = return_loan(returned.clone(), borrowed_at + Duration::days(1));

        assert_eq!(result, Err(ReturnBookError::AlreadyReturned));
    }
}
