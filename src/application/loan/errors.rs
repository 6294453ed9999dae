use crate::domain::{BookId, BorrowBookError, LoanId, MemberId, ReturnBookError};
use crate::ports::RepositoryError;
use thiserror::Error;

/// 貸出管理アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum LoanApplicationError {
    /// 書籍が存在しない
    #[error("Book not found")]
    BookNotFound(BookId),

    /// 会員が存在しない
    #[error("Member not found")]
    MemberNotFound(MemberId),

    /// 貸出が見つからない
    #[error("Loan not found")]
    LoanNotFound(LoanId),

    /// 貸出の業務ルール違反（在庫なし）
    #[error(transparent)]
    Borrow(#[from] BorrowBookError),

    /// 返却の業務ルール違反（返却済み）
    #[error(transparent)]
    Return(#[from] ReturnBookError),

    /// リポジトリのエラー
    #[error("Loan repository error")]
    Repository(#[from] RepositoryError),
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, LoanApplicationError>;
