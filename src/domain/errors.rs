use thiserror::Error;

/// 貸出のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BorrowBookError {
    /// 貸出可能な在庫がない
    #[error("No copies available for borrowing")]
    NoCopiesAvailable,
}

/// 返却のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReturnBookError {
    /// 既に返却済み
    #[error("Book already returned")]
    AlreadyReturned,
}

/// 書籍更新のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateBookError {
    /// 所蔵数が貸出中の冊数を下回る
    #[error("Quantity cannot be lower than the number of borrowed copies")]
    QuantityBelowBorrowed { borrowed: i64 },
}
