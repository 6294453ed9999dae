use crate::domain::{Book, BookId, LoanId, Member, MemberId, loan::Loan, loan::NewLoan};
use async_trait::async_trait;

use super::{
    Result,
    views::{LoanDetails, LoanWithBook},
};

/// 貸出リポジトリポート
///
/// 貸出・返却は「在庫確認 → 書き込み」を1つの原子的な単位として扱う必要がある。
/// そのため書き込み系は [`LoanUnitOfWork`] 経由でのみ行い、
/// 読み取り系はこのトレイトに直接定義する。
#[async_trait]
pub trait LoanRepository: Send + Sync {
    /// 新しい作業単位（トランザクション）を開始する
    ///
    /// コミットせずにドロップした場合はすべての変更が破棄される。
    async fn begin(&self) -> Result<Box<dyn LoanUnitOfWork>>;

    /// 全貸出を書籍・会員付きで取得する
    async fn list_all(&self) -> Result<Vec<LoanDetails>>;

    /// 会員の全貸出を書籍付きで取得する
    ///
    /// borrow_date の降順（新しい順）で返す。
    async fn list_by_member(&self, member_id: MemberId) -> Result<Vec<LoanWithBook>>;
}

/// 貸出の作業単位
///
/// 実装は開始から `commit` までの間、以下を保証しなければならない：
/// - `lock_book` でロックした書籍について、他の作業単位が貸出件数を
///   同時に確認・追加できないこと（行ロックまたは直列化）
/// - `lock_loan` でロックした貸出について、他の作業単位が同時に
///   状態を変更できないこと
#[async_trait]
pub trait LoanUnitOfWork: Send {
    /// 書籍を排他ロック付きで取得する
    async fn lock_book(&mut self, book_id: BookId) -> Result<Option<Book>>;

    /// 書籍の貸出中（BORROWED）件数を数える
    async fn count_borrowed(&mut self, book_id: BookId) -> Result<i64>;

    async fn find_member(&mut self, member_id: MemberId) -> Result<Option<Member>>;

    /// 新規貸出を挿入し、採番されたIDを返す
    async fn insert_loan(&mut self, loan: NewLoan) -> Result<LoanId>;

    /// 貸出を排他ロック付きで取得する
    async fn lock_loan(&mut self, loan_id: LoanId) -> Result<Option<Loan>>;

    /// 返却を反映する
    ///
    /// 現在の状態が BORROWED の場合のみ更新する（compare-and-swap）。
    /// 更新できた場合は `true`、既に返却済みだった場合は `false` を返す。
    async fn mark_returned(&mut self, loan: &Loan) -> Result<bool>;

    /// 貸出を書籍・会員付きで取得する
    async fn load_details(&mut self, loan_id: LoanId) -> Result<Option<LoanDetails>>;

    async fn commit(self: Box<Self>) -> Result<()>;
}
