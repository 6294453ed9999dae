use crate::domain::{BookChanges, BookId, NewBook, UpdateBookError};
use async_trait::async_trait;

use super::{
    Result,
    views::{BookDetail, BookWithAuthor},
};

/// 書籍更新の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookUpdate {
    Updated(BookWithAuthor),
    NotFound,
    /// 業務ルール違反のため変更しなかった
    Rejected(UpdateBookError),
}

/// 書籍リポジトリポート
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// 全書籍を著者付きで取得する
    async fn list(&self) -> Result<Vec<BookWithAuthor>>;

    /// IDで書籍を著者・貸出履歴付きで取得する
    async fn find_by_id(&self, id: BookId) -> Result<Option<BookDetail>>;

    /// 書籍を作成する
    ///
    /// ISBNが重複している場合は `UniqueViolation` になる。
    async fn create(&self, book: NewBook) -> Result<BookWithAuthor>;

    /// 部分更新する
    ///
    /// 所蔵数を変更する場合、実装は書籍行をロックした上で貸出中の件数と比較し、
    /// 下回るなら `Rejected` を返さなければならない。
    /// ロックは貸出の作業単位の `lock_book` と同じものを使い、同時の貸出と直列化する。
    async fn update(&self, id: BookId, changes: BookChanges) -> Result<BookUpdate>;

    /// 削除する。貸出履歴が残っている場合は `ForeignKeyViolation` になる。
    async fn delete(&self, id: BookId) -> Result<bool>;
}
