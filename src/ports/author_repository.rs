use crate::domain::{Author, AuthorChanges, AuthorId, NewAuthor};
use async_trait::async_trait;

use super::{Result, views::AuthorWithBooks};

/// 著者リポジトリポート
#[async_trait]
pub trait AuthorRepository: Send + Sync {
    /// 全著者を著書付きで取得する
    async fn list(&self) -> Result<Vec<AuthorWithBooks>>;

    /// IDで著者を著書付きで取得する
    async fn find_by_id(&self, id: AuthorId) -> Result<Option<AuthorWithBooks>>;

    /// 著者が存在するか確認する
    ///
    /// 書籍の作成・更新時の著者参照チェックに使用される。
    async fn exists(&self, id: AuthorId) -> Result<bool>;

    async fn create(&self, author: NewAuthor) -> Result<Author>;

    /// 部分更新する。存在しない場合は `None`。
    async fn update(&self, id: AuthorId, changes: AuthorChanges) -> Result<Option<Author>>;

    /// 削除する。存在しない場合は `false`。
    ///
    /// 著書が残っている場合は `ForeignKeyViolation` になる。
    async fn delete(&self, id: AuthorId) -> Result<bool>;
}
