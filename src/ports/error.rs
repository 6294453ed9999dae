use thiserror::Error;

/// 書籍から著者への外部キー制約名
pub const BOOK_AUTHOR_FKEY: &str = "books_author_id_fkey";

/// 永続化ポートのエラー
///
/// 制約違反はアプリケーション層で409にマッピングできるよう、
/// バックエンド障害と区別して返す。
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// 一意制約違反（例: 会員メールアドレスやISBNの重複）
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// 外部キー制約違反（例: 貸出が残っている書籍の削除）
    #[error("Foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    /// ストア側の障害（接続断、不正な行データなど）
    #[error("Repository backend error")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl RepositoryError {
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        RepositoryError::Backend(Box::new(err))
    }
}

/// 永続化ポートの Result型
pub type Result<T> = std::result::Result<T, RepositoryError>;
