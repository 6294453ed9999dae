use crate::domain::UpdateBookError;
use crate::ports::RepositoryError;
use thiserror::Error;

/// カタログ管理アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum CatalogError {
    /// 対象のリソースが存在しない
    #[error("{resource} not found")]
    NotFound { resource: &'static str, id: i64 },

    /// 一意制約に違反した（例: 同じメールアドレスの会員が既にいる）
    #[error("{resource} already exists")]
    AlreadyExists { resource: &'static str },

    /// 他のリソースから参照されているため削除・変更できない
    #[error("{resource} is still referenced by other records")]
    StillReferenced { resource: &'static str },

    /// 書籍更新の業務ルール違反（所蔵数が貸出中の冊数を下回る）
    #[error(transparent)]
    Book(#[from] UpdateBookError),

    /// リポジトリのエラー
    #[error("Catalog repository error")]
    Repository(#[source] RepositoryError),
}

impl CatalogError {
    pub(super) fn not_found(resource: &'static str, id: i64) -> Self {
        CatalogError::NotFound { resource, id }
    }

    /// リポジトリエラーを、操作対象のリソース名付きのエラーに変換する
    pub(super) fn from_repository(resource: &'static str) -> impl Fn(RepositoryError) -> Self {
        move |err| match err {
            RepositoryError::UniqueViolation(_) => CatalogError::AlreadyExists { resource },
            RepositoryError::ForeignKeyViolation(_) => CatalogError::StillReferenced { resource },
            other => CatalogError::Repository(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
