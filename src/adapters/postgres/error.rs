use crate::ports::RepositoryError;

/// sqlxのエラーをリポジトリエラーに変換する
///
/// 一意制約・外部キー制約の違反は制約名付きで区別し、
/// それ以外はすべてバックエンド障害として扱う。
impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            if db_err.is_unique_violation() {
                return RepositoryError::UniqueViolation(constraint);
            }
            if db_err.is_foreign_key_violation() {
                return RepositoryError::ForeignKeyViolation(constraint);
            }
        }
        RepositoryError::backend(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_is_backend_error() {
        let err = RepositoryError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, RepositoryError::Backend(_)));
    }

    #[test]
    fn test_pool_closed_is_backend_error() {
        let err = RepositoryError::from(sqlx::Error::PoolClosed);
        assert!(matches!(err, RepositoryError::Backend(_)));
    }
}
