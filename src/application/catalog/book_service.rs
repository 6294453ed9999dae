use crate::domain::{AuthorId, BookChanges, BookId, NewBook};
use crate::ports::{BOOK_AUTHOR_FKEY, BookDetail, BookUpdate, BookWithAuthor, RepositoryError};

use super::{
    CatalogDependencies,
    errors::{CatalogError, Result},
};

const RESOURCE: &str = "Book";

/// 参照先の著者が存在することを確認する
async fn ensure_author_exists(deps: &CatalogDependencies, author_id: AuthorId) -> Result<()> {
    let exists = deps
        .authors
        .exists(author_id)
        .await
        .map_err(CatalogError::from_repository("Author"))?;

    if !exists {
        return Err(CatalogError::not_found("Author", author_id.value()));
    }
    Ok(())
}

/// 書き込み時のエラー変換
///
/// 著者の存在確認の後に著者が削除された場合、書き込みは外部キー違反になる。
/// これは参照先の著者が存在しないものとして扱う。
fn from_book_write(author_id: Option<AuthorId>) -> impl Fn(RepositoryError) -> CatalogError {
    move |err| match (err, author_id) {
        (RepositoryError::ForeignKeyViolation(constraint), Some(author_id))
            if constraint == BOOK_AUTHOR_FKEY =>
        {
            CatalogError::not_found("Author", author_id.value())
        }
        (err, _) => CatalogError::from_repository(RESOURCE)(err),
    }
}

pub async fn list_books(deps: &CatalogDependencies) -> Result<Vec<BookWithAuthor>> {
    deps.books
        .list()
        .await
        .map_err(CatalogError::from_repository(RESOURCE))
}

/// 書籍を著者・貸出履歴付きで取得する
pub async fn get_book(deps: &CatalogDependencies, id: BookId) -> Result<BookDetail> {
    deps.books
        .find_by_id(id)
        .await
        .map_err(CatalogError::from_repository(RESOURCE))?
        .ok_or_else(|| CatalogError::not_found(RESOURCE, id.value()))
}

/// 書籍を登録する
///
/// 著者が存在しない場合は NotFound("Author")、ISBN重複は AlreadyExists。
pub async fn create_book(deps: &CatalogDependencies, book: NewBook) -> Result<BookWithAuthor> {
    let author_id = book.author_id;
    ensure_author_exists(deps, author_id).await?;

    deps.books
        .create(book)
        .await
        .map_err(from_book_write(Some(author_id)))
}

/// 書籍を部分更新する
///
/// 所蔵数は貸出中の冊数を下回れない（400）。
pub async fn update_book(
    deps: &CatalogDependencies,
    id: BookId,
    changes: BookChanges,
) -> Result<BookWithAuthor> {
    let author_id = changes.author_id;
    if let Some(author_id) = author_id {
        ensure_author_exists(deps, author_id).await?;
    }

    match deps
        .books
        .update(id, changes)
        .await
        .map_err(from_book_write(author_id))?
    {
        BookUpdate::Updated(book) => Ok(book),
        BookUpdate::NotFound => Err(CatalogError::not_found(RESOURCE, id.value())),
        BookUpdate::Rejected(err) => Err(err.into()),
    }
}

/// 書籍を削除する
///
/// 貸出履歴が残っている書籍は削除できない（StillReferenced）。
pub async fn delete_book(deps: &CatalogDependencies, id: BookId) -> Result<()> {
    let deleted = deps
        .books
        .delete(id)
        .await
        .map_err(CatalogError::from_repository(RESOURCE))?;

    if !deleted {
        return Err(CatalogError::not_found(RESOURCE, id.value()));
    }
    Ok(())
}
