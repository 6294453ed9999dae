use crate::domain::{Author, AuthorChanges, AuthorId, NewAuthor};
use crate::ports::AuthorWithBooks;

use super::{
    CatalogDependencies,
    errors::{CatalogError, Result},
};

const RESOURCE: &str = "Author";

pub async fn list_authors(deps: &CatalogDependencies) -> Result<Vec<AuthorWithBooks>> {
    deps.authors
        .list()
        .await
        .map_err(CatalogError::from_repository(RESOURCE))
}

pub async fn get_author(deps: &CatalogDependencies, id: AuthorId) -> Result<AuthorWithBooks> {
    deps.authors
        .find_by_id(id)
        .await
        .map_err(CatalogError::from_repository(RESOURCE))?
        .ok_or_else(|| CatalogError::not_found(RESOURCE, id.value()))
}

pub async fn create_author(deps: &CatalogDependencies, author: NewAuthor) -> Result<Author> {
    deps.authors
        .create(author)
        .await
        .map_err(CatalogError::from_repository(RESOURCE))
}

pub async fn update_author(
    deps: &CatalogDependencies,
    id: AuthorId,
    changes: AuthorChanges,
) -> Result<Author> {
    deps.authors
        .update(id, changes)
        .await
        .map_err(CatalogError::from_repository(RESOURCE))?
        .ok_or_else(|| CatalogError::not_found(RESOURCE, id.value()))
}

/// 著者を削除する
///
/// 著書が残っている著者は削除できない（StillReferenced）。
pub async fn delete_author(deps: &CatalogDependencies, id: AuthorId) -> Result<()> {
    let deleted = deps
        .authors
        .delete(id)
        .await
        .map_err(CatalogError::from_repository(RESOURCE))?;

    if !deleted {
        return Err(CatalogError::not_found(RESOURCE, id.value()));
    }
    Ok(())
}
