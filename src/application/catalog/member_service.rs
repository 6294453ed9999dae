use crate::domain::{Member, MemberChanges, MemberId, NewMember};
use crate::ports::MemberDetail;

use super::{
    CatalogDependencies,
    errors::{CatalogError, Result},
};

const RESOURCE: &str = "Member";

pub async fn list_members(deps: &CatalogDependencies) -> Result<Vec<Member>> {
    deps.members
        .list()
        .await
        .map_err(CatalogError::from_repository(RESOURCE))
}

pub async fn get_member(deps: &CatalogDependencies, id: MemberId) -> Result<MemberDetail> {
    deps.members
        .find_by_id(id)
        .await
        .map_err(CatalogError::from_repository(RESOURCE))?
        .ok_or_else(|| CatalogError::not_found(RESOURCE, id.value()))
}

/// 会員を登録する
///
/// メールアドレスが重複している場合は AlreadyExists（409）。
pub async fn create_member(deps: &CatalogDependencies, member: NewMember) -> Result<Member> {
    deps.members
        .create(member)
        .await
        .map_err(CatalogError::from_repository(RESOURCE))
}

pub async fn update_member(
    deps: &CatalogDependencies,
    id: MemberId,
    changes: MemberChanges,
) -> Result<Member> {
    deps.members
        .update(id, changes)
        .await
        .map_err(CatalogError::from_repository(RESOURCE))?
        .ok_or_else(|| CatalogError::not_found(RESOURCE, id.value()))
}

pub async fn delete_member(deps: &CatalogDependencies, id: MemberId) -> Result<()> {
    let deleted = deps
        .members
        .delete(id)
        .await
        .map_err(CatalogError::from_repository(RESOURCE))?;

    if !deleted {
        return Err(CatalogError::not_found(RESOURCE, id.value()));
    }
    Ok(())
}
