use crate::domain::{Member, MemberChanges, MemberId, NewMember};
use async_trait::async_trait;

use super::{Result, views::MemberDetail};

/// 会員リポジトリポート
#[async_trait]
pub trait MemberRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Member>>;

    /// IDで会員を貸出履歴付きで取得する
    async fn find_by_id(&self, id: MemberId) -> Result<Option<MemberDetail>>;

    /// 会員を作成する
    ///
    /// メールアドレスが重複している場合は `UniqueViolation` になる。
    async fn create(&self, member: NewMember) -> Result<Member>;

    async fn update(&self, id: MemberId, changes: MemberChanges) -> Result<Option<Member>>;

    async fn delete(&self, id: MemberId) -> Result<bool>;
}
