use async_trait::async_trait;

use super::Result;

/// データベース疎通確認ポート
///
/// Readinessプローブから呼ばれる。
#[async_trait]
pub trait DatabaseProbe: Send + Sync {
    /// 軽量なクエリを1回実行し、応答があれば `Ok(())` を返す
    async fn ping(&self) -> Result<()>;
}
