use crate::ports::{DatabaseProbe as DatabaseProbeTrait, Result};
use async_trait::async_trait;
use sqlx::PgPool;

/// DatabaseProbeのPostgreSQL実装
pub struct DatabaseProbe {
    pool: PgPool,
}

impl DatabaseProbe {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DatabaseProbeTrait for DatabaseProbe {
    /// `SELECT 1` を実行して疎通を確認する
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
