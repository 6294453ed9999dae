//! インメモリ実装
//!
//! PostgreSQLなしでサービス全体を動かすためのアダプター。
//! 統合テストとE2Eテストで使用する。
//!
//! すべてのテーブルを1つの `tokio::sync::Mutex` で保護する。
//! 貸出の作業単位はロックを保持したまま作業用コピーを編集し、
//! `commit` 時にのみ書き戻すため、作業単位同士は完全に直列化される。

mod catalog;
mod loans;

use crate::domain::{Author, Book, Member, loan::Loan};
use crate::ports::{DatabaseProbe, RepositoryError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

pub use loans::MemoryLoanUnitOfWork;

/// インメモリのテーブル群
#[derive(Debug, Clone, Default)]
pub(crate) struct Tables {
    pub authors: BTreeMap<i64, Author>,
    pub books: BTreeMap<i64, Book>,
    pub members: BTreeMap<i64, Member>,
    pub loans: BTreeMap<i64, Loan>,
    last_id: i64,
}

impl Tables {
    /// BIGSERIAL 相当の採番（全テーブル共通の連番）
    pub fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

/// 全リポジトリポートを実装するインメモリストア
///
/// `Clone` は同じテーブルを共有する。
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    unreachable: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// テスト用にデータベース障害を模擬する
    ///
    /// `true` の間は疎通確認が失敗する。
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// 書籍の貸出中件数を数える（テストでの不変条件確認用）
    pub async fn borrowed_count(&self, book_id: crate::domain::BookId) -> i64 {
        let tables = self.tables.lock().await;
        loans::count_borrowed(&tables, book_id)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("in-memory database is unreachable")]
struct Unreachable;

#[async_trait]
impl DatabaseProbe for MemoryStore {
    async fn ping(&self) -> Result<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(RepositoryError::backend(Unreachable));
        }
        Ok(())
    }
}
