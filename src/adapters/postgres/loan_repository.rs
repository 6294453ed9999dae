use crate::domain::{Book, BookId, LoanId, Member, MemberId, loan::Loan, loan::NewLoan};
use crate::ports::{
    LoanDetails, LoanRepository as LoanRepositoryTrait, LoanUnitOfWork, LoanWithBook, Result,
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction, postgres::PgRow};

use super::rows::{
    book_columns, loan_columns, map_row_to_book, map_row_to_loan, map_row_to_member,
    member_columns,
};

fn map_row_to_loan_details(row: &PgRow) -> Result<LoanDetails> {
    Ok(LoanDetails {
        loan: map_row_to_loan(row)?,
        book: map_row_to_book(row)?,
        member: map_row_to_member(row)?,
    })
}

fn select_loan_details() -> String {
    format!(
        r#"
        SELECT {}, {}, {}
        FROM loans l
        JOIN books b ON b.id = l.book_id
        JOIN members m ON m.id = l.member_id
        "#,
        loan_columns("l"),
        book_columns("b"),
        member_columns("m")
    )
}

/// LoanRepositoryのPostgreSQL実装
pub struct LoanRepository {
    pool: PgPool,
}

impl LoanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoanRepositoryTrait for LoanRepository {
    /// トランザクションを開始する
    ///
    /// 分離レベルは READ COMMITTED のまま、書籍・貸出の行ロック
    /// （`SELECT ... FOR UPDATE`）で在庫確認と書き込みを直列化する。
    async fn begin(&self) -> Result<Box<dyn LoanUnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgLoanUnitOfWork { tx }))
    }

    async fn list_all(&self) -> Result<Vec<LoanDetails>> {
        let rows = sqlx::query(&format!("{} ORDER BY l.id", select_loan_details()))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_row_to_loan_details).collect()
    }

    /// 会員の全貸出を検索（貸出履歴）
    ///
    /// (member_id, borrow_date DESC) のインデックスを使用する。
    async fn list_by_member(&self, member_id: MemberId) -> Result<Vec<LoanWithBook>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}, {}
            FROM loans l
            JOIN books b ON b.id = l.book_id
            WHERE l.member_id = $1
            ORDER BY l.borrow_date DESC, l.id DESC
            "#,
            loan_columns("l"),
            book_columns("b")
        ))
        .bind(member_id.value())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(LoanWithBook {
                    loan: map_row_to_loan(row)?,
                    book: map_row_to_book(row)?,
                })
            })
            .collect()
    }
}

/// PostgreSQLトランザクションによる作業単位
///
/// `commit` されずにドロップされた場合、sqlxがロールバックする。
pub struct PgLoanUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LoanUnitOfWork for PgLoanUnitOfWork {
    /// 書籍行を悲観的ロック付きで取得する
    async fn lock_book(&mut self, book_id: BookId) -> Result<Option<Book>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM books b WHERE b.id = $1 FOR UPDATE",
            book_columns("b")
        ))
        .bind(book_id.value())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(map_row_to_book).transpose()
    }

    async fn count_borrowed(&mut self, book_id: BookId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE book_id = $1 AND status = 'BORROWED'",
        )
        .bind(book_id.value())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(count)
    }

    /// 会員を共有ロック付きで取得する（コミットまで削除されないようにする）
    async fn find_member(&mut self, member_id: MemberId) -> Result<Option<Member>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM members m WHERE m.id = $1 FOR SHARE",
            member_columns("m")
        ))
        .bind(member_id.value())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(map_row_to_member).transpose()
    }

    async fn insert_loan(&mut self, loan: NewLoan) -> Result<LoanId> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO loans (book_id, member_id, status, borrow_date, due_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $4, $4)
            RETURNING id
            "#,
        )
        .bind(loan.book_id.value())
        .bind(loan.member_id.value())
        .bind(loan.status().as_str())
        .bind(loan.borrow_date)
        .bind(loan.due_date)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(LoanId::new(id))
    }

    async fn lock_loan(&mut self, loan_id: LoanId) -> Result<Option<Loan>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM loans l WHERE l.id = $1 FOR UPDATE",
            loan_columns("l")
        ))
        .bind(loan_id.value())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(map_row_to_loan).transpose()
    }

    /// 状態がBORROWEDの場合のみ返却を反映する
    async fn mark_returned(&mut self, loan: &Loan) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE loans
            SET status = $2,
                return_date = $3,
                updated_at = $4
            WHERE id = $1 AND status = 'BORROWED'
            "#,
        )
        .bind(loan.id.value())
        .bind(loan.status.as_str())
        .bind(loan.return_date)
        .bind(loan.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn load_details(&mut self, loan_id: LoanId) -> Result<Option<LoanDetails>> {
        let row = sqlx::query(&format!("{} WHERE l.id = $1", select_loan_details()))
            .bind(loan_id.value())
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(map_row_to_loan_details).transpose()
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
