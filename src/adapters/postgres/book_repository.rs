use crate::domain::{self, BookChanges, BookId, NewBook};
use crate::ports::{
    BookDetail, BookRepository as BookRepositoryTrait, BookUpdate, BookWithAuthor, Result,
};
use async_trait::async_trait;
use sqlx::{PgPool, postgres::PgRow};

use super::rows::{
    author_columns, book_columns, loan_columns, map_row_to_author, map_row_to_book,
    map_row_to_loan,
};

fn map_row_to_book_with_author(row: &PgRow) -> Result<BookWithAuthor> {
    Ok(BookWithAuthor {
        book: map_row_to_book(row)?,
        author: map_row_to_author(row)?,
    })
}

/// 書籍と著者を結合して取得するSELECT句
///
/// `source` は books 相当の行を返すテーブル名またはCTE名。
fn select_with_author(source: &str) -> String {
    format!(
        "SELECT {}, {} FROM {source} b JOIN authors a ON a.id = b.author_id",
        book_columns("b"),
        author_columns("a")
    )
}

/// BookRepositoryのPostgreSQL実装
pub struct BookRepository {
    pool: PgPool,
}

impl BookRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepositoryTrait for BookRepository {
    async fn list(&self) -> Result<Vec<BookWithAuthor>> {
        let rows = sqlx::query(&format!("{} ORDER BY b.id", select_with_author("books")))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_row_to_book_with_author).collect()
    }

    /// 書籍を著者・貸出履歴付きで取得する
    async fn find_by_id(&self, id: BookId) -> Result<Option<BookDetail>> {
        let row = sqlx::query(&format!("{} WHERE b.id = $1", select_with_author("books")))
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let BookWithAuthor { book, author } = map_row_to_book_with_author(&row)?;

        let loan_rows = sqlx::query(&format!(
            "SELECT {} FROM loans l WHERE l.book_id = $1 ORDER BY l.borrow_date DESC, l.id DESC",
            loan_columns("l")
        ))
        .bind(id.value())
        .fetch_all(&self.pool)
        .await?;
        let loans = loan_rows
            .iter()
            .map(map_row_to_loan)
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(BookDetail {
            book,
            author,
            loans,
        }))
    }

    async fn create(&self, book: NewBook) -> Result<BookWithAuthor> {
        let row = sqlx::query(&format!(
            r#"
            WITH inserted AS (
                INSERT INTO books (title, isbn, published_year, quantity, author_id)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
            )
            {}
            "#,
            select_with_author("inserted")
        ))
        .bind(&book.title)
        .bind(&book.isbn)
        .bind(book.published_year)
        .bind(book.quantity)
        .bind(book.author_id.value())
        .fetch_one(&self.pool)
        .await?;

        map_row_to_book_with_author(&row)
    }

    /// 部分更新（NULLのパラメータは現在値を維持する）
    ///
    /// 書籍行を `FOR UPDATE` でロックしてから貸出中の件数を数えるため、
    /// 同時の貸出と所蔵数の変更は直列化される。
    async fn update(&self, id: BookId, changes: BookChanges) -> Result<BookUpdate> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<i64> =
            sqlx::query_scalar("SELECT id FROM books WHERE id = $1 FOR UPDATE")
                .bind(id.value())
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Ok(BookUpdate::NotFound);
        }

        if let Some(quantity) = changes.quantity {
            let borrowed: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM loans WHERE book_id = $1 AND status = 'BORROWED'",
            )
            .bind(id.value())
            .fetch_one(&mut *tx)
            .await?;

            if let Err(err) = domain::loan::ensure_quantity_covers_borrowed(quantity, borrowed) {
                return Ok(BookUpdate::Rejected(err));
            }
        }

        let row = sqlx::query(&format!(
            r#"
            WITH updated AS (
                UPDATE books
                SET title = COALESCE($2, title),
                    isbn = COALESCE($3, isbn),
                    published_year = COALESCE($4, published_year),
                    quantity = COALESCE($5, quantity),
                    author_id = COALESCE($6, author_id),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            {}
            "#,
            select_with_author("updated")
        ))
        .bind(id.value())
        .bind(&changes.title)
        .bind(&changes.isbn)
        .bind(changes.published_year)
        .bind(changes.quantity)
        .bind(changes.author_id.map(|a| a.value()))
        .fetch_one(&mut *tx)
        .await?;
        let updated = map_row_to_book_with_author(&row)?;

        tx.commit().await?;
        Ok(BookUpdate::Updated(updated))
    }

    async fn delete(&self, id: BookId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id.value())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
