use crate::domain::{Author, AuthorChanges, AuthorId, Book, NewAuthor};
use crate::ports::{AuthorRepository as AuthorRepositoryTrait, AuthorWithBooks, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;

use super::rows::{author_columns, book_columns, map_row_to_author, map_row_to_book};

/// AuthorRepositoryのPostgreSQL実装
pub struct AuthorRepository {
    pool: PgPool,
}

impl AuthorRepository {
    /// PostgreSQLコネクションプールから新しいAuthorRepositoryを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn books_of(&self, author_ids: &[i64]) -> Result<Vec<Book>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM books b WHERE b.author_id = ANY($1) ORDER BY b.id",
            book_columns("b")
        ))
        .bind(author_ids)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_book).collect()
    }
}

#[async_trait]
impl AuthorRepositoryTrait for AuthorRepository {
    /// 全著者を取得し、著書を2本目のクエリでまとめて結合する
    async fn list(&self) -> Result<Vec<AuthorWithBooks>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM authors a ORDER BY a.id",
            author_columns("a")
        ))
        .fetch_all(&self.pool)
        .await?;

        let authors = rows
            .iter()
            .map(map_row_to_author)
            .collect::<Result<Vec<_>>>()?;
        let ids: Vec<i64> = authors.iter().map(|a| a.id.value()).collect();

        let mut books_by_author: HashMap<AuthorId, Vec<Book>> = HashMap::new();
        for book in self.books_of(&ids).await? {
            books_by_author.entry(book.author_id).or_default().push(book);
        }

        Ok(authors
            .into_iter()
            .map(|author| AuthorWithBooks {
                books: books_by_author.remove(&author.id).unwrap_or_default(),
                author,
            })
            .collect())
    }

    async fn find_by_id(&self, id: AuthorId) -> Result<Option<AuthorWithBooks>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM authors a WHERE a.id = $1",
            author_columns("a")
        ))
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let author = map_row_to_author(&row)?;
        let books = self.books_of(&[id.value()]).await?;

        Ok(Some(AuthorWithBooks { author, books }))
    }

    async fn exists(&self, id: AuthorId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM authors WHERE id = $1)")
            .bind(id.value())
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn create(&self, author: NewAuthor) -> Result<Author> {
        let row = sqlx::query(&format!(
            r#"
            WITH inserted AS (
                INSERT INTO authors (name, bio)
                VALUES ($1, $2)
                RETURNING *
            )
            SELECT {} FROM inserted a
            "#,
            author_columns("a")
        ))
        .bind(&author.name)
        .bind(&author.bio)
        .fetch_one(&self.pool)
        .await?;

        map_row_to_author(&row)
    }

    /// 部分更新（NULLのパラメータは現在値を維持する）
    async fn update(&self, id: AuthorId, changes: AuthorChanges) -> Result<Option<Author>> {
        let row = sqlx::query(&format!(
            r#"
            WITH updated AS (
                UPDATE authors
                SET name = COALESCE($2, name),
                    bio = COALESCE($3, bio),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT {} FROM updated a
            "#,
            author_columns("a")
        ))
        .bind(id.value())
        .bind(&changes.name)
        .bind(&changes.bio)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_author).transpose()
    }

    async fn delete(&self, id: AuthorId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id.value())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
