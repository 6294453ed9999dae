use crate::domain::{Member, MemberChanges, MemberId, NewMember};
use crate::ports::{
    LoanWithBook, MemberDetail, MemberRepository as MemberRepositoryTrait, Result,
};
use async_trait::async_trait;
use sqlx::PgPool;

use super::rows::{
    book_columns, loan_columns, map_row_to_book, map_row_to_loan, map_row_to_member,
    member_columns,
};

/// MemberRepositoryのPostgreSQL実装
pub struct MemberRepository {
    pool: PgPool,
}

impl MemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MemberRepositoryTrait for MemberRepository {
    async fn list(&self) -> Result<Vec<Member>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM members m ORDER BY m.id",
            member_columns("m")
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_member).collect()
    }

    /// 会員を貸出履歴（新しい順、書籍付き）とともに取得する
    async fn find_by_id(&self, id: MemberId) -> Result<Option<MemberDetail>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM members m WHERE m.id = $1",
            member_columns("m")
        ))
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let member = map_row_to_member(&row)?;

        let loan_rows = sqlx::query(&format!(
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
        .bind(id.value())
        .fetch_all(&self.pool)
        .await?;

        let loans = loan_rows
            .iter()
            .map(|row| {
                Ok(LoanWithBook {
                    loan: map_row_to_loan(row)?,
                    book: map_row_to_book(row)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(MemberDetail { member, loans }))
    }

    /// 会員を登録する
    ///
    /// members_email_key の一意制約違反は `UniqueViolation` として返る。
    async fn create(&self, member: NewMember) -> Result<Member> {
        let row = sqlx::query(&format!(
            r#"
            WITH inserted AS (
                INSERT INTO members (name, email, phone)
                VALUES ($1, $2, $3)
                RETURNING *
            )
            SELECT {} FROM inserted m
            "#,
            member_columns("m")
        ))
        .bind(&member.name)
        .bind(&member.email)
        .bind(&member.phone)
        .fetch_one(&self.pool)
        .await?;

        map_row_to_member(&row)
    }

    async fn update(&self, id: MemberId, changes: MemberChanges) -> Result<Option<Member>> {
        let row = sqlx::query(&format!(
            r#"
            WITH updated AS (
                UPDATE members
                SET name = COALESCE($2, name),
                    email = COALESCE($3, email),
                    phone = COALESCE($4, phone),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT {} FROM updated m
            "#,
            member_columns("m")
        ))
        .bind(id.value())
        .bind(&changes.name)
        .bind(&changes.email)
        .bind(&changes.phone)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_member).transpose()
    }

    async fn delete(&self, id: MemberId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id.value())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
