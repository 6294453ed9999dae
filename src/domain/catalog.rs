//! カタログ系エンティティ（著者・書籍・会員）
//!
//! いずれも単純なCRUDの対象であり、状態遷移を持たない。

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{AuthorId, BookId, MemberId};

/// 著者
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: AuthorId,
    pub name: String,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 著者の新規作成内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuthor {
    pub name: String,
    pub bio: Option<String>,
}

/// 著者の部分更新内容（`None` のフィールドは変更しない）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorChanges {
    pub name: Option<String>,
    pub bio: Option<String>,
}

/// 書籍
///
/// `quantity` は所蔵している物理的な冊数。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub isbn: String,
    pub published_year: Option<i32>,
    pub quantity: i32,
    pub author_id: AuthorId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub isbn: String,
    pub published_year: Option<i32>,
    pub quantity: i32,
    pub author_id: AuthorId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookChanges {
    pub title: Option<String>,
    pub isbn: Option<String>,
    pub published_year: Option<i32>,
    pub quantity: Option<i32>,
    pub author_id: Option<AuthorId>,
}

/// 会員
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMember {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Author {
    /// 部分更新を適用する（純粋関数）
    pub fn apply(mut self, changes: AuthorChanges, now: DateTime<Utc>) -> Self {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(bio) = changes.bio {
            self.bio = Some(bio);
        }
        self.updated_at = now;
        self
    }
}

impl Book {
    pub fn apply(mut self, changes: BookChanges, now: DateTime<Utc>) -> Self {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(isbn) = changes.isbn {
            self.isbn = isbn;
        }
        if let Some(year) = changes.published_year {
            self.published_year = Some(year);
        }
        if let Some(quantity) = changes.quantity {
            self.quantity = quantity;
        }
        if let Some(author_id) = changes.author_id {
            self.author_id = author_id;
        }
        self.updated_at = now;
        self
    }
}

impl Member {
    pub fn apply(mut self, changes: MemberChanges, now: DateTime<Utc>) -> Self {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(email) = changes.email {
            self.email = email;
        }
        if let Some(phone) = changes.phone {
            self.phone = Some(phone);
        }
        self.updated_at = now;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_book(now: DateTime<Utc>) -> Book {
        Book {
            id: BookId::new(1),
            title: "Dune".to_string(),
            isbn: "978-0441013593".to_string(),
            published_year: None,
            quantity: 1,
            author_id: AuthorId::new(1),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_book_apply_changes_only_given_fields() {
        let created = Utc::now();
        let later = created + chrono::Duration::minutes(5);
        let book = sample_book(created).apply(
            BookChanges {
                quantity: Some(3),
                published_year: Some(1965),
                ..Default::default()
            },
            later,
        );

        assert_eq!(book.title, "Dune");
        assert_eq!(book.quantity, 3);
        assert_eq!(book.published_year, Some(1965));
        assert_eq!(book.created_at, created);
        assert_eq!(book.updated_at, later);
    }

    #[test]
    fn test_member_apply_empty_changes_keeps_fields() {
        let now = Utc::now();
        let member = Member {
            id: MemberId::new(1),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: Some("555-0100".to_string()),
            created_at: now,
            updated_at: now,
        };

        let updated = member.clone().apply(MemberChanges::default(), now);
        assert_eq!(updated, member);
    }

    #[test]
    fn test_book_serializes_camel_case() {
        let json = serde_json::to_value(sample_book(Utc::now())).unwrap();
        assert_eq!(json["authorId"], 1);
        assert!(json["publishedYear"].is_null());
        assert!(json.get("author_id").is_none());
    }
}
