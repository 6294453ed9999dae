use crate::domain::{
    Author, AuthorChanges, AuthorId, Book, BookChanges, BookId, Member, MemberChanges, MemberId,
    NewAuthor, NewBook, NewMember,
    loan::{Loan, ensure_quantity_covers_borrowed},
};
use crate::ports::{
    AuthorRepository, AuthorWithBooks, BOOK_AUTHOR_FKEY, BookDetail, BookRepository, BookUpdate,
    BookWithAuthor, LoanDetails, LoanWithBook, MemberDetail, MemberRepository, RepositoryError,
    Result,
};
use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Reverse;

use super::{MemoryStore, Tables, loans::count_borrowed};

#[derive(Debug, thiserror::Error)]
#[error("dangling reference: {0}")]
struct DanglingReference(String);

fn dangling(what: String) -> RepositoryError {
    RepositoryError::backend(DanglingReference(what))
}

// ============================================================================
// 結合ビューの構築
// ============================================================================

pub(super) fn author_with_books(tables: &Tables, author: &Author) -> AuthorWithBooks {
    AuthorWithBooks {
        author: author.clone(),
        books: tables
            .books
            .values()
            .filter(|b| b.author_id == author.id)
            .cloned()
            .collect(),
    }
}

pub(super) fn book_with_author(tables: &Tables, book: &Book) -> Result<BookWithAuthor> {
    let author = tables
        .authors
        .get(&book.author_id.value())
        .ok_or_else(|| dangling(format!("book {} -> author {}", book.id, book.author_id)))?;

    Ok(BookWithAuthor {
        book: book.clone(),
        author: author.clone(),
    })
}

pub(super) fn loan_with_book(tables: &Tables, loan: &Loan) -> Result<LoanWithBook> {
    let book = tables
        .books
        .get(&loan.book_id.value())
        .ok_or_else(|| dangling(format!("loan {} -> book {}", loan.id, loan.book_id)))?;

    Ok(LoanWithBook {
        loan: loan.clone(),
        book: book.clone(),
    })
}

pub(super) fn loan_details(tables: &Tables, loan: &Loan) -> Result<LoanDetails> {
    let LoanWithBook { loan, book } = loan_with_book(tables, loan)?;
    let member = tables
        .members
        .get(&loan.member_id.value())
        .ok_or_else(|| dangling(format!("loan {} -> member {}", loan.id, loan.member_id)))?;

    Ok(LoanDetails {
        loan,
        book,
        member: member.clone(),
    })
}

fn ensure_unique_isbn(tables: &Tables, isbn: &str, except: Option<BookId>) -> Result<()> {
    let taken = tables
        .books
        .values()
        .any(|b| b.isbn == isbn && Some(b.id) != except);
    if taken {
        return Err(RepositoryError::UniqueViolation("books_isbn_key".to_string()));
    }
    Ok(())
}

fn ensure_unique_email(tables: &Tables, email: &str, except: Option<MemberId>) -> Result<()> {
    let taken = tables
        .members
        .values()
        .any(|m| m.email == email && Some(m.id) != except);
    if taken {
        return Err(RepositoryError::UniqueViolation("members_email_key".to_string()));
    }
    Ok(())
}

fn ensure_author_reference(tables: &Tables, author_id: AuthorId) -> Result<()> {
    if !tables.authors.contains_key(&author_id.value()) {
        return Err(RepositoryError::ForeignKeyViolation(
            BOOK_AUTHOR_FKEY.to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// 著者
// ============================================================================

#[async_trait]
impl AuthorRepository for MemoryStore {
    async fn list(&self) -> Result<Vec<AuthorWithBooks>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .authors
            .values()
            .map(|a| author_with_books(&tables, a))
            .collect())
    }

    async fn find_by_id(&self, id: AuthorId) -> Result<Option<AuthorWithBooks>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .authors
            .get(&id.value())
            .map(|a| author_with_books(&tables, a)))
    }

    async fn exists(&self, id: AuthorId) -> Result<bool> {
        Ok(self.tables.lock().await.authors.contains_key(&id.value()))
    }

    async fn create(&self, author: NewAuthor) -> Result<Author> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        let created = Author {
            id: AuthorId::new(tables.next_id()),
            name: author.name,
            bio: author.bio,
            created_at: now,
            updated_at: now,
        };
        tables.authors.insert(created.id.value(), created.clone());
        Ok(created)
    }

    async fn update(&self, id: AuthorId, changes: AuthorChanges) -> Result<Option<Author>> {
        let mut tables = self.tables.lock().await;
        let Some(current) = tables.authors.get(&id.value()).cloned() else {
            return Ok(None);
        };
        let updated = current.apply(changes, Utc::now());
        tables.authors.insert(id.value(), updated.clone());
        Ok(Some(updated))
    }

    async fn delete(&self, id: AuthorId) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        if !tables.authors.contains_key(&id.value()) {
            return Ok(false);
        }
        if tables.books.values().any(|b| b.author_id == id) {
            return Err(RepositoryError::ForeignKeyViolation(
                BOOK_AUTHOR_FKEY.to_string(),
            ));
        }
        tables.authors.remove(&id.value());
        Ok(true)
    }
}

// ============================================================================
// 書籍
// ============================================================================

#[async_trait]
impl BookRepository for MemoryStore {
    async fn list(&self) -> Result<Vec<BookWithAuthor>> {
        let tables = self.tables.lock().await;
        tables
            .books
            .values()
            .map(|b| book_with_author(&tables, b))
            .collect()
    }

    async fn find_by_id(&self, id: BookId) -> Result<Option<BookDetail>> {
        let tables = self.tables.lock().await;
        let Some(book) = tables.books.get(&id.value()) else {
            return Ok(None);
        };
        let BookWithAuthor { book, author } = book_with_author(&tables, book)?;
        let mut loans: Vec<Loan> = tables
            .loans
            .values()
            .filter(|l| l.book_id == id)
            .cloned()
            .collect();
        loans.sort_by_key(|l| Reverse((l.borrow_date, l.id)));

        Ok(Some(BookDetail {
            book,
            author,
            loans,
        }))
    }

    async fn create(&self, book: NewBook) -> Result<BookWithAuthor> {
        let mut tables = self.tables.lock().await;
        ensure_author_reference(&tables, book.author_id)?;
        ensure_unique_isbn(&tables, &book.isbn, None)?;

        let now = Utc::now();
        let created = Book {
            id: BookId::new(tables.next_id()),
            title: book.title,
            isbn: book.isbn,
            published_year: book.published_year,
            quantity: book.quantity,
            author_id: book.author_id,
            created_at: now,
            updated_at: now,
        };
        tables.books.insert(created.id.value(), created.clone());
        book_with_author(&tables, &created)
    }

    /// ストア全体のロック下で貸出中の件数と比較するため、貸出とは直列化される
    async fn update(&self, id: BookId, changes: BookChanges) -> Result<BookUpdate> {
        let mut tables = self.tables.lock().await;
        let Some(current) = tables.books.get(&id.value()).cloned() else {
            return Ok(BookUpdate::NotFound);
        };
        if let Some(quantity) = changes.quantity {
            let borrowed = count_borrowed(&tables, id);
            if let Err(err) = ensure_quantity_covers_borrowed(quantity, borrowed) {
                return Ok(BookUpdate::Rejected(err));
            }
        }
        if let Some(author_id) = changes.author_id {
            ensure_author_reference(&tables, author_id)?;
        }
        if let Some(isbn) = &changes.isbn {
            ensure_unique_isbn(&tables, isbn, Some(id))?;
        }

        let updated = current.apply(changes, Utc::now());
        tables.books.insert(id.value(), updated.clone());
        book_with_author(&tables, &updated).map(BookUpdate::Updated)
    }

    async fn delete(&self, id: BookId) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        if !tables.books.contains_key(&id.value()) {
            return Ok(false);
        }
        if tables.loans.values().any(|l| l.book_id == id) {
            return Err(RepositoryError::ForeignKeyViolation(
                "loans_book_id_fkey".to_string(),
            ));
        }
        tables.books.remove(&id.value());
        Ok(true)
    }
}

// ============================================================================
// 会員
// ============================================================================

#[async_trait]
impl MemberRepository for MemoryStore {
    async fn list(&self) -> Result<Vec<Member>> {
        Ok(self.tables.lock().await.members.values().cloned().collect())
    }

    async fn find_by_id(&self, id: MemberId) -> Result<Option<MemberDetail>> {
        let tables = self.tables.lock().await;
        let Some(member) = tables.members.get(&id.value()) else {
            return Ok(None);
        };
        let mut loans: Vec<&Loan> = tables
            .loans
            .values()
            .filter(|l| l.member_id == id)
            .collect();
        loans.sort_by_key(|l| Reverse((l.borrow_date, l.id)));
        let loans = loans
            .into_iter()
            .map(|l| loan_with_book(&tables, l))
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(MemberDetail {
            member: member.clone(),
            loans,
        }))
    }

    async fn create(&self, member: NewMember) -> Result<Member> {
        let mut tables = self.tables.lock().await;
        ensure_unique_email(&tables, &member.email, None)?;

        let now = Utc::now();
        let created = Member {
            id: MemberId::new(tables.next_id()),
            name: member.name,
            email: member.email,
            phone: member.phone,
            created_at: now,
            updated_at: now,
        };
        tables.members.insert(created.id.value(), created.clone());
        Ok(created)
    }

    async fn update(&self, id: MemberId, changes: MemberChanges) -> Result<Option<Member>> {
        let mut tables = self.tables.lock().await;
        let Some(current) = tables.members.get(&id.value()).cloned() else {
            return Ok(None);
        };
        if let Some(email) = &changes.email {
            ensure_unique_email(&tables, email, Some(id))?;
        }

        let updated = current.apply(changes, Utc::now());
        tables.members.insert(id.value(), updated.clone());
        Ok(Some(updated))
    }

    async fn delete(&self, id: MemberId) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        if !tables.members.contains_key(&id.value()) {
            return Ok(false);
        }
        if tables.loans.values().any(|l| l.member_id == id) {
            return Err(RepositoryError::ForeignKeyViolation(
                "loans_member_id_fkey".to_string(),
            ));
        }
        tables.members.remove(&id.value());
        Ok(true)
    }
}
