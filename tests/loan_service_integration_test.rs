use library_api::adapters::memory::MemoryStore;
use library_api::application::catalog::{self, CatalogDependencies};
use library_api::application::loan::{
    LoanApplicationError, ServiceDependencies, borrow_book, list_loans, list_member_loans,
    return_book,
};
use library_api::domain::commands::*;
use library_api::domain::*;

mod common;

// ============================================================================
// テスト用のセットアップ
// ============================================================================

struct Fixture {
    store: MemoryStore,
    loans: ServiceDependencies,
    catalog: CatalogDependencies,
}

fn setup() -> Fixture {
    let store = MemoryStore::new();
    let (loans, catalog) = common::memory_dependencies(&store);
    Fixture {
        store,
        loans,
        catalog,
    }
}

async fn create_book(fixture: &Fixture, isbn: &str, quantity: i32) -> BookId {
    let author = catalog::create_author(
        &fixture.catalog,
        NewAuthor {
            name: "Octavia E. Butler".to_string(),
            bio: None,
        },
    )
    .await
    .unwrap();

    catalog::create_book(
        &fixture.catalog,
        NewBook {
            title: "Kindred".to_string(),
            isbn: isbn.to_string(),
            published_year: Some(1979),
            quantity,
            author_id: author.id,
        },
    )
    .await
    .unwrap()
    .book
    .id
}

async fn create_member(fixture: &Fixture, email: &str) -> MemberId {
    catalog::create_member(
        &fixture.catalog,
        NewMember {
            name: "Dana".to_string(),
            email: email.to_string(),
            phone: None,
        },
    )
    .await
    .unwrap()
    .id
}

fn borrow(book_id: BookId, member_id: MemberId) -> BorrowBook {
    BorrowBook {
        book_id,
        member_id,
        due_date: None,
    }
}

// ============================================================================
// 貸出
// ============================================================================

#[tokio::test]
async fn test_borrow_book_success() {
    let fixture = setup();
    let book_id = create_book(&fixture, "isbn-1", 2).await;
    let member_id = create_member(&fixture, "dana@example.com").await;

    let details = borrow_book(&fixture.loans, borrow(book_id, member_id))
        .await
        .unwrap();

    assert_eq!(details.loan.book_id, book_id);
    assert_eq!(details.loan.member_id, member_id);
    assert_eq!(details.loan.status, LoanStatus::Borrowed);
    assert_eq!(details.loan.return_date, None);
    assert_eq!(details.book.id, book_id);
    assert_eq!(details.member.id, member_id);
    assert_eq!(fixture.store.borrowed_count(book_id).await, 1);
}

#[tokio::test]
async fn test_borrow_fails_when_all_copies_are_out() {
    let fixture = setup();
    let book_id = create_book(&fixture, "isbn-1", 1).await;
    let first = create_member(&fixture, "a@example.com").await;
    let second = create_member(&fixture, "b@example.com").await;

    borrow_book(&fixture.loans, borrow(book_id, first))
        .await
        .unwrap();
    let result = borrow_book(&fixture.loans, borrow(book_id, second)).await;

    assert!(matches!(
        result,
        Err(LoanApplicationError::Borrow(
            BorrowBookError::NoCopiesAvailable
        ))
    ));
    assert_eq!(fixture.store.borrowed_count(book_id).await, 1);
}

#[tokio::test]
async fn test_borrow_book_with_zero_quantity_fails() {
    let fixture = setup();
    let book_id = create_book(&fixture, "isbn-0", 0).await;
    let member_id = create_member(&fixture, "a@example.com").await;

    let result = borrow_book(&fixture.loans, borrow(book_id, member_id)).await;

    assert!(matches!(result, Err(LoanApplicationError::Borrow(_))));
}

#[tokio::test]
async fn test_borrow_unknown_book_or_member() {
    let fixture = setup();
    let book_id = create_book(&fixture, "isbn-1", 1).await;
    let member_id = create_member(&fixture, "a@example.com").await;

    let missing_book = borrow_book(&fixture.loans, borrow(BookId::new(999), member_id)).await;
    let missing_member = borrow_book(&fixture.loans, borrow(book_id, MemberId::new(999))).await;

    assert!(matches!(
        missing_book,
        Err(LoanApplicationError::BookNotFound(id)) if id == BookId::new(999)
    ));
    assert!(matches!(
        missing_member,
        Err(LoanApplicationError::MemberNotFound(id)) if id == MemberId::new(999)
    ));
    // 失敗した貸出は何も残さない
    assert_eq!(fixture.store.borrowed_count(book_id).await, 0);
}

/// 最後の1冊への同時貸出はちょうど1件だけ成功する
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_borrows_of_last_copy() {
    let fixture = setup();
    let book_id = create_book(&fixture, "isbn-last", 1).await;

    let mut members = Vec::new();
    for i in 0..8 {
        members.push(create_member(&fixture, &format!("m{i}@example.com")).await);
    }

    let handles: Vec<_> = members
        .into_iter()
        .map(|member_id| {
            let deps = fixture.loans.clone();
            tokio::spawn(async move { borrow_book(&deps, borrow(book_id, member_id)).await })
        })
        .collect();

    let mut succeeded = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(LoanApplicationError::Borrow(BorrowBookError::NoCopiesAvailable)) => rejected += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(rejected, 7);
    assert_eq!(fixture.store.borrowed_count(book_id).await, 1);
}

// ============================================================================
// 返却
// ============================================================================

#[tokio::test]
async fn test_return_book_success() {
    let fixture = setup();
    let book_id = create_book(&fixture, "isbn-1", 1).await;
    let member_id = create_member(&fixture, "a@example.com").await;
    let loan = borrow_book(&fixture.loans, borrow(book_id, member_id))
        .await
        .unwrap();

    let returned = return_book(
        &fixture.loans,
        ReturnBook {
            loan_id: loan.loan.id,
        },
    )
    .await
    .unwrap();

    assert_eq!(returned.loan.status, LoanStatus::Returned);
    assert!(returned.loan.return_date.is_some());
    assert_eq!(fixture.store.borrowed_count(book_id).await, 0);
}

#[tokio::test]
async fn test_return_twice_fails_and_keeps_first_return() {
    let fixture = setup();
    let book_id = create_book(&fixture, "isbn-1", 1).await;
    let member_id = create_member(&fixture, "a@example.com").await;
    let loan = borrow_book(&fixture.loans, borrow(book_id, member_id))
        .await
        .unwrap();
    let cmd = ReturnBook {
        loan_id: loan.loan.id,
    };

    let first = return_book(&fixture.loans, cmd.clone()).await.unwrap();
    let second = return_book(&fixture.loans, cmd).await;

    assert!(matches!(
        second,
        Err(LoanApplicationError::Return(
            ReturnBookError::AlreadyReturned
        ))
    ));
    let history = list_member_loans(&fixture.loans, member_id).await.unwrap();
    assert_eq!(history[0].loan.return_date, first.loan.return_date);
}

/// 同じ貸出への同時返却は1回だけ適用される
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_returns_apply_once() {
    let fixture = setup();
    let book_id = create_book(&fixture, "isbn-1", 1).await;
    let member_id = create_member(&fixture, "a@example.com").await;
    let loan = borrow_book(&fixture.loans, borrow(book_id, member_id))
        .await
        .unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let deps = fixture.loans.clone();
            let cmd = ReturnBook {
                loan_id: loan.loan.id,
            };
            tokio::spawn(async move { return_book(&deps, cmd).await })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            succeeded += 1;
        }
    }

    assert_eq!(succeeded, 1);
}

#[tokio::test]
async fn test_return_unknown_loan() {
    let fixture = setup();

    let result = return_book(
        &fixture.loans,
        ReturnBook {
            loan_id: LoanId::new(404),
        },
    )
    .await;

    assert!(matches!(result, Err(LoanApplicationError::LoanNotFound(_))));
}

// ============================================================================
// 一覧
// ============================================================================

#[tokio::test]
async fn test_list_loans_and_member_history() {
    let fixture = setup();
    let book_id = create_book(&fixture, "isbn-1", 5).await;
    let member_a = create_member(&fixture, "a@example.com").await;
    let member_b = create_member(&fixture, "b@example.com").await;

    let first = borrow_book(&fixture.loans, borrow(book_id, member_a))
        .await
        .unwrap();
    borrow_book(&fixture.loans, borrow(book_id, member_b))
        .await
        .unwrap();
    let third = borrow_book(&fixture.loans, borrow(book_id, member_a))
        .await
        .unwrap();

    let all = list_loans(&fixture.loans).await.unwrap();
    assert_eq!(all.len(), 3);

    let history = list_member_loans(&fixture.loans, member_a).await.unwrap();
    let ids: Vec<LoanId> = history.iter().map(|l| l.loan.id).collect();
    assert_eq!(ids, vec![third.loan.id, first.loan.id]);
    assert!(history.iter().all(|l| l.book.id == book_id));
}
