use crate::domain::{Book, BookId, LoanId, LoanStatus, Member, MemberId, loan::Loan, loan::NewLoan};
use crate::ports::{
    LoanDetails, LoanRepository, LoanUnitOfWork, LoanWithBook, RepositoryError, Result,
};
use async_trait::async_trait;
use std::cmp::Reverse;
use tokio::sync::OwnedMutexGuard;

use super::{
    MemoryStore, Tables,
    catalog::{loan_details, loan_with_book},
};

pub(super) fn count_borrowed(tables: &Tables, book_id: BookId) -> i64 {
    tables
        .loans
        .values()
        .filter(|l| l.book_id == book_id && l.status == LoanStatus::Borrowed)
        .count() as i64
}

#[async_trait]
impl LoanRepository for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn LoanUnitOfWork>> {
        let guard = self.tables.clone().lock_owned().await;
        let working = Tables::clone(&guard);
        Ok(Box::new(MemoryLoanUnitOfWork { guard, working }))
    }

    async fn list_all(&self) -> Result<Vec<LoanDetails>> {
        let tables = self.tables.lock().await;
        tables
            .loans
            .values()
            .map(|l| loan_details(&tables, l))
            .collect()
    }

    async fn list_by_member(&self, member_id: MemberId) -> Result<Vec<LoanWithBook>> {
        let tables = self.tables.lock().await;
        let mut loans: Vec<&Loan> = tables
            .loans
            .values()
            .filter(|l| l.member_id == member_id)
            .collect();
        // 同時刻の場合は後から作られた貸出を先にする
        loans.sort_by_key(|l| Reverse((l.borrow_date, l.id)));

        loans
            .into_iter()
            .map(|l| loan_with_book(&tables, l))
            .collect()
    }
}

/// インメモリの作業単位
///
/// ストア全体のロックを保持し、作業用コピーに対して変更を行う。
/// `commit` されずにドロップされた場合、変更は破棄される。
pub struct MemoryLoanUnitOfWork {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl LoanUnitOfWork for MemoryLoanUnitOfWork {
    async fn lock_book(&mut self, book_id: BookId) -> Result<Option<Book>> {
        Ok(self.working.books.get(&book_id.value()).cloned())
    }

    async fn count_borrowed(&mut self, book_id: BookId) -> Result<i64> {
        Ok(count_borrowed(&self.working, book_id))
    }

    async fn find_member(&mut self, member_id: MemberId) -> Result<Option<Member>> {
        Ok(self.working.members.get(&member_id.value()).cloned())
    }

    async fn insert_loan(&mut self, loan: NewLoan) -> Result<LoanId> {
        if !self.working.books.contains_key(&loan.book_id.value()) {
            return Err(RepositoryError::ForeignKeyViolation(
                "loans_book_id_fkey".to_string(),
            ));
        }
        if !self.working.members.contains_key(&loan.member_id.value()) {
            return Err(RepositoryError::ForeignKeyViolation(
                "loans_member_id_fkey".to_string(),
            ));
        }

        let id = LoanId::new(self.working.next_id());
        let status = loan.status();
        self.working.loans.insert(
            id.value(),
            Loan {
                id,
                book_id: loan.book_id,
                member_id: loan.member_id,
                status,
                borrow_date: loan.borrow_date,
                due_date: loan.due_date,
                return_date: None,
                created_at: loan.borrow_date,
                updated_at: loan.borrow_date,
            },
        );
        Ok(id)
    }

    async fn lock_loan(&mut self, loan_id: LoanId) -> Result<Option<Loan>> {
        Ok(self.working.loans.get(&loan_id.value()).cloned())
    }

    async fn mark_returned(&mut self, loan: &Loan) -> Result<bool> {
        match self.working.loans.get_mut(&loan.id.value()) {
            Some(current) if current.status == LoanStatus::Borrowed => {
                current.status = LoanStatus::Returned;
                current.return_date = loan.return_date;
                current.updated_at = loan.updated_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn load_details(&mut self, loan_id: LoanId) -> Result<Option<LoanDetails>> {
        self.working
            .loans
            .get(&loan_id.value())
            .map(|l| loan_details(&self.working, l))
            .transpose()
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryLoanUnitOfWork { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
