use crate::domain::{self, MemberId, commands::*};
use crate::ports::{LoanDetails, LoanRepository, LoanWithBook};
use chrono::Utc;
use std::sync::Arc;

use super::errors::{LoanApplicationError, Result};

/// サービスの依存関係
///
/// データ構造として定義し、振る舞いは持たない。
/// 純粋な関数に依存関係を明示的に渡す。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub loan_repository: Arc<dyn LoanRepository>,
}

/// 書籍を貸し出す
///
/// ビジネスルール（この順序で確認し、それぞれ別のエラーになる）：
/// 1. 書籍が存在すること
/// 2. 貸出中の件数が所蔵数未満であること
/// 3. 会員が存在すること
///
/// # 一貫性保証
///
/// 確認から挿入までを1つの作業単位で実行する。
/// 書籍行をロックしてから貸出件数を数えるため、最後の1冊に対する
/// 同時貸出はどちらか一方しか成功しない。
/// 途中でエラーになった場合、作業単位はコミットされずに破棄される。
///
/// # 戻り値
/// 作成された貸出（書籍・会員付き）
pub async fn borrow_book(deps: &ServiceDependencies, cmd: BorrowBook) -> Result<LoanDetails> {
    let now = Utc::now();
    let mut uow = deps.loan_repository.begin().await?;

    // 1. 書籍の存在確認（行ロック）
    let book = uow
        .lock_book(cmd.book_id)
        .await?
        .ok_or(LoanApplicationError::BookNotFound(cmd.book_id))?;

    // 2. 在庫確認
    let borrowed = uow.count_borrowed(cmd.book_id).await?;
    domain::loan::ensure_copy_available(&book, borrowed)?;

    // 3. 会員の存在確認
    uow.find_member(cmd.member_id)
        .await?
        .ok_or(LoanApplicationError::MemberNotFound(cmd.member_id))?;

    // 4. ドメイン層の純粋関数で貸出を作成して挿入
    let new_loan = domain::loan::open_loan(cmd.book_id, cmd.member_id, cmd.due_date, now);
    let loan_id = uow.insert_loan(new_loan).await?;

    let details = uow
        .load_details(loan_id)
        .await?
        .ok_or(LoanApplicationError::LoanNotFound(loan_id))?;

    uow.commit().await?;

    tracing::info!(
        loan_id = %loan_id,
        book_id = %cmd.book_id,
        member_id = %cmd.member_id,
        available = domain::loan::available_copies(&book, borrowed + 1),
        "Book borrowed"
    );

    Ok(details)
}

/// 書籍を返却する
///
/// ビジネスルール：
/// - 貸出が存在すること
/// - 既に返却済みでないこと
///
/// 貸出行をロックした上で、状態がBORROWEDの場合のみ更新する。
/// 同時に返却が要求されても状態遷移は1回しか適用されない。
pub async fn return_book(deps: &ServiceDependencies, cmd: ReturnBook) -> Result<LoanDetails> {
    let now = Utc::now();
    let mut uow = deps.loan_repository.begin().await?;

    // 1. 貸出の存在確認（行ロック）
    let loan = uow
        .lock_loan(cmd.loan_id)
        .await?
        .ok_or(LoanApplicationError::LoanNotFound(cmd.loan_id))?;

    // 2. ドメイン層の純粋関数で状態遷移
    let returned = domain::loan::return_loan(loan, now)?;

    // 3. compare-and-swap で反映
    if !uow.mark_returned(&returned).await? {
        return Err(domain::ReturnBookError::AlreadyReturned.into());
    }

    let details = uow
        .load_details(cmd.loan_id)
        .await?
        .ok_or(LoanApplicationError::LoanNotFound(cmd.loan_id))?;

    uow.commit().await?;

    tracing::info!(loan_id = %cmd.loan_id, "Book returned");

    Ok(details)
}

/// 全貸出を取得する
pub async fn list_loans(deps: &ServiceDependencies) -> Result<Vec<LoanDetails>> {
    Ok(deps.loan_repository.list_all().await?)
}

/// 会員の貸出を新しい順に取得する
///
/// 会員の存在確認は行わない。存在しない会員の場合は空のリストになる。
pub async fn list_member_loans(
    deps: &ServiceDependencies,
    member_id: MemberId,
) -> Result<Vec<LoanWithBook>> {
    Ok(deps.loan_repository.list_by_member(member_id).await?)
}
