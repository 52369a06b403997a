//! Loan lifecycle: a loan is born Active at borrow and becomes Returned, for
//! good, when the copy comes back.

use tracing::{info, warn};

use crate::access::{check_access, require_service, Permission};
use crate::clock::Clock;
use crate::error::{LibraryError, Result};
use crate::models::{LoanRecord, Session};
use crate::store::Handle;

use super::Desk;

/// Fee, in cents, charged for every whole day past the agreed loan period.
pub const OVERDUE_FEE_PER_DAY: i64 = 30;

/// What a completed return cost the borrower.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnReceipt {
    pub elapsed_days: i64,
    pub overdue_days: i64,
    /// Fee deducted, in cents. Zero for an on-time return.
    pub fee: i32,
    /// Balance after the deduction. May be negative.
    pub balance: i32,
}

impl ReturnReceipt {
    pub fn overdue(&self) -> bool {
        self.overdue_days > 0
    }
}

/// Loans visible to a session: the whole ledger for record keepers, otherwise
/// the caller's own outstanding loans.
#[derive(Debug)]
pub struct LoanListing<'a> {
    pub full_ledger: bool,
    pub loans: Vec<(Handle<LoanRecord>, &'a LoanRecord)>,
}

impl<C: Clock> Desk<C> {
    /// Lend one copy of `isbn` to the session's account for `loan_days` days.
    pub fn borrow(
        &mut self,
        session: &Session,
        isbn: &str,
        loan_days: i64,
    ) -> Result<Handle<LoanRecord>> {
        let borrower = self.session_account(session)?;
        if !check_access(borrower.group, Permission::BORROW) {
            return Err(LibraryError::denied(
                "Borrowing is not available to this account.",
            ));
        }
        if borrower.in_debt() {
            return Err(LibraryError::precondition(
                "Borrowing is suspended until outstanding fees are paid. Please recharge.",
            ));
        }
        let borrower_id = borrower.id;

        let book_handle = self
            .library
            .find_book_by_isbn(isbn)
            .ok_or_else(|| LibraryError::not_found(format!("No book with ISBN {isbn}.")))?;
        let in_stock = self
            .library
            .book(book_handle)
            .map(|book| book.stock > 0)
            .unwrap_or(false);
        if !in_stock {
            return Err(LibraryError::precondition(format!(
                "No copies of {isbn} are left to lend."
            )));
        }
        if loan_days <= 0 {
            return Err(LibraryError::invalid("Loan period must be at least one day."));
        }
        let loan_days = u32::try_from(loan_days)
            .map_err(|_| LibraryError::invalid("Loan period is too long."))?;

        let now = self.clock.now();
        let book = self
            .library
            .book_mut(book_handle)
            .ok_or_else(|| LibraryError::not_found(format!("No book with ISBN {isbn}.")))?;
        book.stock -= 1;
        let isbn = book.isbn.clone();

        let handle = self.library.insert_loan(LoanRecord {
            isbn: isbn.clone(),
            loan_days,
            borrower_id,
            borrowed: now,
            returned: None,
        });
        info!(borrower_id, %isbn, loan_days, "book borrowed");
        Ok(handle)
    }

    /// Close an active loan held by the session's account, charging the
    /// overdue fee when the loan period was exceeded.
    pub fn return_loan(
        &mut self,
        session: &Session,
        loan_handle: Handle<LoanRecord>,
    ) -> Result<ReturnReceipt> {
        let actor = self.session_account(session)?;
        let (actor_id, actor_group) = (actor.id, actor.group);

        let loan = self
            .library
            .loan(loan_handle)
            .ok_or_else(|| LibraryError::not_found("That loan does not exist."))?;
        if !loan.is_active() {
            return Err(LibraryError::precondition("That loan was already returned."));
        }
        if loan.borrower_id != actor_id || !check_access(actor_group, Permission::RETURN) {
            return Err(LibraryError::denied("Only the borrower can return this loan."));
        }
        let book_handle = self.library.find_book_by_isbn(&loan.isbn).ok_or_else(|| {
            LibraryError::not_found(format!("The catalog has no book {}.", loan.isbn))
        })?;

        let now = self.clock.now();
        let elapsed_days = loan.borrowed.whole_days_until(&now).unwrap_or_else(|| {
            warn!(isbn = %loan.isbn, "loan has an unreadable borrow time; treating as same-day");
            0
        });
        let overdue_days = (elapsed_days - i64::from(loan.loan_days)).max(0);
        let fee = i32::try_from(overdue_days.saturating_mul(OVERDUE_FEE_PER_DAY))
            .unwrap_or(i32::MAX);

        if let Some(loan) = self.library.loan_mut(loan_handle) {
            loan.returned = Some(now);
        }
        let balance = match self.library.account_mut(session.account) {
            Some(account) => {
                account.balance = account.balance.saturating_sub(fee);
                account.balance
            }
            None => 0,
        };
        if let Some(book) = self.library.book_mut(book_handle) {
            book.stock = book.stock.saturating_add(1);
        }

        if overdue_days > 0 {
            info!(borrower_id = actor_id, overdue_days, fee, balance, "overdue return charged");
        } else {
            info!(borrower_id = actor_id, elapsed_days, "book returned");
        }
        Ok(ReturnReceipt {
            elapsed_days,
            overdue_days,
            fee,
            balance,
        })
    }

    /// Loans the session may look at.
    pub fn loan_records(&self, session: &Session) -> Result<LoanListing<'_>> {
        let account = self.session_account(session)?;
        if require_service(account.group, Permission::RECORD_SERVICE) {
            Ok(LoanListing {
                full_ledger: true,
                loans: self.library.loans().collect(),
            })
        } else {
            Ok(LoanListing {
                full_ledger: false,
                loans: self.library.active_loans_of(account.id),
            })
        }
    }
}
