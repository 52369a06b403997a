//! Loan ledger queries. Loans are append-only; the only mutation after borrow
//! is stamping the return time.

use crate::models::LoanRecord;
use crate::store::Handle;

use super::Library;

impl Library {
    pub fn loan(&self, handle: Handle<LoanRecord>) -> Option<&LoanRecord> {
        self.loans.get(handle)
    }

    pub(crate) fn loan_mut(&mut self, handle: Handle<LoanRecord>) -> Option<&mut LoanRecord> {
        self.loans.get_mut(handle)
    }

    pub fn loans(&self) -> impl Iterator<Item = (Handle<LoanRecord>, &LoanRecord)> + '_ {
        self.loans.entries()
    }

    pub(crate) fn insert_loan(&mut self, loan: LoanRecord) -> Handle<LoanRecord> {
        self.loans.append(loan)
    }

    /// Active loans of one borrower, oldest first.
    pub fn active_loans_of(&self, borrower_id: u32) -> Vec<(Handle<LoanRecord>, &LoanRecord)> {
        self.loans
            .entries()
            .filter(|(_, loan)| loan.borrower_id == borrower_id && loan.is_active())
            .collect()
    }

    pub fn active_loan_count(&self, borrower_id: u32) -> usize {
        self.loans
            .iter()
            .filter(|loan| loan.borrower_id == borrower_id && loan.is_active())
            .count()
    }
}
