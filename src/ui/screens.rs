use crate::db::{AccountSummary, Library};
use crate::desk::LoanListing;
use crate::models::{BookRecord, LoanRecord, Timestamp};
use crate::store::Handle;

use super::helpers::step_selection;

/// Catalog listing, either the full catalog or the result of a search.
pub(crate) struct BookScreen {
    pub(crate) books: Vec<BookRecord>,
    pub(crate) heading: String,
    pub(crate) selected: usize,
}

impl BookScreen {
    pub(crate) fn new(books: Vec<BookRecord>, heading: impl Into<String>) -> Self {
        Self {
            books,
            heading: heading.into(),
            selected: 0,
        }
    }

    pub(crate) fn all(library: &Library) -> Self {
        Self::new(library.books().cloned().collect(), "Catalog")
    }

    pub(crate) fn move_selection(&mut self, delta: isize) {
        self.selected = step_selection(self.selected, self.books.len(), delta);
    }

    pub(crate) fn current(&self) -> Option<&BookRecord> {
        self.books.get(self.selected)
    }
}

/// A loan joined with the book and borrower it refers to.
pub(crate) struct LoanRow {
    pub(crate) handle: Handle<LoanRecord>,
    pub(crate) isbn: String,
    pub(crate) title: String,
    pub(crate) author: String,
    pub(crate) borrower: String,
    pub(crate) loan_days: u32,
    pub(crate) borrowed: Timestamp,
    pub(crate) returned: Option<Timestamp>,
}

impl LoanRow {
    fn from_loan(library: &Library, handle: Handle<LoanRecord>, loan: &LoanRecord) -> Self {
        let book = library.book_by_isbn(&loan.isbn);
        let borrower = library
            .find_account_by_id(loan.borrower_id)
            .and_then(|account| library.account(account))
            .map(|account| account.name.clone())
            .unwrap_or_else(|| format!("#{}", loan.borrower_id));
        Self {
            handle,
            isbn: loan.isbn.clone(),
            title: book.map(|b| b.title.clone()).unwrap_or_default(),
            author: book.map(|b| b.author.clone()).unwrap_or_default(),
            borrower,
            loan_days: loan.loan_days,
            borrowed: loan.borrowed,
            returned: loan.returned,
        }
    }
}

/// Either the whole ledger (record keepers) or the caller's open loans.
pub(crate) struct LoanScreen {
    pub(crate) rows: Vec<LoanRow>,
    pub(crate) full_ledger: bool,
    pub(crate) selected: usize,
}

impl LoanScreen {
    pub(crate) fn from_listing(library: &Library, listing: LoanListing<'_>) -> Self {
        let rows = listing
            .loans
            .into_iter()
            .map(|(handle, loan)| LoanRow::from_loan(library, handle, loan))
            .collect();
        Self {
            rows,
            full_ledger: listing.full_ledger,
            selected: 0,
        }
    }

    pub(crate) fn move_selection(&mut self, delta: isize) {
        self.selected = step_selection(self.selected, self.rows.len(), delta);
    }

    pub(crate) fn current(&self) -> Option<&LoanRow> {
        self.rows.get(self.selected)
    }
}

/// Administrator's account table.
pub(crate) struct AccountScreen {
    pub(crate) rows: Vec<AccountSummary>,
    pub(crate) selected: usize,
}

impl AccountScreen {
    pub(crate) fn new(rows: Vec<AccountSummary>) -> Self {
        Self { rows, selected: 0 }
    }

    /// Keep the highlight in range after the table was reloaded.
    pub(crate) fn reload(&mut self, rows: Vec<AccountSummary>) {
        self.rows = rows;
        self.selected = self.selected.min(self.rows.len().saturating_sub(1));
    }

    pub(crate) fn move_selection(&mut self, delta: isize) {
        self.selected = step_selection(self.selected, self.rows.len(), delta);
    }

    pub(crate) fn current(&self) -> Option<&AccountSummary> {
        self.rows.get(self.selected)
    }
}
