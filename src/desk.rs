//! Business rules layered over the record tables: lending, membership and
//! catalog upkeep. Every operation that needs an identity takes the caller's
//! [`Session`] explicitly and answers with a `Result` whose error text is ready
//! to show to the user.

use std::path::Path;

use crate::clock::{Clock, SystemClock};
use crate::db::Library;
use crate::error::{LibraryError, Result};
use crate::models::{AccountRecord, Session};

mod catalog;
mod lending;
mod membership;

pub use catalog::Stocking;
pub use lending::{LoanListing, ReturnReceipt, OVERDUE_FEE_PER_DAY};
pub use membership::{Datacard, ID_DRAW_MAX, RESET_PASSWORD};

/// The library as the rules see it: the loaded tables plus the clock used to
/// stamp every change.
#[derive(Debug)]
pub struct Desk<C: Clock = SystemClock> {
    library: Library,
    clock: C,
}

impl<C: Clock> Desk<C> {
    pub fn new(library: Library, clock: C) -> Self {
        Self { library, clock }
    }

    /// Open (or create) the database file and wrap it.
    pub fn open(path: &Path, clock: C) -> Result<Self> {
        let library = Library::open(path, &clock)?;
        Ok(Self::new(library, clock))
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn export(&self, path: &Path) -> Result<()> {
        self.library.export(path)
    }

    pub fn close(self) {
        self.library.close();
    }

    /// The account behind a session, or `NotFound` once it has been cancelled.
    pub fn session_account(&self, session: &Session) -> Result<&AccountRecord> {
        self.library
            .account(session.account)
            .ok_or_else(|| LibraryError::not_found("The signed-in account no longer exists."))
    }
}
