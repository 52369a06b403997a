//! Catalog upkeep. Books are introduced once and restocked afterwards; they are
//! never removed.

use tracing::info;

use crate::access::{check_access, require_service, Permission};
use crate::clock::Clock;
use crate::db::codec::check_field;
use crate::error::{LibraryError, Result};
use crate::models::{BookRecord, Session, AUTHOR_CAPACITY, ISBN_CAPACITY, TITLE_CAPACITY};
use crate::store::Handle;

use super::Desk;

/// How [`Desk::add_book`] changed the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stocking {
    Introduced(Handle<BookRecord>),
    Restocked { book: Handle<BookRecord>, stock: u64 },
}

impl<C: Clock> Desk<C> {
    /// Introduce a new title, or add copies to one already catalogued under
    /// the same ISBN, title and author.
    pub fn add_book(
        &mut self,
        session: &Session,
        isbn: &str,
        title: &str,
        author: &str,
        copies: i64,
    ) -> Result<Stocking> {
        let group = self.session_account(session)?.group;
        if !require_service(group, Permission::LIBRARY_SERVICE) {
            return Err(LibraryError::denied(
                "Library service is not available to this account.",
            ));
        }
        if !check_access(group, Permission::ADD_BOOK) {
            return Err(LibraryError::denied("This account may not add books."));
        }
        if isbn.is_empty() {
            return Err(LibraryError::invalid("ISBN is required."));
        }
        check_field("ISBN", isbn, ISBN_CAPACITY)?;
        check_field("Title", title, TITLE_CAPACITY)?;
        check_field("Author", author, AUTHOR_CAPACITY)?;

        let existing = self.library.find_book_by_isbn(isbn);
        if let Some(book) = existing.and_then(|handle| self.library.book(handle)) {
            if book.title != title || book.author != author {
                return Err(LibraryError::conflict(format!(
                    "ISBN {isbn} is already catalogued as \"{}\" by {}.",
                    book.title, book.author
                )));
            }
        }
        if copies <= 0 {
            return Err(LibraryError::invalid("Add at least one copy."));
        }
        let copies = u64::try_from(copies)
            .map_err(|_| LibraryError::invalid("Add at least one copy."))?;

        match existing {
            Some(handle) => {
                let book = self
                    .library
                    .book_mut(handle)
                    .ok_or_else(|| LibraryError::not_found(format!("No book with ISBN {isbn}.")))?;
                book.stock = book
                    .stock
                    .checked_add(copies)
                    .ok_or_else(|| LibraryError::invalid("Stock count would overflow."))?;
                info!(isbn, copies, stock = book.stock, "book restocked");
                Ok(Stocking::Restocked {
                    book: handle,
                    stock: book.stock,
                })
            }
            None => {
                let handle = self.library.insert_book(BookRecord {
                    stock: copies,
                    isbn: isbn.to_string(),
                    author: author.to_string(),
                    title: title.to_string(),
                    introduced: self.clock.now(),
                });
                info!(isbn, copies, "book introduced");
                Ok(Stocking::Introduced(handle))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::clock::ManualClock;
    use crate::db::{credential_hash, Library};
    use crate::models::{AccountRecord, Timestamp, UserGroup};

    fn setup() -> (Desk<ManualClock>, Session, Session, Session) {
        let clock = ManualClock::new(
            NaiveDate::from_ymd_opt(2024, 1, 15)
                .and_then(|d| d.and_hms_opt(14, 0, 0))
                .unwrap(),
        );
        let now = clock.now();
        let mut library = Library::with_admin(now);
        let mut session_for = |name: &str, id: u32, group: UserGroup| {
            let account = library.insert_account(AccountRecord {
                group,
                name: name.into(),
                password: "pw".into(),
                hash: credential_hash(name),
                id,
                balance: 0,
                registered: Timestamp::default(),
            });
            Session {
                account,
                established: now,
            }
        };
        let user = session_for("user", 20, UserGroup::User);
        let manager = session_for("manager", 21, UserGroup::Manager);
        let admin = session_for("root", 22, UserGroup::Admin);
        (Desk::new(library, clock), user, manager, admin)
    }

    #[test]
    fn manager_introduces_then_restocks() {
        let (mut desk, _, manager, _) = setup();
        let added = desk.add_book(&manager, "111", "Dune", "Herbert", 2).unwrap();
        let Stocking::Introduced(handle) = added else {
            panic!("expected a new title, got {added:?}");
        };
        let book = desk.library().book(handle).unwrap();
        assert_eq!(book.stock, 2);
        assert_eq!(book.introduced, desk.clock().now());

        let again = desk.add_book(&manager, "111", "Dune", "Herbert", 3).unwrap();
        assert_eq!(
            again,
            Stocking::Restocked {
                book: handle,
                stock: 5
            }
        );
        assert_eq!(desk.library().book_store().len(), 1);
    }

    #[test]
    fn conflicting_details_are_refused() {
        let (mut desk, _, _, admin) = setup();
        desk.add_book(&admin, "111", "Dune", "Herbert", 1).unwrap();
        let err = desk
            .add_book(&admin, "111", "Dune Messiah", "Herbert", 1)
            .unwrap_err();
        assert!(matches!(err, LibraryError::Conflict(_)));
        assert_eq!(desk.library().book_by_isbn("111").unwrap().stock, 1);
    }

    #[test]
    fn users_cannot_add_books() {
        let (mut desk, user, _, _) = setup();
        assert!(matches!(
            desk.add_book(&user, "111", "Dune", "Herbert", 1),
            Err(LibraryError::PermissionDenied(_))
        ));
        assert!(desk.library().book_store().is_empty());
    }

    #[test]
    fn copies_and_field_lengths_are_validated() {
        let (mut desk, _, manager, _) = setup();
        assert!(matches!(
            desk.add_book(&manager, "111", "Dune", "Herbert", 0),
            Err(LibraryError::InvalidInput(_))
        ));
        let long_isbn = "9".repeat(ISBN_CAPACITY);
        assert!(matches!(
            desk.add_book(&manager, &long_isbn, "Dune", "Herbert", 1),
            Err(LibraryError::InvalidInput(_))
        ));
        assert!(desk.library().book_store().is_empty());
    }
}
