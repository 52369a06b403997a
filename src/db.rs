//! Persistence for the flat `librecords.db` file and the three record tables it
//! holds. The whole file is read into memory on open and written back in one
//! pass on export; nothing is persisted in between.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{LibraryError, Result};
use crate::models::{AccountRecord, BookRecord, LoanRecord, Timestamp, UserGroup, ADMIN_ID};
use crate::store::RecordStore;

mod accounts;
mod books;
pub mod codec;
mod loans;

pub use accounts::{credential_hash, AccountSummary};
pub use codec::Header;

use codec::{
    decode_account, decode_book, decode_header, decode_loan, encode_account, encode_book,
    encode_header, encode_loan, fit_record, ACCOUNT_RECORD_SIZE, BOOK_RECORD_SIZE, HEADER_SIZE,
    LOAN_RECORD_SIZE,
};

/// Name and password of the administrator seeded into a fresh database.
pub const BOOTSTRAP_ADMIN_NAME: &str = "admin";
pub const BOOTSTRAP_ADMIN_PASSWORD: &str = "admin";

/// In-memory image of the database file.
#[derive(Debug)]
pub struct Library {
    header: Header,
    accounts: RecordStore<AccountRecord>,
    books: RecordStore<BookRecord>,
    loans: RecordStore<LoanRecord>,
}

impl Library {
    /// Empty library holding only the bootstrap administrator.
    pub fn with_admin(now: Timestamp) -> Self {
        let mut accounts = RecordStore::new();
        accounts.append(AccountRecord {
            group: UserGroup::Admin,
            name: BOOTSTRAP_ADMIN_NAME.to_string(),
            password: BOOTSTRAP_ADMIN_PASSWORD.to_string(),
            hash: credential_hash(BOOTSTRAP_ADMIN_NAME),
            id: ADMIN_ID,
            balance: 0,
            registered: now,
        });
        Self::from_stores(accounts, RecordStore::new(), RecordStore::new())
    }

    pub fn from_stores(
        accounts: RecordStore<AccountRecord>,
        books: RecordStore<BookRecord>,
        loans: RecordStore<LoanRecord>,
    ) -> Self {
        let header = Header::current(0, 0, 0);
        Self {
            header,
            accounts,
            books,
            loans,
        }
    }

    /// Load the database at `path`, creating and seeding it when it does not
    /// exist yet.
    pub fn open(path: &Path, clock: &dyn Clock) -> Result<Self> {
        let exists = path
            .try_exists()
            .map_err(|err| LibraryError::io("failed to probe database file", err))?;
        if exists {
            Self::load(path)
        } else {
            Self::create(path, clock)
        }
    }

    fn create(path: &Path, clock: &dyn Clock) -> Result<Self> {
        let library = Self::with_admin(clock.now());
        library.export(path)?;
        info!(path = %path.display(), "created database with bootstrap administrator");
        Ok(library)
    }

    fn load(path: &Path) -> Result<Self> {
        let file =
            File::open(path).map_err(|err| LibraryError::io("failed to open database file", err))?;
        let mut reader = BufReader::new(file);

        let mut raw_header = [0u8; HEADER_SIZE];
        read_block(&mut reader, &mut raw_header, "header")?;
        let mut header = decode_header(&raw_header);

        if !header.matches_current_layout() {
            warn!(
                stored_account = header.account_record_size,
                stored_book = header.book_record_size,
                stored_loan = header.loan_record_size,
                "record sizes differ from the current layout; loading anyway"
            );
        }

        let mut accounts = RecordStore::new();
        let mut raw = vec![0u8; usize::from(header.account_record_size)];
        for _ in 0..header.account_count {
            read_block(&mut reader, &mut raw, "account record")?;
            accounts.append(decode_account(&fit_record::<ACCOUNT_RECORD_SIZE>(&raw))?);
        }

        let mut books = RecordStore::new();
        let mut raw = vec![0u8; usize::from(header.book_record_size)];
        for _ in 0..header.book_count {
            read_block(&mut reader, &mut raw, "book record")?;
            books.append(decode_book(&fit_record::<BOOK_RECORD_SIZE>(&raw))?);
        }

        let mut loans = RecordStore::new();
        let mut raw = vec![0u8; usize::from(header.loan_record_size)];
        for _ in 0..header.loan_count {
            read_block(&mut reader, &mut raw, "loan record")?;
            loans.append(decode_loan(&fit_record::<LOAN_RECORD_SIZE>(&raw))?);
        }

        header.restamp();
        info!(
            path = %path.display(),
            accounts = accounts.len(),
            books = books.len(),
            loans = loans.len(),
            "loaded database"
        );

        Ok(Self {
            header,
            accounts,
            books,
            loans,
        })
    }

    /// Replace `path` with the header followed by every account, book and
    /// loan in order. The image is encoded in full and written to a sibling
    /// file first; `path` is only touched by the final rename.
    pub fn export(&self, path: &Path) -> Result<()> {
        let header = self.header()?;
        let image = self.encode_image(&header)?;

        let staging = staging_path(path);
        let mut file = File::create(&staging)
            .map_err(|err| LibraryError::io("failed to create staging file", err))?;
        if let Err(err) = file.write_all(&image).and_then(|()| file.sync_all()) {
            drop(file);
            let _ = fs::remove_file(&staging);
            return Err(LibraryError::io("failed to write database file", err));
        }
        drop(file);
        fs::rename(&staging, path)
            .map_err(|err| LibraryError::io("failed to replace database file", err))?;

        debug!(
            path = %path.display(),
            accounts = header.account_count,
            books = header.book_count,
            loans = header.loan_count,
            "exported database"
        );
        Ok(())
    }

    fn encode_image(&self, header: &Header) -> Result<Vec<u8>> {
        let mut image = Vec::with_capacity(
            HEADER_SIZE
                + self.accounts.len() * ACCOUNT_RECORD_SIZE
                + self.books.len() * BOOK_RECORD_SIZE
                + self.loans.len() * LOAN_RECORD_SIZE,
        );
        image.extend_from_slice(&encode_header(header));
        for account in self.accounts.iter() {
            image.extend_from_slice(&encode_account(account)?);
        }
        for book in self.books.iter() {
            image.extend_from_slice(&encode_book(book)?);
        }
        for loan in self.loans.iter() {
            image.extend_from_slice(&encode_loan(loan)?);
        }
        Ok(image)
    }

    /// Release the in-memory tables.
    pub fn close(self) {
        debug!("closing database");
    }

    /// Header as it would be written now: current record sizes and live counts.
    pub fn header(&self) -> Result<Header> {
        let mut header = self.header;
        header.restamp();
        header.account_count = count(self.accounts.len())?;
        header.book_count = count(self.books.len())?;
        header.loan_count = count(self.loans.len())?;
        Ok(header)
    }

    pub fn account_store(&self) -> &RecordStore<AccountRecord> {
        &self.accounts
    }

    pub fn book_store(&self) -> &RecordStore<BookRecord> {
        &self.books
    }

    pub fn loan_store(&self) -> &RecordStore<LoanRecord> {
        &self.loans
    }
}

/// `librecords.db` is staged as `librecords.db.tmp` next to it.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn count(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| LibraryError::invalid("too many records to store"))
}

fn read_block(reader: &mut impl Read, buf: &mut [u8], what: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|err| {
        if err.kind() == ErrorKind::UnexpectedEof {
            LibraryError::io(format!("database file ends inside a {what}"), err)
        } else {
            LibraryError::io(format!("failed to read {what}"), err)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::NaiveDate;

    fn clock() -> ManualClock {
        ManualClock::new(
            NaiveDate::from_ymd_opt(2024, 3, 1)
                .and_then(|d| d.and_hms_opt(8, 0, 0))
                .unwrap(),
        )
    }

    #[test]
    fn missing_file_is_created_with_the_administrator() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("librecords.db");

        let library = Library::open(&path, &clock()).unwrap();
        let admin = library.account_store().iter().next().unwrap();
        assert_eq!(admin.id, ADMIN_ID);
        assert_eq!(admin.group, UserGroup::Admin);
        assert_eq!(admin.name, BOOTSTRAP_ADMIN_NAME);
        assert_eq!(admin.balance, 0);

        let bytes = fs::read(&path).unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE + ACCOUNT_RECORD_SIZE);
        let mut raw_header = [0u8; HEADER_SIZE];
        raw_header.copy_from_slice(&bytes[..HEADER_SIZE]);
        let header = decode_header(&raw_header);
        assert_eq!(header, Header::current(1, 0, 0));
    }

    #[test]
    fn truncated_file_is_an_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("librecords.db");
        let header = Header::current(2, 0, 0);
        fs::write(&path, encode_header(&header)).unwrap();

        let err = Library::open(&path, &clock()).unwrap_err();
        assert!(err.is_io(), "{err}");
    }

    #[test]
    fn foreign_record_sizes_are_restamped_not_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("librecords.db");

        let mut header = Header::current(0, 1, 0);
        header.book_record_size = (BOOK_RECORD_SIZE + 8) as u16;
        let book = BookRecord {
            stock: 2,
            isbn: "111".into(),
            author: "A".into(),
            title: "T".into(),
            introduced: clock().now(),
        };
        let mut bytes = encode_header(&header).to_vec();
        bytes.extend_from_slice(&encode_book(&book).unwrap());
        bytes.extend_from_slice(&[0xAA; 8]);
        fs::write(&path, bytes).unwrap();

        let library = Library::open(&path, &clock()).unwrap();
        assert_eq!(library.book_store().iter().next(), Some(&book));
        assert!(library.header().unwrap().matches_current_layout());
    }

    #[test]
    fn failed_export_leaves_the_previous_file_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("librecords.db");
        let mut library = Library::open(&path, &clock()).unwrap();
        let before = fs::read(&path).unwrap();

        library.accounts.append(AccountRecord {
            group: UserGroup::User,
            name: "x".repeat(40),
            password: "pw".into(),
            hash: credential_hash("x"),
            id: 9,
            balance: 0,
            registered: clock().now(),
        });
        assert!(matches!(
            library.export(&path),
            Err(LibraryError::InvalidInput(_))
        ));
        assert_eq!(fs::read(&path).unwrap(), before);
        assert!(!staging_path(&path).exists());
    }

    #[test]
    fn non_utf8_legacy_name_refuses_to_load_without_touching_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("librecords.db");
        let admin = Library::with_admin(clock().now());
        let legacy = AccountRecord {
            group: UserGroup::User,
            name: "placeholder".into(),
            password: "pw".into(),
            hash: 0,
            id: 7,
            balance: 0,
            registered: clock().now(),
        };
        let mut legacy_bytes = encode_account(&legacy).unwrap();
        legacy_bytes[4..20].fill(0);
        legacy_bytes[4..14]
            .copy_from_slice(&[0xd5, 0xc5, 0xc8, 0xfd, 0xc0, 0xee, 0xcb, 0xc4, 0xcd, 0xf5]);

        let mut bytes = encode_header(&Header::current(2, 0, 0)).to_vec();
        for account in admin.account_store().iter() {
            bytes.extend_from_slice(&encode_account(account).unwrap());
        }
        bytes.extend_from_slice(&legacy_bytes);
        fs::write(&path, &bytes).unwrap();

        let err = Library::open(&path, &clock()).unwrap_err();
        assert!(matches!(err, LibraryError::Corrupt(_)));
        assert_eq!(fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn export_replaces_the_file_and_cleans_up_staging() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("librecords.db");
        let mut library = Library::open(&path, &clock()).unwrap();
        library.books.append(BookRecord {
            stock: 1,
            isbn: "111".into(),
            author: "A".into(),
            title: "T".into(),
            introduced: clock().now(),
        });
        library.export(&path).unwrap();

        assert_eq!(
            fs::metadata(&path).unwrap().len(),
            (HEADER_SIZE + ACCOUNT_RECORD_SIZE + BOOK_RECORD_SIZE) as u64
        );
        assert!(!staging_path(&path).exists());
        assert_eq!(Library::open(&path, &clock()).unwrap().book_store().len(), 1);
    }
}
