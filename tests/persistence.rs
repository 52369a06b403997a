use std::fs;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use library_desk::db::codec::{ACCOUNT_RECORD_SIZE, BOOK_RECORD_SIZE, HEADER_SIZE, LOAN_RECORD_SIZE};
use library_desk::{Clock, Desk, Library, LibraryError, ManualClock};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::tempdir;

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 10)
        .and_then(|d| d.and_hms_opt(9, 30, 15))
        .unwrap()
}

fn snapshot(library: &Library) -> (Vec<String>, Vec<String>, Vec<String>) {
    (
        library.account_store().iter().map(|a| format!("{a:?}")).collect(),
        library.book_store().iter().map(|b| format!("{b:?}")).collect(),
        library.loan_store().iter().map(|l| format!("{l:?}")).collect(),
    )
}

#[test]
fn a_fresh_file_holds_only_the_administrator() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("librecords.db");

    let desk = Desk::open(&path, ManualClock::new(start())).unwrap();
    assert_eq!(desk.library().account_store().len(), 1);
    assert_eq!(
        fs::metadata(&path).unwrap().len(),
        (HEADER_SIZE + ACCOUNT_RECORD_SIZE) as u64
    );
    assert!(desk.login("admin", "admin").is_ok());
}

#[test]
fn records_survive_export_and_reload_in_order() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("librecords.db");
    let mut rng = StdRng::seed_from_u64(42);

    let mut desk = Desk::open(&path, ManualClock::new(start())).unwrap();
    for name in ["ada", "brook", "cyd"] {
        desk.register(name, "secret", "secret", &mut rng).unwrap();
    }
    let admin = desk.login("admin", "admin").unwrap();
    desk.add_book(&admin, "978-0", "Dune", "Frank Herbert", 3).unwrap();
    desk.add_book(&admin, "978-1", "Emma", "Jane Austen", 1).unwrap();

    let ada = desk.login("ada", "secret").unwrap();
    let brook = desk.login("brook", "secret").unwrap();
    let kept = desk.borrow(&ada, "978-0", 14).unwrap();
    desk.clock().advance(Duration::hours(30));
    let returned = desk.borrow(&brook, "978-1", 7).unwrap();
    desk.clock().advance(Duration::days(2));
    desk.return_loan(&brook, returned).unwrap();

    // Cancelling from the middle must not reorder the remaining accounts.
    let cyd = desk.login("cyd", "secret").unwrap();
    desk.cancel_account(&cyd).unwrap();

    let before = snapshot(desk.library());
    assert!(desk.library().loan(kept).is_some());
    desk.export(&path).unwrap();
    assert_eq!(
        fs::metadata(&path).unwrap().len(),
        (HEADER_SIZE + 3 * ACCOUNT_RECORD_SIZE + 2 * BOOK_RECORD_SIZE + 2 * LOAN_RECORD_SIZE)
            as u64
    );
    desk.close();

    let reopened = Desk::open(&path, ManualClock::new(start())).unwrap();
    assert_eq!(snapshot(reopened.library()), before);

    let library = reopened.library();
    let loans: Vec<_> = library.loans().map(|(_, loan)| loan.clone()).collect();
    assert!(loans[0].returned.is_none());
    assert!(loans[1].returned.is_some());
    assert_eq!(library.book_by_isbn("978-0").unwrap().stock, 2);
    assert_eq!(library.book_by_isbn("978-1").unwrap().stock, 1);
    assert!(reopened.login("ada", "secret").is_ok());
    assert!(reopened.login("cyd", "secret").is_err());
}

#[test]
fn a_truncated_file_is_an_io_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("librecords.db");
    Desk::open(&path, ManualClock::new(start())).unwrap();

    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..HEADER_SIZE + 10]).unwrap();

    let err = Desk::open(&path, ManualClock::new(start())).unwrap_err();
    assert!(matches!(err, LibraryError::Io { .. }));
}

#[test]
fn stamps_are_written_with_the_clock_time() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("librecords.db");
    let clock = ManualClock::new(start());
    let stamp = clock.now();

    let mut desk = Desk::open(&path, clock).unwrap();
    let admin = desk.login("admin", "admin").unwrap();
    desk.add_book(&admin, "978-0", "Dune", "Frank Herbert", 1).unwrap();
    desk.export(&path).unwrap();

    let reopened = Desk::open(&path, ManualClock::new(start())).unwrap();
    let book = reopened.library().book_by_isbn("978-0").unwrap();
    assert_eq!(book.introduced, stamp);
    assert_eq!(book.introduced.to_string(), stamp.to_string());
}
