use chrono::{Duration, NaiveDate};
use library_desk::desk::OVERDUE_FEE_PER_DAY;
use library_desk::{Desk, Library, LibraryError, ManualClock, Clock};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn desk() -> Desk<ManualClock> {
    let clock = ManualClock::new(
        NaiveDate::from_ymd_opt(2024, 6, 3)
            .and_then(|d| d.and_hms_opt(11, 0, 0))
            .unwrap(),
    );
    let library = Library::with_admin(clock.now());
    Desk::new(library, clock)
}

#[test]
fn a_late_return_puts_the_reader_in_debt_until_they_recharge() {
    let mut desk = desk();
    let mut rng = StdRng::seed_from_u64(7);
    desk.register("reader", "pw", "pw", &mut rng).unwrap();

    let admin = desk.login("admin", "admin").unwrap();
    desk.add_book(&admin, "111", "Dune", "Herbert", 2).unwrap();

    let reader = desk.login("reader", "pw").unwrap();
    let loan = desk.borrow(&reader, "111", 3).unwrap();
    assert_eq!(desk.library().book_by_isbn("111").unwrap().stock, 1);

    desk.clock().advance(Duration::days(8));
    let receipt = desk.return_loan(&reader, loan).unwrap();
    assert_eq!(receipt.elapsed_days, 8);
    assert_eq!(receipt.overdue_days, 5);
    assert_eq!(i64::from(receipt.fee), 5 * OVERDUE_FEE_PER_DAY);
    assert_eq!(receipt.balance, -150);
    assert_eq!(desk.library().book_by_isbn("111").unwrap().stock, 2);

    assert!(matches!(
        desk.borrow(&reader, "111", 3),
        Err(LibraryError::PreconditionFailed(_))
    ));
    assert!(matches!(
        desk.cancel_account(&reader),
        Err(LibraryError::PreconditionFailed(_))
    ));

    assert_eq!(desk.recharge(&reader, 200).unwrap(), 50);
    assert!(desk.borrow(&reader, "111", 3).is_ok());
}

#[test]
fn readers_see_only_their_own_open_loans() {
    let mut desk = desk();
    let mut rng = StdRng::seed_from_u64(9);
    desk.register("ann", "pw", "pw", &mut rng).unwrap();
    desk.register("bob", "pw", "pw", &mut rng).unwrap();

    let admin = desk.login("admin", "admin").unwrap();
    desk.add_book(&admin, "111", "Dune", "Herbert", 5).unwrap();

    let ann = desk.login("ann", "pw").unwrap();
    let bob = desk.login("bob", "pw").unwrap();
    let first = desk.borrow(&ann, "111", 10).unwrap();
    desk.borrow(&ann, "111", 10).unwrap();
    desk.borrow(&bob, "111", 10).unwrap();
    desk.return_loan(&ann, first).unwrap();

    let listing = desk.loan_records(&ann).unwrap();
    assert!(!listing.full_ledger);
    assert_eq!(listing.loans.len(), 1);

    let ann_id = desk.session_account(&ann).unwrap().id;
    let bob_id = desk.session_account(&bob).unwrap().id;
    let ledger = desk.loan_records(&admin).unwrap();
    assert!(ledger.full_ledger);
    let rows: Vec<_> = ledger
        .loans
        .iter()
        .map(|(handle, loan)| (*handle, loan.borrower_id, loan.is_active()))
        .collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], (first, ann_id, false));
    assert_eq!((rows[1].1, rows[1].2), (ann_id, true));
    assert_eq!((rows[2].1, rows[2].2), (bob_id, true));

    assert!(matches!(
        desk.return_loan(&bob, first),
        Err(LibraryError::PreconditionFailed(_))
    ));
}
