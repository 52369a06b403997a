//! Domain records that mirror the fixed-width rows of the database file and get
//! passed between the record stores, the lending rules and the TUI. The types
//! stay light-weight data holders; the byte layout lives in `db::codec`.

use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeZone, Timelike};

use crate::store::Handle;

/// Byte capacity (terminator included) of the account name field.
pub const ACCOUNT_NAME_CAPACITY: usize = 16;
/// Byte capacity (terminator included) of the password field.
pub const PASSWORD_CAPACITY: usize = 16;
/// Byte capacity (terminator included) of an ISBN field.
pub const ISBN_CAPACITY: usize = 24;
/// Byte capacity (terminator included) of the author field.
pub const AUTHOR_CAPACITY: usize = 32;
/// Byte capacity (terminator included) of the title field.
pub const TITLE_CAPACITY: usize = 64;

/// Id of the bootstrap administrator seeded into every fresh database.
pub const ADMIN_ID: u32 = 1;

/// Seven-field wall-clock reading in local time.
///
/// `weekday` counts from Sunday = 1 to Saturday = 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timestamp {
    pub year: i16,
    pub month: i8,
    pub day: i8,
    pub weekday: i8,
    pub hour: i8,
    pub minute: i8,
    pub second: i8,
}

impl Timestamp {
    /// Year value that marks "no timestamp" inside the on-disk loan record.
    pub const SENTINEL_YEAR: i16 = -1;

    /// The on-disk stand-in for a missing return time.
    pub const fn sentinel() -> Self {
        Self {
            year: Self::SENTINEL_YEAR,
            month: 0,
            day: 0,
            weekday: 0,
            hour: 0,
            minute: 0,
            second: 0,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.year == Self::SENTINEL_YEAR
    }

    /// Break a naive local date-time into its seven display fields.
    pub fn from_naive(moment: NaiveDateTime) -> Self {
        Self {
            year: moment.year() as i16,
            month: moment.month() as i8,
            day: moment.day() as i8,
            weekday: moment.weekday().number_from_sunday() as i8,
            hour: moment.hour() as i8,
            minute: moment.minute() as i8,
            second: moment.second() as i8,
        }
    }

    /// Capture a zoned date-time using its local wall-clock fields.
    pub fn from_datetime<Tz: TimeZone>(moment: &chrono::DateTime<Tz>) -> Self {
        Self::from_naive(moment.naive_local())
    }

    /// Rebuild the date-time, or `None` when the fields do not form a valid
    /// calendar reading (the sentinel included).
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        if self.is_sentinel() {
            return None;
        }
        let date = NaiveDate::from_ymd_opt(
            i32::from(self.year),
            u32::try_from(self.month).ok()?,
            u32::try_from(self.day).ok()?,
        )?;
        date.and_hms_opt(
            u32::try_from(self.hour).ok()?,
            u32::try_from(self.minute).ok()?,
            u32::try_from(self.second).ok()?,
        )
    }

    /// Whole days between `self` and a later reading, truncated toward zero.
    pub fn whole_days_until(&self, later: &Timestamp) -> Option<i64> {
        let begin = self.to_naive()?;
        let end = later.to_naive()?;
        Some((end - begin).num_seconds() / 86_400)
    }

    pub fn date_string(&self) -> String {
        format!("{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Permission group an account belongs to. The discriminants are the values
/// stored in the database file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserGroup {
    User = 0,
    Manager = 1,
    Admin = 2,
}

impl UserGroup {
    pub const ALL: [UserGroup; 3] = [UserGroup::User, UserGroup::Manager, UserGroup::Admin];

    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(UserGroup::User),
            1 => Some(UserGroup::Manager),
            2 => Some(UserGroup::Admin),
            _ => None,
        }
    }

    pub fn as_raw(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for UserGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UserGroup::User => "User",
            UserGroup::Manager => "Manager",
            UserGroup::Admin => "Admin",
        };
        f.write_str(label)
    }
}

/// A registered account. The password is kept and compared as plaintext, which
/// is how existing database files store it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub group: UserGroup,
    pub name: String,
    pub password: String,
    /// Fingerprint of `name`, checked before the exact name comparison.
    pub hash: u32,
    pub id: u32,
    /// Balance in cents. Negative means the account owes overdue fees.
    pub balance: i32,
    pub registered: Timestamp,
}

impl AccountRecord {
    pub fn is_bootstrap_admin(&self) -> bool {
        self.id == ADMIN_ID
    }

    pub fn in_debt(&self) -> bool {
        self.balance < 0
    }
}

/// A catalogued title together with the number of copies on the shelf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookRecord {
    pub stock: u64,
    pub isbn: String,
    pub author: String,
    pub title: String,
    pub introduced: Timestamp,
}

/// Lifecycle position of a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanState {
    Active,
    Returned,
}

/// One borrow of one copy. `returned` stays `None` while the copy is out and
/// is set exactly once when it comes back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanRecord {
    pub isbn: String,
    pub loan_days: u32,
    pub borrower_id: u32,
    pub borrowed: Timestamp,
    pub returned: Option<Timestamp>,
}

impl LoanRecord {
    pub fn state(&self) -> LoanState {
        if self.returned.is_some() {
            LoanState::Returned
        } else {
            LoanState::Active
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == LoanState::Active
    }
}

/// Capability token for an authenticated account: which account is acting and
/// when the login happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub account: Handle<AccountRecord>,
    pub established: Timestamp,
}

/// Format a cent balance as currency units with two decimals.
pub fn format_money(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}
