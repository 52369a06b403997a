//! Fixed-width little-endian encoding of the database file.
//!
//! The byte layout reproduces the 64-bit in-memory struct layout that existing
//! `librecords.db` files were dumped with, so the offsets below include the
//! same padding. Strings occupy NUL-padded buffers; a value must leave room for
//! the terminator and may not contain NUL itself.

use crate::error::{LibraryError, Result};
use crate::models::{
    AccountRecord, BookRecord, LoanRecord, Timestamp, UserGroup, ACCOUNT_NAME_CAPACITY,
    AUTHOR_CAPACITY, ISBN_CAPACITY, PASSWORD_CAPACITY, TITLE_CAPACITY,
};

pub const HEADER_SIZE: usize = 24;
pub const TIMESTAMP_SIZE: usize = 8;
pub const ACCOUNT_RECORD_SIZE: usize = 56;
pub const BOOK_RECORD_SIZE: usize = 136;
pub const LOAN_RECORD_SIZE: usize = 48;

/// Leading block of the file: the record sizes the file was written with and
/// how many records of each kind follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    pub account_record_size: u16,
    pub book_record_size: u16,
    pub loan_record_size: u16,
    pub reserved_a: u16,
    pub account_count: u32,
    pub book_count: u32,
    pub loan_count: u32,
    pub reserved_b: u32,
}

impl Header {
    /// Header describing the current layout with the given counts.
    pub fn current(account_count: u32, book_count: u32, loan_count: u32) -> Self {
        Self {
            account_record_size: ACCOUNT_RECORD_SIZE as u16,
            book_record_size: BOOK_RECORD_SIZE as u16,
            loan_record_size: LOAN_RECORD_SIZE as u16,
            reserved_a: 0,
            account_count,
            book_count,
            loan_count,
            reserved_b: 0,
        }
    }

    /// Overwrite the size fields with the current layout, keeping the counts.
    pub fn restamp(&mut self) {
        self.account_record_size = ACCOUNT_RECORD_SIZE as u16;
        self.book_record_size = BOOK_RECORD_SIZE as u16;
        self.loan_record_size = LOAN_RECORD_SIZE as u16;
    }

    pub fn matches_current_layout(&self) -> bool {
        usize::from(self.account_record_size) == ACCOUNT_RECORD_SIZE
            && usize::from(self.book_record_size) == BOOK_RECORD_SIZE
            && usize::from(self.loan_record_size) == LOAN_RECORD_SIZE
    }
}

/// Reject a string that would not survive the fixed-width field it is stored in.
pub fn check_field(label: &str, value: &str, capacity: usize) -> Result<()> {
    if value.as_bytes().contains(&0) {
        return Err(LibraryError::invalid(format!(
            "{label} must not contain NUL characters."
        )));
    }
    if value.len() >= capacity {
        return Err(LibraryError::invalid(format!(
            "{label} is too long (at most {} bytes).",
            capacity - 1
        )));
    }
    Ok(())
}

struct FieldWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> FieldWriter<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn bytes(&mut self, data: &[u8]) {
        self.buf[self.pos..self.pos + data.len()].copy_from_slice(data);
        self.pos += data.len();
    }

    fn u16(&mut self, value: u16) {
        self.bytes(&value.to_le_bytes());
    }

    fn u32(&mut self, value: u32) {
        self.bytes(&value.to_le_bytes());
    }

    fn i32(&mut self, value: i32) {
        self.bytes(&value.to_le_bytes());
    }

    fn u64(&mut self, value: u64) {
        self.bytes(&value.to_le_bytes());
    }

    fn text(&mut self, label: &str, value: &str, capacity: usize) -> Result<()> {
        check_field(label, value, capacity)?;
        let start = self.pos;
        self.bytes(value.as_bytes());
        // The buffer starts zeroed, so skipping leaves the NUL padding.
        self.pos = start + capacity;
        Ok(())
    }

    fn timestamp(&mut self, stamp: &Timestamp) {
        self.bytes(&stamp.year.to_le_bytes());
        for field in [
            stamp.month,
            stamp.day,
            stamp.weekday,
            stamp.hour,
            stamp.minute,
            stamp.second,
        ] {
            self.bytes(&field.to_le_bytes());
        }
    }
}

struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    fn u16(&mut self) -> u16 {
        u16::from_le_bytes(self.take())
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }

    fn i32(&mut self) -> i32 {
        i32::from_le_bytes(self.take())
    }

    fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take())
    }

    fn i8(&mut self) -> i8 {
        i8::from_le_bytes(self.take())
    }

    /// Read a NUL-terminated field. Anything that would not encode back to the
    /// same bytes is refused, so a loaded record always survives export.
    fn text(&mut self, label: &str, capacity: usize) -> Result<String> {
        let raw = &self.buf[self.pos..self.pos + capacity];
        self.pos += capacity;
        let end = raw.iter().position(|&b| b == 0).ok_or_else(|| {
            LibraryError::Corrupt(format!("{label} field is not NUL-terminated"))
        })?;
        String::from_utf8(raw[..end].to_vec())
            .map_err(|_| LibraryError::Corrupt(format!("{label} field is not valid UTF-8")))
    }

    fn timestamp(&mut self) -> Timestamp {
        Timestamp {
            year: i16::from_le_bytes(self.take()),
            month: self.i8(),
            day: self.i8(),
            weekday: self.i8(),
            hour: self.i8(),
            minute: self.i8(),
            second: self.i8(),
        }
    }
}

pub fn encode_header(header: &Header) -> [u8; HEADER_SIZE] {
    let mut buf = [0u8; HEADER_SIZE];
    let mut w = FieldWriter::new(&mut buf);
    w.u16(header.account_record_size);
    w.u16(header.book_record_size);
    w.u16(header.loan_record_size);
    w.u16(header.reserved_a);
    w.u32(header.account_count);
    w.u32(header.book_count);
    w.u32(header.loan_count);
    w.u32(header.reserved_b);
    buf
}

pub fn decode_header(buf: &[u8; HEADER_SIZE]) -> Header {
    let mut r = FieldReader::new(buf);
    Header {
        account_record_size: r.u16(),
        book_record_size: r.u16(),
        loan_record_size: r.u16(),
        reserved_a: r.u16(),
        account_count: r.u32(),
        book_count: r.u32(),
        loan_count: r.u32(),
        reserved_b: r.u32(),
    }
}

pub fn encode_account(account: &AccountRecord) -> Result<[u8; ACCOUNT_RECORD_SIZE]> {
    let mut buf = [0u8; ACCOUNT_RECORD_SIZE];
    let mut w = FieldWriter::new(&mut buf);
    w.u32(account.group.as_raw());
    w.text("Account name", &account.name, ACCOUNT_NAME_CAPACITY)?;
    w.text("Password", &account.password, PASSWORD_CAPACITY)?;
    w.u32(account.hash);
    w.u32(account.id);
    w.i32(account.balance);
    w.timestamp(&account.registered);
    Ok(buf)
}

pub fn decode_account(buf: &[u8; ACCOUNT_RECORD_SIZE]) -> Result<AccountRecord> {
    let mut r = FieldReader::new(buf);
    let raw_group = r.u32();
    let group = UserGroup::from_raw(raw_group)
        .ok_or_else(|| LibraryError::Corrupt(format!("unknown account group {raw_group}")))?;
    Ok(AccountRecord {
        group,
        name: r.text("account name", ACCOUNT_NAME_CAPACITY)?,
        password: r.text("password", PASSWORD_CAPACITY)?,
        hash: r.u32(),
        id: r.u32(),
        balance: r.i32(),
        registered: r.timestamp(),
    })
}

pub fn encode_book(book: &BookRecord) -> Result<[u8; BOOK_RECORD_SIZE]> {
    let mut buf = [0u8; BOOK_RECORD_SIZE];
    let mut w = FieldWriter::new(&mut buf);
    w.u64(book.stock);
    w.text("ISBN", &book.isbn, ISBN_CAPACITY)?;
    w.text("Author", &book.author, AUTHOR_CAPACITY)?;
    w.text("Title", &book.title, TITLE_CAPACITY)?;
    w.timestamp(&book.introduced);
    Ok(buf)
}

pub fn decode_book(buf: &[u8; BOOK_RECORD_SIZE]) -> Result<BookRecord> {
    let mut r = FieldReader::new(buf);
    Ok(BookRecord {
        stock: r.u64(),
        isbn: r.text("ISBN", ISBN_CAPACITY)?,
        author: r.text("author", AUTHOR_CAPACITY)?,
        title: r.text("title", TITLE_CAPACITY)?,
        introduced: r.timestamp(),
    })
}

pub fn encode_loan(loan: &LoanRecord) -> Result<[u8; LOAN_RECORD_SIZE]> {
    let mut buf = [0u8; LOAN_RECORD_SIZE];
    let mut w = FieldWriter::new(&mut buf);
    w.text("ISBN", &loan.isbn, ISBN_CAPACITY)?;
    w.u32(loan.loan_days);
    w.u32(loan.borrower_id);
    w.timestamp(&loan.borrowed);
    w.timestamp(&loan.returned.unwrap_or_else(Timestamp::sentinel));
    Ok(buf)
}

pub fn decode_loan(buf: &[u8; LOAN_RECORD_SIZE]) -> Result<LoanRecord> {
    let mut r = FieldReader::new(buf);
    let isbn = r.text("ISBN", ISBN_CAPACITY)?;
    let loan_days = r.u32();
    let borrower_id = r.u32();
    let borrowed = r.timestamp();
    let returned = Some(r.timestamp()).filter(|stamp| !stamp.is_sentinel());
    Ok(LoanRecord {
        isbn,
        loan_days,
        borrower_id,
        borrowed,
        returned,
    })
}

/// Fit a record read with a foreign record size into the current layout:
/// shorter input is zero-extended, longer input loses its tail.
pub fn fit_record<const N: usize>(raw: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    let len = raw.len().min(N);
    out[..len].copy_from_slice(&raw[..len]);
    out
}
