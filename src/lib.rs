//! Core library surface for the library desk terminal application.
//!
//! The record tables and their binary file live in [`db`], the rules that move
//! books and money between them in [`desk`], and the Ratatui shell in [`ui`].
pub mod access;
pub mod clock;
pub mod config;
pub mod db;
pub mod desk;
pub mod error;
pub mod logging;
pub mod models;
pub mod store;
pub mod ui;

pub use access::Permission;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use db::Library;
pub use desk::{Desk, ReturnReceipt, Stocking};
pub use error::{LibraryError, Result};
pub use models::{AccountRecord, BookRecord, LoanRecord, Session, Timestamp, UserGroup};
pub use store::{Handle, RecordStore};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
