//! Ratatui front-end: a login screen, the signed-in menu and the catalog, loan
//! and account tables, with popup forms layered on top.

mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use terminal::run_app;
