use std::mem;

use anyhow::Result;
use crossterm::event::KeyCode;
use rand::rngs::StdRng;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

use crate::access::{check_access, require_service, Permission};
use crate::clock::{Clock, SystemClock};
use crate::desk::{Desk, Stocking, RESET_PASSWORD};
use crate::models::{format_money, Session, UserGroup};

use super::forms::{
    parse_amount, parse_positive, Confirm, ConfirmAction, Form, FormPurpose,
};
use super::helpers::{centered_rect, clip};
use super::screens::{AccountScreen, BookScreen, LoanScreen};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;

/// High-level navigation states.
enum Screen {
    Login,
    Home,
    Books(BookScreen),
    Loans(LoanScreen),
    Accounts(AccountScreen),
}

/// Fine-grained modes layered over the current screen.
enum Mode {
    Normal,
    Editing(Form),
    Confirming(Confirm),
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI.
pub struct App<C: Clock = SystemClock> {
    desk: Desk<C>,
    rng: StdRng,
    session: Option<Session>,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl<C: Clock> App<C> {
    pub fn new(desk: Desk<C>, rng: StdRng) -> Self {
        Self {
            desk,
            rng,
            session: None,
            screen: Screen::Login,
            mode: Mode::Normal,
            status: None,
        }
    }

    pub fn desk(&self) -> &Desk<C> {
        &self.desk
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Hand the desk back so the caller can persist it.
    pub fn into_desk(self) -> Desk<C> {
        self.desk
    }

    /// Dispatch one key press. Returns `true` when the user asked to quit.
    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit),
            Mode::Editing(form) => self.handle_form_key(code, form),
            Mode::Confirming(confirm) => self.handle_confirm_key(code, confirm),
        };

        Ok(exit)
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Mode {
        if code == KeyCode::Char('q') {
            *exit = true;
            return Mode::Normal;
        }
        match self.screen {
            Screen::Login => self.handle_login_key(code, exit),
            Screen::Home => self.handle_home_key(code),
            Screen::Books(_) => self.handle_books_key(code),
            Screen::Loans(_) => self.handle_loans_key(code),
            Screen::Accounts(_) => self.handle_accounts_key(code),
        }
    }

    fn handle_login_key(&mut self, code: KeyCode, exit: &mut bool) -> Mode {
        match code {
            KeyCode::Char('l') | KeyCode::Char('L') | KeyCode::Enter => {
                self.clear_status();
                Mode::Editing(Form::login())
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.clear_status();
                Mode::Editing(Form::register())
            }
            KeyCode::Esc => {
                *exit = true;
                Mode::Normal
            }
            _ => Mode::Normal,
        }
    }

    fn handle_home_key(&mut self, code: KeyCode) -> Mode {
        match code {
            KeyCode::Char('b') | KeyCode::Char('B') => {
                self.clear_status();
                self.screen = Screen::Books(BookScreen::all(self.desk.library()));
            }
            KeyCode::Char('l') | KeyCode::Char('L') => {
                self.clear_status();
                self.open_loans();
            }
            KeyCode::Char('a') | KeyCode::Char('A') => {
                self.clear_status();
                self.open_accounts();
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.clear_status();
                return Mode::Editing(Form::recharge());
            }
            KeyCode::Char('c') | KeyCode::Char('C') => {
                self.clear_status();
                return Mode::Confirming(Confirm::new(
                    "Cancel your account? This cannot be undone.",
                    ConfirmAction::CancelOwnAccount,
                ));
            }
            KeyCode::Char('s') | KeyCode::Char('S') => {
                self.logout("Signed out.");
            }
            _ => {}
        }
        Mode::Normal
    }

    fn handle_books_key(&mut self, code: KeyCode) -> Mode {
        let Screen::Books(books) = &mut self.screen else {
            return Mode::Normal;
        };
        match code {
            KeyCode::Up => books.move_selection(-1),
            KeyCode::Down => books.move_selection(1),
            KeyCode::PageUp => books.move_selection(-10),
            KeyCode::PageDown => books.move_selection(10),
            KeyCode::Char('i') | KeyCode::Char('I') => {
                return Mode::Editing(Form::search(FormPurpose::FindIsbn));
            }
            KeyCode::Char('t') | KeyCode::Char('T') => {
                return Mode::Editing(Form::search(FormPurpose::FindTitle));
            }
            KeyCode::Char('w') | KeyCode::Char('W') => {
                return Mode::Editing(Form::search(FormPurpose::FindAuthor));
            }
            KeyCode::Char('x') | KeyCode::Char('X') => {
                *books = BookScreen::all(self.desk.library());
                self.clear_status();
            }
            KeyCode::Enter | KeyCode::Char('o') | KeyCode::Char('O') => {
                let isbn = books.current().map(|book| book.isbn.clone());
                self.clear_status();
                return Mode::Editing(Form::borrow(isbn.as_deref()));
            }
            KeyCode::Char('+') => {
                let Some(group) = self.current_group() else {
                    return Mode::Normal;
                };
                if !require_service(group, Permission::LIBRARY_SERVICE) {
                    self.set_status(
                        "Library service is not available to this account.",
                        StatusKind::Error,
                    );
                } else if !check_access(group, Permission::ADD_BOOK) {
                    self.set_status("This account may not add books.", StatusKind::Error);
                } else {
                    self.clear_status();
                    return Mode::Editing(Form::add_book());
                }
            }
            KeyCode::Esc => {
                self.clear_status();
                self.screen = Screen::Home;
            }
            _ => {}
        }
        Mode::Normal
    }

    fn handle_loans_key(&mut self, code: KeyCode) -> Mode {
        let Screen::Loans(loans) = &mut self.screen else {
            return Mode::Normal;
        };
        match code {
            KeyCode::Up => loans.move_selection(-1),
            KeyCode::Down => loans.move_selection(1),
            KeyCode::Enter | KeyCode::Char('r') | KeyCode::Char('R') => {
                if let Some(row) = loans.current() {
                    let prompt = format!("Return \"{}\" ({})?", row.title, row.isbn);
                    let action = ConfirmAction::ReturnLoan(row.handle);
                    self.clear_status();
                    return Mode::Confirming(Confirm::new(prompt, action));
                } else {
                    self.set_status("Nothing to return.", StatusKind::Error);
                }
            }
            KeyCode::Esc => {
                self.clear_status();
                self.screen = Screen::Home;
            }
            _ => {}
        }
        Mode::Normal
    }

    fn handle_accounts_key(&mut self, code: KeyCode) -> Mode {
        let Screen::Accounts(accounts) = &mut self.screen else {
            return Mode::Normal;
        };
        match code {
            KeyCode::Up => accounts.move_selection(-1),
            KeyCode::Down => accounts.move_selection(1),
            KeyCode::Char('f') | KeyCode::Char('F') => {
                self.clear_status();
                return Mode::Editing(Form::lookup_account());
            }
            KeyCode::Char('p') | KeyCode::Char('P') => {
                if let Some(row) = accounts.current() {
                    let prompt = format!(
                        "Reset the password of {} (id {}) to {RESET_PASSWORD}?",
                        row.name, row.id
                    );
                    let action = ConfirmAction::ResetPassword(row.id);
                    return Mode::Confirming(Confirm::new(prompt, action));
                }
            }
            KeyCode::Char('-') | KeyCode::Delete => {
                if let Some(row) = accounts.current() {
                    let prompt = format!("Cancel the account {} (id {})?", row.name, row.id);
                    let action = ConfirmAction::CancelUser(row.id);
                    return Mode::Confirming(Confirm::new(prompt, action));
                }
            }
            KeyCode::Esc => {
                self.clear_status();
                self.screen = Screen::Home;
            }
            _ => {}
        }
        Mode::Normal
    }

    fn handle_form_key(&mut self, code: KeyCode, mut form: Form) -> Mode {
        match code {
            KeyCode::Esc => return Mode::Normal,
            KeyCode::Enter => return self.submit_form(form),
            KeyCode::Tab | KeyCode::Down => form.focus_next(),
            KeyCode::BackTab | KeyCode::Up => form.focus_prev(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Char(ch) => {
                form.push_char(ch);
            }
            _ => {}
        }
        Mode::Editing(form)
    }

    fn submit_form(&mut self, form: Form) -> Mode {
        match form.purpose {
            FormPurpose::Login => {
                let name = form.value(0).trim().to_string();
                match self.desk.login(&name, form.value(1)) {
                    Ok(session) => {
                        self.session = Some(session);
                        self.screen = Screen::Home;
                        self.set_status(format!("Welcome, {name}."), StatusKind::Info);
                        Mode::Normal
                    }
                    Err(err) => Mode::Editing(form.fail(err.to_string())),
                }
            }
            FormPurpose::Register => {
                let name = form.value(0).trim().to_string();
                let result =
                    self.desk
                        .register(&name, form.value(1), form.value(2), &mut self.rng);
                match result {
                    Ok(_) => {
                        self.set_status(
                            format!("Registered {name}. Log in to continue."),
                            StatusKind::Info,
                        );
                        Mode::Normal
                    }
                    Err(err) => Mode::Editing(form.fail(err.to_string())),
                }
            }
            FormPurpose::Recharge => {
                let Some(session) = self.session else {
                    return self.session_lost();
                };
                let cents = match parse_amount(form.value(0)) {
                    Ok(cents) => cents,
                    Err(message) => return Mode::Editing(form.fail(message)),
                };
                match self.desk.recharge(&session, cents) {
                    Ok(balance) => {
                        self.set_status(
                            format!("Recharged. Balance: {}", format_money(balance.into())),
                            StatusKind::Info,
                        );
                        Mode::Normal
                    }
                    Err(err) => Mode::Editing(form.fail(err.to_string())),
                }
            }
            FormPurpose::Borrow => {
                let Some(session) = self.session else {
                    return self.session_lost();
                };
                let days = match parse_positive(form.value(1), "Days") {
                    Ok(days) => days,
                    Err(message) => return Mode::Editing(form.fail(message)),
                };
                let isbn = form.value(0).trim().to_string();
                match self.desk.borrow(&session, &isbn, days) {
                    Ok(_) => {
                        self.refresh_books();
                        self.set_status(
                            format!("Borrowed {isbn} for {days} days."),
                            StatusKind::Info,
                        );
                        Mode::Normal
                    }
                    Err(err) => Mode::Editing(form.fail(err.to_string())),
                }
            }
            FormPurpose::AddBook => {
                let Some(session) = self.session else {
                    return self.session_lost();
                };
                let copies = match parse_positive(form.value(3), "Copies") {
                    Ok(copies) => copies,
                    Err(message) => return Mode::Editing(form.fail(message)),
                };
                let isbn = form.value(0).trim().to_string();
                let result = self.desk.add_book(
                    &session,
                    &isbn,
                    form.value(1).trim(),
                    form.value(2).trim(),
                    copies,
                );
                match result {
                    Ok(Stocking::Introduced(_)) => {
                        self.refresh_books();
                        self.set_status(
                            format!("Added {isbn} with {copies} copies."),
                            StatusKind::Info,
                        );
                        Mode::Normal
                    }
                    Ok(Stocking::Restocked { stock, .. }) => {
                        self.refresh_books();
                        self.set_status(
                            format!("Restocked {isbn}; {stock} copies on the shelf."),
                            StatusKind::Info,
                        );
                        Mode::Normal
                    }
                    Err(err) => Mode::Editing(form.fail(err.to_string())),
                }
            }
            FormPurpose::FindIsbn => {
                let isbn = form.value(0).trim().to_string();
                match self.desk.library().book_by_isbn(&isbn).cloned() {
                    Some(book) => {
                        self.screen =
                            Screen::Books(BookScreen::new(vec![book], format!("ISBN {isbn}")));
                        self.clear_status();
                        Mode::Normal
                    }
                    None => Mode::Editing(form.fail(format!("No book with ISBN {isbn}."))),
                }
            }
            FormPurpose::FindTitle | FormPurpose::FindAuthor => {
                let query = form.value(0).to_string();
                let (books, heading) = if form.purpose == FormPurpose::FindTitle {
                    (
                        self.desk.library().search_by_title(&query),
                        format!("Titles containing \"{query}\""),
                    )
                } else {
                    (
                        self.desk.library().search_by_author(&query),
                        format!("Authors containing \"{query}\""),
                    )
                };
                let books: Vec<_> = books.into_iter().cloned().collect();
                let found = books.len();
                self.screen = Screen::Books(BookScreen::new(books, heading));
                self.set_status(format!("{found} match(es)."), StatusKind::Info);
                Mode::Normal
            }
            FormPurpose::LookupAccount => {
                let Some(session) = self.session else {
                    return self.session_lost();
                };
                let name = form.value(0).trim().to_string();
                match self.desk.lookup_id(&session, &name) {
                    Ok(id) => {
                        if let Screen::Accounts(accounts) = &mut self.screen {
                            if let Some(pos) = accounts.rows.iter().position(|row| row.id == id) {
                                accounts.selected = pos;
                            }
                        }
                        self.set_status(format!("{name} has id {id}."), StatusKind::Info);
                        Mode::Normal
                    }
                    Err(err) => Mode::Editing(form.fail(err.to_string())),
                }
            }
        }
    }

    fn handle_confirm_key(&mut self, code: KeyCode, confirm: Confirm) -> Mode {
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                self.execute(confirm.action);
                Mode::Normal
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.clear_status();
                Mode::Normal
            }
            _ => Mode::Confirming(confirm),
        }
    }

    fn execute(&mut self, action: ConfirmAction) {
        let Some(session) = self.session else {
            self.session_lost();
            return;
        };
        match action {
            ConfirmAction::CancelOwnAccount => match self.desk.cancel_account(&session) {
                Ok(()) => self.logout("Account cancelled."),
                Err(err) => self.set_status(err.to_string(), StatusKind::Error),
            },
            ConfirmAction::CancelUser(id) => match self.desk.cancel_user(&session, id) {
                Ok(()) => {
                    self.reload_accounts(&session);
                    self.set_status(format!("Account {id} cancelled."), StatusKind::Info);
                }
                Err(err) => self.set_status(err.to_string(), StatusKind::Error),
            },
            ConfirmAction::ResetPassword(id) => match self.desk.reset_password(&session, id) {
                Ok(()) => self.set_status(
                    format!("Password of account {id} reset to {RESET_PASSWORD}."),
                    StatusKind::Info,
                ),
                Err(err) => self.set_status(err.to_string(), StatusKind::Error),
            },
            ConfirmAction::ReturnLoan(loan) => match self.desk.return_loan(&session, loan) {
                Ok(receipt) => {
                    self.open_loans();
                    if receipt.overdue() {
                        let mut text = format!(
                            "Returned {} day(s) late; charged {}. Balance: {}.",
                            receipt.overdue_days,
                            format_money(receipt.fee.into()),
                            format_money(receipt.balance.into()),
                        );
                        if receipt.balance < 0 {
                            text.push_str(" Please recharge to settle the debt.");
                        }
                        self.set_status(text, StatusKind::Error);
                    } else {
                        self.set_status("Returned on time. Thank you!", StatusKind::Info);
                    }
                }
                Err(err) => self.set_status(err.to_string(), StatusKind::Error),
            },
        }
    }

    fn open_loans(&mut self) {
        let Some(session) = self.session else {
            self.session_lost();
            return;
        };
        let screen = match self.desk.loan_records(&session) {
            Ok(listing) => LoanScreen::from_listing(self.desk.library(), listing),
            Err(err) => {
                self.set_status(err.to_string(), StatusKind::Error);
                return;
            }
        };
        self.screen = Screen::Loans(screen);
    }

    fn open_accounts(&mut self) {
        let Some(session) = self.session else {
            self.session_lost();
            return;
        };
        match self.desk.list_accounts(&session) {
            Ok(rows) => self.screen = Screen::Accounts(AccountScreen::new(rows)),
            Err(err) => self.set_status(err.to_string(), StatusKind::Error),
        }
    }

    fn reload_accounts(&mut self, session: &Session) {
        if let Screen::Accounts(accounts) = &mut self.screen {
            if let Ok(rows) = self.desk.list_accounts(session) {
                accounts.reload(rows);
            }
        }
    }

    /// Rebuild the catalog view after stock changed, keeping the highlight.
    fn refresh_books(&mut self) {
        if let Screen::Books(books) = &mut self.screen {
            let selected = books.selected;
            *books = BookScreen::all(self.desk.library());
            books.selected = selected.min(books.books.len().saturating_sub(1));
        }
    }

    fn current_group(&self) -> Option<UserGroup> {
        let session = self.session.as_ref()?;
        self.desk
            .session_account(session)
            .ok()
            .map(|account| account.group)
    }

    fn logout(&mut self, message: &str) {
        self.session = None;
        self.screen = Screen::Login;
        self.set_status(message, StatusKind::Info);
    }

    fn session_lost(&mut self) -> Mode {
        self.logout("Please log in again.");
        Mode::Normal
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        match &self.screen {
            Screen::Login => self.draw_login(frame, content_area),
            Screen::Home => self.draw_home(frame, content_area),
            Screen::Books(books) => self.draw_books(frame, content_area, books),
            Screen::Loans(loans) => self.draw_loans(frame, content_area, loans),
            Screen::Accounts(accounts) => self.draw_accounts(frame, content_area, accounts),
        }

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area);
        }

        match &self.mode {
            Mode::Editing(form) => self.draw_form(frame, area, form),
            Mode::Confirming(confirm) => self.draw_confirm(frame, area, confirm),
            Mode::Normal => {}
        }
    }

    fn draw_login(&self, frame: &mut Frame, area: Rect) {
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                "Library Desk",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Log in to continue."),
        ];
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Welcome"));
        frame.render_widget(paragraph, area);
    }

    fn draw_home(&self, frame: &mut Frame, area: Rect) {
        let card = self
            .session
            .as_ref()
            .and_then(|session| self.desk.datacard(session).ok());
        let mut lines = Vec::new();
        match card {
            Some(card) => {
                lines.push(Line::from(format!("ID:            {}", card.id)));
                lines.push(Line::from(format!("Account:       {}", card.name)));
                lines.push(Line::from(format!("Group:         {}", card.group)));
                let balance_style = if card.balance < 0 {
                    Style::default().fg(Color::Red)
                } else {
                    Style::default()
                };
                lines.push(Line::from(vec![
                    Span::raw("Balance:       "),
                    Span::styled(format_money(card.balance.into()), balance_style),
                ]));
                lines.push(Line::from(format!("Books on loan: {}", card.active_loans)));
                lines.push(Line::from(format!("Registered:    {}", card.registered)));
                lines.push(Line::from(format!("Signed in:     {}", card.session_started)));
            }
            None => lines.push(Line::from("No account information available.")),
        }
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Account"))
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn draw_books(&self, frame: &mut Frame, area: Rect, books: &BookScreen) {
        let header = format!(
            "{} {} {} {:>5}  {}",
            clip("ISBN", 20),
            clip("Title", 32),
            clip("Author", 20),
            "Stock",
            "Added"
        );
        let rows = books
            .books
            .iter()
            .map(|book| {
                format!(
                    "{} {} {} {:>5}  {}",
                    clip(&book.isbn, 20),
                    clip(&book.title, 32),
                    clip(&book.author, 20),
                    book.stock,
                    book.introduced.date_string()
                )
            })
            .collect();
        self.draw_table(frame, area, &books.heading, header, rows, books.selected);
    }

    fn draw_loans(&self, frame: &mut Frame, area: Rect, loans: &LoanScreen) {
        let (title, header) = if loans.full_ledger {
            (
                "Loan Ledger",
                format!(
                    "{} {} {} {:>4}  {}  {}",
                    clip("ISBN", 18),
                    clip("Title", 26),
                    clip("Borrower", 15),
                    "Days",
                    clip("Borrowed", 10),
                    "Returned"
                ),
            )
        } else {
            (
                "My Loans",
                format!(
                    "{} {} {} {}  {:>4}",
                    clip("ISBN", 18),
                    clip("Title", 26),
                    clip("Author", 18),
                    clip("Borrowed", 10),
                    "Days"
                ),
            )
        };
        let rows = loans
            .rows
            .iter()
            .map(|row| {
                if loans.full_ledger {
                    let returned = row
                        .returned
                        .map(|stamp| stamp.date_string())
                        .unwrap_or_else(|| "on loan".to_string());
                    format!(
                        "{} {} {} {:>4}  {}  {}",
                        clip(&row.isbn, 18),
                        clip(&row.title, 26),
                        clip(&row.borrower, 15),
                        row.loan_days,
                        row.borrowed.date_string(),
                        returned
                    )
                } else {
                    format!(
                        "{} {} {} {}  {:>4}",
                        clip(&row.isbn, 18),
                        clip(&row.title, 26),
                        clip(&row.author, 18),
                        row.borrowed.date_string(),
                        row.loan_days
                    )
                }
            })
            .collect();
        self.draw_table(frame, area, title, header, rows, loans.selected);
    }

    fn draw_accounts(&self, frame: &mut Frame, area: Rect, accounts: &AccountScreen) {
        let header = format!(
            "{:>10} {} {} {:>10} {:>5}",
            "ID",
            clip("Account", 16),
            clip("Group", 8),
            "Balance",
            "Loans"
        );
        let rows = accounts
            .rows
            .iter()
            .map(|row| {
                format!(
                    "{:>10} {} {} {:>10} {:>5}",
                    row.id,
                    clip(&row.name, 16),
                    clip(&row.group.to_string(), 8),
                    format_money(row.balance.into()),
                    row.active_loans
                )
            })
            .collect();
        self.draw_table(frame, area, "Accounts", header, rows, accounts.selected);
    }

    fn draw_table(
        &self,
        frame: &mut Frame,
        area: Rect,
        title: &str,
        header: String,
        rows: Vec<String>,
        selected: usize,
    ) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title.to_string());
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height == 0 {
            return;
        }

        let header_area = Rect { height: 1, ..inner };
        frame.render_widget(
            Paragraph::new(Span::styled(
                format!("  {header}"),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            header_area,
        );

        let body_area = Rect {
            y: inner.y + 1,
            height: inner.height.saturating_sub(1),
            ..inner
        };
        if rows.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    "  Nothing to show.",
                    Style::default().fg(Color::DarkGray),
                )),
                body_area,
            );
            return;
        }

        let items: Vec<ListItem> = rows.into_iter().map(ListItem::new).collect();
        let list = List::new(items)
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ListState::default().with_selected(Some(selected));
        frame.render_stateful_widget(list, body_area, &mut state);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let paragraph =
            Paragraph::new(vec![status_line, self.footer_instructions()]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let hints: &[(&str, &str)] = match (&self.mode, &self.screen) {
            (Mode::Editing(_), _) => &[("Enter", "Submit"), ("Tab", "Next"), ("Esc", "Cancel")],
            (Mode::Confirming(_), _) => &[("y", "Yes"), ("n", "No")],
            (Mode::Normal, Screen::Login) => &[("l", "Log in"), ("r", "Register"), ("q", "Quit")],
            (Mode::Normal, Screen::Home) => &[
                ("b", "Books"),
                ("l", "Loans"),
                ("r", "Recharge"),
                ("a", "Accounts"),
                ("c", "Cancel account"),
                ("s", "Switch account"),
                ("q", "Quit"),
            ],
            (Mode::Normal, Screen::Books(_)) => &[
                ("Enter", "Borrow"),
                ("i", "ISBN"),
                ("t", "Title"),
                ("w", "Author"),
                ("x", "All"),
                ("+", "Add book"),
                ("Esc", "Back"),
            ],
            (Mode::Normal, Screen::Loans(_)) => {
                &[("Enter", "Return"), ("Esc", "Back"), ("q", "Quit")]
            }
            (Mode::Normal, Screen::Accounts(_)) => &[
                ("f", "Find id"),
                ("p", "Reset password"),
                ("-", "Cancel user"),
                ("Esc", "Back"),
            ],
        };

        let mut spans = Vec::with_capacity(hints.len() * 3);
        for (idx, (key, label)) in hints.iter().enumerate() {
            if idx > 0 {
                spans.push(Span::raw("  "));
            }
            spans.push(Span::styled(
                key.to_string(),
                Style::default().fg(Color::Yellow),
            ));
            spans.push(Span::raw(format!(" {label}")));
        }
        Line::from(spans)
    }

    fn draw_form(&self, frame: &mut Frame, area: Rect, form: &Form) {
        let popup_area = centered_rect(60, 40, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(form.title).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = form.build_lines();
        lines.push(Line::from(""));
        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to submit, Tab to switch fields, Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        let (column, row) = form.cursor_offset();
        frame.set_cursor_position((inner.x + column, inner.y + row));
    }

    fn draw_confirm(&self, frame: &mut Frame, area: Rect, confirm: &Confirm) {
        let popup_area = centered_rect(50, 25, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Confirm").borders(Borders::ALL);
        let lines = vec![
            Line::from(confirm.prompt.clone()),
            Line::from(""),
            Line::from(Span::styled(
                "y to confirm, n to cancel",
                Style::default().fg(Color::Gray),
            )),
        ];
        let paragraph = Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};
    use rand::SeedableRng;

    use super::*;
    use crate::clock::ManualClock;
    use crate::db::Library;

    fn app() -> App<ManualClock> {
        let clock = ManualClock::new(
            NaiveDate::from_ymd_opt(2024, 9, 1)
                .and_then(|d| d.and_hms_opt(12, 0, 0))
                .unwrap(),
        );
        let library = Library::with_admin(clock.now());
        App::new(Desk::new(library, clock), StdRng::seed_from_u64(1))
    }

    fn type_text(app: &mut App<ManualClock>, text: &str) {
        for ch in text.chars() {
            app.handle_key(KeyCode::Char(ch)).unwrap();
        }
    }

    fn login(app: &mut App<ManualClock>, name: &str, password: &str) {
        app.handle_key(KeyCode::Char('l')).unwrap();
        type_text(app, name);
        app.handle_key(KeyCode::Tab).unwrap();
        type_text(app, password);
        app.handle_key(KeyCode::Enter).unwrap();
    }

    #[test]
    fn q_on_the_login_screen_quits() {
        let mut app = app();
        assert!(app.handle_key(KeyCode::Char('q')).unwrap());
    }

    #[test]
    fn typing_q_inside_a_form_does_not_quit() {
        let mut app = app();
        app.handle_key(KeyCode::Char('l')).unwrap();
        assert!(!app.handle_key(KeyCode::Char('q')).unwrap());
    }

    #[test]
    fn wrong_password_keeps_the_form_open() {
        let mut app = app();
        login(&mut app, "admin", "nope");
        assert!(app.session().is_none());
        assert!(matches!(&app.mode, Mode::Editing(form) if form.error.is_some()));
    }

    #[test]
    fn admin_adds_borrows_and_returns_a_book() {
        let mut app = app();
        login(&mut app, "admin", "admin");
        assert!(app.session().is_some());

        app.handle_key(KeyCode::Char('b')).unwrap();
        app.handle_key(KeyCode::Char('+')).unwrap();
        type_text(&mut app, "978-1");
        app.handle_key(KeyCode::Tab).unwrap();
        type_text(&mut app, "Dune");
        app.handle_key(KeyCode::Tab).unwrap();
        type_text(&mut app, "Herbert");
        app.handle_key(KeyCode::Tab).unwrap();
        type_text(&mut app, "1");
        app.handle_key(KeyCode::Enter).unwrap();
        assert_eq!(app.desk().library().book_by_isbn("978-1").unwrap().stock, 1);

        // Enter on the highlighted book opens the borrow form with its ISBN.
        app.handle_key(KeyCode::Enter).unwrap();
        type_text(&mut app, "2");
        app.handle_key(KeyCode::Enter).unwrap();
        assert_eq!(app.desk().library().book_by_isbn("978-1").unwrap().stock, 0);

        app.desk().clock().advance(Duration::days(4));
        app.handle_key(KeyCode::Esc).unwrap();
        app.handle_key(KeyCode::Char('l')).unwrap();
        app.handle_key(KeyCode::Enter).unwrap();
        assert!(app.handle_key(KeyCode::Char('y')).is_ok());

        let library = app.desk().library();
        assert_eq!(library.book_by_isbn("978-1").unwrap().stock, 1);
        let admin = library.find_account_by_id(1).and_then(|h| library.account(h));
        assert_eq!(admin.map(|a| a.balance), Some(-60));
    }

    #[test]
    fn cancelling_own_account_returns_to_login() {
        let mut app = app();
        app.handle_key(KeyCode::Char('r')).unwrap();
        type_text(&mut app, "kim");
        app.handle_key(KeyCode::Tab).unwrap();
        type_text(&mut app, "pw");
        app.handle_key(KeyCode::Tab).unwrap();
        type_text(&mut app, "pw");
        app.handle_key(KeyCode::Enter).unwrap();

        login(&mut app, "kim", "pw");
        assert!(app.session().is_some());
        app.handle_key(KeyCode::Char('c')).unwrap();
        app.handle_key(KeyCode::Char('y')).unwrap();
        assert!(app.session().is_none());
        assert!(app.desk().library().find_account_by_name("kim").is_none());
    }
}
