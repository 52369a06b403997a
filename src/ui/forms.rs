use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::models::LoanRecord;
use crate::store::Handle;

/// What submitting a form should do.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum FormPurpose {
    Login,
    Register,
    Recharge,
    Borrow,
    AddBook,
    FindIsbn,
    FindTitle,
    FindAuthor,
    LookupAccount,
}

/// Input restrictions for a single field.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum FieldKind {
    Text,
    Secret,
    Number,
    Money,
}

#[derive(Clone, Debug)]
pub(crate) struct FormField {
    pub(crate) label: &'static str,
    pub(crate) value: String,
    pub(crate) kind: FieldKind,
}

impl FormField {
    fn new(label: &'static str, kind: FieldKind) -> Self {
        Self {
            label,
            value: String::new(),
            kind,
        }
    }

    fn accepts(&self, ch: char) -> bool {
        match self.kind {
            FieldKind::Text | FieldKind::Secret => !ch.is_control(),
            FieldKind::Number => ch.is_ascii_digit(),
            FieldKind::Money => ch.is_ascii_digit() || (ch == '.' && !self.value.contains('.')),
        }
    }
}

/// Popup form state: a handful of labelled fields, one of them focused.
#[derive(Clone, Debug)]
pub(crate) struct Form {
    pub(crate) title: &'static str,
    pub(crate) purpose: FormPurpose,
    pub(crate) fields: Vec<FormField>,
    pub(crate) active: usize,
    pub(crate) error: Option<String>,
}

impl Form {
    fn new(title: &'static str, purpose: FormPurpose, fields: Vec<FormField>) -> Self {
        Self {
            title,
            purpose,
            fields,
            active: 0,
            error: None,
        }
    }

    pub(crate) fn login() -> Self {
        Self::new(
            "Log In",
            FormPurpose::Login,
            vec![
                FormField::new("Account", FieldKind::Text),
                FormField::new("Password", FieldKind::Secret),
            ],
        )
    }

    pub(crate) fn register() -> Self {
        Self::new(
            "Register",
            FormPurpose::Register,
            vec![
                FormField::new("Account", FieldKind::Text),
                FormField::new("Password", FieldKind::Secret),
                FormField::new("Confirm", FieldKind::Secret),
            ],
        )
    }

    pub(crate) fn recharge() -> Self {
        Self::new(
            "Recharge",
            FormPurpose::Recharge,
            vec![FormField::new("Amount", FieldKind::Money)],
        )
    }

    /// Borrow form, pre-filled with the highlighted book when there is one.
    pub(crate) fn borrow(isbn: Option<&str>) -> Self {
        let mut form = Self::new(
            "Borrow",
            FormPurpose::Borrow,
            vec![
                FormField::new("ISBN", FieldKind::Text),
                FormField::new("Days", FieldKind::Number),
            ],
        );
        if let Some(isbn) = isbn {
            form.fields[0].value = isbn.to_string();
            form.active = 1;
        }
        form
    }

    pub(crate) fn add_book() -> Self {
        Self::new(
            "Add Book",
            FormPurpose::AddBook,
            vec![
                FormField::new("ISBN", FieldKind::Text),
                FormField::new("Title", FieldKind::Text),
                FormField::new("Author", FieldKind::Text),
                FormField::new("Copies", FieldKind::Number),
            ],
        )
    }

    pub(crate) fn search(purpose: FormPurpose) -> Self {
        let (title, label) = match purpose {
            FormPurpose::FindIsbn => ("Find by ISBN", "ISBN"),
            FormPurpose::FindAuthor => ("Search Authors", "Author"),
            _ => ("Search Titles", "Title"),
        };
        Self::new(title, purpose, vec![FormField::new(label, FieldKind::Text)])
    }

    pub(crate) fn lookup_account() -> Self {
        Self::new(
            "Find Account Id",
            FormPurpose::LookupAccount,
            vec![FormField::new("Account", FieldKind::Text)],
        )
    }

    pub(crate) fn value(&self, index: usize) -> &str {
        self.fields
            .get(index)
            .map(|field| field.value.as_str())
            .unwrap_or_default()
    }

    pub(crate) fn focus_next(&mut self) {
        if !self.fields.is_empty() {
            self.active = (self.active + 1) % self.fields.len();
        }
    }

    pub(crate) fn focus_prev(&mut self) {
        if !self.fields.is_empty() {
            self.active = (self.active + self.fields.len() - 1) % self.fields.len();
        }
    }

    /// Append a character to the active field if its kind allows it.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        match self.fields.get_mut(self.active) {
            Some(field) if field.accepts(ch) => {
                field.value.push(ch);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn backspace(&mut self) {
        if let Some(field) = self.fields.get_mut(self.active) {
            field.value.pop();
        }
    }

    pub(crate) fn fail(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    /// One rendered line per field; secrets are masked.
    pub(crate) fn build_lines(&self) -> Vec<Line<'static>> {
        self.fields
            .iter()
            .enumerate()
            .map(|(idx, field)| {
                let display = match (field.kind, field.value.is_empty()) {
                    (_, true) => "<required>".to_string(),
                    (FieldKind::Secret, false) => "*".repeat(field.value.chars().count()),
                    _ => field.value.clone(),
                };
                let style = if idx == self.active {
                    Style::default().fg(Color::Yellow)
                } else if field.value.is_empty() {
                    Style::default().fg(Color::DarkGray)
                } else {
                    Style::default()
                };
                Line::from(vec![
                    Span::raw(format!("{}: ", field.label)),
                    Span::styled(display, style),
                ])
            })
            .collect()
    }

    /// Column and row of the cursor relative to the form's inner area.
    pub(crate) fn cursor_offset(&self) -> (u16, u16) {
        let field = match self.fields.get(self.active) {
            Some(field) => field,
            None => return (0, 0),
        };
        let prefix = field.label.chars().count() + 2;
        let column = prefix + field.value.chars().count();
        (column as u16, self.active as u16)
    }
}

/// Parse a whole positive integer typed into a number field.
pub(crate) fn parse_positive(raw: &str, label: &str) -> Result<i64, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(format!("{label} is required."));
    }
    match trimmed.parse::<i64>() {
        Ok(value) if value > 0 => Ok(value),
        Ok(_) => Err(format!("{label} must be greater than zero.")),
        Err(_) => Err(format!("{label} must be a whole number.")),
    }
}

/// Parse a currency amount such as `12` or `12.5` into cents.
pub(crate) fn parse_amount(raw: &str) -> Result<i64, String> {
    let trimmed = raw.trim();
    let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err("Amount is required.".to_string());
    }
    if fraction.len() > 2 {
        return Err("Amount has at most two decimals.".to_string());
    }
    let units: i64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| "Amount must be a number.".to_string())?
    };
    let cents: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().map_err(|_| "Amount must be a number.".to_string())? * 10,
        _ => fraction.parse().map_err(|_| "Amount must be a number.".to_string())?,
    };
    units
        .checked_mul(100)
        .and_then(|value| value.checked_add(cents))
        .ok_or_else(|| "Amount is too large.".to_string())
}

/// Yes/no prompt guarding a destructive or money-moving action.
#[derive(Clone, Debug)]
pub(crate) struct Confirm {
    pub(crate) prompt: String,
    pub(crate) action: ConfirmAction,
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum ConfirmAction {
    CancelOwnAccount,
    CancelUser(u32),
    ResetPassword(u32),
    ReturnLoan(Handle<LoanRecord>),
}

impl Confirm {
    pub(crate) fn new(prompt: impl Into<String>, action: ConfirmAction) -> Self {
        Self {
            prompt: prompt.into(),
            action,
        }
    }
}
