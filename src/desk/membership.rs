//! Account lifecycle: registration, login, recharge, cancellation and the
//! administrator's maintenance actions.

use rand::Rng;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::db::codec::check_field;
use crate::db::{credential_hash, AccountSummary};
use crate::error::{LibraryError, Result};
use crate::models::{
    AccountRecord, Session, Timestamp, UserGroup, ACCOUNT_NAME_CAPACITY, ADMIN_ID,
    PASSWORD_CAPACITY,
};
use crate::store::Handle;

use super::Desk;

/// Upper bound of each of the two draws multiplied into a new account id.
pub const ID_DRAW_MAX: u32 = 32_767;
/// Password assigned by an administrator's reset.
pub const RESET_PASSWORD: &str = "123456";
/// Draws attempted before giving up on finding an unused id.
const ID_ATTEMPTS: usize = 1_000;

/// Snapshot of the signed-in account for the personal info card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datacard {
    pub id: u32,
    pub name: String,
    pub group: UserGroup,
    pub balance: i32,
    pub active_loans: usize,
    pub registered: Timestamp,
    pub session_started: Timestamp,
}

impl<C: Clock> Desk<C> {
    /// Create a plain user account. The id is the product of two random draws,
    /// redrawn until it does not collide with an existing account.
    pub fn register<R: Rng>(
        &mut self,
        name: &str,
        password: &str,
        confirm: &str,
        rng: &mut R,
    ) -> Result<Handle<AccountRecord>> {
        if password != confirm {
            return Err(LibraryError::invalid("The two passwords do not match."));
        }
        if name.is_empty() || password.is_empty() {
            return Err(LibraryError::invalid(
                "Account name and password are required.",
            ));
        }
        check_field("Account name", name, ACCOUNT_NAME_CAPACITY)?;
        check_field("Password", password, PASSWORD_CAPACITY)?;
        if self.library.find_account_by_name(name).is_some() {
            return Err(LibraryError::conflict(format!(
                "An account named {name} already exists."
            )));
        }

        let id = self.draw_account_id(rng)?;
        let handle = self.library.insert_account(AccountRecord {
            group: UserGroup::User,
            name: name.to_string(),
            password: password.to_string(),
            hash: credential_hash(name),
            id,
            balance: 0,
            registered: self.clock.now(),
        });
        info!(id, name, "account registered");
        Ok(handle)
    }

    fn draw_account_id<R: Rng>(&self, rng: &mut R) -> Result<u32> {
        for _ in 0..ID_ATTEMPTS {
            let id = rng.gen_range(1..=ID_DRAW_MAX) * rng.gen_range(1..=ID_DRAW_MAX);
            if !self.library.account_id_taken(id) {
                return Ok(id);
            }
        }
        Err(LibraryError::conflict("Could not allocate a free account id."))
    }

    /// Check the credentials and open a session. The password is compared as
    /// stored, in plaintext.
    pub fn login(&self, name: &str, password: &str) -> Result<Session> {
        let handle = self
            .library
            .find_account_by_name(name)
            .filter(|&handle| {
                self.library
                    .account(handle)
                    .map(|account| account.password == password)
                    .unwrap_or(false)
            })
            .ok_or_else(|| {
                warn!(name, "failed login");
                LibraryError::denied("Wrong account name or password.")
            })?;
        info!(name, "logged in");
        Ok(Session {
            account: handle,
            established: self.clock.now(),
        })
    }

    pub fn datacard(&self, session: &Session) -> Result<Datacard> {
        let account = self.session_account(session)?;
        Ok(Datacard {
            id: account.id,
            name: account.name.clone(),
            group: account.group,
            balance: account.balance,
            active_loans: self.library.active_loan_count(account.id),
            registered: account.registered,
            session_started: session.established,
        })
    }

    /// Credit `amount` cents to the session's account and return the new
    /// balance. Only strictly positive amounts are accepted.
    pub fn recharge(&mut self, session: &Session, amount: i64) -> Result<i32> {
        if amount <= 0 {
            return Err(LibraryError::invalid("Recharge amount must be positive."));
        }
        let account = self
            .library
            .account_mut(session.account)
            .ok_or_else(|| LibraryError::not_found("The signed-in account no longer exists."))?;
        let balance = i32::try_from(i64::from(account.balance) + amount)
            .map_err(|_| LibraryError::invalid("Recharge amount is too large."))?;
        account.balance = balance;
        info!(id = account.id, amount, balance, "account recharged");
        Ok(balance)
    }

    /// Cancel the session's own account. On success the session is dead.
    pub fn cancel_account(&mut self, session: &Session) -> Result<()> {
        self.ensure_cancellable(session.account)?;
        self.remove(session.account)
    }

    /// Administrator action: cancel another account by id.
    pub fn cancel_user(&mut self, session: &Session, id: u32) -> Result<()> {
        self.require_admin(session)?;
        let target = self
            .library
            .find_account_by_id(id)
            .ok_or_else(|| LibraryError::not_found(format!("No account with id {id}.")))?;
        if target == session.account {
            return Err(LibraryError::precondition(
                "The signed-in account cannot be cancelled from here.",
            ));
        }
        self.ensure_cancellable(target)?;
        self.remove(target)
    }

    /// Administrator action: reset a password to [`RESET_PASSWORD`].
    pub fn reset_password(&mut self, session: &Session, id: u32) -> Result<()> {
        self.require_admin(session)?;
        if id == ADMIN_ID {
            return Err(LibraryError::precondition(
                "The built-in administrator's password cannot be reset.",
            ));
        }
        let target = self
            .library
            .find_account_by_id(id)
            .ok_or_else(|| LibraryError::not_found(format!("No account with id {id}.")))?;
        if let Some(account) = self.library.account_mut(target) {
            account.password = RESET_PASSWORD.to_string();
        }
        info!(id, "password reset");
        Ok(())
    }

    /// Administrator action: resolve an account name to its id.
    pub fn lookup_id(&self, session: &Session, name: &str) -> Result<u32> {
        self.require_admin(session)?;
        self.library
            .find_account_by_name(name)
            .and_then(|handle| self.library.account(handle))
            .map(|account| account.id)
            .ok_or_else(|| LibraryError::not_found(format!("No account named {name}.")))
    }

    /// Administrator action: every account with its outstanding loan count.
    pub fn list_accounts(&self, session: &Session) -> Result<Vec<AccountSummary>> {
        self.require_admin(session)?;
        Ok(self.library.account_summaries())
    }

    fn require_admin(&self, session: &Session) -> Result<&AccountRecord> {
        let account = self.session_account(session)?;
        if account.group != UserGroup::Admin {
            return Err(LibraryError::denied(
                "Account management is not available to this account.",
            ));
        }
        Ok(account)
    }

    fn ensure_cancellable(&self, handle: Handle<AccountRecord>) -> Result<()> {
        let account = self
            .library
            .account(handle)
            .ok_or_else(|| LibraryError::not_found("That account no longer exists."))?;
        if account.is_bootstrap_admin() {
            return Err(LibraryError::precondition(
                "The built-in administrator cannot be cancelled.",
            ));
        }
        if self.library.active_loan_count(account.id) > 0 {
            return Err(LibraryError::precondition(
                "Books are still on loan; cancellation refused.",
            ));
        }
        if account.in_debt() {
            return Err(LibraryError::precondition(
                "Outstanding fees are unpaid; cancellation refused.",
            ));
        }
        Ok(())
    }

    fn remove(&mut self, handle: Handle<AccountRecord>) -> Result<()> {
        let id = self.library.account(handle).map(|account| account.id);
        if self.library.remove_account(handle) {
            info!(?id, "account cancelled");
            Ok(())
        } else {
            Err(LibraryError::not_found("That account no longer exists."))
        }
    }
}
