//! Account directory queries over the account table.

use crate::models::{AccountRecord, UserGroup};
use crate::store::Handle;

use super::Library;

/// Fingerprint of an account name used to reject most candidates before the
/// exact name comparison. Bytes are sign-extended before mixing so hashes
/// stored in existing files keep matching non-ASCII names.
pub fn credential_hash(name: &str) -> u32 {
    let mut hash: u32 = 5381;
    for &byte in name.as_bytes() {
        let signed = i32::from(byte as i8) as u32;
        hash = hash.wrapping_add((hash << 5).wrapping_add(signed));
    }
    hash & 0x7fff_ffff
}

/// One row of the administrator's account listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSummary {
    pub id: u32,
    pub name: String,
    pub group: UserGroup,
    pub balance: i32,
    pub active_loans: usize,
}

impl Library {
    /// Resolve an account by name: hash first, exact name second.
    pub fn find_account_by_name(&self, name: &str) -> Option<Handle<AccountRecord>> {
        let hash = credential_hash(name);
        self.accounts
            .match_handle(|account| account.hash == hash && account.name == name)
    }

    pub fn find_account_by_id(&self, id: u32) -> Option<Handle<AccountRecord>> {
        self.accounts.match_handle(|account| account.id == id)
    }

    pub fn account(&self, handle: Handle<AccountRecord>) -> Option<&AccountRecord> {
        self.accounts.get(handle)
    }

    pub(crate) fn account_mut(&mut self, handle: Handle<AccountRecord>) -> Option<&mut AccountRecord> {
        self.accounts.get_mut(handle)
    }

    pub fn accounts(&self) -> impl Iterator<Item = (Handle<AccountRecord>, &AccountRecord)> + '_ {
        self.accounts.entries()
    }

    pub fn account_id_taken(&self, id: u32) -> bool {
        self.find_account_by_id(id).is_some()
    }

    pub(crate) fn insert_account(&mut self, account: AccountRecord) -> Handle<AccountRecord> {
        self.accounts.append(account)
    }

    pub(crate) fn remove_account(&mut self, handle: Handle<AccountRecord>) -> bool {
        self.accounts.erase(handle)
    }

    pub fn account_summaries(&self) -> Vec<AccountSummary> {
        self.accounts
            .iter()
            .map(|account| AccountSummary {
                id: account.id,
                name: account.name.clone(),
                group: account.group,
                balance: account.balance,
                active_loans: self.active_loan_count(account.id),
            })
            .collect()
    }
}
