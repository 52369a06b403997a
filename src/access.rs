//! Group-based permission table.
//!
//! The bit values are the ones stored conceptually alongside every account
//! group and must not change. Service masks group the fine-grained operation
//! bits so the UI can ask "is this area visible at all" with
//! [`require_service`] before asking "is this exact action allowed" with
//! [`check_access`].

use bitflags::bitflags;

use crate::models::UserGroup;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permission: u16 {
        const BORROW = 0x001;
        const RETURN = 0x002;
        const QUERY = 0x004;
        const REGISTER = 0x008;
        const LOGIN = 0x010;
        const CANCEL_ACCOUNT = 0x020;
        const ADD_BOOK = 0x040;
        const MODIFY_BOOK = 0x080;
        const RECHARGE = 0x100;
        const DEDUCT = 0x200;
        const NEW_RECORD = 0x400;
        const WITHDRAW_RECORD = 0x800;

        const BOOK_SERVICE = Self::BORROW.bits() | Self::RETURN.bits() | Self::QUERY.bits();
        const ACCOUNT_SERVICE =
            Self::REGISTER.bits() | Self::LOGIN.bits() | Self::CANCEL_ACCOUNT.bits();
        const LIBRARY_SERVICE = Self::ADD_BOOK.bits() | Self::MODIFY_BOOK.bits();
        const PROPERTY_SERVICE = Self::RECHARGE.bits() | Self::DEDUCT.bits();
        const RECORD_SERVICE = Self::NEW_RECORD.bits() | Self::WITHDRAW_RECORD.bits();
    }
}

impl Permission {
    /// The twelve single-operation bits, lowest first.
    pub const OPERATIONS: [Permission; 12] = [
        Permission::BORROW,
        Permission::RETURN,
        Permission::QUERY,
        Permission::REGISTER,
        Permission::LOGIN,
        Permission::CANCEL_ACCOUNT,
        Permission::ADD_BOOK,
        Permission::MODIFY_BOOK,
        Permission::RECHARGE,
        Permission::DEDUCT,
        Permission::NEW_RECORD,
        Permission::WITHDRAW_RECORD,
    ];

    pub const SERVICES: [Permission; 5] = [
        Permission::BOOK_SERVICE,
        Permission::ACCOUNT_SERVICE,
        Permission::LIBRARY_SERVICE,
        Permission::PROPERTY_SERVICE,
        Permission::RECORD_SERVICE,
    ];
}

impl UserGroup {
    /// Every operation bit the group may exercise.
    pub const fn allowed(self) -> Permission {
        match self {
            UserGroup::User => Permission::BOOK_SERVICE
                .union(Permission::ACCOUNT_SERVICE)
                .union(Permission::RECHARGE),
            UserGroup::Manager => Permission::QUERY
                .union(Permission::LIBRARY_SERVICE)
                .union(Permission::RECORD_SERVICE),
            UserGroup::Admin => Permission::BOOK_SERVICE
                .union(Permission::ACCOUNT_SERVICE)
                .union(Permission::LIBRARY_SERVICE)
                .union(Permission::PROPERTY_SERVICE)
                .union(Permission::RECORD_SERVICE),
        }
    }
}

/// Coarse gate: does the group hold any bit of `service`?
pub fn require_service(group: UserGroup, service: Permission) -> bool {
    group.allowed().intersects(service)
}

/// Precise gate: does the group hold every bit of `operation`?
pub fn check_access(group: UserGroup, operation: Permission) -> bool {
    group.allowed().contains(operation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_masks_match_the_stored_bit_values() {
        assert_eq!(UserGroup::User.allowed().bits(), 0x13F);
        assert_eq!(UserGroup::Manager.allowed().bits(), 0xCC4);
        assert_eq!(UserGroup::Admin.allowed().bits(), 0xFFF);
    }

    #[test]
    fn service_masks_cover_their_operations() {
        assert_eq!(Permission::BOOK_SERVICE.bits(), 0x007);
        assert_eq!(Permission::ACCOUNT_SERVICE.bits(), 0x038);
        assert_eq!(Permission::LIBRARY_SERVICE.bits(), 0x0C0);
        assert_eq!(Permission::PROPERTY_SERVICE.bits(), 0x300);
        assert_eq!(Permission::RECORD_SERVICE.bits(), 0xC00);
    }

    #[test]
    fn predicates_agree_with_the_bitwise_definition() {
        let mut masks: Vec<Permission> = Permission::OPERATIONS.to_vec();
        masks.extend(Permission::SERVICES);
        masks.push(Permission::BORROW | Permission::ADD_BOOK);
        masks.push(Permission::QUERY | Permission::RECORD_SERVICE);

        for group in UserGroup::ALL {
            let allowed = group.allowed().bits();
            for mask in &masks {
                let overlap = allowed & mask.bits();
                assert_eq!(require_service(group, *mask), overlap != 0, "{group} {mask:?}");
                assert_eq!(check_access(group, *mask), overlap == mask.bits(), "{group} {mask:?}");
            }
        }
    }

    #[test]
    fn manager_sees_library_but_cannot_borrow() {
        assert!(require_service(UserGroup::Manager, Permission::LIBRARY_SERVICE));
        assert!(check_access(UserGroup::Manager, Permission::ADD_BOOK));
        assert!(require_service(UserGroup::Manager, Permission::BOOK_SERVICE));
        assert!(!check_access(UserGroup::Manager, Permission::BORROW));
        assert!(!check_access(UserGroup::Manager, Permission::BOOK_SERVICE));
    }

    #[test]
    fn user_has_no_library_or_record_service() {
        assert!(!require_service(UserGroup::User, Permission::LIBRARY_SERVICE));
        assert!(!require_service(UserGroup::User, Permission::RECORD_SERVICE));
        assert!(check_access(UserGroup::User, Permission::RECHARGE));
        assert!(!check_access(UserGroup::User, Permission::DEDUCT));
    }
}
