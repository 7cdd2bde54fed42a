//! Declarative authorization policy.
//!
//! Every operation names a [`Permission`]; the table below maps each
//! permission to the roles allowed to invoke it. Handlers call
//! [`authorize`] once at the top, then apply ownership predicates
//! (caller id equals the record's bound rider/mechanic) where relevant.

use wayside_core::error::CoreError;
use wayside_core::roles::{ROLE_ADMIN, ROLE_MECHANIC, ROLE_RIDER, ROLE_WORKSHOP};

use super::auth::AuthUser;

/// One entry per operation on the external interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    CreateBreakdown,
    ListBreakdowns,
    ViewBreakdown,
    UpdateBreakdownStatus,
    CancelBreakdown,
    ForceCancelBreakdown,
    AcceptOffer,
    DeclineOffer,
    AttachPhoto,
    RegisterMechanic,
    ViewOwnMechanic,
    ViewOffers,
    UpdateOwnLocation,
    UpdateOwnAvailability,
    AdminUpdateAvailability,
    RaiseDispute,
    ListDisputes,
    ViewDispute,
    ResolveDispute,
}

/// The roles permitted to exercise a permission.
pub fn allowed_roles(permission: Permission) -> &'static [&'static str] {
    use Permission::*;
    match permission {
        CreateBreakdown | CancelBreakdown | AttachPhoto => &[ROLE_RIDER],
        ListBreakdowns | ViewBreakdown => &[ROLE_RIDER, ROLE_MECHANIC, ROLE_ADMIN],
        UpdateBreakdownStatus => &[ROLE_MECHANIC, ROLE_ADMIN],
        ForceCancelBreakdown | AdminUpdateAvailability | ResolveDispute => &[ROLE_ADMIN],
        AcceptOffer | DeclineOffer | ViewOffers => &[ROLE_MECHANIC],
        RegisterMechanic | ViewOwnMechanic | UpdateOwnLocation | UpdateOwnAvailability => {
            &[ROLE_MECHANIC, ROLE_WORKSHOP]
        }
        RaiseDispute | ListDisputes | ViewDispute => {
            &[ROLE_RIDER, ROLE_MECHANIC, ROLE_WORKSHOP, ROLE_ADMIN]
        }
    }
}

/// Check the caller's role against the policy table.
pub fn authorize(user: &AuthUser, permission: Permission) -> Result<(), CoreError> {
    if allowed_roles(permission).contains(&user.role.as_str()) {
        Ok(())
    } else {
        Err(CoreError::Forbidden(format!(
            "role '{}' may not perform {:?}",
            user.role, permission
        )))
    }
}
