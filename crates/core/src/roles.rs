//! Well-known role name constants.
//!
//! These are the values carried in the JWT `role` claim issued by the
//! upstream identity service.

pub const ROLE_RIDER: &str = "rider";
pub const ROLE_MECHANIC: &str = "mechanic";
pub const ROLE_WORKSHOP: &str = "workshop";
pub const ROLE_ADMIN: &str = "admin";

/// Every role the platform recognizes.
pub const ALL_ROLES: [&str; 4] = [ROLE_RIDER, ROLE_MECHANIC, ROLE_WORKSHOP, ROLE_ADMIN];
