//! Mechanic availability states and the mechanic snapshot model.

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;
use crate::types::{DbId, Timestamp};

/// Availability of a mechanic.
///
/// The `u8` discriminants are load-bearing: the store keeps each
/// mechanic's status in an `AtomicU8` so that reservation is a single
/// compare-and-swap. BUSY is owned by the dispatch engine; mechanics
/// toggle only between ONLINE and OFFLINE themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum MechanicStatus {
    Offline = 0,
    Online = 1,
    Busy = 2,
}

impl MechanicStatus {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Online,
            2 => Self::Busy,
            _ => Self::Offline,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Offline => "OFFLINE",
            Self::Online => "ONLINE",
            Self::Busy => "BUSY",
        }
    }

    /// The derived `is_online` flag is true exactly for ONLINE.
    pub fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

impl std::fmt::Display for MechanicStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point-in-time snapshot of a mechanic's availability record.
///
/// Assembled by the store; `is_online` is always derived from `status`
/// at snapshot time so the two can never disagree on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mechanic {
    pub id: DbId,
    /// The owning platform user.
    pub user_id: DbId,
    pub name: String,
    pub skills: Vec<String>,
    pub verified: bool,
    pub status: MechanicStatus,
    pub is_online: bool,
    pub location: Option<GeoPoint>,
    pub location_updated_at: Option<Timestamp>,
    pub created_at: Timestamp,
}
