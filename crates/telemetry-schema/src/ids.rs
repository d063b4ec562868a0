//! Typed UUID identifiers.
//!
//! Bare `Uuid`s would let a call site silently pass a `device_id` where an
//! `aggregator_id` is expected. Each identifier class gets its own newtype,
//! grounded on the teacher crate's `EventId`/`SessionId` pattern.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A UUID failed to parse from its string form.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
#[error("invalid UUID: {0}")]
pub struct IdParseError(String);

macro_rules! uuid_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random (v4) identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap a server-issued or otherwise externally sourced UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// The underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| IdParseError(e.to_string()))
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_newtype!(AggregatorId);
uuid_newtype!(DeviceId);
uuid_newtype!(SnapshotId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_display_and_from_str() {
        let id = DeviceId::new();
        let parsed: DeviceId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn rejects_malformed_uuid_strings() {
        assert!("not-a-uuid".parse::<SnapshotId>().is_err());
    }

    #[test]
    fn distinct_id_types_do_not_implicitly_convert() {
        let device_uuid = DeviceId::new().as_uuid();
        let aggregator_id = AggregatorId::from_uuid(device_uuid);
        assert_eq!(aggregator_id.as_uuid(), device_uuid);
    }
}
