//! Type-safe entity identifiers.
//!
//! Schools, students and enrollments are keyed by database-assigned
//! `BIGSERIAL` values. Each gets its own newtype so a [`StudentId`] can
//! never be passed where a [`SchoolId`] is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw database key.
            #[must_use]
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Returns the raw database key.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

entity_id! {
    /// Identifier of a school (`escola`).
    SchoolId
}

entity_id! {
    /// Identifier of a student (`aluno`).
    StudentId
}

entity_id! {
    /// Identifier of an enrollment (`matricula`).
    EnrollmentId
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn display_is_raw_number() {
        assert_eq!(SchoolId::new(42).to_string(), "42");
    }

    #[test]
    fn serializes_as_plain_number() {
        let Ok(json) = serde_json::to_string(&EnrollmentId::new(7)) else {
            panic!("serialization failed");
        };
        assert_eq!(json, "7");

        let Ok(back) = serde_json::from_str::<EnrollmentId>("7") else {
            panic!("deserialization failed");
        };
        assert_eq!(back, EnrollmentId::new(7));
    }

    #[test]
    fn parses_trimmed_strings() {
        assert_eq!(" 12 ".parse::<StudentId>().ok(), Some(StudentId::new(12)));
        assert!("abc".parse::<StudentId>().is_err());
    }

    #[test]
    fn ordering_follows_raw_value() {
        assert!(SchoolId::new(1) < SchoolId::new(2));
    }
}
