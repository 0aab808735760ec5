//! Typed ID definitions for goods entities.
//!
//! Goods and projects are both keyed by database integers. Wrapping them
//! prevents passing a project id where a good id was expected.
//!
//! # Example
//!
//! ```rust
//! use goods_core::common::{GoodId, ProjectId};
//!
//! let good_id = GoodId::new(7);
//! let project_id = ProjectId::new(42);
//!
//! // This would be a compile error:
//! // let wrong: GoodId = project_id;
//! # let _ = (good_id, project_id);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
            sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(i64);

        impl $name {
            #[inline]
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Returns the raw database value.
            #[inline]
            pub const fn get(self) -> i64 {
                self.0
            }

            /// Ids are generated by the database starting at 1.
            #[inline]
            pub const fn is_valid(self) -> bool {
                self.0 > 0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

integer_id!(
    /// Typed ID for a good (identity column of the `goods` table).
    GoodId
);

integer_id!(
    /// Typed ID for the project that owns a set of goods.
    ProjectId
);
