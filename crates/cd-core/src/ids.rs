//! Strongly typed identifier wrappers for road-graph entities.
//!
//! The map store keys everything by the source map's stable 64-bit ids, so
//! the wrappers hold an `i64` rather than an arena index.  The inner integer
//! is `pub` for SQL parameter binding; everywhere else the wrapper type keeps
//! node and way ids from being swapped.

use std::fmt;

/// Generate a typed ID wrapper around a stable 64-bit map id.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident;) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub i64);

        impl $name {
            /// The raw id as stored in the map database.
            #[inline(always)]
            pub fn raw(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<i64> for $name {
            #[inline(always)]
            fn from(raw: i64) -> Self {
                $name(raw)
            }
        }
    };
}

typed_id! {
    /// A node of the road graph (a point on a way).
    pub struct NodeId;
}

typed_id! {
    /// A way of the road graph (one road segment with attributes).
    pub struct WayId;
}
