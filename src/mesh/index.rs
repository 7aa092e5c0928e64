//! Index types for mesh elements.
//!
//! This module provides type-safe index wrappers for vertices, half-edges, and
//! faces. All indices are 32-bit: the cavity surfaces this crate processes are
//! well below the `u32` range, and a single width keeps ids `Copy`-cheap and
//! hashable without generic plumbing.

use std::fmt::{self, Debug};

/// Sentinel raw value representing an invalid/null index.
const INVALID: u32 = u32::MAX;

macro_rules! impl_index_type {
    ($(#[$doc:meta])* $name:ident, $display:literal) => {
        $(#[$doc])*
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Create a new index from a raw value.
            #[inline]
            pub fn new(index: usize) -> Self {
                debug_assert!(index < INVALID as usize, "index {} out of range", index);
                Self(index as u32)
            }

            /// Create an invalid/null index.
            #[inline]
            pub fn invalid() -> Self {
                Self(INVALID)
            }

            /// Get the index as a `usize`.
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            /// Check if this is a valid (non-null) index.
            #[inline]
            pub fn is_valid(self) -> bool {
                self.0 != INVALID
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, "{}({})", $display, self.index())
                } else {
                    write!(f, "{}(INVALID)", $display)
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::invalid()
            }
        }

        impl From<usize> for $name {
            fn from(v: usize) -> Self {
                Self::new(v)
            }
        }
    };
}

impl_index_type!(
    /// A type-safe vertex index.
    VertexId,
    "V"
);
impl_index_type!(
    /// A type-safe half-edge index.
    HalfEdgeId,
    "HE"
);
impl_index_type!(
    /// A type-safe face index.
    FaceId,
    "F"
);
