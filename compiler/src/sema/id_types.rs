//! Arena handles for the resolution engine
//!
//! Scopes, symbols and AST nodes live in flat arenas and refer to each other
//! through these `u32` handles. Owning-scope pointers, superclass links and
//! captured sets therefore hold plain ids and never form reference cycles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to define ID types with consistent behavior
macro_rules! define_id_type {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// Create a new ID from a raw u32 value
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            /// Get the raw u32 value of this ID
            pub const fn as_raw(self) -> u32 {
                self.0
            }

            /// Arena slot of this ID
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            /// ID for the arena slot `index`
            pub(crate) fn from_index(index: usize) -> Self {
                Self(u32::try_from(index).unwrap_or(u32::MAX))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<$name> for u32 {
            fn from(id: $name) -> u32 {
                id.0
            }
        }
    };
}

define_id_type!(
    /// Handle of a symbol in the scope graph's symbol arena
    SymbolId
);

define_id_type!(
    /// Handle of a scope in the scope graph
    ScopeId
);

define_id_type!(
    /// Handle of a node in an `Ast` arena
    NodeId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_round_trip_and_display() {
        let id = SymbolId::from_raw(42);
        assert_eq!(id.as_raw(), 42);
        assert_eq!(id.index(), 42);
        assert_eq!(u32::from(id), 42);
        assert_eq!(id.to_string(), "SymbolId(42)");
        assert_eq!(ScopeId::from_index(3), ScopeId::from_raw(3));
    }

    #[test]
    fn test_ids_are_transparent_in_json() {
        let json = serde_json::to_string(&NodeId::from_raw(7)).unwrap();
        assert_eq!(json, "7");
        let back: NodeId = serde_json::from_str("7").unwrap();
        assert_eq!(back, NodeId::from_raw(7));
    }
}
