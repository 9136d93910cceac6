// crates/chamber-model/src/identifiers.rs
// ============================================================================
// Module: Chamber Identifiers
// Description: Canonical opaque identifiers shared across the Chamber runtime.
// Purpose: Provide strongly typed, serializable identifiers with stable wire
//          forms so node/edge/scene/device references can never be confused
//          with each other at a call site.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every identifier in Chamber is an opaque, serializable newtype over a
//! `String`. None of them are normalized or validated here; validation that
//! an identifier actually resolves to something happens at the owning
//! component (the scene graph for node/edge ids, the device registry for
//! device/controller ids).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Generates an opaque, string-backed identifier newtype.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

string_id! {
    /// Identifier of a single room instance.
    ///
    /// # Invariants
    /// - Opaque UTF-8 string; no runtime state, broker, or database is ever
    ///   shared across two distinct room ids.
    RoomId
}

string_id! {
    /// Identifier of a single operator session within a room.
    RoomSessionId
}

string_id! {
    /// Identifier of a scene within a room's scene graph.
    SceneId
}

string_id! {
    /// Identifier of a node, unique within the scene or subgraph that owns it.
    ///
    /// # Invariants
    /// - Node ids are only unique within their owning scene/subgraph, not
    ///   globally; callers must carry the owning scope alongside this id.
    NodeId
}

string_id! {
    /// Identifier of an edge, unique within the scene or subgraph that owns it.
    EdgeId
}

string_id! {
    /// Identifier of a logical device, stable across controller reconnects.
    LogicalDeviceId
}

string_id! {
    /// Identifier of a hardware controller endpoint.
    ControllerId
}

string_id! {
    /// Version tag for a versioned configuration document (room manifest,
    /// device contract, or scene-graph revision).
    ///
    /// # Invariants
    /// - The runtime refuses to start when a loaded document's version does
    ///   not match the version it understands; see `chamber-config`.
    SchemaVersion
}

string_id! {
    /// Identifier of a loaded scene-graph revision.
    GraphRevisionId
}
