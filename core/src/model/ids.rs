use serde::{Deserialize, Serialize};

/// Declares an opaque integer identifier assigned by the store.
macro_rules! store_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i32);

        impl $name {
            pub fn get(self) -> i32 { self.0 }

            /// Identifiers handed out by the store are always positive.
            pub fn is_assigned(self) -> bool { self.0 > 0 }
        }

        impl From<i32> for $name {
            fn from(value: i32) -> Self { $name(value) }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self { id.0 }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{} {}", $label, self.0) }
        }
    };
}

store_id!(
    /// Root of the hierarchy.
    ProjectId,
    "project"
);
store_id!(BacklogId, "backlog");
store_id!(WorkId, "work");
store_id!(UserId, "user");
store_id!(RoleId, "role");
store_id!(PriorityId, "priority");
store_id!(TrackerId, "tracker");
store_id!(ActivityId, "activity");
store_id!(
    /// Workflow state of a work item (`currentState`).
    StateId,
    "state"
);
