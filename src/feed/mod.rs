//! Live feed plumbing: collaborator traits, resource handles, and the
//! slot-keyed subscription manager.

/// Resource handle wrapping a single feed teardown.
mod handle;
/// Slot-keyed live subscription management with generation counters.
pub mod manager;
/// In-memory backend used by the demo binary and tests.
pub mod memory;
/// External collaborator traits and feed data types.
pub mod source;

pub use handle::FeedHandle;
pub use manager::{FeedSlot, Generation, SubscriptionManager};
pub use source::{
    AuthProvider, DocumentSnapshot, DocumentStore, QueryKey, RoleResolver, SortDirection,
};
