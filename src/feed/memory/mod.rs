//! In-memory implementations of the external collaborators. The demo binary
//! and the feed-driven tests run entirely against this backend.

/// In-memory auth provider and role resolver.
mod auth;
/// In-memory document store with push-based watchers.
mod store;

pub use auth::MemoryAuth;
pub use store::MemoryStore;
