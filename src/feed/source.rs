use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::{error::ProviderError, feed::FeedHandle, projection::Identity};

/// Callback receiving a single-document delivery.
pub type DocumentCallback = Box<dyn Fn(DocumentSnapshot) + Send + Sync>;
/// Callback receiving a query delivery (documents in transport order).
pub type QueryCallback = Box<dyn Fn(Vec<DocumentSnapshot>) + Send + Sync>;
/// Callback receiving an auth-state transition.
pub type IdentityCallback = Box<dyn Fn(Option<Identity>) + Send + Sync>;
/// Callback receiving a feed error.
pub type ErrorCallback = Box<dyn Fn(ProviderError) + Send + Sync>;

/// Point-in-time view of a single document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSnapshot {
    /// Identifier of the document inside its collection.
    pub id: String,
    /// Raw payload; `None` when the document does not exist.
    pub data: Option<serde_json::Value>,
}

impl DocumentSnapshot {
    /// Whether the document exists in the store.
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }
}

/// Sort direction of a query feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    /// Largest value first.
    Descending,
    /// Smallest value first.
    Ascending,
}

/// Parameters that determine a query feed's shape. Two keys that compare
/// equal describe the same feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryKey {
    /// Collection the query runs against.
    pub collection: String,
    /// Field the results are ordered by.
    pub order_by: String,
    /// Ordering direction.
    pub direction: SortDirection,
    /// Maximum number of documents per delivery.
    pub limit: usize,
}

/// Push-based document store. Registration is synchronous with respect to
/// the caller; deliveries arrive later through the callbacks until the
/// returned handle is closed.
pub trait DocumentStore: Send + Sync {
    /// Watch a single document, receiving an initial snapshot and one
    /// delivery per subsequent change.
    fn watch_document(
        &self,
        collection: &str,
        id: &str,
        on_data: DocumentCallback,
        on_error: ErrorCallback,
    ) -> FeedHandle;

    /// Watch an ordered, limited query over a collection.
    fn watch_query(
        &self,
        key: &QueryKey,
        on_data: QueryCallback,
        on_error: ErrorCallback,
    ) -> FeedHandle;
}

/// External authentication service.
pub trait AuthProvider: Send + Sync {
    /// Register an auth-state listener; it receives the current identity
    /// immediately and every transition afterwards.
    fn on_auth_state_changed(
        &self,
        on_identity: IdentityCallback,
        on_error: ErrorCallback,
    ) -> FeedHandle;

    /// Terminate the current session.
    fn sign_out(&self) -> BoxFuture<'static, Result<(), ProviderError>>;

    /// Permanently delete the authenticated account.
    fn delete_account(&self) -> BoxFuture<'static, Result<(), ProviderError>>;
}

/// Resolves the role list attached to the authenticated account.
pub trait RoleResolver: Send + Sync {
    /// Fetch the roles granted to the current identity.
    fn get_roles(&self) -> BoxFuture<'static, Result<Vec<String>, ProviderError>>;
}
