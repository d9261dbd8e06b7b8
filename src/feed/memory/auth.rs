use std::sync::{Mutex, RwLock};

use futures::future::BoxFuture;
use tokio::sync::{broadcast, watch};

use crate::{
    error::ProviderError,
    feed::{
        FeedHandle,
        source::{AuthProvider, ErrorCallback, IdentityCallback, RoleResolver},
    },
};
use crate::projection::Identity;

const ERROR_CAPACITY: usize = 8;

/// In-memory auth provider and role resolver.
///
/// Session changes fan out to registered listeners the way a hosted auth
/// service does: the current identity is delivered immediately on
/// registration, then once per transition. Tests can inject one-shot
/// failures for each fallible operation.
pub struct MemoryAuth {
    identity: watch::Sender<Option<Identity>>,
    errors: broadcast::Sender<ProviderError>,
    roles: RwLock<Vec<String>>,
    roles_failure: Mutex<Option<ProviderError>>,
    sign_out_failure: Mutex<Option<ProviderError>>,
    delete_failure: Mutex<Option<ProviderError>>,
}

impl Default for MemoryAuth {
    fn default() -> Self {
        Self {
            identity: watch::channel(None).0,
            errors: broadcast::channel(ERROR_CAPACITY).0,
            roles: RwLock::new(Vec::new()),
            roles_failure: Mutex::new(None),
            sign_out_failure: Mutex::new(None),
            delete_failure: Mutex::new(None),
        }
    }
}

impl MemoryAuth {
    /// Provider with no signed-in identity and an empty role list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sign an identity in, notifying every auth listener.
    pub fn sign_in(&self, identity: Identity) {
        let _ = self.identity.send(Some(identity));
    }

    /// Replace the role list returned by [`RoleResolver::get_roles`].
    pub fn set_roles(&self, roles: Vec<String>) {
        *self.roles.write().expect("roles lock poisoned") = roles;
    }

    /// Push a transport error to every auth listener. Test hook.
    pub fn emit_error(&self, error: ProviderError) {
        let _ = self.errors.send(error);
    }

    /// Make the next `get_roles` call reject with `error`.
    pub fn fail_next_roles(&self, error: ProviderError) {
        *self.roles_failure.lock().expect("failure lock poisoned") = Some(error);
    }

    /// Make the next `sign_out` call reject with `error`.
    pub fn fail_next_sign_out(&self, error: ProviderError) {
        *self.sign_out_failure.lock().expect("failure lock poisoned") = Some(error);
    }

    /// Make the next `delete_account` call reject with `error`.
    pub fn fail_next_delete(&self, error: ProviderError) {
        *self.delete_failure.lock().expect("failure lock poisoned") = Some(error);
    }

    fn take_failure(slot: &Mutex<Option<ProviderError>>) -> Option<ProviderError> {
        slot.lock().expect("failure lock poisoned").take()
    }
}

impl AuthProvider for MemoryAuth {
    fn on_auth_state_changed(
        &self,
        on_identity: IdentityCallback,
        on_error: ErrorCallback,
    ) -> FeedHandle {
        let mut identities = self.identity.subscribe();
        let mut errors = self.errors.subscribe();

        let task = tokio::spawn(async move {
            on_identity(identities.borrow_and_update().clone());

            loop {
                tokio::select! {
                    changed = identities.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        on_identity(identities.borrow_and_update().clone());
                    }
                    error = errors.recv() => match error {
                        Ok(error) => on_error(error),
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        });

        FeedHandle::from_task(task)
    }

    fn sign_out(&self) -> BoxFuture<'static, Result<(), ProviderError>> {
        let failure = Self::take_failure(&self.sign_out_failure);
        let identity = self.identity.clone();

        Box::pin(async move {
            match failure {
                Some(error) => Err(error),
                None => {
                    let _ = identity.send(None);
                    Ok(())
                }
            }
        })
    }

    fn delete_account(&self) -> BoxFuture<'static, Result<(), ProviderError>> {
        let failure = Self::take_failure(&self.delete_failure);
        let identity = self.identity.clone();

        Box::pin(async move {
            match failure {
                Some(error) => Err(error),
                None => {
                    let _ = identity.send(None);
                    Ok(())
                }
            }
        })
    }
}

impl RoleResolver for MemoryAuth {
    fn get_roles(&self) -> BoxFuture<'static, Result<Vec<String>, ProviderError>> {
        let failure = Self::take_failure(&self.roles_failure);
        let roles = self.roles.read().expect("roles lock poisoned").clone();

        Box::pin(async move {
            match failure {
                Some(error) => Err(error),
                None => Ok(roles),
            }
        })
    }
}
