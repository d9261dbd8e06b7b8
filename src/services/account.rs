//! Account actions surfaced by the shell: sign out and delete account.
//!
//! Both actions flip the performing flag through a drop guard, so it returns
//! to `false` on every path, and terminate in a handled branch: failures
//! surface as a notification, never as an error to the caller.

use std::sync::Arc;

use tracing::info;

use crate::{feed::AuthProvider, state::SharedState};

/// Keeps the performing-action flag set for the duration of an account
/// action, clearing it when dropped.
struct PerformingGuard {
    state: SharedState,
}

impl PerformingGuard {
    fn acquire(state: SharedState) -> Self {
        state.set_performing(true);
        Self { state }
    }
}

impl Drop for PerformingGuard {
    fn drop(&mut self) {
        self.state.set_performing(false);
    }
}

/// Terminate the current session. On success every dialog closes and a
/// confirmation is shown; on failure the provider's message is shown.
pub async fn sign_out(state: &SharedState, auth: &Arc<dyn AuthProvider>) {
    let _guard = PerformingGuard::acquire(state.clone());

    match auth.sign_out().await {
        Ok(()) => {
            info!("signed out");
            state.close_all_dialogs().await;
            state.notifier().notify("Signed out");
        }
        Err(error) => state.notifier().notify(error.message),
    }
}

/// Permanently delete the authenticated account. Same notification and
/// cleanup discipline as [`sign_out`].
pub async fn delete_account(state: &SharedState, auth: &Arc<dyn AuthProvider>) {
    let _guard = PerformingGuard::acquire(state.clone());

    match auth.delete_account().await {
        Ok(()) => {
            info!("account deleted");
            state.close_all_dialogs().await;
            state.notifier().notify("Deleted account");
        }
        Err(error) => state.notifier().notify(error.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ProviderError,
        feed::memory::MemoryAuth,
        state::{AppState, DialogKind},
    };

    fn provider() -> (Arc<MemoryAuth>, Arc<dyn AuthProvider>) {
        let auth = Arc::new(MemoryAuth::new());
        let provider: Arc<dyn AuthProvider> = auth.clone();
        (auth, provider)
    }

    #[tokio::test]
    async fn successful_delete_closes_dialogs_and_confirms() {
        let state = AppState::new();
        let (_auth, provider) = provider();
        state.open_dialog(DialogKind::DeleteAccount).await;

        delete_account(&state, &provider).await;

        assert!(state.open_dialogs().await.is_empty());
        let notification = state.notifier().watcher().borrow().clone().unwrap();
        assert_eq!(notification.message, "Deleted account");
        assert!(!state.is_performing());
    }

    #[tokio::test]
    async fn rejected_delete_surfaces_the_provider_message() {
        let state = AppState::new();
        let (auth, provider) = provider();
        auth.fail_next_delete(ProviderError::new("x", "boom"));
        state.open_dialog(DialogKind::DeleteAccount).await;

        delete_account(&state, &provider).await;

        let notification = state.notifier().watcher().borrow().clone().unwrap();
        assert_eq!(notification.message, "boom");
        // The performing flag returns to false even on the failure path.
        assert!(!state.is_performing());
        // A failed action leaves the confirmation dialog up.
        assert!(state.is_dialog_open(DialogKind::DeleteAccount).await);
    }

    #[tokio::test]
    async fn successful_sign_out_confirms() {
        let state = AppState::new();
        let (_auth, provider) = provider();
        state.open_dialog(DialogKind::SignOut).await;

        sign_out(&state, &provider).await;

        assert!(state.open_dialogs().await.is_empty());
        let notification = state.notifier().watcher().borrow().clone().unwrap();
        assert_eq!(notification.message, "Signed out");
    }

    #[tokio::test]
    async fn rejected_sign_out_keeps_exactly_one_notification() {
        let state = AppState::new();
        let (auth, provider) = provider();
        auth.fail_next_sign_out(ProviderError::new("auth/busy", "try again"));

        sign_out(&state, &provider).await;

        let notification = state.notifier().watcher().borrow().clone().unwrap();
        assert_eq!(notification.message, "try again");
        assert!(!state.is_performing());
    }
}
