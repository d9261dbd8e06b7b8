//! Shared shell state: the session snapshot, the state machine behind it,
//! the dialog registry, and the notification channel.

/// Dialog open/close registry keyed by an enumerated dialog kind.
pub mod dialogs;
/// Session state machine.
pub mod machine;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{RwLock, watch};

use crate::{
    projection::{Identity, ThemeSpec, UserProfile},
    services::notifications::Notifier,
};

pub use self::dialogs::{DialogKind, DialogRegistry};
pub use self::machine::{InvalidTransition, SessionEvent, SessionMachine, SessionPhase};

/// Cheaply clonable handle on the shared shell state.
pub type SharedState = Arc<AppState>;

/// Externally observable session state consumed by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    /// Whether the shell finished its initial auth round-trip. The UI shows
    /// a launch screen until this flips.
    pub ready: bool,
    /// Current phase of the session machine.
    pub phase: SessionPhase,
    /// Identity reported by the auth provider, if any.
    pub identity: Option<Identity>,
    /// Projection of the profile document backing the identity.
    pub profile: Option<UserProfile>,
    /// Roles granted to the identity.
    pub roles: Vec<String>,
    /// Active display theme.
    pub theme: ThemeSpec,
}

impl SessionSnapshot {
    /// Snapshot equivalent to a signed-out session.
    pub fn signed_out(ready: bool) -> Self {
        Self {
            ready,
            phase: SessionPhase::Unauthenticated,
            identity: None,
            profile: None,
            roles: Vec::new(),
            theme: ThemeSpec::default(),
        }
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            ready: false,
            phase: SessionPhase::Uninitialized,
            identity: None,
            profile: None,
            roles: Vec::new(),
            theme: ThemeSpec::default(),
        }
    }
}

/// Central shell state shared between the controller, the account actions,
/// and the presentation layer.
pub struct AppState {
    session: watch::Sender<SessionSnapshot>,
    machine: RwLock<SessionMachine>,
    dialogs: RwLock<DialogRegistry>,
    notifier: Notifier,
    performing: watch::Sender<bool>,
}

impl AppState {
    /// Construct a fresh state wrapped in an [`Arc`] so it can be cloned
    /// cheaply.
    pub fn new() -> SharedState {
        Arc::new(Self {
            session: watch::channel(SessionSnapshot::default()).0,
            machine: RwLock::new(SessionMachine::new()),
            dialogs: RwLock::new(DialogRegistry::new()),
            notifier: Notifier::new(),
            performing: watch::channel(false).0,
        })
    }

    /// Observe session snapshots.
    pub fn session_watcher(&self) -> watch::Receiver<SessionSnapshot> {
        self.session.subscribe()
    }

    /// Latest published session snapshot.
    pub fn current_session(&self) -> SessionSnapshot {
        self.session.borrow().clone()
    }

    /// Apply an event to the session machine, returning the next phase.
    pub async fn apply_session_event(
        &self,
        event: SessionEvent,
    ) -> Result<SessionPhase, InvalidTransition> {
        let mut machine = self.machine.write().await;
        machine.apply(event)
    }

    /// Publish a new session snapshot to every watcher.
    pub fn publish_session(&self, snapshot: SessionSnapshot) {
        let _ = self.session.send(snapshot);
    }

    /// Notification channel shared across the shell.
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Whether an account action (sign-out, delete) is in flight.
    pub fn is_performing(&self) -> bool {
        *self.performing.borrow()
    }

    /// Observe the performing-action flag.
    pub fn performing_watcher(&self) -> watch::Receiver<bool> {
        self.performing.subscribe()
    }

    pub(crate) fn set_performing(&self, value: bool) {
        let _ = self.performing.send(value);
    }

    /// Open a dialog.
    pub async fn open_dialog(&self, kind: DialogKind) {
        self.dialogs.write().await.open(kind);
    }

    /// Close a dialog.
    pub async fn close_dialog(&self, kind: DialogKind) {
        self.dialogs.write().await.close(kind);
    }

    /// Close every dialog.
    pub async fn close_all_dialogs(&self) {
        self.dialogs.write().await.close_all();
    }

    /// Open settings, collapsing the dialogs that funnel into it.
    pub async fn open_settings(&self) {
        self.dialogs.write().await.open_settings();
    }

    /// Whether `kind` is currently open.
    pub async fn is_dialog_open(&self, kind: DialogKind) -> bool {
        self.dialogs.read().await.is_open(kind)
    }

    /// Kinds currently open, in registry order.
    pub async fn open_dialogs(&self) -> Vec<DialogKind> {
        self.dialogs.read().await.open_kinds()
    }
}
