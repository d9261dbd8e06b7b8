//! Shell controller: listens to auth-state transitions, drives the profile
//! subscription, and publishes the session snapshot the UI tree consumes.

use std::sync::Arc;

use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    config::AppConfig,
    error::ProviderError,
    feed::{
        AuthProvider, DocumentSnapshot, DocumentStore, FeedSlot, Generation, RoleResolver,
        SubscriptionManager,
    },
    projection::{Identity, project_profile},
    state::{DialogKind, SessionEvent, SessionPhase, SessionSnapshot, SharedState},
};

enum ShellEvent {
    Auth(Option<Identity>),
    AuthFailed(ProviderError),
    Profile(Generation, DocumentSnapshot),
    ProfileFailed(Generation, ProviderError),
    Shutdown,
}

/// Handle on a running shell controller. Shutting down closes the auth
/// listener and every open feed exactly once.
pub struct ShellHandle {
    events: mpsc::UnboundedSender<ShellEvent>,
    task: JoinHandle<()>,
}

impl ShellHandle {
    /// Stop the controller and wait for its teardown to complete.
    pub async fn shutdown(self) {
        let _ = self.events.send(ShellEvent::Shutdown);
        let _ = self.task.await;
    }
}

/// Top-level session process wiring auth transitions to the profile feed.
pub struct ShellController {
    state: SharedState,
    auth: Arc<dyn AuthProvider>,
    roles: Arc<dyn RoleResolver>,
    subscriptions: SubscriptionManager,
    users_collection: String,
}

impl ShellController {
    /// Spawn the controller's event loop and register the auth listener.
    pub fn start(
        state: SharedState,
        auth: Arc<dyn AuthProvider>,
        roles: Arc<dyn RoleResolver>,
        store: Arc<dyn DocumentStore>,
        config: &AppConfig,
    ) -> ShellHandle {
        let controller = Self {
            state,
            auth,
            roles,
            subscriptions: SubscriptionManager::new(store),
            users_collection: config.users_collection.clone(),
        };

        let (events, inbox) = mpsc::unbounded_channel();
        let task = tokio::spawn(controller.run(events.clone(), inbox));
        ShellHandle { events, task }
    }

    async fn run(
        self,
        events: mpsc::UnboundedSender<ShellEvent>,
        mut inbox: mpsc::UnboundedReceiver<ShellEvent>,
    ) {
        if let Err(err) = self.state.apply_session_event(SessionEvent::Start).await {
            warn!(error = %err, "shell controller started twice; refusing to run");
            return;
        }
        self.state.publish_session(SessionSnapshot {
            phase: SessionPhase::Loading,
            ..SessionSnapshot::default()
        });

        let on_identity = events.clone();
        let on_auth_error = events.clone();
        let mut auth_listener = self.auth.on_auth_state_changed(
            Box::new(move |identity| {
                let _ = on_identity.send(ShellEvent::Auth(identity));
            }),
            Box::new(move |error| {
                let _ = on_auth_error.send(ShellEvent::AuthFailed(error));
            }),
        );
        info!("shell controller started");

        let mut current_identity: Option<Identity> = None;

        while let Some(event) = inbox.recv().await {
            match event {
                ShellEvent::Auth(None) => {
                    debug!("auth reported no identity");
                    self.subscriptions.unsubscribe(FeedSlot::Profile);
                    current_identity = None;
                    self.reset(SessionEvent::SignedOut).await;
                }
                ShellEvent::Auth(Some(identity)) => {
                    debug!(uid = %identity.uid, "auth reported identity; opening profile feed");
                    let on_data = events.clone();
                    let on_error = events.clone();
                    self.subscriptions.subscribe_document(
                        FeedSlot::Profile,
                        &self.users_collection,
                        &identity.uid,
                        move |generation, snapshot| {
                            let _ = on_data.send(ShellEvent::Profile(generation, snapshot));
                        },
                        move |generation, error| {
                            let _ = on_error.send(ShellEvent::ProfileFailed(generation, error));
                        },
                    );
                    current_identity = Some(identity);
                }
                ShellEvent::Profile(generation, snapshot) => {
                    if !self.subscriptions.is_current(FeedSlot::Profile, generation) {
                        debug!(generation, "discarding superseded profile delivery");
                        continue;
                    }
                    let Some(identity) = current_identity.clone() else {
                        continue;
                    };
                    self.apply_profile(identity, snapshot).await;
                }
                ShellEvent::ProfileFailed(generation, error) => {
                    if !self.subscriptions.is_current(FeedSlot::Profile, generation) {
                        debug!(generation, "discarding superseded profile error");
                        continue;
                    }
                    self.subscriptions.unsubscribe(FeedSlot::Profile);
                    self.fail(error).await;
                }
                ShellEvent::AuthFailed(error) => {
                    self.fail(error).await;
                }
                ShellEvent::Shutdown => break,
            }
        }

        auth_listener.close();
        self.subscriptions.unsubscribe_all();
        info!("shell controller stopped");
    }

    /// Apply a profile delivery for the identity that opened the feed.
    async fn apply_profile(&self, identity: Identity, snapshot: DocumentSnapshot) {
        let Some(profile) = project_profile(&identity.uid, &snapshot) else {
            // Missing or malformed document: signed-in but without a data
            // point, equivalent to not being signed in.
            debug!(uid = %identity.uid, "profile document missing; staying unauthenticated");
            self.reset(SessionEvent::SignedOut).await;
            return;
        };

        let roles = match self.roles.get_roles().await {
            Ok(roles) => roles,
            Err(error) => {
                self.fail(error).await;
                return;
            }
        };

        match self.state.apply_session_event(SessionEvent::ProfileReady).await {
            Ok(phase) => {
                let needs_username = profile.username.trim().is_empty();
                let theme = profile.theme.clone();
                self.state.publish_session(SessionSnapshot {
                    ready: true,
                    phase,
                    identity: Some(identity),
                    profile: Some(profile),
                    roles,
                    theme,
                });
                if needs_username {
                    self.state.open_dialog(DialogKind::NoUsername).await;
                }
            }
            Err(err) => warn!(error = %err, "dropping profile delivery in invalid phase"),
        }
    }

    /// Return to a signed-out-equivalent session with `ready` set.
    async fn reset(&self, event: SessionEvent) {
        match self.state.apply_session_event(event).await {
            Ok(_) => self.state.publish_session(SessionSnapshot::signed_out(true)),
            Err(err) => warn!(error = %err, "session reset rejected"),
        }
    }

    /// Recover from a transport failure: reset, then surface exactly one
    /// notification carrying the provider's message.
    async fn fail(&self, error: ProviderError) {
        warn!(code = %error.code, message = %error.message, "feed failed; resetting session");
        self.reset(SessionEvent::TransportFailed).await;
        self.state.notifier().notify(error.message);
    }
}
