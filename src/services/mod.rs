//! Long-running and user-triggered processes built on the shared state.

/// Sign-out and delete-account actions.
pub mod account;
/// Leaderboard query view.
pub mod leaderboard;
/// Replace-on-notify user notification channel.
pub mod notifications;
/// Shell controller driving the session from auth transitions.
pub mod shell;
