use indexmap::IndexMap;
use serde::Serialize;

/// Every dialog the shell can host. An enumerated key means an invalid
/// dialog identifier cannot be expressed, unlike lookup-by-name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DialogKind {
    /// Account creation flow.
    SignUp,
    /// Sign-in flow.
    SignIn,
    /// Profile and appearance settings.
    Settings,
    /// Account deletion confirmation.
    DeleteAccount,
    /// Sign-out confirmation.
    SignOut,
    /// Reminder shown when the profile has no username yet.
    NoUsername,
    /// Custom game configuration flow.
    CustomGame,
}

impl DialogKind {
    /// All dialog kinds, in registry order.
    pub const ALL: [DialogKind; 7] = [
        DialogKind::SignUp,
        DialogKind::SignIn,
        DialogKind::Settings,
        DialogKind::DeleteAccount,
        DialogKind::SignOut,
        DialogKind::NoUsername,
        DialogKind::CustomGame,
    ];
}

/// Open/closed state for every dialog, consumed by the presentation layer.
#[derive(Debug, Clone)]
pub struct DialogRegistry {
    open: IndexMap<DialogKind, bool>,
}

impl Default for DialogRegistry {
    fn default() -> Self {
        Self {
            open: DialogKind::ALL.into_iter().map(|kind| (kind, false)).collect(),
        }
    }
}

impl DialogRegistry {
    /// Registry with every dialog closed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `kind` is currently open.
    pub fn is_open(&self, kind: DialogKind) -> bool {
        self.open.get(&kind).copied().unwrap_or(false)
    }

    /// Open a dialog.
    pub fn open(&mut self, kind: DialogKind) {
        self.open.insert(kind, true);
    }

    /// Close a dialog.
    pub fn close(&mut self, kind: DialogKind) {
        self.open.insert(kind, false);
    }

    /// Close every dialog, e.g. after a completed account action.
    pub fn close_all(&mut self) {
        for state in self.open.values_mut() {
            *state = false;
        }
    }

    /// Open the settings dialog. There is a single active configuration
    /// flow, so the dialogs that funnel into settings close alongside.
    pub fn open_settings(&mut self) {
        self.open(DialogKind::Settings);
        self.close(DialogKind::NoUsername);
        self.close(DialogKind::CustomGame);
    }

    /// Kinds currently open, in registry order.
    pub fn open_kinds(&self) -> Vec<DialogKind> {
        self.open
            .iter()
            .filter_map(|(kind, open)| open.then_some(*kind))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_fully_closed() {
        let registry = DialogRegistry::new();
        assert!(registry.open_kinds().is_empty());
    }

    #[test]
    fn open_and_close_are_idempotent() {
        let mut registry = DialogRegistry::new();
        registry.open(DialogKind::SignIn);
        registry.open(DialogKind::SignIn);
        assert!(registry.is_open(DialogKind::SignIn));

        registry.close(DialogKind::SignIn);
        registry.close(DialogKind::SignIn);
        assert!(!registry.is_open(DialogKind::SignIn));
    }

    #[test]
    fn settings_closes_the_configuration_funnel() {
        let mut registry = DialogRegistry::new();
        registry.open(DialogKind::NoUsername);
        registry.open(DialogKind::CustomGame);
        registry.open(DialogKind::SignOut);

        registry.open_settings();

        assert!(registry.is_open(DialogKind::Settings));
        assert!(!registry.is_open(DialogKind::NoUsername));
        assert!(!registry.is_open(DialogKind::CustomGame));
        // Unrelated dialogs are untouched.
        assert!(registry.is_open(DialogKind::SignOut));
    }

    #[test]
    fn close_all_clears_everything() {
        let mut registry = DialogRegistry::new();
        registry.open(DialogKind::SignUp);
        registry.open(DialogKind::DeleteAccount);

        registry.close_all();

        assert!(registry.open_kinds().is_empty());
    }
}
