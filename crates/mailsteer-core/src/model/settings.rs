//! Per-account user settings.

use serde::{Deserialize, Serialize};

/// User settings delivered through the account's settings resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Ask before archiving a conversation.
    pub confirm_archive: bool,
    /// Ask before deleting a conversation.
    pub confirm_delete: bool,
}

impl Settings {
    /// Settings that ask before every confirmable action.
    #[must_use]
    pub const fn confirm_all() -> Self {
        Self {
            confirm_archive: true,
            confirm_delete: true,
        }
    }
}
