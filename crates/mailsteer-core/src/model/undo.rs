//! Undo records handed to the list surface.

use serde::{Deserialize, Serialize};

/// Kind of user action, as recorded in an undo operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    /// Archive.
    Archive,
    /// Delete.
    Delete,
    /// Mute.
    Mute,
    /// Report spam.
    ReportSpam,
    /// Change of folder membership.
    FolderChange,
}

impl ActionKind {
    /// Get display name for the action.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::Delete => "delete",
            Self::Mute => "mute",
            Self::ReportSpam => "report spam",
            Self::FolderChange => "change folders",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A completed action the user may still reverse.
///
/// The undo window's timer belongs to the list surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoOperation {
    /// Number of conversations affected.
    pub count: usize,
    /// What was done.
    pub kind: ActionKind,
}

impl UndoOperation {
    /// Creates an undo operation.
    #[must_use]
    pub const fn new(count: usize, kind: ActionKind) -> Self {
        Self { count, kind }
    }
}
