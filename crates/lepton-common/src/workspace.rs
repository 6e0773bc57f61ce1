use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Control-plane-wide mode of a workspace.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceState {
    #[default]
    Normal,
    Paused,
    Terminated,
}

impl WorkspaceState {
    /// Paused and terminated workspaces reject every mutating request.
    pub fn is_writable(self) -> bool {
        self == WorkspaceState::Normal
    }
}

impl fmt::Display for WorkspaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkspaceState::Normal => "normal",
            WorkspaceState::Paused => "paused",
            WorkspaceState::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid workspace state '{0}', expected one of: normal, paused, terminated")]
pub struct ParseWorkspaceStateError(String);

impl FromStr for WorkspaceState {
    type Err = ParseWorkspaceStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(WorkspaceState::Normal),
            "paused" => Ok(WorkspaceState::Paused),
            "terminated" => Ok(WorkspaceState::Terminated),
            _ => Err(ParseWorkspaceStateError(s.to_string())),
        }
    }
}
