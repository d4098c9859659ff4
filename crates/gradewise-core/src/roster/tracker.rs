//! Delete tracker state machine
//!
//! ```text
//!  Idle ──request_removal──▶ ConfirmPending ──confirm──▶ Deleting
//!   ▲                            │                        │    │
//!   └────────── cancel ──────────┘        delete_failed ──┘    │ delete_succeeded
//!   ▲                                                          ▼
//!   └──── observe_list(id absent, not fetching) ──── AwaitingListSync
//! ```
//!
//! While `Deleting` or `AwaitingListSync` the confirmation cannot be
//! dismissed and no other removal can start.

use serde::Serialize;

use crate::error::{Error, Result};

/// Where a roster removal stands
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum DeleteState {
    #[default]
    Idle,
    ConfirmPending {
        id: String,
        label: String,
    },
    Deleting {
        id: String,
        label: String,
    },
    /// Deleted on the backend, waiting for a roster read without the row
    AwaitingListSync {
        id: String,
        label: String,
    },
}

impl DeleteState {
    fn name(&self) -> &'static str {
        match self {
            DeleteState::Idle => "idle",
            DeleteState::ConfirmPending { .. } => "awaiting confirmation",
            DeleteState::Deleting { .. } => "deleting",
            DeleteState::AwaitingListSync { .. } => "waiting for the roster to refresh",
        }
    }
}

impl std::fmt::Display for DeleteState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeleteState::Idle => f.write_str(self.name()),
            DeleteState::ConfirmPending { label, .. }
            | DeleteState::Deleting { label, .. }
            | DeleteState::AwaitingListSync { label, .. } => {
                write!(f, "{} ({})", self.name(), label)
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeleteTracker {
    state: DeleteState,
}

impl DeleteTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DeleteState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == DeleteState::Idle
    }

    /// Ask for confirmation before removing `id`
    ///
    /// A pending confirmation for another row is replaced.
    pub fn request_removal(&mut self, id: impl Into<String>, label: impl Into<String>) -> Result<()> {
        match self.state {
            DeleteState::Idle | DeleteState::ConfirmPending { .. } => {
                self.state = DeleteState::ConfirmPending {
                    id: id.into(),
                    label: label.into(),
                };
                Ok(())
            }
            _ => Err(self.busy("start another removal")),
        }
    }

    /// Whether the confirmation may be closed right now
    pub fn can_dismiss(&self) -> bool {
        matches!(
            self.state,
            DeleteState::Idle | DeleteState::ConfirmPending { .. }
        )
    }

    /// Close the confirmation; refused once the delete has started
    pub fn cancel(&mut self) -> bool {
        if !self.can_dismiss() {
            log::debug!("[roster] Ignoring dismiss while {}", self.state);
            return false;
        }
        self.state = DeleteState::Idle;
        true
    }

    /// Start deleting the pending row and return its id
    pub fn confirm(&mut self) -> Result<String> {
        match std::mem::take(&mut self.state) {
            DeleteState::ConfirmPending { id, label } => {
                self.state = DeleteState::Deleting {
                    id: id.clone(),
                    label,
                };
                Ok(id)
            }
            other => {
                self.state = other;
                Err(self.busy("confirm"))
            }
        }
    }

    /// The delete request failed; back to `Idle` without waiting for a refresh
    pub fn delete_failed(&mut self) {
        if matches!(self.state, DeleteState::Deleting { .. }) {
            self.state = DeleteState::Idle;
        }
    }

    /// The delete request succeeded; wait until the roster stops listing the row
    pub fn delete_succeeded(&mut self) {
        self.state = match std::mem::take(&mut self.state) {
            DeleteState::Deleting { id, label } => DeleteState::AwaitingListSync { id, label },
            other => other,
        };
    }

    /// Feed the latest roster read
    ///
    /// Leaves `AwaitingListSync` only when the removed id is absent and no
    /// fetch is in flight. Returns whether the tracker went back to `Idle`.
    pub fn observe_list<'a, I>(&mut self, ids: I, is_fetching: bool) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let DeleteState::AwaitingListSync { id, .. } = &self.state else {
            return false;
        };
        if is_fetching {
            return false;
        }
        let still_listed = ids.into_iter().any(|listed| listed == id.as_str());
        if still_listed {
            return false;
        }
        log::debug!("[roster] Roster no longer lists {}", id);
        self.state = DeleteState::Idle;
        true
    }

    /// Id of the row being confirmed, deleted or synced
    pub fn pending_id(&self) -> Option<&str> {
        match &self.state {
            DeleteState::Idle => None,
            DeleteState::ConfirmPending { id, .. }
            | DeleteState::Deleting { id, .. }
            | DeleteState::AwaitingListSync { id, .. } => Some(id),
        }
    }

    pub fn pending_label(&self) -> Option<&str> {
        match &self.state {
            DeleteState::Idle => None,
            DeleteState::ConfirmPending { label, .. }
            | DeleteState::Deleting { label, .. }
            | DeleteState::AwaitingListSync { label, .. } => Some(label),
        }
    }

    /// Whether `id` should render as being removed
    pub fn row_is_removing(&self, id: &str) -> bool {
        match &self.state {
            DeleteState::Deleting { id: pending, .. }
            | DeleteState::AwaitingListSync { id: pending, .. } => pending == id,
            _ => false,
        }
    }

    fn busy(&self, action: &str) -> Error {
        Error::validation(format!("Cannot {} while {}", action, self.state))
    }
}
