use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::models::AuthState;

/// GatePhase
///
/// The client-side route guard as a state machine over `AuthState`
/// snapshots. The phase is derived, never stored: as the store evolves
/// (mount, initialization completing, sign-in, sign-out), re-deriving the
/// phase yields the transitions
/// `Uninitialized -> Loading -> {Error | Authenticated | Unauthenticated}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum GatePhase {
    Uninitialized,
    Loading,
    Error,
    Authenticated,
    Unauthenticated,
}

/// GateAction
///
/// What the UI shell should do in a given phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum GateAction {
    /// Initialization has not finished; render nothing yet.
    Wait,
    /// Session present; render the protected layout.
    Render,
    /// No session, and initialization definitely completed.
    RedirectToLogin,
    /// Initialization failed. Render a blocking panel with a manual
    /// "go to login" action; no automatic redirect, so a transient provider
    /// failure cannot cause a redirect loop.
    ShowErrorPanel,
}

impl GatePhase {
    /// Derive the phase from a state snapshot.
    ///
    /// `Unauthenticated` (and with it the login redirect) is unreachable
    /// until `initialization_attempted` is set; before that the snapshot
    /// maps to `Uninitialized` or `Loading`, both of which wait.
    pub fn from_state(state: &AuthState) -> Self {
        if !state.initialization_attempted {
            if state.is_loading {
                Self::Loading
            } else {
                Self::Uninitialized
            }
        } else if state.error.is_some() {
            Self::Error
        } else if state.is_authenticated {
            Self::Authenticated
        } else {
            Self::Unauthenticated
        }
    }

    pub fn action(self) -> GateAction {
        match self {
            Self::Uninitialized | Self::Loading => GateAction::Wait,
            Self::Error => GateAction::ShowErrorPanel,
            Self::Authenticated => GateAction::Render,
            Self::Unauthenticated => GateAction::RedirectToLogin,
        }
    }
}
