use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::AuthError;
use crate::response::{CallbackKey, CallbackParams, TokenResponse};

/// Progress of handling the authorization server's redirect back to us.
#[derive(Debug, Clone, Default)]
pub enum CallbackState {
    #[default]
    Idle,
    Processing,
    Success,
    Error(Arc<AuthError>),
}

impl CallbackState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallbackState::Success | CallbackState::Error(_))
    }

    pub fn error(&self) -> Option<&Arc<AuthError>> {
        match self {
            CallbackState::Error(err) => Some(err),
            _ => None,
        }
    }
}

/// Result of a single [`CallbackHandler::handle`] call.
#[derive(Debug, Clone)]
pub enum CallbackOutcome {
    /// These parameters were seen before, or another exchange is still running. Nothing was done.
    AlreadyHandled,
    Success(TokenResponse),
    Failed(Arc<AuthError>),
}

/// Processes every distinct authorization response exactly once.
///
/// Rendering code may run the callback route more than once for the same url (remounts, effects
/// re-running, fast navigation). An authorization code can only be exchanged once, so all but the
/// first call for a given `(code, state, error)` must be no-ops.
///
/// Terminal states stay until a different authorization response arrives.
#[derive(Debug, Default)]
pub struct CallbackHandler {
    state: Mutex<CallbackState>,
    seen: Mutex<HashSet<CallbackKey>>,
}

impl CallbackHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CallbackState {
        self.state.lock().clone()
    }

    /// Handle `params`, calling `exchange(code, state)` when they describe a successful login.
    pub async fn handle<F, Fut>(&self, params: CallbackParams, exchange: F) -> CallbackOutcome
    where
        F: FnOnce(String, String) -> Fut,
        Fut: Future<Output = Result<TokenResponse, AuthError>>,
    {
        // Claim the key and the processing slot in one go. Neither lock is held across `.await`.
        {
            let mut state = self.state.lock();
            if matches!(*state, CallbackState::Processing) {
                tracing::trace!("Callback already being processed. Ignoring.");
                return CallbackOutcome::AlreadyHandled;
            }
            if !self.seen.lock().insert(params.key()) {
                tracing::trace!("Callback parameters already handled. Ignoring.");
                return CallbackOutcome::AlreadyHandled;
            }
            *state = CallbackState::Processing;
        }

        let result = match params {
            CallbackParams {
                error: Some(error),
                error_description,
                ..
            } => Err(AuthError::ProviderError {
                error,
                error_description,
            }),
            CallbackParams {
                code: Some(code),
                state: Some(state),
                ..
            } => exchange(code, state).await,
            _ => Err(AuthError::MissingParameters),
        };

        match result {
            Ok(tokens) => {
                tracing::debug!("Callback handled successfully");
                *self.state.lock() = CallbackState::Success;
                CallbackOutcome::Success(tokens)
            }
            Err(err) => {
                tracing::debug!(?err, "Callback failed");
                let err = Arc::new(err);
                *self.state.lock() = CallbackState::Error(err.clone());
                CallbackOutcome::Failed(err)
            }
        }
    }
}
