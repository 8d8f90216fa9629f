use std::sync::Arc;

use leptos::prelude::*;

use crate::authenticated_client::AuthenticatedClient;
use crate::callback::CallbackState;
use crate::error::AuthError;
use crate::session::{AuthSession, AuthStatus, SessionController};
use crate::token_claims::User;

/// The global state this library tracks for you.
///
/// Provided as context by [`init_pkce_auth`](crate::init_pkce_auth). Use
/// [`use_pkce_auth`](crate::use_pkce_auth) in any component rendered below to get access.
///
/// Every signal mirrors the process-wide [`SessionController`]. The controller remains the source
/// of truth.
#[derive(Clone, Copy)]
pub struct PkceAuth {
    pub(crate) controller: StoredValue<SessionController>,

    pub(crate) session: RwSignal<AuthSession>,

    pub(crate) callback_state: RwSignal<CallbackState>,

    pub(crate) last_error: RwSignal<Option<Arc<AuthError>>>,

    pub(crate) refresh_action: Action<(), ()>,

    pub(crate) logout_action: Action<(), ()>,
}

impl PkceAuth {
    pub fn controller(&self) -> SessionController {
        self.controller.with_value(Clone::clone)
    }

    pub fn session(&self) -> Signal<AuthSession> {
        self.session.into()
    }

    /// Progress of handling the authorization server's redirect, shared by all callback views.
    pub fn callback_state(&self) -> Signal<CallbackState> {
        self.callback_state.into()
    }

    /// Three-valued status to gate protected views with.
    pub fn status(&self) -> Signal<AuthStatus> {
        let session = self.session;
        Signal::derive(move || session.with(|it| it.status))
    }

    pub fn is_authenticated(&self) -> Signal<bool> {
        let session = self.session;
        Signal::derive(move || session.with(AuthSession::is_authenticated))
    }

    /// Decoded from an unverified token. Do not base authorization decisions on it.
    pub fn user(&self) -> Signal<Option<User>> {
        let session = self.session;
        Signal::derive(move || session.with(|it| it.user.clone()))
    }

    /// The last error of a login, refresh or callback. Cleared on the next success.
    pub fn last_error(&self) -> Signal<Option<Arc<AuthError>>> {
        self.last_error.into()
    }

    /// Redirect to the authorization server.
    pub fn login(&self) {
        if let Err(err) = self.controller().login() {
            tracing::error!(?err, "Could not start login");
            self.last_error.set(Some(Arc::new(err)));
        }
    }

    pub fn logout(&self) {
        self.logout_action.dispatch(());
    }

    pub fn refresh(&self) {
        self.refresh_action.dispatch(());
    }

    /// A client for the protected backend. Fails while not authenticated.
    pub fn client(&self) -> Result<AuthenticatedClient, AuthError> {
        AuthenticatedClient::from_session(self.controller(), reqwest::Client::new())
    }
}
