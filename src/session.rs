use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use time::{Duration, OffsetDateTime};

use crate::AccessToken;
use crate::callback::{CallbackHandler, CallbackOutcome, CallbackState};
use crate::clock::{Clock, SystemClock};
use crate::config::UsePkceAuthOptions;
use crate::error::{AuthError, PkceSnafu};
use crate::login;
use crate::navigation::{BrowserNavigator, Navigator};
use crate::response::{CallbackParams, TokenResponse};
use crate::token_claims::User;
use crate::token_client::TokenClient;
use crate::token_store::TokenStore;

/// Minimum time between two refreshes triggered by [`SessionController::report_unauthorized`].
const UNAUTHORIZED_REFRESH_COOLDOWN: Duration = Duration::seconds(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthStatus {
    /// The initial check did not finish yet. Protected views should wait.
    Loading,
    Authenticated,
    Unauthenticated,
}

/// In-memory view of the current authentication, derived from the token store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub status: AuthStatus,
    /// Decoded from the access token WITHOUT verifying its signature. Good for display only.
    pub user: Option<User>,
    pub token: Option<AccessToken>,
}

impl AuthSession {
    pub fn loading() -> Self {
        Self {
            status: AuthStatus::Loading,
            user: None,
            token: None,
        }
    }

    pub fn unauthenticated() -> Self {
        Self {
            status: AuthStatus::Unauthenticated,
            user: None,
            token: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == AuthStatus::Loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == AuthStatus::Authenticated
    }
}

impl Default for AuthSession {
    fn default() -> Self {
        Self::loading()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&AuthSession) + Send + Sync>;
type CallbackListener = Arc<dyn Fn(&CallbackState) + Send + Sync>;

/// The process-wide authentication session.
///
/// Ties PKCE login, callback handling, token refresh and logout together and publishes every
/// resulting [`AuthSession`] to its subscribers. Cheap to clone, clones share all state.
///
/// Lifecycle: create it once, call [`init`](Self::init) on startup, and use
/// [`logout`](Self::logout) to tear the session down.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

struct Inner {
    options: UsePkceAuthOptions,
    client: TokenClient,
    clock: Arc<dyn Clock>,
    navigator: Arc<dyn Navigator>,
    callback: CallbackHandler,
    session: Mutex<AuthSession>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    callback_listeners: Mutex<Vec<(SubscriptionId, CallbackListener)>>,
    next_subscription_id: AtomicU64,
    last_refresh_from_unauthorized: Mutex<Option<OffsetDateTime>>,
}

impl Debug for SessionController {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("client", &self.inner.client)
            .field("session", &*self.inner.session.lock())
            .finish_non_exhaustive()
    }
}

/// Configures the collaborators of a [`SessionController`].
///
/// Defaults to browser storage, browser navigation and the system clock.
pub struct SessionControllerBuilder {
    options: UsePkceAuthOptions,
    http: Option<reqwest::Client>,
    store: Option<TokenStore>,
    clock: Option<Arc<dyn Clock>>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl SessionControllerBuilder {
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    pub fn token_store(mut self, store: TokenStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub fn navigator(mut self, navigator: impl Navigator + 'static) -> Self {
        self.navigator = Some(Arc::new(navigator));
        self
    }

    pub fn build(self) -> Result<SessionController, AuthError> {
        self.options.validate().context(PkceSnafu {})?;

        let store = self
            .store
            .unwrap_or_else(|| TokenStore::browser(&self.options.advanced.storage_key_prefix));
        let client = TokenClient::new(&self.options, self.http.unwrap_or_default(), store)?;

        Ok(SessionController {
            inner: Arc::new(Inner {
                options: self.options,
                client,
                clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
                navigator: self.navigator.unwrap_or_else(|| Arc::new(BrowserNavigator)),
                callback: CallbackHandler::new(),
                session: Mutex::new(AuthSession::loading()),
                listeners: Mutex::new(Vec::new()),
                callback_listeners: Mutex::new(Vec::new()),
                next_subscription_id: AtomicU64::new(0),
                last_refresh_from_unauthorized: Mutex::new(None),
            }),
        })
    }
}

impl SessionController {
    pub fn builder(options: UsePkceAuthOptions) -> SessionControllerBuilder {
        SessionControllerBuilder {
            options,
            http: None,
            store: None,
            clock: None,
            navigator: None,
        }
    }

    pub fn options(&self) -> &UsePkceAuthOptions {
        &self.inner.options
    }

    pub fn token_store(&self) -> &TokenStore {
        self.inner.client.store()
    }

    pub fn token_client(&self) -> &TokenClient {
        &self.inner.client
    }

    pub fn now(&self) -> OffsetDateTime {
        self.inner.clock.now()
    }

    pub fn session(&self) -> AuthSession {
        self.inner.session.lock().clone()
    }

    pub fn callback_state(&self) -> CallbackState {
        self.inner.callback.state()
    }

    /// Whether a stored access token outlives now plus the configured expiry buffer.
    pub fn is_authenticated(&self) -> bool {
        self.token_store()
            .is_authenticated(self.now(), self.inner.options.advanced.expiry_buffer)
    }

    /// The stored access token, if it is still valid.
    pub fn access_token(&self) -> Option<AccessToken> {
        match self.is_authenticated() {
            true => self.token_store().access_token(),
            false => None,
        }
    }

    /// `listener` is called with the new session after every change.
    pub fn subscribe(
        &self,
        listener: impl Fn(&AuthSession) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.next_subscription_id();
        self.inner.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    /// `listener` is called whenever handling an authorization response starts or ends, no matter
    /// which caller started it.
    pub fn subscribe_callback_state(
        &self,
        listener: impl Fn(&CallbackState) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.next_subscription_id();
        self.inner
            .callback_listeners
            .lock()
            .push((id, Arc::new(listener)));
        id
    }

    /// Removes a listener registered through either `subscribe` function.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner
            .listeners
            .lock()
            .retain(|(listener_id, _)| *listener_id != id);
        self.inner
            .callback_listeners
            .lock()
            .retain(|(listener_id, _)| *listener_id != id);
    }

    fn next_subscription_id(&self) -> SubscriptionId {
        SubscriptionId(
            self.inner
                .next_subscription_id
                .fetch_add(1, Ordering::Relaxed),
        )
    }

    /// Initial-load check: prefer a valid stored token, then a silent refresh, then give up.
    pub async fn init(&self) -> AuthSession {
        tracing::trace!("Checking stored authentication");

        if self.is_authenticated() {
            tracing::debug!("Found valid access token");
            return self.recompute();
        }

        // A refresh rejected after the code exchange stored fresh tokens would wipe them.
        if self.is_on_callback_route() {
            tracing::debug!("On the callback route. Skipping silent refresh.");
            return self.recompute();
        }

        match self.token_store().refresh_token() {
            Some(_) => match self.inner.client.refresh().await {
                Ok(_) => tracing::debug!("Silently refreshed expired session"),
                Err(err) => {
                    tracing::debug!(?err, "Silent refresh failed");
                    self.token_store().clear();
                }
            },
            None => self.token_store().clear(),
        }

        self.recompute()
    }

    /// Send the user to the authorization server, starting a fresh login attempt.
    pub fn login(&self) -> Result<(), AuthError> {
        let request = login::generate_authorization_request(&self.inner.options)?;
        tracing::trace!("Redirecting to authorization server");
        self.inner.navigator.navigate(request.url.as_str());
        Ok(())
    }

    /// Forget all tokens, revoke the refresh token (best-effort) and go home. Never fails.
    ///
    /// Tokens are gone locally before revocation starts, so dropping this future early still
    /// leaves the user logged out.
    pub async fn logout(&self) {
        tracing::trace!("Logging out");
        let refresh_token = self.token_store().refresh_token();
        self.token_store().clear();
        self.publish(AuthSession::unauthenticated());

        match refresh_token {
            Some(refresh_token) => self.inner.client.revoke(&refresh_token).await,
            None => tracing::trace!("No refresh token to revoke"),
        }

        // Navigating unloads the page, which would abort a revocation still in flight.
        self.inner
            .navigator
            .navigate(&self.inner.options.post_logout_path);
    }

    /// Refresh the tokens. Any failure ends the session through [`logout`](Self::logout).
    pub async fn refresh_token(&self) -> Result<TokenResponse, AuthError> {
        match self.inner.client.refresh().await {
            Ok(tokens) => {
                self.recompute();
                Ok(tokens)
            }
            Err(err) => {
                tracing::warn!(?err, "Token refresh failed. Logging out.");
                self.logout().await;
                Err(err)
            }
        }
    }

    /// Process the authorization server's redirect. Repeated calls with the same parameters are
    /// no-ops.
    pub async fn handle_callback(&self, params: CallbackParams) -> CallbackOutcome {
        let client = &self.inner.client;
        let outcome = self
            .inner
            .callback
            .handle(params, |code, state| async move {
                self.publish_callback_state(&CallbackState::Processing);
                client.exchange_code(&code, &state).await
            })
            .await;

        match &outcome {
            CallbackOutcome::Success(_) => {
                self.publish_callback_state(&self.callback_state());
                self.recompute();
                self.inner
                    .navigator
                    .navigate(&self.inner.options.post_login_path);
            }
            CallbackOutcome::Failed(err) => {
                tracing::error!(?err, "Login could not be completed");
                self.publish_callback_state(&self.callback_state());
                self.recompute();
            }
            CallbackOutcome::AlreadyHandled => {}
        }
        outcome
    }

    /// A request using the current access token was answered with 401 Unauthorized.
    ///
    /// The token may have been revoked server-side, so we try a refresh. To never end up in a loop
    /// of refreshes and failing requests, this refreshes at most once per second.
    /// Returns `true` if a refresh happened and succeeded.
    pub async fn report_unauthorized(&self) -> bool {
        {
            let now = self.now();
            let mut last = self.inner.last_refresh_from_unauthorized.lock();
            if last.is_some_and(|it| now - it < UNAUTHORIZED_REFRESH_COOLDOWN) {
                tracing::debug!("Refreshed just recently. Not refreshing again.");
                return false;
            }
            *last = Some(now);
        }
        if self.token_store().refresh_token().is_none() {
            tracing::debug!("Unauthorized, but no refresh token available.");
            self.recompute();
            return false;
        }
        self.refresh_token().await.is_ok()
    }

    /// Re-derive the session from the token store and notify subscribers on change.
    pub fn recompute(&self) -> AuthSession {
        let session = match self.is_authenticated() {
            true => AuthSession {
                status: AuthStatus::Authenticated,
                user: self
                    .token_store()
                    .access_token_claims()
                    .map(|claims| claims.to_user()),
                token: self.token_store().access_token(),
            },
            false => AuthSession::unauthenticated(),
        };
        self.publish(session.clone());
        session
    }

    fn is_on_callback_route(&self) -> bool {
        self.inner.navigator.current_url().is_some_and(|url| {
            url.path() == self.inner.options.redirect_uri.path()
                && !CallbackParams::from_url(&url).is_empty()
        })
    }

    fn publish_callback_state(&self, state: &CallbackState) {
        let listeners = self
            .inner
            .callback_listeners
            .lock()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect::<Vec<_>>();
        for listener in listeners {
            listener(state);
        }
    }

    fn publish(&self, session: AuthSession) {
        {
            let mut current = self.inner.session.lock();
            if *current == session {
                return;
            }
            tracing::debug!(status = ?session.status, "Session changed");
            *current = session.clone();
        }
        // Listeners may call back into the controller.
        let listeners = self
            .inner
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect::<Vec<_>>();
        for listener in listeners {
            listener(&session);
        }
    }
}
