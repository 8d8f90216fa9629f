use std::sync::Arc;

use leptos::callback::Callback;
use leptos::prelude::*;
use leptos_use::{UseIntervalReturn, use_interval};

use crate::action;
use crate::callback::CallbackState;
use crate::config::UsePkceAuthOptions;
use crate::error::AuthError;
use crate::session::{AuthSession, SessionController};
use crate::state::PkceAuth;

/// Creates the session controller (backed by browser storage and browser navigation), provides
/// the resulting [`PkceAuth`] as context and starts the initial authentication check.
///
/// Fails only on invalid `options`.
pub fn init_pkce_auth(options: UsePkceAuthOptions) -> Result<PkceAuth, AuthError> {
    let controller = SessionController::builder(options).build()?;
    Ok(init_pkce_auth_with(controller))
}

/// Like [`init_pkce_auth`], for a controller you configured yourself.
pub fn init_pkce_auth_with(controller: SessionController) -> PkceAuth {
    tracing::trace!("Initializing PKCE auth...");

    let session = RwSignal::new(controller.session());
    let callback_state = RwSignal::new(controller.callback_state());
    let last_error = RwSignal::<Option<Arc<AuthError>>>::new(None);
    let set_last_error = Callback::new(move |err: Option<Arc<AuthError>>| {
        last_error.try_set(err);
    });

    // Mirror every session change into our signal.
    let subscription = controller.subscribe(move |new_session: &AuthSession| {
        session.try_set(new_session.clone());
    });
    let callback_subscription = controller.subscribe_callback_state(move |state: &CallbackState| {
        callback_state.try_set(state.clone());
    });
    {
        let controller = controller.clone();
        on_cleanup(move || {
            controller.unsubscribe(subscription);
            controller.unsubscribe(callback_subscription);
        });
    }

    let check_interval_millis = controller
        .options()
        .advanced
        .access_token_age_check_interval
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX);

    let controller = StoredValue::new(controller);
    let refreshing = RwSignal::new(false);

    let init_action = action::create_init_action(controller);
    let refresh_action = action::create_refresh_action(controller, refreshing, set_last_error);
    let logout_action = action::create_logout_action(controller, set_last_error);

    init_action.dispatch(());

    // Stored tokens do not tell us when they expire. Look at them periodically.
    let UseIntervalReturn { counter, .. } = use_interval::<u64>(check_interval_millis);
    Effect::new(move |_| {
        let _count = counter.get();
        if !session.with_untracked(AuthSession::is_authenticated) {
            return;
        }
        let controller = controller.with_value(Clone::clone);
        if controller.is_authenticated() {
            return;
        }
        match controller.token_store().refresh_token() {
            Some(_) => {
                tracing::trace!("Access token expired. Refreshing...");
                refresh_action.dispatch(());
            }
            None => {
                tracing::trace!("Access token expired and cannot be refreshed");
                controller.recompute();
            }
        }
    });

    let auth = PkceAuth {
        controller,
        session,
        callback_state,
        last_error,
        refresh_action,
        logout_action,
    };

    // We guarantee that the PkceAuth state is provided as context.
    provide_context(auth);

    auth
}

/// Get the `PkceAuth` provided by [`init_pkce_auth`].
///
/// # Panics
/// When called outside of a component tree below `init_pkce_auth`.
pub fn use_pkce_auth() -> PkceAuth {
    expect_context::<PkceAuth>()
}

pub fn try_use_pkce_auth() -> Option<PkceAuth> {
    use_context::<PkceAuth>()
}
