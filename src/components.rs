use std::sync::Arc;

use leptos::callback::Callback;
use leptos::either::{Either, EitherOf3};
use leptos::prelude::*;
use leptos_router::hooks::use_query;

use crate::action;
use crate::callback::CallbackState;
use crate::error::AuthError;
use crate::response::CallbackParams;
use crate::session::AuthStatus;
use crate::use_pkce_auth;

/// Render this at the route your `redirect_uri` points to.
///
/// Exchanges the authorization code exactly once per distinct authorization response, no matter
/// how often this component is mounted. Navigates to the configured post-login path on success and
/// shows the error together with a "Try Again" button otherwise.
#[component]
#[allow(clippy::must_use_candidate)]
pub fn AuthCallback() -> impl IntoView {
    let auth = use_pkce_auth();
    let query = use_query::<CallbackParams>();

    let callback_state = auth.callback_state();
    let set_last_error = Callback::new(move |err: Option<Arc<AuthError>>| {
        auth.last_error.try_set(err);
    });
    let handle_callback = action::create_handle_callback_action(auth.controller, set_last_error);

    Effect::new(move |_| {
        // Params never fail to parse. Missing ones are reported by the callback handler.
        if let Ok(params) = query.get() {
            handle_callback.dispatch(params);
        }
    });

    move || match callback_state.get() {
        CallbackState::Error(err) => Either::Left(view! {
            <div class="auth-callback">
                <h2>"Authentication Error"</h2>
                <p>{ err.user_message() }</p>
                <button on:click=move |_| auth.login()>"Try Again"</button>
            </div>
        }),
        CallbackState::Idle | CallbackState::Processing | CallbackState::Success => {
            Either::Right(view! {
                <div class="auth-callback">
                    <h2>"Completing Authentication..."</h2>
                    <p>"Please wait while we complete your sign-in."</p>
                </div>
            })
        }
    }
}

/// Show `children` only when the user is authenticated.
///
/// `loading` is rendered until the initial authentication check finished, `fallback` whenever the
/// user is not authenticated. Both default to nothing.
#[component(transparent)]
#[allow(clippy::must_use_candidate)]
pub fn ShowWhenAuthenticated(
    /// View shown while not authenticated.
    #[prop(into, optional)]
    fallback: ViewFn,

    /// View shown while the stored session is still being checked.
    #[prop(into, optional)]
    loading: ViewFn,

    children: ChildrenFn,
) -> impl IntoView {
    let auth = use_pkce_auth();
    let status = auth.status();

    move || match status.get() {
        AuthStatus::Authenticated => EitherOf3::<AnyView, AnyView, AnyView>::A(children()),
        AuthStatus::Unauthenticated => EitherOf3::<AnyView, AnyView, AnyView>::B(fallback.run()),
        AuthStatus::Loading => EitherOf3::<AnyView, AnyView, AnyView>::C(loading.run()),
    }
}
