use std::sync::Arc;

use leptos::callback::Callback;
use leptos::prelude::*;

use crate::callback::CallbackOutcome;
use crate::error::AuthError;
use crate::response::CallbackParams;
use crate::session::SessionController;

pub(crate) fn create_init_action(
    controller: StoredValue<SessionController>,
) -> Action<(), ()> {
    Action::new(move |(): &()| {
        let controller = controller.with_value(Clone::clone);
        async move {
            leptos::task::spawn_local(async move {
                let session = controller.init().await;
                tracing::trace!(status = ?session.status, "Initial authentication check done");
            });
        }
    })
}

pub(crate) fn create_refresh_action(
    controller: StoredValue<SessionController>,
    refreshing: RwSignal<bool>,
    set_last_error: Callback<Option<Arc<AuthError>>>,
) -> Action<(), ()> {
    Action::new(move |(): &()| {
        let controller = controller.with_value(Clone::clone);
        async move {
            if refreshing.get_untracked() {
                tracing::trace!("Refresh already in flight");
                return;
            }
            refreshing.set(true);
            leptos::task::spawn_local(async move {
                match controller.refresh_token().await {
                    Ok(_) => set_last_error.run(None),
                    Err(err) => set_last_error.run(Some(Arc::new(err))),
                }
                refreshing.try_set(false);
            });
        }
    })
}

pub(crate) fn create_logout_action(
    controller: StoredValue<SessionController>,
    set_last_error: Callback<Option<Arc<AuthError>>>,
) -> Action<(), ()> {
    Action::new(move |(): &()| {
        let controller = controller.with_value(Clone::clone);
        async move {
            leptos::task::spawn_local(async move {
                controller.logout().await;
                set_last_error.run(None);
            });
        }
    })
}

pub(crate) fn create_handle_callback_action(
    controller: StoredValue<SessionController>,
    set_last_error: Callback<Option<Arc<AuthError>>>,
) -> Action<CallbackParams, ()> {
    Action::new(move |params: &CallbackParams| {
        let controller = controller.with_value(Clone::clone);
        let params = params.clone();
        async move {
            // Progress reaches the UI through the controller's callback state subscription, which
            // also covers exchanges started by an earlier mount.
            leptos::task::spawn_local(async move {
                match controller.handle_callback(params).await {
                    CallbackOutcome::Success(_) => set_last_error.run(None),
                    CallbackOutcome::Failed(err) => set_last_error.run(Some(err)),
                    CallbackOutcome::AlreadyHandled => {}
                }
            });
        }
    })
}
