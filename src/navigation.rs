use std::sync::Arc;

use parking_lot::Mutex;
use url::Url;

/// Moves the user agent somewhere else: to the authorization server, or to an application path.
pub trait Navigator: Send + Sync {
    fn navigate(&self, target: &str);

    /// Where the user agent is right now, if known.
    fn current_url(&self) -> Option<Url>;
}

/// Navigates by assigning `window.location.href`. Only usable in the browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserNavigator;

impl Navigator for BrowserNavigator {
    fn navigate(&self, target: &str) {
        let Some(window) = web_sys::window() else {
            tracing::error!(url = target, "No window available. Cannot navigate.");
            return;
        };
        if let Err(err) = window.location().set_href(target) {
            tracing::error!(?err, url = target, "Could not navigate.");
        }
    }

    fn current_url(&self) -> Option<Url> {
        let href = match web_sys::window()?.location().href() {
            Ok(href) => href,
            Err(err) => {
                tracing::error!(?err, "Could not read current location.");
                return None;
            }
        };
        Url::parse(&href).ok()
    }
}

/// Remembers every navigation instead of performing it. Clones share their history.
///
/// Navigations resolve against the current url, so relative paths work once a start url is set.
#[derive(Debug, Default, Clone)]
pub struct RecordingNavigator {
    history: Arc<Mutex<Vec<String>>>,
    current: Arc<Mutex<Option<Url>>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend the user agent currently shows `url`.
    pub fn set_current_url(&self, url: Url) {
        *self.current.lock() = Some(url);
    }

    pub fn history(&self) -> Vec<String> {
        self.history.lock().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.history.lock().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, target: &str) {
        self.history.lock().push(target.to_owned());
        let mut current = self.current.lock();
        let next = match current.as_ref() {
            Some(current) => current.join(target).ok(),
            None => Url::parse(target).ok(),
        };
        if next.is_some() {
            *current = next;
        }
    }

    fn current_url(&self) -> Option<Url> {
        self.current.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assertr::prelude::*;

    #[test]
    fn records_navigations_in_order() {
        let navigator = RecordingNavigator::new();
        let clone = navigator.clone();

        clone.navigate("https://id.example.com/auth");
        clone.navigate("/chat");

        assert_that(navigator.history())
            .is_equal_to(vec!["https://id.example.com/auth".to_owned(), "/chat".to_owned()]);
        assert_that(navigator.last()).is_equal_to(Some("/chat".to_owned()));
    }

    #[test]
    fn resolves_relative_navigations_against_current_url() {
        let navigator = RecordingNavigator::new();
        assert_that(navigator.current_url().is_none()).is_true();

        navigator.set_current_url(Url::parse("http://localhost:3000/auth?code=c").unwrap());
        navigator.navigate("/chat");

        assert_that(navigator.current_url())
            .is_equal_to(Some(Url::parse("http://localhost:3000/chat").unwrap()));
    }
}
