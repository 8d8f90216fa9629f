//! Stateless PKCE login and token lifecycle management for Leptos applications.
//!
//! The PKCE code verifier travels inside the OAuth `state` parameter, so nothing has to be stored
//! while the user is away at the authorization server. After the redirect back, the code is
//! exchanged for tokens, which are kept in `localStorage`, refreshed when they expire and revoked
//! on logout.
//!
//! ```no_run
//! use leptos::prelude::*;
//! use leptos_router::{path, components::{Route, Router, Routes}};
//! use leptos_pkce_auth::{components::{AuthCallback, ShowWhenAuthenticated}, init_pkce_auth, use_pkce_auth, url::Url, UsePkceAuthOptions};
//!
//! #[component]
//! pub fn App() -> impl IntoView {
//!     // Note: These values should be served from environment variables to be overwritten in production.
//!     // Note: The redirect URI must point to the route rendering `AuthCallback`.
//!     let _auth = init_pkce_auth(UsePkceAuthOptions::new(
//!         Url::parse("https://id.example.com/realms/bodhi").unwrap(),
//!         "webchat",
//!         Url::parse("http://localhost:3000/auth").unwrap(),
//!     ))
//!     .unwrap();
//!
//!     view! {
//!         <main>
//!             <Router>
//!                 <Routes fallback=|| view! { "Page not found." }>
//!                     <Route path=path!("/auth") view=AuthCallback/>
//!                     <Route path=path!("/chat") view=|| view! {
//!                         <ShowWhenAuthenticated
//!                             fallback=|| view! { <Login/> }
//!                             loading=|| view! { "Loading..." }
//!                         >
//!                             <Greeting/>
//!                         </ShowWhenAuthenticated>
//!                     }/>
//!                 </Routes>
//!             </Router>
//!         </main>
//!     }
//! }
//!
//! #[component]
//! pub fn Login() -> impl IntoView {
//!     let auth = use_pkce_auth();
//!     view! { <button on:click=move |_| auth.login()>"Login"</button> }
//! }
//!
//! #[component]
//! pub fn Greeting() -> impl IntoView {
//!     let auth = use_pkce_auth();
//!     view! {
//!         <div>
//!             "Hello, " { move || auth.user().get().and_then(|user| user.name) }
//!         </div>
//!     }
//! }
//! ```
//!

mod action;
mod authenticated_client;
mod callback;
mod clock;
mod code_verifier;
pub mod components;
mod config;
mod endpoints;
mod error;
mod hooks;
mod login;
mod navigation;
mod random;
mod request;
mod response;
mod session;
mod state;
mod state_token;
mod storage;
mod token_claims;
mod token_client;
mod token_store;
mod token_validation;

// Library exports (additional to pub modules).
pub use authenticated_client::*;
pub use callback::*;
pub use clock::*;
pub use code_verifier::*;
pub use config::*;
pub use endpoints::*;
pub use error::*;
pub use hooks::*;
pub use login::*;
pub use navigation::*;
pub use request::RequestError;
pub use response::*;
pub use session::*;
pub use state::*;
pub use state_token::*;
pub use storage::*;
pub use token_claims::*;
pub use token_client::*;
pub use token_store::*;
pub use token_validation::*;
pub mod url {
    pub use url::Url;
}
pub mod reqwest {
    pub use reqwest::*;
}

type AuthorizationEndpoint = url::Url;
type TokenEndpoint = url::Url;
type RevocationEndpoint = url::Url;

type AuthorizationCode = String;
type AccessToken = String;
type RefreshToken = String;
