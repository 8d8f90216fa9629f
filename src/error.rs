use std::fmt::{Display, Formatter};

use snafu::Snafu;

use crate::code_verifier::PkceError;
use crate::endpoints::EndpointError;
use crate::request::RequestError;
use crate::state_token::StateTokenError;

/// The token endpoint interaction that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOperation {
    CodeExchange,
    Refresh,
    Revocation,
}

impl Display for TokenOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TokenOperation::CodeExchange => "code exchange",
            TokenOperation::Refresh => "token refresh",
            TokenOperation::Revocation => "token revocation",
        })
    }
}

/// An enumeration representing various authentication-related errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AuthError {
    #[snafu(display("AuthError: Invalid state parameter"))]
    InvalidState { source: StateTokenError },

    #[snafu(display("AuthError: Authorization server returned error '{error}'"))]
    ProviderError {
        error: String,
        error_description: Option<String>,
    },

    #[snafu(display("AuthError: Missing authorization code or state parameter"))]
    MissingParameters,

    #[snafu(display("AuthError: Token exchange failed"))]
    TokenExchangeFailed { source: RequestError },

    #[snafu(display("AuthError: Token refresh failed"))]
    RefreshFailed { source: RequestError },

    #[snafu(display("AuthError: No refresh token available"))]
    NoRefreshToken,

    #[snafu(display("AuthError: Token revocation failed"))]
    RevocationFailed { source: RequestError },

    #[snafu(display("AuthError: {operation} timed out"))]
    TimedOut {
        operation: TokenOperation,
        source: RequestError,
    },

    #[snafu(display("AuthError: Invalid endpoint configuration"))]
    InvalidConfig { source: EndpointError },

    #[snafu(display("AuthError: Invalid PKCE configuration"))]
    Pkce { source: PkceError },

    #[snafu(display("AuthError: Not authenticated"))]
    NotAuthenticated,
}

impl AuthError {
    /// Map a failed request of `operation` to the matching error kind.
    pub(crate) fn from_request(operation: TokenOperation, source: RequestError) -> Self {
        if source.is_timed_out() {
            return AuthError::TimedOut { operation, source };
        }
        match operation {
            TokenOperation::CodeExchange => AuthError::TokenExchangeFailed { source },
            TokenOperation::Refresh => AuthError::RefreshFailed { source },
            TokenOperation::Revocation => AuthError::RevocationFailed { source },
        }
    }

    /// Text suitable for showing to the user, next to a retry action.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::InvalidState { .. } => {
                "The login response could not be verified. Please try again.".to_owned()
            }
            AuthError::ProviderError {
                error,
                error_description,
            } => match error_description {
                Some(description) => format!("Authentication failed: {error} ({description})"),
                None => format!("Authentication failed: {error}"),
            },
            AuthError::MissingParameters => {
                "Missing authorization code or state parameter".to_owned()
            }
            AuthError::TokenExchangeFailed { source } => match source {
                RequestError::ErrResponse { body, .. } => format!("Token exchange failed: {body}"),
                _ => "Token exchange failed: the authorization server could not be reached."
                    .to_owned(),
            },
            AuthError::RefreshFailed { .. } | AuthError::NoRefreshToken => {
                "Your session has ended. Please log in again.".to_owned()
            }
            AuthError::TimedOut { .. } => {
                "The authorization server did not respond in time. Please try again.".to_owned()
            }
            AuthError::RevocationFailed { .. } => "Logout could not be confirmed.".to_owned(),
            AuthError::InvalidConfig { .. } | AuthError::Pkce { .. } => {
                "Login is misconfigured. Please contact the administrator.".to_owned()
            }
            AuthError::NotAuthenticated => "Please log in.".to_owned(),
        }
    }

    /// Whether starting a new login attempt could resolve this error.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            AuthError::InvalidConfig { .. } | AuthError::Pkce { .. }
        )
    }
}
