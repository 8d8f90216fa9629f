use http::StatusCode;
use serde::Serialize;
use snafu::{OptionExt, ResultExt, Snafu};

use crate::error::AuthError;
use crate::session::SessionController;

#[derive(Debug, Snafu)]
pub enum ClientError {
    #[snafu(display("ClientError: No valid access token available"))]
    NotAuthenticated,

    #[snafu(display("ClientError: Could not build request"))]
    Build { source: reqwest::Error },

    #[snafu(display("ClientError: Could not send request"))]
    Send { source: reqwest::Error },
}

/// HTTP client with automatic access token injection and token refresh on 401 responses.
///
/// Wraps a `reqwest::Client`. Every request carries the current access token as a Bearer token in
/// the `Authorization` header. When a request is answered with 401 Unauthorized, the session is
/// refreshed and the request retried once. This covers tokens revoked on the authorization
/// server, which our client-side expiry checks cannot know about.
///
/// Use it for the chat backend, e.g. `GET /v1/models` and `POST /v1/chat/completions`.
///
/// # Example
/// ```no_run
/// # use leptos_pkce_auth::{AuthenticatedClient, SessionController};
/// # async fn example(session: SessionController) -> Result<(), Box<dyn std::error::Error>> {
/// let client = AuthenticatedClient::from_session(session, reqwest::Client::new())?;
/// let models = client.get("http://localhost:1135/v1/models").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    client: reqwest::Client,
    session: SessionController,
}

impl AuthenticatedClient {
    /// Fails with `NotAuthenticated` if there is no valid access token right now.
    pub fn from_session(
        session: SessionController,
        client: reqwest::Client,
    ) -> Result<Self, AuthError> {
        if !session.is_authenticated() {
            return Err(AuthError::NotAuthenticated);
        }
        Ok(Self { client, session })
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    fn create_request(
        &self,
        method: reqwest::Method,
        url: impl reqwest::IntoUrl,
        with: impl Fn(reqwest::RequestBuilder) -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Request, ClientError> {
        let access_token = self.session.access_token().context(NotAuthenticatedSnafu)?;

        let mut req_builder = self.client.request(method, url);

        // Let the user build the request.
        req_builder = with(req_builder);

        req_builder
            .bearer_auth(access_token)
            .build()
            .context(BuildSnafu {})
    }

    /// Perform a GET request with automatic token injection.
    pub async fn get(
        &self,
        url: impl reqwest::IntoUrl + Clone,
    ) -> Result<reqwest::Response, ClientError> {
        self.request_with(reqwest::Method::GET, url, |builder| builder)
            .await
    }

    /// Perform a POST request with `body` serialized as JSON.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: impl reqwest::IntoUrl + Clone,
        body: &B,
    ) -> Result<reqwest::Response, ClientError> {
        self.request_with(reqwest::Method::POST, url, |builder| builder.json(body))
            .await
    }

    /// Perform an arbitrary request. `with` may be called twice, as a 401 leads to a retry.
    pub async fn request_with(
        &self,
        method: reqwest::Method,
        url: impl reqwest::IntoUrl + Clone,
        with: impl Fn(reqwest::RequestBuilder) -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ClientError> {
        let req = self.create_request(method.clone(), url.clone(), &with)?;
        let resp = self.client.execute(req).await.context(SendSnafu {})?;

        if resp.status() != StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }

        tracing::debug!("Request was unauthorized. Refreshing token and retrying once.");
        match self.session.report_unauthorized().await {
            true => {
                let req = self.create_request(method, url, &with)?;
                self.client.execute(req).await.context(SendSnafu {})
            }
            false => Ok(resp),
        }
    }
}
