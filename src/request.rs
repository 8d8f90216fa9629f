use std::time::Duration;

use http::StatusCode;
use snafu::{ResultExt, Snafu};

use crate::{RevocationEndpoint, TokenEndpoint, response::ErrorResponse, response::TokenResponse};

#[derive(Debug, Snafu)]
pub enum RequestError {
    #[snafu(display("RequestError: Could not send request"))]
    Send { source: reqwest::Error },

    #[snafu(display("RequestError: Request timed out"))]
    TimedOut { source: reqwest::Error },

    #[snafu(display("RequestError: Could not decode payload"))]
    Decode { source: reqwest::Error },

    #[snafu(display("RequestError: Received an error response ({status}): {body}"))]
    ErrResponse {
        status: StatusCode,
        /// Raw response body, kept for diagnostics.
        body: String,
        /// The body parsed as an OAuth error, if it was one.
        error_response: Option<ErrorResponse>,
    },
}

impl RequestError {
    pub fn is_timed_out(&self) -> bool {
        matches!(self, RequestError::TimedOut { .. })
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RequestError::ErrResponse { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub(crate) async fn exchange_code_for_token(
    client: &reqwest::Client,
    token_endpoint: &TokenEndpoint,
    client_id: &str,
    redirect_uri: &str,
    code: &str,
    code_verifier: &str,
    timeout: Duration,
) -> Result<TokenResponse, RequestError> {
    let params = [
        ("grant_type", "authorization_code"),
        ("client_id", client_id),
        ("code", code),
        ("redirect_uri", redirect_uri),
        ("code_verifier", code_verifier),
    ];
    post_form(client, token_endpoint, &params, timeout)
        .await?
        .json::<TokenResponse>()
        .await
        .context(DecodeSnafu {})
}

pub(crate) async fn refresh_token(
    client: &reqwest::Client,
    token_endpoint: &TokenEndpoint,
    client_id: &str,
    refresh_token: &str,
    timeout: Duration,
) -> Result<TokenResponse, RequestError> {
    let params = [
        ("grant_type", "refresh_token"),
        ("client_id", client_id),
        ("refresh_token", refresh_token),
    ];
    post_form(client, token_endpoint, &params, timeout)
        .await?
        .json::<TokenResponse>()
        .await
        .context(DecodeSnafu {})
}

/// See [RFC 7009](https://datatracker.ietf.org/doc/html/rfc7009#section-2.1).
pub(crate) async fn revoke_token(
    client: &reqwest::Client,
    revocation_endpoint: &RevocationEndpoint,
    client_id: &str,
    refresh_token: &str,
    timeout: Duration,
) -> Result<(), RequestError> {
    let params = [
        ("token", refresh_token),
        ("client_id", client_id),
        ("token_type_hint", "refresh_token"),
    ];
    post_form(client, revocation_endpoint, &params, timeout).await?;
    Ok(())
}

async fn post_form(
    client: &reqwest::Client,
    endpoint: &url::Url,
    params: &[(&str, &str)],
    timeout: Duration,
) -> Result<reqwest::Response, RequestError> {
    let response = client
        .post(endpoint.clone())
        .form(params)
        .timeout(timeout)
        .send()
        .await
        .map_err(|source| match source.is_timeout() {
            true => RequestError::TimedOut { source },
            false => RequestError::Send { source },
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                tracing::debug!(?err, "Could not read body of error response.");
                String::new()
            }
        };
        let error_response = serde_json::from_str::<ErrorResponse>(&body).ok();
        return ErrResponseSnafu {
            status,
            body,
            error_response,
        }
        .fail();
    }

    Ok(response)
}
