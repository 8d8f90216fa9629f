use snafu::Snafu;
use url::Url;

use crate::{AuthorizationEndpoint, RevocationEndpoint, TokenEndpoint};

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum EndpointError {
    #[snafu(display("EndpointError: '{url}' cannot be used as a base url"))]
    CannotBeABase { url: Url },
}

/// Endpoints of the single authorization server we talk to.
///
/// Derived from the configured realm url, following Keycloak's layout:
/// `{realm}/protocol/openid-connect/{auth,token,revoke}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub authorization: AuthorizationEndpoint,
    pub token: TokenEndpoint,
    pub revocation: RevocationEndpoint,
}

impl Endpoints {
    pub fn derive(auth_server_url: &Url) -> Result<Self, EndpointError> {
        Ok(Self {
            authorization: openid_connect_endpoint(auth_server_url, "auth")?,
            token: openid_connect_endpoint(auth_server_url, "token")?,
            revocation: openid_connect_endpoint(auth_server_url, "revoke")?,
        })
    }
}

fn openid_connect_endpoint(auth_server_url: &Url, name: &str) -> Result<Url, EndpointError> {
    let mut url = auth_server_url.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|()| {
            CannotBeABaseSnafu {
                url: auth_server_url.clone(),
            }
            .build()
        })?
        .pop_if_empty()
        .extend(&["protocol", "openid-connect", name]);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assertr::prelude::*;

    #[test]
    fn derives_endpoints_from_realm_url() {
        let endpoints =
            Endpoints::derive(&Url::parse("https://id.example.com/realms/bodhi").unwrap()).unwrap();

        assert_that(endpoints.authorization.as_str())
            .is_equal_to("https://id.example.com/realms/bodhi/protocol/openid-connect/auth");
        assert_that(endpoints.token.as_str())
            .is_equal_to("https://id.example.com/realms/bodhi/protocol/openid-connect/token");
        assert_that(endpoints.revocation.as_str())
            .is_equal_to("https://id.example.com/realms/bodhi/protocol/openid-connect/revoke");
    }

    #[test]
    fn ignores_trailing_slash() {
        let endpoints =
            Endpoints::derive(&Url::parse("https://id.example.com/realms/bodhi/").unwrap()).unwrap();
        assert_that(endpoints.token.as_str())
            .is_equal_to("https://id.example.com/realms/bodhi/protocol/openid-connect/token");
    }

    #[test]
    fn rejects_cannot_be_a_base_urls() {
        let url = Url::parse("mailto:someone@example.com").unwrap();
        assert_that(Endpoints::derive(&url).unwrap_err())
            .is_equal_to(EndpointError::CannotBeABase { url });
    }
}
