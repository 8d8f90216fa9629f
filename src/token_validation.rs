use snafu::{ResultExt, Snafu};
use time::{Duration, OffsetDateTime};

use crate::token_claims::AccessTokenClaims;

#[derive(Debug, Clone, PartialEq, Snafu)]
pub enum JwtDecodeError {
    #[snafu(display(
        "JwtDecodeError: Could not decode JWT header. Input may have the wrong format"
    ))]
    DecodeHeader { source: jsonwebtoken::errors::Error },

    #[snafu(display("JwtDecodeError: Could not decode JWT claims"))]
    DecodeClaims { source: jsonwebtoken::errors::Error },
}

/// Decode the claims of `access_token` without checking its signature.
///
/// This is a trust boundary: the returned claims may have been forged by anyone able to write to
/// browser storage. They are good enough to greet the user and to schedule refreshes, nothing more.
pub fn decode_unverified(access_token: &str) -> Result<AccessTokenClaims, JwtDecodeError> {
    let jwt_header = jsonwebtoken::decode_header(access_token).context(DecodeHeaderSnafu {})?;

    let mut validation = jsonwebtoken::Validation::new(jwt_header.alg);
    validation.insecure_disable_signature_validation();
    // Expiry is judged by `is_access_token_valid` against our own clock.
    validation.validate_exp = false;
    validation.validate_aud = false;

    let token_data = jsonwebtoken::decode::<AccessTokenClaims>(
        access_token,
        &jsonwebtoken::DecodingKey::from_secret(&[]),
        &validation,
    )
    .context(DecodeClaimsSnafu {})?;

    Ok(token_data.claims)
}

/// `true` if the token decodes and expires later than `now + buffer`.
///
/// Never fails: anything that cannot be decoded counts as not authenticated.
pub fn is_access_token_valid(access_token: &str, now: OffsetDateTime, buffer: Duration) -> bool {
    match decode_unverified(access_token) {
        Ok(claims) => claims.exp > (now + buffer).unix_timestamp(),
        Err(err) => {
            tracing::debug!(?err, "Access token could not be decoded. Treating it as invalid.");
            false
        }
    }
}
