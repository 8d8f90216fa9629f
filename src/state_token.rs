use std::fmt::{Display, Formatter};

use snafu::{ResultExt, Snafu, ensure};

use crate::code_verifier::{CodeVerifier, PkceError};
use crate::random;

/// Separates the anti-CSRF nonce from the encoded code verifier.
pub const STATE_SEPARATOR: char = '.';

/// Minimum (and default) length of the anti-CSRF nonce.
pub const MIN_STATE_NONCE_LENGTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum StateTokenError {
    #[snafu(display(
        "StateTokenError: Expected exactly two '.'-separated segments, found {segments}"
    ))]
    SegmentCount { segments: usize },

    #[snafu(display("StateTokenError: State contains an empty segment"))]
    EmptySegment,

    #[snafu(display("StateTokenError: Could not base64url-decode the code verifier"))]
    Decode { source: base64::DecodeError },

    #[snafu(display("StateTokenError: Decoded code verifier is not valid UTF-8"))]
    Utf8 { source: std::string::FromUtf8Error },

    #[snafu(display("StateTokenError: Decoded code verifier is invalid"))]
    Verifier { source: PkceError },
}

/// The OAuth `state` parameter of a stateless PKCE login: `nonce.base64url(code_verifier)`.
///
/// Carrying the verifier inside the state means nothing has to be stored between redirecting to
/// the authorization server and handling its callback. The authorization server echoes the state
/// back unchanged, and the verifier is only sent to the token endpoint together with the single
/// use authorization code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateToken {
    nonce: String,
    code_verifier: CodeVerifier,
}

impl StateToken {
    /// Nonce lengths below `MIN_STATE_NONCE_LENGTH` are raised to it.
    pub fn new(code_verifier: CodeVerifier, nonce_length: usize) -> Self {
        Self {
            nonce: random::random_string(
                nonce_length.max(MIN_STATE_NONCE_LENGTH),
                random::NONCE_CHARSET,
            ),
            code_verifier,
        }
    }

    pub fn parse(state: &str) -> Result<Self, StateTokenError> {
        let segments = state.split(STATE_SEPARATOR).collect::<Vec<_>>();
        let [nonce, encoded_verifier] = segments.as_slice() else {
            return SegmentCountSnafu {
                segments: segments.len(),
            }
            .fail();
        };
        ensure!(
            !nonce.is_empty() && !encoded_verifier.is_empty(),
            EmptySegmentSnafu
        );

        let decoded = random::base64url_decode(encoded_verifier).context(DecodeSnafu {})?;
        let decoded = String::from_utf8(decoded).context(Utf8Snafu {})?;
        let code_verifier = CodeVerifier::parse(decoded).context(VerifierSnafu {})?;

        Ok(Self {
            nonce: (*nonce).to_owned(),
            code_verifier,
        })
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    pub fn code_verifier(&self) -> &CodeVerifier {
        &self.code_verifier
    }

    pub fn into_code_verifier(self) -> CodeVerifier {
        self.code_verifier
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl Display for StateToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{STATE_SEPARATOR}{}",
            self.nonce,
            random::base64url_encode(self.code_verifier.code_verifier())
        )
    }
}
