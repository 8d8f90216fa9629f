use snafu::{Snafu, ensure};

use crate::random;

/// Smallest code verifier length allowed by RFC 7636.
pub const MIN_CODE_VERIFIER_LENGTH: usize = 43;

/// Largest code verifier length allowed by RFC 7636.
pub const MAX_CODE_VERIFIER_LENGTH: usize = 128;

/// We always go for the maximum entropy the protocol allows.
pub const DEFAULT_CODE_VERIFIER_LENGTH: usize = MAX_CODE_VERIFIER_LENGTH;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum PkceError {
    #[snafu(display(
        "PkceError: Code verifier length {length} is outside of the allowed range 43..=128"
    ))]
    InvalidVerifierLength { length: usize },

    #[snafu(display("PkceError: Code verifier contains characters outside of the unreserved set"))]
    InvalidVerifierCharacters,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CodeVerifier {
    code_verifier: String,
}

impl CodeVerifier {
    /// Generate a new verifier of `length` unreserved characters.
    ///
    /// see: https://datatracker.ietf.org/doc/html/rfc7636#section-4.1
    pub fn generate(length: usize) -> Result<Self, PkceError> {
        check_length(length)?;
        Ok(Self {
            code_verifier: random::random_string(length, random::UNRESERVED),
        })
    }

    /// Accept an existing verifier, e.g. one recovered from a state token.
    pub fn parse(code_verifier: impl Into<String>) -> Result<Self, PkceError> {
        let code_verifier = code_verifier.into();
        check_length(code_verifier.len())?;
        ensure!(
            code_verifier
                .bytes()
                .all(|b| random::UNRESERVED.contains(&b)),
            InvalidVerifierCharactersSnafu
        );
        Ok(Self { code_verifier })
    }

    pub fn to_code_challenge(&self) -> CodeChallenge {
        CodeChallenge {
            code_challenge: random::sha256_base64url(&self.code_verifier),
            code_challenge_method: CodeChallengeMethod::S256,
        }
    }

    pub fn code_verifier(&self) -> &str {
        self.code_verifier.as_str()
    }
}

pub(crate) fn check_length(length: usize) -> Result<(), PkceError> {
    ensure!(
        (MIN_CODE_VERIFIER_LENGTH..=MAX_CODE_VERIFIER_LENGTH).contains(&length),
        InvalidVerifierLengthSnafu { length }
    );
    Ok(())
}

/// Only `S256` is supported. The `plain` method offers no protection once the authorization
/// request leaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeChallengeMethod {
    S256,
}

impl CodeChallengeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeChallengeMethod::S256 => "S256",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeChallenge {
    code_challenge: String,
    code_challenge_method: CodeChallengeMethod,
}

impl CodeChallenge {
    pub fn code_challenge(&self) -> &str {
        self.code_challenge.as_str()
    }

    pub fn code_challenge_method(&self) -> CodeChallengeMethod {
        self.code_challenge_method
    }
}

/// A freshly generated verifier together with its challenge.
/// Lives for a single login attempt and is never written to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceChallenge {
    pub code_verifier: CodeVerifier,
    pub code_challenge: CodeChallenge,
}

pub fn generate_challenge(verifier_length: usize) -> Result<PkceChallenge, PkceError> {
    let code_verifier = CodeVerifier::generate(verifier_length)?;
    let code_challenge = code_verifier.to_code_challenge();
    Ok(PkceChallenge {
        code_verifier,
        code_challenge,
    })
}

#[cfg(test)]
mod test {
    use super::{CodeChallengeMethod, CodeVerifier, PkceError, generate_challenge};
    use assertr::prelude::*;

    #[test]
    fn test_43() {
        let pkce = generate_challenge(43).unwrap();
        assert_that(pkce.code_verifier.code_verifier()).has_length(43);
        assert_that(pkce.code_challenge.code_challenge_method())
            .is_equal_to(CodeChallengeMethod::S256);
        assert_that(pkce.code_challenge.code_challenge()).has_length(43);
    }

    #[test]
    fn test_128() {
        let pkce = generate_challenge(128).unwrap();
        assert_that(pkce.code_verifier.code_verifier()).has_length(128);
        assert_that(pkce.code_challenge.code_challenge()).has_length(43);
    }

    #[test]
    fn lengths_outside_of_range_are_rejected() {
        assert_that(generate_challenge(42).unwrap_err())
            .is_equal_to(PkceError::InvalidVerifierLength { length: 42 });
        assert_that(generate_challenge(129).unwrap_err())
            .is_equal_to(PkceError::InvalidVerifierLength { length: 129 });
    }

    #[test]
    fn challenge_matches_rfc_7636_appendix_b() {
        let verifier = CodeVerifier::parse("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk").unwrap();
        assert_that(verifier.to_code_challenge().code_challenge())
            .is_equal_to("E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn parse_rejects_reserved_characters() {
        let verifier = format!("{}/", "a".repeat(50));
        assert_that(CodeVerifier::parse(verifier).unwrap_err())
            .is_equal_to(PkceError::InvalidVerifierCharacters);
    }

    #[test]
    fn challenge_is_deterministic() {
        let pkce = generate_challenge(64).unwrap();
        assert_that(pkce.code_verifier.to_code_challenge()).is_equal_to(pkce.code_challenge);
    }
}
