use base64::{
    Engine, alphabet,
    engine::{
        DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig, general_purpose::URL_SAFE_NO_PAD,
    },
};
use rand::Rng;
use sha2::Digest;

/// Unreserved characters as defined in RFC 3986, section 2.3.
/// These are exactly the characters allowed in a PKCE code verifier.
pub(crate) const UNRESERVED: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// Unreserved characters without the `.`, which separates the segments of a state token.
pub(crate) const NONCE_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_~";

/// Encodes without padding, but accepts padded input when decoding.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Draws `length` characters uniformly from `charset`.
///
/// `rand::rng()` is a CSPRNG (ChaCha, seeded from the operating system), which is a requirement
/// for anything ending up in a code verifier or CSRF nonce.
pub(crate) fn random_string(length: usize, charset: &[u8]) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| charset[rng.random_range(0..charset.len())] as char)
        .collect()
}

pub(crate) fn base64url_encode(input: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

pub(crate) fn base64url_decode(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_LENIENT.decode(input)
}

/// `BASE64URL(SHA256(input))`, without padding.
pub(crate) fn sha256_base64url(input: &str) -> String {
    let mut hasher = sha2::Sha256::new();
    hasher.update(input.as_bytes());
    base64url_encode(hasher.finalize())
}
