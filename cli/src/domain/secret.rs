//! Web UI password digest in the agent's `@ByteArray(salt:hash)` format.
//!
//! PBKDF2-HMAC-SHA512, 100 000 iterations, 16-byte random salt, 64-byte key.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use sha2::Sha512;

const SALT_SIZE: usize = 16;
const KEY_SIZE: usize = 64;
const ITERATIONS: u32 = 100_000;

/// Derive a fresh salted digest for `password`.
#[must_use]
pub fn derive(password: &str) -> String {
    let mut salt = [0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    format_digest(&salt, &hash(password, &salt))
}

/// Check `password` against a digest produced by [`derive`].
///
/// Returns `false` for anything that is not a well-formed digest.
#[must_use]
pub fn verify(password: &str, digest: &str) -> bool {
    let Some((salt, expected)) = parse_digest(digest) else {
        return false;
    };
    hash(password, &salt).as_slice() == expected.as_slice()
}

/// Split a digest into its decoded salt and key.
#[must_use]
pub fn parse_digest(digest: &str) -> Option<(Vec<u8>, Vec<u8>)> {
    let inner = digest.strip_prefix("@ByteArray(")?.strip_suffix(')')?;
    let (salt, key) = inner.split_once(':')?;
    let salt = STANDARD.decode(salt).ok()?;
    let key = STANDARD.decode(key).ok()?;
    (salt.len() == SALT_SIZE && key.len() == KEY_SIZE).then_some((salt, key))
}

fn hash(password: &str, salt: &[u8]) -> [u8; KEY_SIZE] {
    let mut key = [0u8; KEY_SIZE];
    pbkdf2::pbkdf2_hmac::<Sha512>(password.as_bytes(), salt, ITERATIONS, &mut key);
    key
}

fn format_digest(salt: &[u8], key: &[u8]) -> String {
    format!(
        "@ByteArray({}:{})",
        STANDARD.encode(salt),
        STANDARD.encode(key)
    )
}
