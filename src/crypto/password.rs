use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::CryptoError;

pub const HASH_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 16;

const SCHEME: &str = "pbkdf2-sha256";

/// Hash a password for storage.
///
/// Output is `pbkdf2-sha256$<iterations>$<salt>$<hash>` with unpadded
/// base64 fields, so the iteration count can be raised without
/// invalidating existing hashes.
pub fn hash_password(password: &str, iterations: u32) -> String {
    let salt = generate_salt();
    let hash = derive(password, &salt, iterations);
    format!(
        "{SCHEME}${iterations}${}${}",
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(hash)
    )
}

/// Check `password` against a stored hash in constant time.
pub fn verify_password(password: &str, stored: &str) -> Result<(), CryptoError> {
    let mut parts = stored.split('$');
    let (Some(SCHEME), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(CryptoError::MalformedHash);
    };

    let iterations: u32 = iterations.parse().map_err(|_| CryptoError::MalformedHash)?;
    let salt = STANDARD_NO_PAD
        .decode(salt)
        .map_err(|_| CryptoError::MalformedHash)?;
    let expected = STANDARD_NO_PAD
        .decode(expected)
        .map_err(|_| CryptoError::MalformedHash)?;
    if iterations == 0 || expected.len() != HASH_LENGTH {
        return Err(CryptoError::MalformedHash);
    }

    let actual = derive(password, &salt, iterations);
    if bool::from(actual.as_slice().ct_eq(expected.as_slice())) {
        Ok(())
    } else {
        Err(CryptoError::WrongPassword)
    }
}

/// Refuse a login whose account does not exist, after the same PBKDF2 work
/// a real verification at `iterations` would cost.
pub fn reject_unknown_account(password: &str, iterations: u32) -> Result<(), CryptoError> {
    let _ = derive(password, &[0u8; SALT_LENGTH], iterations.max(1));
    Err(CryptoError::WrongPassword)
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LENGTH] {
    let mut out = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}

/// Generate a cryptographically random salt
pub fn generate_salt() -> [u8; SALT_LENGTH] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}
