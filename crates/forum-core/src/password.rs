//! Password hashing.
//!
//! Stored format: `pbkdf2-sha256$<iterations>$<salt hex>$<digest hex>`. The
//! digest is one 32-byte PBKDF2-HMAC-SHA256 block and the salt is 16 bytes
//! from the OS CSPRNG (a UUID v4). The iteration count travels with the hash,
//! so raising [`ITERATIONS`] leaves existing hashes verifiable.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const SCHEME: &str = "pbkdf2-sha256";

/// PBKDF2 rounds used for new hashes.
pub const ITERATIONS: u32 = 100_000;

/// Hash a plaintext password with a fresh random salt.
#[must_use]
pub fn hash_password(password: &str) -> String {
    let salt = uuid::Uuid::new_v4();
    let digest = pbkdf2_sha256(password.as_bytes(), salt.as_bytes(), ITERATIONS);
    format!(
        "{SCHEME}${ITERATIONS}${}${}",
        hex::encode(salt.as_bytes()),
        hex::encode(digest)
    )
}

/// Check a plaintext password against a stored hash.
///
/// Returns `false` for any malformed stored value.
#[must_use]
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(4, '$');
    let (Some(scheme), Some(rounds), Some(salt_hex), Some(digest_hex)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if scheme != SCHEME {
        return false;
    }
    let Ok(rounds) = rounds.parse::<u32>() else {
        return false;
    };
    if rounds == 0 {
        return false;
    }
    let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(digest_hex)) else {
        return false;
    };

    let actual = pbkdf2_sha256(password.as_bytes(), &salt, rounds);
    actual.as_slice().ct_eq(expected.as_slice()).into()
}

/// First PBKDF2 output block (RFC 8018 §5.2), which is the whole key at 32 bytes.
fn pbkdf2_sha256(password: &[u8], salt: &[u8], rounds: u32) -> [u8; 32] {
    #[allow(clippy::expect_used)]
    let keyed = HmacSha256::new_from_slice(password).expect("HMAC accepts keys of any length");

    let mut mac = keyed.clone();
    mac.update(salt);
    mac.update(&1u32.to_be_bytes());
    let mut block: [u8; 32] = mac.finalize().into_bytes().into();
    let mut out = block;

    for _ in 1..rounds {
        let mut mac = keyed.clone();
        mac.update(&block);
        block = mac.finalize().into_bytes().into();
        for (o, b) in out.iter_mut().zip(block) {
            *o ^= b;
        }
    }
    out
}
