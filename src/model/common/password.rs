use argon2::Config;
use rand::Rng;

/// Minimum length of any admin or voter password.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash a plaintext password into an encoded argon2 string with a fresh salt.
pub fn hash_password(password: &str) -> Result<String, argon2::Error> {
    // 16 bytes is recommended for password hashing:
    //  https://en.wikipedia.org/wiki/Argon2
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill(&mut salt);
    argon2::hash_encoded(password.as_bytes(), &salt, &Config::default())
}

/// Check a plaintext password against an encoded hash.
/// A malformed hash never matches.
pub fn verify_password(encoded_hash: &str, password: &str) -> bool {
    argon2::verify_encoded(encoded_hash, password.as_bytes()).unwrap_or(false)
}
