//! PBKDF2-SHA256 password hashes stored as
//! `pbkdf2-sha256$iterations$salthex$keyhex`.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

const SCHEME: &str = "pbkdf2-sha256";

/// Iteration count for new hashes.
#[cfg(not(test))]
pub const PBKDF2_ITERATIONS: u32 = 210_000;
#[cfg(test)]
pub const PBKDF2_ITERATIONS: u32 = 1_000;

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    hash_with_iterations(password, PBKDF2_ITERATIONS)
}

/// Hash with an explicit iteration count.
pub fn hash_with_iterations(password: &str, iterations: u32) -> String {
    let salt = *uuid::Uuid::new_v4().as_bytes();
    format!(
        "{}${}${}${}",
        SCHEME,
        iterations,
        hex::encode(salt),
        hex::encode(derive_key(password, &salt, iterations))
    )
}

/// Check a password against a stored hash. The iteration count is read
/// from the stored value, so older hashes keep verifying after the
/// default changes.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(SCHEME), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    if iterations == 0 {
        return false;
    }
    let (Ok(salt), Ok(expected)) = (hex::decode(salt), hex::decode(expected)) else {
        return false;
    };

    let actual = derive_key(password, &salt, iterations);
    // Compare every byte so timing does not depend on the mismatch position
    actual.len() == expected.len()
        && actual
            .iter()
            .zip(expected.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

fn derive_key(password: &str, salt: &[u8], iterations: u32) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_verifies() {
        let stored = hash_password("s3cret-pass");
        assert!(verify_password("s3cret-pass", &stored));
        assert!(!verify_password("s3cret-Pass", &stored));
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_password("same");
        let b = hash_password("same");
        assert_ne!(a, b);

        let parts: Vec<&str> = a.split('$').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "pbkdf2-sha256");
        assert_eq!(parts[1], PBKDF2_ITERATIONS.to_string());
        assert_eq!(parts[2].len(), 32);
        assert_eq!(parts[3].len(), 64);
    }

    #[test]
    fn test_iteration_count_is_read_from_hash() {
        let stored = hash_with_iterations("rabies-free", 2_000);
        assert!(stored.starts_with("pbkdf2-sha256$2000$"));
        assert!(verify_password("rabies-free", &stored));

        // Same salt and key under a different count must not verify
        let tampered = stored.replacen("$2000$", "$2001$", 1);
        assert!(!verify_password("rabies-free", &tampered));
    }

    #[test]
    fn test_malformed_hash_rejected() {
        assert!(!verify_password("anything", ""));
        assert!(!verify_password("anything", "nodollar"));
        assert!(!verify_password("anything", "salt$deadbeef"));
        assert!(!verify_password("anything", "pbkdf2-sha256$0$00$00"));
        assert!(!verify_password("anything", "pbkdf2-sha256$10$zz$00"));
        assert!(!verify_password("anything", "pbkdf2-sha256$10$00$00$extra"));
    }
}
