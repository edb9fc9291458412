//! Password derivation for the simulated user table.
//!
//! Two schemes:
//! - `Demo`: hex of `password + "_salt_demo"`. Reversible, shown to learners
//!   to explain why real systems hash. Only used when `auth.demo_mode` is on.
//! - `Salted`: `sha256$<salt>$<digest>` with a random per-record salt.
//!
//! Neither is a password KDF. Verification dispatches on the stored format,
//! so accounts created in demo mode keep working after it is switched off.

use rand::RngCore;
use sha2::{Digest, Sha256};

const DEMO_SUFFIX: &str = "_salt_demo";
const SALTED_PREFIX: &str = "sha256";
const SALT_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordScheme {
    Demo,
    Salted,
}

impl PasswordScheme {
    pub fn from_demo_mode(demo_mode: bool) -> Self {
        if demo_mode {
            PasswordScheme::Demo
        } else {
            PasswordScheme::Salted
        }
    }

    /// Derive a storable hash for `password`
    pub fn hash(&self, password: &str) -> String {
        match self {
            PasswordScheme::Demo => demo_encode(password),
            PasswordScheme::Salted => {
                let mut salt = [0u8; SALT_LEN];
                rand::thread_rng().fill_bytes(&mut salt);
                salted_hash(password, &salt)
            }
        }
    }
}

/// Check `password` against any hash this module produced
pub fn verify(password: &str, stored: &str) -> bool {
    match parse_salted(stored) {
        Some(salt) => salted_hash(password, &salt) == stored,
        None => demo_encode(password) == stored,
    }
}

fn demo_encode(password: &str) -> String {
    hex::encode(format!("{}{}", password, DEMO_SUFFIX))
}

fn salted_hash(password: &str, salt: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    format!(
        "{}${}${}",
        SALTED_PREFIX,
        hex::encode(salt),
        hex::encode(hasher.finalize())
    )
}

fn parse_salted(stored: &str) -> Option<Vec<u8>> {
    let mut parts = stored.splitn(3, '$');
    if parts.next()? != SALTED_PREFIX {
        return None;
    }
    let salt = hex::decode(parts.next()?).ok()?;
    parts.next()?;
    Some(salt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_scheme_is_deterministic_and_reversible() {
        let hash = PasswordScheme::Demo.hash("hunter22");
        assert_eq!(hash, PasswordScheme::Demo.hash("hunter22"));

        let decoded = String::from_utf8(hex::decode(&hash).unwrap()).unwrap();
        assert_eq!(decoded, "hunter22_salt_demo");
        assert!(verify("hunter22", &hash));
        assert!(!verify("hunter23", &hash));
    }

    #[test]
    fn test_salted_scheme_uses_fresh_salt() {
        let a = PasswordScheme::Salted.hash("hunter22");
        let b = PasswordScheme::Salted.hash("hunter22");
        assert_ne!(a, b);
        assert!(a.starts_with("sha256$"));
        assert!(verify("hunter22", &a));
        assert!(verify("hunter22", &b));
        assert!(!verify("hunter2", &a));
    }

    #[test]
    fn test_scheme_from_demo_mode() {
        assert_eq!(PasswordScheme::from_demo_mode(true), PasswordScheme::Demo);
        assert_eq!(PasswordScheme::from_demo_mode(false), PasswordScheme::Salted);
    }

    #[test]
    fn test_garbage_hash_never_verifies() {
        assert!(!verify("anything", "sha256$zz$00"));
        assert!(!verify("anything", ""));
    }
}
