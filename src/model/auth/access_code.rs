use argon2::Config as Argon2Config;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Length of a generated access code.
pub const CODE_LENGTH: usize = 8;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A survey's manager access code. The plaintext exists only at generation
/// time (it is shown to the admin exactly once); the registry stores the
/// argon2 hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessCode(String);

impl AccessCode {
    /// Generate a fresh random code.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let code = (0..CODE_LENGTH)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Hash this code for storage.
    pub fn into_hash(self) -> Result<String> {
        // 16 bytes is recommended for password hashing:
        //  https://en.wikipedia.org/wiki/Argon2
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let hash = argon2::hash_encoded(self.0.as_bytes(), &salt, &Argon2Config::default())?;
        Ok(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AccessCode {
    fn from(code: String) -> Self {
        // Codes are displayed and usually re-entered in uppercase; accept
        // either on the way in.
        Self(code.trim().to_uppercase())
    }
}

/// Check a submitted code against the stored hash.
pub fn verify(code: &AccessCode, stored_hash: &str) -> bool {
    argon2::verify_encoded(stored_hash, code.0.as_bytes()).unwrap_or(false)
}

/// Map a verification failure to the policy denial, keeping the precise
/// reason for the log only.
pub fn verify_or_deny(code: &AccessCode, stored_hash: &str) -> Result<()> {
    if verify(code, stored_hash) {
        Ok(())
    } else {
        Err(Error::AuthDenied(super::policy::Denial::InvalidCode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_use_the_expected_alphabet() {
        let code = AccessCode::generate();
        assert_eq!(code.as_str().len(), CODE_LENGTH);
        assert!(code
            .as_str()
            .bytes()
            .all(|b| ALPHABET.contains(&b)));
    }

    #[test]
    fn hash_verifies_the_original_code_only() {
        let code = AccessCode::generate();
        let hash = code.clone().into_hash().unwrap();
        assert!(verify(&code, &hash));
        assert!(!verify(&AccessCode::from("WRONG123".to_string()), &hash));
    }

    #[test]
    fn submitted_codes_are_normalised() {
        let code = AccessCode::from("  c123456x ".to_string());
        assert_eq!(code.as_str(), "C123456X");
    }

    #[test]
    fn garbage_hashes_never_verify() {
        let code = AccessCode::generate();
        assert!(!verify(&code, "not-an-argon2-hash"));
    }
}
