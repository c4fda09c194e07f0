//! Password hashing logics.

use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;

use crate::config::Argon2 as ArgonConfig;

type Result<T> = std::result::Result<T, CryptoError>;

#[derive(thiserror::Error, Debug)]
pub enum CryptoError {
    #[error("argon2 error: {0}")]
    Argon2(String),
    #[error("invalid argon2 parameters: {0}")]
    Params(String),
}

/// Password manager.
///
/// Hashes passwords into PHC strings and verifies candidates with a
/// salted, constant-time comparison. Verification is deliberately slow;
/// callers run it on a blocking task.
pub struct Crypto {
    argon2: Argon2<'static>,
}

impl Crypto {
    /// Create a new [`Crypto`] with parameters from configuration.
    pub fn new(config: Option<ArgonConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();
        let params = Params::new(
            config.memory_cost,
            config.iterations,
            config.parallelism,
            Some(config.hash_length),
        )
        .map_err(|err| CryptoError::Params(err.to_string()))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a password into a PHC string with a random salt.
    pub fn hash_password(&self, password: impl AsRef<[u8]>) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_ref(), &salt)
            .map_err(|err| CryptoError::Argon2(err.to_string()))?;

        Ok(hash.to_string())
    }

    /// Check a candidate password against a stored PHC string.
    ///
    /// A mismatch is a normal outcome, not an error.
    pub fn verify_password(
        &self,
        password: impl AsRef<[u8]>,
        phc_string: &str,
    ) -> Result<bool> {
        let parsed = PasswordHash::new(phc_string)
            .map_err(|err| CryptoError::Argon2(err.to_string()))?;

        match self.argon2.verify_password(password.as_ref(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(err) => Err(CryptoError::Argon2(err.to_string())),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Small parameters to keep tests fast.
    pub(crate) fn test_crypto() -> Crypto {
        Crypto::new(Some(ArgonConfig {
            memory_cost: 4096,
            iterations: 1,
            parallelism: 1,
            hash_length: 32,
        }))
        .unwrap()
    }

    #[test]
    fn test_hash_then_verify() {
        let crypto = test_crypto();
        let hash = crypto.hash_password("Sup3r-P$ssword").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(crypto.verify_password("Sup3r-P$ssword", &hash).unwrap());
        assert!(!crypto.verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let crypto = test_crypto();
        let first = crypto.hash_password("same-password").unwrap();
        let second = crypto.hash_password("same-password").unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_garbage_phc_string_is_an_error() {
        let crypto = test_crypto();
        assert!(crypto.verify_password("password", "not-a-phc-string").is_err());
    }
}
