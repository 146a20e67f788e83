use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use argon2::{Algorithm, Argon2, Params, Version};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use crate::utils::{config::Configuration, errors::{ErrorCode, TurnstileError}};

///
/// The argon2id cost parameters new password hashes are produced with.
///
/// Existing hashes carry their own parameters in the PHC string, so changing these only
/// affects passwords hashed afterwards.
///
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ArgonPolicy {
    pub iterations: u32,
    pub memory_size_kb: u32,
    pub parallelism: u32,
}

impl Default for ArgonPolicy {
    fn default() -> Self {
        ArgonPolicy {
            iterations: 2,
            memory_size_kb: 19 * 1024,
            parallelism: 1,
        }
    }
}

impl From<&Configuration> for ArgonPolicy {
    fn from(config: &Configuration) -> Self {
        ArgonPolicy {
            iterations: config.argon_iterations,
            memory_size_kb: config.argon_memory_kb,
            parallelism: config.argon_parallelism,
        }
    }
}

impl ArgonPolicy {
    ///
    /// Hash the password with a fresh random salt into a PHC string ($argon2id$v=19$...).
    ///
    /// ref: https://github.com/P-H-C/phc-string-format/blob/master/phc-sf-spec.md
    ///
    /// This is CPU-bound - call it from the blocking thread pool.
    ///
    pub fn hash_into_phc(&self, plain_text_password: &str) -> Result<String, TurnstileError> {
        let salt = SaltString::generate(&mut OsRng);
        let params = Params::new(self.memory_size_kb, self.iterations, self.parallelism, None)?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        Ok(argon2.hash_password(plain_text_password.as_bytes(), &salt)?.to_string())
    }
}

///
/// Check the plain text password against the PHC string. The comparison is constant-time.
///
pub fn validate(plain_text_password: &str, phc: &str) -> Result<bool, TurnstileError> {
    let parsed_hash = PasswordHash::new(phc)
        .map_err(|err| ErrorCode::InvalidPHCFormat.with_msg(&format!("The stored hash is not a PHC string: {}", err)))?;

    // Parameters are taken from the PHC string, not the defaults.
    Ok(Argon2::default().verify_password(plain_text_password.as_bytes(), &parsed_hash).is_ok())
}

///
/// Only argon2 hashes are accepted from storage.
///
pub fn validate_phc(phc: &str) -> Result<(), TurnstileError> {
    match PasswordHash::new(phc) {
        Ok(parsed) if parsed.algorithm.as_str().starts_with("argon2") => Ok(()),
        Ok(parsed) => Err(ErrorCode::InvalidPHCFormat.with_msg(&format!("algorithm {} is un-handled", parsed.algorithm))),
        Err(err) => Err(ErrorCode::InvalidPHCFormat.with_msg(&format!("The stored hash is not a PHC string: {}", err))),
    }
}


#[cfg(test)]
pub fn fast_policy() -> ArgonPolicy {
    ArgonPolicy { iterations: 1, memory_size_kb: 1024, parallelism: 1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_argon2id_phc_and_never_the_plaintext() -> Result<(), TurnstileError> {
        let phc = fast_policy().hash_into_phc("Hello123!")?;
        assert!(phc.starts_with("$argon2id$v=19$"));
        assert!(!phc.contains("Hello123!"));
        validate_phc(&phc)?;
        Ok(())
    }

    #[test]
    fn test_each_hash_is_salted() -> Result<(), TurnstileError> {
        let first = fast_policy().hash_into_phc("Hello123!")?;
        let second = fast_policy().hash_into_phc("Hello123!")?;
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn test_validate() -> Result<(), TurnstileError> {
        let phc = fast_policy().hash_into_phc("Hello123!")?;
        assert!(validate("Hello123!", &phc)?);
        assert!(!validate("Hello456!", &phc)?);
        Ok(())
    }

    #[test]
    fn test_garbage_phc_is_rejected() {
        assert_eq!(validate("Hello123!", "plaintext").unwrap_err().error_code(), ErrorCode::InvalidPHCFormat);
        assert_eq!(validate_phc("Hello123!").unwrap_err().error_code(), ErrorCode::InvalidPHCFormat);
    }
}
