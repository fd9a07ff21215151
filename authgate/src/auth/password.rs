//! Argon2id password hashing.

use super::errors::{AuthError, AuthResult};
use crate::config::HasherConfig;
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString, rand_core::OsRng,
    },
};

/// Salted one-way password hashing with an optional server-side pepper.
#[derive(Clone)]
pub struct PasswordHasher {
    pepper: String,
    params: Params,
    /// Hash checked against when there is no stored hash to compare with
    dummy_hash: String,
}

impl PasswordHasher {
    /// Build a hasher from the configured costs.
    ///
    /// # Errors
    ///
    /// * `AuthError::HashingFailed` - Cost parameters rejected by argon2
    pub fn new(config: &HasherConfig) -> AuthResult<Self> {
        let params = Params::new(
            config.memory_cost_kib,
            config.time_cost,
            config.parallelism,
            None,
        )
        .map_err(|_| AuthError::HashingFailed)?;

        let mut hasher = Self {
            pepper: config.pepper.clone(),
            params,
            dummy_hash: String::new(),
        };
        hasher.dummy_hash = hasher.hash("authgate-unused-password")?;

        Ok(hasher)
    }

    /// Hash password with Argon2id + pepper
    ///
    /// A fresh random salt is drawn on every call.
    pub fn hash(&self, password: &str) -> AuthResult<String> {
        let peppered = format!("{}{}", password, self.pepper);
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());

        Ok(argon2
            .hash_password(peppered.as_bytes(), &salt)
            .map_err(|_| AuthError::HashingFailed)?
            .to_string())
    }

    /// Verify password against hash
    ///
    /// The cost parameters stored in `hash` are used, so hashes made under
    /// older settings keep verifying. A hash that fails to parse verifies as
    /// `false`.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            return false;
        };
        let peppered = format!("{}{}", password, self.pepper);

        Argon2::default()
            .verify_password(peppered.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Spend one verification's worth of work and discard the result.
    ///
    /// Called when an account lookup misses, so an unknown email costs as
    /// much time as a wrong password.
    pub fn verify_dummy(&self, password: &str) {
        let _ = self.verify(password, &self.dummy_hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> HasherConfig {
        HasherConfig {
            pepper: String::new(),
            memory_cost_kib: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = PasswordHasher::new(&fast_config()).unwrap();
        let hash = hasher.hash("p1").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("p1", &hash));
        assert!(!hasher.verify("wrong", &hash));
    }

    #[test]
    fn test_salt_differs_per_call() {
        let hasher = PasswordHasher::new(&fast_config()).unwrap();
        let first = hasher.hash("same").unwrap();
        let second = hasher.hash("same").unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify("same", &first));
        assert!(hasher.verify("same", &second));
    }

    #[test]
    fn test_pepper_is_required_to_verify() {
        let peppered = PasswordHasher::new(&HasherConfig {
            pepper: "server-pepper".to_string(),
            ..fast_config()
        })
        .unwrap();
        let plain = PasswordHasher::new(&fast_config()).unwrap();

        let hash = peppered.hash("p1").unwrap();
        assert!(peppered.verify("p1", &hash));
        assert!(!plain.verify("p1", &hash));
    }

    #[test]
    fn test_malformed_hash_verifies_false() {
        let hasher = PasswordHasher::new(&fast_config()).unwrap();
        assert!(!hasher.verify("p1", "not-a-phc-string"));
        assert!(!hasher.verify("p1", ""));
    }

    #[test]
    fn test_dummy_hash_uses_configured_costs() {
        let hasher = PasswordHasher::new(&fast_config()).unwrap();
        let parsed = PasswordHash::new(&hasher.dummy_hash).unwrap();

        assert_eq!(parsed.algorithm.as_str(), "argon2id");
        assert_eq!(Params::try_from(&parsed).unwrap().m_cost(), 1024);
        assert!(!hasher.verify("p1", &hasher.dummy_hash));
        hasher.verify_dummy("p1");
    }

    #[test]
    fn test_invalid_cost_is_rejected() {
        let result = PasswordHasher::new(&HasherConfig {
            time_cost: 0,
            ..fast_config()
        });
        assert!(matches!(result, Err(AuthError::HashingFailed)));
    }
}
