// ============================
// pushrelay-backend-lib/src/auth/password.rs
// ============================
//! Password hashing and verification.
use scrypt::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Params, Scrypt,
};
use zeroize::Zeroize;

/// Default cost as log2(N)
pub const DEFAULT_HASH_COST: u8 = 15;

const BLOCK_SIZE: u32 = 8;
const PARALLELISM: u32 = 1;
const OUTPUT_LEN: usize = 32;

/// Salted scrypt hasher with a cost fixed for the lifetime of the process.
///
/// Hashes are PHC strings, so verification reads the parameters back from
/// the stored hash and keeps working after the configured cost changes.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasherConfig {
    params: Params,
}

impl PasswordHasherConfig {
    pub fn new(cost: u8) -> anyhow::Result<Self> {
        let params = Params::new(cost, BLOCK_SIZE, PARALLELISM, OUTPUT_LEN)
            .map_err(|e| anyhow::anyhow!("invalid scrypt parameters: {e}"))?;
        Ok(Self { params })
    }

    /// Hash a password with a fresh random salt
    pub fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Scrypt
            .hash_password_customized(plain.as_bytes(), None, None, self.params, &salt)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?
            .to_string();
        Ok(hash)
    }

    /// Hash a password and wipe the plaintext buffer
    pub fn hash_secure(&self, plain: &mut String) -> anyhow::Result<String> {
        let hash = self.hash(plain);
        plain.zeroize();
        hash
    }
}

impl Default for PasswordHasherConfig {
    fn default() -> Self {
        Self {
            params: Params::recommended(),
        }
    }
}

/// Verify a password against a stored PHC hash
pub fn verify_password(hash: &str, plain: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Scrypt.verify_password(plain.as_bytes(), &parsed_hash).is_ok()
}
