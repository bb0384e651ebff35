//! Password hashing collaborator.

use anyhow::{Context, Result};
use bcrypt::{hash, verify, DEFAULT_COST};

/// Lowest work factor bcrypt accepts. Fast enough for tests, far too weak
/// for real accounts.
pub const MIN_BCRYPT_COST: u32 = 4;

/// One-way credential hashing. Failures are internal errors, never a
/// client's fault.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String>;

    fn verify(&self, plaintext: &str, hashed: &str) -> Result<bool>;
}

/// bcrypt with a configurable work factor.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plaintext: &str) -> Result<String> {
        hash(plaintext, self.cost).context("Failed to hash password")
    }

    fn verify(&self, plaintext: &str, hashed: &str) -> Result<bool> {
        verify(plaintext, hashed).context("Failed to verify password")
    }
}
