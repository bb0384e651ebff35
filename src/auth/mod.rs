//! Authentication Module
//! Mission: Stateless session tokens and a permission-gated account store

pub mod errors;
pub mod jwt;
pub mod memory_backend;
pub mod middleware;
pub mod models;
pub mod password;
pub mod permissions;
pub mod user_store;

pub use errors::AuthError;
pub use jwt::JwtHandler;
pub use memory_backend::MemoryBackend;
pub use middleware::{auth_middleware, Authenticated};
pub use password::{BcryptHasher, PasswordHasher};
pub use user_store::{UserBackend, UserStore};
