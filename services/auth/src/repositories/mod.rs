//! Repositories for users and revoked tokens

pub mod revocation;
pub mod user;

pub use revocation::{
    InMemoryRevocationRepository, RedisRevocationRepository, RevocationRepository,
    RevocationStore,
};
pub use user::{InMemoryUserRepository, UserRepository, UserStore};
