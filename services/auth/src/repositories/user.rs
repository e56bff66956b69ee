//! User repository for database operations

use anyhow::Result;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::models::{NewUser, Role, User};

/// Storage for users; provisioning goes through `create`, the API only reads
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a new user, hashing the supplied password
    async fn create(&self, new_user: &NewUser) -> Result<User>;

    /// Find a user by username
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
}

/// Hash a password with Argon2 and a random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(password_hash)
}

/// Verify a user's password against the stored hash
pub fn verify_password(user: &User, password: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;

    let argon2 = Argon2::default();
    let result = argon2.verify_password(password.as_bytes(), &parsed_hash);

    Ok(result.is_ok())
}

/// Create the user unless the username is already taken.
///
/// Returns whether a user was created.
pub async fn ensure_user(store: &dyn UserStore, new_user: &NewUser) -> Result<bool> {
    if store.find_by_username(&new_user.username).await?.is_some() {
        return Ok(false);
    }

    store.create(new_user).await?;
    Ok(true)
}

/// PostgreSQL-backed user repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> Result<User> {
    let role: String = row.try_get("role")?;

    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        role: role.parse::<Role>().map_err(anyhow::Error::msg)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl UserStore for UserRepository {
    async fn create(&self, new_user: &NewUser) -> Result<User> {
        info!("Creating new user: {}", new_user.username);

        let password_hash = hash_password(&new_user.password)?;

        let row = sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, password_hash, role, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.username)
        .bind(&password_hash)
        .bind(new_user.role.as_str())
        .fetch_one(&self.pool)
        .await?;

        user_from_row(&row)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, username, password_hash, role, created_at, updated_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }
}

/// In-memory user repository, keyed by username
#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserRepository {
    async fn create(&self, new_user: &NewUser) -> Result<User> {
        info!("Creating new user: {}", new_user.username);

        let password_hash = hash_password(&new_user.password)?;
        let mut users = self.users.write().await;

        if users.contains_key(&new_user.username) {
            anyhow::bail!("Username already exists: {}", new_user.username);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username.clone(),
            password_hash,
            role: new_user.role,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.username.clone(), user.clone());

        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self.users.read().await.get(username).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, role: Role) -> NewUser {
        NewUser {
            username: username.to_string(),
            password: "S3cret!pass".to_string(),
            role,
        }
    }

    #[test]
    fn test_hash_is_salted_and_verifiable() {
        let first = hash_password("S3cret!pass").unwrap();
        let second = hash_password("S3cret!pass").unwrap();
        assert_ne!(first, second);
        assert_ne!(first, "S3cret!pass");

        let user = User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            password_hash: first,
            role: Role::User,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(verify_password(&user, "S3cret!pass").unwrap());
        assert!(!verify_password(&user, "wrong").unwrap());
    }

    #[test]
    fn test_verify_with_corrupt_hash_is_error() {
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            password_hash: "plaintext".to_string(),
            role: Role::User,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(verify_password(&user, "plaintext").is_err());
    }

    #[tokio::test]
    async fn test_in_memory_create_and_find() {
        let store = InMemoryUserRepository::new();
        let created = store.create(&new_user("admin", Role::Admin)).await.unwrap();

        let found = store.find_by_username("admin").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.role, Role::Admin);
        assert!(store.find_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_in_memory_rejects_duplicate_username() {
        let store = InMemoryUserRepository::new();
        store.create(&new_user("admin", Role::Admin)).await.unwrap();
        assert!(store.create(&new_user("admin", Role::User)).await.is_err());
    }

    #[tokio::test]
    async fn test_ensure_user_is_idempotent() {
        let store = InMemoryUserRepository::new();
        let user = new_user("admin", Role::Admin);

        assert!(ensure_user(&store, &user).await.unwrap());
        assert!(!ensure_user(&store, &user).await.unwrap());
    }
}
