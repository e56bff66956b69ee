//! Provision a user out of band, directly in the PostgreSQL database

use anyhow::Result;
use auth::{
    models::{NewUser, Role},
    repositories::{UserRepository, UserStore},
    validation::validate_new_user,
};
use clap::Parser;
use common::database::{DatabaseConfig, init_pool, run_migrations};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Create a songbook user
#[derive(Debug, Parser)]
#[command(name = "create-user", version, about)]
struct Args {
    /// Login name, 3-32 letters, digits or underscores
    #[arg(long)]
    username: String,

    /// Password; read from CREATE_USER_PASSWORD when not given
    #[arg(long, env = "CREATE_USER_PASSWORD", hide_env_values = true)]
    password: String,

    /// Role of the new user (admin or user)
    #[arg(long, default_value = "user")]
    role: Role,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let new_user = NewUser {
        username: args.username,
        password: args.password,
        role: args.role,
    };
    validate_new_user(&new_user).map_err(anyhow::Error::msg)?;

    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;
    run_migrations(&pool).await?;

    let repository = UserRepository::new(pool);
    if repository.find_by_username(&new_user.username).await?.is_some() {
        anyhow::bail!("User {} already exists", new_user.username);
    }

    let user = repository.create(&new_user).await?;
    info!("Created {} user {} ({})", user.role, user.username, user.id);

    Ok(())
}
