use anyhow::{Context, Result};
use clap::Parser;
use std::{env, str::FromStr, time::Duration};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub cache_ttl: Duration,
    pub cache_sweep_interval: Duration,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Image metadata version service")]
pub struct Args {
    /// Host to bind to (overrides IMAGE_VAULT_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides IMAGE_VAULT_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides IMAGE_VAULT_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Lookup cache TTL in seconds (overrides IMAGE_VAULT_CACHE_TTL_SECS)
    #[arg(long)]
    pub cache_ttl_secs: Option<u64>,

    /// Expired-entry sweep interval in seconds (overrides IMAGE_VAULT_CACHE_SWEEP_SECS)
    #[arg(long)]
    pub cache_sweep_secs: Option<u64>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("IMAGE_VAULT_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = env_number("IMAGE_VAULT_PORT", 3000u16)?;
        let env_db = env::var("IMAGE_VAULT_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/image_vault.db".into());
        let env_ttl = env_number("IMAGE_VAULT_CACHE_TTL_SECS", 300u64)?;
        let env_sweep = env_number("IMAGE_VAULT_CACHE_SWEEP_SECS", 60u64)?;

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            cache_ttl: Duration::from_secs(args.cache_ttl_secs.unwrap_or(env_ttl)),
            cache_sweep_interval: Duration::from_secs(
                args.cache_sweep_secs.unwrap_or(env_sweep).max(1),
            ),
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Read a numeric env var, falling back to `default` when unset.
fn env_number<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}
