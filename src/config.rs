use anyhow::bail;
use clap::Args;

pub const DEFAULT_STALE_DAYS: u32 = 14;

/// Connection settings shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true, global = true)]
    pub database_url: Option<String>,

    /// Maximum pooled connections
    #[arg(long, default_value_t = 5, global = true)]
    pub max_connections: u32,
}

/// Runtime configuration, built once in `main` and passed down explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
}

impl Config {
    pub fn from_args(args: &ConnectionArgs) -> anyhow::Result<Self> {
        let database_url = match args.database_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => bail!("DATABASE_URL must be set to a production Postgres instance"),
        };

        if args.max_connections == 0 {
            bail!("--max-connections must be at least 1");
        }

        Ok(Self {
            database_url,
            max_connections: args.max_connections,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(url: Option<&str>, max_connections: u32) -> ConnectionArgs {
        ConnectionArgs {
            database_url: url.map(str::to_string),
            max_connections,
        }
    }

    #[test]
    fn builds_from_connection_args() {
        let config = Config::from_args(&args(Some(" postgres://localhost/gs "), 3)).unwrap();
        assert_eq!(config.database_url, "postgres://localhost/gs");
        assert_eq!(config.max_connections, 3);
    }

    #[test]
    fn rejects_missing_or_blank_url() {
        assert!(Config::from_args(&args(None, 5)).is_err());
        assert!(Config::from_args(&args(Some("  "), 5)).is_err());
    }

    #[test]
    fn rejects_zero_connections() {
        let err = Config::from_args(&args(Some("postgres://localhost/gs"), 0)).unwrap_err();
        assert!(err.to_string().contains("max-connections"));
    }
}
