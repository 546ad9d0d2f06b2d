// src/database.rs
use std::str::FromStr;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};

use crate::config::Config;

pub fn connect_options(database_url: &str, ssl: bool) -> Result<PgConnectOptions, sqlx::Error> {
    let mode = if ssl { PgSslMode::Require } else { PgSslMode::Prefer };
    Ok(PgConnectOptions::from_str(database_url)?.ssl_mode(mode))
}

pub async fn create_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    let options = connect_options(&config.database_url, config.database_ssl)?;
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect_with(options)
        .await?;

    if config.run_migrations {
        tracing::info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssl_toggle_sets_require_mode() {
        let opts = connect_options("postgres://user:pw@localhost:5432/growth", true).unwrap();
        assert!(matches!(opts.get_ssl_mode(), PgSslMode::Require));
        let opts = connect_options("postgres://user:pw@localhost:5432/growth", false).unwrap();
        assert!(matches!(opts.get_ssl_mode(), PgSslMode::Prefer));
    }
}
