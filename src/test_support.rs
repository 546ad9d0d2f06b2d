//! Throwaway Postgres for tests that need the real schema.
//!
//! Each [`TestDb`] owns its own container, migrated from `./migrations`.
//! The container is removed when the value is dropped.

use sqlx::postgres::{PgPool, PgPoolOptions};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;

pub struct TestDb {
    pub pool: PgPool,
    _container: ContainerAsync<Postgres>,
}

impl TestDb {
    pub async fn start() -> Self {
        let container = Postgres::default()
            .with_tag("15-alpine")
            .start()
            .await
            .expect("postgres container should start");
        let host = container.get_host().await.expect("container host");
        let port = container
            .get_host_port_ipv4(5432)
            .await
            .expect("container port");
        let url = format!("postgres://postgres:postgres@{host}:{port}/postgres");

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .expect("connect to test database");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("migrations apply");

        Self {
            pool,
            _container: container,
        }
    }

    pub async fn customer(&self, id: i64, email: &str, referral_code: Option<&str>) {
        sqlx::query(
            "INSERT INTO customers (id, name, email, referral_code) VALUES ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind(format!("Customer {id}"))
        .bind(email)
        .bind(referral_code)
        .execute(&self.pool)
        .await
        .expect("insert customer");
    }

    pub async fn transaction(&self, guid: &str, customer_id: i64, status: &str, amount: f64) {
        sqlx::query(
            "INSERT INTO transactions (guid, customer_id, status, amount) VALUES ($1, $2, $3, $4::FLOAT8)",
        )
        .bind(guid)
        .bind(customer_id)
        .bind(status)
        .bind(amount)
        .execute(&self.pool)
        .await
        .expect("insert transaction");
    }

    pub async fn credit(&self, customer_id: i64, transaction_type: &str, amount: f64) {
        sqlx::query(
            "INSERT INTO credit_transactions (customer_id, amount, transaction_type) VALUES ($1, $2, $3)",
        )
        .bind(customer_id)
        .bind(amount)
        .bind(transaction_type)
        .execute(&self.pool)
        .await
        .expect("insert credit transaction");
    }

    pub async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await
            .expect("count rows")
    }
}
