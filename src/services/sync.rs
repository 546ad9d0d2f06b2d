//! Incremental sync from the upstream payments API into local tables.
//!
//! Pages are requested until a short page comes back or the page ceiling is
//! reached. Every record is upserted by primary key, so overlapping runs are
//! idempotent. Failed records are counted and skipped; nothing is rolled back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::AppError;
use crate::services::upstream::UpstreamClient;

pub const PAGE_SIZE: u32 = 100;
pub const MAX_PAGES: u32 = 200;

#[derive(Debug, Clone, Copy)]
pub struct PagingLimits {
    pub page_size: u32,
    pub max_pages: u32,
}

impl Default for PagingLimits {
    fn default() -> Self {
        PagingLimits {
            page_size: PAGE_SIZE,
            max_pages: MAX_PAGES,
        }
    }
}

#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Send + Sync;

    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Vec<Self::Item>, AppError>;
}

#[async_trait]
pub trait RecordSink<T: Sync>: Send + Sync {
    /// Inserts or overwrites one record, keyed by its primary key.
    async fn upsert(&self, record: &T) -> Result<(), AppError>;
}

#[derive(Debug, Default, Clone, Serialize, PartialEq, Eq)]
pub struct SyncOutcome {
    pub pages_fetched: u32,
    pub records_fetched: u64,
    pub upserted: u64,
    pub failed: u64,
    pub hit_page_ceiling: bool,
}

pub async fn run_paged_sync<S, K>(
    source: &S,
    sink: &K,
    limits: PagingLimits,
) -> Result<SyncOutcome, AppError>
where
    S: PageSource,
    K: RecordSink<S::Item>,
{
    let mut outcome = SyncOutcome::default();
    let mut page = 1;

    loop {
        if page > limits.max_pages {
            tracing::warn!(max_pages = limits.max_pages, "Sync stopped at page ceiling");
            outcome.hit_page_ceiling = true;
            break;
        }

        let records = source.fetch_page(page, limits.page_size).await?;
        outcome.pages_fetched += 1;
        outcome.records_fetched += records.len() as u64;

        for record in &records {
            match sink.upsert(record).await {
                Ok(()) => outcome.upserted += 1,
                Err(e) => {
                    tracing::warn!(page, error = %e, "Failed to upsert synced record");
                    outcome.failed += 1;
                }
            }
        }

        if (records.len() as u32) < limits.page_size {
            break;
        }
        page += 1;
    }

    Ok(outcome)
}

// ==================== Upstream records ====================

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamTransaction {
    pub guid: String,
    pub customer_id: Option<i64>,
    pub status: String,
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub payment_channel: Option<String>,
    pub referral_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub details: Vec<UpstreamTransactionDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamTransactionDetail {
    pub item_name: String,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    pub unit_price: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamCustomer {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub referral_code: Option<String>,
    pub subscription_status: Option<String>,
    pub subscription_end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_currency() -> String {
    "IDR".to_string()
}

fn default_quantity() -> i32 {
    1
}

/// Upstream sends "" for customers without a referral code.
fn normalize_code(code: Option<&str>) -> Option<String> {
    code.map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

// ==================== Sources ====================

pub struct UpstreamPages<'a, T> {
    client: &'a UpstreamClient,
    resource: &'static str,
    since: Option<DateTime<Utc>>,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<'a, T> UpstreamPages<'a, T> {
    pub fn new(client: &'a UpstreamClient, resource: &'static str, since: Option<DateTime<Utc>>) -> Self {
        Self {
            client,
            resource,
            since,
            _marker: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<T> PageSource for UpstreamPages<'_, T>
where
    T: serde::de::DeserializeOwned + Send + Sync,
{
    type Item = T;

    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Vec<T>, AppError> {
        self.client
            .fetch_page(self.resource, page, page_size, self.since)
            .await
    }
}

// ==================== Postgres sinks ====================

pub struct PgTransactionSink<'a> {
    pub pool: &'a PgPool,
}

#[async_trait]
impl RecordSink<UpstreamTransaction> for PgTransactionSink<'_> {
    async fn upsert(&self, t: &UpstreamTransaction) -> Result<(), AppError> {
        if t.guid.trim().is_empty() {
            return Err(AppError::validation("Transaction without guid"));
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO transactions
                (guid, customer_id, status, amount, currency, payment_channel, referral_code, created_at, updated_at)
            VALUES ($1, $2, $3, $4::FLOAT8, $5, $6, $7, $8, $9)
            ON CONFLICT (guid) DO UPDATE SET
                customer_id = EXCLUDED.customer_id,
                status = EXCLUDED.status,
                amount = EXCLUDED.amount,
                currency = EXCLUDED.currency,
                payment_channel = EXCLUDED.payment_channel,
                referral_code = EXCLUDED.referral_code,
                updated_at = EXCLUDED.updated_at"#,
        )
        .bind(&t.guid)
        .bind(t.customer_id)
        .bind(t.status.to_lowercase())
        .bind(t.amount)
        .bind(t.currency.to_uppercase())
        .bind(&t.payment_channel)
        .bind(normalize_code(t.referral_code.as_deref()))
        .bind(t.created_at)
        .bind(t.updated_at)
        .execute(&mut *tx)
        .await?;

        for d in &t.details {
            sqlx::query(
                r#"INSERT INTO transaction_details (transaction_guid, item_name, quantity, unit_price)
                VALUES ($1, $2, $3, $4::FLOAT8)
                ON CONFLICT (transaction_guid, item_name) DO UPDATE SET
                    quantity = EXCLUDED.quantity,
                    unit_price = EXCLUDED.unit_price"#,
            )
            .bind(&t.guid)
            .bind(&d.item_name)
            .bind(d.quantity)
            .bind(d.unit_price)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

pub struct PgCustomerSink<'a> {
    pub pool: &'a PgPool,
}

#[async_trait]
impl RecordSink<UpstreamCustomer> for PgCustomerSink<'_> {
    async fn upsert(&self, c: &UpstreamCustomer) -> Result<(), AppError> {
        sqlx::query(
            r#"INSERT INTO customers
                (id, name, email, phone, referral_code, subscription_status, subscription_end_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                email = EXCLUDED.email,
                phone = EXCLUDED.phone,
                referral_code = EXCLUDED.referral_code,
                subscription_status = EXCLUDED.subscription_status,
                subscription_end_date = EXCLUDED.subscription_end_date,
                updated_at = EXCLUDED.updated_at"#,
        )
        .bind(c.id)
        .bind(c.name.trim())
        .bind(c.email.trim())
        .bind(&c.phone)
        .bind(normalize_code(c.referral_code.as_deref()))
        .bind(c.subscription_status.as_deref().unwrap_or("none"))
        .bind(c.subscription_end_date)
        .bind(c.created_at)
        .bind(c.updated_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}

// ==================== Entry points ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncSource {
    Transactions,
    Customers,
}

impl SyncSource {
    fn high_water_sql(self) -> &'static str {
        match self {
            SyncSource::Transactions => "SELECT MAX(updated_at) FROM transactions",
            SyncSource::Customers => "SELECT MAX(updated_at) FROM customers",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SyncReport {
    pub source: SyncSource,
    pub since: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub outcome: SyncOutcome,
    pub high_water_mark: Option<DateTime<Utc>>,
}

pub async fn high_water_mark(
    pool: &PgPool,
    source: SyncSource,
) -> Result<Option<DateTime<Utc>>, AppError> {
    let mark = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(source.high_water_sql())
        .fetch_one(pool)
        .await?;
    Ok(mark)
}

/// Syncs one source. `since` overrides the stored high-water mark.
pub async fn sync_source(
    pool: &PgPool,
    client: &UpstreamClient,
    source: SyncSource,
    since: Option<DateTime<Utc>>,
) -> Result<SyncReport, AppError> {
    let since = match since {
        Some(s) => Some(s),
        None => high_water_mark(pool, source).await?,
    };
    tracing::info!(?source, ?since, "Starting upstream sync");

    let limits = PagingLimits::default();
    let outcome = match source {
        SyncSource::Transactions => {
            let pages = UpstreamPages::<UpstreamTransaction>::new(client, "transactions", since);
            run_paged_sync(&pages, &PgTransactionSink { pool }, limits).await?
        }
        SyncSource::Customers => {
            let pages = UpstreamPages::<UpstreamCustomer>::new(client, "customers", since);
            run_paged_sync(&pages, &PgCustomerSink { pool }, limits).await?
        }
    };

    let high_water_mark = high_water_mark(pool, source).await?;
    tracing::info!(
        ?source,
        pages = outcome.pages_fetched,
        fetched = outcome.records_fetched,
        upserted = outcome.upserted,
        failed = outcome.failed,
        "Upstream sync finished"
    );

    Ok(SyncReport {
        source,
        since,
        outcome,
        high_water_mark,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use crate::test_support::TestDb;

    /// Serves `total` sequential ids, `page_size` at a time.
    struct CountingSource {
        total: u32,
        start: u32,
        calls: AtomicU32,
    }

    impl CountingSource {
        fn new(total: u32) -> Self {
            Self { total, start: 0, calls: AtomicU32::new(0) }
        }
    }

    #[async_trait]
    impl PageSource for CountingSource {
        type Item = (u32, String);

        async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Vec<(u32, String)>, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let first = self.start + (page - 1) * page_size;
            let last = (first + page_size).min(self.start + self.total);
            Ok((first..last).map(|id| (id, format!("v{page}"))).collect())
        }
    }

    #[derive(Default)]
    struct MapSink {
        rows: Mutex<HashMap<u32, String>>,
        reject: Option<u32>,
    }

    #[async_trait]
    impl RecordSink<(u32, String)> for MapSink {
        async fn upsert(&self, record: &(u32, String)) -> Result<(), AppError> {
            if self.reject == Some(record.0) {
                return Err(AppError::validation("rejected"));
            }
            self.rows.lock().unwrap().insert(record.0, record.1.clone());
            Ok(())
        }
    }

    fn limits(page_size: u32, max_pages: u32) -> PagingLimits {
        PagingLimits { page_size, max_pages }
    }

    #[tokio::test]
    async fn short_page_ends_the_sync() {
        let source = CountingSource::new(25);
        let sink = MapSink::default();
        let outcome = run_paged_sync(&source, &sink, limits(10, 50)).await.unwrap();
        assert_eq!(outcome.pages_fetched, 3);
        assert_eq!(outcome.records_fetched, 25);
        assert_eq!(outcome.upserted, 25);
        assert!(!outcome.hit_page_ceiling);
    }

    #[tokio::test]
    async fn exact_multiple_needs_one_empty_page() {
        let source = CountingSource::new(20);
        let sink = MapSink::default();
        let outcome = run_paged_sync(&source, &sink, limits(10, 50)).await.unwrap();
        assert_eq!(outcome.pages_fetched, 3);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.records_fetched, 20);
    }

    #[tokio::test]
    async fn page_ceiling_bounds_the_loop() {
        let source = CountingSource::new(u32::MAX / 2);
        let sink = MapSink::default();
        let outcome = run_paged_sync(&source, &sink, limits(5, 4)).await.unwrap();
        assert_eq!(outcome.pages_fetched, 4);
        assert_eq!(outcome.records_fetched, 20);
        assert!(outcome.hit_page_ceiling);
    }

    #[tokio::test]
    async fn failed_records_are_counted_not_fatal() {
        let source = CountingSource::new(7);
        let sink = MapSink { reject: Some(3), ..MapSink::default() };
        let outcome = run_paged_sync(&source, &sink, limits(10, 5)).await.unwrap();
        assert_eq!(outcome.upserted, 6);
        assert_eq!(outcome.failed, 1);
        assert_eq!(sink.rows.lock().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn overlapping_runs_do_not_duplicate() {
        let sink = MapSink::default();
        let first = CountingSource::new(15);
        run_paged_sync(&first, &sink, limits(10, 5)).await.unwrap();

        let overlapping = CountingSource { total: 15, start: 10, calls: AtomicU32::new(0) };
        run_paged_sync(&overlapping, &sink, limits(10, 5)).await.unwrap();

        assert_eq!(sink.rows.lock().unwrap().len(), 25);
    }

    #[test]
    fn referral_codes_are_normalized() {
        assert_eq!(normalize_code(Some("  ")), None);
        assert_eq!(normalize_code(None), None);
        assert_eq!(normalize_code(Some(" AYU10 ")), Some("AYU10".to_string()));
    }

    #[test]
    fn upstream_transaction_defaults() {
        let t: UpstreamTransaction = serde_json::from_value(serde_json::json!({
            "guid": "trx-1",
            "customer_id": 7,
            "status": "FINISHED",
            "amount": 150000.0,
            "created_at": "2026-01-02T03:04:05Z",
            "updated_at": "2026-01-02T03:04:05Z",
            "details": [{"item_name": "Pro plan", "unit_price": 150000.0}]
        }))
        .unwrap();
        assert_eq!(t.currency, "IDR");
        assert_eq!(t.details[0].quantity, 1);
        assert!(t.payment_channel.is_none());
    }

    // ==================== Postgres sinks ====================

    /// Serves fixed pages; anything past the last page is empty.
    struct FixedPages(Vec<Vec<UpstreamTransaction>>);

    #[async_trait]
    impl PageSource for FixedPages {
        type Item = UpstreamTransaction;

        async fn fetch_page(&self, page: u32, _page_size: u32) -> Result<Vec<UpstreamTransaction>, AppError> {
            Ok(self.0.get(page as usize - 1).cloned().unwrap_or_default())
        }
    }

    fn upstream_transaction(guid: &str, customer_id: i64, status: &str) -> UpstreamTransaction {
        let at = DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z").unwrap().with_timezone(&Utc);
        UpstreamTransaction {
            guid: guid.to_string(),
            customer_id: Some(customer_id),
            status: status.to_string(),
            amount: 150_000.0,
            currency: "idr".to_string(),
            payment_channel: Some("qris".to_string()),
            referral_code: Some(" ".to_string()),
            created_at: at,
            updated_at: at,
            details: vec![
                UpstreamTransactionDetail { item_name: "Pro plan".into(), quantity: 1, unit_price: 100_000.0 },
                UpstreamTransactionDetail { item_name: "Add-on".into(), quantity: 2, unit_price: 25_000.0 },
            ],
        }
    }

    #[tokio::test]
    async fn transaction_for_unsynced_customer_is_stored() {
        let db = TestDb::start().await;
        let sink = PgTransactionSink { pool: &db.pool };
        let source = FixedPages(vec![vec![upstream_transaction("trx-orphan", 42, "PENDING")]]);

        let outcome = run_paged_sync(&source, &sink, limits(10, 5)).await.unwrap();
        assert_eq!(outcome.upserted, 1);
        assert_eq!(outcome.failed, 0);
        assert_eq!(db.count("transactions").await, 1);
        assert_eq!(db.count("transaction_details").await, 2);

        let (customer_id, currency, referral_code): (Option<i64>, String, Option<String>) =
            sqlx::query_as("SELECT customer_id, currency, referral_code FROM transactions WHERE guid = 'trx-orphan'")
                .fetch_one(&db.pool)
                .await
                .unwrap();
        assert_eq!(customer_id, Some(42));
        assert_eq!(currency, "IDR");
        assert_eq!(referral_code, None);
    }

    #[tokio::test]
    async fn rerunning_overlapping_pages_keeps_one_row_per_guid() {
        let db = TestDb::start().await;
        let sink = PgTransactionSink { pool: &db.pool };

        let first = FixedPages(vec![vec![
            upstream_transaction("trx-1", 1, "pending"),
            upstream_transaction("trx-2", 2, "pending"),
        ]]);
        run_paged_sync(&first, &sink, limits(10, 5)).await.unwrap();

        let mut finished = upstream_transaction("trx-2", 2, "FINISHED");
        finished.details[0].quantity = 3;
        let second = FixedPages(vec![vec![finished, upstream_transaction("trx-3", 3, "pending")]]);
        let outcome = run_paged_sync(&second, &sink, limits(10, 5)).await.unwrap();
        assert_eq!(outcome.failed, 0);

        assert_eq!(db.count("transactions").await, 3);
        assert_eq!(db.count("transaction_details").await, 6);

        let status: String = sqlx::query_scalar("SELECT status FROM transactions WHERE guid = 'trx-2'")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(status, "finished");
        let quantity: i32 = sqlx::query_scalar(
            "SELECT quantity FROM transaction_details WHERE transaction_guid = 'trx-2' AND item_name = 'Pro plan'",
        )
        .fetch_one(&db.pool)
        .await
        .unwrap();
        assert_eq!(quantity, 3);
    }

    #[tokio::test]
    async fn transaction_without_guid_fails_alone() {
        let db = TestDb::start().await;
        let sink = PgTransactionSink { pool: &db.pool };
        let source = FixedPages(vec![vec![
            upstream_transaction(" ", 1, "pending"),
            upstream_transaction("trx-ok", 1, "pending"),
        ]]);

        let outcome = run_paged_sync(&source, &sink, limits(10, 5)).await.unwrap();
        assert_eq!(outcome.upserted, 1);
        assert_eq!(outcome.failed, 1);
        assert_eq!(db.count("transactions").await, 1);
    }
}
