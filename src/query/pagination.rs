use serde::Serialize;
use sqlx::{postgres::PgRow, FromRow, PgPool};

use super::filter::WhereClause;

pub const DEFAULT_LIMIT: i64 = 50;
pub const EVENT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    /// Non-numeric, missing or non-positive values fall back to page 1 and `default_limit`.
    pub fn parse(page: Option<&str>, limit: Option<&str>, default_limit: i64) -> Self {
        let page = page
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);
        let limit = limit
            .and_then(|l| l.trim().parse::<i64>().ok())
            .filter(|l| *l >= 1)
            .unwrap_or(default_limit)
            .min(MAX_LIMIT);
        PageRequest { page, limit }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn total_pages(&self, total_count: i64) -> i64 {
        if total_count <= 0 {
            0
        } else {
            (total_count + self.limit - 1) / self.limit
        }
    }

    pub fn meta(&self, total_count: i64) -> PageMeta {
        PageMeta {
            total_count,
            page: self.page,
            limit: self.limit,
            total_pages: self.total_pages(total_count),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PageMeta {
    pub total_count: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

/// SQL pieces of one listing. The WHERE clause goes between `from` and `tail`.
pub struct ListQuery<'a> {
    /// `SELECT ... FROM ... JOIN ...`
    pub select: &'a str,
    /// `SELECT COUNT(...) FROM ... JOIN ...`
    pub count: &'a str,
    /// `GROUP BY ... ORDER BY ...`
    pub tail: &'a str,
}

impl ListQuery<'_> {
    pub fn data_sql(&self, filter: &WhereClause) -> String {
        format!(
            "{}{} {}{}",
            self.select,
            filter.sql(),
            self.tail,
            filter.limit_offset_sql()
        )
    }

    pub fn count_sql(&self, filter: &WhereClause) -> String {
        format!("{}{}", self.count, filter.sql())
    }

    /// Runs the count and the page query concurrently over the same filter.
    pub async fn fetch_page<T>(
        &self,
        pool: &PgPool,
        filter: &WhereClause,
        page: PageRequest,
    ) -> Result<(Vec<T>, PageMeta), sqlx::Error>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let count_sql = self.count_sql(filter);
        let data_sql = self.data_sql(filter);

        let count_query = filter.bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql));
        let data_query = filter
            .bind_as(sqlx::query_as::<_, T>(&data_sql))
            .bind(page.limit)
            .bind(page.offset());

        let (total_count, rows) =
            tokio::try_join!(count_query.fetch_one(pool), data_query.fetch_all(pool))?;

        Ok((rows, page.meta(total_count)))
    }

    /// Unpaginated fetch for exports, capped at `max_rows`.
    pub async fn fetch_all<T>(
        &self,
        pool: &PgPool,
        filter: &WhereClause,
        max_rows: i64,
    ) -> Result<Vec<T>, sqlx::Error>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let data_sql = self.data_sql(filter);
        filter
            .bind_as(sqlx::query_as::<_, T>(&data_sql))
            .bind(max_rows)
            .bind(0_i64)
            .fetch_all(pool)
            .await
    }
}
