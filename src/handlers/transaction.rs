use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use chrono::{Days, Utc};

use crate::dtos::transaction::{
    DailySummaryResponse, DateRangeParams, TransactionListParams, TransactionListResponse,
    TransactionResponse,
};
use crate::error::AppError;
use crate::models::stats::DailySummaryRow;
use crate::models::transaction::{TransactionDetailRow, TransactionRow, STATUSES};
use crate::query::params::{parse_choice, parse_date_range, parse_id};
use crate::query::pagination::DEFAULT_LIMIT;
use crate::query::{ListQuery, PageRequest, WhereBuilder, WhereClause};
use crate::services::export::{self, Cell, Sheet, MAX_EXPORT_ROWS};
use crate::state::AppState;

pub(crate) const TRANSACTIONS: ListQuery<'static> = ListQuery {
    select: r#"SELECT
            t.guid, t.customer_id,
            c.name AS customer_name,
            c.email AS customer_email,
            t.status,
            (t.amount)::FLOAT8 AS amount,
            t.currency, t.payment_channel, t.referral_code,
            t.created_at, t.updated_at
        FROM transactions t
        LEFT JOIN customers c ON c.id = t.customer_id"#,
    count: "SELECT COUNT(*) FROM transactions t LEFT JOIN customers c ON c.id = t.customer_id",
    tail: "ORDER BY t.created_at DESC, t.guid DESC",
};

/// Filters shared by the transaction listing and its export.
fn transaction_filter(params: &TransactionListParams) -> Result<WhereClause, AppError> {
    let status = parse_choice("status", params.status.as_deref(), STATUSES)?;
    let customer_id = parse_id("customer_id", params.customer_id.as_deref())?;
    let (start, end) = parse_date_range(params.start_date.as_deref(), params.end_date.as_deref())?;

    let mut filter = WhereBuilder::with_exclusion("c.email");
    filter
        .search(&["t.guid", "c.name", "c.email"], params.search.as_deref())
        .eq_text("t.status", status)
        .eq_text_ci("t.payment_channel", params.payment_channel.as_deref())
        .eq_text("t.referral_code", params.referral_code.as_deref())
        .eq_i64("t.customer_id", customer_id)
        .date_range("t.created_at", start, end);
    Ok(filter.build())
}

pub async fn list_transactions(
    State(AppState { db_pool, .. }): State<AppState>,
    Query(params): Query<TransactionListParams>,
) -> Result<Json<TransactionListResponse>, AppError> {
    let filter = transaction_filter(&params)?;
    let page = PageRequest::parse(params.page.as_deref(), params.limit.as_deref(), DEFAULT_LIMIT);

    let (transactions, meta) = TRANSACTIONS
        .fetch_page::<TransactionRow>(&db_pool, &filter, page)
        .await?;

    Ok(Json(TransactionListResponse { transactions, meta }))
}

pub async fn get_transaction(
    State(AppState { db_pool, .. }): State<AppState>,
    Path(guid): Path<String>,
) -> Result<Json<TransactionResponse>, AppError> {
    let header_sql = format!("{} WHERE t.guid = $1", TRANSACTIONS.select);
    let header = sqlx::query_as::<_, TransactionRow>(&header_sql)
        .bind(&guid)
        .fetch_optional(&db_pool);

    let details = sqlx::query_as::<_, TransactionDetailRow>(
        r#"SELECT id, item_name, quantity,
            (unit_price)::FLOAT8 AS unit_price,
            (quantity * unit_price)::FLOAT8 AS line_total
        FROM transaction_details
        WHERE transaction_guid = $1
        ORDER BY id"#,
    )
    .bind(&guid)
    .fetch_all(&db_pool);

    let (header, details) = tokio::try_join!(header, details)?;
    let transaction = header.ok_or_else(|| AppError::not_found("Transaction not found"))?;
    let details_total = details.iter().map(|d| d.line_total).sum();

    Ok(Json(TransactionResponse {
        transaction,
        details,
        details_total,
    }))
}

pub async fn daily_summary(
    State(AppState { db_pool, .. }): State<AppState>,
    Query(params): Query<DateRangeParams>,
) -> Result<Json<DailySummaryResponse>, AppError> {
    let (start, end) = parse_date_range(params.start_date.as_deref(), params.end_date.as_deref())?;
    // Default window: the last 30 days.
    let start = match (start, end) {
        (None, None) => Utc::now().date_naive().checked_sub_days(Days::new(29)),
        _ => start,
    };

    let mut filter = WhereBuilder::with_exclusion("c.email");
    filter.date_range("t.created_at", start, end);
    let filter = filter.build();

    let sql = format!(
        r#"SELECT
            DATE(t.created_at) AS day,
            COUNT(*) AS transaction_count,
            COUNT(*) FILTER (WHERE t.status = 'finished') AS finished_count,
            COALESCE(SUM(t.amount) FILTER (WHERE t.status = 'finished' AND t.currency = 'IDR'), 0)::FLOAT8 AS revenue,
            COUNT(DISTINCT t.customer_id) FILTER (WHERE t.status = 'finished') AS paying_customers
        FROM transactions t
        LEFT JOIN customers c ON c.id = t.customer_id{}
        GROUP BY DATE(t.created_at)
        ORDER BY day ASC"#,
        filter.sql()
    );

    let days = filter
        .bind_as(sqlx::query_as::<_, DailySummaryRow>(&sql))
        .fetch_all(&db_pool)
        .await?;

    let total_transactions = days.iter().map(|d| d.transaction_count).sum();
    let total_revenue = days.iter().map(|d| d.revenue).sum();

    Ok(Json(DailySummaryResponse {
        start_date: start,
        end_date: end,
        days,
        total_transactions,
        total_revenue,
    }))
}

pub async fn export_transactions(
    State(AppState { db_pool, .. }): State<AppState>,
    Query(params): Query<TransactionListParams>,
) -> Result<Response, AppError> {
    let filter = transaction_filter(&params)?;
    let rows = TRANSACTIONS
        .fetch_all::<TransactionRow>(&db_pool, &filter, MAX_EXPORT_ROWS)
        .await?;
    tracing::info!(rows = rows.len(), "Exporting transactions");

    let sheet = Sheet {
        name: "Transactions",
        headers: &[
            "GUID", "Customer ID", "Customer", "Email", "Status", "Amount", "Currency",
            "Payment Channel", "Referral Code", "Created At",
        ],
        rows: rows
            .into_iter()
            .map(|t| {
                vec![
                    Cell::from(t.guid),
                    t.customer_id.into(),
                    t.customer_name.into(),
                    t.customer_email.into(),
                    t.status.into(),
                    t.amount.into(),
                    t.currency.into(),
                    t.payment_channel.into(),
                    t.referral_code.into(),
                    t.created_at.to_rfc3339().into(),
                ]
            })
            .collect(),
    };

    Ok(export::attachment("transactions", export::to_xlsx(&sheet)?))
}
