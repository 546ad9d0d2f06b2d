use axum::extract::{Query, State};
use axum::Json;

use crate::dtos::credit::{CreditSummaryParams, CreditSummaryResponse};
use crate::error::AppError;
use crate::models::credit::{CreditSummaryRow, SIGNED_AMOUNT_SQL, TRANSACTION_TYPES};
use crate::query::params::{parse_choice, parse_date_range, parse_id};
use crate::query::{WhereBuilder, WhereClause};
use crate::state::AppState;

fn credit_filter(params: &CreditSummaryParams) -> Result<WhereClause, AppError> {
    let transaction_type = parse_choice(
        "transaction_type",
        params.transaction_type.as_deref(),
        TRANSACTION_TYPES,
    )?;
    let customer_id = parse_id("customer_id", params.customer_id.as_deref())?;
    let (start, end) = parse_date_range(params.start_date.as_deref(), params.end_date.as_deref())?;

    let mut filter = WhereBuilder::with_exclusion("c.email");
    filter
        .eq_text("ct.transaction_type", transaction_type)
        .eq_i64("ct.customer_id", customer_id)
        .date_range("ct.created_at", start, end);
    Ok(filter.build())
}

/// Credit movements per day and type, signed the same way as a customer's credit balance.
pub async fn credit_summary(
    State(AppState { db_pool, .. }): State<AppState>,
    Query(params): Query<CreditSummaryParams>,
) -> Result<Json<CreditSummaryResponse>, AppError> {
    let filter = credit_filter(&params)?;

    let sql = format!(
        r#"SELECT
            DATE(ct.created_at) AS day,
            ct.transaction_type,
            COUNT(*) AS transaction_count,
            COALESCE(SUM({SIGNED_AMOUNT_SQL}), 0)::FLOAT8 AS total_amount
        FROM credit_transactions ct
        LEFT JOIN customers c ON c.id = ct.customer_id{}
        GROUP BY DATE(ct.created_at), ct.transaction_type
        ORDER BY day DESC, ct.transaction_type ASC"#,
        filter.sql(),
    );

    let rows = filter
        .bind_as(sqlx::query_as::<_, CreditSummaryRow>(&sql))
        .fetch_all(&db_pool)
        .await?;

    let total_amount = rows.iter().map(|r| r.total_amount).sum();
    let total_count = rows.iter().map(|r| r.transaction_count).sum();

    Ok(Json(CreditSummaryResponse {
        rows,
        total_amount,
        total_count,
    }))
}
