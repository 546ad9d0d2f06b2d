use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;

use crate::dtos::customer::{
    CustomerListParams, CustomerListResponse, CustomerTransactionsResponse,
};
use crate::dtos::transaction::TransactionListParams;
use crate::error::AppError;
use crate::handlers::transaction::TRANSACTIONS;
use crate::models::credit::SIGNED_AMOUNT_SQL;
use crate::models::customer::{CustomerDetail, CustomerRow};
use crate::models::transaction::{TransactionRow, STATUSES};
use crate::query::params::{parse_choice, parse_date_range};
use crate::query::pagination::DEFAULT_LIMIT;
use crate::query::{ListQuery, PageRequest, WhereBuilder, WhereClause};
use crate::services::export::{self, Cell, Sheet, MAX_EXPORT_ROWS};
use crate::state::AppState;

pub(crate) const CUSTOMERS: ListQuery<'static> = ListQuery {
    select: r#"SELECT
            c.id, c.name, c.email, c.phone, c.referral_code,
            c.subscription_status, c.subscription_end_date, c.created_at,
            COALESCE(ts.transaction_count, 0) AS transaction_count,
            COALESCE(ts.total_spent, 0)::FLOAT8 AS total_spent
        FROM customers c
        LEFT JOIN (
            SELECT customer_id,
                COUNT(*) AS transaction_count,
                SUM(amount) FILTER (WHERE status = 'finished' AND currency = 'IDR') AS total_spent
            FROM transactions
            GROUP BY customer_id
        ) ts ON ts.customer_id = c.id"#,
    count: "SELECT COUNT(*) FROM customers c",
    tail: "ORDER BY c.created_at DESC, c.id DESC",
};

fn customer_filter(params: &CustomerListParams) -> Result<WhereClause, AppError> {
    let (start, end) = parse_date_range(params.start_date.as_deref(), params.end_date.as_deref())?;

    let mut filter = WhereBuilder::with_exclusion("c.email");
    filter
        .search(&["c.name", "c.email", "c.phone"], params.search.as_deref())
        .eq_text("c.subscription_status", params.status.as_deref())
        .eq_text("c.referral_code", params.referral_code.as_deref())
        .date_range("c.created_at", start, end);
    Ok(filter.build())
}

pub async fn list_customers(
    State(AppState { db_pool, .. }): State<AppState>,
    Query(params): Query<CustomerListParams>,
) -> Result<Json<CustomerListResponse>, AppError> {
    let filter = customer_filter(&params)?;
    let page = PageRequest::parse(params.page.as_deref(), params.limit.as_deref(), DEFAULT_LIMIT);

    let (customers, meta) = CUSTOMERS
        .fetch_page::<CustomerRow>(&db_pool, &filter, page)
        .await?;

    Ok(Json(CustomerListResponse { customers, meta }))
}

pub async fn get_customer(
    State(AppState { db_pool, .. }): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CustomerDetail>, AppError> {
    let sql = format!(
        r#"SELECT
            c.id, c.name, c.email, c.phone, c.referral_code,
            rp.name AS referral_partner_name,
            c.subscription_status, c.subscription_end_date, c.created_at, c.updated_at,
            (SELECT COUNT(*) FROM transactions t WHERE t.customer_id = c.id) AS transaction_count,
            (SELECT COUNT(*) FROM transactions t
                WHERE t.customer_id = c.id AND t.status = 'finished') AS finished_transaction_count,
            (SELECT COALESCE(SUM(t.amount), 0)::FLOAT8 FROM transactions t
                WHERE t.customer_id = c.id AND t.status = 'finished' AND t.currency = 'IDR') AS total_spent,
            (SELECT COALESCE(SUM({SIGNED_AMOUNT_SQL}), 0)::FLOAT8
                FROM credit_transactions ct WHERE ct.customer_id = c.id) AS credit_balance,
            (SELECT MAX(t.created_at) FROM transactions t WHERE t.customer_id = c.id) AS last_transaction_at
        FROM customers c
        LEFT JOIN referral_partners rp ON rp.referral_code = c.referral_code
        WHERE c.id = $1"#
    );
    let customer = sqlx::query_as::<_, CustomerDetail>(&sql)
        .bind(id)
        .fetch_optional(&db_pool)
        .await?
        .ok_or_else(|| AppError::not_found("Customer not found"))?;

    Ok(Json(customer))
}

pub async fn list_customer_transactions(
    State(AppState { db_pool, .. }): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<TransactionListParams>,
) -> Result<Json<CustomerTransactionsResponse>, AppError> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM customers WHERE id = $1)")
        .bind(id)
        .fetch_one(&db_pool)
        .await?;
    if !exists {
        return Err(AppError::not_found("Customer not found"));
    }

    let status = parse_choice("status", params.status.as_deref(), STATUSES)?;
    let (start, end) = parse_date_range(params.start_date.as_deref(), params.end_date.as_deref())?;
    let mut filter = WhereBuilder::with_exclusion("c.email");
    filter
        .eq_i64("t.customer_id", Some(id))
        .eq_text("t.status", status)
        .date_range("t.created_at", start, end);
    let filter = filter.build();
    let page = PageRequest::parse(params.page.as_deref(), params.limit.as_deref(), DEFAULT_LIMIT);

    let (transactions, meta) = TRANSACTIONS
        .fetch_page::<TransactionRow>(&db_pool, &filter, page)
        .await?;

    Ok(Json(CustomerTransactionsResponse {
        customer_id: id,
        transactions,
        meta,
    }))
}

pub async fn export_customers(
    State(AppState { db_pool, .. }): State<AppState>,
    Query(params): Query<CustomerListParams>,
) -> Result<Response, AppError> {
    let filter = customer_filter(&params)?;
    let rows = CUSTOMERS
        .fetch_all::<CustomerRow>(&db_pool, &filter, MAX_EXPORT_ROWS)
        .await?;
    tracing::info!(rows = rows.len(), "Exporting customers");

    let sheet = Sheet {
        name: "Customers",
        headers: &[
            "ID", "Name", "Email", "Phone", "Referral Code", "Subscription", "Transactions",
            "Total Spent", "Joined At",
        ],
        rows: rows
            .into_iter()
            .map(|c| {
                vec![
                    Cell::from(c.id),
                    c.name.into(),
                    c.email.into(),
                    c.phone.into(),
                    c.referral_code.into(),
                    c.subscription_status.into(),
                    c.transaction_count.into(),
                    c.total_spent.into(),
                    c.created_at.to_rfc3339().into(),
                ]
            })
            .collect(),
    };

    Ok(export::attachment("customers", export::to_xlsx(&sheet)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_and_page_queries_agree_on_filter() {
        let params = CustomerListParams {
            search: Some("gmail".into()),
            referral_code: Some("AYU10".into()),
            ..Default::default()
        };
        let filter = customer_filter(&params).unwrap();
        let count_sql = CUSTOMERS.count_sql(&filter);
        let data_sql = CUSTOMERS.data_sql(&filter);
        assert!(count_sql.ends_with(filter.sql()));
        assert!(data_sql.contains(filter.sql()));
        assert!(data_sql.ends_with("LIMIT $3 OFFSET $4"));
    }

    #[test]
    fn excluded_emails_are_filtered_even_without_params() {
        let filter = customer_filter(&CustomerListParams::default()).unwrap();
        assert!(filter.sql().contains("excluded_emails"));
    }

    #[test]
    fn bad_dates_are_validation_errors() {
        let params = CustomerListParams {
            start_date: Some("yesterday".into()),
            ..Default::default()
        };
        assert!(matches!(customer_filter(&params), Err(AppError::ValidationError(_))));
    }
}
