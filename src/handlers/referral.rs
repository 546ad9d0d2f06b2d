use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::dtos::customer::CustomerListParams;
use crate::dtos::referral::{
    CreateReferralPartnerRequest, ReferralPartnerListParams, ReferralPartnerListResponse,
    ReferralStatsParams, ReferralStatsResponse, ReferredCustomersResponse,
    UpdateReferralPartnerRequest,
};
use crate::error::AppError;
use crate::handlers::customer::CUSTOMERS;
use crate::models::customer::CustomerRow;
use crate::models::referral::{ReferralPartner, ReferralStat};
use crate::query::params::parse_date_range;
use crate::query::pagination::DEFAULT_LIMIT;
use crate::query::{ListQuery, PageRequest, WhereBuilder, WhereClause};
use crate::state::AppState;

const REFERRAL_STATS: ListQuery<'static> = ListQuery {
    select: r#"SELECT
            c.referral_code,
            rp.id AS partner_id,
            rp.name AS partner_name,
            COUNT(DISTINCT c.id) AS user_count,
            COUNT(DISTINCT c.id) FILTER (WHERE ts.finished_count > 0) AS paying_user_count,
            COALESCE(SUM(ts.finished_count), 0)::BIGINT AS finished_transactions,
            COALESCE(SUM(ts.revenue), 0)::FLOAT8 AS revenue,
            (COALESCE(SUM(ts.revenue), 0)::FLOAT8 * COALESCE(rp.commission_rate, 0))::FLOAT8 AS commission
        FROM customers c
        LEFT JOIN referral_partners rp ON rp.referral_code = c.referral_code
        LEFT JOIN (
            SELECT customer_id, COUNT(*) AS finished_count, SUM(amount) AS revenue
            FROM transactions
            WHERE status = 'finished' AND currency = 'IDR'
            GROUP BY customer_id
        ) ts ON ts.customer_id = c.id"#,
    count: r#"SELECT COUNT(DISTINCT c.referral_code)
        FROM customers c
        LEFT JOIN referral_partners rp ON rp.referral_code = c.referral_code"#,
    tail: "GROUP BY c.referral_code, rp.id, rp.name ORDER BY user_count DESC, c.referral_code ASC",
};

const REFERRED_CUSTOMERS_SQL: &str = r#"SELECT COUNT(DISTINCT c.id)
        FROM customers c
        LEFT JOIN referral_partners rp ON rp.referral_code = c.referral_code"#;

fn referral_filter(params: &ReferralStatsParams) -> Result<WhereClause, AppError> {
    let (start, end) = parse_date_range(params.start_date.as_deref(), params.end_date.as_deref())?;

    let mut filter = WhereBuilder::with_exclusion("c.email");
    filter
        .not_null("c.referral_code")
        .search(&["c.referral_code", "rp.name"], params.search.as_deref())
        .date_range("c.created_at", start, end);
    Ok(filter.build())
}

/// Per-code rollup. `user_count` over all codes sums to `total_referred_customers`.
pub async fn referral_stats(
    State(AppState { db_pool, .. }): State<AppState>,
    Query(params): Query<ReferralStatsParams>,
) -> Result<Json<ReferralStatsResponse>, AppError> {
    let filter = referral_filter(&params)?;
    let page = PageRequest::parse(params.page.as_deref(), params.limit.as_deref(), DEFAULT_LIMIT);

    let total_sql = format!("{}{}", REFERRED_CUSTOMERS_SQL, filter.sql());
    let total = filter
        .bind_scalar(sqlx::query_scalar::<_, i64>(&total_sql))
        .fetch_one(&db_pool);
    let stats = REFERRAL_STATS.fetch_page::<ReferralStat>(&db_pool, &filter, page);

    let (total_referred_customers, (referrals, meta)) = tokio::try_join!(total, stats)?;

    Ok(Json(ReferralStatsResponse {
        referrals,
        total_referred_customers,
        meta,
    }))
}

pub async fn list_referred_customers(
    State(AppState { db_pool, .. }): State<AppState>,
    Path(code): Path<String>,
    Query(params): Query<CustomerListParams>,
) -> Result<Json<ReferredCustomersResponse>, AppError> {
    let code = validate_code(&code)?.to_string();
    let (start, end) = parse_date_range(params.start_date.as_deref(), params.end_date.as_deref())?;
    let mut filter = WhereBuilder::with_exclusion("c.email");
    filter
        .eq_text("c.referral_code", Some(code.as_str()))
        .search(&["c.name", "c.email"], params.search.as_deref())
        .date_range("c.created_at", start, end);
    let filter = filter.build();
    let page = PageRequest::parse(params.page.as_deref(), params.limit.as_deref(), DEFAULT_LIMIT);

    let (customers, meta) = CUSTOMERS
        .fetch_page::<CustomerRow>(&db_pool, &filter, page)
        .await?;

    Ok(Json(ReferredCustomersResponse {
        referral_code: code,
        customers,
        meta,
    }))
}

// ==================== Referral partners ====================

const PARTNER_COLUMNS: &str =
    "id, name, referral_code, email, commission_rate, is_active, created_at";

const REFERRAL_PARTNERS: ListQuery<'static> = ListQuery {
    select: "SELECT id, name, referral_code, email, commission_rate, is_active, created_at FROM referral_partners",
    count: "SELECT COUNT(*) FROM referral_partners",
    tail: "ORDER BY name ASC, id ASC",
};

fn referral_partner_filter(params: &ReferralPartnerListParams) -> WhereClause {
    let mut filter = WhereBuilder::new();
    filter.search(&["name", "referral_code", "email"], params.search.as_deref());
    filter.build()
}

const RESERVED_CODE: &str = "partners";

fn validate_code(code: &str) -> Result<&str, AppError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(AppError::validation("Referral code is required"));
    }
    if code.chars().any(char::is_whitespace) {
        return Err(AppError::validation("Referral code cannot contain spaces"));
    }
    // `/referrals/partners/...` is routed to partner management.
    if code == RESERVED_CODE {
        return Err(AppError::validation("Referral code is reserved"));
    }
    Ok(code)
}

fn validate_commission(rate: Option<f64>) -> Result<(), AppError> {
    if let Some(rate) = rate {
        if !(0.0..=1.0).contains(&rate) {
            return Err(AppError::validation("Commission rate must be between 0 and 1"));
        }
    }
    Ok(())
}

pub async fn list_referral_partners(
    State(AppState { db_pool, .. }): State<AppState>,
    Query(params): Query<ReferralPartnerListParams>,
) -> Result<Json<ReferralPartnerListResponse>, AppError> {
    let filter = referral_partner_filter(&params);
    let page = PageRequest::parse(params.page.as_deref(), params.limit.as_deref(), DEFAULT_LIMIT);

    let (partners, meta) = REFERRAL_PARTNERS
        .fetch_page::<ReferralPartner>(&db_pool, &filter, page)
        .await?;

    Ok(Json(ReferralPartnerListResponse { partners, meta }))
}

pub async fn create_referral_partner(
    State(AppState { db_pool, .. }): State<AppState>,
    Json(req): Json<CreateReferralPartnerRequest>,
) -> Result<(StatusCode, Json<ReferralPartner>), AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::validation("Partner name is required"));
    }
    let code = validate_code(&req.referral_code)?;
    validate_commission(req.commission_rate)?;

    let partner = sqlx::query_as::<_, ReferralPartner>(&format!(
        r#"INSERT INTO referral_partners (name, referral_code, email, commission_rate, is_active)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {PARTNER_COLUMNS}"#
    ))
    .bind(req.name.trim())
    .bind(code)
    .bind(req.email.as_deref().map(str::trim))
    .bind(req.commission_rate.unwrap_or(0.0))
    .bind(req.is_active.unwrap_or(true))
    .fetch_one(&db_pool)
    .await
    .map_err(|e| AppError::unique_violation_or_db(e, "Referral code already exists"))?;

    tracing::info!(code = %partner.referral_code, "Referral partner created");
    Ok((StatusCode::CREATED, Json(partner)))
}

pub async fn update_referral_partner(
    State(AppState { db_pool, .. }): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateReferralPartnerRequest>,
) -> Result<Json<ReferralPartner>, AppError> {
    let code = match req.referral_code.as_deref() {
        Some(c) => Some(validate_code(c)?),
        None => None,
    };
    if let Some(name) = &req.name {
        if name.trim().is_empty() {
            return Err(AppError::validation("Partner name cannot be empty"));
        }
    }
    validate_commission(req.commission_rate)?;

    let partner = sqlx::query_as::<_, ReferralPartner>(&format!(
        r#"UPDATE referral_partners SET
            name = COALESCE($2, name),
            referral_code = COALESCE($3, referral_code),
            email = COALESCE($4, email),
            commission_rate = COALESCE($5, commission_rate),
            is_active = COALESCE($6, is_active)
        WHERE id = $1
        RETURNING {PARTNER_COLUMNS}"#
    ))
    .bind(id)
    .bind(req.name.as_deref().map(str::trim))
    .bind(code)
    .bind(req.email.as_deref().map(str::trim))
    .bind(req.commission_rate)
    .bind(req.is_active)
    .fetch_optional(&db_pool)
    .await
    .map_err(|e| AppError::unique_violation_or_db(e, "Referral code already exists"))?
    .ok_or_else(|| AppError::not_found("Referral partner not found"))?;

    Ok(Json(partner))
}

pub async fn delete_referral_partner(
    State(AppState { db_pool, .. }): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM referral_partners WHERE id = $1")
        .bind(id)
        .execute(&db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Referral partner not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollup_and_total_use_the_same_population() {
        let params = ReferralStatsParams {
            search: Some("ayu".into()),
            start_date: Some("2026-01-01".into()),
            ..Default::default()
        };
        let filter = referral_filter(&params).unwrap();
        assert!(filter.sql().starts_with(" WHERE c.referral_code IS NOT NULL"));
        assert!(filter.sql().contains("excluded_emails"));

        let total_sql = format!("{}{}", REFERRED_CUSTOMERS_SQL, filter.sql());
        let data_sql = REFERRAL_STATS.data_sql(&filter);
        assert!(total_sql.ends_with(filter.sql()));
        assert!(data_sql.contains(filter.sql()));
        assert!(data_sql.contains("GROUP BY c.referral_code"));
    }

    #[test]
    fn partner_listing_is_paginated_after_search() {
        let params = ReferralPartnerListParams {
            search: Some("ayu".into()),
            ..Default::default()
        };
        let filter = referral_partner_filter(&params);
        assert!(filter.sql().contains("referral_code::TEXT ILIKE $1"));
        assert!(REFERRAL_PARTNERS.data_sql(&filter).ends_with("LIMIT $2 OFFSET $3"));
        assert!(REFERRAL_PARTNERS.count_sql(&filter).ends_with(filter.sql()));
    }

    #[test]
    fn codes_and_commission_are_validated() {
        assert_eq!(validate_code("  AYU10 ").unwrap(), "AYU10");
        assert!(validate_code("   ").is_err());
        assert!(validate_code("AYU 10").is_err());
        assert!(validate_code("partners").is_err());
        assert_eq!(validate_code("Partners").unwrap(), "Partners");
        assert!(validate_commission(Some(1.5)).is_err());
        assert!(validate_commission(Some(0.1)).is_ok());
        assert!(validate_commission(None).is_ok());
    }
}
