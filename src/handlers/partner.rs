use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::dtos::partner::{
    CreatePartnerRequest, PartnerListParams, PartnerListResponse, UpdatePartnerRequest,
};
use crate::error::AppError;
use crate::models::partner::{Partner, STATUSES};
use crate::query::params::parse_choice;
use crate::query::pagination::DEFAULT_LIMIT;
use crate::query::{ListQuery, PageRequest, WhereBuilder};
use crate::state::AppState;

const PARTNER_COLUMNS: &str =
    "id, name, company, email, phone, status, notes, created_at, updated_at";

const PARTNERS: ListQuery<'static> = ListQuery {
    select: "SELECT id, name, company, email, phone, status, notes, created_at, updated_at FROM partners",
    count: "SELECT COUNT(*) FROM partners",
    tail: "ORDER BY updated_at DESC, id DESC",
};

fn validate_email(email: Option<&str>) -> Result<(), AppError> {
    if let Some(e) = email.map(str::trim).filter(|e| !e.is_empty()) {
        if !e.contains('@') || e.starts_with('@') || e.ends_with('@') {
            return Err(AppError::validation("Invalid email address"));
        }
    }
    Ok(())
}

/// Empty strings from the edit form clear nothing; they are treated as absent.
fn clean(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub async fn list_partners(
    State(AppState { db_pool, .. }): State<AppState>,
    Query(params): Query<PartnerListParams>,
) -> Result<Json<PartnerListResponse>, AppError> {
    let status = parse_choice("status", params.status.as_deref(), STATUSES)?;
    let mut filter = WhereBuilder::new();
    filter
        .search(&["name", "company", "email", "phone"], params.search.as_deref())
        .eq_text("status", status);
    let filter = filter.build();
    let page = PageRequest::parse(params.page.as_deref(), params.limit.as_deref(), DEFAULT_LIMIT);

    let (partners, meta) = PARTNERS
        .fetch_page::<Partner>(&db_pool, &filter, page)
        .await?;

    Ok(Json(PartnerListResponse { partners, meta }))
}

pub async fn get_partner(
    State(AppState { db_pool, .. }): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Partner>, AppError> {
    let partner = sqlx::query_as::<_, Partner>(&format!(
        "SELECT {PARTNER_COLUMNS} FROM partners WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Partner not found"))?;

    Ok(Json(partner))
}

pub async fn create_partner(
    State(AppState { db_pool, .. }): State<AppState>,
    Json(req): Json<CreatePartnerRequest>,
) -> Result<(StatusCode, Json<Partner>), AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::validation("Partner name is required"));
    }
    let status = parse_choice("status", req.status.as_deref(), STATUSES)?.unwrap_or("lead");
    validate_email(req.email.as_deref())?;

    let partner = sqlx::query_as::<_, Partner>(&format!(
        r#"INSERT INTO partners (name, company, email, phone, status, notes)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {PARTNER_COLUMNS}"#
    ))
    .bind(req.name.trim())
    .bind(clean(req.company.as_deref()))
    .bind(clean(req.email.as_deref()))
    .bind(clean(req.phone.as_deref()))
    .bind(status)
    .bind(clean(req.notes.as_deref()))
    .fetch_one(&db_pool)
    .await?;

    tracing::info!(partner_id = partner.id, "Partner created");
    Ok((StatusCode::CREATED, Json(partner)))
}

pub async fn update_partner(
    State(AppState { db_pool, .. }): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdatePartnerRequest>,
) -> Result<Json<Partner>, AppError> {
    if let Some(name) = &req.name {
        if name.trim().is_empty() {
            return Err(AppError::validation("Partner name cannot be empty"));
        }
    }
    let status = parse_choice("status", req.status.as_deref(), STATUSES)?;
    validate_email(req.email.as_deref())?;

    let partner = sqlx::query_as::<_, Partner>(&format!(
        r#"UPDATE partners SET
            name = COALESCE($2, name),
            company = COALESCE($3, company),
            email = COALESCE($4, email),
            phone = COALESCE($5, phone),
            status = COALESCE($6, status),
            notes = COALESCE($7, notes),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {PARTNER_COLUMNS}"#
    ))
    .bind(id)
    .bind(clean(req.name.as_deref()))
    .bind(clean(req.company.as_deref()))
    .bind(clean(req.email.as_deref()))
    .bind(clean(req.phone.as_deref()))
    .bind(status)
    .bind(clean(req.notes.as_deref()))
    .fetch_optional(&db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Partner not found"))?;

    Ok(Json(partner))
}

pub async fn delete_partner(
    State(AppState { db_pool, .. }): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM partners WHERE id = $1")
        .bind(id)
        .execute(&db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Partner not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}
