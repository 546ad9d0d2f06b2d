use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::dtos::excluded_email::{
    CreateExcludedEmailRequest, ExcludedEmailListParams, ExcludedEmailListResponse,
};
use crate::error::AppError;
use crate::models::excluded_email::ExcludedEmail;
use crate::query::pagination::DEFAULT_LIMIT;
use crate::query::{ListQuery, PageRequest, WhereBuilder, WhereClause};
use crate::state::AppState;

const EXCLUDED_EMAILS: ListQuery<'static> = ListQuery {
    select: "SELECT id, email, reason, created_at FROM excluded_emails",
    count: "SELECT COUNT(*) FROM excluded_emails",
    tail: "ORDER BY created_at DESC, id DESC",
};

fn excluded_email_filter(params: &ExcludedEmailListParams) -> WhereClause {
    let mut filter = WhereBuilder::new();
    filter.search(&["email", "reason"], params.search.as_deref());
    filter.build()
}

/// Lower-cases and trims; rejects anything that is not shaped like an address.
pub fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
        }
        None => false,
    };
    if !valid || email.chars().any(char::is_whitespace) {
        return Err(AppError::validation("Invalid email address"));
    }
    Ok(email)
}

pub async fn list_excluded_emails(
    State(AppState { db_pool, .. }): State<AppState>,
    Query(params): Query<ExcludedEmailListParams>,
) -> Result<Json<ExcludedEmailListResponse>, AppError> {
    let filter = excluded_email_filter(&params);
    let page = PageRequest::parse(params.page.as_deref(), params.limit.as_deref(), DEFAULT_LIMIT);

    let (excluded_emails, meta) = EXCLUDED_EMAILS
        .fetch_page::<ExcludedEmail>(&db_pool, &filter, page)
        .await?;

    Ok(Json(ExcludedEmailListResponse {
        excluded_emails,
        meta,
    }))
}

pub async fn create_excluded_email(
    State(AppState { db_pool, .. }): State<AppState>,
    Json(req): Json<CreateExcludedEmailRequest>,
) -> Result<(StatusCode, Json<ExcludedEmail>), AppError> {
    let email = normalize_email(&req.email)?;

    // DO NOTHING leaves an existing row untouched; no row back means it already existed.
    let created = sqlx::query_as::<_, ExcludedEmail>(
        r#"INSERT INTO excluded_emails (email, reason)
        VALUES ($1, $2)
        ON CONFLICT (email) DO NOTHING
        RETURNING id, email, reason, created_at"#,
    )
    .bind(&email)
    .bind(req.reason.as_deref().map(str::trim).filter(|r| !r.is_empty()))
    .fetch_optional(&db_pool)
    .await?
    .ok_or_else(|| AppError::conflict("Email is already excluded"))?;

    tracing::info!(email = %created.email, "Email excluded from dashboard listings");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn delete_excluded_email(
    State(AppState { db_pool, .. }): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM excluded_emails WHERE id = $1")
        .bind(id)
        .execute(&db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Excluded email not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}
