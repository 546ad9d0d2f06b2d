use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;

use crate::dtos::event::{
    CreateEventRequest, EventListParams, EventListResponse, RegistrationListParams,
    RegistrationListResponse, UpdateEventRequest,
};
use crate::error::AppError;
use crate::models::event::{Event, Registration};
use crate::query::params::parse_date_range;
use crate::query::pagination::{DEFAULT_LIMIT, EVENT_LIMIT};
use crate::query::{ListQuery, PageRequest, WhereBuilder, WhereClause};
use crate::services::export::{self, Cell, Sheet, MAX_EXPORT_ROWS};
use crate::state::AppState;

const EVENTS: ListQuery<'static> = ListQuery {
    select: r#"SELECT
            e.id, e.title, e.description, e.event_date, e.location, e.capacity, e.created_at,
            (SELECT COUNT(*) FROM registrations r WHERE r.event_id = e.id) AS registration_count
        FROM events e"#,
    count: "SELECT COUNT(*) FROM events e",
    tail: "ORDER BY e.event_date DESC, e.id DESC",
};

const REGISTRATIONS: ListQuery<'static> = ListQuery {
    select: r#"SELECT r.id, r.event_id, r.customer_id, r.name, r.email, r.status, r.registered_at
        FROM registrations r"#,
    count: "SELECT COUNT(*) FROM registrations r",
    tail: "ORDER BY r.registered_at DESC, r.id DESC",
};

fn validate_capacity(capacity: Option<i32>) -> Result<(), AppError> {
    if let Some(c) = capacity {
        if c < 0 {
            return Err(AppError::validation("Capacity cannot be negative"));
        }
    }
    Ok(())
}

pub async fn list_events(
    State(AppState { db_pool, .. }): State<AppState>,
    Query(params): Query<EventListParams>,
) -> Result<Json<EventListResponse>, AppError> {
    let (start, end) = parse_date_range(params.start_date.as_deref(), params.end_date.as_deref())?;
    let mut filter = WhereBuilder::new();
    filter
        .search(&["e.title", "e.location"], params.search.as_deref())
        .date_range("e.event_date", start, end);
    let filter = filter.build();
    let page = PageRequest::parse(params.page.as_deref(), params.limit.as_deref(), EVENT_LIMIT);

    let (events, meta) = EVENTS.fetch_page::<Event>(&db_pool, &filter, page).await?;

    Ok(Json(EventListResponse { events, meta }))
}

async fn fetch_event(db_pool: &sqlx::PgPool, id: i64) -> Result<Event, AppError> {
    let sql = format!("{} WHERE e.id = $1", EVENTS.select);
    sqlx::query_as::<_, Event>(&sql)
        .bind(id)
        .fetch_optional(db_pool)
        .await?
        .ok_or_else(|| AppError::not_found("Event not found"))
}

pub async fn get_event(
    State(AppState { db_pool, .. }): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Event>, AppError> {
    fetch_event(&db_pool, id).await.map(Json)
}

pub async fn create_event(
    State(AppState { db_pool, .. }): State<AppState>,
    Json(req): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), AppError> {
    if req.title.trim().is_empty() {
        return Err(AppError::validation("Event title is required"));
    }
    validate_capacity(req.capacity)?;

    let id = sqlx::query_scalar::<_, i64>(
        r#"INSERT INTO events (title, description, event_date, location, capacity)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id"#,
    )
    .bind(req.title.trim())
    .bind(&req.description)
    .bind(req.event_date)
    .bind(&req.location)
    .bind(req.capacity)
    .fetch_one(&db_pool)
    .await?;

    Ok((StatusCode::CREATED, Json(fetch_event(&db_pool, id).await?)))
}

pub async fn update_event(
    State(AppState { db_pool, .. }): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<Json<Event>, AppError> {
    if let Some(title) = &req.title {
        if title.trim().is_empty() {
            return Err(AppError::validation("Event title cannot be empty"));
        }
    }
    validate_capacity(req.capacity)?;

    let result = sqlx::query(
        r#"UPDATE events SET
            title = COALESCE($2, title),
            description = COALESCE($3, description),
            event_date = COALESCE($4, event_date),
            location = COALESCE($5, location),
            capacity = COALESCE($6, capacity)
        WHERE id = $1"#,
    )
    .bind(id)
    .bind(req.title.as_deref().map(str::trim))
    .bind(&req.description)
    .bind(req.event_date)
    .bind(&req.location)
    .bind(req.capacity)
    .execute(&db_pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Event not found"));
    }

    fetch_event(&db_pool, id).await.map(Json)
}

pub async fn delete_event(
    State(AppState { db_pool, .. }): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let has_registrations = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM registrations WHERE event_id = $1)",
    )
    .bind(id)
    .fetch_one(&db_pool)
    .await?;

    if has_registrations {
        return Err(AppError::conflict("Cannot delete event with existing registrations"));
    }

    let result = sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(id)
        .execute(&db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Event not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

fn registration_filter(event_id: i64, params: &RegistrationListParams) -> WhereClause {
    let mut filter = WhereBuilder::with_exclusion("r.email");
    filter
        .eq_i64("r.event_id", Some(event_id))
        .search(&["r.name", "r.email"], params.search.as_deref())
        .eq_text("r.status", params.status.as_deref());
    filter.build()
}

pub async fn list_registrations(
    State(AppState { db_pool, .. }): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<RegistrationListParams>,
) -> Result<Json<RegistrationListResponse>, AppError> {
    fetch_event(&db_pool, id).await?;

    let filter = registration_filter(id, &params);
    let page = PageRequest::parse(params.page.as_deref(), params.limit.as_deref(), DEFAULT_LIMIT);
    let (registrations, meta) = REGISTRATIONS
        .fetch_page::<Registration>(&db_pool, &filter, page)
        .await?;

    Ok(Json(RegistrationListResponse {
        event_id: id,
        registrations,
        meta,
    }))
}

pub async fn export_registrations(
    State(AppState { db_pool, .. }): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<RegistrationListParams>,
) -> Result<Response, AppError> {
    let event = fetch_event(&db_pool, id).await?;
    let filter = registration_filter(id, &params);
    let rows = REGISTRATIONS
        .fetch_all::<Registration>(&db_pool, &filter, MAX_EXPORT_ROWS)
        .await?;
    tracing::info!(event_id = id, rows = rows.len(), "Exporting registrations");

    let sheet = Sheet {
        name: "Registrations",
        headers: &["ID", "Name", "Email", "Customer ID", "Status", "Registered At"],
        rows: rows
            .into_iter()
            .map(|r| {
                vec![
                    Cell::from(r.id),
                    r.name.into(),
                    r.email.into(),
                    r.customer_id.into(),
                    r.status.into(),
                    r.registered_at.to_rfc3339().into(),
                ]
            })
            .collect(),
    };

    let stem = format!("event-{}-registrations", event.id);
    Ok(export::attachment(&stem, export::to_xlsx(&sheet)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::filter::SqlParam;

    #[test]
    fn registrations_are_scoped_to_event_first() {
        let params = RegistrationListParams {
            status: Some("attended".into()),
            ..Default::default()
        };
        let filter = registration_filter(7, &params);
        assert_eq!(filter.params()[0], SqlParam::BigInt(7));
        assert!(filter.sql().starts_with(" WHERE r.event_id = $1"));
        assert!(filter.sql().contains("LOWER(r.email)"));
    }

    #[test]
    fn negative_capacity_is_rejected() {
        assert!(validate_capacity(Some(-1)).is_err());
        assert!(validate_capacity(Some(0)).is_ok());
        assert!(validate_capacity(None).is_ok());
    }
}
