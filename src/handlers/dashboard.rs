use axum::extract::{Query, State};
use axum::Json;

use crate::dtos::dashboard::{
    BreakdownResponse, DashboardStats, FunnelResponse, FunnelStep, WeeklyParams,
    WeeklyStatsResponse,
};
use crate::dtos::transaction::DateRangeParams;
use crate::error::AppError;
use crate::models::stats::{ChannelBreakdownRow, StatusBreakdownRow, WeeklyStatRow};
use crate::models::transaction::{FINISHED, REVENUE_CURRENCY};
use crate::query::filter::excluded_email_predicate;
use crate::query::params::parse_date_range;
use crate::query::WhereBuilder;
use crate::state::AppState;

const DEFAULT_WEEKS: i32 = 12;
const MAX_WEEKS: i32 = 104;

pub async fn dashboard_stats(
    State(AppState { db_pool, .. }): State<AppState>,
) -> Result<Json<DashboardStats>, AppError> {
    let excluded = excluded_email_predicate("c.email");

    let customers_sql = format!(
        r#"SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (
                WHERE c.subscription_status = 'active'
                AND (c.subscription_end_date IS NULL OR c.subscription_end_date >= NOW())
            ) AS active_subscriptions,
            COUNT(*) FILTER (WHERE c.referral_code IS NOT NULL) AS referred
        FROM customers c
        WHERE {excluded}"#
    );
    let active_by_tx_sql = format!(
        r#"SELECT COUNT(DISTINCT t.customer_id)
        FROM transactions t
        JOIN customers c ON c.id = t.customer_id
        WHERE t.status = 'finished'
        AND t.created_at >= NOW() - INTERVAL '30 days'
        AND {excluded}"#
    );
    let transactions_sql = format!(
        r#"SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (WHERE t.status = 'finished') AS finished,
            COALESCE(SUM(t.amount) FILTER (WHERE t.status = 'finished' AND t.currency = 'IDR'), 0)::FLOAT8 AS revenue,
            COUNT(*) FILTER (WHERE t.created_at >= CURRENT_DATE) AS today,
            COALESCE(SUM(t.amount) FILTER (
                WHERE t.created_at >= CURRENT_DATE AND t.status = 'finished' AND t.currency = 'IDR'
            ), 0)::FLOAT8 AS revenue_today
        FROM transactions t
        LEFT JOIN customers c ON c.id = t.customer_id
        WHERE {excluded}"#
    );

    let customers = sqlx::query_as::<_, (i64, i64, i64)>(&customers_sql).fetch_one(&db_pool);
    let active_by_tx = sqlx::query_scalar::<_, i64>(&active_by_tx_sql).fetch_one(&db_pool);
    let transactions =
        sqlx::query_as::<_, (i64, i64, f64, i64, f64)>(&transactions_sql).fetch_one(&db_pool);
    let partners =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM referral_partners WHERE is_active")
            .fetch_one(&db_pool);

    let (
        (total_customers, active_subscriptions, referred_customers),
        active_by_transaction,
        (total_transactions, finished_transactions, total_revenue, transactions_today, revenue_today),
        referral_partners,
    ) = tokio::try_join!(customers, active_by_tx, transactions, partners)?;

    Ok(Json(DashboardStats {
        total_customers,
        active_customers_by_subscription: active_subscriptions,
        active_customers_by_transaction: active_by_transaction,
        total_transactions,
        finished_transactions,
        total_revenue,
        transactions_today,
        revenue_today,
        referral_partners,
        referred_customers,
        currency: REVENUE_CURRENCY,
    }))
}

const FUNNEL_STEPS: [&str; 4] = ["registered", "transacted", "purchased", "repeat_purchased"];

/// Each step's rate is relative to the step before it, rounded to two decimals.
fn build_funnel(counts: [i64; 4]) -> Vec<FunnelStep> {
    let mut prev: Option<i64> = None;
    FUNNEL_STEPS
        .iter()
        .zip(counts)
        .map(|(step, count)| {
            let conversion_rate = match prev {
                None => 100.0,
                Some(0) => 0.0,
                Some(p) => ((count as f64 / p as f64) * 10_000.0).round() / 100.0,
            };
            prev = Some(count);
            FunnelStep {
                step,
                count,
                conversion_rate,
            }
        })
        .collect()
}

pub async fn funnel(
    State(AppState { db_pool, .. }): State<AppState>,
    Query(params): Query<DateRangeParams>,
) -> Result<Json<FunnelResponse>, AppError> {
    let (start, end) = parse_date_range(params.start_date.as_deref(), params.end_date.as_deref())?;
    let mut filter = WhereBuilder::with_exclusion("c.email");
    filter.date_range("c.created_at", start, end);
    let filter = filter.build();

    let sql = format!(
        r#"WITH cohort AS (
            SELECT c.id FROM customers c{}
        ),
        tx AS (
            SELECT t.customer_id,
                COUNT(*) FILTER (WHERE t.status = 'finished') AS finished_count
            FROM transactions t
            WHERE t.customer_id IN (SELECT id FROM cohort)
            GROUP BY t.customer_id
        )
        SELECT
            (SELECT COUNT(*) FROM cohort) AS registered,
            COUNT(*) AS transacted,
            COUNT(*) FILTER (WHERE finished_count > 0) AS purchased,
            COUNT(*) FILTER (WHERE finished_count >= 2) AS repeat_purchased
        FROM tx"#,
        filter.sql()
    );

    let (registered, transacted, purchased, repeat_purchased) = filter
        .bind_as(sqlx::query_as::<_, (i64, i64, i64, i64)>(&sql))
        .fetch_one(&db_pool)
        .await?;

    Ok(Json(FunnelResponse {
        start_date: start,
        end_date: end,
        steps: build_funnel([registered, transacted, purchased, repeat_purchased]),
    }))
}

fn parse_weeks(raw: Option<&str>) -> i32 {
    raw.and_then(|w| w.trim().parse::<i32>().ok())
        .filter(|w| *w >= 1)
        .unwrap_or(DEFAULT_WEEKS)
        .min(MAX_WEEKS)
}

pub async fn weekly_stats(
    State(AppState { db_pool, .. }): State<AppState>,
    Query(params): Query<WeeklyParams>,
) -> Result<Json<WeeklyStatsResponse>, AppError> {
    let weeks = parse_weeks(params.weeks.as_deref());
    let excluded = excluded_email_predicate("c.email");

    let sql = format!(
        r#"WITH weeks AS (
            SELECT generate_series(
                date_trunc('week', NOW()) - ($1::INT - 1) * INTERVAL '1 week',
                date_trunc('week', NOW()),
                INTERVAL '1 week'
            ) AS week_start
        )
        SELECT
            w.week_start::DATE AS week_start,
            (SELECT COUNT(*) FROM customers c
                WHERE c.created_at >= w.week_start
                AND c.created_at < w.week_start + INTERVAL '1 week'
                AND {excluded}) AS new_customers,
            (SELECT COUNT(*) FROM transactions t
                LEFT JOIN customers c ON c.id = t.customer_id
                WHERE t.created_at >= w.week_start
                AND t.created_at < w.week_start + INTERVAL '1 week'
                AND {excluded}) AS transaction_count,
            (SELECT COALESCE(SUM(t.amount), 0)::FLOAT8 FROM transactions t
                LEFT JOIN customers c ON c.id = t.customer_id
                WHERE t.created_at >= w.week_start
                AND t.created_at < w.week_start + INTERVAL '1 week'
                AND t.status = 'finished' AND t.currency = 'IDR'
                AND {excluded}) AS revenue
        FROM weeks w
        ORDER BY w.week_start ASC"#
    );

    let rows = sqlx::query_as::<_, WeeklyStatRow>(&sql)
        .bind(weeks)
        .fetch_all(&db_pool)
        .await?;

    Ok(Json(WeeklyStatsResponse { weeks: rows }))
}

pub async fn breakdown(
    State(AppState { db_pool, .. }): State<AppState>,
    Query(params): Query<DateRangeParams>,
) -> Result<Json<BreakdownResponse>, AppError> {
    let (start, end) = parse_date_range(params.start_date.as_deref(), params.end_date.as_deref())?;

    let mut by_status = WhereBuilder::with_exclusion("c.email");
    by_status.date_range("t.created_at", start, end);
    let status_filter = by_status.build();

    let mut by_channel = WhereBuilder::with_exclusion("c.email");
    by_channel
        .eq_text("t.status", Some(FINISHED))
        .eq_text("t.currency", Some(REVENUE_CURRENCY))
        .date_range("t.created_at", start, end);
    let channel_filter = by_channel.build();

    let status_sql = format!(
        r#"SELECT t.status, COUNT(*) AS transaction_count, COALESCE(SUM(t.amount), 0)::FLOAT8 AS total_amount
        FROM transactions t
        LEFT JOIN customers c ON c.id = t.customer_id{}
        GROUP BY t.status
        ORDER BY transaction_count DESC, t.status ASC"#,
        status_filter.sql()
    );
    let channel_sql = format!(
        r#"SELECT COALESCE(t.payment_channel, 'unknown') AS payment_channel,
            COUNT(*) AS transaction_count,
            COALESCE(SUM(t.amount), 0)::FLOAT8 AS revenue
        FROM transactions t
        LEFT JOIN customers c ON c.id = t.customer_id{}
        GROUP BY COALESCE(t.payment_channel, 'unknown')
        ORDER BY revenue DESC"#,
        channel_filter.sql()
    );

    let statuses = status_filter
        .bind_as(sqlx::query_as::<_, StatusBreakdownRow>(&status_sql))
        .fetch_all(&db_pool);
    let channels = channel_filter
        .bind_as(sqlx::query_as::<_, ChannelBreakdownRow>(&channel_sql))
        .fetch_all(&db_pool);

    let (by_status, by_payment_channel) = tokio::try_join!(statuses, channels)?;

    Ok(Json(BreakdownResponse {
        by_status,
        by_payment_channel,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn funnel_rates_are_relative_to_previous_step() {
        let steps = build_funnel([200, 80, 40, 10]);
        let rates: Vec<f64> = steps.iter().map(|s| s.conversion_rate).collect();
        assert_eq!(rates, vec![100.0, 40.0, 50.0, 25.0]);
        assert_eq!(steps[3].step, "repeat_purchased");
    }

    #[test]
    fn empty_funnel_has_zero_rates() {
        let steps = build_funnel([0, 0, 0, 0]);
        assert_eq!(steps[0].conversion_rate, 100.0);
        assert!(steps[1..].iter().all(|s| s.conversion_rate == 0.0));
    }

    #[test]
    fn funnel_rates_round_to_two_decimals() {
        let steps = build_funnel([3, 1, 1, 0]);
        assert_eq!(steps[1].conversion_rate, 33.33);
    }

    #[test]
    fn weeks_default_and_cap() {
        assert_eq!(parse_weeks(None), DEFAULT_WEEKS);
        assert_eq!(parse_weeks(Some("x")), DEFAULT_WEEKS);
        assert_eq!(parse_weeks(Some("0")), DEFAULT_WEEKS);
        assert_eq!(parse_weeks(Some("4")), 4);
        assert_eq!(parse_weeks(Some("1000")), MAX_WEEKS);
    }
}
