use serde::Serialize;
use chrono::NaiveDate;

pub const TRANSACTION_TYPES: &[&str] = &["purchase", "usage", "bonus", "refund"];

/// Signed amount of a `credit_transactions ct` row: usage always debits,
/// whatever sign upstream stored it with. Every credit total goes through this.
pub const SIGNED_AMOUNT_SQL: &str =
    "CASE WHEN ct.transaction_type = 'usage' THEN -ABS(ct.amount) ELSE ct.amount END";

#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct CreditSummaryRow {
    pub day: NaiveDate,
    pub transaction_type: String,
    pub transaction_count: i64,
    pub total_amount: f64,
}
