use serde::{Deserialize, Serialize};
use chrono::NaiveDate;

use crate::models::stats::DailySummaryRow;
use crate::models::transaction::{TransactionDetailRow, TransactionRow};
use crate::query::PageMeta;

#[derive(Debug, Default, Deserialize)]
pub struct TransactionListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub payment_channel: Option<String>,
    pub referral_code: Option<String>,
    pub customer_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Serialize)]
pub struct TransactionListResponse {
    pub transactions: Vec<TransactionRow>,
    #[serde(flatten)]
    pub meta: PageMeta,
}

#[derive(Serialize)]
pub struct TransactionResponse {
    #[serde(flatten)]
    pub transaction: TransactionRow,
    pub details: Vec<TransactionDetailRow>,
    pub details_total: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct DateRangeParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Serialize)]
pub struct DailySummaryResponse {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub days: Vec<DailySummaryRow>,
    pub total_transactions: i64,
    pub total_revenue: f64,
}
