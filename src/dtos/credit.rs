use serde::{Deserialize, Serialize};

use crate::models::credit::CreditSummaryRow;

#[derive(Debug, Default, Deserialize)]
pub struct CreditSummaryParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub transaction_type: Option<String>,
    pub customer_id: Option<String>,
}

#[derive(Serialize)]
pub struct CreditSummaryResponse {
    pub rows: Vec<CreditSummaryRow>,
    pub total_amount: f64,
    pub total_count: i64,
}
