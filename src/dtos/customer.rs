use serde::{Deserialize, Serialize};

use crate::models::customer::CustomerRow;
use crate::models::transaction::TransactionRow;
use crate::query::PageMeta;

#[derive(Debug, Default, Deserialize)]
pub struct CustomerListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub status: Option<String>, // subscription status
    pub referral_code: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Serialize)]
pub struct CustomerListResponse {
    pub customers: Vec<CustomerRow>,
    #[serde(flatten)]
    pub meta: PageMeta,
}

#[derive(Serialize)]
pub struct CustomerTransactionsResponse {
    pub customer_id: i64,
    pub transactions: Vec<TransactionRow>,
    #[serde(flatten)]
    pub meta: PageMeta,
}
