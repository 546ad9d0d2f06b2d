use serde::{Deserialize, Serialize};
use chrono::NaiveDate;

use crate::models::stats::{ChannelBreakdownRow, StatusBreakdownRow, WeeklyStatRow};

#[derive(Serialize)]
pub struct DashboardStats {
    pub total_customers: i64,
    /// Customers whose subscription is active and not past its end date.
    pub active_customers_by_subscription: i64,
    /// Customers with a finished transaction in the last 30 days.
    pub active_customers_by_transaction: i64,
    pub total_transactions: i64,
    pub finished_transactions: i64,
    pub total_revenue: f64,
    pub transactions_today: i64,
    pub revenue_today: f64,
    pub referral_partners: i64,
    pub referred_customers: i64,
    pub currency: &'static str,
}

#[derive(Debug, Default, Deserialize)]
pub struct WeeklyParams {
    pub weeks: Option<String>,
}

#[derive(Serialize)]
pub struct WeeklyStatsResponse {
    pub weeks: Vec<WeeklyStatRow>,
}

#[derive(Serialize)]
pub struct FunnelStep {
    pub step: &'static str,
    pub count: i64,
    /// Percentage of the previous step; the first step is 100.
    pub conversion_rate: f64,
}

#[derive(Serialize)]
pub struct FunnelResponse {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub steps: Vec<FunnelStep>,
}

#[derive(Serialize)]
pub struct BreakdownResponse {
    pub by_status: Vec<StatusBreakdownRow>,
    pub by_payment_channel: Vec<ChannelBreakdownRow>,
}
