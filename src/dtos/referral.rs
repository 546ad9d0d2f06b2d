use serde::{Deserialize, Serialize};

use crate::models::customer::CustomerRow;
use crate::models::referral::{ReferralPartner, ReferralStat};
use crate::query::PageMeta;

#[derive(Debug, Default, Deserialize)]
pub struct ReferralStatsParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Serialize)]
pub struct ReferralStatsResponse {
    pub referrals: Vec<ReferralStat>,
    /// Distinct customers with a referral code under the same filters.
    pub total_referred_customers: i64,
    #[serde(flatten)]
    pub meta: PageMeta,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReferralPartnerListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateReferralPartnerRequest {
    pub name: String,
    pub referral_code: String,
    pub email: Option<String>,
    pub commission_rate: Option<f64>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize)]
pub struct UpdateReferralPartnerRequest {
    pub name: Option<String>,
    pub referral_code: Option<String>,
    pub email: Option<String>,
    pub commission_rate: Option<f64>,
    pub is_active: Option<bool>,
}

#[derive(Serialize)]
pub struct ReferralPartnerListResponse {
    pub partners: Vec<ReferralPartner>,
    #[serde(flatten)]
    pub meta: PageMeta,
}

#[derive(Serialize)]
pub struct ReferredCustomersResponse {
    pub referral_code: String,
    pub customers: Vec<CustomerRow>,
    #[serde(flatten)]
    pub meta: PageMeta,
}
