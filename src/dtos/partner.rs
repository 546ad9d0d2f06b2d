use serde::{Deserialize, Serialize};

use crate::models::partner::Partner;
use crate::query::PageMeta;

#[derive(Debug, Default, Deserialize)]
pub struct PartnerListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct CreatePartnerRequest {
    pub name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: Option<String>, // defaults to "lead"
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdatePartnerRequest {
    pub name: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Serialize)]
pub struct PartnerListResponse {
    pub partners: Vec<Partner>,
    #[serde(flatten)]
    pub meta: PageMeta,
}
